pub mod analysis;
pub mod error;
pub mod format;
pub mod report;
pub mod request;
pub mod score;

pub use analysis::Normalizer;
pub use error::{Error, Result};
pub use report::{NormalizedReport, RawReport};
pub use request::{AnalysisRequest, Strategy};
pub use score::{ScoreLevel, Scores};
