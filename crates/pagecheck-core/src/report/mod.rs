mod raw;
mod types;

pub use raw::{AuditRef, RawCategory, RawCheck, RawReport};
pub use types::*;
