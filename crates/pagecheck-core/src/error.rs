use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Malformed analysis report: {0}")]
    Transform(String),

    #[error("Failed to parse analysis report: {0}")]
    Parse(#[from] serde_json::Error),
}

impl Error {
    /// True for errors caused by an upstream payload that does not match the expected shape
    pub fn is_transform(&self) -> bool {
        matches!(self, Error::Transform(_) | Error::Parse(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
