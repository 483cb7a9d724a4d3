use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Corrupt storage entry: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, Error>;
