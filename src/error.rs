use thiserror::Error;

#[derive(Error, Debug)]
pub enum CipherForgeError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Parsing Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Data Validation Error: {0}")]
    Validation(String),

    /// Training data could not be turned into a model (duplicate or malformed n-grams).
    #[error("Model Construction Error: {0}")]
    Construction(String),

    /// Scoring math produced a value that should be impossible.
    #[error("Invariant Violation: {0}")]
    Invariant(String),
}

pub type CfResult<T> = Result<T, CipherForgeError>;
