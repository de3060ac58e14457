use thiserror::Error;

/// Errors that end a recommendation run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Streaming analysis connection failed: {0}")]
    StreamConnection(String),

    #[error("Analysis timed out after {0} seconds. Please try again.")]
    StreamTimeout(u64),

    #[error("{0}")]
    Backend(String),

    #[error("No recommendations were found for this survey")]
    EmptyResult,

    #[error("Failed to decode backend payload: {0}")]
    Decode(String),

    #[error("Run was cancelled or superseded by a newer run")]
    Cancelled,
}

/// Errors raised by the key/value storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },
}

/// Main error type for the pams host
#[derive(Error, Debug)]
pub enum PamsError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Survey error: {0}")]
    SurveyError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AnalysisError {
    /// Whether the error was caused by a newer run or an explicit cancel
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AnalysisError::Cancelled)
    }
}
