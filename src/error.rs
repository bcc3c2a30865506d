use std::fmt;

#[derive(Debug)]
pub enum AppError {
    SourceUnavailable(String),
    MalformedObservation(String),
    EnrichmentFailure(String),
    InvariantViolation(String),
    StoreError(String),
    ConfigError(String),
    SerializationError(String),
}

impl AppError {
    /// Whether the run must stop before anything else is persisted.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            AppError::MalformedObservation(_) | AppError::EnrichmentFailure(_)
        )
    }

    /// Process exit status for an error that ended the run.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::ConfigError(_) => 2,
            AppError::SourceUnavailable(_) => 3,
            AppError::InvariantViolation(_) => 4,
            AppError::StoreError(_) | AppError::SerializationError(_) => 5,
            AppError::MalformedObservation(_) | AppError::EnrichmentFailure(_) => 1,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::SourceUnavailable(msg) => write!(f, "Board snapshot unavailable: {}", msg),
            AppError::MalformedObservation(msg) => write!(f, "Malformed listing: {}", msg),
            AppError::EnrichmentFailure(msg) => write!(f, "Enrichment failed: {}", msg),
            AppError::InvariantViolation(msg) => write!(f, "Invariant violation: {}", msg),
            AppError::StoreError(msg) => write!(f, "Store error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::StoreError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::StoreError(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
