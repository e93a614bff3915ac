use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Failure reported by an external embedding or completion service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("fatal failure: {0}")]
    Fatal(String),
}

impl ServiceError {
    /// Rate limits and transient failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::RateLimited(_) | ServiceError::Transient(_))
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ServiceError::RateLimited(_))
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Embedding service failed: {0}")]
    Embedding(#[source] ServiceError),

    #[error("Completion service failed: {0}")]
    Completion(#[source] ServiceError),

    #[error("Unparseable LLM response: {0}")]
    Parse(String),

    #[error("Data integrity violation: {0}")]
    DataIntegrity(String),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Errors after which a query can still be answered from the similarity ranking.
    pub fn is_degradable(&self) -> bool {
        matches!(self, Error::Completion(_) | Error::Parse(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
