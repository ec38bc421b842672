use thiserror::Error;
use uuid::Uuid;

/// Errors raised while validating or mutating pump records.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PumpError {
    /// Bad input shape or value; the caller can correct it and retry.
    #[error("{0}")]
    Validation(String),

    #[error("pump {0} not found")]
    NotFound(Uuid),
}

impl PumpError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
