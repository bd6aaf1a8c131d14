// Error types for the HSS/LMS engine

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmsError {
    /// Malformed, truncated or unrecognised serialized input
    #[error("Format error: {0}")]
    Format(String),

    /// Signing attempted with an exhausted or already-used one-time key
    #[error("State error: {0}")]
    State(String),

    /// Unregistered type identifier or invalid parameter combination
    #[error("Parameter error: {0}")]
    Parameter(String),

    /// The external state store failed to load or save key state
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl LmsError {
    pub(crate) fn truncated(what: &str, needed: usize, available: usize) -> Self {
        LmsError::Format(format!(
            "{what}: need {needed} bytes, only {available} available"
        ))
    }
}

impl From<std::io::Error> for LmsError {
    fn from(err: std::io::Error) -> Self {
        LmsError::Persistence(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LmsError>;
