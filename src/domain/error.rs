// Error taxonomy shared by the editing engines and the server adapters
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PanelError {
    /// Input that must never be applied to state (geometry, characters, names)
    #[error("validation failed: {0}")]
    Validation(String),

    /// Fetch, push channel, or transport failure
    #[error("network error: {0}")]
    Network(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The server (or an in-flight commit) refused the write
    #[error("conflict: {0}")]
    Conflict(String),
}

impl PanelError {
    pub fn validation(message: impl Into<String>) -> Self {
        PanelError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        PanelError::NotFound(message.into())
    }
}
