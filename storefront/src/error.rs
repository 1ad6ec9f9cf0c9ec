use thiserror::Error;

/// Failure taxonomy for every storefront operation. Each variant maps to one
/// HTTP status at the request boundary (see `executable_utils`).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),
    /// A referenced order, product, or return request does not exist.
    #[error("{0}")]
    NotFound(String),
    /// A state or time-window rule was violated.
    #[error("{0}")]
    Precondition(String),
    /// Storage-layer failure, surfaced directly to the caller.
    #[error("storage failure: {0}")]
    Storage(#[from] mongodb::error::Error),
    #[error("{0}")]
    Internal(String),
}

impl StoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        StoreError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        StoreError::NotFound(message.into())
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        StoreError::Precondition(message.into())
    }
}
