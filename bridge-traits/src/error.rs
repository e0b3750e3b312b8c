use thiserror::Error;

/// Failure reported by a host adapter or upstream connector.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The adapter could not be constructed or is unsupported on this host
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    /// Transport failure, rejected request or unreadable response
    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// Upstream answered that the resource does not exist
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl BridgeError {
    /// Whether this error reports a missing remote resource rather than a
    /// transport or service failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BridgeError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
