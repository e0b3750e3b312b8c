//! Error types for the Stripe provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Stripe provider errors
#[derive(Error, Debug)]
pub enum StripeError {
    /// API request returned an error
    #[error("Stripe API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Requested resource does not exist
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    /// Rate limited or failing server after every retry
    #[error("Request failed after {attempts} attempts (last status {status_code})")]
    RetriesExhausted { attempts: u32, status_code: u16 },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Stripe operations
pub type Result<T> = std::result::Result<T, StripeError>;

impl From<StripeError> for BridgeError {
    fn from(error: StripeError) -> Self {
        match error {
            StripeError::NotFound { resource } => BridgeError::NotFound(resource),
            StripeError::BridgeError(e) => e,
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}
