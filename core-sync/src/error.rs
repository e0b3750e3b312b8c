use bridge_traits::error::BridgeError;
use core_events::EventStoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Event {id} not found upstream")]
    EventNotFound { id: String },

    #[error("Event store error: {0}")]
    Store(#[from] EventStoreError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SyncError {
    /// Classify a failed upstream call. Only a lookup of a specific event can
    /// be reported as not found; anything else means upstream is unavailable.
    pub(crate) fn from_upstream(error: BridgeError, lookup_id: Option<&str>) -> Self {
        match (error, lookup_id) {
            (BridgeError::NotFound(_), Some(id)) => SyncError::EventNotFound { id: id.to_string() },
            (other, _) => SyncError::UpstreamUnavailable(other.to_string()),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::EventNotFound { .. })
    }

    pub fn is_upstream_unavailable(&self) -> bool {
        matches!(self, SyncError::UpstreamUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
