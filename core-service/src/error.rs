use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Sync error: {0}")]
    Sync(#[from] core_sync::SyncError),

    #[error("Event store error: {0}")]
    Store(#[from] core_events::EventStoreError),
}

impl CoreError {
    /// True when the requested event exists neither locally nor upstream.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::Sync(e) if e.is_not_found())
    }

    /// True when the upstream API could not be reached or refused the call.
    pub fn is_upstream_unavailable(&self) -> bool {
        matches!(self, CoreError::Sync(e) if e.is_upstream_unavailable())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
