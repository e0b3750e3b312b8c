use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventStoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored payload is no longer valid JSON
    #[error("Payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A row vanished between the insert and the read-back
    #[error("Event not found: {account_key}/{external_id}")]
    NotFound {
        account_key: String,
        external_id: String,
    },

    #[error("Invalid event: {0}")]
    InvalidInput(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

pub type Result<T> = std::result::Result<T, EventStoreError>;
