//! # Repository Pattern Implementation
//!
//! Storage access for mirrored events. The trait is what the sync layer
//! depends on; the SQLite implementation uses sqlx with the pool from
//! [`crate::db`].
//!
//! - `EventStore` - idempotent ingestion, predicate count/query, lookup by
//!   external id

pub mod event;

pub use event::{EventStore, SqliteEventStore};
