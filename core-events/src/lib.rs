//! # Event Store Module
//!
//! Owns the local event mirror and the filters that address it.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite database schema and migrations
//! - Normalizing raw read parameters into a [`CanonicalFilter`]
//! - Rendering that filter as an upstream [`RemoteQuery`](bridge_traits::RemoteQuery)
//!   and as a [`LocalPredicate`] over stored payloads
//! - The [`EventStore`] repository with first-write-wins ingestion

pub mod db;
pub mod error;
pub mod filter;
pub mod models;
pub mod query;
pub mod repositories;

pub use db::{create_pool, create_test_pool, DatabaseConfig, DatabaseLocation};
pub use error::{EventStoreError, Result};
pub use filter::{
    is_valid_event_id, normalize, CanonicalFilter, CreatedFilter, RangeOperator, RawParams,
};
pub use models::{NewEvent, StoredEvent};
pub use query::{build_remote_query, Comparison, Condition, LocalPredicate, PayloadField, PredicateValue};
pub use repositories::{EventStore, SqliteEventStore};
