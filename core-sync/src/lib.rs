//! # Sync & Reconciliation Module
//!
//! Keeps the local event mirror in step with the upstream event API.
//!
//! ## Overview
//!
//! - **Sync Reconciler** (`reconciler`): on each read, compares the local count
//!   against the upstream total and pulls missing pages until the mirror is
//!   complete for the filter
//! - **Single-Event Resolver** (`resolver`): fetch-or-create lookup of one event
//!   by its upstream id
//!
//! Both take the account credential as an explicit argument; nothing here
//! holds per-account state between calls.

pub mod error;
pub mod reconciler;
pub mod resolver;

pub use error::{Result, SyncError};
pub use reconciler::{SyncConfig, SyncOutcome, SyncReconciler, DEFAULT_MAX_PAGES};
pub use resolver::SingleEventResolver;
