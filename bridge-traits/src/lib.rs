//! # Host Bridge Traits
//!
//! Capability traits the mirror core depends on but does not implement itself.
//!
//! ## Overview
//!
//! This crate defines the contract between the core crates and the concrete
//! adapters supplied by the host (desktop adapters live in `bridge-desktop`,
//! upstream connectors in `provider-*` crates).
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations with retry and TLS
//! - [`EventSource`](source::EventSource) - Paginated upstream event API
//!
//! ### Utilities
//! - [`Clock`](clock::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert their own errors into it and report a missing upstream
//! resource as [`BridgeError::NotFound`] rather than a generic failure.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so adapters can be shared across
//! concurrently running reconciliations.

pub mod clock;
pub mod error;
pub mod http;
pub mod logging;
pub mod source;

pub use error::BridgeError;

pub use http::{HttpClient, HttpRequest, HttpResponse, RetryPolicy};
pub use source::{AccountCredential, EventPage, EventSource, RemoteEvent, RemoteQuery};
pub use clock::{Clock, FixedClock, SystemClock};
pub use logging::{LogEntry, LogLevel, LoggerSink};
