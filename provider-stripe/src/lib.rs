//! # Stripe Provider
//!
//! Implements the `EventSource` trait against the Stripe REST API.
//!
//! ## Overview
//!
//! This module provides:
//! - Paginated event listing (`GET /v1/events`) with form-encoded filters
//! - Single event retrieval (`GET /v1/events/{id}`)
//! - Bearer authentication with the account's secret key
//! - Exponential backoff on rate limiting and server errors

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{StripeConnector, DEFAULT_API_BASE};
pub use error::{Result, StripeError};
