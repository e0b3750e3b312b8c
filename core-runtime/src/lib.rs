//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the event mirror:
//! - Logging and tracing infrastructure
//! - Configuration management
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the other crates depend on. It
//! establishes the logging conventions (including secret redaction) and the
//! fail-fast configuration builder used at bootstrap.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{MirrorConfig, MirrorConfigBuilder};
pub use error::{Error, Result};
