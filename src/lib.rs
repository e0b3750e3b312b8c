//! Read-through mirror of a Stripe account's event stream.
//!
//! This crate re-exports the service façade together with the configuration
//! and filter types hosts need to drive it. Enable `desktop-shims` (default)
//! to get the reqwest-based HTTP client when none is injected.
//!
//! ```ignore
//! use event_mirror::{bootstrap, MirrorConfigBuilder, RawParams};
//!
//! let mirror = bootstrap(MirrorConfigBuilder::from_env()?.build()?).await?;
//! let paid = mirror
//!     .list_events(&RawParams::new().with("type", "invoice.paid"))
//!     .await?;
//! ```

pub use core_events::filter::RawParams;
pub use core_events::models::StoredEvent;
pub use core_runtime::config::{MirrorConfig, MirrorConfigBuilder};
pub use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
pub use core_service::{bootstrap, CoreDependencies, CoreError, EventMirrorService, Result};
