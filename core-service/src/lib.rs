//! Core service façade and bootstrap helpers.
//!
//! This crate wires the event store, the upstream connector and the sync
//! components into a single [`EventMirrorService`] that answers listing and
//! single-event lookups through the local mirror. Desktop hosts typically
//! enable the `desktop-shims` feature so [`bootstrap`] can fall back to the
//! reqwest-based HTTP client from `bridge-desktop`.

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::source::{AccountCredential, EventSource};
use core_events::filter::{normalize, RawParams};
use core_events::models::StoredEvent;
use core_events::repositories::{EventStore, SqliteEventStore};
use core_events::{create_pool, DatabaseConfig};
use core_runtime::config::MirrorConfig;
use core_runtime::logging::strip_path;
use core_sync::{SingleEventResolver, SyncConfig, SyncOutcome, SyncReconciler};
use provider_stripe::StripeConnector;
use std::time::Duration;
use tracing::{info, instrument};

/// Aggregated handle to everything the mirror needs at runtime.
pub struct CoreDependencies {
    pub source: Arc<dyn EventSource>,
    pub store: Arc<dyn EventStore>,
    pub credential: AccountCredential,
    pub sync_config: SyncConfig,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit handles.
    pub fn new(
        source: Arc<dyn EventSource>,
        store: Arc<dyn EventStore>,
        credential: AccountCredential,
    ) -> Self {
        Self {
            source,
            store,
            credential,
            sync_config: SyncConfig::default(),
        }
    }

    /// Override reconciliation settings.
    pub fn with_sync_config(mut self, config: SyncConfig) -> Self {
        self.sync_config = config;
        self
    }
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct EventMirrorService {
    reconciler: Arc<SyncReconciler>,
    resolver: Arc<SingleEventResolver>,
    credential: AccountCredential,
}

impl EventMirrorService {
    /// Create a new service from the provided dependencies.
    pub fn new(deps: CoreDependencies) -> Self {
        let reconciler = SyncReconciler::with_config(
            Arc::clone(&deps.source),
            Arc::clone(&deps.store),
            deps.sync_config,
        );
        let resolver = SingleEventResolver::new(deps.source, deps.store);

        Self {
            reconciler: Arc::new(reconciler),
            resolver: Arc::new(resolver),
            credential: deps.credential,
        }
    }

    /// Account every call is made on behalf of.
    pub fn account_key(&self) -> &str {
        self.credential.account_key()
    }

    /// List events matching raw request parameters.
    ///
    /// Parameters are normalized first (unknown keys, malformed cursors and
    /// out-of-range limits are dropped), then the mirror is reconciled with
    /// upstream and the matching stored events are returned in insertion
    /// order.
    pub async fn list_events(&self, params: &RawParams) -> Result<Vec<StoredEvent>> {
        Ok(self.sync_events(params).await?.events)
    }

    /// Same as [`list_events`](Self::list_events) but returns the full
    /// reconciliation report.
    #[instrument(skip(self, params))]
    pub async fn sync_events(&self, params: &RawParams) -> Result<SyncOutcome> {
        let filter = normalize(params);
        let outcome = self.reconciler.reconcile(&filter, &self.credential).await?;

        info!(
            returned = outcome.events.len(),
            pages_fetched = outcome.pages_fetched,
            cache_hit = outcome.cache_hit,
            "Listing served"
        );

        Ok(outcome)
    }

    /// Fetch one event by its upstream id, mirroring it if needed.
    ///
    /// Use [`CoreError::is_not_found`] to tell a missing event apart from an
    /// unreachable upstream.
    pub async fn get_event(&self, id: &str) -> Result<StoredEvent> {
        Ok(self.resolver.resolve(id, &self.credential).await?)
    }
}

/// Open the mirror described by `config`.
///
/// Creates (or migrates) the SQLite database and connects the Stripe
/// connector using the configured HTTP client.
///
/// ```ignore
/// use core_runtime::config::MirrorConfigBuilder;
///
/// let config = MirrorConfigBuilder::from_env()?.build()?;
/// let mirror = core_service::bootstrap(config).await?;
/// let events = mirror.list_events(&RawParams::new().with("type", "invoice.paid")).await?;
/// ```
#[instrument(skip(config), fields(database = %strip_path(&config.database_path.to_string_lossy())))]
pub async fn bootstrap(config: MirrorConfig) -> Result<EventMirrorService> {
    config.validate()?;

    let pool = create_pool(DatabaseConfig::new(&config.database_path)).await?;
    let store: Arc<dyn EventStore> = Arc::new(SqliteEventStore::new(pool));

    let connector = StripeConnector::new(Arc::clone(&config.http_client))
        .with_api_base(config.api_base_url.clone())
        .with_timeout(Duration::from_secs(config.request_timeout_secs));
    let source: Arc<dyn EventSource> = Arc::new(connector);

    let deps = CoreDependencies::new(source, store, config.credential.clone()).with_sync_config(
        SyncConfig {
            max_pages: config.max_sync_pages,
        },
    );

    info!(
        account_key = %config.credential.account_key(),
        max_sync_pages = config.max_sync_pages,
        "Event mirror ready"
    );

    Ok(EventMirrorService::new(deps))
}
