//! # Sync Reconciler
//!
//! Decides, on every read, whether the local mirror can answer from cache or
//! must pull more pages from upstream first.
//!
//! ## Workflow
//!
//! 1. Render the filter as an upstream query and fetch the current page
//! 2. Read the upstream total (the page length when upstream omits it)
//! 3. Count stored events matching the local predicate for the account
//! 4. If the mirror holds fewer events than upstream reports:
//!    - ingest every page item (first-write-wins)
//!    - if upstream has more and the cursor moves forward, continue after
//!      the last item
//! 5. Answer with the locally stored events matching the predicate
//!
//! The local count is a staleness proxy only. Cursors and limits do not reach
//! the local predicate, so a filter positioned mid-stream compares a page-scoped
//! upstream total against the whole local set.
//!
//! No lock spans the page loop. Concurrent reconciliations over overlapping
//! filters rely on the store's `(account_key, external_id)` uniqueness.

use std::sync::Arc;

use bridge_traits::source::{AccountCredential, EventPage, EventSource};
use core_events::filter::{is_valid_event_id, CanonicalFilter};
use core_events::models::{NewEvent, StoredEvent};
use core_events::query::{build_remote_query, LocalPredicate};
use core_events::repositories::EventStore;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SyncError};

/// Default safety cap on upstream pages fetched by one reconciliation.
pub const DEFAULT_MAX_PAGES: usize = 1000;

/// Reconciler configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Maximum upstream pages fetched per reconciliation. Reaching it ends the
    /// loop early and answers from whatever is stored.
    pub max_pages: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// Result of one reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    /// Stored events matching the filter, in insertion order
    pub events: Vec<StoredEvent>,
    /// Upstream pages fetched
    pub pages_fetched: usize,
    /// Page items handed to the store (already mirrored items included)
    pub events_ingested: usize,
    /// The first count comparison found the mirror complete
    pub cache_hit: bool,
    /// The loop stopped at [`SyncConfig::max_pages`] while upstream had more
    pub page_cap_reached: bool,
}

/// Mirrors upstream pages into the event store on demand.
pub struct SyncReconciler {
    source: Arc<dyn EventSource>,
    store: Arc<dyn EventStore>,
    config: SyncConfig,
}

impl SyncReconciler {
    pub fn new(source: Arc<dyn EventSource>, store: Arc<dyn EventStore>) -> Self {
        Self::with_config(source, store, SyncConfig::default())
    }

    pub fn with_config(
        source: Arc<dyn EventSource>,
        store: Arc<dyn EventStore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            source,
            store,
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Bring the mirror up to date for `filter` and return the matching
    /// stored events.
    ///
    /// # Errors
    ///
    /// - [`SyncError::UpstreamUnavailable`] if any page fetch fails; pages
    ///   ingested before the failure stay stored
    /// - [`SyncError::Store`] if the event store fails
    #[instrument(skip(self, filter, credential), fields(account_key = %credential.account_key()))]
    pub async fn reconcile(
        &self,
        filter: &CanonicalFilter,
        credential: &AccountCredential,
    ) -> Result<SyncOutcome> {
        let account_key = credential.account_key();
        let predicate = LocalPredicate::from_filter(filter);

        let mut current = filter.clone();
        let mut pages_fetched = 0;
        let mut events_ingested = 0;
        let mut cache_hit = false;
        let mut page_cap_reached = false;

        loop {
            let query = build_remote_query(&current);
            debug!(
                page = pages_fetched + 1,
                starting_after = ?current.starting_after,
                "Fetching upstream page"
            );

            let page = self
                .source
                .list_events(credential, &query)
                .await
                .map_err(|e| {
                    warn!(error = %e, "Upstream listing failed");
                    SyncError::from_upstream(e, None)
                })?;
            pages_fetched += 1;

            let total_count = page.effective_total();
            let local_count = self.store.count(&predicate, account_key).await?;
            let local_count = u64::try_from(local_count).unwrap_or(0);

            if local_count >= total_count {
                cache_hit = pages_fetched == 1;
                debug!(local_count, total_count, "Mirror is complete for filter");
                break;
            }

            let next_cursor = next_cursor(&current, &page);

            for remote in page.data {
                self.store
                    .upsert_if_absent(&NewEvent::from_remote(account_key, remote))
                    .await?;
                events_ingested += 1;
            }

            let Some(cursor) = next_cursor else {
                break;
            };

            if pages_fetched >= self.config.max_pages {
                warn!(
                    max_pages = self.config.max_pages,
                    "Page cap reached, answering from local mirror"
                );
                page_cap_reached = true;
                break;
            }

            current = current.with_starting_after(&cursor);
        }

        let events = self.store.query(&predicate, account_key).await?;

        info!(
            pages_fetched,
            events_ingested,
            cache_hit,
            returned = events.len(),
            "Reconciliation finished"
        );

        Ok(SyncOutcome {
            events,
            pages_fetched,
            events_ingested,
            cache_hit,
            page_cap_reached,
        })
    }
}

/// Cursor for the following page, if pagination should continue.
///
/// Continuing requires upstream to report more results and the last item to
/// carry a well-formed id different from the current position.
fn next_cursor(current: &CanonicalFilter, page: &EventPage) -> Option<String> {
    if !page.has_more {
        return None;
    }

    let last_id = page.last_id()?;

    if !is_valid_event_id(last_id) {
        warn!(last_id, "Upstream returned a malformed cursor, stopping pagination");
        return None;
    }

    if current.starting_after.as_deref() == Some(last_id) {
        warn!(last_id, "Upstream cursor did not advance, stopping pagination");
        return None;
    }

    Some(last_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::BridgeError;
    use bridge_traits::source::{RemoteEvent, RemoteQuery};
    use core_events::db::create_test_pool;
    use core_events::filter::{normalize, RawParams};
    use core_events::repositories::SqliteEventStore;
    use mockall::mock;
    use serde_json::json;

    mock! {
        Source {}

        #[async_trait]
        impl EventSource for Source {
            async fn list_events(
                &self,
                credential: &AccountCredential,
                query: &RemoteQuery,
            ) -> bridge_traits::error::Result<EventPage>;

            async fn get_event(
                &self,
                credential: &AccountCredential,
                id: &str,
            ) -> bridge_traits::error::Result<RemoteEvent>;
        }
    }

    fn credential() -> AccountCredential {
        AccountCredential::new("acct_1", "sk_test_123").unwrap()
    }

    fn remote(id: &str) -> RemoteEvent {
        RemoteEvent::from_payload(json!({
            "id": id,
            "type": "charge.succeeded",
            "created": 1453000000
        }))
        .unwrap()
    }

    fn page(ids: &[&str], has_more: bool, total_count: Option<u64>) -> EventPage {
        EventPage {
            data: ids.iter().map(|id| remote(id)).collect(),
            has_more,
            total_count,
        }
    }

    async fn store() -> Arc<SqliteEventStore> {
        Arc::new(SqliteEventStore::new(create_test_pool().await.unwrap()))
    }

    #[test]
    fn test_default_config() {
        assert_eq!(SyncConfig::default().max_pages, DEFAULT_MAX_PAGES);
    }

    #[test]
    fn test_next_cursor_rules() {
        let filter = CanonicalFilter::default();

        assert_eq!(
            next_cursor(&filter, &page(&["evt_1", "evt_2"], true, None)).as_deref(),
            Some("evt_2")
        );
        assert_eq!(next_cursor(&filter, &page(&["evt_1"], false, None)), None);
        assert_eq!(next_cursor(&filter, &page(&[], true, None)), None);

        let stalled = filter.with_starting_after("evt_2");
        assert_eq!(next_cursor(&stalled, &page(&["evt_2"], true, None)), None);
    }

    #[tokio::test]
    async fn test_requests_total_count_with_filter_fields() {
        let mut source = MockSource::new();
        source
            .expect_list_events()
            .withf(|_, query| {
                query.get("include[]") == Some("total_count")
                    && query.get("type") == Some("charge.succeeded")
                    && query.get("limit") == Some("50")
            })
            .times(1)
            .returning(|_, _| Ok(page(&[], false, Some(0))));

        let reconciler = SyncReconciler::new(Arc::new(source), store().await);
        let filter = normalize(
            &RawParams::new()
                .with("type", "charge.succeeded")
                .with("limit", "50"),
        );

        let outcome = reconciler.reconcile(&filter, &credential()).await.unwrap();
        assert!(outcome.cache_hit);
        assert!(outcome.events.is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failure_is_unavailable() {
        let mut source = MockSource::new();
        source
            .expect_list_events()
            .times(1)
            .returning(|_, _| Err(BridgeError::OperationFailed("connection reset".into())));

        let reconciler = SyncReconciler::new(Arc::new(source), store().await);
        let err = reconciler
            .reconcile(&CanonicalFilter::default(), &credential())
            .await
            .unwrap_err();

        assert!(err.is_upstream_unavailable());
    }

    #[tokio::test]
    async fn test_failure_mid_pagination_keeps_ingested_pages() {
        let mut source = MockSource::new();
        let mut seq = mockall::Sequence::new();
        source
            .expect_list_events()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(page(&["evt_1"], true, Some(2))));
        source
            .expect_list_events()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(BridgeError::OperationFailed("HTTP 502".into())));

        let store = store().await;
        let reconciler = SyncReconciler::new(Arc::new(source), store.clone());

        let result = reconciler
            .reconcile(&CanonicalFilter::default(), &credential())
            .await;

        assert!(matches!(result, Err(SyncError::UpstreamUnavailable(_))));
        assert_eq!(store.count(&LocalPredicate::all(), "acct_1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_page_cap_stops_pagination() {
        let mut source = MockSource::new();
        let mut next = 0;
        source.expect_list_events().times(2).returning(move |_, _| {
            next += 1;
            let id = format!("evt_{}", next);
            Ok(page(&[id.as_str()], true, Some(100)))
        });

        let store = store().await;
        let reconciler = SyncReconciler::with_config(
            Arc::new(source),
            store.clone(),
            SyncConfig { max_pages: 2 },
        );

        let outcome = reconciler
            .reconcile(&CanonicalFilter::default(), &credential())
            .await
            .unwrap();

        assert!(outcome.page_cap_reached);
        assert_eq!(outcome.pages_fetched, 2);
        assert_eq!(outcome.events.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_total_falls_back_to_page_len() {
        let mut source = MockSource::new();
        source
            .expect_list_events()
            .times(1)
            .returning(|_, _| Ok(page(&["evt_1", "evt_2"], false, None)));

        let reconciler = SyncReconciler::new(Arc::new(source), store().await);
        let outcome = reconciler
            .reconcile(&CanonicalFilter::default(), &credential())
            .await
            .unwrap();

        assert!(!outcome.cache_hit);
        assert_eq!(outcome.events_ingested, 2);
        assert_eq!(outcome.events.len(), 2);
    }
}
