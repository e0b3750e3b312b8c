//! Single-event lookup
//!
//! Fetch-or-create path for one event: answer from the mirror when the event
//! is stored, otherwise fetch exactly that event from upstream and ingest it.

use std::sync::Arc;

use bridge_traits::source::{AccountCredential, EventSource};
use core_events::models::{NewEvent, StoredEvent};
use core_events::repositories::EventStore;
use tracing::{debug, instrument, warn};

use crate::error::{Result, SyncError};

pub struct SingleEventResolver {
    source: Arc<dyn EventSource>,
    store: Arc<dyn EventStore>,
}

impl SingleEventResolver {
    pub fn new(source: Arc<dyn EventSource>, store: Arc<dyn EventStore>) -> Self {
        Self { source, store }
    }

    /// Return the stored event with `external_id`, mirroring it first if
    /// needed.
    ///
    /// # Errors
    ///
    /// - [`SyncError::InvalidInput`] for a blank id
    /// - [`SyncError::EventNotFound`] if upstream has no such event
    /// - [`SyncError::UpstreamUnavailable`] for any other upstream failure
    #[instrument(skip(self, credential), fields(account_key = %credential.account_key()))]
    pub async fn resolve(
        &self,
        external_id: &str,
        credential: &AccountCredential,
    ) -> Result<StoredEvent> {
        if external_id.trim().is_empty() {
            return Err(SyncError::InvalidInput(
                "event id cannot be empty".to_string(),
            ));
        }

        let account_key = credential.account_key();

        if let Some(event) = self
            .store
            .find_by_external_id(account_key, external_id)
            .await?
        {
            debug!("Event served from mirror");
            return Ok(event);
        }

        let remote = self
            .source
            .get_event(credential, external_id)
            .await
            .map_err(|e| {
                warn!(error = %e, "Upstream event lookup failed");
                SyncError::from_upstream(e, Some(external_id))
            })?;

        debug!("Event fetched from upstream, ingesting");
        let stored = self
            .store
            .upsert_if_absent(&NewEvent::from_remote(account_key, remote))
            .await?;

        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::BridgeError;
    use bridge_traits::source::{EventPage, RemoteEvent, RemoteQuery};
    use core_events::db::create_test_pool;
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

    async fn store() -> Arc<SqliteEventStore> {
        Arc::new(SqliteEventStore::new(create_test_pool().await.unwrap()))
    }

    #[tokio::test]
    async fn test_fetches_and_stores_missing_event() {
        let mut source = MockSource::new();
        source
            .expect_get_event()
            .withf(|_, id| id.to_string() == "evt_42")
            .times(1)
            .returning(|_, _| {
                RemoteEvent::from_payload(json!({ "id": "evt_42", "type": "invoice.paid" }))
            });

        let store = store().await;
        let resolver = SingleEventResolver::new(Arc::new(source), store.clone());

        let event = resolver.resolve("evt_42", &credential()).await.unwrap();
        assert_eq!(event.external_id, "evt_42");
        assert_eq!(event.account_key, "acct_1");

        // Second lookup is served locally; the mock allows only one fetch.
        let again = resolver.resolve("evt_42", &credential()).await.unwrap();
        assert_eq!(again.internal_id, event.internal_id);
    }

    #[tokio::test]
    async fn test_stored_event_skips_upstream() {
        let mut source = MockSource::new();
        source.expect_get_event().times(0);

        let store = store().await;
        store
            .upsert_if_absent(&NewEvent::new("acct_1", "evt_7", json!({ "id": "evt_7" })))
            .await
            .unwrap();

        let resolver = SingleEventResolver::new(Arc::new(source), store);
        let event = resolver.resolve("evt_7", &credential()).await.unwrap();
        assert_eq!(event.external_id, "evt_7");
    }

    #[tokio::test]
    async fn test_not_found_stays_distinguishable() {
        let mut source = MockSource::new();
        source
            .expect_get_event()
            .returning(|_, id| Err(BridgeError::NotFound(id.to_string())));

        let resolver = SingleEventResolver::new(Arc::new(source), store().await);
        let err = resolver.resolve("evt_gone", &credential()).await.unwrap_err();

        assert!(matches!(err, SyncError::EventNotFound { ref id } if id == "evt_gone"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_unavailable() {
        let mut source = MockSource::new();
        source
            .expect_get_event()
            .returning(|_, _| Err(BridgeError::OperationFailed("timeout".into())));

        let resolver = SingleEventResolver::new(Arc::new(source), store().await);
        let err = resolver.resolve("evt_1", &credential()).await.unwrap_err();

        assert!(err.is_upstream_unavailable());
    }

    #[tokio::test]
    async fn test_blank_id_rejected() {
        let resolver = SingleEventResolver::new(Arc::new(MockSource::new()), store().await);
        let err = resolver.resolve("  ", &credential()).await.unwrap_err();

        assert!(matches!(err, SyncError::InvalidInput(_)));
    }
}
