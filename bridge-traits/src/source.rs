//! Remote Event Source Abstraction
//!
//! Describes the upstream event API the mirror pulls from: a paginated
//! listing endpoint driven by a flat query map, and a single-event lookup.
//! Both calls are made on behalf of an explicit [`AccountCredential`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{BridgeError, Result};

/// Query key asking upstream to include the overall result count.
pub const TOTAL_COUNT_KEY: &str = "include[]";

/// Value paired with [`TOTAL_COUNT_KEY`].
pub const TOTAL_COUNT_VALUE: &str = "total_count";

/// Account identity plus the secret used to authenticate upstream calls.
///
/// The account key is what stored events are partitioned by; the secret key
/// never leaves the event source implementation.
#[derive(Clone, PartialEq, Eq)]
pub struct AccountCredential {
    account_key: String,
    secret_key: String,
}

impl AccountCredential {
    /// Create a credential, rejecting empty account or secret keys.
    pub fn new(account_key: impl Into<String>, secret_key: impl Into<String>) -> Result<Self> {
        let account_key = account_key.into();
        let secret_key = secret_key.into();

        if account_key.trim().is_empty() {
            return Err(BridgeError::InvalidInput(
                "account key cannot be empty".to_string(),
            ));
        }

        if secret_key.trim().is_empty() {
            return Err(BridgeError::InvalidInput(
                "secret key cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            account_key,
            secret_key,
        })
    }

    pub fn account_key(&self) -> &str {
        &self.account_key
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }
}

impl fmt::Debug for AccountCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountCredential")
            .field("account_key", &self.account_key)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

/// Flat key/value query sent to the upstream listing endpoint.
///
/// Keys are kept in sorted order so the encoded form is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteQuery {
    params: BTreeMap<String, String>,
}

impl RemoteQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A single event record as returned by upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEvent {
    /// Upstream-assigned identifier (`evt_...`)
    pub id: String,
    /// Full upstream document, kept verbatim
    pub payload: Value,
}

impl RemoteEvent {
    /// Build a remote event from an upstream document, reading its `id` field.
    pub fn from_payload(payload: Value) -> Result<Self> {
        let id = payload
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                BridgeError::OperationFailed("event document has no `id` field".to_string())
            })?
            .to_string();

        Ok(Self { id, payload })
    }

    /// The `created` timestamp carried by the payload, if any.
    pub fn created(&self) -> Option<i64> {
        self.payload.get("created").and_then(Value::as_i64)
    }

    /// The `type` string carried by the payload, if any.
    pub fn event_type(&self) -> Option<&str> {
        self.payload.get("type").and_then(Value::as_str)
    }
}

/// One page of the upstream event listing.
#[derive(Debug, Clone, PartialEq)]
pub struct EventPage {
    pub data: Vec<RemoteEvent>,
    pub has_more: bool,
    /// Overall number of events matching the query, when upstream reports it
    pub total_count: Option<u64>,
}

impl EventPage {
    /// Total count reported by upstream, falling back to the page length.
    pub fn effective_total(&self) -> u64 {
        self.total_count.unwrap_or(self.data.len() as u64)
    }

    /// External id of the last item on the page.
    pub fn last_id(&self) -> Option<&str> {
        self.data.last().map(|event| event.id.as_str())
    }
}

/// Upstream event API
///
/// Implementations translate the flat [`RemoteQuery`] into the wire format of
/// the remote service. Errors for a missing event must be reported as
/// [`BridgeError::NotFound`] so callers can tell them apart from transport
/// failures.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::source::{EventSource, RemoteQuery};
///
/// async fn first_page(source: &dyn EventSource, credential: &AccountCredential) -> Result<usize> {
///     let mut query = RemoteQuery::new();
///     query.insert("limit", "10");
///     let page = source.list_events(credential, &query).await?;
///     Ok(page.data.len())
/// }
/// ```
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch one page of events matching `query`.
    async fn list_events(
        &self,
        credential: &AccountCredential,
        query: &RemoteQuery,
    ) -> Result<EventPage>;

    /// Fetch exactly one event by its upstream identifier.
    async fn get_event(&self, credential: &AccountCredential, id: &str) -> Result<RemoteEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_credential_rejects_empty_keys() {
        assert!(AccountCredential::new("", "sk_test").is_err());
        assert!(AccountCredential::new("acct_1", "  ").is_err());
        assert!(AccountCredential::new("acct_1", "sk_test").is_ok());
    }

    #[test]
    fn test_credential_debug_hides_secret() {
        let credential = AccountCredential::new("acct_1", "sk_live_abc").unwrap();
        let debug = format!("{:?}", credential);

        assert!(debug.contains("acct_1"));
        assert!(!debug.contains("sk_live_abc"));
    }

    #[test]
    fn test_remote_query_is_sorted() {
        let mut query = RemoteQuery::new();
        query.insert("type", "charge.succeeded");
        query.insert("limit", "20");
        query.insert("limit", "50");

        let pairs: Vec<_> = query.iter().collect();
        assert_eq!(pairs, vec![("limit", "50"), ("type", "charge.succeeded")]);
    }

    #[test]
    fn test_remote_event_from_payload() {
        let event = RemoteEvent::from_payload(json!({
            "id": "evt_123",
            "created": 1453000000,
            "type": "charge.succeeded"
        }))
        .unwrap();

        assert_eq!(event.id, "evt_123");
        assert_eq!(event.created(), Some(1453000000));
        assert_eq!(event.event_type(), Some("charge.succeeded"));
    }

    #[test]
    fn test_remote_event_requires_id() {
        assert!(RemoteEvent::from_payload(json!({ "type": "charge.succeeded" })).is_err());
        assert!(RemoteEvent::from_payload(json!({ "id": "" })).is_err());
    }

    #[test]
    fn test_event_page_total_falls_back_to_page_len() {
        let page = EventPage {
            data: vec![RemoteEvent::from_payload(json!({ "id": "evt_1" })).unwrap()],
            has_more: false,
            total_count: None,
        };
        assert_eq!(page.effective_total(), 1);
        assert_eq!(page.last_id(), Some("evt_1"));

        let page = EventPage {
            total_count: Some(42),
            ..page
        };
        assert_eq!(page.effective_total(), 42);
    }
}
