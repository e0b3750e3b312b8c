//! Domain models for the event mirror

use bridge_traits::source::RemoteEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use crate::error::EventStoreError;

/// Event as persisted in the local mirror.
///
/// Rows are immutable once written: the payload reflects the first copy of
/// the event ever ingested for its `(account_key, external_id)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEvent {
    /// Surrogate identity assigned by the store, increasing with insertion order
    pub internal_id: i64,
    /// Account the event was fetched under
    pub account_key: String,
    /// Upstream identifier (`evt_...`)
    pub external_id: String,
    /// Upstream document, verbatim
    pub payload: Value,
    /// Unix timestamp (seconds) when the row was written
    pub created_at: i64,
    /// Unix timestamp (seconds) of the last bookkeeping update
    pub updated_at: i64,
}

impl StoredEvent {
    /// The upstream `created` timestamp from the payload.
    pub fn created(&self) -> Option<i64> {
        self.payload.get("created").and_then(Value::as_i64)
    }

    /// The upstream event type from the payload.
    pub fn event_type(&self) -> Option<&str> {
        self.payload.get("type").and_then(Value::as_str)
    }
}

/// Event about to be ingested.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub account_key: String,
    pub external_id: String,
    pub payload: Value,
}

impl NewEvent {
    pub fn new(
        account_key: impl Into<String>,
        external_id: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            account_key: account_key.into(),
            external_id: external_id.into(),
            payload,
        }
    }

    /// Pair an upstream record with the account it was fetched under.
    pub fn from_remote(account_key: impl Into<String>, remote: RemoteEvent) -> Self {
        Self::new(account_key, remote.id, remote.payload)
    }

    /// Validate required fields
    pub fn validate(&self) -> Result<(), String> {
        if self.account_key.trim().is_empty() {
            return Err("account_key cannot be empty".to_string());
        }

        if self.external_id.trim().is_empty() {
            return Err("external_id cannot be empty".to_string());
        }

        if !self.payload.is_object() {
            return Err("payload must be a structured object".to_string());
        }

        Ok(())
    }
}

/// Raw `events` row; the payload column holds JSON text.
#[derive(Debug, FromRow)]
pub(crate) struct EventRow {
    pub id: i64,
    pub account_key: String,
    pub external_id: String,
    pub payload: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<EventRow> for StoredEvent {
    type Error = EventStoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(StoredEvent {
            internal_id: row.id,
            account_key: row.account_key,
            external_id: row.external_id,
            payload: serde_json::from_str(&row.payload)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_event_validation() {
        let event = NewEvent::new("acct_1", "evt_1", json!({ "id": "evt_1" }));
        assert!(event.validate().is_ok());

        let event = NewEvent::new(" ", "evt_1", json!({}));
        assert!(event.validate().is_err());

        let event = NewEvent::new("acct_1", "", json!({}));
        assert!(event.validate().is_err());

        let event = NewEvent::new("acct_1", "evt_1", json!("not an object"));
        assert!(event.validate().is_err());
    }

    #[test]
    fn test_from_remote_keeps_payload_verbatim() {
        let payload = json!({ "id": "evt_9", "type": "invoice.paid", "created": 10 });
        let remote = RemoteEvent::from_payload(payload.clone()).unwrap();
        let event = NewEvent::from_remote("acct_1", remote);

        assert_eq!(event.external_id, "evt_9");
        assert_eq!(event.payload, payload);
    }

    #[test]
    fn test_stored_event_serializes_camel_case() {
        let event = StoredEvent {
            internal_id: 7,
            account_key: "acct_1".to_string(),
            external_id: "evt_7".to_string(),
            payload: json!({ "type": "charge.succeeded", "created": 1453000000 }),
            created_at: 1,
            updated_at: 1,
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["internalId"], 7);
        assert_eq!(value["accountKey"], "acct_1");
        assert_eq!(value["externalId"], "evt_7");
        assert_eq!(value["payload"]["type"], "charge.succeeded");
        assert_eq!(event.created(), Some(1453000000));
        assert_eq!(event.event_type(), Some("charge.succeeded"));
    }

    #[test]
    fn test_row_with_corrupt_payload_fails() {
        let row = EventRow {
            id: 1,
            account_key: "acct_1".to_string(),
            external_id: "evt_1".to_string(),
            payload: "{not json".to_string(),
            created_at: 0,
            updated_at: 0,
        };

        assert!(StoredEvent::try_from(row).is_err());
    }
}
