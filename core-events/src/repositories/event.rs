//! Event store trait and SQLite implementation

use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::clock::{Clock, SystemClock};
use sqlx::sqlite::SqliteArguments;
use sqlx::query::{QueryAs, QueryScalar};
use sqlx::{query_as, Sqlite, SqlitePool};
use tracing::{debug, instrument};

use crate::error::{EventStoreError, Result};
use crate::models::{EventRow, NewEvent, StoredEvent};
use crate::query::{LocalPredicate, PredicateValue};

/// Persistence for mirrored events.
///
/// Every read is scoped to one account. Ingestion is first-write-wins: once
/// an `(account_key, external_id)` pair exists its payload never changes.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert the event unless its key already exists, then return the
    /// stored row.
    ///
    /// Concurrent callers racing on the same key all observe the same row;
    /// the losing insert is never reported as an error.
    async fn upsert_if_absent(&self, event: &NewEvent) -> Result<StoredEvent>;

    /// Number of the account's events matching `predicate`.
    async fn count(&self, predicate: &LocalPredicate, account_key: &str) -> Result<i64>;

    /// The account's events matching `predicate`, in insertion order.
    async fn query(&self, predicate: &LocalPredicate, account_key: &str)
        -> Result<Vec<StoredEvent>>;

    /// Find an event by its upstream identifier
    ///
    /// # Returns
    /// - `Ok(Some(event))` if mirrored
    /// - `Ok(None)` if not mirrored yet
    /// - `Err` if database error occurs
    async fn find_by_external_id(
        &self,
        account_key: &str,
        external_id: &str,
    ) -> Result<Option<StoredEvent>>;
}

/// SQLite implementation of EventStore
pub struct SqliteEventStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqliteEventStore {
    /// Create a new SQLite event store using the system clock
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    /// Create a store that stamps rows with the given clock
    pub fn with_clock(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    fn where_clause(predicate: &LocalPredicate) -> String {
        match predicate.to_sql() {
            Some(fragment) => format!("account_key = ? AND {}", fragment),
            None => "account_key = ?".to_string(),
        }
    }
}

fn bind_rows<'q>(
    mut query: QueryAs<'q, Sqlite, EventRow, SqliteArguments<'q>>,
    predicate: &LocalPredicate,
) -> QueryAs<'q, Sqlite, EventRow, SqliteArguments<'q>> {
    for value in predicate.bindings() {
        query = match value {
            PredicateValue::Integer(v) => query.bind(*v),
            PredicateValue::Text(v) => query.bind(v.clone()),
        };
    }
    query
}

fn bind_scalar<'q>(
    mut query: QueryScalar<'q, Sqlite, i64, SqliteArguments<'q>>,
    predicate: &LocalPredicate,
) -> QueryScalar<'q, Sqlite, i64, SqliteArguments<'q>> {
    for value in predicate.bindings() {
        query = match value {
            PredicateValue::Integer(v) => query.bind(*v),
            PredicateValue::Text(v) => query.bind(v.clone()),
        };
    }
    query
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[async_trait]
impl EventStore for SqliteEventStore {
    #[instrument(skip(self, event), fields(account_key = %event.account_key, external_id = %event.external_id))]
    async fn upsert_if_absent(&self, event: &NewEvent) -> Result<StoredEvent> {
        event.validate().map_err(EventStoreError::InvalidInput)?;

        let payload = serde_json::to_string(&event.payload)?;
        let now = self.clock.unix_timestamp();

        let inserted = sqlx::query(
            r#"
            INSERT INTO events (account_key, external_id, payload, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(account_key, external_id) DO NOTHING
            "#,
        )
        .bind(&event.account_key)
        .bind(&event.external_id)
        .bind(&payload)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(result) if result.rows_affected() == 0 => {
                debug!("Event already mirrored, keeping first copy");
            }
            Ok(_) => debug!("Event ingested"),
            Err(e) if is_unique_violation(&e) => {
                debug!("Lost insert race, re-reading existing event");
            }
            Err(e) => return Err(e.into()),
        }

        self.find_by_external_id(&event.account_key, &event.external_id)
            .await?
            .ok_or_else(|| EventStoreError::NotFound {
                account_key: event.account_key.clone(),
                external_id: event.external_id.clone(),
            })
    }

    async fn count(&self, predicate: &LocalPredicate, account_key: &str) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM events WHERE {}",
            Self::where_clause(predicate)
        );

        let query = sqlx::query_scalar::<_, i64>(&sql).bind(account_key);
        let count = bind_scalar(query, predicate).fetch_one(&self.pool).await?;

        Ok(count)
    }

    async fn query(
        &self,
        predicate: &LocalPredicate,
        account_key: &str,
    ) -> Result<Vec<StoredEvent>> {
        let sql = format!(
            "SELECT * FROM events WHERE {} ORDER BY id ASC",
            Self::where_clause(predicate)
        );

        let query = query_as::<_, EventRow>(&sql).bind(account_key);
        let rows = bind_rows(query, predicate).fetch_all(&self.pool).await?;

        rows.into_iter().map(StoredEvent::try_from).collect()
    }

    async fn find_by_external_id(
        &self,
        account_key: &str,
        external_id: &str,
    ) -> Result<Option<StoredEvent>> {
        let row = query_as::<_, EventRow>(
            "SELECT * FROM events WHERE account_key = ? AND external_id = ?",
        )
        .bind(account_key)
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(StoredEvent::try_from).transpose()
    }
}
