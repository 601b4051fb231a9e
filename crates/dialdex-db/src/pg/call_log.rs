//! PostgreSQL call log repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::{CallLogEntryRow, CallLogRow};
use crate::repo::{CallLogFilter, CallLogRepository, CreateCallLog};

/// PostgreSQL call log repository
#[derive(Clone)]
pub struct PgCallLogRepository {
    pool: PgPool,
}

impl PgCallLogRepository {
    /// Create a new call log repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CallLogRepository for PgCallLogRepository {
    async fn record(&self, entry: CreateCallLog) -> DbResult<CallLogRow> {
        let row = sqlx::query_as::<_, CallLogRow>(
            r#"
            INSERT INTO call_logs (id, contact_id, called_number)
            VALUES ($1, $2, $3)
            RETURNING id, contact_id, called_number, occurred_at
            "#,
        )
        .bind(entry.id)
        .bind(entry.contact_id)
        .bind(&entry.called_number)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn query(&self, filter: CallLogFilter) -> DbResult<Vec<CallLogEntryRow>> {
        let entries = sqlx::query_as::<_, CallLogEntryRow>(
            r#"
            SELECT c.phone_number, c.display_name, l.called_number, l.occurred_at
            FROM call_logs l
            JOIN contacts c ON c.id = l.contact_id
            WHERE ($1::text IS NULL OR c.phone_number = $1)
              AND ($2::timestamptz IS NULL OR l.occurred_at >= $2)
              AND ($3::timestamptz IS NULL OR l.occurred_at < $3)
            ORDER BY l.occurred_at DESC
            LIMIT $4
            "#,
        )
        .bind(&filter.phone_number)
        .bind(filter.from)
        .bind(filter.until)
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn count_for_number_since(
        &self,
        phone_number: &str,
        since: DateTime<Utc>,
    ) -> DbResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM call_logs l
            JOIN contacts c ON c.id = l.contact_id
            WHERE c.phone_number = $1 AND l.occurred_at >= $2
            "#,
        )
        .bind(phone_number)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
