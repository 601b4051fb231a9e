//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Directory contact row
#[derive(Debug, Clone, FromRow)]
pub struct ContactRow {
    pub id: Uuid,
    pub phone_number: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Call log row
#[derive(Debug, Clone, FromRow)]
pub struct CallLogRow {
    pub id: Uuid,
    pub contact_id: Uuid,
    pub called_number: String,
    pub occurred_at: DateTime<Utc>,
}

/// Call log entry joined with the calling contact
#[derive(Debug, Clone, FromRow)]
pub struct CallLogEntryRow {
    pub phone_number: String,
    pub display_name: String,
    pub called_number: String,
    pub occurred_at: DateTime<Utc>,
}
