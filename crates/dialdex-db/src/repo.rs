//! Repository traits
//!
//! Define async repository interfaces for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::*;

/// Contact repository trait
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Find a contact by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<ContactRow>>;

    /// Find a contact by phone number (exact match)
    async fn find_by_number(&self, phone_number: &str) -> DbResult<Option<ContactRow>>;

    /// List all contacts
    async fn list(&self) -> DbResult<Vec<ContactRow>>;

    /// Search contacts by substring of phone number or display name
    async fn search(&self, term: &str) -> DbResult<Vec<ContactRow>>;

    /// Create a new contact
    async fn create(&self, contact: CreateContact) -> DbResult<ContactRow>;

    /// Update a contact, changing only the provided fields
    async fn update(&self, id: Uuid, changes: UpdateContact) -> DbResult<ContactRow>;

    /// Delete a contact
    async fn delete(&self, id: Uuid) -> DbResult<()>;
}

/// Create contact input
#[derive(Debug, Clone)]
pub struct CreateContact {
    pub id: Uuid,
    pub phone_number: String,
    pub display_name: String,
}

/// Partial contact update input
#[derive(Debug, Clone, Default)]
pub struct UpdateContact {
    pub phone_number: Option<String>,
    pub display_name: Option<String>,
}

/// Call log repository trait
#[async_trait]
pub trait CallLogRepository: Send + Sync {
    /// Record a call event
    async fn record(&self, entry: CreateCallLog) -> DbResult<CallLogRow>;

    /// Query call log entries joined with contacts, newest first
    async fn query(&self, filter: CallLogFilter) -> DbResult<Vec<CallLogEntryRow>>;

    /// Count calls received by a contact's number since a point in time
    async fn count_for_number_since(
        &self,
        phone_number: &str,
        since: DateTime<Utc>,
    ) -> DbResult<i64>;
}

/// Create call log input
#[derive(Debug, Clone)]
pub struct CreateCallLog {
    pub id: Uuid,
    pub contact_id: Uuid,
    pub called_number: String,
}

/// Call log query filter
#[derive(Debug, Clone)]
pub struct CallLogFilter {
    /// Restrict to calls received by this contact phone number
    pub phone_number: Option<String>,
    /// Inclusive lower bound on the call timestamp
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on the call timestamp
    pub until: Option<DateTime<Utc>>,
    /// Maximum number of entries to return
    pub limit: i64,
}

impl Default for CallLogFilter {
    fn default() -> Self {
        Self {
            phone_number: None,
            from: None,
            until: None,
            limit: 100,
        }
    }
}
