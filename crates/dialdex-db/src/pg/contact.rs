//! PostgreSQL contact repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::ContactRow;
use crate::repo::{ContactRepository, CreateContact, UpdateContact};

/// PostgreSQL contact repository
#[derive(Clone)]
pub struct PgContactRepository {
    pool: PgPool,
}

impl PgContactRepository {
    /// Create a new contact repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContactRepository for PgContactRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<ContactRow>> {
        let contact = sqlx::query_as::<_, ContactRow>(
            r#"
            SELECT id, phone_number, display_name, created_at, updated_at
            FROM contacts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(contact)
    }

    async fn find_by_number(&self, phone_number: &str) -> DbResult<Option<ContactRow>> {
        let contact = sqlx::query_as::<_, ContactRow>(
            r#"
            SELECT id, phone_number, display_name, created_at, updated_at
            FROM contacts
            WHERE phone_number = $1
            "#,
        )
        .bind(phone_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(contact)
    }

    async fn list(&self) -> DbResult<Vec<ContactRow>> {
        let contacts = sqlx::query_as::<_, ContactRow>(
            r#"
            SELECT id, phone_number, display_name, created_at, updated_at
            FROM contacts
            ORDER BY display_name, phone_number
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(contacts)
    }

    async fn search(&self, term: &str) -> DbResult<Vec<ContactRow>> {
        let pattern = format!("%{term}%");
        let contacts = sqlx::query_as::<_, ContactRow>(
            r#"
            SELECT id, phone_number, display_name, created_at, updated_at
            FROM contacts
            WHERE phone_number ILIKE $1 OR display_name ILIKE $1
            ORDER BY display_name, phone_number
            "#,
        )
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(contacts)
    }

    async fn create(&self, contact: CreateContact) -> DbResult<ContactRow> {
        let row = sqlx::query_as::<_, ContactRow>(
            r#"
            INSERT INTO contacts (id, phone_number, display_name)
            VALUES ($1, $2, $3)
            RETURNING id, phone_number, display_name, created_at, updated_at
            "#,
        )
        .bind(contact.id)
        .bind(&contact.phone_number)
        .bind(&contact.display_name)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from_write)?;

        Ok(row)
    }

    async fn update(&self, id: Uuid, changes: UpdateContact) -> DbResult<ContactRow> {
        let row = sqlx::query_as::<_, ContactRow>(
            r#"
            UPDATE contacts
            SET phone_number = COALESCE($2, phone_number),
                display_name = COALESCE($3, display_name),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, phone_number, display_name, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&changes.phone_number)
        .bind(&changes.display_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from_write)?;

        row.ok_or(DbError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }
}
