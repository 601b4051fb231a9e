//! Phone directory CRUD handlers
//!
//! Every route here requires an [`AuthSession`]; the extractor redirects
//! unauthenticated browsers before the handler body runs.

use std::time::Instant;

use axum::extract::{Form, Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use dialdex_db::{ContactRepository, ContactRow, CreateContact, UpdateContact};

use crate::error::{ApiError, ApiResult};
use crate::extractors::AuthSession;
use crate::handlers::shared::{found, record_op_duration, validate_field};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub id: String,
    pub phone_number: String,
    pub display_name: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct ContactListResponse {
    pub data: Vec<ContactResponse>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /
pub async fn index(_session: AuthSession) -> Response {
    found("/list")
}

/// GET /list
#[instrument(skip(state, _session, params), fields(query = params.query.as_deref().unwrap_or("")))]
pub async fn list_contacts(
    State(state): State<AppState>,
    _session: AuthSession,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ContactListResponse>> {
    let start = Instant::now();

    let term = params
        .query
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    let result = match term {
        Some(term) => state.repos.contacts.search(term).await,
        None => state.repos.contacts.list().await,
    };

    record_op_duration("list_contacts", start, result.is_ok());
    let rows = result?;

    Ok(Json(ContactListResponse {
        data: rows.into_iter().map(contact_response).collect(),
    }))
}

/// POST /add
#[instrument(skip(state, _session, form))]
pub async fn add_contact(
    State(state): State<AppState>,
    _session: AuthSession,
    Form(form): Form<ContactForm>,
) -> ApiResult<Response> {
    let phone_number = form.phone_number.as_deref().unwrap_or_default().trim();
    let display_name = form.display_name.as_deref().unwrap_or_default().trim();
    validate_field(phone_number, "phone_number")?;
    validate_field(display_name, "display_name")?;

    let start = Instant::now();
    let result = state
        .repos
        .contacts
        .create(CreateContact {
            id: Uuid::new_v4(),
            phone_number: phone_number.to_string(),
            display_name: display_name.to_string(),
        })
        .await;
    record_op_duration("add_contact", start, result.is_ok());

    let contact = result?;
    tracing::info!(contact_id = %contact.id, "contact created");

    Ok(found("/list"))
}

/// GET /edit/{id}
#[instrument(skip(state, _session))]
pub async fn get_contact(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ContactResponse>> {
    let start = Instant::now();
    let result = state.repos.contacts.find_by_id(id).await;
    record_op_duration("get_contact", start, result.is_ok());

    let contact = result?.ok_or(ApiError::ContactNotFound)?;
    Ok(Json(contact_response(contact)))
}

/// POST /update/{id}
#[instrument(skip(state, _session, form))]
pub async fn update_contact(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<Uuid>,
    Form(form): Form<ContactForm>,
) -> ApiResult<Response> {
    let changes = UpdateContact {
        phone_number: form
            .phone_number
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string),
        display_name: form
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string),
    };
    if let Some(phone_number) = &changes.phone_number {
        validate_field(phone_number, "phone_number")?;
    }
    if let Some(display_name) = &changes.display_name {
        validate_field(display_name, "display_name")?;
    }

    let start = Instant::now();
    let result = state.repos.contacts.update(id, changes).await;
    record_op_duration("update_contact", start, result.is_ok());

    let contact = result?;
    tracing::info!(contact_id = %contact.id, "contact updated");

    Ok(found("/list"))
}

/// GET /delete/{id}
#[instrument(skip(state, _session))]
pub async fn delete_contact(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let start = Instant::now();
    let result = state.repos.contacts.delete(id).await;
    record_op_duration("delete_contact", start, result.is_ok());
    result?;

    tracing::info!(contact_id = %id, "contact deleted");

    Ok(found("/list"))
}

// ============================================================================
// Response Mapping
// ============================================================================

fn contact_response(row: ContactRow) -> ContactResponse {
    ContactResponse {
        id: row.id.to_string(),
        phone_number: row.phone_number,
        display_name: row.display_name,
        created_at: row.created_at.to_rfc3339(),
        updated_at: row.updated_at.to_rfc3339(),
    }
}
