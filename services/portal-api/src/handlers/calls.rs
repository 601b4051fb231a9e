//! Call log query handlers

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use dialdex_db::{CallLogFilter, CallLogRepository};

use crate::error::{ApiError, ApiResult};
use crate::extractors::AuthSession;
use crate::handlers::shared::record_op_duration;
use crate::state::AppState;

/// Wire format for the date filters
const DATE_FORMAT: &str = "%d-%m-%Y";
/// Display format for call timestamps
const CALL_DATE_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

const DEFAULT_PAGE_SIZE: i64 = 100;
const MAX_PAGE_SIZE: i64 = 1000;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CallListParams {
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub size: Option<i64>,
}

impl CallListParams {
    /// Translate the query string into a repository filter.
    ///
    /// Date filters name whole days: `start_date` maps to that day's
    /// midnight and `end_date` to the following midnight, so against the
    /// repository's exclusive upper bound the named end day is covered in
    /// full. Blank values are treated as absent.
    fn into_filter(self) -> Result<CallLogFilter, ApiError> {
        Ok(CallLogFilter {
            phone_number: self
                .phone_number
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
            from: self
                .start_date
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| parse_filter_date(v, "start_date"))
                .transpose()?,
            until: self
                .end_date
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| parse_filter_date(v, "end_date"))
                .transpose()?
                .map(|day| day + chrono::Duration::days(1)),
            limit: self
                .size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CallEntryResponse {
    pub phone_number: String,
    pub display_name: String,
    pub called_phone_number: String,
    pub call_date: String,
}

#[derive(Debug, Serialize)]
pub struct CallListResponse {
    pub data: Vec<CallEntryResponse>,
}

#[derive(Debug, Serialize)]
pub struct CallCountResponse {
    pub count: i64,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /calls
#[instrument(skip(state, _session, params))]
pub async fn list_calls(
    State(state): State<AppState>,
    _session: AuthSession,
    Query(params): Query<CallListParams>,
) -> ApiResult<Json<CallListResponse>> {
    let filter = params.into_filter()?;

    let start = Instant::now();
    let result = state.repos.call_logs.query(filter).await;
    record_op_duration("list_calls", start, result.is_ok());

    let entries = result?;
    Ok(Json(CallListResponse {
        data: entries
            .into_iter()
            .map(|entry| CallEntryResponse {
                phone_number: entry.phone_number,
                display_name: entry.display_name,
                called_phone_number: entry.called_number,
                call_date: entry.occurred_at.format(CALL_DATE_FORMAT).to_string(),
            })
            .collect(),
    }))
}

/// GET /calls/{phone_number}/lasthour
#[instrument(skip(state, _session))]
pub async fn calls_last_hour(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(phone_number): Path<String>,
) -> ApiResult<Json<CallCountResponse>> {
    let since = Utc::now() - chrono::Duration::hours(1);

    let start = Instant::now();
    let result = state
        .repos
        .call_logs
        .count_for_number_since(&phone_number, since)
        .await;
    record_op_duration("calls_last_hour", start, result.is_ok());

    Ok(Json(CallCountResponse { count: result? }))
}

// ============================================================================
// Helpers
// ============================================================================

/// Parse a `dd-mm-yyyy` filter value to midnight UTC of that day.
fn parse_filter_date(value: &str, field_name: &str) -> Result<DateTime<Utc>, ApiError> {
    let date = NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| {
        ApiError::BadRequest(format!("invalid {field_name}: expected dd-mm-yyyy"))
    })?;
    Ok(date.and_time(NaiveTime::MIN).and_utc())
}
