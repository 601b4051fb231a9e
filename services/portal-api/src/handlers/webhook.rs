//! Call notification webhook
//!
//! Ingestion endpoint for the carrier platform. The route carries no user
//! session by contract; requests are screened against network and service
//! allowlists instead.

use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use dialdex_db::{CallLogRepository, ContactRepository, CreateCallLog};

use crate::handlers::shared::record_op_duration;
use crate::state::AppState;

/// Mobile network codes the platform may deliver notifications for
const VALID_NETWORK_IDS: &[&str] = &["214001", "222010", "234015", "262002", "262009", "286002"];

/// Platform services this portal subscribes to
const VALID_SERVICE_IDS: &[&str] = &[
    "antiSpam",
    "callForking",
    "callProtect",
    "volteRoaming",
    "verifiedBusiness",
];

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallNotification {
    pub call_event_notification: CallEventNotification,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEventNotification {
    pub event_description: EventDescription,
    pub calling_participant: String,
    pub called_participant: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDescription {
    pub call_event: String,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub action: Action,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub action_to_perform: String,
    pub display_name: String,
}

/// Error shape the platform expects back from subscribers
#[derive(Debug, Serialize)]
pub struct ProblemResponse {
    pub status: u16,
    pub title: String,
    pub detail: String,
}

// ============================================================================
// Handler
// ============================================================================

/// POST /callNotifications/v1/networks/{network_id}/notifications/services/{service_id}/callDirections
///
/// Look up the calling participant in the directory, record the call, and
/// tell the platform to let the call continue.
#[instrument(skip_all, fields(network_id = %network_id, service_id = %service_id))]
pub async fn call_directions(
    State(state): State<AppState>,
    Path((network_id, service_id)): Path<(String, String)>,
    body: Result<Json<CallNotification>, JsonRejection>,
) -> Response {
    let start = Instant::now();

    if !VALID_NETWORK_IDS.contains(&network_id.as_str()) {
        tracing::warn!("notification for unknown network");
        metrics::counter!("portal_webhooks_processed_total", "status" => "rejected").increment(1);
        return problem(
            StatusCode::BAD_REQUEST,
            format!("unknown network id: {network_id}"),
        );
    }

    if !VALID_SERVICE_IDS.contains(&service_id.as_str()) {
        tracing::warn!("notification for unknown service");
        metrics::counter!("portal_webhooks_processed_total", "status" => "rejected").increment(1);
        return problem(
            StatusCode::BAD_REQUEST,
            format!("unknown service id: {service_id}"),
        );
    }

    let Ok(Json(notification)) = body else {
        tracing::warn!("malformed notification body");
        metrics::counter!("portal_webhooks_processed_total", "status" => "rejected").increment(1);
        return problem(StatusCode::BAD_REQUEST, "malformed notification body");
    };

    let event = &notification.call_event_notification;
    if event.event_description.call_event.trim().is_empty()
        || event.calling_participant.trim().is_empty()
        || event.called_participant.trim().is_empty()
    {
        tracing::warn!("notification with empty fields");
        metrics::counter!("portal_webhooks_processed_total", "status" => "rejected").increment(1);
        return problem(
            StatusCode::BAD_REQUEST,
            "notification fields must be non-empty",
        );
    }

    let calling = strip_tel_prefix(&event.calling_participant);
    let called = strip_tel_prefix(&event.called_participant);

    let contact = match state.repos.contacts.find_by_number(calling).await {
        Ok(Some(contact)) => contact,
        Ok(None) => {
            tracing::info!("caller not in directory");
            metrics::counter!("portal_webhooks_processed_total", "status" => "unknown_caller")
                .increment(1);
            record_op_duration("process_call_notification", start, false);
            return problem(
                StatusCode::NOT_FOUND,
                format!("no contact for calling number {calling}"),
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "contact lookup failed");
            metrics::counter!("portal_webhooks_processed_total", "status" => "error").increment(1);
            record_op_duration("process_call_notification", start, false);
            return problem(StatusCode::BAD_GATEWAY, "contact lookup failed");
        }
    };

    let entry = CreateCallLog {
        id: Uuid::new_v4(),
        contact_id: contact.id,
        called_number: called.to_string(),
    };
    if let Err(e) = state.repos.call_logs.record(entry).await {
        tracing::error!(error = %e, "failed to record call event");
        metrics::counter!("portal_webhooks_processed_total", "status" => "error").increment(1);
        record_op_duration("process_call_notification", start, false);
        return problem(StatusCode::BAD_GATEWAY, "failed to record call event");
    }

    metrics::counter!("portal_webhooks_processed_total", "status" => "success").increment(1);
    record_op_duration("process_call_notification", start, true);
    tracing::info!(
        contact_id = %contact.id,
        call_event = %event.event_description.call_event,
        "call event recorded"
    );

    (
        StatusCode::OK,
        Json(ActionResponse {
            action: Action {
                action_to_perform: "Continue".to_string(),
                display_name: contact.display_name,
            },
        }),
    )
        .into_response()
}

// ============================================================================
// Helpers
// ============================================================================

fn strip_tel_prefix(participant: &str) -> &str {
    participant.strip_prefix("tel:").unwrap_or(participant)
}

fn problem(status: StatusCode, detail: impl Into<String>) -> Response {
    let title = match status {
        StatusCode::BAD_REQUEST => "Bad Request",
        StatusCode::NOT_FOUND => "Not Found",
        _ => "Generic Error",
    };

    (
        status,
        Json(ProblemResponse {
            status: status.as_u16(),
            title: title.to_string(),
            detail: detail.into(),
        }),
    )
        .into_response()
}
