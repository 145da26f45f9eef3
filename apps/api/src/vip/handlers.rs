use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::state::AppState;
use crate::vip::query::{vip_status, VipStatus};
use crate::vip::reconciler::{Notification, ReconcileOutcome, Reconciler};

#[derive(Debug, Default, Deserialize)]
pub struct WebhookQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub topic: Option<String>,
    pub id: Option<String>,
    #[serde(rename = "data.id")]
    pub data_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookBody {
    #[serde(rename = "type")]
    kind: Option<String>,
    topic: Option<String>,
    action: Option<String>,
    data: Option<WebhookData>,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookData {
    id: Option<Value>,
}

/// Payment ids arrive as strings or numbers depending on the notification flavour.
fn id_to_string(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Merges the JSON body with the query-string form of the notification.
/// Body fields win when both are present.
fn build_notification(query: WebhookQuery, body: &[u8]) -> Result<Notification, AppError> {
    let body: WebhookBody = if body.iter().all(u8::is_ascii_whitespace) {
        WebhookBody::default()
    } else {
        serde_json::from_slice(body).map_err(|e| {
            warn!("Rejecting unparseable webhook body: {e}");
            AppError::BadRequest("invalid notification body".into())
        })?
    };

    let payment_id = body
        .data
        .as_ref()
        .and_then(|d| d.id.as_ref())
        .and_then(id_to_string)
        .or(query.data_id)
        .or(query.id);

    Ok(Notification {
        kind: body.kind.or(body.topic).or(query.kind).or(query.topic),
        action: body.action,
        payment_id,
    })
}

/// POST /webhook/:processor
pub async fn handle_webhook(
    State(state): State<AppState>,
    Path(processor): Path<String>,
    Query(query): Query<WebhookQuery>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    if processor != state.processor.name() {
        return Err(AppError::NotFound(format!(
            "unknown payment processor '{processor}'"
        )));
    }

    let notification = build_notification(query, &body)?;
    debug!("Webhook notification from {processor}: {notification:?}");

    let outcome = Reconciler::new(state.processor.as_ref(), state.entitlements.as_ref())
        .reconcile(&notification, Utc::now())
        .await?;

    Ok(Json(outcome_body(outcome)))
}

fn outcome_body(outcome: ReconcileOutcome) -> Value {
    match outcome {
        ReconcileOutcome::Ignored { event } => json!({
            "message": "event ignored",
            "event": event,
        }),
        ReconcileOutcome::NotApproved { status } => json!({
            "message": "payment not approved yet",
            "status": status,
        }),
        ReconcileOutcome::Duplicate { payment_id } => json!({
            "message": "payment already processed",
            "duplicate": true,
            "payment_id": payment_id,
        }),
        ReconcileOutcome::Activated(summary) => json!({
            "success": true,
            "message": "VIP activated",
            "data": summary,
        }),
    }
}

/// GET /webhook/:processor
pub async fn handle_webhook_status(
    State(state): State<AppState>,
    Path(processor): Path<String>,
) -> Result<Json<Value>, AppError> {
    if processor != state.processor.name() {
        return Err(AppError::NotFound(format!(
            "unknown payment processor '{processor}'"
        )));
    }
    Ok(Json(json!({
        "message": format!("{processor} webhook is listening"),
        "timestamp": Utc::now(),
        "status": "online",
    })))
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

/// GET /vip/status
pub async fn handle_vip_status(
    State(state): State<AppState>,
    Query(params): Query<EmailQuery>,
) -> Json<VipStatus> {
    Json(vip_status(state.entitlements.as_ref(), params.email.as_deref(), Utc::now()).await)
}
