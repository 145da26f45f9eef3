use axum::{body::Bytes, extract::State, Json};
use chrono::Utc;
use tracing::info;

use crate::checkout::preference::{build_preference, parse_request, CheckoutResponse};
use crate::errors::AppError;
use crate::state::AppState;

/// POST /checkout
pub async fn handle_checkout(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CheckoutResponse>, AppError> {
    let req = parse_request(&body)?;
    let (plan, preference) = build_preference(
        &req,
        &state.config.webhook_base_url,
        &state.config.notification_url(),
        Utc::now(),
    )?;

    let created = state.processor.create_preference(&preference).await?;
    info!(
        "Checkout preference {} created for {} ({plan})",
        created.id, preference.payer_email
    );

    Ok(Json(CheckoutResponse {
        init_point: created.init_point,
        id: created.id,
    }))
}
