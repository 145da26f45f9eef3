use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::errors::AppError;
use crate::payments::PreferenceRequest;
use crate::vip::plans::PlanType;
use crate::vip::store::normalize_email;

const CURRENCY: &str = "BRL";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub plan_type: Option<String>,
    pub email: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub init_point: String,
    pub id: String,
}

/// Blob attached to the preference and echoed back on the payment, which the
/// reconciler reads first when resolving buyer and plan.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutReference<'a> {
    plan_type: PlanType,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
    timestamp: i64,
}

fn validate_email(raw: Option<&str>) -> Result<String, AppError> {
    let email = raw.map(normalize_email).unwrap_or_default();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !email.contains(' '),
        None => false,
    };
    if !valid {
        return Err(AppError::BadRequest("a valid email is required".into()));
    }
    Ok(email)
}

/// Decodes the raw request body. Any malformed body is a 400 with a JSON error.
pub fn parse_request(body: &[u8]) -> Result<CheckoutRequest, AppError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::warn!("Rejecting unparseable checkout body: {e}");
        AppError::BadRequest("invalid checkout request body".into())
    })
}

/// Validates a checkout request and builds the processor preference for it.
pub fn build_preference(
    request: &CheckoutRequest,
    back_url_base: &str,
    notification_url: &str,
    now: DateTime<Utc>,
) -> Result<(PlanType, PreferenceRequest), AppError> {
    let plan = request
        .plan_type
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("invalid plan type".into()))?
        .parse::<PlanType>()
        .map_err(|_| AppError::BadRequest("invalid plan type".into()))?;
    let email = validate_email(request.email.as_deref())?;

    let reference = CheckoutReference {
        plan_type: plan,
        email: &email,
        user_id: request.user_id.as_deref().filter(|id| !id.is_empty()),
        timestamp: now.timestamp_millis(),
    };
    let external_reference = serde_json::to_string(&reference)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to encode reference: {e}")))?;

    Ok((
        plan,
        PreferenceRequest {
            title: plan.title().to_string(),
            unit_price: plan.price_cents() as f64 / 100.0,
            currency_id: CURRENCY.to_string(),
            payer_email: email.clone(),
            back_url_base: back_url_base.to_string(),
            notification_url: notification_url.to_string(),
            external_reference,
            metadata: json!({ "email": email, "planType": plan }),
        },
    ))
}
