//! Webhook reconciler: turns a processor notification into entitlement state,
//! at most once per external payment id.
//!
//! The notification's own status is never trusted: the payment is re-fetched
//! from the processor before anything is written. Failures are returned to the
//! caller; the processor's redelivery is the retry path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::payment::{PaymentAuditRow, STATUS_APPROVED};
use crate::payments::{PaymentDetails, PaymentProcessor};
use crate::vip::expiry::compute_period;
use crate::vip::plans::{resolve_plan, PlanType};
use crate::vip::store::{normalize_email, Activation, ActivationWrite, EntitlementRepository};

/// Provider-agnostic view of an incoming notification.
#[derive(Debug, Clone, Default)]
pub struct Notification {
    /// `type` or `topic` field, e.g. "payment".
    pub kind: Option<String>,
    /// `action` field, e.g. "payment.created".
    pub action: Option<String>,
    pub payment_id: Option<String>,
}

impl Notification {
    pub fn is_payment_event(&self) -> bool {
        self.kind.as_deref() == Some("payment")
            || self
                .action
                .as_deref()
                .is_some_and(|a| a.starts_with("payment."))
    }

    fn describe(&self) -> &str {
        self.kind
            .as_deref()
            .or(self.action.as_deref())
            .unwrap_or("unknown")
    }
}

/// Summary returned to the processor after a successful activation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivationSummary {
    pub email: String,
    pub user_id: Uuid,
    #[serde(rename = "plano")]
    pub plan: PlanType,
    pub inicio: DateTime<Utc>,
    pub expira_em: DateTime<Utc>,
    pub payment_id: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// Not a payment event.
    Ignored { event: String },
    /// Payment exists but is not approved yet.
    NotApproved { status: String },
    /// This payment id was already applied.
    Duplicate { payment_id: String },
    Activated(ActivationSummary),
}

/// Reference blob attached to the preference at checkout time.
#[derive(Debug, Default, Deserialize)]
struct ExternalReference {
    email: Option<String>,
    #[serde(rename = "planType")]
    plan_type: Option<String>,
}

fn parse_external_reference(raw: Option<&str>) -> ExternalReference {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return ExternalReference::default();
    };
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!("Could not parse external_reference '{raw}': {e}");
        ExternalReference::default()
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Buyer email, by priority: checkout reference, processor metadata, payer.
fn resolve_email(payment: &PaymentDetails, reference: &ExternalReference) -> Option<String> {
    non_empty(reference.email.as_deref())
        .or_else(|| non_empty(payment.metadata_str("email")))
        .or_else(|| non_empty(payment.payer_email()))
        .map(normalize_email)
}

/// Plan token, by priority: checkout reference, then metadata. The processor
/// snake-cases metadata keys, so both spellings are checked.
fn resolve_plan_token<'a>(
    payment: &'a PaymentDetails,
    reference: &'a ExternalReference,
) -> Option<&'a str> {
    non_empty(reference.plan_type.as_deref())
        .or_else(|| non_empty(payment.metadata_str("planType")))
        .or_else(|| non_empty(payment.metadata_str("plan_type")))
}

pub struct Reconciler<'a> {
    processor: &'a dyn PaymentProcessor,
    store: &'a dyn EntitlementRepository,
}

impl<'a> Reconciler<'a> {
    pub fn new(processor: &'a dyn PaymentProcessor, store: &'a dyn EntitlementRepository) -> Self {
        Self { processor, store }
    }

    pub async fn reconcile(
        &self,
        notification: &Notification,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, AppError> {
        // 1. Event filter
        if !notification.is_payment_event() {
            info!("Ignoring {} notification", notification.describe());
            return Ok(ReconcileOutcome::Ignored {
                event: notification.describe().to_string(),
            });
        }

        // 2. Payment id
        let payment_id = non_empty(notification.payment_id.as_deref())
            .ok_or_else(|| AppError::BadRequest("payment id not found".into()))?
            .trim()
            .to_string();

        // 3. Authoritative payment record
        info!("Fetching payment {payment_id} from {}", self.processor.name());
        let payment = self.processor.fetch_payment(&payment_id).await?;

        // 4. Only approved payments grant anything
        if payment.status != STATUS_APPROVED {
            info!(
                "Payment {payment_id} not approved yet (status: {})",
                payment.status
            );
            return Ok(ReconcileOutcome::NotApproved {
                status: payment.status,
            });
        }

        // 5. Buyer
        let reference = parse_external_reference(payment.external_reference.as_deref());
        let email = resolve_email(&payment, &reference).ok_or_else(|| {
            warn!("Payment {payment_id} carries no buyer email");
            AppError::BadRequest("email not found".into())
        })?;

        // 6. Plan
        let amount_cents = payment.amount_cents();
        let (plan, plan_source) = resolve_plan(resolve_plan_token(&payment, &reference), amount_cents);
        info!("Payment {payment_id}: {email} bought {plan} (from {plan_source:?})");

        // 7. Idempotency
        if let Some(existing) = self.store.find_payment(&payment_id).await? {
            if existing.is_settled() {
                info!("Payment {payment_id} already processed; skipping");
                return Ok(ReconcileOutcome::Duplicate { payment_id });
            }
        }

        // 8. Profile
        let profile = self.store.find_or_create_profile(&email, now).await?;

        // 9. Period
        let period = compute_period(now, profile.active_expiry(now), plan);

        // 10. Persist
        let activation = Activation {
            payment: PaymentAuditRow {
                id: Uuid::new_v4(),
                user_id: profile.id,
                payment_id: payment_id.clone(),
                amount_cents,
                currency: payment.currency().to_string(),
                method: payment.method().to_string(),
                status: STATUS_APPROVED.to_string(),
                raw_payload: if payment.raw.is_null() {
                    Value::Object(Default::default())
                } else {
                    payment.raw.clone()
                },
                processed: true,
                received_at: now,
            },
            profile_id: profile.id,
            email: email.clone(),
            plan,
            period,
            source: self.processor.name().to_string(),
            now,
        };

        if self.store.apply_activation(&activation).await? == ActivationWrite::AlreadyProcessed {
            info!("Payment {payment_id} was applied by a concurrent delivery");
            return Ok(ReconcileOutcome::Duplicate { payment_id });
        }

        info!(
            "VIP activated for {email} ({plan}) until {}; payment {payment_id}",
            period.end
        );

        // 11. Summary
        Ok(ReconcileOutcome::Activated(ActivationSummary {
            email,
            user_id: profile.id,
            plan,
            inicio: period.start,
            expira_em: period.end,
            payment_id,
            amount: payment.amount().unwrap_or_default(),
        }))
    }
}
