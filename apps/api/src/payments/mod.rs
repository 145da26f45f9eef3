//! Payment processor boundary.
//!
//! Only `mercado_pago` talks to the processor over HTTP. Everything else sees
//! the `PaymentProcessor` trait, carried in `AppState` as
//! `Arc<dyn PaymentProcessor>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod mercado_pago;

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Payer {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionDetails {
    pub total_paid_amount: Option<f64>,
}

/// Authoritative payment record fetched from the processor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentDetails {
    #[serde(default)]
    pub status: String,
    pub external_reference: Option<String>,
    pub metadata: Option<Value>,
    pub transaction_amount: Option<f64>,
    pub transaction_details: Option<TransactionDetails>,
    pub currency_id: Option<String>,
    pub payment_method_id: Option<String>,
    pub payment_type_id: Option<String>,
    pub payer: Option<Payer>,
    /// Full response body, kept for the audit record.
    #[serde(skip)]
    pub raw: Value,
}

impl PaymentDetails {
    /// Parses a processor response, keeping the raw JSON alongside.
    pub fn from_value(raw: Value) -> Result<Self, ProcessorError> {
        let mut details: PaymentDetails = serde_json::from_value(raw.clone())?;
        details.raw = raw;
        Ok(details)
    }

    /// Paid amount in the payment currency's major unit.
    pub fn amount(&self) -> Option<f64> {
        self.transaction_amount.or_else(|| {
            self.transaction_details
                .as_ref()
                .and_then(|d| d.total_paid_amount)
        })
    }

    pub fn amount_cents(&self) -> i64 {
        self.amount()
            .map(|amount| (amount * 100.0).round() as i64)
            .unwrap_or(0)
    }

    pub fn method(&self) -> &str {
        self.payment_method_id
            .as_deref()
            .or(self.payment_type_id.as_deref())
            .unwrap_or("unknown")
    }

    pub fn currency(&self) -> &str {
        self.currency_id.as_deref().unwrap_or("BRL")
    }

    pub fn payer_email(&self) -> Option<&str> {
        self.payer.as_ref().and_then(|p| p.email.as_deref())
    }

    /// Looks up a string field in processor metadata.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(key))
            .and_then(Value::as_str)
    }
}

/// Everything needed to open a hosted checkout page for one plan.
#[derive(Debug, Clone, Serialize)]
pub struct PreferenceRequest {
    pub title: String,
    pub unit_price: f64,
    pub currency_id: String,
    pub payer_email: String,
    pub back_url_base: String,
    pub notification_url: String,
    pub external_reference: String,
    pub metadata: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preference {
    pub id: String,
    pub init_point: String,
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Processor name as it appears in webhook paths and entitlement sources.
    fn name(&self) -> &'static str;

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentDetails, ProcessorError>;

    async fn create_preference(
        &self,
        request: &PreferenceRequest,
    ) -> Result<Preference, ProcessorError>;
}
