use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

pub const STATUS_APPROVED: &str = "approved";

/// Audit trail of processor payments, keyed by the processor's payment id.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentAuditRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub payment_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub method: String,
    pub status: String,
    pub raw_payload: Value,
    pub processed: bool,
    pub received_at: DateTime<Utc>,
}

impl PaymentAuditRow {
    /// True once an approved delivery has been fully applied.
    pub fn is_settled(&self) -> bool {
        self.processed && self.status == STATUS_APPROVED
    }
}
