use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row per buyer email. Renewals overwrite the period; rows are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EntitlementRow {
    pub email: String,
    pub plan: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub approved: bool,
    pub payment_id: Option<String>,
    pub source: String,
}

impl EntitlementRow {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.approved && self.period_end > now
    }
}
