use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub is_vip: bool,
    pub vip_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileRow {
    /// Builds a profile for a buyer who never signed up. The display name is
    /// the local part of the email.
    pub fn guest(email: &str, now: DateTime<Utc>) -> Self {
        let name = email.split('@').next().unwrap_or(email).to_string();
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: Some(name),
            is_vip: false,
            vip_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Expiry that is still running at `now`, if the profile is VIP.
    pub fn active_expiry(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.vip_expires_at {
            Some(expires_at) if self.is_vip && expires_at > now => Some(expires_at),
            _ => None,
        }
    }
}
