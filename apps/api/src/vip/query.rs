use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::vip::store::{normalize_email, EntitlementRepository};

/// Current VIP standing for one email.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VipStatus {
    #[serde(rename = "isVIP")]
    pub is_vip: bool,
    pub plan: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Looks up the entitlement for `email`. Fails closed: a missing email, a
/// lapsed or unapproved record, and any storage error all read as "not VIP".
pub async fn vip_status(
    store: &dyn EntitlementRepository,
    email: Option<&str>,
    now: DateTime<Utc>,
) -> VipStatus {
    let Some(email) = email.map(normalize_email).filter(|e| !e.is_empty()) else {
        return VipStatus::default();
    };

    match store.find_entitlement(&email).await {
        Ok(Some(entitlement)) if entitlement.is_active(now) => VipStatus {
            is_vip: true,
            plan: Some(entitlement.plan),
            expires_at: Some(entitlement.period_end),
        },
        Ok(Some(entitlement)) => {
            debug!("Entitlement for {email} expired at {}", entitlement.period_end);
            VipStatus::default()
        }
        Ok(None) => VipStatus::default(),
        Err(e) => {
            warn!("Entitlement lookup failed for {email}, treating as non-VIP: {e}");
            VipStatus::default()
        }
    }
}

pub async fn is_vip(
    store: &dyn EntitlementRepository,
    email: Option<&str>,
    now: DateTime<Utc>,
) -> bool {
    vip_status(store, email, now).await.is_vip
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::InMemoryStore;
    use chrono::Duration;

    #[tokio::test]
    async fn test_active_entitlement_is_vip() {
        let now = Utc::now();
        let store = InMemoryStore::default();
        store.seed_vip("vip@example.com", now + Duration::days(3));

        let status = vip_status(&store, Some("vip@example.com"), now).await;
        assert!(status.is_vip);
        assert_eq!(status.plan.as_deref(), Some("monthly"));
        assert_eq!(status.expires_at, Some(now + Duration::days(3)));
    }

    #[tokio::test]
    async fn test_lookup_normalizes_email() {
        let now = Utc::now();
        let store = InMemoryStore::default();
        store.seed_vip("vip@example.com", now + Duration::days(3));

        assert!(is_vip(&store, Some("  VIP@Example.com"), now).await);
    }

    #[tokio::test]
    async fn test_expired_entitlement_is_not_vip() {
        let now = Utc::now();
        let store = InMemoryStore::default();
        store.seed_vip("old@example.com", now - Duration::seconds(1));

        assert!(!is_vip(&store, Some("old@example.com"), now).await);
    }

    #[tokio::test]
    async fn test_missing_email_is_not_vip() {
        let store = InMemoryStore::default();
        assert!(!is_vip(&store, None, Utc::now()).await);
        assert!(!is_vip(&store, Some("   "), Utc::now()).await);
    }

    #[tokio::test]
    async fn test_lookup_error_fails_closed() {
        let now = Utc::now();
        let store = InMemoryStore::default();
        store.seed_vip("vip@example.com", now + Duration::days(3));
        store.fail_lookups();

        assert!(!is_vip(&store, Some("vip@example.com"), now).await);
    }
}
