//! Entitlement persistence.
//!
//! `EntitlementRepository` is the only way the reconciler and the entitlement
//! query touch storage. `PgEntitlementStore` is the Postgres implementation;
//! tests use the in-memory one from `test_support`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::entitlement::EntitlementRow;
use crate::models::payment::PaymentAuditRow;
use crate::models::profile::ProfileRow;
use crate::vip::expiry::Period;
use crate::vip::plans::PlanType;

/// Trims and lower-cases an email so every table stores one canonical form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// All writes produced by one approved payment. Applied atomically.
#[derive(Debug, Clone)]
pub struct Activation {
    pub payment: PaymentAuditRow,
    pub profile_id: Uuid,
    pub email: String,
    pub plan: PlanType,
    pub period: Period,
    pub source: String,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationWrite {
    Applied,
    /// Another delivery of the same payment id got there first.
    AlreadyProcessed,
}

#[async_trait]
pub trait EntitlementRepository: Send + Sync {
    async fn find_payment(&self, payment_id: &str) -> Result<Option<PaymentAuditRow>, AppError>;

    /// Returns the profile for `email`, inserting a guest profile if none exists.
    async fn find_or_create_profile(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<ProfileRow, AppError>;

    /// Writes the payment audit record, the profile flags and the entitlement
    /// record in one transaction. The audit upsert only succeeds while the
    /// stored row is unprocessed, which makes concurrent redeliveries safe.
    async fn apply_activation(&self, activation: &Activation) -> Result<ActivationWrite, AppError>;

    async fn find_entitlement(&self, email: &str) -> Result<Option<EntitlementRow>, AppError>;
}

pub struct PgEntitlementStore {
    pool: PgPool,
}

impl PgEntitlementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntitlementRepository for PgEntitlementStore {
    async fn find_payment(&self, payment_id: &str) -> Result<Option<PaymentAuditRow>, AppError> {
        Ok(sqlx::query_as::<_, PaymentAuditRow>(
            "SELECT * FROM vip_payments WHERE payment_id = $1",
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_or_create_profile(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<ProfileRow, AppError> {
        let guest = ProfileRow::guest(email, now);

        // ON CONFLICT keeps a concurrent signup or delivery from failing us.
        let inserted = sqlx::query(
            r#"
            INSERT INTO profiles (id, email, name, is_vip, vip_expires_at, created_at, updated_at)
            VALUES ($1, $2, $3, FALSE, NULL, $4, $4)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(guest.id)
        .bind(&guest.email)
        .bind(&guest.name)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() > 0 {
            info!("Created guest profile {} for {}", guest.id, email);
        }

        Ok(
            sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE email = $1")
                .bind(email)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn apply_activation(&self, activation: &Activation) -> Result<ActivationWrite, AppError> {
        let Activation {
            payment,
            profile_id,
            email,
            plan,
            period,
            source,
            now,
        } = activation;

        let mut tx = self.pool.begin().await?;

        // 1. Payment audit record. The WHERE clause turns a redelivery into a no-op.
        let audit = sqlx::query(
            r#"
            INSERT INTO vip_payments
                (id, user_id, payment_id, amount_cents, currency, method, status,
                 raw_payload, processed, received_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE, $9)
            ON CONFLICT (payment_id) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                amount_cents = EXCLUDED.amount_cents,
                currency = EXCLUDED.currency,
                method = EXCLUDED.method,
                status = EXCLUDED.status,
                raw_payload = EXCLUDED.raw_payload,
                processed = TRUE
            WHERE vip_payments.processed = FALSE
            "#,
        )
        .bind(payment.id)
        .bind(payment.user_id)
        .bind(&payment.payment_id)
        .bind(payment.amount_cents)
        .bind(&payment.currency)
        .bind(&payment.method)
        .bind(&payment.status)
        .bind(&payment.raw_payload)
        .bind(payment.received_at)
        .execute(&mut *tx)
        .await?;

        if audit.rows_affected() == 0 {
            debug!("Payment {} already processed; rolling back", payment.payment_id);
            tx.rollback().await?;
            return Ok(ActivationWrite::AlreadyProcessed);
        }

        // 2. Denormalized flags on the profile
        sqlx::query(
            "UPDATE profiles SET is_vip = TRUE, vip_expires_at = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(profile_id)
        .bind(period.end)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        // 3. Entitlement record keyed by email
        sqlx::query(
            r#"
            INSERT INTO vip_entitlements
                (email, plan, period_start, period_end, approved, payment_id, source,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, TRUE, $5, $6, $7, $7)
            ON CONFLICT (email) DO UPDATE SET
                plan = EXCLUDED.plan,
                period_start = EXCLUDED.period_start,
                period_end = EXCLUDED.period_end,
                approved = TRUE,
                payment_id = EXCLUDED.payment_id,
                source = EXCLUDED.source,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(email)
        .bind(plan.as_str())
        .bind(period.start)
        .bind(period.end)
        .bind(&payment.payment_id)
        .bind(source)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ActivationWrite::Applied)
    }

    async fn find_entitlement(&self, email: &str) -> Result<Option<EntitlementRow>, AppError> {
        Ok(sqlx::query_as::<_, EntitlementRow>(
            r#"
            SELECT email, plan, period_start, period_end, approved, payment_id, source
            FROM vip_entitlements
            WHERE email = $1 AND approved = TRUE
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ana.Souza@Example.COM "), "ana.souza@example.com");
        assert_eq!(normalize_email("x@y.z"), "x@y.z");
    }
}
