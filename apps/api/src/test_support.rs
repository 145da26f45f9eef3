//! Test doubles: an in-memory entitlement/catalog store and a scripted
//! payment processor.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::catalog::policy::{PolicyKind, QuotaPolicy};
use crate::catalog::store::CatalogRepository;
use crate::config::Config;
use crate::errors::AppError;
use crate::models::catalog::CatalogItem;
use crate::models::entitlement::EntitlementRow;
use crate::models::payment::PaymentAuditRow;
use crate::models::profile::ProfileRow;
use crate::payments::{
    Payer, PaymentDetails, PaymentProcessor, Preference, PreferenceRequest, ProcessorError,
};
use crate::state::AppState;
use crate::vip::store::{Activation, ActivationWrite, EntitlementRepository};

// ────────────────────────────────────────────────────────────────────────────
// Fixtures
// ────────────────────────────────────────────────────────────────────────────

pub fn catalog_item(id: i64, model: &str, compatibility: &str) -> CatalogItem {
    CatalogItem {
        id,
        model_name: model.to_string(),
        compatibility_description: compatibility.to_string(),
        is_premium: false,
    }
}

/// An approved payment whose reference, metadata and payer all carry `email`.
pub fn approved_payment(email: &str, plan: Option<&str>, amount: f64) -> PaymentDetails {
    let reference = match plan {
        Some(plan) => json!({ "email": email, "planType": plan }),
        None => json!({ "email": email }),
    };
    PaymentDetails {
        status: "approved".into(),
        external_reference: Some(reference.to_string()),
        metadata: Some(json!({ "email": email })),
        transaction_amount: Some(amount),
        transaction_details: None,
        currency_id: Some("BRL".into()),
        payment_method_id: Some("pix".into()),
        payment_type_id: Some("bank_transfer".into()),
        payer: Some(Payer {
            email: Some(email.to_string()),
        }),
        raw: json!({ "status": "approved", "transaction_amount": amount }),
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".into(),
        mercado_pago_token: "TEST-token".into(),
        mercado_pago_api_url: "http://processor.invalid".into(),
        webhook_base_url: "https://shop.example".into(),
        catalog_policy: PolicyKind::BrandQuota,
        catalog_free_limit: 49,
        catalog_free_percent: 10,
        port: 0,
        rust_log: "debug".into(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory store
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Tables {
    profiles: HashMap<String, ProfileRow>,
    entitlements: HashMap<String, EntitlementRow>,
    payments: HashMap<String, PaymentAuditRow>,
    catalog: Vec<CatalogItem>,
    mutations: usize,
    fail_lookups: bool,
    lose_next_activation: bool,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn with_catalog(catalog: Vec<CatalogItem>) -> Self {
        let store = Self::default();
        store.tables.lock().unwrap().catalog = catalog;
        store
    }

    /// Seeds a running monthly entitlement ending at `expires_at`.
    pub fn seed_vip(&self, email: &str, expires_at: DateTime<Utc>) {
        let mut tables = self.tables.lock().unwrap();
        let mut profile = ProfileRow::guest(email, expires_at - Duration::days(30));
        profile.is_vip = true;
        profile.vip_expires_at = Some(expires_at);
        tables.profiles.insert(email.to_string(), profile);
        tables.entitlements.insert(
            email.to_string(),
            EntitlementRow {
                email: email.to_string(),
                plan: "monthly".into(),
                period_start: expires_at - Duration::days(30),
                period_end: expires_at,
                approved: true,
                payment_id: Some("seed".into()),
                source: "mercado_pago".into(),
            },
        );
    }

    /// Seeds an audit record that was stored but never applied.
    pub fn seed_pending_payment(&self, payment_id: &str, email: &str) {
        let mut tables = self.tables.lock().unwrap();
        let profile = ProfileRow::guest(email, Utc::now());
        tables.payments.insert(
            payment_id.to_string(),
            PaymentAuditRow {
                id: Uuid::new_v4(),
                user_id: profile.id,
                payment_id: payment_id.to_string(),
                amount_cents: 770,
                currency: "BRL".into(),
                method: "pix".into(),
                status: "pending".into(),
                raw_payload: json!({}),
                processed: false,
                received_at: Utc::now(),
            },
        );
        tables.profiles.insert(email.to_string(), profile);
    }

    pub fn fail_lookups(&self) {
        self.tables.lock().unwrap().fail_lookups = true;
    }

    /// Makes the next `apply_activation` behave as if a concurrent delivery won.
    pub fn fail_next_activation_as_processed(&self) {
        self.tables.lock().unwrap().lose_next_activation = true;
    }

    pub fn mutation_count(&self) -> usize {
        self.tables.lock().unwrap().mutations
    }

    pub fn entitlement(&self, email: &str) -> Option<EntitlementRow> {
        self.tables.lock().unwrap().entitlements.get(email).cloned()
    }

    pub fn profile(&self, email: &str) -> Option<ProfileRow> {
        self.tables.lock().unwrap().profiles.get(email).cloned()
    }

    pub fn payment(&self, payment_id: &str) -> Option<PaymentAuditRow> {
        self.tables.lock().unwrap().payments.get(payment_id).cloned()
    }
}

#[async_trait]
impl EntitlementRepository for InMemoryStore {
    async fn find_payment(&self, payment_id: &str) -> Result<Option<PaymentAuditRow>, AppError> {
        Ok(self.payment(payment_id))
    }

    async fn find_or_create_profile(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<ProfileRow, AppError> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(profile) = tables.profiles.get(email) {
            return Ok(profile.clone());
        }
        let profile = ProfileRow::guest(email, now);
        tables.profiles.insert(email.to_string(), profile.clone());
        tables.mutations += 1;
        Ok(profile)
    }

    async fn apply_activation(&self, activation: &Activation) -> Result<ActivationWrite, AppError> {
        let mut tables = self.tables.lock().unwrap();
        if std::mem::take(&mut tables.lose_next_activation) {
            return Ok(ActivationWrite::AlreadyProcessed);
        }
        let payment_id = &activation.payment.payment_id;
        if tables.payments.get(payment_id).is_some_and(|p| p.processed) {
            return Ok(ActivationWrite::AlreadyProcessed);
        }

        tables
            .payments
            .insert(payment_id.clone(), activation.payment.clone());

        if let Some(profile) = tables
            .profiles
            .values_mut()
            .find(|p| p.id == activation.profile_id)
        {
            profile.is_vip = true;
            profile.vip_expires_at = Some(activation.period.end);
            profile.updated_at = activation.now;
        }

        tables.entitlements.insert(
            activation.email.clone(),
            EntitlementRow {
                email: activation.email.clone(),
                plan: activation.plan.as_str().to_string(),
                period_start: activation.period.start,
                period_end: activation.period.end,
                approved: true,
                payment_id: Some(payment_id.clone()),
                source: activation.source.clone(),
            },
        );
        tables.mutations += 1;
        Ok(ActivationWrite::Applied)
    }

    async fn find_entitlement(&self, email: &str) -> Result<Option<EntitlementRow>, AppError> {
        let tables = self.tables.lock().unwrap();
        if tables.fail_lookups {
            return Err(AppError::Internal(anyhow::anyhow!("lookup unavailable")));
        }
        Ok(tables
            .entitlements
            .get(email)
            .filter(|e| e.approved)
            .cloned())
    }
}

#[async_trait]
impl CatalogRepository for InMemoryStore {
    async fn list_items(&self) -> Result<Vec<CatalogItem>, AppError> {
        Ok(self.tables.lock().unwrap().catalog.clone())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scripted processor
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct ScriptedProcessor {
    payments: HashMap<String, PaymentDetails>,
    fetches: AtomicUsize,
    preferences: Mutex<Vec<PreferenceRequest>>,
}

impl ScriptedProcessor {
    pub fn with_payment(payment_id: &str, payment: PaymentDetails) -> Self {
        let mut processor = Self::default();
        processor.payments.insert(payment_id.to_string(), payment);
        processor
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn preferences(&self) -> Vec<PreferenceRequest> {
        self.preferences.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProcessor for ScriptedProcessor {
    fn name(&self) -> &'static str {
        "mercado_pago"
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentDetails, ProcessorError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.payments
            .get(payment_id)
            .cloned()
            .ok_or_else(|| ProcessorError::Api {
                status: 404,
                message: "Payment not found".into(),
            })
    }

    async fn create_preference(
        &self,
        request: &PreferenceRequest,
    ) -> Result<Preference, ProcessorError> {
        let mut preferences = self.preferences.lock().unwrap();
        preferences.push(request.clone());
        let id = format!("pref-{}", preferences.len());
        Ok(Preference {
            init_point: format!("https://processor.example/checkout?pref_id={id}"),
            id,
        })
    }
}

/// App state wired to the in-memory doubles.
pub fn test_state(processor: Arc<ScriptedProcessor>, store: Arc<InMemoryStore>) -> AppState {
    AppState {
        config: test_config(),
        processor,
        entitlements: store.clone(),
        catalog: store,
        selection_policy: Arc::new(QuotaPolicy::brands(49)),
    }
}
