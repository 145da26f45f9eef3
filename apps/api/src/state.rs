use std::sync::Arc;

use crate::catalog::policy::SelectionPolicy;
use crate::catalog::store::CatalogRepository;
use crate::config::Config;
use crate::payments::PaymentProcessor;
use crate::vip::store::EntitlementRepository;

/// Shared application state injected into all route handlers via Axum extractors.
/// Holds no mutable data; every request reads and writes through the stores.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Payment processor client. Default: MercadoPagoClient.
    pub processor: Arc<dyn PaymentProcessor>,
    pub entitlements: Arc<dyn EntitlementRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    /// Free-tier selection policy, chosen once at startup via CATALOG_POLICY.
    pub selection_policy: Arc<dyn SelectionPolicy>,
}
