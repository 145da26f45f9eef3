mod catalog;
mod checkout;
mod config;
mod db;
mod errors;
mod models;
mod payments;
mod routes;
mod state;
#[cfg(test)]
mod test_support;
mod vip;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::catalog::store::PgCatalogStore;
use crate::config::Config;
use crate::db::create_pool;
use crate::payments::mercado_pago::MercadoPagoClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::vip::store::PgEntitlementStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting VIP API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (profiles, entitlements, payments, catalog)
    let db = create_pool(&config.database_url).await?;

    // Initialize payment processor client
    let processor = MercadoPagoClient::new(
        config.mercado_pago_api_url.clone(),
        config.mercado_pago_token.clone(),
    )?;
    info!("Mercado Pago client initialized ({})", config.mercado_pago_api_url);
    info!("Notification URL: {}", config.notification_url());

    let selection_policy = catalog::policy::from_config(&config);
    info!(
        "Catalog free-tier policy: {} (limit {}, percent {})",
        selection_policy.name(),
        config.catalog_free_limit,
        config.catalog_free_percent
    );

    // Build app state
    let state = AppState {
        config: config.clone(),
        processor: Arc::new(processor),
        entitlements: Arc::new(PgEntitlementStore::new(db.clone())),
        catalog: Arc::new(PgCatalogStore::new(db)),
        selection_policy,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the storefront domain

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
