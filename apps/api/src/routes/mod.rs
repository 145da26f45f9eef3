pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::catalog::handlers as catalog;
use crate::checkout::handlers as checkout;
use crate::state::AppState;
use crate::vip::handlers as vip;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/webhook/:processor",
            post(vip::handle_webhook).get(vip::handle_webhook_status),
        )
        .route("/vip/status", get(vip::handle_vip_status))
        .route("/checkout", post(checkout::handle_checkout))
        .route("/catalog", get(catalog::handle_catalog))
        .with_state(state)
}
