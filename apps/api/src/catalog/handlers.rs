use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::filter::visible_rows;
use crate::errors::AppError;
use crate::models::catalog::CatalogItem;
use crate::state::AppState;
use crate::vip::query::is_vip;

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub email: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CatalogRow {
    pub modelo: String,
    pub compatibilidade: String,
}

impl From<CatalogItem> for CatalogRow {
    fn from(item: CatalogItem) -> Self {
        Self {
            modelo: item.model_name,
            compatibilidade: item.compatibility_description,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogResponse {
    pub success: bool,
    pub data: Vec<CatalogRow>,
    #[serde(rename = "isVIP")]
    pub is_vip: bool,
    pub total_shown: usize,
    pub message: String,
}

/// GET /catalog
pub async fn handle_catalog(
    State(state): State<AppState>,
    Query(params): Query<CatalogQuery>,
) -> Result<Json<CatalogResponse>, AppError> {
    let entitled = is_vip(state.entitlements.as_ref(), params.email.as_deref(), Utc::now()).await;
    let catalog = state.catalog.list_items().await?;

    let rows = visible_rows(
        &catalog,
        entitled,
        params.search.as_deref(),
        state.selection_policy.as_ref(),
    );

    info!(
        "Catalog request: vip={entitled}, policy={}, showing {} of {}",
        state.selection_policy.name(),
        rows.len(),
        catalog.len()
    );

    let message = if entitled {
        "VIP access: full catalog available".to_string()
    } else {
        format!(
            "Limited access: showing at most {} models. Subscribe to VIP for the full catalog",
            state.selection_policy.cap(catalog.len())
        )
    };

    Ok(Json(CatalogResponse {
        success: true,
        total_shown: rows.len(),
        data: rows.into_iter().map(CatalogRow::from).collect(),
        is_vip: entitled,
        message,
    }))
}
