use async_trait::async_trait;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::catalog::CatalogItem;

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Full catalog snapshot in stable id order.
    async fn list_items(&self) -> Result<Vec<CatalogItem>, AppError>;
}

pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogStore {
    async fn list_items(&self) -> Result<Vec<CatalogItem>, AppError> {
        Ok(sqlx::query_as::<_, CatalogItem>(
            r#"
            SELECT id, model_name, compatibility_description, is_premium
            FROM catalog_items
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }
}
