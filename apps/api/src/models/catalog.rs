use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CatalogItem {
    pub id: i64,
    pub model_name: String,
    pub compatibility_description: String,
    pub is_premium: bool,
}

impl CatalogItem {
    /// Case-insensitive substring match against model and compatibility text.
    /// `needle` must already be lower-cased.
    pub fn matches(&self, needle: &str) -> bool {
        self.model_name.to_lowercase().contains(needle)
            || self.compatibility_description.to_lowercase().contains(needle)
    }
}
