use anyhow::{Context, Result};

use crate::catalog::policy::PolicyKind;

const DEFAULT_MERCADO_PAGO_API_URL: &str = "https://api.mercadopago.com";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Supabase Postgres connection string, including the service credential.
    pub database_url: String,
    pub mercado_pago_token: String,
    pub mercado_pago_api_url: String,
    /// Public base URL used for checkout back-links and the notification URL.
    pub webhook_base_url: String,
    pub catalog_policy: PolicyKind,
    pub catalog_free_limit: usize,
    pub catalog_free_percent: u8,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let catalog_free_percent = optional_env("CATALOG_FREE_PERCENT", "10")
            .parse::<u8>()
            .context("CATALOG_FREE_PERCENT must be an integer between 0 and 100")?;
        if catalog_free_percent > 100 {
            anyhow::bail!("CATALOG_FREE_PERCENT must be an integer between 0 and 100");
        }

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            mercado_pago_token: require_env("MERCADO_PAGO_TOKEN")?,
            mercado_pago_api_url: optional_env("MERCADO_PAGO_API_URL", DEFAULT_MERCADO_PAGO_API_URL)
                .trim_end_matches('/')
                .to_string(),
            webhook_base_url: require_env("WEBHOOK_BASE_URL")?
                .trim_end_matches('/')
                .to_string(),
            catalog_policy: optional_env("CATALOG_POLICY", "brand_quota")
                .parse::<PolicyKind>()
                .context("CATALOG_POLICY must be one of prefix, percentage, brand_quota, product_line, premium_flag")?,
            catalog_free_limit: optional_env("CATALOG_FREE_LIMIT", "49")
                .parse::<usize>()
                .context("CATALOG_FREE_LIMIT must be a non-negative integer")?,
            catalog_free_percent,
            port: optional_env("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG", "info"),
        })
    }

    /// URL the processor posts payment notifications to.
    pub fn notification_url(&self) -> String {
        format!("{}/webhook/mercado_pago", self.webhook_base_url)
    }
}

fn require_env(key: &str) -> Result<String> {
    let value = std::env::var(key)
        .with_context(|| format!("Required environment variable '{key}' is not set"))?;
    if value.trim().is_empty() {
        anyhow::bail!("Required environment variable '{key}' is empty");
    }
    Ok(value)
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
