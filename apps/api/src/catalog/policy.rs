//! Free-tier selection policies.
//!
//! Non-VIP requesters see a bounded subset of the catalog. How that subset is
//! chosen is a `SelectionPolicy`, picked once at startup from config and held
//! in `AppState` as `Arc<dyn SelectionPolicy>`. Every policy is a pure
//! function of the catalog snapshot: same rows in, same rows out.

use std::str::FromStr;
use std::sync::Arc;

use crate::config::Config;
use crate::models::catalog::CatalogItem;

pub trait SelectionPolicy: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Upper bound on how many rows `select` returns for a catalog of `total` rows.
    fn cap(&self, total: usize) -> usize;

    fn select(&self, catalog: &[CatalogItem]) -> Vec<CatalogItem>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    Prefix,
    Percentage,
    BrandQuota,
    ProductLine,
    PremiumFlag,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown catalog policy '{0}'")]
pub struct UnknownPolicy(pub String);

impl FromStr for PolicyKind {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "prefix" => Ok(PolicyKind::Prefix),
            "percentage" => Ok(PolicyKind::Percentage),
            "brand_quota" => Ok(PolicyKind::BrandQuota),
            "product_line" => Ok(PolicyKind::ProductLine),
            "premium_flag" => Ok(PolicyKind::PremiumFlag),
            other => Err(UnknownPolicy(other.to_string())),
        }
    }
}

/// Builds the configured policy.
pub fn from_config(config: &Config) -> Arc<dyn SelectionPolicy> {
    match config.catalog_policy {
        PolicyKind::Prefix => Arc::new(PrefixPolicy {
            limit: config.catalog_free_limit,
        }),
        PolicyKind::Percentage => Arc::new(PercentagePolicy {
            percent: config.catalog_free_percent,
        }),
        PolicyKind::BrandQuota => Arc::new(QuotaPolicy::brands(config.catalog_free_limit)),
        PolicyKind::ProductLine => Arc::new(QuotaPolicy::product_lines(config.catalog_free_limit)),
        PolicyKind::PremiumFlag => Arc::new(PremiumFlagPolicy {
            limit: config.catalog_free_limit,
        }),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Prefix / percentage
// ────────────────────────────────────────────────────────────────────────────

/// First `limit` rows in catalog order.
pub struct PrefixPolicy {
    pub limit: usize,
}

impl SelectionPolicy for PrefixPolicy {
    fn name(&self) -> &'static str {
        "prefix"
    }

    fn cap(&self, total: usize) -> usize {
        self.limit.min(total)
    }

    fn select(&self, catalog: &[CatalogItem]) -> Vec<CatalogItem> {
        catalog.iter().take(self.cap(catalog.len())).cloned().collect()
    }
}

/// First `percent`% of rows, rounded up so a non-empty catalog always shows something.
pub struct PercentagePolicy {
    pub percent: u8,
}

impl SelectionPolicy for PercentagePolicy {
    fn name(&self) -> &'static str {
        "percentage"
    }

    fn cap(&self, total: usize) -> usize {
        let percent = usize::from(self.percent.min(100));
        (total * percent).div_ceil(100)
    }

    fn select(&self, catalog: &[CatalogItem]) -> Vec<CatalogItem> {
        catalog.iter().take(self.cap(catalog.len())).cloned().collect()
    }
}

/// Rows the catalog itself marks as free (`is_premium = false`), in catalog
/// order, up to `limit`.
pub struct PremiumFlagPolicy {
    pub limit: usize,
}

impl SelectionPolicy for PremiumFlagPolicy {
    fn name(&self) -> &'static str {
        "premium_flag"
    }

    fn cap(&self, total: usize) -> usize {
        self.limit.min(total)
    }

    fn select(&self, catalog: &[CatalogItem]) -> Vec<CatalogItem> {
        catalog
            .iter()
            .filter(|item| !item.is_premium)
            .take(self.limit)
            .cloned()
            .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Quota selection (brands, product lines)
// ────────────────────────────────────────────────────────────────────────────

/// A named group of models recognised by keywords in the model name.
#[derive(Debug, Clone)]
pub struct QuotaBucket {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub quota: usize,
}

impl QuotaBucket {
    fn claims(&self, model_lower: &str) -> bool {
        self.keywords.iter().any(|k| model_lower.contains(k))
    }
}

const SAMSUNG_KEYWORDS: &[&str] = &[
    "samsung", "galaxy", "sm-", "a0", "a1", "a2", "a3", "a4", "a5", "a6", "a7", "a8", "a9", "j0",
    "j1", "j2", "j3", "j4", "j5", "j6", "j7", "j8", "s20", "s21", "s22", "s23", "s24", "note",
    "m10", "m20", "m30",
];

/// Buckets are matched in order, so more specific brands come first
/// ("redmi note" is Xiaomi, not a Samsung Note).
fn brand_buckets() -> Vec<QuotaBucket> {
    vec![
        QuotaBucket {
            name: "iphone",
            keywords: &["iphone", "apple"],
            quota: 15,
        },
        QuotaBucket {
            name: "motorola",
            keywords: &["motorola", "moto"],
            quota: 10,
        },
        QuotaBucket {
            name: "xiaomi",
            keywords: &["xiaomi", "redmi", "poco", "mi "],
            quota: 9,
        },
        QuotaBucket {
            name: "samsung",
            keywords: SAMSUNG_KEYWORDS,
            quota: 15,
        },
    ]
}

fn product_line_buckets() -> Vec<QuotaBucket> {
    vec![
        QuotaBucket {
            name: "iphone",
            keywords: &["iphone"],
            quota: 10,
        },
        QuotaBucket {
            name: "redmi_note",
            keywords: &["redmi note"],
            quota: 6,
        },
        QuotaBucket {
            name: "redmi_poco",
            keywords: &["redmi", "poco"],
            quota: 5,
        },
        QuotaBucket {
            name: "moto_g",
            keywords: &["moto g"],
            quota: 7,
        },
        QuotaBucket {
            name: "moto_e",
            keywords: &["moto e"],
            quota: 5,
        },
        QuotaBucket {
            name: "galaxy_s",
            keywords: &["galaxy s", "samsung s"],
            quota: 5,
        },
        QuotaBucket {
            name: "galaxy_a_m",
            keywords: &["galaxy a", "samsung a", "galaxy m", "samsung m"],
            quota: 11,
        },
    ]
}

/// Takes up to `quota` rows from each bucket in catalog order, then fills the
/// remaining room up to `limit` with rows no bucket claimed.
///
/// Rows are classified against `buckets` in order, but groups are emitted in
/// `emit_order`, so output order can differ from matching order.
pub struct QuotaPolicy {
    name: &'static str,
    buckets: Vec<QuotaBucket>,
    emit_order: Vec<usize>,
    limit: usize,
}

impl QuotaPolicy {
    /// Emits groups in bucket order.
    pub fn new(name: &'static str, buckets: Vec<QuotaBucket>, limit: usize) -> Self {
        let emit_order = (0..buckets.len()).collect();
        Self {
            name,
            buckets,
            emit_order,
            limit,
        }
    }

    /// Samsung 15, iPhone 15, Motorola 10, Xiaomi 9, emitted in that order.
    /// Samsung is matched last because its keywords are the broadest.
    pub fn brands(limit: usize) -> Self {
        let mut policy = Self::new("brand_quota", brand_buckets(), limit);
        policy.emit_order = vec![3, 0, 1, 2];
        policy
    }

    pub fn product_lines(limit: usize) -> Self {
        Self::new("product_line", product_line_buckets(), limit)
    }

    /// Index of the first bucket claiming the model, or `None` for "others".
    fn classify(&self, item: &CatalogItem) -> Option<usize> {
        let model = item.model_name.to_lowercase();
        self.buckets.iter().position(|b| b.claims(&model))
    }
}

impl SelectionPolicy for QuotaPolicy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn cap(&self, total: usize) -> usize {
        self.limit.min(total)
    }

    fn select(&self, catalog: &[CatalogItem]) -> Vec<CatalogItem> {
        let mut groups: Vec<Vec<&CatalogItem>> = vec![Vec::new(); self.buckets.len()];
        let mut others = Vec::new();

        for item in catalog {
            match self.classify(item) {
                Some(idx) => groups[idx].push(item),
                None => others.push(item),
            }
        }

        let mut selected: Vec<CatalogItem> = self
            .emit_order
            .iter()
            .flat_map(|&idx| groups[idx].iter().take(self.buckets[idx].quota))
            .map(|item| (*item).clone())
            .collect();

        let room = self.limit.saturating_sub(selected.len());
        selected.extend(others.into_iter().take(room).cloned());
        selected.truncate(self.limit);

        tracing::debug!(
            "{} policy selected {} of {} rows",
            self.name,
            selected.len(),
            catalog.len()
        );
        selected
    }
}
