use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Amounts up to this many cents buy a month (R$ 7,70 list price).
const MONTHLY_MAX_CENTS: i64 = 1_000;
/// Amounts up to this many cents buy a quarter (R$ 19,90 list price).
const QUARTERLY_MAX_CENTS: i64 = 2_500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Monthly,
    Quarterly,
    Yearly,
}

impl PlanType {
    pub fn days(self) -> i64 {
        match self {
            PlanType::Monthly => 30,
            PlanType::Quarterly => 90,
            PlanType::Yearly => 365,
        }
    }

    pub fn duration(self) -> Duration {
        Duration::days(self.days())
    }

    /// List price in BRL cents.
    pub fn price_cents(self) -> i64 {
        match self {
            PlanType::Monthly => 770,
            PlanType::Quarterly => 1_990,
            PlanType::Yearly => 5_990,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            PlanType::Monthly => "VIP 1 Mês",
            PlanType::Quarterly => "VIP 3 Meses",
            PlanType::Yearly => "VIP 1 Ano",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlanType::Monthly => "monthly",
            PlanType::Quarterly => "quarterly",
            PlanType::Yearly => "yearly",
        }
    }

    /// Infers the plan from the amount actually paid.
    pub fn from_amount_cents(cents: i64) -> Self {
        if cents <= MONTHLY_MAX_CENTS {
            PlanType::Monthly
        } else if cents <= QUARTERLY_MAX_CENTS {
            PlanType::Quarterly
        } else {
            PlanType::Yearly
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown plan type '{0}'")]
pub struct UnknownPlan(pub String);

impl FromStr for PlanType {
    type Err = UnknownPlan;

    /// Accepts the English tokens sent by checkout and the Portuguese ones
    /// stored by older records.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" | "mensal" => Ok(PlanType::Monthly),
            "quarterly" | "trimestral" => Ok(PlanType::Quarterly),
            "yearly" | "anual" => Ok(PlanType::Yearly),
            _ => Err(UnknownPlan(s.to_string())),
        }
    }
}

/// How the plan for a payment was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanSource {
    Token,
    Amount,
}

/// Picks the plan for a payment. A recognised plan token wins; otherwise the
/// paid amount decides.
pub fn resolve_plan(token: Option<&str>, amount_cents: i64) -> (PlanType, PlanSource) {
    if let Some(token) = token {
        match token.parse::<PlanType>() {
            Ok(plan) => return (plan, PlanSource::Token),
            Err(e) => tracing::warn!("{e}; inferring plan from amount {amount_cents}"),
        }
    }
    (PlanType::from_amount_cents(amount_cents), PlanSource::Amount)
}
