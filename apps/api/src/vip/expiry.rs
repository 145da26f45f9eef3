use chrono::{DateTime, Utc};

use crate::vip::plans::PlanType;

/// The entitlement window produced by one approved payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Computes the new entitlement period for a payment.
///
/// A running entitlement is extended from its current expiry; a lapsed or
/// missing one starts at `now`. The plan duration is added exactly once, so
/// `end == max(now, current_expiry) + duration`.
pub fn compute_period(
    now: DateTime<Utc>,
    current_expiry: Option<DateTime<Utc>>,
    plan: PlanType,
) -> Period {
    let base = match current_expiry {
        Some(expiry) if expiry > now => expiry,
        _ => now,
    };
    Period {
        start: now,
        end: base + plan.duration(),
    }
}
