// VIP entitlements: plan table, period arithmetic, persistence,
// webhook reconciliation and the per-request VIP check.

pub mod expiry;
pub mod handlers;
pub mod plans;
pub mod query;
pub mod reconciler;
pub mod store;
