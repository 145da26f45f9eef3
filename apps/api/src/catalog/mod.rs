// Compatibility catalog, gated by VIP status.
// Non-VIP requesters get a policy-chosen subset; search runs after the cut.

pub mod filter;
pub mod handlers;
pub mod policy;
pub mod store;
