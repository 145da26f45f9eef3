pub mod catalog;
pub mod entitlement;
pub mod payment;
pub mod profile;
