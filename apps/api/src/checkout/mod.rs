// Hosted checkout: turns a plan choice into a processor payment page.

pub mod handlers;
pub mod preference;
