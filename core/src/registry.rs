//! Live line-to-topic bindings
//!
//! The [`SubscriptionRegistry`] owns one [`Binding`] per configured line,
//! together with the line's hardware handle and its bus subscription.

/// One configured line
pub mod binding;
pub mod subscription_registry;

#[cfg(test)]
mod registry_tests;

pub use binding::{Binding, BindingKey};
pub use subscription_registry::SubscriptionRegistry;
