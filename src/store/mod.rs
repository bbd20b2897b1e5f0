//! Keyed shared state with change subscriptions.
//!
//! A [`StateStore`] owns the current value of every state key and notifies
//! subscribers synchronously when a key is written.

mod registry;
mod store;
mod subscription;

pub use store::StateStore;
pub use subscription::{SubscriptionId, WatchGuard};
