//! # Neostate
//!
//! Shared state for widget trees, with bindings that keep widgets in sync.
//!
//! ## Store
//!
//! [`StateStore`] is the single source of truth: a map from string keys to
//! values. Writes notify the key's subscribers synchronously, in
//! registration order.
//! - `get` / `get_or` / `set` / `update`
//! - `subscribe` / `try_subscribe` / `subscribe_keys` / `watch`
//! - `unsubscribe`, idempotent
//!
//! ## Bindings
//!
//! [`bind`] and [`bind_two_way`] connect a key to a host widget implementing
//! [`Widget`]. A [`BindingScope`] collects a component's bindings and
//! releases them when the component is unmounted.
//!
//! Everything here is single-threaded, matching the UI loop it serves.

pub mod binding;
pub mod config;
pub mod error;
pub mod store;
pub mod widget;

// Re-export main types for convenience
pub use binding::{bind, bind_two_way, Binding, BindingScope};
pub use config::StoreConfig;
pub use error::{BindingError, BoxError, NotifyError, SubscriberError, SubscriberFailure};
pub use store::{StateStore, SubscriptionId, WatchGuard};
pub use widget::{ChangeListener, InputWidget, Widget};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_works() {
        // Basic smoke test
        let store = StateStore::new();
        assert_eq!(store.get_or("count", 0), 0);
        store.set("count", 42).unwrap();
        assert_eq!(store.get_or("count", 0), 42);
    }
}
