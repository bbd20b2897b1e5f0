//! Subscriber bookkeeping for a single store.

use std::cell::Cell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::error::{BoxError, SubscriberError};

use super::subscription::SubscriptionId;

pub(crate) type Callback<V> = Box<dyn Fn(&str, &V) -> Result<(), BoxError>>;

/// One registered callback. Shared between every key it listens on.
pub(crate) struct Subscriber<V> {
    id: SubscriptionId,
    active: Cell<bool>,
    callback: Callback<V>,
}

impl<V> Subscriber<V> {
    pub(crate) fn id(&self) -> SubscriptionId {
        self.id
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Run the callback, turning both `Err` returns and panics into a
    /// [`SubscriberError`].
    pub(crate) fn invoke(&self, key: &str, value: &V) -> Result<(), SubscriberError> {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.callback)(key, value))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(SubscriberError::Failed(err)),
            Err(payload) => Err(SubscriberError::Panicked(panic_message(payload.as_ref()))),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Maps keys to their subscribers in registration order.
pub(crate) struct Registry<V> {
    next_id: u64,
    // key -> subscribers, in registration order
    by_key: HashMap<String, Vec<Rc<Subscriber<V>>>>,
    // subscriber -> keys it listens on
    keys_of: HashMap<SubscriptionId, Vec<String>>,
}

impl<V> Registry<V> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 0,
            by_key: HashMap::new(),
            keys_of: HashMap::new(),
        }
    }

    /// Register `callback` on every key in `keys`.
    pub(crate) fn insert(&mut self, keys: Vec<String>, callback: Callback<V>) -> SubscriptionId {
        let id = SubscriptionId::from_raw(self.next_id);
        self.next_id += 1;

        let subscriber = Rc::new(Subscriber {
            id,
            active: Cell::new(true),
            callback,
        });
        for key in &keys {
            let list = self.by_key.entry(key.clone()).or_default();
            if !list.iter().any(|s| s.id == id) {
                list.push(Rc::clone(&subscriber));
            }
        }
        self.keys_of.insert(id, keys);
        id
    }

    /// Deactivate and drop a subscriber. Returns `false` if it was already gone.
    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        let Some(keys) = self.keys_of.remove(&id) else {
            return false;
        };
        for key in keys {
            if let Some(list) = self.by_key.get_mut(&key) {
                list.retain(|s| {
                    if s.id == id {
                        s.active.set(false);
                        false
                    } else {
                        true
                    }
                });
                if list.is_empty() {
                    self.by_key.remove(&key);
                }
            }
        }
        true
    }

    /// Clone the current subscriber list of `key` for one dispatch pass.
    pub(crate) fn snapshot(&self, key: &str) -> Vec<Rc<Subscriber<V>>> {
        self.by_key.get(key).cloned().unwrap_or_default()
    }

    pub(crate) fn count(&self, key: &str) -> usize {
        self.by_key.get(key).map_or(0, Vec::len)
    }

    pub(crate) fn contains(&self, id: SubscriptionId) -> bool {
        self.keys_of.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Callback<i32> {
        Box::new(|_, _| Ok(()))
    }

    #[test]
    fn ids_are_unique_and_ordered() {
        let mut registry = Registry::new();
        let a = registry.insert(vec!["x".into()], noop());
        let b = registry.insert(vec!["x".into()], noop());
        assert!(a < b);

        let order: Vec<_> = registry.snapshot("x").iter().map(|s| s.id()).collect();
        assert_eq!(order, vec![a, b]);
    }

    #[test]
    fn remove_deactivates_snapshot_entries() {
        let mut registry = Registry::new();
        let id = registry.insert(vec!["x".into(), "y".into()], noop());
        let snapshot = registry.snapshot("x");

        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(!snapshot[0].is_active());
        assert_eq!(registry.count("x"), 0);
        assert_eq!(registry.count("y"), 0);
    }

    #[test]
    fn duplicate_keys_register_once() {
        let mut registry = Registry::new();
        registry.insert(vec!["x".into(), "x".into()], noop());
        assert_eq!(registry.count("x"), 1);
    }

    #[test]
    fn invoke_catches_panics() {
        let mut registry: Registry<i32> = Registry::new();
        registry.insert(vec!["x".into()], Box::new(|_, _| panic!("bad widget")));
        let err = registry.snapshot("x")[0].invoke("x", &1).unwrap_err();
        assert!(matches!(err, SubscriberError::Panicked(msg) if msg == "bad widget"));
    }
}
