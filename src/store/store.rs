//! Keyed state container with synchronous change notification.
//!
//! # Design
//!
//! [`StateStore<V>`] keeps one value per string key in shared,
//! reference-counted storage (`Rc<RefCell<..>>`). Every write bumps the key's
//! version, marks it dirty and notifies the key's subscribers in registration
//! order before `set` returns.
//!
//! # Re-entrancy
//!
//! Callbacks may read and write the store. A write made while a notification
//! pass is running updates the value at once, but its notification is queued
//! behind the event being delivered. The outermost `set` drains the queue, so
//! each subscriber sees a key's values in exactly the order they were written.
//!
//! # Failure Modes
//!
//! - **Failing subscriber**: an `Err` return or a panic is caught, logged at
//!   `warn`, and collected. The remaining subscribers still run, and the
//!   collected failures come back as a [`NotifyError`] from the outermost
//!   `set` once the queue is empty.
//! - **Panic outside a subscriber** (a value's `Drop`, say): the pass is
//!   abandoned, its remaining queue is discarded with a `warn`, and the store
//!   goes back to notifying normally on the next write.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use crate::config::StoreConfig;
use crate::error::{BoxError, NotifyError, SubscriberFailure};

use super::registry::{Callback, Registry};
use super::subscription::{SubscriptionId, WatchGuard};

struct Slot<V> {
    value: V,
    version: u64,
    dirty: bool,
}

/// A write whose subscribers have not been notified yet.
struct Pending<V> {
    key: String,
    value: V,
    /// Subscriber that produced the write and must not hear it back.
    origin: Option<SubscriptionId>,
}

struct StoreInner<V> {
    config: StoreConfig,
    values: HashMap<String, Slot<V>>,
    // keys in the order they first became dirty
    dirty: Vec<String>,
    registry: Registry<V>,
    pending: VecDeque<Pending<V>>,
    dispatching: bool,
}

impl<V: PartialEq> StoreInner<V> {
    /// Store `value` under `key`. Returns `false` when the write is skipped
    /// because the value did not change.
    fn write(&mut self, key: &str, value: V) -> bool {
        let skip_unchanged = self.config.skip_unchanged;
        match self.values.get_mut(key) {
            Some(slot) => {
                if skip_unchanged && slot.value == value {
                    return false;
                }
                slot.value = value;
                slot.version += 1;
                if !slot.dirty {
                    slot.dirty = true;
                    self.dirty.push(key.to_string());
                }
            }
            None => {
                self.values.insert(
                    key.to_string(),
                    Slot {
                        value,
                        version: 1,
                        dirty: true,
                    },
                );
                self.dirty.push(key.to_string());
            }
        }
        true
    }
}

/// Ends the notification pass when dropped, including during unwinding, so a
/// panic outside a subscriber cannot leave later writes queued forever.
struct DispatchGuard<'a, V> {
    inner: &'a RefCell<StoreInner<V>>,
}

impl<V> Drop for DispatchGuard<'_, V> {
    fn drop(&mut self) {
        let Ok(mut inner) = self.inner.try_borrow_mut() else {
            return;
        };
        inner.dispatching = false;
        if std::thread::panicking() && !inner.pending.is_empty() {
            warn!(
                dropped = inner.pending.len(),
                "notification pass unwound, queued writes not delivered"
            );
            inner.pending.clear();
        }
    }
}

/// Single source of truth for a widget tree's shared state.
///
/// Cloning a `StateStore` creates a new handle to the **same** store. Pass
/// it explicitly to whatever needs it; there is no global instance.
///
/// The store is single-threaded (`!Send`, `!Sync`), matching the UI loop it
/// serves.
///
/// # Examples
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use neostate::StateStore;
///
/// let store = StateStore::new();
/// let seen = Rc::new(RefCell::new(Vec::new()));
///
/// let log = Rc::clone(&seen);
/// let id = store.subscribe("count", move |v: &i32| log.borrow_mut().push(*v));
///
/// store.set("count", 1).unwrap();
/// store.set("count", 2).unwrap();
/// assert_eq!(store.get_or("count", 0), 2);
/// assert_eq!(*seen.borrow(), vec![1, 2]);
///
/// assert!(store.unsubscribe(id));
/// assert!(!store.unsubscribe(id));
/// ```
pub struct StateStore<V> {
    inner: Rc<RefCell<StoreInner<V>>>,
}

impl<V> Clone for StateStore<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V: Clone + PartialEq + 'static> Default for StateStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for StateStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("StateStore")
            .field("keys", &inner.values.len())
            .field("dirty", &inner.dirty)
            .field("pending", &inner.pending.len())
            .field("config", &inner.config)
            .finish()
    }
}

impl<V: Clone + PartialEq + 'static> StateStore<V> {
    /// Create an empty store with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    #[must_use]
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(StoreInner {
                config,
                values: HashMap::new(),
                dirty: Vec::new(),
                registry: Registry::new(),
                pending: VecDeque::new(),
                dispatching: false,
            })),
        }
    }

    #[must_use]
    pub fn config(&self) -> StoreConfig {
        self.inner.borrow().config
    }

    /// Get a clone of the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<V> {
        self.inner.borrow().values.get(key).map(|slot| slot.value.clone())
    }

    /// Get the value stored under `key`, or `default` if the key was never
    /// written.
    #[must_use]
    pub fn get_or(&self, key: &str, default: V) -> V {
        self.get(key).unwrap_or(default)
    }

    /// Read the value under `key` by reference without cloning.
    ///
    /// The closure must not write to the store.
    pub fn with<R>(&self, key: &str, f: impl FnOnce(Option<&V>) -> R) -> R {
        let inner = self.inner.borrow();
        f(inner.values.get(key).map(|slot| &slot.value))
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.borrow().values.contains_key(key)
    }

    /// All keys currently present, in no particular order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.borrow().values.keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().values.is_empty()
    }

    /// Number of stored writes to `key`; `0` for a key never written.
    #[must_use]
    pub fn version(&self, key: &str) -> u64 {
        self.inner
            .borrow()
            .values
            .get(key)
            .map_or(0, |slot| slot.version)
    }

    /// Whether `key` was written since the last [`take_dirty`](Self::take_dirty).
    #[must_use]
    pub fn is_dirty(&self, key: &str) -> bool {
        self.inner
            .borrow()
            .values
            .get(key)
            .is_some_and(|slot| slot.dirty)
    }

    /// Drain the dirty keys in the order they were first written, clearing
    /// their dirty flags.
    pub fn take_dirty(&self) -> Vec<String> {
        let mut inner = self.inner.borrow_mut();
        let dirty = std::mem::take(&mut inner.dirty);
        for key in &dirty {
            if let Some(slot) = inner.values.get_mut(key) {
                slot.dirty = false;
            }
        }
        dirty
    }

    /// Write `value` under `key` and notify the key's subscribers.
    ///
    /// The key is created if missing. When `StoreConfig::skip_unchanged` is
    /// set (the default), writing a value equal to the current one is a no-op:
    /// no version bump and no notification.
    ///
    /// Subscribers run synchronously in registration order. A failing
    /// subscriber does not stop the others; all failures of the pass are
    /// returned together once notification is complete.
    pub fn set(&self, key: impl Into<String>, value: V) -> Result<(), NotifyError> {
        self.write(key.into(), value, None)
    }

    /// Like [`set`](Self::set), but the subscriber `origin` is not notified
    /// of this write. Used by two-way bindings so a widget never receives its
    /// own input back.
    pub fn set_from(
        &self,
        key: impl Into<String>,
        value: V,
        origin: SubscriptionId,
    ) -> Result<(), NotifyError> {
        self.write(key.into(), value, Some(origin))
    }

    /// Modify the value under `key` in place and notify as [`set`](Self::set)
    /// would. Does nothing if the key is absent.
    pub fn update(&self, key: &str, f: impl FnOnce(&mut V)) -> Result<(), NotifyError> {
        let Some(mut value) = self.get(key) else {
            return Ok(());
        };
        f(&mut value);
        self.write(key.to_string(), value, None)
    }

    fn write(
        &self,
        key: String,
        value: V,
        origin: Option<SubscriptionId>,
    ) -> Result<(), NotifyError> {
        {
            let mut inner = self.inner.borrow_mut();
            if !inner.write(&key, value.clone()) {
                trace!(key = %key, "value unchanged, notification skipped");
                return Ok(());
            }
            trace!(key = %key, version = inner.values[&key].version, "state written");
            inner.pending.push_back(Pending { key, value, origin });
            if inner.dispatching {
                return Ok(());
            }
            inner.dispatching = true;
        }

        let failures = {
            let _dispatch = DispatchGuard { inner: &self.inner };
            self.drain()
        };
        if failures.is_empty() {
            Ok(())
        } else {
            Err(NotifyError::new(failures))
        }
    }

    /// Deliver queued writes until none remain.
    fn drain(&self) -> Vec<SubscriberFailure> {
        let mut failures = Vec::new();
        loop {
            let (pending, subscribers) = {
                let mut inner = self.inner.borrow_mut();
                let Some(pending) = inner.pending.pop_front() else {
                    break;
                };
                let subscribers = inner.registry.snapshot(&pending.key);
                (pending, subscribers)
            };

            for subscriber in subscribers {
                // unsubscribed earlier in this pass, or the writer itself
                if !subscriber.is_active() || pending.origin == Some(subscriber.id()) {
                    continue;
                }
                if let Err(source) = subscriber.invoke(&pending.key, &pending.value) {
                    warn!(
                        key = %pending.key,
                        subscription = %subscriber.id(),
                        error = %source,
                        "subscriber failed"
                    );
                    failures.push(SubscriberFailure {
                        key: pending.key.clone(),
                        subscription: subscriber.id(),
                        source,
                    });
                }
            }
        }
        failures
    }

    /// Call `callback` with the new value on every future write to `key`.
    pub fn subscribe(
        &self,
        key: impl Into<String>,
        callback: impl Fn(&V) + 'static,
    ) -> SubscriptionId {
        self.register(
            vec![key.into()],
            Box::new(move |_, value| {
                callback(value);
                Ok(())
            }),
        )
    }

    /// Like [`subscribe`](Self::subscribe) for callbacks that can fail.
    /// Errors are reported through the [`NotifyError`] of the triggering `set`.
    pub fn try_subscribe<E>(
        &self,
        key: impl Into<String>,
        callback: impl Fn(&V) -> Result<(), E> + 'static,
    ) -> SubscriptionId
    where
        E: Into<BoxError>,
    {
        self.register(
            vec![key.into()],
            Box::new(move |_, value| callback(value).map_err(Into::into)),
        )
    }

    /// Register one callback on several keys. The callback receives the key
    /// that changed along with its value.
    pub fn subscribe_keys<I, K>(
        &self,
        keys: I,
        callback: impl Fn(&str, &V) + 'static,
    ) -> SubscriptionId
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.register(
            keys.into_iter().map(Into::into).collect(),
            Box::new(move |key, value| {
                callback(key, value);
                Ok(())
            }),
        )
    }

    /// Subscribe to `key` and call `callback` right away with the current
    /// value, if there is one. The returned guard unsubscribes on drop.
    pub fn watch(
        &self,
        key: impl Into<String>,
        callback: impl Fn(&V) + 'static,
    ) -> WatchGuard<V> {
        let key = key.into();
        let callback = Rc::new(callback);
        let registered = Rc::clone(&callback);
        let id = self.subscribe(key.clone(), move |value| registered(value));

        if let Some(value) = self.get(&key) {
            callback(&value);
        }
        WatchGuard::new(id, self.downgrade())
    }

    pub(crate) fn register(&self, keys: Vec<String>, callback: Callback<V>) -> SubscriptionId {
        let id = self.inner.borrow_mut().registry.insert(keys.clone(), callback);
        debug!(subscription = %id, keys = ?keys, "subscribed");
        id
    }

    /// Remove a subscriber. Safe to call repeatedly; returns `true` only for
    /// the call that actually removed it.
    ///
    /// Takes effect immediately: a subscriber removed while a notification
    /// pass is running is not called for the rest of that pass.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.inner.borrow_mut().registry.remove(id);
        if removed {
            debug!(subscription = %id, "unsubscribed");
        }
        removed
    }

    #[must_use]
    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.inner.borrow().registry.contains(id)
    }

    /// Number of live subscribers on `key`.
    #[must_use]
    pub fn subscriber_count(&self, key: &str) -> usize {
        self.inner.borrow().registry.count(key)
    }

    pub(crate) fn downgrade(&self) -> WeakStore<V> {
        WeakStore {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

/// Non-owning store reference held by subscriber callbacks and guards.
pub(crate) struct WeakStore<V> {
    inner: Weak<RefCell<StoreInner<V>>>,
}

impl<V> Clone for WeakStore<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<V> WeakStore<V> {
    pub(crate) fn upgrade(&self) -> Option<StateStore<V>> {
        self.inner.upgrade().map(|inner| StateStore { inner })
    }
}
