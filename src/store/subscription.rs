use std::fmt;

use super::store::WeakStore;

/// Handle identifying one subscriber of a [`StateStore`](crate::StateStore).
///
/// Ids are plain tokens: dropping one does nothing. Pass it to
/// [`StateStore::unsubscribe`](crate::StateStore::unsubscribe) to remove the
/// callback, or use [`StateStore::watch`](crate::StateStore::watch) for a
/// guard that unsubscribes on drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// RAII guard for a store watcher.
///
/// Holds only a weak reference to the store, so a guard outliving its store
/// is harmless.
#[must_use = "dropping a WatchGuard unsubscribes immediately"]
pub struct WatchGuard<V: Clone + PartialEq + 'static> {
    id: SubscriptionId,
    store: WeakStore<V>,
}

impl<V: Clone + PartialEq + 'static> WatchGuard<V> {
    pub(crate) fn new(id: SubscriptionId, store: WeakStore<V>) -> Self {
        Self { id, store }
    }

    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl<V: Clone + PartialEq + 'static> fmt::Debug for WatchGuard<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchGuard").field("id", &self.id).finish()
    }
}

impl<V: Clone + PartialEq + 'static> Drop for WatchGuard<V> {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            store.unsubscribe(self.id);
        }
    }
}
