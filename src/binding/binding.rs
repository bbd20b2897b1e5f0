use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use crate::error::{BindingError, BoxError};
use crate::store::{StateStore, SubscriptionId};
use crate::widget::Widget;

use super::two_way::InputSlot;

/// Shared state of one binding, reachable from the handle and (weakly) from
/// the store callback.
pub(super) struct BindingInner {
    pub(super) key: String,
    // `Some` while bound
    subscription: Cell<Option<SubscriptionId>>,
    unsubscribe: Box<dyn Fn(SubscriptionId)>,
}

impl BindingInner {
    fn new<V: Clone + PartialEq + 'static>(key: String, store: &StateStore<V>) -> Rc<Self> {
        let store = store.downgrade();
        Rc::new(Self {
            key,
            subscription: Cell::new(None),
            unsubscribe: Box::new(move |id| {
                if let Some(store) = store.upgrade() {
                    store.unsubscribe(id);
                }
            }),
        })
    }

    pub(super) fn subscription(&self) -> Option<SubscriptionId> {
        self.subscription.get()
    }

    fn release(&self) {
        if let Some(id) = self.subscription.take() {
            (self.unsubscribe)(id);
            debug!(key = %self.key, subscription = %id, "binding released");
        }
    }
}

/// Handle to a widget bound to one state key.
///
/// A binding goes from bound to unbound exactly once. Calling
/// [`release`](Self::release) again, or dropping the handle after a release,
/// is a no-op. Dropping a bound handle releases it.
#[must_use = "dropping a Binding releases it immediately"]
pub struct Binding {
    pub(super) inner: Rc<BindingInner>,
}

impl Binding {
    /// Stop updating the widget. Idempotent.
    ///
    /// No further notification reaches the widget once this returns, even
    /// from a notification pass already in progress.
    pub fn release(&self) {
        self.inner.release();
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.inner.subscription().is_some()
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// The underlying store subscription, or `None` once released.
    #[must_use]
    pub fn subscription(&self) -> Option<SubscriptionId> {
        self.inner.subscription()
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("key", &self.inner.key)
            .field("subscription", &self.inner.subscription())
            .finish()
    }
}

impl Drop for Binding {
    fn drop(&mut self) {
        self.inner.release();
    }
}

/// Keep `widget` in sync with `key`.
///
/// Every write to `key` calls `apply(&mut widget, &value)` followed by
/// [`Widget::request_redraw`]. The store only holds a weak reference to the
/// widget: once the widget is dropped, the binding releases itself on the
/// next write.
///
/// With `StoreConfig::sync_on_bind` set, the
/// current value, if any, is applied immediately. If the widget is mutably
/// borrowed at that moment the initial sync is skipped and logged at `warn`.
///
/// A widget that is mutably borrowed when an update arrives is not touched;
/// the write reports [`BindingError::WidgetBusy`] in its `NotifyError`.
pub fn bind<V, W, F>(
    store: &StateStore<V>,
    key: impl Into<String>,
    widget: &Rc<RefCell<W>>,
    apply: F,
) -> Binding
where
    V: Clone + PartialEq + 'static,
    W: Widget,
    F: Fn(&mut W, &V) + 'static,
{
    attach(store, key.into(), widget, apply, None)
}

/// Subscribe `widget` to `key`. With an `input` slot, values that arrive
/// while the widget is busy reporting its own input are held there instead
/// of failing.
pub(super) fn attach<V, W, F>(
    store: &StateStore<V>,
    key: String,
    widget: &Rc<RefCell<W>>,
    apply: F,
    input: Option<Rc<InputSlot<V>>>,
) -> Binding
where
    V: Clone + PartialEq + 'static,
    W: Widget,
    F: Fn(&mut W, &V) + 'static,
{
    let inner = BindingInner::new(key.clone(), store);
    let apply = Rc::new(apply);

    let binding = Rc::downgrade(&inner);
    let target = Rc::downgrade(widget);
    let on_change = Rc::clone(&apply);
    let id = store.register(
        vec![key.clone()],
        Box::new(move |key: &str, value: &V| -> Result<(), BoxError> {
            let Some(cell) = target.upgrade() else {
                release_orphan(&binding);
                return Ok(());
            };
            let mut widget = match cell.try_borrow_mut() {
                Ok(widget) => widget,
                Err(_) if input.as_ref().is_some_and(|input| input.hold(value)) => {
                    trace!(key = %key, "widget busy with input, value held");
                    return Ok(());
                }
                Err(_) => {
                    return Err(BindingError::WidgetBusy {
                        key: key.to_string(),
                    }
                    .into())
                }
            };
            on_change(&mut *widget, value);
            widget.request_redraw();
            Ok(())
        }),
    );
    inner.subscription.set(Some(id));
    debug!(key = %key, subscription = %id, "widget bound");

    if store.config().sync_on_bind {
        if let Some(value) = store.get(&key) {
            match widget.try_borrow_mut() {
                Ok(mut widget) => {
                    apply(&mut *widget, &value);
                    widget.request_redraw();
                }
                Err(_) => {
                    let error = BindingError::WidgetBusy { key: key.clone() };
                    warn!(key = %key, error = %error, "initial sync skipped");
                }
            }
        }
    }

    Binding { inner }
}

fn release_orphan(binding: &Weak<BindingInner>) {
    if let Some(binding) = binding.upgrade() {
        debug!(key = %binding.key, "bound widget dropped");
        binding.release();
    }
}
