use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::trace;

use crate::error::BindingError;
use crate::store::StateStore;
use crate::widget::{ChangeListener, InputWidget};

use super::binding::{attach, Binding};

/// Store value held back while the bound widget reports its own input.
///
/// The host usually still borrows the widget when the change listener runs,
/// so a nested write to the same key (a subscriber normalizing the input, for
/// example) cannot be applied directly. It is kept here and handed back to
/// the widget as the listener's return value.
pub(super) struct InputSlot<V> {
    reporting: Cell<bool>,
    settled: RefCell<Option<V>>,
}

impl<V: Clone> InputSlot<V> {
    fn new() -> Rc<Self> {
        Rc::new(Self {
            reporting: Cell::new(false),
            settled: RefCell::new(None),
        })
    }

    /// Keep `value` if the widget is reporting input. Returns `false` when
    /// no report is in progress.
    pub(super) fn hold(&self, value: &V) -> bool {
        if !self.reporting.get() {
            return false;
        }
        *self.settled.borrow_mut() = Some(value.clone());
        true
    }

    /// Run `report` with holding enabled, then take whatever value was held.
    fn report<R>(&self, report: impl FnOnce() -> R) -> (R, Option<V>) {
        let was_reporting = self.reporting.replace(true);
        let result = report();
        self.reporting.set(was_reporting);
        (result, self.settled.borrow_mut().take())
    }
}

/// Bind `widget` to `key` in both directions.
///
/// Store writes reach the widget exactly as with [`bind`](super::bind). In
/// addition a change listener is installed on the widget; each user edit it
/// reports is written to the store once. That write is never echoed back to
/// the widget it came from, while every other subscriber of `key` still sees
/// it.
///
/// If a subscriber rewrites `key` while the edit is being delivered, the
/// listener returns the final value as `Ok(Some(value))` so the widget can
/// show what the store settled on.
///
/// After the binding is released the listener stays installed but does
/// nothing.
///
/// # Errors
///
/// Returns [`BindingError::WidgetBusy`] if `widget` is already mutably
/// borrowed. Nothing stays subscribed in that case.
pub fn bind_two_way<V, W, F>(
    store: &StateStore<V>,
    key: impl Into<String>,
    widget: &Rc<RefCell<W>>,
    apply: F,
) -> Result<Binding, BindingError>
where
    V: Clone + PartialEq + 'static,
    W: InputWidget<V>,
    F: Fn(&mut W, &V) + 'static,
{
    let key = key.into();
    let input = InputSlot::new();
    let binding = attach(store, key.clone(), widget, apply, Some(Rc::clone(&input)));
    let Ok(mut target) = widget.try_borrow_mut() else {
        return Err(BindingError::WidgetBusy { key });
    };
    target.set_change_listener(change_listener(store, &binding, input));
    Ok(binding)
}

fn change_listener<V>(
    store: &StateStore<V>,
    binding: &Binding,
    input: Rc<InputSlot<V>>,
) -> ChangeListener<V>
where
    V: Clone + PartialEq + 'static,
{
    let store = store.downgrade();
    let binding = Rc::downgrade(&binding.inner);
    Box::new(move |value| {
        let Some(binding) = binding.upgrade() else {
            return Ok(None);
        };
        let (Some(origin), Some(store)) = (binding.subscription(), store.upgrade()) else {
            return Ok(None);
        };
        trace!(key = %binding.key, "widget input");
        let (result, settled) =
            input.report(|| store.set_from(binding.key.clone(), value, origin));
        result.map(|()| settled)
    })
}
