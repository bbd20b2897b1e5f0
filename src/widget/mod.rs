//! Adapter traits for the host widget tree.
//!
//! The store knows nothing about a particular UI toolkit. A host makes its
//! widgets bindable by implementing [`Widget`], and [`InputWidget`] for
//! widgets that accept user input and take part in two-way bindings.

use crate::error::NotifyError;

/// Listener a two-way binding installs on an [`InputWidget`].
///
/// The widget calls it with the new value whenever the user changes it. When
/// a subscriber rewrote the value during that call, the store's final value
/// comes back as `Ok(Some(value))` and the widget should display it.
pub type ChangeListener<V> = Box<dyn Fn(V) -> Result<Option<V>, NotifyError>>;

/// A widget that can be refreshed by a binding.
pub trait Widget: 'static {
    /// Ask the host runtime to re-render this widget. Called after a bound
    /// value has been applied.
    fn request_redraw(&mut self);
}

/// A widget that reports user-driven value changes.
pub trait InputWidget<V>: Widget {
    /// Install `listener` as the widget's change handler, replacing any
    /// previous one.
    fn set_change_listener(&mut self, listener: ChangeListener<V>);
}
