//! Widget bindings.
//!
//! A [`Binding`] ties one state key to one widget: store writes are applied
//! to the widget and followed by a redraw request. Two-way bindings also feed
//! user input back into the store.
//!
//! Every binding is either bound or unbound, and unbound is terminal. The
//! transition happens on [`Binding::release`], when the handle or its
//! [`BindingScope`] is dropped, or when the widget itself is gone.

mod binding;
mod scope;
mod two_way;

pub use binding::{bind, Binding};
pub use scope::BindingScope;
pub use two_way::bind_two_way;
