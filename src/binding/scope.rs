use tracing::debug;

use super::binding::Binding;

/// Owns the bindings of one widget or component.
///
/// The host calls [`teardown`](Self::teardown) when it unmounts the widget;
/// dropping the scope has the same effect.
#[derive(Debug, Default)]
pub struct BindingScope {
    bindings: Vec<Binding>,
}

impl BindingScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `binding` until teardown.
    pub fn push(&mut self, binding: Binding) {
        self.bindings.push(binding);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Release every binding in registration order. Safe to call again.
    pub fn teardown(&mut self) {
        if self.bindings.is_empty() {
            return;
        }
        debug!(bindings = self.bindings.len(), "binding scope torn down");
        for binding in self.bindings.drain(..) {
            binding.release();
        }
    }
}

impl Extend<Binding> for BindingScope {
    fn extend<I: IntoIterator<Item = Binding>>(&mut self, iter: I) {
        self.bindings.extend(iter);
    }
}

impl Drop for BindingScope {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::binding::binding::tests::Label;
    use crate::binding::bind;
    use crate::store::StateStore;

    #[test]
    fn teardown_releases_all_bindings() {
        let store = StateStore::new();
        let title = Rc::new(RefCell::new(Label::default()));
        let count = Rc::new(RefCell::new(Label::default()));

        let mut scope = BindingScope::new();
        scope.push(bind(&store, "title", &title, |w: &mut Label, v: &i32| {
            w.text = v.to_string();
        }));
        scope.extend([bind(&store, "count", &count, |w: &mut Label, v: &i32| {
            w.text = v.to_string();
        })]);
        assert_eq!(scope.len(), 2);

        scope.teardown();
        scope.teardown();
        assert!(scope.is_empty());
        assert_eq!(store.subscriber_count("title"), 0);
        assert_eq!(store.subscriber_count("count"), 0);

        store.set("title", 1).unwrap();
        assert_eq!(title.borrow().text, "");
    }

    #[test]
    fn dropping_scope_tears_down() {
        let store = StateStore::new();
        let widget = Rc::new(RefCell::new(Label::default()));
        {
            let mut scope = BindingScope::new();
            scope.push(bind(&store, "x", &widget, |w: &mut Label, v: &i32| {
                w.text = v.to_string();
            }));
            assert_eq!(store.subscriber_count("x"), 1);
        }
        assert_eq!(store.subscriber_count("x"), 0);
    }
}
