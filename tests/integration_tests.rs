//! Integration tests for the state store

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use neostate::{StateStore, StoreConfig, SubscriberError};

#[test]
fn store_integration() {
    #[derive(Clone, PartialEq, Debug)]
    enum Value {
        Count(i32),
        Name(String),
    }

    let store = StateStore::new();

    // Test get with fallback
    assert_eq!(store.get_or("count", Value::Count(0)), Value::Count(0));

    // Test set
    store.set("count", Value::Count(42)).unwrap();
    store.set("name", Value::Name("test".to_string())).unwrap();
    assert_eq!(store.get("count"), Some(Value::Count(42)));
    assert_eq!(store.get("name"), Some(Value::Name("test".to_string())));

    // Test update
    store
        .update("count", |value| {
            if let Value::Count(n) = value {
                *n += 10;
            }
        })
        .unwrap();
    assert_eq!(store.get("count"), Some(Value::Count(52)));

    let mut keys = store.keys();
    keys.sort();
    assert_eq!(keys, vec!["count".to_string(), "name".to_string()]);
}

#[test]
fn store_subscription() {
    let store = StateStore::new();
    let counter = Rc::new(Cell::new(0usize));
    let counter_clone = counter.clone();

    let id = store.subscribe("n", move |_: &i32| {
        counter_clone.set(counter_clone.get() + 1);
    });

    assert_eq!(counter.get(), 0);

    store.set("n", 1).unwrap();
    assert_eq!(counter.get(), 1);

    store.update("n", |n| *n += 1).unwrap();
    assert_eq!(counter.get(), 2);

    assert!(store.unsubscribe(id));
    store.set("n", 3).unwrap();
    assert_eq!(counter.get(), 2);
}

#[test]
fn clones_share_values_and_subscribers() {
    let store = StateStore::new();
    let other = store.clone();
    let last = Rc::new(Cell::new(0));
    let last_clone = last.clone();

    store.subscribe("x", move |v: &i32| last_clone.set(*v));
    other.set("x", 9).unwrap();

    assert_eq!(store.get("x"), Some(9));
    assert_eq!(last.get(), 9);
}

#[test]
fn subscribers_see_every_write_in_order() {
    let store = StateStore::new();
    let first = Rc::new(RefCell::new(Vec::new()));
    let second = Rc::new(RefCell::new(Vec::new()));

    let log = first.clone();
    store.subscribe("k", move |v: &i32| log.borrow_mut().push(*v));
    let log = second.clone();
    store.subscribe("k", move |v: &i32| log.borrow_mut().push(*v));

    for v in [3, 1, 4, 1, 5] {
        store.set("k", v).unwrap();
    }
    assert_eq!(*first.borrow(), vec![3, 1, 4, 1, 5]);
    assert_eq!(*second.borrow(), vec![3, 1, 4, 1, 5]);
}

#[test]
fn registration_order_is_notification_order() {
    let store = StateStore::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    for name in ['A', 'B', 'C'] {
        let log = log.clone();
        store.subscribe("k", move |_: &i32| log.borrow_mut().push(name));
    }

    store.set("k", 1).unwrap();
    assert_eq!(*log.borrow(), vec!['A', 'B', 'C']);
}

#[test]
fn failing_subscriber_does_not_block_others() {
    let store = StateStore::new();
    let received = Rc::new(Cell::new(None));

    store.subscribe("x", |_: &i32| panic!("first subscriber broke"));
    let received_clone = received.clone();
    store.subscribe("x", move |v: &i32| received_clone.set(Some(*v)));

    let err = store.set("x", 5).unwrap_err();
    assert_eq!(received.get(), Some(5));
    assert_eq!(store.get("x"), Some(5));

    let failure = &err.failures()[0];
    assert_eq!(failure.key, "x");
    assert!(matches!(
        &failure.source,
        SubscriberError::Panicked(msg) if msg == "first subscriber broke"
    ));
}

#[test]
fn failures_from_several_subscribers_are_aggregated() {
    let store = StateStore::new();
    store.try_subscribe("x", |_: &i32| Err("one"));
    store.try_subscribe("x", |_: &i32| Err("two"));

    let err = store.set("x", 1).unwrap_err();
    let messages: Vec<String> = err.failures().iter().map(|f| f.source.to_string()).collect();
    assert_eq!(messages, vec!["one".to_string(), "two".to_string()]);
}

#[test]
fn unsubscribe_twice_is_noop() {
    let store: StateStore<i32> = StateStore::new();
    let id = store.subscribe("x", |_| {});
    assert!(store.unsubscribe(id));
    assert!(!store.unsubscribe(id));
    assert!(!store.is_subscribed(id));
}

#[test]
fn forced_notifications_with_skip_disabled() {
    let store = StateStore::with_config(StoreConfig::default().skip_unchanged(false));
    let calls = Rc::new(Cell::new(0u32));
    let calls_clone = calls.clone();
    store.subscribe("x", move |_: &&str| calls_clone.set(calls_clone.get() + 1));

    store.set("x", "same").unwrap();
    store.set("x", "same").unwrap();
    assert_eq!(calls.get(), 2);
}
