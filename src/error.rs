use thiserror::Error;

use crate::store::SubscriptionId;

/// Error type returned by fallible subscriber callbacks.
pub type BoxError = Box<dyn std::error::Error + 'static>;

/// Why a single subscriber failed while being notified.
#[derive(Debug, Error)]
pub enum SubscriberError {
    #[error("{0}")]
    Failed(#[source] BoxError),

    #[error("subscriber panicked: {0}")]
    Panicked(String),
}

/// A subscriber that failed during one notification event.
#[derive(Debug, Error)]
#[error("subscriber {subscription} on `{key}` failed: {source}")]
pub struct SubscriberFailure {
    pub key: String,
    pub subscription: SubscriptionId,
    #[source]
    pub source: SubscriberError,
}

/// Failures collected over one complete notification pass.
///
/// Returned by [`StateStore::set`](crate::StateStore::set) and friends once
/// every other subscriber has been notified. Each failure has already been
/// logged at `warn` level when this error reaches the caller.
#[derive(Debug, Error)]
#[error("{}", summarize(.failures))]
pub struct NotifyError {
    failures: Vec<SubscriberFailure>,
}

impl NotifyError {
    pub(crate) fn new(failures: Vec<SubscriberFailure>) -> Self {
        Self { failures }
    }

    /// The individual failures, in the order they happened.
    #[must_use]
    pub fn failures(&self) -> &[SubscriberFailure] {
        &self.failures
    }

    #[must_use]
    pub fn into_failures(self) -> Vec<SubscriberFailure> {
        self.failures
    }
}

fn summarize(failures: &[SubscriberFailure]) -> String {
    match failures {
        [only] => only.to_string(),
        failures => format!("{} subscribers failed during notification", failures.len()),
    }
}

/// Errors raised by widget bindings while applying a value.
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("widget bound to `{key}` is already borrowed")]
    WidgetBusy { key: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(key: &str, id: u64) -> SubscriberFailure {
        SubscriberFailure {
            key: key.to_string(),
            subscription: SubscriptionId::from_raw(id),
            source: SubscriberError::Panicked("boom".to_string()),
        }
    }

    #[test]
    fn single_failure_display_names_key() {
        let err = NotifyError::new(vec![failure("x", 3)]);
        assert_eq!(
            err.to_string(),
            "subscriber #3 on `x` failed: subscriber panicked: boom"
        );
    }

    #[test]
    fn multiple_failures_display_count() {
        let err = NotifyError::new(vec![failure("x", 1), failure("y", 2)]);
        assert_eq!(err.to_string(), "2 subscribers failed during notification");
        assert_eq!(err.into_failures().len(), 2);
    }
}
