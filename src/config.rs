//! Store configuration.

/// Behavior switches for a [`StateStore`](crate::StateStore).
///
/// # Examples
///
/// ```
/// use neostate::{StateStore, StoreConfig};
///
/// let config = StoreConfig::default().skip_unchanged(false);
/// let store: StateStore<i32> = StateStore::with_config(config);
/// assert!(!store.config().skip_unchanged);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StoreConfig {
    /// Skip notification when a write stores a value equal to the current one.
    pub skip_unchanged: bool,
    /// Apply the current value to a widget as soon as it is bound.
    pub sync_on_bind: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            skip_unchanged: true,
            sync_on_bind: false,
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn skip_unchanged(mut self, skip: bool) -> Self {
        self.skip_unchanged = skip;
        self
    }

    #[must_use]
    pub fn sync_on_bind(mut self, sync: bool) -> Self {
        self.sync_on_bind = sync;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = StoreConfig::default();
        assert!(config.skip_unchanged);
        assert!(!config.sync_on_bind);
    }

    #[test]
    fn builder_setters() {
        let config = StoreConfig::default()
            .skip_unchanged(false)
            .sync_on_bind(true);
        assert!(!config.skip_unchanged);
        assert!(config.sync_on_bind);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_fills_missing_fields() {
        let config: StoreConfig = serde_json::from_str(r#"{"sync_on_bind": true}"#).unwrap();
        assert_eq!(config, StoreConfig::default().sync_on_bind(true));
    }
}
