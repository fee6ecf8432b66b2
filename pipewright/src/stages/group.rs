//! Keyed handler collections for parallel groups.

use super::StageHandler;
use std::sync::Arc;

/// Handlers keyed by name, run together as one parallel group.
///
/// Keys are unique; inserting an existing key replaces its handler in
/// place. Iteration follows insertion order.
#[derive(Clone, Default)]
pub struct StageGroup {
    entries: Vec<(String, Arc<dyn StageHandler>)>,
}

impl StageGroup {
    /// Creates an empty group.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handler.
    #[must_use]
    pub fn with<H>(mut self, key: impl Into<String>, handler: H) -> Self
    where
        H: StageHandler + 'static,
    {
        self.insert(key, Arc::new(handler));
        self
    }

    /// Adds a shared handler, replacing any handler under the same key.
    pub fn insert(&mut self, key: impl Into<String>, handler: Arc<dyn StageHandler>) {
        let key = key.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = handler;
        } else {
            self.entries.push((key, handler));
        }
    }

    /// Returns the keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.iter().map(|(k, _)| k.as_str()).collect();
        keys.sort_unstable();
        keys
    }

    /// Returns true if both groups have exactly the same keys.
    #[must_use]
    pub fn same_keys(&self, other: &Self) -> bool {
        self.keys() == other.keys()
    }

    /// Returns the number of handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the group has no handlers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(key, handler)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn StageHandler>)> {
        self.entries.iter().map(|(k, h)| (k.as_str(), h))
    }
}

impl<K: Into<String>> FromIterator<(K, Arc<dyn StageHandler>)> for StageGroup {
    fn from_iter<T: IntoIterator<Item = (K, Arc<dyn StageHandler>)>>(iter: T) -> Self {
        let mut group = Self::new();
        for (key, handler) in iter {
            group.insert(key, handler);
        }
        group
    }
}

impl std::fmt::Debug for StageGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageGroup")
            .field("keys", &self.entries.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .finish()
    }
}
