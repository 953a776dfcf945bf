#![allow(clippy::module_name_repetitions)]
//! Remote key snapshot.

use std::collections::BTreeSet;

use asset_sync_store::{ObjectStore, StoreError};

/// The set of keys present in the store when the run started.
///
/// Built once per run and never refreshed, so every decision in a run sees
/// the same remote state; uploads made during the run do not feed back
/// into it.
#[derive(Debug, Clone, Default)]
pub struct RemoteKeyIndex {
    keys: BTreeSet<String>,
}

impl RemoteKeyIndex {
    /// Lists the store under each prefix (deduplicated) and captures the
    /// union of the returned keys.
    ///
    /// # Errors
    ///
    /// Propagates [`StoreError::List`] from the store.
    pub async fn snapshot(
        store: &dyn ObjectStore,
        prefixes: &[&str],
    ) -> Result<Self, StoreError> {
        let unique: BTreeSet<&str> = prefixes.iter().copied().collect();
        let mut keys = BTreeSet::new();
        for prefix in unique {
            keys.extend(store.list_keys(prefix).await?);
        }
        Ok(Self { keys })
    }

    /// Builds an index from already-known keys.
    #[must_use]
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `key` existed remotely at run start.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Number of keys in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the snapshot holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
