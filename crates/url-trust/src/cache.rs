//! Per-identity cache of trusted keys.
//!
//! The first lookup for an identity copies its registry keys into a
//! [`TrustedKeySet`]; the set then lives as long as the cache. Registry
//! changes for that identity are not observed afterwards. Identities the
//! registry does not know are never cached, so a later registry update can
//! still add them.
//!
//! Each set sits behind its own mutex: verification for one identity is
//! serialized and a key is decoded at most once. Different identities do not
//! contend.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::keys::{KeyDecoder, KeyEntry, KeyState};

/// Ordered keys for one identity.
#[derive(Debug)]
pub struct TrustedKeySet {
    entries: Vec<KeyEntry>,
}

impl TrustedKeySet {
    pub fn from_registry(keys: Vec<Option<String>>) -> Self {
        Self {
            entries: keys.into_iter().map(KeyEntry::from_registry).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn states(&self) -> Vec<KeyState> {
        self.entries.iter().map(KeyEntry::state).collect()
    }

    /// Try each key in order and return the index of the first one that
    /// verifies `signature` over `payload`.
    ///
    /// Keys are decoded on first use; a key that fails to decode is poisoned
    /// in place and the search moves on.
    pub fn find_verifying_key(
        &mut self,
        identity: &str,
        payload: &[u8],
        signature: &[u8],
        decoder: &dyn KeyDecoder,
    ) -> Option<usize> {
        for (index, entry) in self.entries.iter_mut().enumerate() {
            let key = match entry.resolve(decoder) {
                Ok(Some(key)) => key,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(
                        identity = %identity,
                        key = index + 1,
                        error = %e,
                        "failed to parse trusted url public key"
                    );
                    continue;
                }
            };

            if key.verify(payload, signature) {
                return Some(index);
            }
        }
        None
    }
}

/// Identity -> trusted key set.
#[derive(Debug, Default)]
pub struct KeyCache {
    sets: RwLock<HashMap<String, Arc<Mutex<TrustedKeySet>>>>,
}

impl KeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn get(&self, identity: &str) -> Option<Arc<Mutex<TrustedKeySet>>> {
        self.sets.read().await.get(identity).cloned()
    }

    /// Cache `keys` for `identity` unless another caller got there first, in
    /// which case the existing set (and its parse progress) wins.
    pub(crate) async fn get_or_insert(
        &self,
        identity: &str,
        keys: Vec<Option<String>>,
    ) -> Arc<Mutex<TrustedKeySet>> {
        let mut sets = self.sets.write().await;
        sets.entry(identity.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(TrustedKeySet::from_registry(keys))))
            .clone()
    }

    /// Whether `identity` has been loaded.
    pub async fn contains(&self, identity: &str) -> bool {
        self.sets.read().await.contains_key(identity)
    }

    /// Parse state of each key cached for `identity`, in registry order.
    pub async fn states(&self, identity: &str) -> Option<Vec<KeyState>> {
        let set = self.get(identity).await?;
        let states = set.lock().await.states();
        Some(states)
    }

    /// Number of cached identities.
    pub async fn len(&self) -> usize {
        self.sets.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sets.read().await.is_empty()
    }
}
