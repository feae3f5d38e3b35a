//! Trusted-key registry collaborator.
//!
//! The registry maps an identity to the ordered public keys trusted for it.
//! The verifier reads each identity at most once (see [`crate::cache`]), so
//! implementations may be slow or remote; the verifier bounds every lookup
//! with its fetch timeout.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{TrustError, TrustResult};
use crate::types::KeysFile;

/// Ordered Base64 SPKI keys for one identity. `None` marks a slot the
/// registry could not supply.
pub type RegistryKeys = Vec<Option<String>>;

/// Source of trusted keys per identity.
#[async_trait]
pub trait KeyRegistry: Send + Sync {
    /// Whether any trusted-key configuration exists at all.
    async fn has_trusted_keys(&self) -> bool;

    /// Keys for `identity`, or `None` if the identity is unknown.
    async fn trusted_keys(&self, identity: &str) -> TrustResult<Option<RegistryKeys>>;
}

/// In-memory registry, typically loaded from a keys file.
///
/// Cloning shares the underlying map, so a handle kept by the host can add
/// identities after the verifier has been built.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyRegistry {
    inner: Arc<RwLock<Option<HashMap<String, RegistryKeys>>>>,
}

impl MemoryKeyRegistry {
    /// Registry with no trust configuration. Every URI is rejected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with trust configured but no identities yet.
    pub fn configured() -> Self {
        Self::from_map(HashMap::new())
    }

    pub fn from_map(keys: HashMap<String, RegistryKeys>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(keys))),
        }
    }

    pub fn from_keys_file(file: KeysFile) -> Self {
        match file.trusted_url_public_keys {
            Some(keys) => Self::from_map(keys.into_iter().collect()),
            None => Self::new(),
        }
    }

    /// Parse a keys file from YAML (or JSON).
    pub fn from_yaml(yaml: &str) -> TrustResult<Self> {
        let file: KeysFile = serde_yaml::from_str(yaml).map_err(|e| TrustError::Config {
            message: format!("failed to parse keys file: {}", e),
        })?;
        Ok(Self::from_keys_file(file))
    }

    /// Load a keys file from disk.
    pub fn from_file(path: &Path) -> TrustResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| TrustError::Config {
            message: format!("failed to read keys file {}: {}", path.display(), e),
        })?;
        Self::from_yaml(&content)
    }

    /// Set the keys for `identity`, enabling trust configuration if needed.
    pub async fn insert(&self, identity: impl Into<String>, keys: RegistryKeys) {
        let mut inner = self.inner.write().await;
        inner
            .get_or_insert_with(HashMap::new)
            .insert(identity.into(), keys);
    }

    /// Remove `identity`. Identities already cached by a verifier keep their keys.
    pub async fn remove(&self, identity: &str) -> Option<RegistryKeys> {
        let mut inner = self.inner.write().await;
        inner.as_mut().and_then(|keys| keys.remove(identity))
    }

    /// Known identities, sorted.
    pub async fn identities(&self) -> Vec<String> {
        let inner = self.inner.read().await;
        let mut ids: Vec<String> = inner
            .as_ref()
            .map(|keys| keys.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }
}

#[async_trait]
impl KeyRegistry for MemoryKeyRegistry {
    async fn has_trusted_keys(&self) -> bool {
        self.inner.read().await.is_some()
    }

    async fn trusted_keys(&self, identity: &str) -> TrustResult<Option<RegistryKeys>> {
        let inner = self.inner.read().await;
        Ok(inner.as_ref().and_then(|keys| keys.get(identity).cloned()))
    }
}
