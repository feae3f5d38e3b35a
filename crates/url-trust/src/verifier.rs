//! Signed URI verification.
//!
//! # Verification Steps
//!
//! 1. Reject if the registry has no trust configuration at all
//! 2. Resolve the identity (URI authority) to its cached key set, fetching
//!    from the registry on first use
//! 3. Require exactly one `sign` and one `ts` query parameter
//! 4. Require `0 <= now - ts <= 600_000` milliseconds
//! 5. Rebuild the signed payload by cutting `sign=...` out of the query
//! 6. Try each trusted key in order; the first one that verifies wins
//!
//! Every failure returns `false`. The reason is only logged, at trace level
//! for rejected requests and at warn level for broken keys or registries.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use url::Url;

use crate::cache::{KeyCache, TrustedKeySet};
use crate::error::{Rejection, TrustResult};
use crate::keys::{KeyDecoder, SpkiKeyDecoder};
use crate::registry::{KeyRegistry, MemoryKeyRegistry};
use crate::request::{self, SignedRequest};
use crate::types::TrustConfig;

/// Decides whether a URI is validly signed for the identity it claims.
#[async_trait]
pub trait UrlTrust: Send + Sync {
    async fn is_trusted(&self, uri: &Url) -> bool;
}

/// In-process verifier owning the key cache.
pub struct UrlTrustVerifier {
    registry: Arc<dyn KeyRegistry>,
    decoder: Arc<dyn KeyDecoder>,
    cache: KeyCache,
    fetch_timeout: Duration,
}

impl UrlTrustVerifier {
    /// Create a verifier backed by `registry`, with default settings.
    pub fn new(registry: Arc<dyn KeyRegistry>) -> Self {
        Self {
            registry,
            decoder: Arc::new(SpkiKeyDecoder),
            cache: KeyCache::new(),
            fetch_timeout: TrustConfig::default().fetch_timeout(),
        }
    }

    /// Build a verifier from configuration.
    ///
    /// Without a keys file the verifier has no trust configured and rejects
    /// every URI.
    pub fn from_config(config: &TrustConfig) -> TrustResult<Self> {
        let registry = match &config.keys_file {
            Some(path) => MemoryKeyRegistry::from_file(path)?,
            None => MemoryKeyRegistry::new(),
        };
        Ok(Self::new(Arc::new(registry)).with_fetch_timeout(config.fetch_timeout()))
    }

    /// Replace the key decoder.
    pub fn with_decoder(mut self, decoder: Arc<dyn KeyDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Bound each registry fetch.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Read-only view of the key cache.
    pub fn cache(&self) -> &KeyCache {
        &self.cache
    }

    /// Verify `uri` against an explicit clock (epoch milliseconds).
    pub async fn is_trusted_at(&self, uri: &Url, now_ms: i64) -> bool {
        match self.check(uri, now_ms).await {
            Ok(key_index) => {
                tracing::trace!(uri = %uri, key = key_index + 1, "signed uri is valid");
                true
            }
            Err(Rejection::RegistryUnavailable) => {
                tracing::warn!(
                    identity = %request::identity(uri),
                    "key registry unavailable, rejecting signed uri"
                );
                false
            }
            Err(rejection) => {
                tracing::trace!(uri = %uri, reason = %rejection, "uri is not trusted");
                false
            }
        }
    }

    async fn check(&self, uri: &Url, now_ms: i64) -> Result<usize, Rejection> {
        if !self.registry.has_trusted_keys().await {
            return Err(Rejection::NoTrustedKeys);
        }

        let identity = request::identity(uri);
        if identity.is_empty() {
            return Err(Rejection::UnknownIdentity);
        }
        let keys = self.key_set(identity).await?;

        let request = SignedRequest::from_url(uri)?;
        request.check_freshness(now_ms)?;

        let mut keys = keys.lock().await;
        keys.find_verifying_key(
            identity,
            request.payload.as_bytes(),
            &request.signature,
            self.decoder.as_ref(),
        )
        .ok_or(Rejection::NoMatchingKey)
    }

    async fn key_set(&self, identity: &str) -> Result<Arc<Mutex<TrustedKeySet>>, Rejection> {
        if let Some(keys) = self.cache.get(identity).await {
            return Ok(keys);
        }

        let fetched =
            tokio::time::timeout(self.fetch_timeout, self.registry.trusted_keys(identity)).await;
        let keys = match fetched {
            Ok(Ok(Some(keys))) => keys,
            Ok(Ok(None)) => return Err(Rejection::UnknownIdentity),
            Ok(Err(e)) => {
                tracing::warn!(identity = %identity, error = %e, "key registry lookup failed");
                return Err(Rejection::RegistryUnavailable);
            }
            Err(_) => {
                tracing::warn!(
                    identity = %identity,
                    timeout_ms = self.fetch_timeout.as_millis() as u64,
                    "key registry lookup timed out"
                );
                return Err(Rejection::RegistryUnavailable);
            }
        };

        Ok(self.cache.get_or_insert(identity, keys).await)
    }
}

#[async_trait]
impl UrlTrust for UrlTrustVerifier {
    async fn is_trusted(&self, uri: &Url) -> bool {
        self.is_trusted_at(uri, Utc::now().timestamp_millis()).await
    }
}

impl fmt::Debug for UrlTrustVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlTrustVerifier")
            .field("cache", &self.cache)
            .field("fetch_timeout", &self.fetch_timeout)
            .finish_non_exhaustive()
    }
}
