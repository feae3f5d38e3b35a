//! Configuration and on-disk formats.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Trusted-key file.
///
/// ```yaml
/// trusted_url_public_keys:
///   acme.tool:
///     - "MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8A..."
///     - null
/// ```
///
/// An absent (or null) `trusted_url_public_keys` means no trust is configured
/// at all. An empty map means trust is configured but no identity has keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeysFile {
    /// Identity -> ordered base64 SPKI public keys. `null` entries are kept
    /// so key positions stay stable in logs.
    #[serde(default)]
    pub trusted_url_public_keys: Option<BTreeMap<String, Vec<Option<String>>>>,
}

/// Verifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustConfig {
    /// Trusted-key file (YAML or JSON).
    #[serde(default)]
    pub keys_file: Option<PathBuf>,

    /// Upper bound on a single registry fetch, in milliseconds.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Depth of the relay request channel.
    #[serde(default = "default_relay_queue")]
    pub relay_queue: usize,

    /// Upper bound on a relayed verification, in milliseconds.
    #[serde(default = "default_relay_timeout_ms")]
    pub relay_timeout_ms: u64,
}

fn default_fetch_timeout_ms() -> u64 {
    5_000
}

fn default_relay_queue() -> usize {
    64
}

fn default_relay_timeout_ms() -> u64 {
    5_000
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            keys_file: None,
            fetch_timeout_ms: default_fetch_timeout_ms(),
            relay_queue: default_relay_queue(),
            relay_timeout_ms: default_relay_timeout_ms(),
        }
    }
}

impl TrustConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `URL_TRUST_KEYS_FILE` | Trusted-key file |
    /// | `URL_TRUST_FETCH_TIMEOUT_MS` | Registry fetch timeout (default: 5000) |
    /// | `URL_TRUST_RELAY_QUEUE` | Relay channel depth (default: 64) |
    /// | `URL_TRUST_RELAY_TIMEOUT_MS` | Relayed verification timeout (default: 5000) |
    pub fn from_env() -> Self {
        Self {
            keys_file: std::env::var("URL_TRUST_KEYS_FILE")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            fetch_timeout_ms: std::env::var("URL_TRUST_FETCH_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_fetch_timeout_ms),
            relay_queue: std::env::var("URL_TRUST_RELAY_QUEUE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|depth| *depth > 0)
                .unwrap_or_else(default_relay_queue),
            relay_timeout_ms: std::env::var("URL_TRUST_RELAY_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_relay_timeout_ms),
        }
    }

    /// Set the trusted-key file.
    pub fn with_keys_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.keys_file = Some(path.into());
        self
    }

    /// Set the registry fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the relay timeout.
    pub fn with_relay_timeout(mut self, timeout: Duration) -> Self {
        self.relay_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn relay_timeout(&self) -> Duration {
        Duration::from_millis(self.relay_timeout_ms)
    }
}
