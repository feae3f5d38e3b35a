//! Signature and freshness verification for extension-scoped URIs.
//!
//! An extension publisher hands out URIs such as
//! `ext://acme.tool?foo=bar&ts=1700000000000&sign=...`. Before acting on one,
//! the host checks that:
//!
//! - the authority (`acme.tool`) has trusted keys in the registry
//! - `sign` is an RSASSA-PKCS1-v1_5 / SHA-256 signature, by one of those
//!   keys, over the URI with `sign` removed
//! - `ts` is no more than 10 minutes old and not in the future
//!
//! Every failure is a plain `false`. Reasons go to `tracing` only.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use url::Url;
//! use url_trust::{MemoryKeyRegistry, UrlTrust, UrlTrustVerifier};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let registry = MemoryKeyRegistry::from_file("keys.yaml".as_ref())?;
//! let verifier = UrlTrustVerifier::new(Arc::new(registry));
//!
//! let uri = Url::parse("ext://acme.tool?foo=bar&ts=1700000000000&sign=...")?;
//! if verifier.is_trusted(&uri).await {
//!     println!("trusted");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Sandboxed callers
//!
//! Processes without registry access use [`RelayedUrlTrust`], which rejects
//! URIs without `sign=` locally and forwards the rest to a verifier through a
//! [`RelayTransport`] (see [`spawn_relay_service`]).
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `URL_TRUST_KEYS_FILE` | Trusted-key file (YAML or JSON) |
//! | `URL_TRUST_FETCH_TIMEOUT_MS` | Registry fetch timeout (default: 5000) |
//! | `URL_TRUST_RELAY_QUEUE` | Relay channel depth (default: 64) |
//! | `URL_TRUST_RELAY_TIMEOUT_MS` | Relayed verification timeout (default: 5000) |

pub mod cache;
pub mod error;
pub mod keys;
pub mod registry;
pub mod relay;
pub mod request;
pub mod signer;
pub mod types;
pub mod verifier;

// Re-export main types
pub use cache::{KeyCache, TrustedKeySet};
pub use error::{Rejection, TrustError, TrustResult};
pub use keys::{KeyDecoder, KeyEntry, KeyState, SpkiKeyDecoder, TrustedPublicKey};
pub use registry::{KeyRegistry, MemoryKeyRegistry, RegistryKeys};
pub use relay::{
    looks_signed, spawn_relay_service, ChannelTransport, DirectTransport, RelayRequest,
    RelayTransport, RelayedUrlTrust,
};
pub use request::{
    check_freshness, strip_signature, unsigned_payload, SignedRequest, SIGNATURE_VALIDITY_MS,
};
pub use signer::UrlSigner;
pub use types::{KeysFile, TrustConfig};
pub use verifier::{UrlTrust, UrlTrustVerifier};
