//! Trusted public keys and their per-entry parse state.
//!
//! Registry keys arrive as Base64 SPKI DER strings and are decoded lazily,
//! on the first verification that reaches them. Each entry is a small state
//! machine:
//!
//! ```text
//! Unparsed ──decode ok──▶ Parsed
//!     │
//!     └──decode err──▶ Poisoned
//! ```
//!
//! Transitions only go forward. A `Parsed` entry is never decoded again and a
//! `Poisoned` entry is skipped for the lifetime of the cache.

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::sha2::Sha256;
use rsa::signature::Verifier;
use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;

use crate::error::{TrustError, TrustResult};

/// A decoded public key able to check RSASSA-PKCS1-v1_5 / SHA-256 signatures.
pub struct TrustedPublicKey {
    key: VerifyingKey<Sha256>,
    bits: usize,
}

impl TrustedPublicKey {
    /// Decode an SPKI DER public key.
    pub fn from_spki_der(der: &[u8]) -> TrustResult<Self> {
        let public_key =
            RsaPublicKey::from_public_key_der(der).map_err(|e| TrustError::KeyDecode {
                message: format!("invalid SPKI public key: {}", e),
            })?;
        let bits = public_key.size() * 8;

        Ok(Self {
            key: VerifyingKey::<Sha256>::new(public_key),
            bits,
        })
    }

    /// Modulus size in bits.
    pub fn bits(&self) -> usize {
        self.bits
    }

    /// Check `signature` over `payload`. Any malformed signature is a mismatch.
    pub fn verify(&self, payload: &[u8], signature: &[u8]) -> bool {
        let Ok(signature) = Signature::try_from(signature) else {
            return false;
        };
        self.key.verify(payload, &signature).is_ok()
    }
}

impl fmt::Debug for TrustedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustedPublicKey")
            .field("algorithm", &"RSASSA-PKCS1-v1_5/SHA-256")
            .field("bits", &self.bits)
            .finish()
    }
}

/// Turns registry key material into a usable key.
pub trait KeyDecoder: Send + Sync {
    fn decode(&self, encoded: &str) -> TrustResult<TrustedPublicKey>;
}

/// Decodes Base64 SPKI DER public keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpkiKeyDecoder;

impl KeyDecoder for SpkiKeyDecoder {
    fn decode(&self, encoded: &str) -> TrustResult<TrustedPublicKey> {
        let der = BASE64
            .decode(encoded.trim())
            .map_err(|e| TrustError::KeyDecode {
                message: format!("invalid base64 public key: {}", e),
            })?;
        TrustedPublicKey::from_spki_der(&der)
    }
}

/// One cached key slot for an identity.
#[derive(Debug)]
pub enum KeyEntry {
    /// Raw registry material, not decoded yet.
    Unparsed(String),
    /// Decoded and ready to verify.
    Parsed(TrustedPublicKey),
    /// Failed to decode (or was null in the registry). Never retried.
    Poisoned,
}

/// Observable state of a [`KeyEntry`], without the key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Unparsed,
    Parsed,
    Poisoned,
}

impl KeyEntry {
    /// Build an entry from a registry slot.
    pub fn from_registry(raw: Option<String>) -> Self {
        match raw {
            Some(raw) => Self::Unparsed(raw),
            None => Self::Poisoned,
        }
    }

    pub fn state(&self) -> KeyState {
        match self {
            Self::Unparsed(_) => KeyState::Unparsed,
            Self::Parsed(_) => KeyState::Parsed,
            Self::Poisoned => KeyState::Poisoned,
        }
    }

    /// Return the usable key, decoding it in place on first use.
    ///
    /// `Ok(None)` means the entry is poisoned. A decode failure poisons the
    /// entry and returns the decode error once; later calls see `Ok(None)`.
    pub fn resolve(&mut self, decoder: &dyn KeyDecoder) -> TrustResult<Option<&TrustedPublicKey>> {
        let decoded = match self {
            Self::Unparsed(raw) => Some(decoder.decode(raw)),
            Self::Parsed(_) | Self::Poisoned => None,
        };

        match decoded {
            Some(Ok(key)) => *self = Self::Parsed(key),
            Some(Err(e)) => {
                *self = Self::Poisoned;
                return Err(e);
            }
            None => {}
        }

        match &*self {
            Self::Parsed(key) => Ok(Some(key)),
            _ => Ok(None),
        }
    }
}
