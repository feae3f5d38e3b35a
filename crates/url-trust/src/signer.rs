//! URI signing, the counterpart of [`crate::verifier`].
//!
//! Signing appends `ts=<now_ms>` to the query, signs the serialized URI with
//! RSASSA-PKCS1-v1_5 / SHA-256 and appends `sign=<base64>` last. Because the
//! URI is serialized by the same parser the verifier uses, the payload the
//! verifier rebuilds is byte-identical.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePublicKey};
use rsa::sha2::Sha256;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use url::{form_urlencoded, Url};

use crate::error::{TrustError, TrustResult};
use crate::request::{SIGN_PARAM, TIMESTAMP_PARAM};

/// Signs URIs with an RSA private key.
pub struct UrlSigner {
    key: SigningKey<Sha256>,
    public_spki: Vec<u8>,
}

impl UrlSigner {
    pub fn new(private_key: RsaPrivateKey) -> TrustResult<Self> {
        let public_spki = private_key
            .to_public_key()
            .to_public_key_der()
            .map_err(|e| TrustError::KeyDecode {
                message: format!("failed to encode public key: {}", e),
            })?
            .as_bytes()
            .to_vec();

        Ok(Self {
            key: SigningKey::<Sha256>::new(private_key),
            public_spki,
        })
    }

    /// Parse a PKCS#8 PEM private key.
    pub fn from_pkcs8_pem(pem: &str) -> TrustResult<Self> {
        let private_key =
            RsaPrivateKey::from_pkcs8_pem(pem).map_err(|e| TrustError::KeyDecode {
                message: format!("invalid PKCS#8 private key: {}", e),
            })?;
        Self::new(private_key)
    }

    /// Load a PKCS#8 PEM private key file.
    pub fn from_pem_file(path: &Path) -> TrustResult<Self> {
        let pem = std::fs::read_to_string(path).map_err(|e| TrustError::Config {
            message: format!("failed to read private key {}: {}", path.display(), e),
        })?;
        Self::from_pkcs8_pem(&pem)
    }

    /// Base64 SPKI DER of the matching public key, as listed in a keys file.
    pub fn public_key_base64(&self) -> String {
        BASE64.encode(&self.public_spki)
    }

    /// Sign `uri` with the current time.
    pub fn sign(&self, uri: &Url) -> TrustResult<Url> {
        self.sign_at(uri, Utc::now().timestamp_millis())
    }

    /// Sign `uri` with an explicit timestamp (epoch milliseconds).
    pub fn sign_at(&self, uri: &Url, now_ms: i64) -> TrustResult<Url> {
        if now_ms < 0 {
            return Err(TrustError::Signing {
                message: format!("timestamp must not be negative: {}", now_ms),
            });
        }

        let query = uri.query().unwrap_or("");
        if let Some((key, _)) = form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == SIGN_PARAM || key == TIMESTAMP_PARAM)
        {
            return Err(TrustError::Signing {
                message: format!("uri already carries a `{}` parameter", key),
            });
        }

        let with_timestamp = if query.is_empty() {
            format!("{}={}", TIMESTAMP_PARAM, now_ms)
        } else {
            format!("{}&{}={}", query, TIMESTAMP_PARAM, now_ms)
        };

        let mut signed = uri.clone();
        signed.set_query(Some(&with_timestamp));

        let signature = self
            .key
            .try_sign(signed.as_str().as_bytes())
            .map_err(|e| TrustError::Signing {
                message: e.to_string(),
            })?;
        let encoded: String =
            form_urlencoded::byte_serialize(BASE64.encode(signature.to_bytes()).as_bytes())
                .collect();

        signed.set_query(Some(&format!(
            "{}&{}={}",
            with_timestamp, SIGN_PARAM, encoded
        )));
        Ok(signed)
    }
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner")
            .field("public_key", &self.public_key_base64())
            .finish_non_exhaustive()
    }
}
