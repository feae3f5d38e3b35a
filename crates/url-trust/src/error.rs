//! Error types for setup and plumbing around the verifier.
//!
//! Verification itself never returns these: every rejection collapses to
//! `false` and a log line. They surface from loading key files, signing,
//! registry backends and relay transports.

/// URL trust errors.
#[derive(Debug, thiserror::Error)]
pub enum TrustError {
    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// The key registry failed to answer.
    #[error("registry error: {message}")]
    Registry { message: String },

    /// Key material could not be decoded.
    #[error("invalid key: {message}")]
    KeyDecode { message: String },

    /// A URI could not be signed.
    #[error("signing failed: {message}")]
    Signing { message: String },

    /// The relay transport dropped or timed out a request.
    #[error("relay error: {message}")]
    Relay { message: String },
}

impl TrustError {
    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } | Self::KeyDecode { .. } => 2,
            Self::Registry { .. } | Self::Relay { .. } => 3,
            Self::Signing { .. } => 4,
        }
    }
}

/// Result type for URL trust operations.
pub type TrustResult<T> = Result<T, TrustError>;

/// Why a URI was not trusted.
///
/// Only ever logged. Callers of the verifier see `false` for every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("there are no configured trusted keys")]
    NoTrustedKeys,

    #[error("identity doesn't have any trusted keys")]
    UnknownIdentity,

    #[error("key registry is unavailable")]
    RegistryUnavailable,

    #[error("uri is not signed")]
    NotSigned,

    #[error("signed uri doesn't have a timestamp")]
    MissingTimestamp,

    #[error("signed uri has a malformed timestamp")]
    MalformedTimestamp,

    #[error("signed uri is not valid yet")]
    Premature,

    #[error("signed uri has expired")]
    Expired,

    #[error("signature is not valid base64")]
    MalformedSignature,

    #[error("signed uri could not be verified")]
    NoMatchingKey,
}
