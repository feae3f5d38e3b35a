//! Signed request extraction and payload reconstruction.
//!
//! A signed URI carries two extra query parameters: `ts` (epoch milliseconds)
//! and `sign` (Base64 signature). The signer signs the serialized URI *before*
//! `sign` is appended, so the verifier rebuilds that exact string by cutting
//! the `sign=...` segment out of the raw query text. Nothing is re-encoded or
//! reordered; a generic query builder would break byte equality.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use url::{form_urlencoded, Position, Url};

use crate::error::Rejection;

/// Query parameter carrying the Base64 signature.
pub const SIGN_PARAM: &str = "sign";

/// Query parameter carrying the signing time in epoch milliseconds.
pub const TIMESTAMP_PARAM: &str = "ts";

/// How long a signature stays valid after its timestamp (10 minutes).
pub const SIGNATURE_VALIDITY_MS: i64 = 600_000;

/// Everything needed to check one signed URI. Built per call, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// Claimed identity (the URI authority).
    pub identity: String,

    /// Claimed signing time, epoch milliseconds.
    pub timestamp_ms: i64,

    /// Raw signature bytes.
    pub signature: Vec<u8>,

    /// The exact string that was signed.
    pub payload: String,
}

impl SignedRequest {
    /// Extract the signed request from a URI.
    pub fn from_url(uri: &Url) -> Result<Self, Rejection> {
        let query = uri.query().unwrap_or("");

        let sign = single_param(query, SIGN_PARAM).ok_or(Rejection::NotSigned)?;
        let raw_timestamp =
            single_param(query, TIMESTAMP_PARAM).ok_or(Rejection::MissingTimestamp)?;
        let timestamp_ms = parse_timestamp(&raw_timestamp).ok_or(Rejection::MalformedTimestamp)?;

        // `sign` may only have been found through a percent-encoded key, in
        // which case there is no literal segment to cut out.
        let payload = unsigned_payload(uri).ok_or(Rejection::NotSigned)?;

        let signature = BASE64
            .decode(sign.as_bytes())
            .map_err(|_| Rejection::MalformedSignature)?;

        Ok(Self {
            identity: identity(uri).to_string(),
            timestamp_ms,
            signature,
            payload,
        })
    }

    /// Check the timestamp against `now_ms`.
    pub fn check_freshness(&self, now_ms: i64) -> Result<(), Rejection> {
        check_freshness(self.timestamp_ms, now_ms)
    }
}

/// The identity a URI claims: its authority, exactly as serialized.
pub fn identity(uri: &Url) -> &str {
    &uri[Position::BeforeUsername..Position::AfterPort]
}

/// Accept `timestamp_ms` if `0 <= now_ms - timestamp_ms <= SIGNATURE_VALIDITY_MS`.
pub fn check_freshness(timestamp_ms: i64, now_ms: i64) -> Result<(), Rejection> {
    let diff = now_ms
        .checked_sub(timestamp_ms)
        .ok_or(Rejection::Premature)?;

    if diff < 0 {
        Err(Rejection::Premature)
    } else if diff > SIGNATURE_VALIDITY_MS {
        Err(Rejection::Expired)
    } else {
        Ok(())
    }
}

/// Remove the `sign=...` segment and one adjacent `&` from a raw query.
///
/// Returns `None` when the query has no literal `sign` segment.
pub fn strip_signature(query: &str) -> Option<String> {
    let mut segments: Vec<&str> = query.split('&').collect();
    let index = segments.iter().position(|segment| {
        segment
            .split_once('=')
            .is_some_and(|(key, _)| key == SIGN_PARAM)
    })?;
    segments.remove(index);
    Some(segments.join("&"))
}

/// Rebuild the string the signer signed: the URI with `sign` cut out.
///
/// An emptied query drops its `?`. The fragment, if any, is kept.
pub fn unsigned_payload(uri: &Url) -> Option<String> {
    let query = strip_signature(uri.query()?)?;

    let mut payload = uri[..Position::AfterPath].to_string();
    if !query.is_empty() {
        payload.push('?');
        payload.push_str(&query);
    }
    if let Some(fragment) = uri.fragment() {
        payload.push('#');
        payload.push_str(fragment);
    }
    Some(payload)
}

/// Value of a parameter that must appear exactly once with a non-empty value.
fn single_param(query: &str, name: &str) -> Option<String> {
    let mut values = form_urlencoded::parse(query.as_bytes())
        .filter(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned());

    let value = values.next()?;
    if values.next().is_some() || value.is_empty() {
        return None;
    }
    Some(value)
}

fn parse_timestamp(raw: &str) -> Option<i64> {
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_strip_signature_middle() {
        assert_eq!(
            strip_signature("a=1&sign=XYZ&b=2").as_deref(),
            Some("a=1&b=2")
        );
    }

    #[test]
    fn test_strip_signature_only_param() {
        assert_eq!(strip_signature("sign=XYZ").as_deref(), Some(""));
    }

    #[test]
    fn test_strip_signature_first() {
        assert_eq!(strip_signature("sign=XYZ&b=2").as_deref(), Some("b=2"));
    }

    #[test]
    fn test_strip_signature_last() {
        assert_eq!(strip_signature("a=1&sign=XYZ").as_deref(), Some("a=1"));
    }

    #[test]
    fn test_strip_signature_keeps_other_separators() {
        assert_eq!(
            strip_signature("a=1&&sign=XYZ&b=%2B").as_deref(),
            Some("a=1&&b=%2B")
        );
    }

    #[test]
    fn test_strip_signature_ignores_lookalike_keys() {
        assert_eq!(strip_signature("design=1&signx=2"), None);
        assert_eq!(
            strip_signature("design=1&sign=XYZ").as_deref(),
            Some("design=1")
        );
    }

    #[test]
    fn test_unsigned_payload_drops_empty_query() {
        let uri = url("ext://acme.tool/run?sign=XYZ");
        assert_eq!(
            unsigned_payload(&uri).as_deref(),
            Some("ext://acme.tool/run")
        );
    }

    #[test]
    fn test_unsigned_payload_keeps_fragment() {
        let uri = url("ext://acme.tool?a=1&sign=XYZ#frag");
        assert_eq!(
            unsigned_payload(&uri).as_deref(),
            Some("ext://acme.tool?a=1#frag")
        );
    }

    #[test]
    fn test_identity_is_authority() {
        assert_eq!(identity(&url("ext://acme.tool?a=1")), "acme.tool");
        assert_eq!(identity(&url("ext://me@acme.tool:8080/x")), "me@acme.tool:8080");
        assert_eq!(identity(&url("mailto:someone")), "");
    }

    #[test]
    fn test_from_url_extracts_fields() {
        let uri = url("ext://acme.tool?foo=bar&ts=1700000000000&sign=AQID");
        let request = SignedRequest::from_url(&uri).unwrap();

        assert_eq!(request.identity, "acme.tool");
        assert_eq!(request.timestamp_ms, 1_700_000_000_000);
        assert_eq!(request.signature, vec![1, 2, 3]);
        assert_eq!(request.payload, "ext://acme.tool?foo=bar&ts=1700000000000");
    }

    #[test]
    fn test_from_url_decodes_percent_encoded_signature() {
        let uri = url("ext://acme.tool?ts=1&sign=%2B%2F8%3D");
        let request = SignedRequest::from_url(&uri).unwrap();
        assert_eq!(request.signature, vec![0xfb, 0xff]);
        assert_eq!(request.payload, "ext://acme.tool?ts=1");
    }

    #[test]
    fn test_from_url_requires_sign() {
        let uri = url("ext://acme.tool?foo=bar&ts=1");
        assert_eq!(SignedRequest::from_url(&uri), Err(Rejection::NotSigned));

        let uri = url("ext://acme.tool?ts=1&sign=");
        assert_eq!(SignedRequest::from_url(&uri), Err(Rejection::NotSigned));

        let uri = url("ext://acme.tool");
        assert_eq!(SignedRequest::from_url(&uri), Err(Rejection::NotSigned));
    }

    #[test]
    fn test_from_url_rejects_duplicate_params() {
        let uri = url("ext://acme.tool?ts=1&sign=AQID&sign=AQID");
        assert_eq!(SignedRequest::from_url(&uri), Err(Rejection::NotSigned));

        let uri = url("ext://acme.tool?ts=1&ts=2&sign=AQID");
        assert_eq!(
            SignedRequest::from_url(&uri),
            Err(Rejection::MissingTimestamp)
        );
    }

    #[test]
    fn test_from_url_requires_timestamp() {
        let uri = url("ext://acme.tool?sign=AQID");
        assert_eq!(
            SignedRequest::from_url(&uri),
            Err(Rejection::MissingTimestamp)
        );
    }

    #[test]
    fn test_from_url_rejects_non_numeric_timestamp() {
        for ts in ["abc", "12abc", "-5", "+5", "1.5", "99999999999999999999"] {
            let uri = url(&format!("ext://acme.tool?ts={ts}&sign=AQID"));
            assert_eq!(
                SignedRequest::from_url(&uri),
                Err(Rejection::MalformedTimestamp),
                "ts={ts}"
            );
        }
    }

    #[test]
    fn test_from_url_rejects_encoded_sign_key() {
        // Decodes to `sign`, but there is no literal segment to remove
        let uri = url("ext://acme.tool?ts=1&%73ign=AQID");
        assert_eq!(SignedRequest::from_url(&uri), Err(Rejection::NotSigned));
    }

    #[test]
    fn test_from_url_rejects_bad_base64_signature() {
        let uri = url("ext://acme.tool?ts=1&sign=%25%25%25");
        assert_eq!(
            SignedRequest::from_url(&uri),
            Err(Rejection::MalformedSignature)
        );
    }

    #[test]
    fn test_freshness_window_bounds() {
        let ts = 1_700_000_000_000;
        assert_eq!(check_freshness(ts, ts), Ok(()));
        assert_eq!(check_freshness(ts, ts - 1), Err(Rejection::Premature));
        assert_eq!(check_freshness(ts, ts + 600_000), Ok(()));
        assert_eq!(check_freshness(ts, ts + 600_001), Err(Rejection::Expired));
    }

    #[test]
    fn test_freshness_does_not_overflow() {
        assert_eq!(check_freshness(i64::MAX, i64::MIN), Err(Rejection::Premature));
        assert_eq!(check_freshness(0, i64::MAX), Err(Rejection::Expired));
    }
}
