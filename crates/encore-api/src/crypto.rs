//! Cryptographic utilities for webhook signature validation.
//!
//! The email provider signs webhooks the Svix way: the signed content is
//! `{svix-id}.{svix-timestamp}.{body}`, the key is the base64 part of a
//! `whsec_` secret, and `svix-signature` carries one or more
//! space-separated `v1,<base64 HMAC-SHA256>` entries (several during
//! secret rotation).

use std::fmt;

use axum::http::HeaderMap;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the provider message id.
pub const ID_HEADER: &str = "svix-id";
/// Header carrying the signing time in Unix seconds.
pub const TIMESTAMP_HEADER: &str = "svix-timestamp";
/// Header carrying the signature list.
pub const SIGNATURE_HEADER: &str = "svix-signature";

const SECRET_PREFIX: &str = "whsec_";
const SIGNATURE_VERSION: &str = "v1";

/// Result of signature validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// Whether the signature is valid.
    pub is_valid: bool,
    /// Error message if validation failed.
    pub error_message: Option<String>,
}

impl ValidationResult {
    /// Creates a successful validation result.
    pub fn valid() -> Self {
        Self { is_valid: true, error_message: None }
    }

    /// Creates a failed validation result with error message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self { is_valid: false, error_message: Some(message.into()) }
    }
}

/// Signature validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// A required signature header is absent or not valid UTF-8.
    MissingHeader(&'static str),
    /// Invalid signature or timestamp format.
    InvalidFormat(String),
    /// Signing time is outside the tolerance window.
    TimestampOutOfTolerance {
        /// Distance from now in seconds
        skew_seconds: u64,
    },
    /// No signature entry matched.
    VerificationFailed,
    /// Invalid secret key.
    InvalidSecret,
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingHeader(name) => write!(f, "{name} header missing"),
            Self::InvalidFormat(format) => write!(f, "invalid signature format: {format}"),
            Self::TimestampOutOfTolerance { skew_seconds } => {
                write!(f, "timestamp outside tolerance by {skew_seconds}s")
            },
            Self::VerificationFailed => write!(f, "signature verification failed"),
            Self::InvalidSecret => write!(f, "invalid secret key"),
        }
    }
}

impl std::error::Error for SignatureError {}

/// The three signature headers of one request.
#[derive(Debug, Clone, Copy)]
pub struct SignedHeaders<'a> {
    /// Provider message id.
    pub id: &'a str,
    /// Signing time in Unix seconds, as sent.
    pub timestamp: &'a str,
    /// Space-separated `v1,<base64>` entries.
    pub signature: &'a str,
}

impl<'a> SignedHeaders<'a> {
    /// Reads the signature headers from a request.
    ///
    /// # Errors
    ///
    /// Returns `SignatureError::MissingHeader` naming the first absent
    /// header.
    pub fn from_headers(headers: &'a HeaderMap) -> Result<Self, SignatureError> {
        let get = |name: &'static str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .ok_or(SignatureError::MissingHeader(name))
        };

        Ok(Self {
            id: get(ID_HEADER)?,
            timestamp: get(TIMESTAMP_HEADER)?,
            signature: get(SIGNATURE_HEADER)?,
        })
    }
}

/// Validates a provider webhook signature.
///
/// `now` is the current Unix time in seconds. Any one matching `v1` entry
/// is enough.
///
/// # Example
///
/// ```
/// use encore_api::crypto::{sign_payload, validate_signature, SignedHeaders};
///
/// let secret = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";
/// let body = br#"{"type":"email.sent","data":{"email_id":"re_1"}}"#;
/// let signature = sign_payload(body, "msg_1", 1_700_000_000, secret).unwrap();
///
/// let headers = SignedHeaders { id: "msg_1", timestamp: "1700000000", signature: &signature };
/// let result = validate_signature(body, &headers, secret, 1_700_000_010, 300);
/// assert!(result.is_valid);
/// ```
pub fn validate_signature(
    payload: &[u8],
    headers: &SignedHeaders<'_>,
    secret: &str,
    now: i64,
    tolerance_seconds: u64,
) -> ValidationResult {
    match verify(payload, headers, secret, now, tolerance_seconds) {
        Ok(()) => ValidationResult::valid(),
        Err(err) => ValidationResult::invalid(err.to_string()),
    }
}

fn verify(
    payload: &[u8],
    headers: &SignedHeaders<'_>,
    secret: &str,
    now: i64,
    tolerance_seconds: u64,
) -> Result<(), SignatureError> {
    let timestamp: i64 = headers
        .timestamp
        .trim()
        .parse()
        .map_err(|_| SignatureError::InvalidFormat(format!("timestamp {:?}", headers.timestamp)))?;

    let skew_seconds = now.abs_diff(timestamp);
    if skew_seconds > tolerance_seconds {
        return Err(SignatureError::TimestampOutOfTolerance { skew_seconds });
    }

    let expected = sign_payload(payload, headers.id, timestamp, secret)?;
    let expected = expected.strip_prefix("v1,").unwrap_or(&expected);

    let mut saw_entry = false;
    for entry in headers.signature.split_whitespace() {
        let Some((version, signature)) = entry.split_once(',') else { continue };
        if version != SIGNATURE_VERSION {
            continue;
        }
        saw_entry = true;
        if timing_safe_eq(signature, expected) {
            return Ok(());
        }
    }

    if saw_entry {
        Err(SignatureError::VerificationFailed)
    } else {
        Err(SignatureError::InvalidFormat(format!("no {SIGNATURE_VERSION} entry in signature")))
    }
}

/// Produces the `v1,<base64>` signature entry for a payload.
///
/// # Errors
///
/// Returns `SignatureError::InvalidSecret` if the secret is empty or its
/// key part is not base64.
pub fn sign_payload(
    payload: &[u8],
    message_id: &str,
    timestamp: i64,
    secret: &str,
) -> Result<String, SignatureError> {
    let key = decode_secret(secret)?;
    let mut mac = HmacSha256::new_from_slice(&key).map_err(|_| SignatureError::InvalidSecret)?;

    mac.update(message_id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    Ok(format!("{SIGNATURE_VERSION},{}", STANDARD.encode(mac.finalize().into_bytes())))
}

fn decode_secret(secret: &str) -> Result<Vec<u8>, SignatureError> {
    let encoded = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
    if encoded.is_empty() {
        return Err(SignatureError::InvalidSecret);
    }

    STANDARD.decode(encoded).map_err(|_| SignatureError::InvalidSecret)
}

/// Timing-safe string comparison to prevent timing attacks.
fn timing_safe_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (a_byte, b_byte) in a.bytes().zip(b.bytes()) {
        result |= a_byte ^ b_byte;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    const SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";
    const BODY: &[u8] = br#"{"type":"email.delivered","data":{"email_id":"re_1"}}"#;
    const NOW: i64 = 1_700_000_000;

    fn signed(signature: &str) -> SignedHeaders<'_> {
        SignedHeaders { id: "msg_2KWPBgLlAfxdpx2AI54pPJ85f4W", timestamp: "1700000000", signature }
    }

    #[test]
    fn validate_signature_success() {
        let signature = sign_payload(BODY, "msg_2KWPBgLlAfxdpx2AI54pPJ85f4W", NOW, SECRET).unwrap();

        let result = validate_signature(BODY, &signed(&signature), SECRET, NOW, 300);

        assert!(result.is_valid);
        assert!(result.error_message.is_none());
    }

    #[test]
    fn any_matching_entry_is_accepted() {
        let good = sign_payload(BODY, "msg_2KWPBgLlAfxdpx2AI54pPJ85f4W", NOW, SECRET).unwrap();
        let rotated = format!("v1,c3RhbGUtc2lnbmF0dXJl {good}");

        assert!(validate_signature(BODY, &signed(&rotated), SECRET, NOW, 300).is_valid);
    }

    #[test]
    fn tampered_body_is_rejected() {
        let signature = sign_payload(BODY, "msg_2KWPBgLlAfxdpx2AI54pPJ85f4W", NOW, SECRET).unwrap();

        let result = validate_signature(b"{}", &signed(&signature), SECRET, NOW, 300);

        assert!(!result.is_valid);
        assert_eq!(result.error_message.unwrap(), "signature verification failed");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let signature =
            sign_payload(BODY, "msg_2KWPBgLlAfxdpx2AI54pPJ85f4W", NOW, "whsec_b3RoZXI=").unwrap();

        assert!(!validate_signature(BODY, &signed(&signature), SECRET, NOW, 300).is_valid);
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let signature = sign_payload(BODY, "msg_2KWPBgLlAfxdpx2AI54pPJ85f4W", NOW, SECRET).unwrap();

        let result = validate_signature(BODY, &signed(&signature), SECRET, NOW + 301, 300);

        assert!(!result.is_valid);
        assert_eq!(result.error_message.unwrap(), "timestamp outside tolerance by 301s");
    }

    #[test]
    fn non_numeric_timestamp_is_rejected() {
        let headers = SignedHeaders { id: "msg_1", timestamp: "yesterday", signature: "v1,abc" };

        assert!(!validate_signature(BODY, &headers, SECRET, NOW, 300).is_valid);
    }

    #[test]
    fn unversioned_signature_is_invalid_format() {
        let result = validate_signature(BODY, &signed("v2,abc"), SECRET, NOW, 300);

        assert_eq!(result.error_message.unwrap(), "invalid signature format: no v1 entry in signature");
    }

    #[test]
    fn secret_without_prefix_is_accepted() {
        let bare = SECRET.trim_start_matches("whsec_");

        assert_eq!(sign_payload(BODY, "m", NOW, bare), sign_payload(BODY, "m", NOW, SECRET));
    }

    #[test]
    fn undecodable_secret_is_invalid() {
        assert_eq!(sign_payload(BODY, "m", NOW, "whsec_!!!"), Err(SignatureError::InvalidSecret));
        assert_eq!(sign_payload(BODY, "m", NOW, "whsec_"), Err(SignatureError::InvalidSecret));
    }

    #[test]
    fn headers_are_read_from_request() {
        let mut headers = HeaderMap::new();
        headers.insert(ID_HEADER, HeaderValue::from_static("msg_1"));
        headers.insert(TIMESTAMP_HEADER, HeaderValue::from_static("1700000000"));

        assert_eq!(
            SignedHeaders::from_headers(&headers).unwrap_err(),
            SignatureError::MissingHeader(SIGNATURE_HEADER)
        );

        headers.insert(SIGNATURE_HEADER, HeaderValue::from_static("v1,abc"));
        let parsed = SignedHeaders::from_headers(&headers).unwrap();
        assert_eq!(parsed.id, "msg_1");
        assert_eq!(parsed.signature, "v1,abc");
    }

    #[test]
    fn timing_safe_eq_different_length() {
        assert!(timing_safe_eq("hello", "hello"));
        assert!(!timing_safe_eq("hello", "world"));
        assert!(!timing_safe_eq("hello", "hello_world"));
    }
}
