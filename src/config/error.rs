//! Error types and result aliases.
//!
//! Defines the decode, encode and configuration error enumerations and the
//! common `Result` type.

use thiserror::Error;

/// Failures raised while decoding a signed cookie value.
///
/// These are captured into [`CookieData`](crate::CookieData) rather than
/// propagated, so an invalid inbound cookie behaves like a missing one unless
/// the application inspects the stored error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Token structure is unusable: missing segments, bad base64, or a
    /// payload that is not valid for the codec.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Signature did not match the payload.
    #[error("signature mismatch")]
    InvalidSignature,

    /// Signature was valid but the embedded timestamp exceeded the TTL.
    #[error("signature expired: age {age_secs}s, ttl {ttl_secs}s")]
    ExpiredSignature { age_secs: u64, ttl_secs: u64 },

    /// Payload verified but did not deserialize into the target type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

/// Failures raised while encoding a value into a signed cookie.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The value could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Failures raised while validating cookie middleware configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Secret shorter than the 16-byte minimum.
    #[error("secret too short: {0} bytes, need at least 16")]
    SecretTooShort(usize),

    /// Signature tag length outside the supported 16..=32 byte range.
    #[error("signature tag length {0} outside supported range 16..=32")]
    TagLenOutOfRange(usize),

    /// Cookie name is empty or contains characters outside the cookie-name
    /// token charset.
    #[error("invalid cookie name: {0:?}")]
    InvalidCookieName(String),

    /// State attribute name must be non-empty.
    #[error("state attribute name must not be empty")]
    EmptyStateAttribute,
}

/// Result type alias for `ConfigError`.
pub type Result<T> = std::result::Result<T, ConfigError>;
