//! Timestamped HMAC token signer.
//!
//! Produces and verifies tokens of the form `payload.timestamp.signature`,
//! where all three segments are URL-safe base64 without padding and the
//! signature covers the literal `payload.timestamp` text.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::config::{
    ConfigError, DEFAULT_TAG_LEN, DecodeError, MIN_TAG_LEN, Secret, SignerOptions,
};

type HmacSha256 = Hmac<Sha256>;

const SEP: char = '.';

/// Signs byte payloads with a key derived from a secret and a context
/// string, embedding the signing time.
///
/// The same secret with a different context yields an unrelated key, so
/// tokens never verify across contexts. Signing is deterministic for a
/// fixed payload and timestamp.
#[derive(Clone)]
pub struct TimestampSigner {
    key: [u8; 32],
    tag_len: usize,
}

impl TimestampSigner {
    /// Creates a signer for the given secret and derivation context.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TagLenOutOfRange`] if the configured tag
    /// length falls outside [`MIN_TAG_LEN`]`..=`[`DEFAULT_TAG_LEN`].
    pub fn new(
        secret: &Secret,
        context: &str,
        options: &SignerOptions,
    ) -> Result<Self, ConfigError> {
        if !(MIN_TAG_LEN..=DEFAULT_TAG_LEN).contains(&options.tag_len) {
            return Err(ConfigError::TagLenOutOfRange(options.tag_len));
        }
        Ok(Self {
            key: derive_key(secret, context),
            tag_len: options.tag_len,
        })
    }

    /// Signs a payload with the current wall-clock time.
    #[must_use]
    pub fn sign(&self, payload: &[u8]) -> String {
        self.sign_at(payload, SystemTime::now())
    }

    /// Signs a payload embedding an explicit signing time.
    ///
    /// Useful for minting back-dated tokens in expiry tests. Times before
    /// the Unix epoch are clamped to it.
    #[must_use]
    pub fn sign_at(&self, payload: &[u8], now: SystemTime) -> String {
        let mut token = URL_SAFE_NO_PAD.encode(payload);
        token.push(SEP);
        token.push_str(&URL_SAFE_NO_PAD.encode(encode_timestamp(unix_seconds(now))));
        let tag = self.compute_tag(token.as_bytes());
        token.push(SEP);
        token.push_str(&URL_SAFE_NO_PAD.encode(&tag[..self.tag_len]));
        token
    }

    /// Verifies a token and returns its payload bytes.
    ///
    /// The signature is checked in constant time before the timestamp is
    /// even parsed; when a `ttl` is given, tokens older than it are
    /// rejected. Future-dated tokens count as age zero.
    ///
    /// # Errors
    ///
    /// [`DecodeError::InvalidToken`] for structural problems,
    /// [`DecodeError::InvalidSignature`] for a tag mismatch or a tag of the
    /// wrong length, [`DecodeError::ExpiredSignature`] once the embedded
    /// timestamp exceeds `ttl`.
    pub fn unsign(&self, token: &str, ttl: Option<Duration>) -> Result<Vec<u8>, DecodeError> {
        self.unsign_at(token, ttl, SystemTime::now())
    }

    fn unsign_at(
        &self,
        token: &str,
        ttl: Option<Duration>,
        now: SystemTime,
    ) -> Result<Vec<u8>, DecodeError> {
        let Some((signed_text, sig_b64)) = token.rsplit_once(SEP) else {
            return Err(DecodeError::InvalidToken(
                "missing signature separator".to_string(),
            ));
        };
        let Some((payload_b64, ts_b64)) = signed_text.rsplit_once(SEP) else {
            return Err(DecodeError::InvalidToken(
                "missing timestamp separator".to_string(),
            ));
        };

        let sig = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| DecodeError::InvalidToken("signature segment is not base64".to_string()))?;
        // A shorter valid prefix must not pass, so the length is pinned
        // before the truncated comparison.
        if sig.len() != self.tag_len {
            return Err(DecodeError::InvalidSignature);
        }
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.key)
            .expect("HMAC accepts any key size");
        mac.update(signed_text.as_bytes());
        mac.verify_truncated_left(&sig)
            .map_err(|_| DecodeError::InvalidSignature)?;

        let ts_bytes = URL_SAFE_NO_PAD
            .decode(ts_b64)
            .map_err(|_| DecodeError::InvalidToken("timestamp segment is not base64".to_string()))?;
        let ts = decode_timestamp(&ts_bytes)
            .ok_or_else(|| DecodeError::InvalidToken("timestamp out of range".to_string()))?;

        if let Some(ttl) = ttl {
            let age_secs = unix_seconds(now).saturating_sub(ts);
            if age_secs > ttl.as_secs() {
                return Err(DecodeError::ExpiredSignature {
                    age_secs,
                    ttl_secs: ttl.as_secs(),
                });
            }
        }

        URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| DecodeError::InvalidToken("payload segment is not base64".to_string()))
    }

    fn compute_tag(&self, signed_text: &[u8]) -> [u8; 32] {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.key)
            .expect("HMAC accepts any key size");
        mac.update(signed_text);
        let result = mac.finalize();
        let mut tag = [0u8; 32];
        tag.copy_from_slice(&result.into_bytes());
        tag
    }
}

/// Derives the signing key: `HMAC(SHA256(secret), context)`.
fn derive_key(secret: &Secret, context: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(secret.expose());
    let master = hasher.finalize();

    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(&master).expect("HMAC accepts any key size");
    mac.update(context.as_bytes());
    let result = mac.finalize();
    let mut key = [0u8; 32];
    key.copy_from_slice(&result.into_bytes());
    key
}

fn unix_seconds(now: SystemTime) -> u64 {
    now.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs())
}

/// Encodes seconds as minimal big-endian bytes, at least one byte.
fn encode_timestamp(ts: u64) -> Vec<u8> {
    let bytes = ts.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(7);
    bytes[start..].to_vec()
}

fn decode_timestamp(bytes: &[u8]) -> Option<u64> {
    if bytes.len() > 8 {
        return None;
    }
    Some(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_signer(context: &str, tag_len: usize) -> TimestampSigner {
        let secret = Secret::new("super_secret_key_123").unwrap();
        let options = SignerOptions {
            personalization: None,
            tag_len,
        };
        TimestampSigner::new(&secret, context, &options).unwrap()
    }

    fn base_time() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    #[test]
    fn test_sign_unsign_roundtrip() {
        let signer = test_signer("test", DEFAULT_TAG_LEN);
        let token = signer.sign(b"Hello, World!");
        let payload = signer.unsign(&token, None).expect("verification failed");
        assert_eq!(payload, b"Hello, World!");
    }

    #[test]
    fn test_token_has_three_segments() {
        let signer = test_signer("test", DEFAULT_TAG_LEN);
        let token = signer.sign(b"data");
        let segments: Vec<&str> = token.split('.').collect();
        assert_eq!(segments.len(), 3);
        for segment in segments {
            assert!(!segment.is_empty());
            assert!(
                segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            );
        }
    }

    #[test]
    fn test_deterministic_for_fixed_timestamp() {
        let signer = test_signer("test", DEFAULT_TAG_LEN);
        let t1 = signer.sign_at(b"data", base_time());
        let t2 = signer.sign_at(b"data", base_time());
        assert_eq!(t1, t2);
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let signer = test_signer("test", DEFAULT_TAG_LEN);
        let token = signer.sign(b"data");

        let (payload_b64, rest) = token.split_once('.').unwrap();
        let mut payload = URL_SAFE_NO_PAD.decode(payload_b64).unwrap();
        if let Some(last) = payload.last_mut() {
            *last ^= 0xFF;
        }
        let corrupted = format!("{}.{rest}", URL_SAFE_NO_PAD.encode(payload));
        assert_eq!(
            signer.unsign(&corrupted, None),
            Err(DecodeError::InvalidSignature)
        );
    }

    #[test]
    fn test_wrong_context_rejected() {
        let signer = test_signer("alpha", DEFAULT_TAG_LEN);
        let other = test_signer("beta", DEFAULT_TAG_LEN);
        let token = signer.sign(b"data");
        assert_eq!(
            other.unsign(&token, None),
            Err(DecodeError::InvalidSignature)
        );
    }

    #[test]
    fn test_expiry_boundary() {
        let signer = test_signer("test", DEFAULT_TAG_LEN);
        let ttl = Some(Duration::from_secs(60));
        let token = signer.sign_at(b"data", base_time());

        // Age equal to the TTL is still valid; one second past is not.
        assert!(
            signer
                .unsign_at(&token, ttl, base_time() + Duration::from_secs(60))
                .is_ok()
        );
        assert_eq!(
            signer.unsign_at(&token, ttl, base_time() + Duration::from_secs(61)),
            Err(DecodeError::ExpiredSignature {
                age_secs: 61,
                ttl_secs: 60,
            })
        );
    }

    #[test]
    fn test_future_timestamp_counts_as_fresh() {
        let signer = test_signer("test", DEFAULT_TAG_LEN);
        let token = signer.sign_at(b"data", base_time() + Duration::from_secs(1000));
        assert!(
            signer
                .unsign_at(&token, Some(Duration::from_secs(60)), base_time())
                .is_ok()
        );
    }

    #[test]
    fn test_no_ttl_never_expires() {
        let signer = test_signer("test", DEFAULT_TAG_LEN);
        let token = signer.sign_at(b"data", UNIX_EPOCH + Duration::from_secs(10_000));
        assert!(signer.unsign(&token, None).is_ok());
    }

    #[test]
    fn test_truncated_tag_prefix_rejected() {
        let signer = test_signer("test", DEFAULT_TAG_LEN);
        let token = signer.sign(b"data");

        let (signed_text, sig_b64) = token.rsplit_once('.').unwrap();
        let sig = URL_SAFE_NO_PAD.decode(sig_b64).unwrap();
        let truncated = format!("{signed_text}.{}", URL_SAFE_NO_PAD.encode(&sig[..16]));
        assert_eq!(
            signer.unsign(&truncated, None),
            Err(DecodeError::InvalidSignature)
        );
    }

    #[test]
    fn test_short_tag_roundtrip() {
        let signer = test_signer("test", 16);
        let token = signer.sign(b"data");
        assert_eq!(signer.unsign(&token, None).unwrap(), b"data");

        let full = test_signer("test", DEFAULT_TAG_LEN);
        assert_eq!(
            full.unsign(&token, None),
            Err(DecodeError::InvalidSignature)
        );
    }

    #[test]
    fn test_structural_garbage() {
        let signer = test_signer("test", DEFAULT_TAG_LEN);
        assert!(matches!(
            signer.unsign("nodots", None),
            Err(DecodeError::InvalidToken(_))
        ));
        assert!(matches!(
            signer.unsign("a.b", None),
            Err(DecodeError::InvalidToken(_))
        ));
        assert!(matches!(
            signer.unsign("%%%.%%%.%%%", None),
            Err(DecodeError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_oversized_timestamp_rejected() {
        let signer = test_signer("test", DEFAULT_TAG_LEN);

        // Correctly signed token whose timestamp segment is 9 bytes wide.
        let signed_text = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(b"data"),
            URL_SAFE_NO_PAD.encode([1u8; 9])
        );
        let tag = signer.compute_tag(signed_text.as_bytes());
        let token = format!("{signed_text}.{}", URL_SAFE_NO_PAD.encode(tag));
        assert!(matches!(
            signer.unsign(&token, None),
            Err(DecodeError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_tag_len_validation() {
        let secret = Secret::new("super_secret_key_123").unwrap();
        let options = SignerOptions {
            personalization: None,
            tag_len: 8,
        };
        assert!(matches!(
            TimestampSigner::new(&secret, "test", &options),
            Err(ConfigError::TagLenOutOfRange(8))
        ));
    }
}
