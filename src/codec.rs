//! Cookie codecs.
//!
//! Convert state values into signed cookie strings and back. Both codecs
//! share the signing pipeline and differ only in the payload transform:
//! [`SimpleCookieCodec`] carries a plain string, [`SerializedCookieCodec`]
//! carries any serde value as JSON.

use std::marker::PhantomData;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::{ConfigError, CookieConfig, CookieProperties, DecodeError, EncodeError};
use crate::crypto::TimestampSigner;
use crate::serialize::JsonSerializer;
use crate::state::CookieData;

/// Converts between state values and signed cookie strings.
///
/// Decoding never lets a failure escape: the outcome is always a
/// [`CookieData`], and a missing or empty cookie short-circuits to the
/// empty state without touching the signer.
pub trait CookieCodec: Send + Sync {
    /// The state value carried by the cookie.
    type Value: Send + 'static;

    /// Encodes a value into a signed cookie string.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] when the value cannot be serialized.
    fn encode(&self, value: &Self::Value) -> Result<String, EncodeError>;

    /// Decodes an inbound cookie value, if any.
    fn decode(&self, cookie: Option<&str>) -> CookieData<Self::Value>;

    /// Name of the cookie this codec reads and writes.
    fn cookie_name(&self) -> &str;

    /// Key under which decoded state is stored for the request.
    fn state_attribute_name(&self) -> &str;

    /// Maximum accepted token age, also emitted as the cookie `Max-Age`.
    fn max_age(&self) -> Option<Duration>;

    /// Transport attributes for emitted cookies.
    fn properties(&self) -> &CookieProperties;
}

/// Signing pipeline shared by both codecs.
///
/// The signer key is bound to the codec kind and cookie name, so a token
/// minted for one cookie or codec never verifies for another.
#[derive(Clone)]
struct CodecCore {
    signer: TimestampSigner,
    config: CookieConfig,
}

impl CodecCore {
    fn new(kind: &str, config: CookieConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut context = format!("{kind}:{}", config.cookie_name);
        if let Some(extra) = &config.signer.personalization {
            context.push(':');
            context.push_str(extra);
        }
        let signer = TimestampSigner::new(&config.secret, &context, &config.signer)?;
        Ok(Self { signer, config })
    }

    fn sign(&self, payload: &[u8]) -> String {
        self.signer.sign(payload)
    }

    fn unsign(&self, token: &str) -> Result<Vec<u8>, DecodeError> {
        self.signer.unsign(token, self.config.cookie_ttl)
    }
}

fn capture<T>(cookie_name: &str, outcome: Result<T, DecodeError>) -> CookieData<T> {
    match outcome {
        Ok(value) => CookieData::with_value(value),
        Err(error) => {
            match &error {
                DecodeError::InvalidSignature => {
                    warn!(cookie = %cookie_name, error = %error, "rejected signed cookie");
                }
                _ => debug!(cookie = %cookie_name, error = %error, "discarded signed cookie"),
            }
            CookieData::with_error(error)
        }
    }
}

/// Codec for plain string state.
///
/// The string's UTF-8 bytes are signed directly; no structural
/// serialization is involved.
#[derive(Clone)]
pub struct SimpleCookieCodec {
    core: CodecCore,
}

impl SimpleCookieCodec {
    /// Builds the codec, validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an invalid cookie name, empty state
    /// attribute, or out-of-range tag length.
    pub fn new(config: CookieConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            core: CodecCore::new("SimpleCookieCodec", config)?,
        })
    }

    /// The signer minting this codec's tokens.
    ///
    /// Useful for minting tokens outside the middleware cycle, e.g.
    /// back-dated ones in expiry tests.
    #[must_use]
    pub fn signer(&self) -> &TimestampSigner {
        &self.core.signer
    }
}

impl CookieCodec for SimpleCookieCodec {
    type Value = String;

    fn encode(&self, value: &String) -> Result<String, EncodeError> {
        Ok(self.core.sign(value.as_bytes()))
    }

    fn decode(&self, cookie: Option<&str>) -> CookieData<String> {
        let Some(token) = cookie.filter(|c| !c.is_empty()) else {
            return CookieData::empty();
        };
        let outcome = self.core.unsign(token).and_then(|payload| {
            String::from_utf8(payload)
                .map_err(|_| DecodeError::InvalidToken("payload is not UTF-8".to_string()))
        });
        capture(&self.core.config.cookie_name, outcome)
    }

    fn cookie_name(&self) -> &str {
        &self.core.config.cookie_name
    }

    fn state_attribute_name(&self) -> &str {
        &self.core.config.state_attribute_name
    }

    fn max_age(&self) -> Option<Duration> {
        self.core.config.cookie_ttl
    }

    fn properties(&self) -> &CookieProperties {
        &self.core.config.properties
    }
}

/// Codec for structured state, carried as signed JSON.
///
/// Works for any `T` that serde can round-trip; `serde_json::Value` covers
/// free-form trees. Pass a compressing [`JsonSerializer`] through
/// [`with_serializer`](Self::with_serializer) for large payloads.
pub struct SerializedCookieCodec<T> {
    core: CodecCore,
    serializer: JsonSerializer,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SerializedCookieCodec<T> {
    /// Builds the codec with a plain JSON serializer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an invalid cookie name, empty state
    /// attribute, or out-of-range tag length.
    pub fn new(config: CookieConfig) -> Result<Self, ConfigError> {
        Self::with_serializer(config, JsonSerializer::new())
    }

    /// Builds the codec with an explicit serializer.
    ///
    /// # Errors
    ///
    /// Same conditions as [`new`](Self::new).
    pub fn with_serializer(
        config: CookieConfig,
        serializer: JsonSerializer,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            core: CodecCore::new("SerializedCookieCodec", config)?,
            serializer,
            _marker: PhantomData,
        })
    }

    /// The signer minting this codec's tokens.
    #[must_use]
    pub fn signer(&self) -> &TimestampSigner {
        &self.core.signer
    }
}

impl<T> Clone for SerializedCookieCodec<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
            serializer: self.serializer.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> CookieCodec for SerializedCookieCodec<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    type Value = T;

    fn encode(&self, value: &T) -> Result<String, EncodeError> {
        let payload = self.serializer.dumps(value)?;
        Ok(self.core.sign(&payload))
    }

    fn decode(&self, cookie: Option<&str>) -> CookieData<T> {
        let Some(token) = cookie.filter(|c| !c.is_empty()) else {
            return CookieData::empty();
        };
        let outcome = self
            .core
            .unsign(token)
            .and_then(|payload| self.serializer.loads(&payload));
        capture(&self.core.config.cookie_name, outcome)
    }

    fn cookie_name(&self) -> &str {
        &self.core.config.cookie_name
    }

    fn state_attribute_name(&self) -> &str {
        &self.core.config.state_attribute_name
    }

    fn max_age(&self) -> Option<Duration> {
        self.core.config.cookie_ttl
    }

    fn properties(&self) -> &CookieProperties {
        &self.core.config.properties
    }
}
