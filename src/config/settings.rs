//! Configuration settings.
//!
//! Defines the per-middleware `CookieConfig` struct, the validated `Secret`
//! key wrapper, and environment variable loading logic.

use std::env;
use std::fmt;
use std::time::Duration;

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::error::{ConfigError, Result};

/// Minimum accepted secret length in bytes.
pub const MIN_SECRET_LEN: usize = 16;

/// Default signature tag length in bytes (full HMAC-SHA256 output).
pub const DEFAULT_TAG_LEN: usize = 32;

/// Minimum signature tag length in bytes.
pub const MIN_TAG_LEN: usize = 16;

fn get_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} must be set in environment"))
}

fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_env_bool(key: &str) -> bool {
    env::var(key)
        .map(|v| v.to_lowercase() == "true" || v == "1")
        .unwrap_or(false)
}

fn get_env_usize_or(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Secret key material for signature derivation.
///
/// Rejects keys shorter than [`MIN_SECRET_LEN`] at construction, renders as
/// `Secret(..)` in debug output, and zeroes its bytes on drop. The raw bytes
/// never leave the crate.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret(Vec<u8>);

impl Secret {
    /// Wraps raw key bytes, enforcing the minimum length.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SecretTooShort`] for keys under
    /// [`MIN_SECRET_LEN`] bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.len() < MIN_SECRET_LEN {
            return Err(ConfigError::SecretTooShort(bytes.len()));
        }
        Ok(Self(bytes))
    }

    pub(crate) fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "STRICT" => Self::Strict,
            "NONE" => Self::None,
            _ => Self::Lax,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

/// Transport attributes attached to every emitted `Set-Cookie` header.
///
/// Passed through verbatim; the crate does not interpret them.
#[derive(Debug, Clone)]
pub struct CookieProperties {
    /// Cookie `Path` attribute.
    pub path: String,
    /// Cookie `Domain` attribute, omitted when `None`.
    pub domain: Option<String>,
    /// Whether to set the `Secure` flag.
    pub secure: bool,
    /// Whether to set the `HttpOnly` flag.
    pub http_only: bool,
    /// Cookie `SameSite` attribute.
    pub same_site: SameSite,
}

impl Default for CookieProperties {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            domain: None,
            secure: false,
            http_only: false,
            same_site: SameSite::Lax,
        }
    }
}

/// Tuning knobs for the token signer.
#[derive(Debug, Clone)]
pub struct SignerOptions {
    /// Extra context mixed into key derivation. A token signed under one
    /// personalization never verifies under another.
    pub personalization: Option<String>,
    /// Emitted signature tag length in bytes, [`MIN_TAG_LEN`] to
    /// [`DEFAULT_TAG_LEN`].
    pub tag_len: usize,
}

impl Default for SignerOptions {
    fn default() -> Self {
        Self {
            personalization: None,
            tag_len: DEFAULT_TAG_LEN,
        }
    }
}

/// Per-middleware cookie configuration.
#[derive(Debug, Clone)]
pub struct CookieConfig {
    /// Secret key material for signature derivation.
    pub secret: Secret,
    /// Key under which decoded state is stored for the request.
    pub state_attribute_name: String,
    /// Name of the cookie to read and write.
    pub cookie_name: String,
    /// Maximum accepted token age. `None` means tokens never expire.
    pub cookie_ttl: Option<Duration>,
    /// Transport attributes for emitted cookies.
    pub properties: CookieProperties,
    /// Signer tuning knobs.
    pub signer: SignerOptions,
}

impl CookieConfig {
    /// Creates a configuration with default transport attributes, no TTL and
    /// a full-length signature tag.
    #[must_use]
    pub fn new(secret: Secret, state_attribute_name: &str, cookie_name: &str) -> Self {
        Self {
            secret,
            state_attribute_name: state_attribute_name.to_string(),
            cookie_name: cookie_name.to_string(),
            cookie_ttl: None,
            properties: CookieProperties::default(),
            signer: SignerOptions::default(),
        }
    }

    /// Sets the maximum accepted token age.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.cookie_ttl = Some(ttl);
        self
    }

    /// Sets the cookie `Path` attribute.
    #[must_use]
    pub fn with_path(mut self, path: &str) -> Self {
        self.properties.path = path.to_string();
        self
    }

    /// Sets the cookie `Domain` attribute.
    #[must_use]
    pub fn with_domain(mut self, domain: &str) -> Self {
        self.properties.domain = Some(domain.to_string());
        self
    }

    /// Sets the `Secure` flag.
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.properties.secure = secure;
        self
    }

    /// Sets the `HttpOnly` flag.
    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.properties.http_only = http_only;
        self
    }

    /// Sets the `SameSite` attribute.
    #[must_use]
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.properties.same_site = same_site;
        self
    }

    /// Sets extra key-derivation context.
    #[must_use]
    pub fn with_personalization(mut self, context: &str) -> Self {
        self.signer.personalization = Some(context.to_string());
        self
    }

    /// Sets the emitted signature tag length in bytes.
    #[must_use]
    pub fn with_tag_len(mut self, tag_len: usize) -> Self {
        self.signer.tag_len = tag_len;
        self
    }

    /// Checks the invariants codec construction relies on.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint: empty state attribute name,
    /// cookie name outside the RFC 6265 token charset, or a tag length
    /// outside [`MIN_TAG_LEN`]`..=`[`DEFAULT_TAG_LEN`].
    pub fn validate(&self) -> Result<()> {
        if self.state_attribute_name.is_empty() {
            return Err(ConfigError::EmptyStateAttribute);
        }
        if self.cookie_name.is_empty() || !self.cookie_name.chars().all(is_cookie_name_char) {
            return Err(ConfigError::InvalidCookieName(self.cookie_name.clone()));
        }
        if !(MIN_TAG_LEN..=DEFAULT_TAG_LEN).contains(&self.signer.tag_len) {
            return Err(ConfigError::TagLenOutOfRange(self.signer.tag_len));
        }
        Ok(())
    }

    /// Loads a configuration from `{prefix}_*` environment variables.
    ///
    /// With `SESSION` as the prefix: `SESSION_SECRET` (required),
    /// `SESSION_COOKIE_NAME`, `SESSION_STATE_ATTRIBUTE` (defaults to the
    /// cookie name), `SESSION_COOKIE_TTL_SECS`, `SESSION_COOKIE_PATH`,
    /// `SESSION_COOKIE_DOMAIN`, `SESSION_COOKIE_SECURE`,
    /// `SESSION_COOKIE_HTTPONLY`, `SESSION_COOKIE_SAMESITE`,
    /// `SESSION_TAG_LEN`.
    ///
    /// # Panics
    ///
    /// Panics if `{prefix}_SECRET` is missing or shorter than
    /// [`MIN_SECRET_LEN`] bytes.
    #[must_use]
    pub fn from_env(prefix: &str) -> Self {
        let secret = Secret::new(get_env(&format!("{prefix}_SECRET")))
            .unwrap_or_else(|e| panic!("{prefix}_SECRET rejected: {e}"));
        let cookie_name = get_env_or(&format!("{prefix}_COOKIE_NAME"), "state");
        let state_attribute_name = get_env_or(&format!("{prefix}_STATE_ATTRIBUTE"), &cookie_name);
        let cookie_ttl = env::var(format!("{prefix}_COOKIE_TTL_SECS"))
            .ok()
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs);
        let domain = env::var(format!("{prefix}_COOKIE_DOMAIN"))
            .ok()
            .filter(|s| !s.is_empty());
        let properties = CookieProperties {
            path: get_env_or(&format!("{prefix}_COOKIE_PATH"), "/"),
            domain,
            secure: get_env_bool(&format!("{prefix}_COOKIE_SECURE")),
            http_only: get_env_bool(&format!("{prefix}_COOKIE_HTTPONLY")),
            same_site: SameSite::from_str(&get_env_or(&format!("{prefix}_COOKIE_SAMESITE"), "lax")),
        };
        let signer = SignerOptions {
            personalization: None,
            tag_len: get_env_usize_or(&format!("{prefix}_TAG_LEN"), DEFAULT_TAG_LEN),
        };

        Self {
            secret,
            state_attribute_name,
            cookie_name,
            cookie_ttl,
            properties,
            signer,
        }
    }
}

// RFC 6265 cookie-name token characters.
fn is_cookie_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}
