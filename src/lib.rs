//! Signed, expiring cookie state for HTTP middleware.
//!
//! Carries small pieces of application state in a tamper-evident,
//! time-bound cookie instead of a server-side store. A codec signs values
//! with HMAC-SHA256 into `payload.timestamp.signature` tokens; the
//! middleware decodes the inbound cookie into per-request state, lets the
//! handler mutate it, and writes the result back as a `Set-Cookie` header.
//! Invalid or expired cookies never fail a request: they surface as an
//! inspectable error on [`CookieData`] and otherwise behave like a missing
//! cookie.
//!
//! ```
//! use cookie_stamp::{
//!     CookieConfig, CookieData, Exchange, PlainExchange, Secret, SignedCookieMiddleware,
//!     SimpleCookieCodec,
//! };
//! use std::time::Duration;
//!
//! let secret = Secret::new("secretsecretsecret").unwrap();
//! let config = CookieConfig::new(secret, "session", "sid").with_ttl(Duration::from_secs(60));
//! let middleware = SignedCookieMiddleware::new(SimpleCookieCodec::new(config).unwrap());
//!
//! let mut conn = PlainExchange::new();
//! middleware
//!     .dispatch(&mut conn, |conn| {
//!         let data = conn.state().get_mut::<CookieData<String>>("session").unwrap();
//!         assert!(data.value().is_none());
//!         data.set("a".to_string());
//!         Ok::<_, ()>(())
//!     })
//!     .unwrap();
//! assert_eq!(conn.set_cookies().len(), 1);
//! ```

pub mod codec;
pub mod config;
pub mod crypto;
pub mod middleware;
pub mod serialize;
pub mod state;

#[cfg(any(test, feature = "testing"))]
pub mod test_utils;

pub use codec::{CookieCodec, SerializedCookieCodec, SimpleCookieCodec};
pub use config::{
    ConfigError, CookieConfig, CookieProperties, DecodeError, EncodeError, SameSite, Secret,
    SignerOptions,
};
pub use crypto::TimestampSigner;
pub use middleware::{
    Exchange, PlainExchange, SignedCookieMiddleware, find_cookie, format_set_cookie,
};
pub use serialize::JsonSerializer;
pub use state::{CookieData, RequestState};
