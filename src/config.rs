//! Configuration management.
//!
//! Defines cookie, signer and secret settings, their validation, and the
//! error taxonomy shared across the crate. Settings can be built in code or
//! loaded from prefixed environment variables.

mod error;
mod settings;

pub use error::{ConfigError, DecodeError, EncodeError, Result};
pub use settings::{
    CookieConfig, CookieProperties, DEFAULT_TAG_LEN, MIN_SECRET_LEN, MIN_TAG_LEN, SameSite, Secret,
    SignerOptions,
};
