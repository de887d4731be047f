//! Test utilities and shared configuration.
//!
//! This module provides common helpers for unit and integration tests,
//! reducing duplication across the codebase.

#[cfg(any(test, feature = "testing"))]
use crate::config::{CookieConfig, Secret};
#[cfg(any(test, feature = "testing"))]
use std::time::Duration;

/// Standard test secret, long enough to pass validation.
#[cfg(any(test, feature = "testing"))]
#[must_use]
pub fn create_test_secret() -> Secret {
    Secret::new("secretsecretsecret").expect("test secret meets the minimum length")
}

/// Creates a standard configuration for testing purposes.
///
/// This configuration has:
/// - The shared test secret
/// - A 60 second TTL
/// - Default transport attributes
#[cfg(any(test, feature = "testing"))]
#[must_use]
pub fn create_test_config(state_attribute_name: &str, cookie_name: &str) -> CookieConfig {
    CookieConfig::new(create_test_secret(), state_attribute_name, cookie_name)
        .with_ttl(Duration::from_secs(60))
}
