use std::time::Duration;

use cookie_stamp::{CookieConfig, Secret};
use tracing_subscriber::EnvFilter;

/// Installs a test subscriber so `RUST_LOG` controls middleware output.
/// Safe to call from every test; only the first call wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn test_secret() -> Secret {
    Secret::new("secretsecretsecret").unwrap()
}

pub fn test_config(state_attribute_name: &str, cookie_name: &str) -> CookieConfig {
    CookieConfig::new(test_secret(), state_attribute_name, cookie_name)
        .with_ttl(Duration::from_secs(60))
}
