//! Token signing.
//!
//! Implements HMAC-SHA256 signing and verification of timestamped,
//! URL-safe tokens.

mod signer;

pub use signer::TimestampSigner;
