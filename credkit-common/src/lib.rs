//! Credkit Common
//!
//! Shared utilities for the credkit key-management stack.
//!
//! This crate provides:
//! - Component-based structured logging with store context
//! - Logger initialisation from a serde-friendly config
//! - DNS-safe compact ID generation for public keys

pub mod logging;

pub use logging::{Component, LogLevel, Logger, LoggingConfig};

/// Utility module for compact ID encoding
pub mod compact_ids {
    use data_encoding::BASE32HEX_NOPAD;
    use sha2::{Digest, Sha256};

    /// Generate a DNS-safe compact ID from public key bytes using SHA-256 hash.
    /// - Input: any public key encoding (SEC1 point, PKCS#1 DER)
    /// - Truncate: first 16 bytes of SHA-256 hash
    /// - Encode: Base32hex (no padding), lowercase (26 chars)
    pub fn compact_id(public_key: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(public_key);
        let hash_result = hasher.finalize();

        let compact_hash = &hash_result[..16];
        BASE32HEX_NOPAD.encode(compact_hash).to_lowercase()
    }

}
