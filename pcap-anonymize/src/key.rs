//! Anonymization key: generation and derivation

use rand::distr::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Default length of generated keys
pub const KEY_LEN: usize = 16;

/// Generate a random alphanumeric key of `len` characters
pub fn generate_key(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Derive the keystream key from a key string (SHA-256)
pub fn derive_key(key: &str) -> [u8; 32] {
    Sha256::digest(key.as_bytes()).into()
}
