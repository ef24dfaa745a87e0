//! Prefixed random identifiers
//!
//! Identifiers look like `{prefix}_{random}` where the random part is
//! base64 URL-safe encoded without padding, similar to Stripe's API.

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use rand::RngCore;

/// Minimum number of random bytes in any generated identifier (96 bits).
pub const MIN_ENTROPY_BYTES: usize = 12;

/// Generate a prefixed ID with 96 bits of entropy.
pub fn generate_prefixed_id(prefix: &str) -> String {
    let mut random_bytes = [0u8; MIN_ENTROPY_BYTES];
    rand::rng().fill_bytes(&mut random_bytes);

    let encoded = BASE64_URL_SAFE_NO_PAD.encode(random_bytes);

    format!("{prefix}_{encoded}")
}

/// Validate that a prefixed ID has the expected format
pub fn validate_prefixed_id(id: &str, expected_prefix: &str) -> bool {
    let Some((prefix, encoded)) = id.split_once('_') else {
        return false;
    };

    if prefix != expected_prefix || encoded.is_empty() {
        return false;
    }

    BASE64_URL_SAFE_NO_PAD
        .decode(encoded)
        .is_ok_and(|bytes| bytes.len() >= MIN_ENTROPY_BYTES)
}
