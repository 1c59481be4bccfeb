//! Response cache key derivation.
//!
//! The key covers the normalized message, the course day, the language, and
//! the request type. Subscription tier is deliberately not part of it.

use sha2::{Digest, Sha256};

const KEY_PREFIX: &str = "response:";
const FIELD_SEPARATOR: u8 = 0x1f;

/// Trim, collapse whitespace runs to one space, lowercase.
pub fn normalize_message(message: &str) -> String {
    message
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Cache key for an assistant response.
pub fn response_cache_key(message: &str, day: u32, language_id: &str, request_type: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_message(message).as_bytes());
    hasher.update([FIELD_SEPARATOR]);
    hasher.update(day.to_string().as_bytes());
    hasher.update([FIELD_SEPARATOR]);
    hasher.update(language_id.as_bytes());
    hasher.update([FIELD_SEPARATOR]);
    hasher.update(request_type.as_bytes());
    format!("{KEY_PREFIX}{}", hex::encode(hasher.finalize()))
}
