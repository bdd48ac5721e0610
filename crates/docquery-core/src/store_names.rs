//! Store naming conventions.
//!
//! Every uploaded document gets a fresh remote store whose display name is a
//! fixed prefix plus a short random suffix. Names are session-scoped, so the
//! suffix only needs to make collisions unlikely, not impossible.

use rand::Rng;

use crate::error::CoreError;

pub const STORE_NAME_PREFIX: &str = "streams-pdf-chat";

pub const RANDOM_ID_LEN: usize = 8;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Random string of lowercase ASCII letters and digits.
pub fn generate_random_id(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// `{prefix}-{8 random chars}`, generated per call.
pub fn build_store_name(prefix: &str) -> String {
    format!("{prefix}-{}", generate_random_id(RANDOM_ID_LEN))
}

/// Check a configured prefix before it is used to name stores.
///
/// Prefixes must be non-empty and limited to lowercase ASCII letters, digits
/// and hyphens, matching the alphabet of the generated suffix.
pub fn validate_prefix(prefix: &str) -> Result<(), CoreError> {
    if prefix.is_empty() {
        return Err(CoreError::InvalidStoreName("prefix is empty".to_string()));
    }
    if let Some(c) = prefix
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        return Err(CoreError::InvalidStoreName(format!(
            "prefix {prefix:?} contains unsupported character {c:?}"
        )));
    }
    Ok(())
}
