//! Opaque refresh values.

use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{RngCore, rngs::OsRng};

const REFRESH_VALUE_BYTES: usize = 32;
const FINGERPRINT_LEN: usize = 8;

/// Generate a fresh refresh value: 256 random bits, URL-safe base64.
pub fn generate_refresh_value() -> String {
    let mut raw = [0u8; REFRESH_VALUE_BYTES];
    OsRng.fill_bytes(&mut raw);
    Base64UrlUnpadded::encode_string(&raw)
}

/// Short prefix of a credential value, for log lines.
pub fn fingerprint(value: &str) -> &str {
    let end = value
        .char_indices()
        .nth(FINGERPRINT_LEN)
        .map(|(idx, _)| idx)
        .unwrap_or(value.len());
    &value[..end]
}
