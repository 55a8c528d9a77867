//! Version token normalization and the corruption heuristic
//!
//! Version tokens are opaque; only equality between normalized forms is
//! meaningful. Stored tokens may carry `=` padding or whitespace left over from
//! encoding, which normalization removes.

use std::sync::LazyLock;

use regex::Regex;

/// Normalized tokens longer than this are considered corrupt
pub const MAX_VERSION_LEN: usize = 10;

static INVALID_VERSION_CHAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9.]").expect("valid version pattern"));

/// Normalize a raw version token.
///
/// Strips trailing `=` padding and surrounding whitespace. Padding interleaved
/// with trailing whitespace is removed as a whole so that normalizing twice
/// yields the same result.
pub fn normalize(token: Option<&str>) -> Option<String> {
    let token = token?;
    Some(
        token
            .trim_start()
            .trim_end_matches(|c: char| c == '=' || c.is_whitespace())
            .to_string(),
    )
}

/// Returns true when a token must not be trusted.
///
/// This is a format check, not a checksum: a damaged token that still happens
/// to look well-formed passes.
pub fn is_corrupt(token: Option<&str>) -> bool {
    match normalize(token) {
        None => true,
        Some(v) => {
            v.is_empty() || v.chars().count() > MAX_VERSION_LEN || INVALID_VERSION_CHAR.is_match(&v)
        }
    }
}

/// Decode the text of a stored version record.
///
/// Records are written JSON-encoded, but older records may hold the bare token.
/// Non-string JSON scalars are taken by their textual form.
pub fn decode_record(text: &str) -> Option<String> {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(serde_json::Value::String(s)) => Some(s),
        Ok(serde_json::Value::Null) => None,
        Ok(other) => Some(other.to_string()),
        Err(_) => Some(text.to_string()),
    }
}

/// Encode a normalized token for storage as a version record
pub fn encode_record(token: &str) -> String {
    serde_json::Value::String(token.to_string()).to_string()
}

/// Returns true when `stored` is trustworthy and matches the normalized `remote` token
pub fn matches(stored: Option<&str>, remote: &str) -> bool {
    if is_corrupt(stored) {
        return false;
    }
    normalize(stored).as_deref() == Some(remote)
}
