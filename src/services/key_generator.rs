//! Storage key derivation.
//!
//! Keys are `{prefix}/{token}.{ext}` (or `{token}.{ext}` without a prefix).
//! The token is a fresh UUIDv4, so keys never collide and never reveal the
//! caller's original filename. Only the extension is carried over.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid filename `{filename}`: {reason}")]
pub struct InvalidFilename {
    pub filename: String,
    pub reason: &'static str,
}

/// Extension of `filename`, i.e. everything after the last `.`.
///
/// A leading dot alone (`.env`) or a trailing dot (`cat.`) does not count.
pub fn extension(filename: &str) -> Result<&str, InvalidFilename> {
    let invalid = |reason| InvalidFilename {
        filename: filename.to_string(),
        reason,
    };

    let dot = match filename.rfind('.') {
        Some(0) | None => return Err(invalid("missing file extension")),
        Some(pos) => pos,
    };
    let ext = &filename[dot + 1..];
    if ext.is_empty() {
        return Err(invalid("empty file extension"));
    }
    if ext
        .chars()
        .any(|c| c == '/' || c == '\\' || c.is_control() || c.is_whitespace())
    {
        return Err(invalid("file extension contains illegal characters"));
    }
    Ok(ext)
}

/// Generate a fresh key for `original_filename` under `prefix`.
///
/// `prefix` is expected to be already normalized (no leading or trailing `/`).
pub fn generate(original_filename: &str, prefix: &str) -> Result<String, InvalidFilename> {
    let ext = extension(original_filename)?;
    let token = Uuid::new_v4();
    Ok(if prefix.is_empty() {
        format!("{}.{}", token, ext)
    } else {
        format!("{}/{}.{}", prefix, token, ext)
    })
}
