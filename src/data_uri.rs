//! `data:<mime>;base64,<payload>` helpers.

use crate::error::{Result, SpriteGenError};
use base64::{engine::general_purpose::STANDARD, Engine as _};

pub const DEFAULT_MIME: &str = "image/png";

/// Wrap an already base64-encoded payload.
pub fn wrap(mime: Option<&str>, payload_base64: &str) -> String {
    let mime = mime.filter(|m| !m.is_empty()).unwrap_or(DEFAULT_MIME);
    format!("data:{};base64,{}", mime, payload_base64)
}

/// Encode raw bytes into a data URI.
pub fn encode(mime: &str, bytes: &[u8]) -> String {
    wrap(Some(mime), &STANDARD.encode(bytes))
}

/// Split a data URI and decode its payload. Returns `(mime, bytes)`.
pub fn decode(uri: &str) -> Result<(String, Vec<u8>)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| SpriteGenError::SerializationError("not a data URI".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| SpriteGenError::SerializationError("data URI has no payload".into()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| SpriteGenError::SerializationError("data URI is not base64".into()))?;

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| SpriteGenError::SerializationError(format!("bad base64 payload: {}", e)))?;

    Ok((mime.to_string(), bytes))
}
