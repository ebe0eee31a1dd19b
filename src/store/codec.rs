//! store::codec
//!
//! Transport encoding of document bytes.
//!
//! The contents API carries file bytes as standard base64. On reads GitHub
//! wraps the encoded text at 60 columns, so ASCII whitespace is dropped
//! before decoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::StoreError;

/// Encode document text for the wire.
pub fn encode(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Decode wire content back to UTF-8 document text.
pub fn decode(encoded: &str) -> Result<String, StoreError> {
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| StoreError::InvalidContent(format!("bad base64: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| StoreError::InvalidContent(format!("not UTF-8: {}", e)))
}
