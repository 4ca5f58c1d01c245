//! Decoder types and traits
//!
//! Defines the core decoder abstractions.

use crate::error::Result;
use crate::types::Record;
use std::borrow::Cow;

/// Trait for turning a response body into records
pub trait RecordDecoder: Send + Sync {
    /// Decode a response body into records
    fn decode(&self, body: &[u8]) -> Result<Vec<Record>>;
}

/// Decode bytes as UTF-8, falling back to Latin-1.
///
/// Exchange archives are not consistently UTF-8; every byte is a valid
/// Latin-1 code point so the fallback never fails.
pub fn decode_text(body: &[u8]) -> Cow<'_, str> {
    let body = body.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(body);
    match std::str::from_utf8(body) {
        Ok(text) => Cow::Borrowed(text),
        // Exact ISO-8859-1; encoding_rs maps this label to windows-1252
        Err(_) => Cow::Owned(body.iter().map(|&b| char::from(b)).collect()),
    }
}
