//! Header inspection without key material.

use std::fs;
use std::path::Path;

use glyphcrypt_common::GlyphError;
use serde_json::{Map, Value};

use crate::envelope;

/// Read an envelope file and return its header fields as stored.
///
/// No passphrase, identity or configuration is consulted, and the policy is
/// not evaluated.
///
/// # Errors
///
/// Returns [`GlyphError::Io`] if the file cannot be read and
/// [`GlyphError::MalformedEnvelope`] if it is not an envelope document.
pub fn inspect_file(path: &Path) -> Result<Map<String, Value>, GlyphError> {
    let document = fs::read(path)
        .map_err(|e| GlyphError::io(format!("failed to read {}", path.display()), e))?;
    envelope::header_fields(&document)
}
