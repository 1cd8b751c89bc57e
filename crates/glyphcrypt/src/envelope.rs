//! Envelope codec: in-memory [`Envelope`] ⇄ JSON document.
//!
//! # Document format
//!
//! ```text
//! {
//!   "header": { "version", "scheme", "algo", "kdf", "hash", "iterations",
//!               "salt_b64", "nonce_b64", "sp_gate", "min_shen_level", "audit" },
//!   "payload_b64": "<base64(ciphertext || tag)>",
//!   "filename": "<original file name>"
//! }
//! ```
//!
//! The document is pretty-printed with a two-space indent. Armored and
//! unarmored envelopes are byte-identical; armoring only picks the default
//! file suffix.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use glyphcrypt_common::protocol::{AuditMetadata, EnvelopeDocument, HeaderDocument};
use glyphcrypt_common::GlyphError;

use crate::policy::Policy;

/// Decoded envelope header.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    /// Envelope format version tag.
    pub version: String,
    /// Envelope scheme tag.
    pub scheme: String,
    /// AEAD algorithm name as written; resolved only when decrypting.
    pub algorithm: String,
    /// KDF name as written.
    pub kdf: String,
    /// KDF hash name as written.
    pub hash: String,
    /// KDF iteration count.
    pub iterations: u32,
    /// Raw KDF salt.
    pub salt: Vec<u8>,
    /// Raw AEAD nonce.
    pub nonce: Vec<u8>,
    /// Access policy checked before decryption.
    pub policy: Policy,
    /// Operator-supplied audit metadata.
    pub audit: AuditMetadata,
}

/// A complete envelope: header, ciphertext and advisory file name.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Cleartext header.
    pub header: Header,
    /// Ciphertext with the authentication tag appended.
    pub payload: Vec<u8>,
    /// Original plaintext file name.
    pub filename: String,
}

/// Encode an envelope as a pretty-printed JSON document.
///
/// # Errors
///
/// Returns [`GlyphError::Internal`] if JSON encoding fails (audit metadata
/// containing values JSON cannot represent).
pub fn serialize(envelope: &Envelope) -> Result<String, GlyphError> {
    let h = &envelope.header;
    let doc = EnvelopeDocument {
        header: Some(HeaderDocument {
            version: h.version.clone(),
            scheme: h.scheme.clone(),
            algorithm: h.algorithm.clone(),
            kdf: h.kdf.clone(),
            hash: h.hash.clone(),
            iterations: h.iterations,
            salt_b64: STANDARD.encode(&h.salt),
            nonce_b64: STANDARD.encode(&h.nonce),
            allowed_actors: h.policy.allowed_actors.clone(),
            min_level: h.policy.min_level,
            audit: h.audit.clone(),
        }),
        payload_b64: Some(STANDARD.encode(&envelope.payload)),
        filename: Some(envelope.filename.clone()),
    };
    serde_json::to_string_pretty(&doc)
        .map_err(|e| GlyphError::Internal(format!("failed to encode envelope: {e}")))
}

/// Parse a JSON document back into an [`Envelope`].
///
/// # Errors
///
/// Returns [`GlyphError::MalformedEnvelope`] if the bytes are not a JSON
/// object, if `header` or the payload is missing or empty, if a required header
/// field is absent, or if any base64 field does not decode.
pub fn deserialize(document: &[u8]) -> Result<Envelope, GlyphError> {
    let doc: EnvelopeDocument = serde_json::from_slice(document)
        .map_err(|e| GlyphError::MalformedEnvelope(format!("not a glyphcrypt envelope: {e}")))?;

    let header = doc
        .header
        .ok_or_else(|| GlyphError::MalformedEnvelope("missing header".into()))?;
    let payload_b64 = doc
        .payload_b64
        .filter(|p| !p.is_empty())
        .ok_or_else(|| GlyphError::MalformedEnvelope("missing payload".into()))?;

    Ok(Envelope {
        header: Header {
            salt: decode_field("salt_b64", &header.salt_b64)?,
            nonce: decode_field("nonce_b64", &header.nonce_b64)?,
            version: header.version,
            scheme: header.scheme,
            algorithm: header.algorithm,
            kdf: header.kdf,
            hash: header.hash,
            iterations: header.iterations,
            policy: Policy {
                allowed_actors: header.allowed_actors,
                min_level: header.min_level,
            },
            audit: header.audit,
        },
        payload: decode_field("payload_b64", &payload_b64)?,
        filename: doc.filename.unwrap_or_default(),
    })
}

/// Extract the raw `header` object without interpreting any field.
///
/// Unknown header fields are preserved. Used by inspection, which must work
/// on envelopes written by newer or foreign writers.
///
/// # Errors
///
/// Returns [`GlyphError::MalformedEnvelope`] if the document is not a JSON
/// object or has no `header` object.
pub fn header_fields(document: &[u8]) -> Result<serde_json::Map<String, serde_json::Value>, GlyphError> {
    let value: serde_json::Value = serde_json::from_slice(document)
        .map_err(|e| GlyphError::MalformedEnvelope(format!("JSON parse failed: {e}")))?;
    match value {
        serde_json::Value::Object(mut top) => match top.remove("header") {
            Some(serde_json::Value::Object(header)) => Ok(header),
            Some(_) => Err(GlyphError::MalformedEnvelope("header is not an object".into())),
            None => Err(GlyphError::MalformedEnvelope("missing header".into())),
        },
        _ => Err(GlyphError::MalformedEnvelope(
            "top level is not a JSON object".into(),
        )),
    }
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>, GlyphError> {
    STANDARD
        .decode(value)
        .map_err(|e| GlyphError::MalformedEnvelope(format!("{name} is not valid base64: {e}")))
}
