//! Envelope document types as they appear on disk.
//!
//! Field names and base64 text are part of the interchange format: other
//! readers of `.gcrypt` files depend on them, so they must not be renamed.
//! Binary values are carried as standard (padded) base64 strings.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// AEAD algorithm assumed when a header does not name one.
pub const DEFAULT_ALGORITHM: &str = "AES-256-GCM";

/// KDF assumed when a header does not name one.
pub const DEFAULT_KDF: &str = "PBKDF2HMAC";

/// KDF hash assumed when a header does not name one.
pub const DEFAULT_HASH: &str = "SHA256";

/// Iteration count assumed when a header does not carry one.
pub const DEFAULT_ITERATIONS: u32 = 200_000;

/// Free-form audit metadata copied from configuration into every header.
pub type AuditMetadata = BTreeMap<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Top-level envelope document.
///
/// `header` and `payload_b64` are optional here so that a missing field can be
/// reported as a malformed envelope rather than a generic parse error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeDocument {
    /// Cleartext metadata, including every key-derivation input except the passphrase.
    pub header: Option<HeaderDocument>,

    /// Base64 of ciphertext followed by the authentication tag.
    #[serde(alias = "payload")]
    pub payload_b64: Option<String>,

    /// Original file name of the plaintext. Advisory only.
    #[serde(default)]
    pub filename: Option<String>,
}

/// Envelope header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderDocument {
    /// Envelope format version tag.
    #[serde(default)]
    pub version: String,

    /// Envelope scheme tag.
    #[serde(default)]
    pub scheme: String,

    /// AEAD algorithm name (e.g. `"AES-256-GCM"`).
    #[serde(rename = "algo", alias = "algorithm", default = "default_algorithm")]
    pub algorithm: String,

    /// Key derivation function name.
    #[serde(default = "default_kdf")]
    pub kdf: String,

    /// Hash used inside the KDF.
    #[serde(default = "default_hash")]
    pub hash: String,

    /// KDF iteration count.
    #[serde(default = "default_iterations")]
    pub iterations: u32,

    /// Base64 KDF salt.
    pub salt_b64: String,

    /// Base64 AEAD nonce.
    pub nonce_b64: String,

    /// Actors permitted to decrypt; empty means any actor.
    /// An explicit `null` reads as empty.
    #[serde(
        rename = "sp_gate",
        alias = "allowed_actors",
        default,
        deserialize_with = "null_as_default"
    )]
    pub allowed_actors: Vec<String>,

    /// Minimum level required to decrypt.
    #[serde(rename = "min_shen_level", alias = "min_level", default)]
    pub min_level: i64,

    /// Audit metadata supplied by the encrypting operator.
    #[serde(default)]
    pub audit: AuditMetadata,
}

fn default_algorithm() -> String {
    DEFAULT_ALGORITHM.into()
}
fn default_kdf() -> String {
    DEFAULT_KDF.into()
}
fn default_hash() -> String {
    DEFAULT_HASH.into()
}
fn default_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_header() -> HeaderDocument {
        HeaderDocument {
            version: "1.0".into(),
            scheme: "GlyphCrypt-AEAD".into(),
            algorithm: DEFAULT_ALGORITHM.into(),
            kdf: DEFAULT_KDF.into(),
            hash: DEFAULT_HASH.into(),
            iterations: 1000,
            salt_b64: "AAAAAAAAAAAAAAAAAAAAAA==".into(),
            nonce_b64: "AAAAAAAAAAAAAAAA".into(),
            allowed_actors: vec!["sp-ethos".into()],
            min_level: 2,
            audit: AuditMetadata::new(),
        }
    }

    #[test]
    fn header_uses_interchange_field_names() {
        let value = serde_json::to_value(sample_header()).unwrap();
        let obj = value.as_object().unwrap();
        for key in [
            "version",
            "scheme",
            "algo",
            "kdf",
            "hash",
            "iterations",
            "salt_b64",
            "nonce_b64",
            "sp_gate",
            "min_shen_level",
            "audit",
        ] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert_eq!(obj.len(), 11);
    }

    #[test]
    fn header_field_order_is_stable() {
        let text = serde_json::to_string(&sample_header()).unwrap();
        let algo = text.find("\"algo\"").unwrap();
        let salt = text.find("\"salt_b64\"").unwrap();
        let gate = text.find("\"sp_gate\"").unwrap();
        assert!(algo < salt && salt < gate);
    }

    #[test]
    fn optional_header_fields_take_defaults() {
        let header: HeaderDocument = serde_json::from_value(json!({
            "salt_b64": "AAAA",
            "nonce_b64": "AAAA"
        }))
        .unwrap();
        assert_eq!(header.algorithm, DEFAULT_ALGORITHM);
        assert_eq!(header.kdf, DEFAULT_KDF);
        assert_eq!(header.hash, DEFAULT_HASH);
        assert_eq!(header.iterations, DEFAULT_ITERATIONS);
        assert!(header.allowed_actors.is_empty());
        assert_eq!(header.min_level, 0);
    }

    #[test]
    fn readers_accept_descriptive_aliases() {
        let doc: EnvelopeDocument = serde_json::from_value(json!({
            "header": {
                "algorithm": "AES-256-GCM-SIV",
                "salt_b64": "AAAA",
                "nonce_b64": "AAAA",
                "allowed_actors": ["a"],
                "min_level": 4
            },
            "payload": "AAAA"
        }))
        .unwrap();
        let header = doc.header.unwrap();
        assert_eq!(header.algorithm, "AES-256-GCM-SIV");
        assert_eq!(header.allowed_actors, vec!["a".to_string()]);
        assert_eq!(header.min_level, 4);
        assert_eq!(doc.payload_b64.as_deref(), Some("AAAA"));
        assert!(doc.filename.is_none());
    }

    #[test]
    fn null_allow_list_reads_as_empty() {
        let header: HeaderDocument = serde_json::from_value(json!({
            "salt_b64": "AAAA",
            "nonce_b64": "AAAA",
            "sp_gate": null,
            "min_shen_level": 1
        }))
        .unwrap();
        assert!(header.allowed_actors.is_empty());
        assert_eq!(header.min_level, 1);
    }
}
