//! Configuration loading and validation.
//!
//! Values are layered from an optional YAML file and `GLYPHCRYPT_*`
//! environment variables (`GLYPHCRYPT_CRYPTO__ITERATIONS=100000`), validated
//! once, and handed to every pipeline call as an immutable [`CryptoConfig`].

use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use glyphcrypt_common::protocol::AuditMetadata;
use glyphcrypt_common::GlyphError;
use serde::Deserialize;

use crate::crypto::{AeadAlgorithm, HashAlgorithm, KdfAlgorithm};
use crate::policy::Policy;
use crate::transform::GlyphMap;

/// Configuration file read when `--config` is not given. Optional.
pub const DEFAULT_CONFIG_PATH: &str = "glyphcrypt.yaml";

/// Prefix of environment variables that override file values.
pub const ENV_PREFIX: &str = "GLYPHCRYPT";

/// Smallest accepted salt length in bytes.
pub const MIN_SALT_BYTES: usize = 8;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Tags and naming written into every envelope.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EnvelopeSettings {
    /// Header `version` tag.
    #[serde(default = "default_version")]
    pub version: String,

    /// Header `scheme` tag.
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Armored envelopes take [`IoSettings::suffix`], others [`IoSettings::binary_suffix`].
    /// The document bytes are identical either way.
    #[serde(default = "default_armor")]
    pub armor: bool,
}

/// File handling around the pipelines.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IoSettings {
    /// Keep the plaintext source after a successful encryption.
    #[serde(default)]
    pub keep_plaintext: bool,

    /// Default suffix for armored envelopes.
    #[serde(default = "default_suffix")]
    pub suffix: String,

    /// Default suffix for unarmored envelopes.
    #[serde(default = "default_binary_suffix")]
    pub binary_suffix: String,
}

/// Validated configuration passed explicitly into every pipeline call.
#[derive(Debug, Clone)]
pub struct CryptoConfig {
    /// AEAD algorithm for new envelopes.
    pub algorithm: AeadAlgorithm,
    /// KDF for new envelopes.
    pub kdf: KdfAlgorithm,
    /// KDF hash for new envelopes.
    pub hash: HashAlgorithm,
    /// KDF iteration count for new envelopes.
    pub iterations: NonZeroU32,
    /// Salt length in bytes.
    pub salt_len: usize,
    /// Nonce length in bytes; always equal to the algorithm's nonce length.
    pub nonce_len: usize,
    /// Envelope tags and armoring.
    pub envelope: EnvelopeSettings,
    /// Policy written when the caller does not supply one.
    pub policy: Policy,
    /// Source deletion and output naming.
    pub io: IoSettings,
    /// Pre-transform rules.
    pub glyph_map: GlyphMap,
    /// Copied verbatim into every header.
    pub audit: AuditMetadata,
    /// Tracing filter used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
}

impl CryptoConfig {
    /// Default output suffix, chosen by the armor flag.
    pub fn output_suffix(&self) -> &str {
        if self.envelope.armor {
            &self.io.suffix
        } else {
            &self.io.binary_suffix
        }
    }

    /// Load and validate configuration.
    ///
    /// With `Some(path)` the file must exist. With `None`,
    /// [`DEFAULT_CONFIG_PATH`] is read if present and built-in defaults apply
    /// otherwise. Environment variables override file values in both cases.
    ///
    /// # Errors
    ///
    /// Returns [`GlyphError::Config`] for unreadable or invalid values, and
    /// [`GlyphError::UnsupportedAlgorithm`] / [`GlyphError::UnsupportedHash`]
    /// for algorithm names outside the supported set.
    pub fn load(path: Option<&Path>) -> Result<Self, GlyphError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        let cfg = config::Config::builder()
            .add_source(
                config::File::from(path.as_path())
                    .format(config::FileFormat::Yaml)
                    .required(required),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| GlyphError::Config(format!("failed to build configuration: {e}")))?;

        let mut raw: RawConfig = cfg
            .try_deserialize()
            .map_err(|e| GlyphError::Config(format!("failed to deserialise configuration: {e}")))?;

        // The builder lowercases keys; audit keys are copied into headers as
        // written, so the file's section is read again with a plain parser.
        if let Some(audit) = read_file_audit(&path, required)? {
            raw.audit = merge_audit(audit, raw.audit);
        }

        Self::from_raw(raw)
    }

    /// Non-fatal problems in the validated settings, one message each.
    ///
    /// Returned rather than logged so callers can report them once a
    /// subscriber is installed.
    pub fn warnings(&self) -> Vec<String> {
        self.glyph_map
            .overlapping_values()
            .into_iter()
            .map(|(a, b)| {
                format!(
                    "glyph_map rules {a} and {b} have overlapping replacement values; text may not round-trip"
                )
            })
            .collect()
    }

    /// Validate raw values, returning a descriptive error on the first failure.
    fn from_raw(raw: RawConfig) -> Result<Self, GlyphError> {
        let algorithm: AeadAlgorithm = raw.crypto.algorithm.parse()?;
        let hash: HashAlgorithm = raw.crypto.hash.parse()?;

        let iterations = NonZeroU32::new(raw.crypto.iterations)
            .ok_or_else(|| GlyphError::Config("crypto.iterations must be > 0".into()))?;
        if raw.crypto.salt_bytes < MIN_SALT_BYTES {
            return Err(GlyphError::Config(format!(
                "crypto.salt_bytes must be >= {MIN_SALT_BYTES}"
            )));
        }
        if raw.crypto.nonce_bytes != algorithm.nonce_len() {
            return Err(GlyphError::Config(format!(
                "crypto.nonce_bytes must be {} for {algorithm}",
                algorithm.nonce_len()
            )));
        }

        ensure_non_empty(&raw.io.suffix, "io.suffix")?;
        ensure_non_empty(&raw.io.binary_suffix, "io.binary_suffix")?;
        ensure_non_empty(&raw.log_level, "log_level")?;

        if let Some(i) = raw.glyph_map.first_empty_rule() {
            return Err(GlyphError::Config(format!(
                "glyph_map rule {i} has an empty `from` or `to`"
            )));
        }
        Ok(Self {
            algorithm,
            kdf: KdfAlgorithm::Pbkdf2Hmac,
            hash,
            iterations,
            salt_len: raw.crypto.salt_bytes,
            nonce_len: raw.crypto.nonce_bytes,
            envelope: raw.envelope,
            policy: Policy {
                allowed_actors: raw.policy.allowed_actors,
                min_level: raw.policy.min_level,
            },
            io: raw.io,
            glyph_map: raw.glyph_map,
            audit: raw.audit,
            log_level: raw.log_level,
            log_format: raw.log_format,
        })
    }
}

impl Default for CryptoConfig {
    /// Built-in defaults, identical to loading an empty configuration.
    fn default() -> Self {
        Self {
            algorithm: AeadAlgorithm::Aes256Gcm,
            kdf: KdfAlgorithm::Pbkdf2Hmac,
            hash: HashAlgorithm::Sha256,
            iterations: NonZeroU32::new(default_iterations()).unwrap_or(NonZeroU32::MIN),
            salt_len: default_salt_bytes(),
            nonce_len: default_nonce_bytes(),
            envelope: EnvelopeSettings::default(),
            policy: Policy::default(),
            io: IoSettings::default(),
            glyph_map: GlyphMap::default(),
            audit: AuditMetadata::new(),
            log_level: default_log_level(),
            log_format: LogFormat::Text,
        }
    }
}

// ---------------------------------------------------------------------------
// Raw (unvalidated) shape
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    log_format: LogFormat,
    #[serde(default)]
    crypto: RawCrypto,
    #[serde(default)]
    envelope: EnvelopeSettings,
    #[serde(default)]
    policy: RawPolicy,
    #[serde(default)]
    io: IoSettings,
    #[serde(default)]
    glyph_map: GlyphMap,
    #[serde(default)]
    audit: AuditMetadata,
}

#[derive(Debug, Clone, Deserialize)]
struct RawCrypto {
    #[serde(default = "default_algorithm")]
    algorithm: String,
    #[serde(default = "default_hash")]
    hash: String,
    #[serde(default = "default_iterations")]
    iterations: u32,
    #[serde(default = "default_salt_bytes")]
    salt_bytes: usize,
    #[serde(default = "default_nonce_bytes")]
    nonce_bytes: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawPolicy {
    #[serde(default)]
    allowed_actors: Vec<String>,
    #[serde(default)]
    min_level: i64,
}

impl Default for RawCrypto {
    fn default() -> Self {
        Self {
            algorithm: default_algorithm(),
            hash: default_hash(),
            iterations: default_iterations(),
            salt_bytes: default_salt_bytes(),
            nonce_bytes: default_nonce_bytes(),
        }
    }
}

impl Default for EnvelopeSettings {
    fn default() -> Self {
        Self {
            version: default_version(),
            scheme: default_scheme(),
            armor: default_armor(),
        }
    }
}

impl Default for IoSettings {
    fn default() -> Self {
        Self {
            keep_plaintext: false,
            suffix: default_suffix(),
            binary_suffix: default_binary_suffix(),
        }
    }
}

fn default_algorithm() -> String {
    "AES-256-GCM".into()
}
fn default_hash() -> String {
    "SHA256".into()
}
fn default_iterations() -> u32 {
    200_000
}
fn default_salt_bytes() -> usize {
    16
}
fn default_nonce_bytes() -> usize {
    12
}
fn default_version() -> String {
    "1.0".into()
}
fn default_scheme() -> String {
    "GlyphCrypt-AEAD".into()
}
fn default_armor() -> bool {
    true
}
fn default_suffix() -> String {
    ".gcrypt".into()
}
fn default_binary_suffix() -> String {
    ".bin".into()
}
fn default_log_level() -> String {
    "info".into()
}

#[derive(Deserialize)]
struct AuditSection {
    #[serde(default)]
    audit: Option<AuditMetadata>,
}

/// The `audit` section of the YAML file with its keys as written.
fn read_file_audit(path: &Path, required: bool) -> Result<Option<AuditMetadata>, GlyphError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(GlyphError::Config(format!(
                "failed to read {}: {e}",
                path.display()
            )))
        }
    };
    if text.trim().is_empty() {
        return Ok(None);
    }
    // A file holding only comments parses as null.
    let section: Option<AuditSection> = serde_yaml::from_str(&text)
        .map_err(|e| GlyphError::Config(format!("invalid audit section: {e}")))?;
    Ok(section.and_then(|s| s.audit))
}

/// File keys keep their spelling and value. Keys only present in the layered
/// configuration (set through the environment) are added as they arrive.
fn merge_audit(file: AuditMetadata, layered: AuditMetadata) -> AuditMetadata {
    let mut merged = layered
        .into_iter()
        .filter(|(k, _)| !file.keys().any(|f| f.to_lowercase() == *k))
        .collect::<AuditMetadata>();
    merged.extend(file);
    merged
}

fn ensure_non_empty(value: &str, name: &str) -> Result<(), GlyphError> {
    if value.trim().is_empty() {
        return Err(GlyphError::Config(format!(
            "{name} is required and must not be empty"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawConfig {
        RawConfig {
            log_level: default_log_level(),
            log_format: LogFormat::Text,
            crypto: RawCrypto::default(),
            envelope: EnvelopeSettings::default(),
            policy: RawPolicy::default(),
            io: IoSettings::default(),
            glyph_map: GlyphMap::default(),
            audit: AuditMetadata::new(),
        }
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_algorithm(), "AES-256-GCM");
        assert_eq!(default_hash(), "SHA256");
        assert_eq!(default_iterations(), 200_000);
        assert_eq!(default_salt_bytes(), 16);
        assert_eq!(default_nonce_bytes(), 12);
        assert_eq!(default_version(), "1.0");
        assert_eq!(default_scheme(), "GlyphCrypt-AEAD");
        assert!(default_armor());
        assert_eq!(default_suffix(), ".gcrypt");
        assert_eq!(default_binary_suffix(), ".bin");
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn raw_defaults_validate_to_builtin_defaults() {
        let cfg = CryptoConfig::from_raw(raw()).unwrap();
        let builtin = CryptoConfig::default();
        assert_eq!(cfg.algorithm, builtin.algorithm);
        assert_eq!(cfg.iterations, builtin.iterations);
        assert_eq!(cfg.salt_len, builtin.salt_len);
        assert_eq!(cfg.envelope, builtin.envelope);
        assert_eq!(cfg.io, builtin.io);
        assert!(!cfg.io.keep_plaintext);
    }

    #[test]
    fn unknown_algorithm_is_unsupported_not_config() {
        let mut r = raw();
        r.crypto.algorithm = "DES".into();
        assert!(matches!(
            CryptoConfig::from_raw(r),
            Err(GlyphError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn unknown_hash_is_unsupported() {
        let mut r = raw();
        r.crypto.hash = "MD5".into();
        assert!(matches!(
            CryptoConfig::from_raw(r),
            Err(GlyphError::UnsupportedHash(_))
        ));
    }

    #[test]
    fn validate_rejects_zero_iterations() {
        let mut r = raw();
        r.crypto.iterations = 0;
        assert!(matches!(CryptoConfig::from_raw(r), Err(GlyphError::Config(_))));
    }

    #[test]
    fn validate_rejects_wrong_nonce_length() {
        let mut r = raw();
        r.crypto.nonce_bytes = 16;
        assert!(matches!(CryptoConfig::from_raw(r), Err(GlyphError::Config(_))));
    }

    #[test]
    fn validate_rejects_short_salt() {
        let mut r = raw();
        r.crypto.salt_bytes = 4;
        assert!(matches!(CryptoConfig::from_raw(r), Err(GlyphError::Config(_))));
    }

    #[test]
    fn validate_rejects_empty_glyph_rule() {
        let mut r = raw();
        r.glyph_map = GlyphMap::new(vec![crate::transform::GlyphRule::new("a", "")]);
        assert!(matches!(CryptoConfig::from_raw(r), Err(GlyphError::Config(_))));
    }

    #[test]
    fn output_suffix_follows_armor() {
        let mut cfg = CryptoConfig::default();
        assert_eq!(cfg.output_suffix(), ".gcrypt");
        cfg.envelope.armor = false;
        assert_eq!(cfg.output_suffix(), ".bin");
    }

    #[test]
    fn loads_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glyphcrypt.yaml");
        std::fs::write(
            &path,
            r#"
crypto:
  algorithm: AES-256-GCM-SIV
  iterations: 1000
envelope:
  armor: false
policy:
  allowed_actors: [sp-ethos, sp-logos]
  min_level: 2
io:
  keep_plaintext: true
glyph_map:
  - { from: "z", to: "ζ" }
  - { from: "a", to: "α" }
"#,
        )
        .unwrap();

        let cfg = CryptoConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.algorithm, AeadAlgorithm::Aes256GcmSiv);
        assert_eq!(cfg.iterations.get(), 1000);
        assert!(!cfg.envelope.armor);
        assert_eq!(cfg.policy.allowed_actors, vec!["sp-ethos", "sp-logos"]);
        assert_eq!(cfg.policy.min_level, 2);
        assert!(cfg.io.keep_plaintext);
        let rules = cfg.glyph_map.rules();
        assert_eq!((rules[0].from.as_str(), rules[0].to.as_str()), ("z", "ζ"));
        assert_eq!((rules[1].from.as_str(), rules[1].to.as_str()), ("a", "α"));
    }

    #[test]
    fn audit_keys_keep_their_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glyphcrypt.yaml");
        std::fs::write(&path, "audit:\n  OwnerTeam: Ops\n  ticket: 42\n").unwrap();

        let cfg = CryptoConfig::load(Some(&path)).unwrap();
        let keys: Vec<&str> = cfg.audit.keys().map(String::as_str).collect();
        assert_eq!(keys, ["OwnerTeam", "ticket"]);
        assert_eq!(cfg.audit["OwnerTeam"], "Ops");
        assert_eq!(cfg.audit["ticket"], 42);
    }

    #[test]
    fn layered_audit_keys_are_added_not_duplicated() {
        let mut file = AuditMetadata::new();
        file.insert("OwnerTeam".into(), serde_json::json!("Ops"));
        let mut layered = AuditMetadata::new();
        layered.insert("ownerteam".into(), serde_json::json!("Ops"));
        layered.insert("region".into(), serde_json::json!("eu"));

        let merged = merge_audit(file, layered);
        let keys: Vec<&str> = merged.keys().map(String::as_str).collect();
        assert_eq!(keys, ["OwnerTeam", "region"]);
    }

    #[test]
    fn overlapping_glyph_values_are_reported() {
        let mut r = raw();
        r.glyph_map = GlyphMap::new(vec![
            crate::transform::GlyphRule::new("a", "xy"),
            crate::transform::GlyphRule::new("b", "y"),
        ]);
        let cfg = CryptoConfig::from_raw(r).unwrap();
        let warnings = cfg.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("rules 0 and 1"));
        assert!(CryptoConfig::default().warnings().is_empty());
    }

    #[test]
    fn explicit_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let res = CryptoConfig::load(Some(&dir.path().join("absent.yaml")));
        assert!(matches!(res, Err(GlyphError::Config(_))));
    }
}
