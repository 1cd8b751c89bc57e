//! End-to-end operations: encrypt, decrypt and inspect.
//!
//! [`seal`] and [`open`] are the in-memory cores; the `*_file` functions wrap
//! them with file I/O. Every call takes the configuration explicitly.
//!
//! # Ordering invariants
//!
//! - Decryption evaluates the policy gate before any algorithm lookup, key
//!   derivation or AEAD work.
//! - Unsupported algorithm, KDF or hash names fail before key derivation.
//! - Outputs are written to a temporary sibling and renamed into place, so a
//!   failed call never leaves a partial envelope or partial plaintext.

pub mod decrypt;
pub mod encrypt;
pub mod inspect;

pub use decrypt::{check_access, decrypt_file, DecryptRequest};
pub use encrypt::{encrypt_file, EncryptRequest};
pub use inspect::inspect_file;

use std::fs;
use std::io::Write;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use glyphcrypt_common::GlyphError;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::config::CryptoConfig;
use crate::crypto::{self, cipher, AeadAlgorithm, HashAlgorithm, KdfAlgorithm, KdfParams};
use crate::envelope::{Envelope, Header};
use crate::passphrase::Passphrase;
use crate::policy::{self, Decision, Identity, Policy};
use crate::transform::Content;

/// Encrypt `plaintext` into a new envelope.
///
/// Text content is glyph-transformed first. A fresh salt and nonce are drawn
/// for every call.
///
/// # Errors
///
/// Returns [`GlyphError::Internal`] if the AEAD layer rejects its inputs,
/// which a validated configuration rules out.
pub fn seal(
    cfg: &CryptoConfig,
    plaintext: Vec<u8>,
    identity: &Identity,
    passphrase: &Passphrase,
    policy: Policy,
    filename: String,
) -> Result<Envelope, GlyphError> {
    let content = Content::classify(plaintext);
    debug!(text = content.is_text(), "classified plaintext");
    let prepared = Zeroizing::new(content.forward(&cfg.glyph_map).into_bytes());

    let salt = crypto::random_bytes(cfg.salt_len);
    let nonce = crypto::random_bytes(cfg.nonce_len);

    let key = match cfg.kdf {
        KdfAlgorithm::Pbkdf2Hmac => crypto::derive(
            passphrase.expose(),
            &identity.actor_id,
            identity.level,
            KdfParams {
                salt: &salt,
                iterations: cfg.iterations,
                hash: cfg.hash,
            },
        ),
    };
    let payload = cipher::encrypt(cfg.algorithm, key.as_bytes(), &nonce, &prepared, &[])
        .map_err(|e| GlyphError::Internal(format!("encryption failed: {e}")))?;
    drop(key);

    Ok(Envelope {
        header: Header {
            version: cfg.envelope.version.clone(),
            scheme: cfg.envelope.scheme.clone(),
            algorithm: cfg.algorithm.name().into(),
            kdf: cfg.kdf.name().into(),
            hash: cfg.hash.name().into(),
            iterations: cfg.iterations.get(),
            salt,
            nonce,
            policy,
            audit: cfg.audit.clone(),
        },
        payload,
        filename,
    })
}

/// Decrypt an envelope for `identity`.
///
/// The glyph transform is undone when the decrypted bytes are valid UTF-8.
/// Binary payloads that happen to be valid UTF-8 are transformed too; the
/// envelope does not record the original content type.
///
/// # Errors
///
/// - [`GlyphError::PermissionDenied`] if the policy gate refuses `identity`.
/// - [`GlyphError::UnsupportedAlgorithm`] / [`GlyphError::UnsupportedHash`]
///   for header names outside the supported set.
/// - [`GlyphError::MalformedEnvelope`] for a zero iteration count or a nonce
///   of the wrong length.
/// - [`GlyphError::Authentication`] for a wrong passphrase, actor or level,
///   or tampered ciphertext.
pub fn open(
    cfg: &CryptoConfig,
    envelope: &Envelope,
    identity: &Identity,
    passphrase: &Passphrase,
) -> Result<Vec<u8>, GlyphError> {
    let header = &envelope.header;

    authorize(&header.policy, identity)?;

    let algorithm: AeadAlgorithm = header.algorithm.parse()?;
    let kdf: KdfAlgorithm = header.kdf.parse()?;
    let hash: HashAlgorithm = header.hash.parse()?;
    let iterations = NonZeroU32::new(header.iterations)
        .ok_or_else(|| GlyphError::MalformedEnvelope("iterations must be > 0".into()))?;
    if header.nonce.len() != algorithm.nonce_len() {
        return Err(GlyphError::MalformedEnvelope(format!(
            "nonce must be {} bytes for {algorithm}, got {}",
            algorithm.nonce_len(),
            header.nonce.len()
        )));
    }

    let key = match kdf {
        KdfAlgorithm::Pbkdf2Hmac => crypto::derive(
            passphrase.expose(),
            &identity.actor_id,
            identity.level,
            KdfParams {
                salt: &header.salt,
                iterations,
                hash,
            },
        ),
    };
    let plaintext = cipher::decrypt(algorithm, key.as_bytes(), &header.nonce, &envelope.payload, &[])?;
    drop(key);

    let content = Content::classify(plaintext);
    debug!(text = content.is_text(), "classified decrypted payload");
    Ok(content.inverse(&cfg.glyph_map).into_bytes())
}

/// Apply the policy gate, logging a refusal.
fn authorize(policy: &Policy, identity: &Identity) -> Result<(), GlyphError> {
    match policy::evaluate(policy, identity) {
        Decision::Allow => Ok(()),
        Decision::Deny(reasons) => {
            warn!(
                actor = %identity.actor_id,
                level = identity.level,
                min_level = policy.min_level,
                %reasons,
                "policy gate denied decryption"
            );
            Err(GlyphError::PermissionDenied(reasons))
        }
    }
}

/// Whether two paths name the same file.
pub(crate) fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        // A path that does not exist cannot be resolved; compare lexically.
        _ => a == b,
    }
}

/// Write `bytes` to `target` through a temporary file in the same directory.
///
/// Missing parent directories are created. Readers never observe a partially
/// written file; concurrent writers to the same target race and the last
/// rename wins.
pub(crate) fn write_atomic(target: &Path, bytes: &[u8]) -> Result<(), GlyphError> {
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)
        .map_err(|e| GlyphError::io(format!("failed to create {}", dir.display()), e))?;

    let write_err =
        |e: std::io::Error| GlyphError::io(format!("failed to write {}", target.display()), e);
    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(target).map_err(|e| write_err(e.error))?;
    Ok(())
}
