//! File-level encryption.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use glyphcrypt_common::GlyphError;
use tracing::{info, warn};

use super::{same_file, seal, write_atomic};
use crate::config::CryptoConfig;
use crate::envelope;
use crate::passphrase::Passphrase;
use crate::policy::{Identity, Policy};

/// Inputs for [`encrypt_file`].
#[derive(Debug)]
pub struct EncryptRequest<'a> {
    /// Plaintext file to encrypt.
    pub source: &'a Path,
    /// Envelope path; defaults to `source` + the configured suffix.
    pub output: Option<&'a Path>,
    /// Identity bound into the key.
    pub identity: &'a Identity,
    /// Passphrase bound into the key.
    pub passphrase: &'a Passphrase,
    /// Allow-list to write; defaults to the configured policy.
    pub allowed_actors: Option<Vec<String>>,
    /// Minimum level to write; defaults to the configured policy.
    pub min_level: Option<i64>,
}

/// Encrypt `req.source` into an envelope file and return its path.
///
/// The source is deleted afterwards unless `io.keep_plaintext` is set or the
/// envelope was written over the source itself. A failed deletion is logged
/// and does not fail the call.
///
/// # Errors
///
/// Returns [`GlyphError::Io`] if the source cannot be read or the envelope
/// cannot be written. No envelope file exists after a failure.
pub fn encrypt_file(cfg: &CryptoConfig, req: EncryptRequest<'_>) -> Result<PathBuf, GlyphError> {
    let plaintext = fs::read(req.source).map_err(|e| {
        GlyphError::io(format!("failed to read {}", req.source.display()), e)
    })?;
    let plaintext_len = plaintext.len();

    let filename = req
        .source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let policy = Policy {
        allowed_actors: req
            .allowed_actors
            .unwrap_or_else(|| cfg.policy.allowed_actors.clone()),
        min_level: req.min_level.unwrap_or(cfg.policy.min_level),
    };

    let envelope = seal(cfg, plaintext, req.identity, req.passphrase, policy, filename)?;
    let document = envelope::serialize(&envelope)?;

    let target = match req.output {
        Some(p) => p.to_path_buf(),
        None => with_suffix(req.source, cfg.output_suffix()),
    };
    write_atomic(&target, document.as_bytes())?;

    info!(
        source = %req.source.display(),
        target = %target.display(),
        algorithm = %envelope.header.algorithm,
        iterations = envelope.header.iterations,
        bytes = plaintext_len,
        "envelope written"
    );

    if !cfg.io.keep_plaintext {
        remove_source(req.source, &target);
    }
    Ok(target)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s: OsString = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

fn remove_source(source: &Path, target: &Path) {
    if same_file(source, target) {
        warn!(
            path = %source.display(),
            "envelope replaced the source in place; nothing to delete"
        );
        return;
    }
    match fs::remove_file(source) {
        Ok(()) => info!(path = %source.display(), "plaintext source deleted"),
        Err(e) => warn!(
            path = %source.display(),
            error = %e,
            "failed to delete plaintext source; envelope was written"
        ),
    }
}
