//! File-level decryption.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use glyphcrypt_common::GlyphError;
use tracing::info;
use zeroize::Zeroizing;

use super::{authorize, open, same_file, write_atomic};
use crate::config::CryptoConfig;
use crate::envelope;
use crate::passphrase::Passphrase;
use crate::policy::Identity;

/// Inputs for [`decrypt_file`].
#[derive(Debug)]
pub struct DecryptRequest<'a> {
    /// Envelope file to decrypt.
    pub source: &'a Path,
    /// Plaintext path; defaults to the envelope's recorded file name, placed
    /// next to the envelope.
    pub output: Option<&'a Path>,
    /// Identity checked against the policy and bound into the key.
    pub identity: &'a Identity,
    /// Passphrase bound into the key.
    pub passphrase: &'a Passphrase,
}

/// Decrypt an envelope file and return the path the plaintext was written to.
///
/// # Errors
///
/// Returns [`GlyphError::Io`] for read/write failures and every error
/// [`open`](super::open) can produce. No plaintext file exists after a failure.
pub fn decrypt_file(cfg: &CryptoConfig, req: DecryptRequest<'_>) -> Result<PathBuf, GlyphError> {
    let document = fs::read(req.source).map_err(|e| {
        GlyphError::io(format!("failed to read {}", req.source.display()), e)
    })?;
    let envelope = envelope::deserialize(&document)?;

    let plaintext = Zeroizing::new(open(cfg, &envelope, req.identity, req.passphrase)?);

    let target = match req.output {
        Some(p) => p.to_path_buf(),
        None => default_plaintext_path(req.source, &envelope.filename, cfg),
    };
    write_atomic(&target, &plaintext)?;

    info!(
        source = %req.source.display(),
        target = %target.display(),
        actor = %req.identity.actor_id,
        bytes = plaintext.len(),
        "envelope decrypted"
    );
    Ok(target)
}

/// Read an envelope and apply its policy gate to `identity` without any key
/// material, so a refused caller is never asked for a passphrase.
///
/// [`decrypt_file`] applies the same gate again.
///
/// # Errors
///
/// Returns [`GlyphError::PermissionDenied`] when the gate refuses, and the
/// read and parse errors of [`decrypt_file`].
pub fn check_access(source: &Path, identity: &Identity) -> Result<(), GlyphError> {
    let document = fs::read(source)
        .map_err(|e| GlyphError::io(format!("failed to read {}", source.display()), e))?;
    let envelope = envelope::deserialize(&document)?;
    authorize(&envelope.header.policy, identity)
}

/// Where to put the plaintext when the caller gave no path.
///
/// Only the final component of the recorded file name is used, so a crafted
/// name such as `../../x` still lands next to the envelope. Without a usable
/// recorded name, or when that name is the envelope itself (encrypted in
/// place), the envelope's own name is used with a configured suffix stripped,
/// or with `.decrypted` appended when no suffix matches.
fn default_plaintext_path(envelope_path: &Path, recorded: &str, cfg: &CryptoConfig) -> PathBuf {
    let dir = envelope_path.parent().unwrap_or_else(|| Path::new(""));
    if let Some(name) = Path::new(recorded).file_name() {
        let candidate = dir.join(name);
        if !same_file(&candidate, envelope_path) {
            return candidate;
        }
    }

    let own = envelope_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = [cfg.io.suffix.as_str(), cfg.io.binary_suffix.as_str()]
        .into_iter()
        .find_map(|suffix| own.strip_suffix(suffix).filter(|s| !s.is_empty()));
    let name: OsString = match stem {
        Some(s) => s.into(),
        None => format!("{own}.decrypted").into(),
    };
    dir.join(name)
}
