//! AEAD encryption and decryption of envelope payloads.
//!
//! Two algorithms are supported, both with a 256-bit key and a 96-bit nonce:
//!
//! - **AES-256-GCM**: the default, used by every existing envelope.
//! - **AES-256-GCM-SIV** (RFC 8452): nonce-misuse-resistant, selectable in configuration.
//!
//! **Never reuse a nonce with the same key under AES-256-GCM.** Reuse breaks both
//! confidentiality and authentication. The pipelines draw a fresh nonce and a
//! fresh salt (hence a fresh key) for every envelope.

use std::fmt;
use std::str::FromStr;

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm,
};
use aes_gcm_siv::Aes256GcmSiv;
use glyphcrypt_common::GlyphError;
use thiserror::Error;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM / AES-GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Closed set of supported AEAD algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeadAlgorithm {
    /// AES-256 in Galois/Counter Mode.
    Aes256Gcm,
    /// AES-256 in GCM-SIV mode.
    Aes256GcmSiv,
}

impl AeadAlgorithm {
    /// Canonical name written to envelope headers.
    pub fn name(self) -> &'static str {
        match self {
            AeadAlgorithm::Aes256Gcm => "AES-256-GCM",
            AeadAlgorithm::Aes256GcmSiv => "AES-256-GCM-SIV",
        }
    }

    /// Nonce length required by this algorithm.
    pub fn nonce_len(self) -> usize {
        match self {
            AeadAlgorithm::Aes256Gcm | AeadAlgorithm::Aes256GcmSiv => NONCE_LEN,
        }
    }
}

impl fmt::Display for AeadAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AeadAlgorithm {
    type Err = GlyphError;

    /// Names are matched case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AES-256-GCM" => Ok(AeadAlgorithm::Aes256Gcm),
            "AES-256-GCM-SIV" => Ok(AeadAlgorithm::Aes256GcmSiv),
            _ => Err(GlyphError::UnsupportedAlgorithm(s.to_owned())),
        }
    }
}

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid key length: expected {KEY_LEN} bytes")]
    InvalidKeyLength,

    /// The nonce is the wrong length for the algorithm.
    #[error("invalid nonce length: expected {expected} bytes, got {actual}")]
    InvalidNonceLength {
        /// Length the algorithm requires.
        expected: usize,
        /// Length that was supplied.
        actual: usize,
    },

    /// Encryption failed, or decryption failed authentication.
    #[error("aead operation failed")]
    AeadFailure,
}

impl From<CipherError> for GlyphError {
    fn from(e: CipherError) -> Self {
        match e {
            CipherError::AeadFailure => GlyphError::Authentication,
            CipherError::InvalidNonceLength { .. } => GlyphError::MalformedEnvelope(e.to_string()),
            CipherError::InvalidKeyLength => GlyphError::Internal(e.to_string()),
        }
    }
}

/// Encrypt `plaintext`, returning ciphertext with the 16-byte tag appended.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] or [`CipherError::InvalidNonceLength`]
/// for malformed inputs and [`CipherError::AeadFailure`] on an internal AEAD error.
pub fn encrypt(
    algorithm: AeadAlgorithm,
    key: &[u8],
    nonce: &[u8],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CipherError> {
    check_lengths(algorithm, key, nonce)?;
    let payload = Payload {
        msg: plaintext,
        aad,
    };
    match algorithm {
        AeadAlgorithm::Aes256Gcm => {
            let cipher =
                Aes256Gcm::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength)?;
            cipher
                .encrypt(aes_gcm::aead::Nonce::<Aes256Gcm>::from_slice(nonce), payload)
                .map_err(|_| CipherError::AeadFailure)
        }
        AeadAlgorithm::Aes256GcmSiv => {
            let cipher =
                Aes256GcmSiv::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength)?;
            cipher
                .encrypt(
                    aes_gcm_siv::aead::Nonce::<Aes256GcmSiv>::from_slice(nonce),
                    payload,
                )
                .map_err(|_| CipherError::AeadFailure)
        }
    }
}

/// Decrypt `ciphertext` (tag appended) back to plaintext bytes.
///
/// # Errors
///
/// Returns [`CipherError::AeadFailure`] if authentication fails: wrong key,
/// wrong associated data, or tampered ciphertext. The three are not distinguished.
pub fn decrypt(
    algorithm: AeadAlgorithm,
    key: &[u8],
    nonce: &[u8],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CipherError> {
    check_lengths(algorithm, key, nonce)?;
    let payload = Payload {
        msg: ciphertext,
        aad,
    };
    match algorithm {
        AeadAlgorithm::Aes256Gcm => {
            let cipher =
                Aes256Gcm::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength)?;
            cipher
                .decrypt(aes_gcm::aead::Nonce::<Aes256Gcm>::from_slice(nonce), payload)
                .map_err(|_| CipherError::AeadFailure)
        }
        AeadAlgorithm::Aes256GcmSiv => {
            let cipher =
                Aes256GcmSiv::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength)?;
            cipher
                .decrypt(
                    aes_gcm_siv::aead::Nonce::<Aes256GcmSiv>::from_slice(nonce),
                    payload,
                )
                .map_err(|_| CipherError::AeadFailure)
        }
    }
}

// `from_slice` panics on a length mismatch, so lengths are checked up front.
fn check_lengths(algorithm: AeadAlgorithm, key: &[u8], nonce: &[u8]) -> Result<(), CipherError> {
    if key.len() != KEY_LEN {
        return Err(CipherError::InvalidKeyLength);
    }
    if nonce.len() != algorithm.nonce_len() {
        return Err(CipherError::InvalidNonceLength {
            expected: algorithm.nonce_len(),
            actual: nonce.len(),
        });
    }
    Ok(())
}
