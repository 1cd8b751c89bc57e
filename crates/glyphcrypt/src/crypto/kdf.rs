//! Identity-bound key derivation.
//!
//! The key for an envelope is
//!
//! ```text
//! PBKDF2-HMAC-<hash>(passphrase "|" actor_id "|" level, salt, iterations) -> 32 bytes
//! ```
//!
//! A wrong passphrase, actor or level all produce an unrelated key, so any of
//! them surfaces later as the same authentication failure.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use glyphcrypt_common::GlyphError;
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use super::cipher::KEY_LEN;

/// Closed set of hashes usable inside the KDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// SHA-256.
    Sha256,
}

impl HashAlgorithm {
    /// Canonical name written to envelope headers.
    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "SHA256",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = GlyphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SHA256" => Ok(HashAlgorithm::Sha256),
            _ => Err(GlyphError::UnsupportedHash(s.to_owned())),
        }
    }
}

/// Closed set of key derivation functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfAlgorithm {
    /// PBKDF2 with an HMAC over the selected [`HashAlgorithm`].
    Pbkdf2Hmac,
}

impl KdfAlgorithm {
    /// Canonical name written to envelope headers.
    pub fn name(self) -> &'static str {
        match self {
            KdfAlgorithm::Pbkdf2Hmac => "PBKDF2HMAC",
        }
    }
}

impl fmt::Display for KdfAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KdfAlgorithm {
    type Err = GlyphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PBKDF2HMAC" | "PBKDF2" => Ok(KdfAlgorithm::Pbkdf2Hmac),
            _ => Err(GlyphError::UnsupportedAlgorithm(format!("kdf {s}"))),
        }
    }
}

/// Fixed-size key buffer that holds exactly [`KEY_LEN`] bytes.
///
/// Lives only for the duration of one pipeline call. The memory is zeroed on
/// drop and the bytes are never printed.
pub struct DerivedKey(Box<[u8; KEY_LEN]>);

impl DerivedKey {
    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material.
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Every input to [`derive`] other than the secret itself.
#[derive(Debug, Clone, Copy)]
pub struct KdfParams<'a> {
    /// KDF salt, stored in cleartext in the envelope header.
    pub salt: &'a [u8],
    /// Iteration count.
    pub iterations: NonZeroU32,
    /// Hash used inside the HMAC.
    pub hash: HashAlgorithm,
}

/// Derive the 256-bit envelope key for `(passphrase, actor_id, level)`.
///
/// Pure: identical inputs always produce identical bytes.
pub fn derive(passphrase: &str, actor_id: &str, level: i64, params: KdfParams<'_>) -> DerivedKey {
    let secret = Zeroizing::new(format!("{passphrase}|{actor_id}|{level}"));
    let mut key = Box::new([0u8; KEY_LEN]);
    match params.hash {
        HashAlgorithm::Sha256 => pbkdf2::pbkdf2_hmac::<Sha256>(
            secret.as_bytes(),
            params.salt,
            params.iterations.get(),
            &mut key[..],
        ),
    }
    DerivedKey(key)
}
