//! Cryptographic primitives: identity-bound key derivation and AEAD.
//!
//! This module is free of file I/O and configuration loading. It provides the
//! low-level operations the pipelines compose.

pub mod cipher;
pub mod kdf;

pub use cipher::{AeadAlgorithm, CipherError, KEY_LEN, NONCE_LEN};
pub use kdf::{derive, DerivedKey, HashAlgorithm, KdfAlgorithm, KdfParams};

use aes_gcm::aead::{rand_core::RngCore, OsRng};

/// Fill a fresh buffer of `len` bytes from the OS CSPRNG.
///
/// Used for per-envelope salts and nonces.
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    OsRng.fill_bytes(&mut buf);
    buf
}
