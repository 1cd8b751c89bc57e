//! `glyphcrypt`: policy-gated envelope encryption for files.
//!
//! A file is optionally passed through a reversible glyph substitution, then
//! sealed with an AEAD key derived from the passphrase together with the
//! caller's actor id and level. The result is a self-describing JSON envelope
//! whose header carries the access policy checked before any key derivation.

pub mod cli;
pub mod config;
pub mod crypto;
pub mod envelope;
pub mod passphrase;
pub mod pipeline;
pub mod policy;
pub mod telemetry;
pub mod transform;

pub use config::CryptoConfig;
pub use glyphcrypt_common::{DenyReason, DenyReasons, GlyphError};
pub use passphrase::Passphrase;
pub use pipeline::{check_access, decrypt_file, encrypt_file, inspect_file, DecryptRequest, EncryptRequest};
pub use policy::{Identity, Policy};
