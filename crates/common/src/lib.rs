//! Common types, envelope wire definitions, and errors shared across `glyphcrypt` crates.

pub mod error;
pub mod protocol;

pub use error::{DenyReason, DenyReasons, GlyphError};
