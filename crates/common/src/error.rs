//! Common error types shared across crates.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

/// A reason the policy gate refused a decryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DenyReason {
    /// The envelope names a non-empty allow-list that does not contain the actor.
    ActorNotPermitted,
    /// The caller's level is below the envelope's minimum level.
    InsufficientLevel,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::ActorNotPermitted => f.write_str("actor not permitted"),
            DenyReason::InsufficientLevel => f.write_str("insufficient level"),
        }
    }
}

/// Every reason that applied to a single denial, in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DenyReasons(pub BTreeSet<DenyReason>);

impl DenyReasons {
    /// Returns `true` if `reason` is part of this denial.
    pub fn contains(&self, reason: DenyReason) -> bool {
        self.0.contains(&reason)
    }

    /// Number of distinct reasons.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no reason was recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DenyReasons {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for reason in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{reason}")?;
            first = false;
        }
        Ok(())
    }
}

/// Top-level error type for every glyphcrypt operation.
///
/// Variants map to process exit codes so scripts can branch on the outcome:
/// - [`GlyphError::Internal`] → 1
/// - [`GlyphError::Config`], [`GlyphError::MissingPassphrase`] → 2
/// - [`GlyphError::PermissionDenied`] → 3
/// - [`GlyphError::Io`] → 4
/// - [`GlyphError::Authentication`] → 5
/// - [`GlyphError::MalformedEnvelope`] → 6
/// - [`GlyphError::UnsupportedAlgorithm`], [`GlyphError::UnsupportedHash`] → 7
#[derive(Debug, Error)]
pub enum GlyphError {
    /// Configuration defaults are missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// No passphrase was supplied, or the supplied one was empty.
    #[error("missing passphrase: {0}")]
    MissingPassphrase(String),

    /// The requested AEAD algorithm or KDF is not part of the supported set.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The requested KDF hash is not part of the supported set.
    #[error("unsupported hash: {0}")]
    UnsupportedHash(String),

    /// The input could not be parsed as an envelope.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The envelope policy refused the caller's identity.
    #[error("permission denied: {0}")]
    PermissionDenied(DenyReasons),

    /// Wrong passphrase, actor or level, or tampered ciphertext.
    ///
    /// The cause is intentionally not distinguished.
    #[error("authentication failed: wrong key material or tampered envelope")]
    Authentication,

    /// Reading or writing a file failed.
    #[error("{context}: {source}")]
    Io {
        /// What the pipeline was doing, including the path involved.
        context: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GlyphError {
    /// Wrap an I/O error with a description of the failed step.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        GlyphError::Io {
            context: context.into(),
            source,
        }
    }

    /// Returns the process exit code that should be used for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            GlyphError::Internal(_) => 1,
            GlyphError::Config(_) | GlyphError::MissingPassphrase(_) => 2,
            GlyphError::PermissionDenied(_) => 3,
            GlyphError::Io { .. } => 4,
            GlyphError::Authentication => 5,
            GlyphError::MalformedEnvelope(_) => 6,
            GlyphError::UnsupportedAlgorithm(_) | GlyphError::UnsupportedHash(_) => 7,
        }
    }

    /// Short machine-readable category, used as a structured log field.
    pub fn category(&self) -> &'static str {
        match self {
            GlyphError::Config(_) => "config",
            GlyphError::MissingPassphrase(_) => "missing_passphrase",
            GlyphError::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            GlyphError::UnsupportedHash(_) => "unsupported_hash",
            GlyphError::MalformedEnvelope(_) => "malformed_envelope",
            GlyphError::PermissionDenied(_) => "permission_denied",
            GlyphError::Authentication => "authentication",
            GlyphError::Io { .. } => "io",
            GlyphError::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn denied(reasons: &[DenyReason]) -> GlyphError {
        GlyphError::PermissionDenied(DenyReasons(reasons.iter().copied().collect()))
    }

    #[test]
    fn exit_codes_are_distinct_per_category() {
        assert_eq!(GlyphError::Internal("x".into()).exit_code(), 1);
        assert_eq!(GlyphError::Config("x".into()).exit_code(), 2);
        assert_eq!(GlyphError::MissingPassphrase("x".into()).exit_code(), 2);
        assert_eq!(denied(&[DenyReason::ActorNotPermitted]).exit_code(), 3);
        let io = GlyphError::io("read", std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(io.exit_code(), 4);
        assert_eq!(GlyphError::Authentication.exit_code(), 5);
        assert_eq!(GlyphError::MalformedEnvelope("x".into()).exit_code(), 6);
        assert_eq!(GlyphError::UnsupportedAlgorithm("x".into()).exit_code(), 7);
        assert_eq!(GlyphError::UnsupportedHash("x".into()).exit_code(), 7);
    }

    #[test]
    fn permission_denied_lists_every_reason() {
        let e = denied(&[DenyReason::InsufficientLevel, DenyReason::ActorNotPermitted]);
        assert_eq!(
            e.to_string(),
            "permission denied: actor not permitted, insufficient level"
        );
    }

    #[test]
    fn io_display_includes_context() {
        let e = GlyphError::io(
            "failed to read notes.txt",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(e.to_string().starts_with("failed to read notes.txt"));
        assert_eq!(e.category(), "io");
    }

    #[test]
    fn authentication_message_does_not_name_the_cause() {
        let msg = GlyphError::Authentication.to_string();
        assert!(!msg.contains("passphrase"));
    }
}
