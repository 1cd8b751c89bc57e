//! Passphrase acquisition.
//!
//! Sources in priority order: an explicit value, the `GLYPHCRYPT_PASSPHRASE`
//! environment variable, then an interactive no-echo prompt. The prompt blocks
//! with no timeout; callers embedding this in a service must bound it themselves.

use std::fmt;
use std::io;

use glyphcrypt_common::GlyphError;
use zeroize::Zeroizing;

/// Environment variable consulted when no passphrase is passed explicitly.
pub const PASSPHRASE_ENV: &str = "GLYPHCRYPT_PASSPHRASE";

/// A non-empty passphrase, zeroed on drop.
pub struct Passphrase(Zeroizing<String>);

impl Passphrase {
    /// Wrap a passphrase, rejecting empty input.
    ///
    /// # Errors
    ///
    /// Returns [`GlyphError::MissingPassphrase`] if `value` is empty.
    pub fn new(value: impl Into<String>) -> Result<Self, GlyphError> {
        let value = Zeroizing::new(value.into());
        if value.is_empty() {
            return Err(GlyphError::MissingPassphrase("passphrase is empty".into()));
        }
        Ok(Self(value))
    }

    /// Borrow the passphrase text.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase([REDACTED])")
    }
}

/// Resolve a passphrase from the process environment or the terminal.
///
/// # Errors
///
/// Returns [`GlyphError::MissingPassphrase`] if the resolved value is empty or
/// the terminal prompt cannot be read.
pub fn resolve(explicit: Option<String>) -> Result<Passphrase, GlyphError> {
    resolve_with(
        explicit,
        |name| std::env::var(name).ok(),
        || rpassword::prompt_password("Passphrase: "),
    )
}

/// [`resolve`] with injectable environment lookup and prompt.
pub fn resolve_with<E, P>(explicit: Option<String>, env: E, prompt: P) -> Result<Passphrase, GlyphError>
where
    E: FnOnce(&str) -> Option<String>,
    P: FnOnce() -> io::Result<String>,
{
    if let Some(value) = explicit {
        return Passphrase::new(value);
    }
    if let Some(value) = env(PASSPHRASE_ENV).filter(|v| !v.is_empty()) {
        return Passphrase::new(value);
    }
    let entered = prompt()
        .map_err(|e| GlyphError::MissingPassphrase(format!("could not read passphrase: {e}")))?;
    Passphrase::new(entered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn explicit_value_wins() {
        let p = resolve_with(
            Some("explicit".into()),
            |_| Some("from-env".into()),
            || panic!("prompt must not run"),
        )
        .unwrap();
        assert_eq!(p.expose(), "explicit");
    }

    #[test]
    fn environment_beats_prompt() {
        let p = resolve_with(
            None,
            |name| (name == PASSPHRASE_ENV).then(|| "from-env".to_string()),
            || panic!("prompt must not run"),
        )
        .unwrap();
        assert_eq!(p.expose(), "from-env");
    }

    #[test]
    fn falls_back_to_prompt() {
        let p = resolve_with(None, no_env, || Ok("typed".into())).unwrap();
        assert_eq!(p.expose(), "typed");
    }

    #[test]
    fn empty_passphrase_rejected() {
        assert!(matches!(
            resolve_with(Some(String::new()), no_env, || Ok("x".into())),
            Err(GlyphError::MissingPassphrase(_))
        ));
        assert!(matches!(
            resolve_with(None, no_env, || Ok(String::new())),
            Err(GlyphError::MissingPassphrase(_))
        ));
    }

    #[test]
    fn prompt_failure_is_missing_passphrase() {
        let res = resolve_with(None, no_env, || {
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no tty"))
        });
        assert!(matches!(res, Err(GlyphError::MissingPassphrase(_))));
    }

    #[test]
    fn passphrase_redacted_in_debug() {
        let p = Passphrase::new("hunter2").unwrap();
        assert!(!format!("{p:?}").contains("hunter2"));
    }
}
