//! Command-line surface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Policy-gated envelope encryption for files.
#[derive(Debug, Parser)]
#[command(name = "glyphcrypt", version, about)]
pub struct Cli {
    /// Configuration file. Defaults to `glyphcrypt.yaml` when present.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Encrypt a file into an envelope
    Encrypt {
        /// Plaintext file
        path: PathBuf,
        #[command(flatten)]
        identity: IdentityArgs,
        /// Envelope path (default: <path> + configured suffix)
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
        /// Actor permitted to decrypt; repeatable. Overrides the configured list
        #[arg(long = "allow", value_name = "ID")]
        allow: Vec<String>,
        /// Minimum level required to decrypt. Overrides the configured value
        #[arg(long, value_name = "N", allow_hyphen_values = true)]
        min_level: Option<i64>,
    },
    /// Decrypt an envelope back into a file
    Decrypt {
        /// Envelope file
        path: PathBuf,
        #[command(flatten)]
        identity: IdentityArgs,
        /// Plaintext path (default: the recorded file name next to the envelope)
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
    /// Print an envelope header without decrypting
    Inspect {
        /// Envelope file
        path: PathBuf,
    },
}

/// Who is asking, and with what secret.
#[derive(Debug, Args)]
pub struct IdentityArgs {
    /// Actor identifier
    #[arg(long, value_name = "ID")]
    pub actor: String,
    /// Clearance level
    #[arg(long, value_name = "N", allow_hyphen_values = true)]
    pub level: i64,
    /// Passphrase (default: $GLYPHCRYPT_PASSPHRASE, then a prompt)
    #[arg(long)]
    pub passphrase: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_encrypt_with_overrides() {
        let cli = Cli::try_parse_from([
            "glyphcrypt", "encrypt", "notes.txt", "--actor", "sp-ethos", "--level", "3",
            "--allow", "sp-ethos", "--allow", "sp-kai", "--min-level", "2",
        ])
        .unwrap();
        assert!(cli.config.is_none());
        match cli.command {
            Command::Encrypt { path, identity, out, allow, min_level } => {
                assert_eq!(path, PathBuf::from("notes.txt"));
                assert_eq!(identity.actor, "sp-ethos");
                assert_eq!(identity.level, 3);
                assert!(identity.passphrase.is_none());
                assert!(out.is_none());
                assert_eq!(allow, ["sp-ethos", "sp-kai"]);
                assert_eq!(min_level, Some(2));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_config_after_subcommand() {
        let cli = Cli::try_parse_from([
            "glyphcrypt", "decrypt", "a.gcrypt", "--actor", "x", "--level", "-1",
            "--config", "alt.yaml", "--out", "a.txt",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("alt.yaml")));
        match cli.command {
            Command::Decrypt { identity, out, .. } => {
                assert_eq!(identity.level, -1);
                assert_eq!(out, Some(PathBuf::from("a.txt")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn decrypt_requires_identity() {
        assert!(Cli::try_parse_from(["glyphcrypt", "decrypt", "a.gcrypt", "--level", "1"]).is_err());
        assert!(Cli::try_parse_from(["glyphcrypt", "decrypt", "a.gcrypt", "--actor", "x"]).is_err());
    }

    #[test]
    fn inspect_takes_only_a_path() {
        let cli = Cli::try_parse_from(["glyphcrypt", "inspect", "a.gcrypt"]).unwrap();
        assert!(matches!(cli.command, Command::Inspect { .. }));
        assert!(Cli::try_parse_from(["glyphcrypt", "inspect", "a.gcrypt", "--actor", "x"]).is_err());
    }
}
