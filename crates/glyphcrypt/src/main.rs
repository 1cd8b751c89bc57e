//! `glyphcrypt` binary entry point.
//!
//! Sequence:
//! 1. Parse the command line.
//! 2. Load and validate [`CryptoConfig`] (skipped by `inspect`).
//! 3. Initialise tracing.
//! 4. Resolve the passphrase (`decrypt` checks the envelope's policy first).
//! 5. Run the pipeline and print the result to stdout.
//!
//! Failures exit with the code of their [`GlyphError`] category.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};

use glyphcrypt::cli::{Cli, Command, IdentityArgs};
use glyphcrypt::config::LogFormat;
use glyphcrypt::{
    check_access, decrypt_file, encrypt_file, inspect_file, passphrase, telemetry, CryptoConfig,
    DecryptRequest, EncryptRequest, GlyphError, Identity,
};

fn main() -> ExitCode {
    // -----------------------------------------------------------------------
    // 1. Command line
    // -----------------------------------------------------------------------
    let cli = Cli::parse();

    if let Command::Inspect { path } = &cli.command {
        init_tracing("warn", LogFormat::Text);
        return finish(inspect(path));
    }

    // -----------------------------------------------------------------------
    // 2. Configuration
    // -----------------------------------------------------------------------
    let cfg = match CryptoConfig::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            // Tracing is not yet up; write to stderr directly.
            eprintln!("ERROR: configuration invalid: {e}");
            return ExitCode::from(e.exit_code());
        }
    };

    // -----------------------------------------------------------------------
    // 3. Tracing
    // -----------------------------------------------------------------------
    init_tracing(&cfg.log_level, cfg.log_format);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        algorithm = %cfg.algorithm,
        iterations = cfg.iterations.get(),
        "glyphcrypt starting"
    );
    for message in cfg.warnings() {
        warn!("{message}");
    }

    // -----------------------------------------------------------------------
    // 4-5. Passphrase and pipeline
    // -----------------------------------------------------------------------
    finish(run(&cfg, cli.command))
}

fn run(cfg: &CryptoConfig, command: Command) -> Result<(), GlyphError> {
    match command {
        Command::Encrypt { path, identity, out, allow, min_level } => {
            let (who, passphrase) = resolve_identity(identity)?;
            let written = encrypt_file(
                cfg,
                EncryptRequest {
                    source: &path,
                    output: out.as_deref(),
                    identity: &who,
                    passphrase: &passphrase,
                    allowed_actors: (!allow.is_empty()).then_some(allow),
                    min_level,
                },
            )?;
            println!("{}", written.display());
        }
        Command::Decrypt { path, identity, out } => {
            check_access(&path, &Identity::new(identity.actor.clone(), identity.level))?;
            let (who, passphrase) = resolve_identity(identity)?;
            let written = decrypt_file(
                cfg,
                DecryptRequest {
                    source: &path,
                    output: out.as_deref(),
                    identity: &who,
                    passphrase: &passphrase,
                },
            )?;
            println!("{}", written.display());
        }
        Command::Inspect { path } => inspect(&path)?,
    }
    Ok(())
}

fn inspect(path: &std::path::Path) -> Result<(), GlyphError> {
    let header = inspect_file(path)?;
    let pretty = serde_json::to_string_pretty(&header)
        .map_err(|e| GlyphError::Internal(format!("header serialization failed: {e}")))?;
    println!("{pretty}");
    Ok(())
}

fn resolve_identity(args: IdentityArgs) -> Result<(Identity, passphrase::Passphrase), GlyphError> {
    let passphrase = passphrase::resolve(args.passphrase)?;
    Ok((Identity::new(args.actor, args.level), passphrase))
}

fn init_tracing(log_level: &str, format: LogFormat) {
    if let Err(e) = telemetry::init(log_level, format) {
        eprintln!("WARN: {e:#}");
    }
}

fn finish(result: Result<(), GlyphError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(category = e.category(), error = %e, "command failed");
            eprintln!("ERROR: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
