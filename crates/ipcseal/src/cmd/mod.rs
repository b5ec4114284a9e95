use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use clap::{ArgGroup, Args, Subcommand};
use ipcseal_security::{SecurityConfig, SecurityContext};

use crate::exit::{io_error, security_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod demo;
pub mod envinfo;
pub mod keygen;
pub mod sign;
pub mod verify;
pub mod version;

/// Environment variable holding the base64 shared secret.
pub const SECRET_ENV: &str = "IPCSEAL_SECRET";

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run queue, pipe and shared-memory exchanges between threads.
    Demo(DemoArgs),
    /// Print a random base64 shared secret.
    Keygen(KeygenArgs),
    /// Seal a message into a signed envelope.
    Sign(SignArgs),
    /// Verify an envelope and print its contents.
    Verify(VerifyArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Print build and environment diagnostics.
    Envinfo(EnvinfoArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Demo(args) => demo::run(args, format),
        Command::Keygen(args) => keygen::run(args, format),
        Command::Sign(args) => sign::run(args, format),
        Command::Verify(args) => verify::run(args, format),
        Command::Version(args) => version::run(args),
        Command::Envinfo(args) => envinfo::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct SecretArgs {
    /// Shared secret, base64-encoded.
    #[arg(long, env = SECRET_ENV, hide_env_values = true)]
    pub secret: Option<String>,
    /// Encrypt payloads with a key derived from the secret.
    #[arg(long)]
    pub encrypt: bool,
}

impl SecretArgs {
    /// Decoded secret, if one was supplied.
    pub fn secret_bytes(&self) -> CliResult<Option<Vec<u8>>> {
        let Some(encoded) = &self.secret else {
            return Ok(None);
        };
        let secret = STANDARD
            .decode(encoded.trim())
            .map_err(|err| CliError::new(USAGE, format!("--secret is not valid base64: {err}")))?;
        Ok(Some(secret))
    }

    pub fn context_from(&self, secret: Vec<u8>) -> CliResult<SecurityContext> {
        SecurityContext::with_config(
            secret,
            SecurityConfig {
                enable_encryption: self.encrypt,
            },
        )
        .map_err(|err| security_error("invalid secret", err))
    }

    /// Context for commands that must share a secret with a peer.
    pub fn required_context(&self) -> CliResult<SecurityContext> {
        let secret = self.secret_bytes()?.ok_or_else(|| {
            CliError::new(
                USAGE,
                format!("a shared secret is required (--secret or {SECRET_ENV})"),
            )
        })?;
        self.context_from(secret)
    }
}

#[derive(Args, Debug)]
pub struct DemoArgs {
    #[command(flatten)]
    pub secret: SecretArgs,
    /// Shared memory block size in bytes.
    #[arg(long, default_value_t = 4096)]
    pub shm_size: usize,
    /// Maximum wait for each worker receive (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Secret length in bytes before encoding.
    #[arg(long, default_value_t = 32, value_parser = clap::value_parser!(u16).range(1..=4096))]
    pub bytes: u16,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("payload").required(true).args(["data", "file"])))]
pub struct SignArgs {
    #[command(flatten)]
    pub secret: SecretArgs,
    /// Sender id recorded in the envelope.
    #[arg(long)]
    pub client_id: String,
    /// Raw string payload.
    #[arg(long)]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub secret: SecretArgs,
    /// Read the envelope from a file instead of stdin.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct EnvinfoArgs {}

pub fn read_file(path: &Path) -> CliResult<Vec<u8>> {
    fs::read(path).map_err(|err| io_error(&format!("failed reading {}", path.display()), err))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(match unit {
        "ms" => Duration::from_millis(value),
        _ => Duration::from_secs(value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret_args(secret: Option<&str>) -> SecretArgs {
        SecretArgs {
            secret: secret.map(str::to_string),
            encrypt: false,
        }
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn secret_is_base64() {
        let args = secret_args(Some("c2VjcmV0"));
        assert_eq!(args.secret_bytes().unwrap().unwrap(), b"secret");

        let err = secret_args(Some("***")).secret_bytes().unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn required_context_demands_secret() {
        let err = secret_args(None).required_context().unwrap_err();
        assert_eq!(err.code, USAGE);
        assert!(err.message.contains(SECRET_ENV));
    }

    #[test]
    fn empty_secret_is_usage_error() {
        let err = secret_args(Some("")).required_context().unwrap_err();
        assert_eq!(err.code, USAGE);
    }
}
