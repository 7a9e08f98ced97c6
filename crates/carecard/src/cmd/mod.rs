use std::path::{Path, PathBuf};
use std::time::Duration;

use carecard::session::{RetryPolicy, SessionConfig, WriteConfig};
use clap::{Args, Subcommand};
use serde::de::DeserializeOwned;

use crate::device::DeviceArgs;
use crate::exit::{io_error, json_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod diff;
pub mod encode;
pub mod read;
pub mod readers;
pub mod sync;
pub mod version;
pub mod watch;
pub mod write;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read and decode the tag.
    Read(ReadArgs),
    /// Write a payload through the ownership check.
    Write(WriteArgs),
    /// Add remote-only policies to the tag.
    Sync(SyncArgs),
    /// Handle taps on a PC/SC reader until interrupted.
    Watch(WatchArgs),
    /// Decode an NDEF message, TLV frame or tag image offline.
    Decode(DecodeArgs),
    /// Encode a payload and print the NDEF message and TLV frame.
    Encode(EncodeArgs),
    /// Compare tag policies against remote policies.
    Diff(DiffArgs),
    /// List PC/SC readers.
    Readers,
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Read(args) => read::run(args, format),
        Command::Write(args) => write::run(args, format),
        Command::Sync(args) => sync::run(args, format),
        Command::Watch(args) => watch::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Diff(args) => diff::run(args, format),
        Command::Readers => readers::run(format),
        Command::Version(args) => version::run(args),
    }
}

/// Retry and write knobs shared by every command that touches a tag.
#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    /// Read attempts before giving up.
    #[arg(
        long,
        env = "CARECARD_ATTEMPTS",
        default_value_t = 3,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub attempts: u32,
    /// Wait before every read attempt, in milliseconds.
    #[arg(long, value_name = "MS", env = "CARECARD_SETTLE_MS", default_value_t = 1000)]
    pub settle_ms: u64,
    /// Extra wait after a failed attempt, in milliseconds.
    #[arg(long, value_name = "MS", env = "CARECARD_BACKOFF_MS", default_value_t = 500)]
    pub backoff_ms: u64,
    /// Wait before the ownership pre-read, in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 500)]
    pub pre_read_ms: u64,
    /// Base URL for derived vCard links.
    #[arg(
        long,
        value_name = "URL",
        env = "CARECARD_VCARD_BASE_URL",
        default_value = carecard::session::config::DEFAULT_VCARD_BASE_URL
    )]
    pub vcard_base_url: String,
}

impl PipelineArgs {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            retry: RetryPolicy::new(self.attempts)
                .with_settle_delay(Duration::from_millis(self.settle_ms))
                .with_backoff(Duration::from_millis(self.backoff_ms)),
            write: WriteConfig {
                vcard_base_url: self.vcard_base_url.clone(),
                pre_read_delay: Duration::from_millis(self.pre_read_ms),
                ..WriteConfig::default()
            },
            ..SessionConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    /// JSON payload file (`-` for stdin).
    pub payload: PathBuf,
    #[command(flatten)]
    pub device: DeviceArgs,
    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// JSON array of remote policies (`-` for stdin).
    pub remote: PathBuf,
    #[command(flatten)]
    pub device: DeviceArgs,
    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Queue this payload and start in write mode.
    #[arg(long, value_name = "FILE")]
    pub write: Option<PathBuf>,
    /// Exit after N taps.
    #[arg(long)]
    pub count: Option<usize>,
    /// How long each poll for a reader change may block (e.g. 500ms, 1s).
    #[arg(long, default_value = "500ms")]
    pub poll: String,
    /// Wait before reading a tapped tag (e.g. 300ms).
    #[arg(long, default_value = "300ms")]
    pub read_delay: String,
    #[command(flatten)]
    pub device: DeviceArgs,
    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Layout {
    /// Guess from the first bytes.
    #[default]
    Auto,
    /// A bare NDEF message.
    Message,
    /// An NDEF TLV frame.
    Tlv,
    /// NDEF file contents: 2-byte length, then the message.
    File,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Binary or hex file (`-` for stdin).
    pub input: PathBuf,
    #[arg(long, value_enum, default_value_t = Layout::Auto)]
    pub layout: Layout,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// JSON payload file (`-` for stdin).
    pub payload: PathBuf,
    /// Media type of the vCard record.
    #[arg(long, default_value = carecard::ndef::vcard::VCARD_MIME_TYPE)]
    pub vcard_mime_type: String,
}

#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Tag data as JSON (as printed by `read --format json`).
    pub tag: PathBuf,
    /// JSON array of remote policies.
    pub remote: PathBuf,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show target and compiled features.
    #[arg(long)]
    pub extended: bool,
}

/// Read a file, or stdin for `-`.
pub fn read_input(path: &Path) -> CliResult<Vec<u8>> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::Read::read_to_end(&mut std::io::stdin(), &mut buf)
            .map_err(|err| io_error("failed reading stdin", err))?;
        return Ok(buf);
    }
    std::fs::read(path).map_err(|err| io_error(&format!("failed reading {}", path.display()), err))
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let raw = read_input(path)?;
    serde_json::from_slice(&raw)
        .map_err(|err| json_error(&format!("{} is not a valid payload", path.display()), err))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
