use std::fmt;
use std::io;

use carecard::session::{SessionError, WriteStatus};
use carecard::tagfile::TagFileError;
use carecard::transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const NO_TAG: i32 = 4;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => USAGE,
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => DATA_INVALID,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn json_error(context: &str, err: serde_json::Error) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io(source) => io_error(context, source),
        TransportError::NoTag | TransportError::TagLost => {
            CliError::new(NO_TAG, format!("{context}: {err}"))
        }
        TransportError::ReaderNotFound { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn tagfile_error(context: &str, err: TagFileError) -> CliError {
    match err {
        TagFileError::Transport(err) => transport_error(context, err),
        TagFileError::Status { .. } | TagFileError::ShortResponse { .. } => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        TagFileError::InvalidLength { .. }
        | TagFileError::MessageTooLong { .. }
        | TagFileError::MalformedTlv(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Transport(err) => transport_error(context, err),
        SessionError::TagFile(err) => tagfile_error(context, err),
        SessionError::Ndef(err) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        SessionError::ReadExhausted { .. } => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
    }
}

/// Exit code for a write that ran to completion but was not applied.
pub fn write_status_code(status: WriteStatus) -> i32 {
    match status {
        WriteStatus::Success => SUCCESS,
        WriteStatus::AccessDenied => PERMISSION_DENIED,
        WriteStatus::NoData => DATA_INVALID,
        WriteStatus::Failed => FAILURE,
    }
}
