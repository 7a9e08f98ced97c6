use carecard_transport::TransportError;

use crate::apdu::StatusWord;

/// Errors that can occur while reading or writing the NDEF file.
#[derive(Debug, thiserror::Error)]
pub enum TagFileError {
    /// The command exchange itself failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The tag answered with a failing status word.
    #[error("{command} failed with status {status}")]
    Status {
        command: &'static str,
        status: StatusWord,
    },

    /// The response was too short to carry a status trailer.
    #[error("{command} returned {len}-byte response (no status trailer)")]
    ShortResponse { command: &'static str, len: usize },

    /// The NDEF file length is zero or larger than the tag can hold.
    #[error("invalid NDEF length {len} (must be 1..={max})")]
    InvalidLength { len: usize, max: usize },

    /// The message does not fit a one-byte TLV length.
    #[error(
        "NDEF message too long for TLV frame ({len} bytes, max {max}; a 0xFF length marks the unsupported long form)"
    )]
    MessageTooLong { len: usize, max: usize },

    /// A stored TLV frame could not be parsed.
    #[error("malformed TLV frame: {0}")]
    MalformedTlv(&'static str),
}

pub type Result<T> = std::result::Result<T, TagFileError>;
