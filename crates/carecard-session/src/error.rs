/// Errors that can occur in tag sessions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] carecard_transport::TransportError),

    /// Tag file access error.
    #[error("tag file error: {0}")]
    TagFile(#[from] carecard_tagfile::TagFileError),

    /// NDEF encoding error.
    #[error("ndef error: {0}")]
    Ndef(#[from] carecard_ndef::NdefError),

    /// Every read attempt failed.
    #[error("failed to read tag after {attempts} attempts: {last_error}")]
    ReadExhausted { attempts: u32, last_error: String },
}

pub type Result<T> = std::result::Result<T, SessionError>;
