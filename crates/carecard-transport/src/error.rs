/// Errors that can occur while exchanging frames with a tag.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No tag is present in the reader field.
    #[error("no tag present")]
    NoTag,

    /// The tag left the field (or stopped answering) mid-exchange.
    #[error("tag lost during exchange")]
    TagLost,

    /// The requested reader does not exist.
    #[error("reader not found: {name}")]
    ReaderNotFound { name: String },

    /// The reader driver reported an error.
    #[error("reader error: {0}")]
    Reader(String),

    /// The response did not fit the buffer the caller allowed for it.
    #[error("response too long ({len} bytes, max {max})")]
    ResponseTooLong { len: usize, max: usize },

    /// An I/O error occurred on the reader connection.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
