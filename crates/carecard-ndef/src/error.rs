/// Errors that can occur while encoding NDEF records.
///
/// Decoding never fails: truncated or unknown records are absorbed and logged.
#[derive(Debug, thiserror::Error)]
pub enum NdefError {
    /// The record type does not fit the one-byte type length field.
    #[error("record type too long ({len} bytes, max 255)")]
    TypeTooLong { len: usize },

    /// The payload does not fit the four-byte payload length field.
    #[error("record payload too large ({len} bytes, max {max})")]
    PayloadTooLarge { len: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, NdefError>;
