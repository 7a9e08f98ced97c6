/// Largest NDEF message length accepted from the length field.
pub const DEFAULT_MAX_NDEF_LEN: usize = 8192;

/// Largest READ BINARY request. Common PC/SC contactless readers cap
/// responses a little above this.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 250;

/// Bytes per UPDATE BINARY command.
pub const DEFAULT_WRITE_BLOCK_SIZE: usize = 4;

/// Configuration for tag file access.
#[derive(Debug, Clone)]
pub struct TagFileConfig {
    /// Upper bound for the NDEF length field. Default: 8192.
    pub max_ndef_len: usize,
    /// Bytes requested per READ BINARY. Default: 250.
    pub read_chunk_size: usize,
    /// Bytes written per UPDATE BINARY. Default: 4.
    pub write_block_size: usize,
    /// Largest response (data + status) passed to the transport.
    pub max_response_len: usize,
}

impl Default for TagFileConfig {
    fn default() -> Self {
        Self {
            max_ndef_len: DEFAULT_MAX_NDEF_LEN,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            write_block_size: DEFAULT_WRITE_BLOCK_SIZE,
            max_response_len: 258,
        }
    }
}
