use carecard_transport::TagTransport;
use tracing::{debug, info};

use crate::apdu::{self, transceive, NDEF_FILE_ID};
use crate::config::TagFileConfig;
use crate::error::Result;
use crate::tlv;

/// What a write put on the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    /// Bytes written, TLV framing and padding included.
    pub bytes_written: usize,
    /// UPDATE BINARY commands issued.
    pub blocks: usize,
}

/// Writes NDEF messages to a Type 4 tag.
pub struct TagFileWriter<T> {
    inner: T,
    config: TagFileConfig,
}

impl<T: TagTransport> TagFileWriter<T> {
    /// Create a writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, TagFileConfig::default())
    }

    /// Create a writer with explicit configuration.
    pub fn with_config(inner: T, config: TagFileConfig) -> Self {
        Self { inner, config }
    }

    /// Select the NDEF file and write `message` as a padded TLV frame from
    /// offset 0, one block per command.
    ///
    /// The frame is built before any command is sent, so an oversized
    /// message leaves the tag untouched.
    pub fn write_ndef(&mut self, message: &[u8]) -> Result<WriteSummary> {
        let frame = tlv::wrap(message)?;

        self.exchange("select application", &apdu::select_application())?;
        self.exchange("select ndef file", &apdu::select_file(NDEF_FILE_ID))?;

        let block_size = self.config.write_block_size.clamp(1, u8::MAX as usize);
        let mut blocks = 0usize;
        for (index, block) in frame.chunks(block_size).enumerate() {
            let offset = index * block_size;
            self.exchange("update binary", &apdu::update_binary(offset as u16, block))?;
            blocks += 1;
        }
        debug!(blocks, block_size, "ndef blocks written");

        let summary = WriteSummary {
            bytes_written: frame.len(),
            blocks,
        };
        info!(
            message_len = message.len(),
            bytes_written = summary.bytes_written,
            reader = self.inner.name(),
            "ndef message written"
        );
        Ok(summary)
    }

    fn exchange(&mut self, name: &'static str, command: &[u8]) -> Result<()> {
        transceive(&mut self.inner, name, command, self.config.max_response_len)?;
        Ok(())
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the transport.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
