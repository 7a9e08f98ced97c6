//! The retrying read pipeline.

use bytes::Bytes;
use carecard_ndef::StructuredTagData;
use carecard_tagfile::TagFileReader;
use carecard_transport::TagTransport;
use tracing::info;

use crate::error::{Result, SessionError};
use crate::pipeline::TagPipeline;
use crate::retry::{retry, Delay};

impl<D: Delay> TagPipeline<D> {
    /// Read and decode the tag, retrying per the configured policy.
    pub fn read<T: TagTransport + ?Sized>(&self, transport: &mut T) -> Result<StructuredTagData> {
        let message = self.read_message(transport)?;
        Ok(carecard_ndef::decode(&message))
    }

    /// Read the raw NDEF message, retrying per the configured policy.
    ///
    /// Every attempt runs the full select/read sequence from the start.
    pub fn read_message<T: TagTransport + ?Sized>(&self, transport: &mut T) -> Result<Bytes> {
        let outcome = retry(&self.config.retry, &self.delay, |_| {
            TagFileReader::with_config(&mut *transport, self.config.tag_file.clone()).read_ndef()
        });

        let attempts = outcome.attempts();
        let message = outcome
            .into_result()
            .map_err(|err| SessionError::ReadExhausted {
                attempts,
                last_error: err.to_string(),
            })?;
        info!(attempts, len = message.len(), "tag read");
        Ok(message)
    }
}
