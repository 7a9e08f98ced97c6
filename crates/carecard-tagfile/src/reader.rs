use bytes::{Bytes, BytesMut};
use carecard_transport::TagTransport;
use tracing::{debug, info, warn};

use crate::apdu::{self, transceive, CC_FILE_ID, CC_LEN, NDEF_FILE_ID};
use crate::config::TagFileConfig;
use crate::error::{Result, TagFileError};

/// Offset of the message inside the NDEF file, after the 2-byte length.
pub const NDEF_DATA_OFFSET: usize = 2;

/// Reads the NDEF message from a Type 4 tag.
pub struct TagFileReader<T> {
    inner: T,
    config: TagFileConfig,
}

impl<T: TagTransport> TagFileReader<T> {
    /// Create a reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, TagFileConfig::default())
    }

    /// Create a reader with explicit configuration.
    pub fn with_config(inner: T, config: TagFileConfig) -> Self {
        Self { inner, config }
    }

    /// Run the full read sequence and return the raw NDEF message.
    ///
    /// The capability container is read but not interpreted.
    pub fn read_ndef(&mut self) -> Result<Bytes> {
        self.select_application()?;
        let cc = self.read_capability_container()?;
        debug!(cc = %hex::encode(&cc), "capability container");

        self.exchange("select ndef file", &apdu::select_file(NDEF_FILE_ID))?;
        let len = self.read_length()?;
        let message = self.read_chunks(len)?;

        info!(len, reader = self.inner.name(), "ndef message read");
        Ok(message)
    }

    /// SELECT the NDEF application.
    pub fn select_application(&mut self) -> Result<()> {
        self.exchange("select application", &apdu::select_application())?;
        Ok(())
    }

    /// SELECT and READ the 15-byte capability container.
    pub fn read_capability_container(&mut self) -> Result<Bytes> {
        self.exchange("select capability container", &apdu::select_file(CC_FILE_ID))?;
        self.exchange("read capability container", &apdu::read_binary(0, CC_LEN))
    }

    /// Ask the reader for the tag UID.
    pub fn read_uid(&mut self) -> Result<Bytes> {
        self.exchange("get uid", &apdu::get_uid())
    }

    /// Read the 2-byte big-endian message length of the selected NDEF file.
    fn read_length(&mut self) -> Result<usize> {
        let data = self.exchange("read ndef length", &apdu::read_binary(0, 2))?;
        let len = match data.as_ref() {
            [hi, lo, ..] => u16::from_be_bytes([*hi, *lo]) as usize,
            _ => {
                return Err(TagFileError::InvalidLength {
                    len: 0,
                    max: self.config.max_ndef_len,
                })
            }
        };

        if len == 0 || len > self.config.max_ndef_len {
            return Err(TagFileError::InvalidLength {
                len,
                max: self.config.max_ndef_len,
            });
        }
        Ok(len)
    }

    /// READ BINARY `len` bytes from offset 2 in chunks, one command at a time.
    ///
    /// A chunk answered with an error status (typically `6B00` past the end
    /// of a file smaller than `len`) ends the read with what was gathered so
    /// far. Only the first chunk's status is fatal.
    fn read_chunks(&mut self, len: usize) -> Result<Bytes> {
        let chunk_size = self.config.read_chunk_size.clamp(1, u8::MAX as usize);
        let mut message = BytesMut::with_capacity(len);
        let mut read = 0usize;

        while read < len {
            let want = chunk_size.min(len - read);
            let offset = NDEF_DATA_OFFSET + read;
            let data = match self.exchange(
                "read ndef chunk",
                &apdu::read_binary(offset as u16, want as u8),
            ) {
                Ok(data) => data,
                Err(TagFileError::Status { status, .. }) if !message.is_empty() => {
                    warn!(offset, want, %status, kept = message.len(), "ndef chunk refused, stopping read");
                    break;
                }
                Err(err) => return Err(err),
            };
            if data.len() != want {
                warn!(offset, want, got = data.len(), "short ndef chunk");
            }
            message.extend_from_slice(&data);
            read += want;
        }

        Ok(message.freeze())
    }

    fn exchange(&mut self, name: &'static str, command: &[u8]) -> Result<Bytes> {
        transceive(&mut self.inner, name, command, self.config.max_response_len)
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the transport.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current configuration.
    pub fn config(&self) -> &TagFileConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use carecard_transport::{MemoryTag, TransportError};

    use super::*;

    fn read_commands(tag: &MemoryTag) -> Vec<(u16, u8)> {
        tag.commands()
            .iter()
            .filter(|cmd| cmd[1] == 0xB0)
            .map(|cmd| (u16::from_be_bytes([cmd[2], cmd[3]]), cmd[4]))
            .collect()
    }

    #[test]
    fn read_small_message() {
        let tag = MemoryTag::with_ndef_message(b"\xD1\x01\x02T\x02en");
        let mut reader = TagFileReader::new(tag);
        let message = reader.read_ndef().unwrap();
        assert_eq!(message.as_ref(), b"\xD1\x01\x02T\x02en");
    }

    #[test]
    fn command_sequence() {
        let mut reader = TagFileReader::new(MemoryTag::with_ndef_message(&[0xAA; 4]));
        reader.read_ndef().unwrap();

        let commands = reader.get_ref().commands();
        assert_eq!(commands[0], apdu::select_application());
        assert_eq!(commands[1], apdu::select_file(CC_FILE_ID));
        assert_eq!(commands[2], [0x00, 0xB0, 0x00, 0x00, 0x0F]);
        assert_eq!(commands[3], apdu::select_file(NDEF_FILE_ID));
        assert_eq!(commands[4], [0x00, 0xB0, 0x00, 0x00, 0x02]);
        assert_eq!(commands[5], [0x00, 0xB0, 0x00, 0x02, 0x04]);
        assert_eq!(commands.len(), 6);
    }

    #[test]
    fn chunked_read_of_600_bytes() {
        let payload: Vec<u8> = (0..600).map(|i| (i % 251) as u8).collect();
        let mut reader = TagFileReader::new(MemoryTag::with_ndef_message(&payload));
        let message = reader.read_ndef().unwrap();
        assert_eq!(message.as_ref(), payload.as_slice());

        let reads = read_commands(reader.get_ref());
        // CC, length, then three chunks
        assert_eq!(&reads[2..], &[(2, 250), (252, 250), (502, 100)]);
    }

    #[test]
    fn zero_length_is_invalid() {
        let mut reader = TagFileReader::new(MemoryTag::new());
        let err = reader.read_ndef().unwrap_err();
        assert!(matches!(err, TagFileError::InvalidLength { len: 0, max: 8192 }));
    }

    #[test]
    fn oversized_length_is_invalid() {
        let mut image = vec![0u8; 64];
        image[0] = 0x20;
        image[1] = 0x01; // 8193
        let mut reader = TagFileReader::new(MemoryTag::from_image(image));
        let err = reader.read_ndef().unwrap_err();
        assert!(matches!(err, TagFileError::InvalidLength { len: 8193, .. }));
    }

    #[test]
    fn transport_failure_propagates() {
        let mut tag = MemoryTag::with_ndef_message(b"abc");
        tag.fail_next(1);
        let mut reader = TagFileReader::new(tag);
        let err = reader.read_ndef().unwrap_err();
        assert!(matches!(err, TagFileError::Transport(TransportError::TagLost)));

        // The injected failure is spent; the next attempt succeeds.
        assert_eq!(reader.read_ndef().unwrap().as_ref(), b"abc");
    }

    #[test]
    fn smaller_chunks_from_config() {
        let config = TagFileConfig {
            read_chunk_size: 16,
            ..TagFileConfig::default()
        };
        let mut reader = TagFileReader::with_config(MemoryTag::with_ndef_message(&[7; 40]), config);
        assert_eq!(reader.read_ndef().unwrap().len(), 40);
        let reads = read_commands(reader.get_ref());
        assert_eq!(&reads[2..], &[(2, 16), (18, 16), (34, 8)]);
    }

    /// A tag whose NDEF file is shorter than the stored length claims.
    struct SmallFile {
        tag: MemoryTag,
        size: usize,
    }

    impl TagTransport for SmallFile {
        fn transmit(
            &mut self,
            command: &[u8],
            max_response_len: usize,
        ) -> carecard_transport::Result<Vec<u8>> {
            if command.len() == 5 && command[1] == 0xB0 {
                let offset = u16::from_be_bytes([command[2], command[3]]) as usize;
                if offset + command[4] as usize > self.size {
                    return Ok(vec![0x6B, 0x00]);
                }
            }
            self.tag.transmit(command, max_response_len)
        }
    }

    #[test]
    fn refused_chunk_ends_read_with_gathered_data() {
        // TLV layout: the first two bytes read as length 0x0304.
        let mut image = vec![0x03, 0x04, 0xD0, 0x00, 0x00, 0xFE];
        image.resize(512, 0x00);
        let tag = SmallFile {
            tag: MemoryTag::from_image(image),
            size: 512,
        };
        let mut reader = TagFileReader::new(tag);
        let message = reader.read_ndef().unwrap();
        assert_eq!(message.len(), 500);
        assert_eq!(&message[..4], &[0xD0, 0x00, 0x00, 0xFE]);
    }

    #[test]
    fn refused_first_chunk_is_an_error() {
        let tag = SmallFile {
            tag: MemoryTag::with_ndef_message(&[0xAA; 40]),
            size: 20,
        };
        let mut reader = TagFileReader::new(tag);
        let err = reader.read_ndef().unwrap_err();
        assert!(matches!(err, TagFileError::Status { command: "read ndef chunk", .. }));
    }

    #[test]
    fn read_uid_from_reader() {
        let tag = MemoryTag::new().with_uid(&[0x04, 0x11, 0x22, 0x33]);
        let mut reader = TagFileReader::new(tag);
        assert_eq!(reader.read_uid().unwrap().as_ref(), &[0x04, 0x11, 0x22, 0x33]);
    }
}
