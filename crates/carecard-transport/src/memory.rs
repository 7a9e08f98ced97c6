use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::traits::TagTransport;

/// NDEF Tag Application identifier answered by the emulator.
const NDEF_AID: [u8; 7] = [0xD2, 0x76, 0x00, 0x00, 0x85, 0x01, 0x01];

const CC_FILE_ID: u16 = 0xE103;
const NDEF_FILE_ID: u16 = 0xE104;

const SW_OK: [u8; 2] = [0x90, 0x00];
const SW_WRONG_LENGTH: [u8; 2] = [0x67, 0x00];
const SW_SECURITY_NOT_SATISFIED: [u8; 2] = [0x69, 0x82];
const SW_NO_CURRENT_EF: [u8; 2] = [0x69, 0x86];
const SW_FILE_NOT_FOUND: [u8; 2] = [0x6A, 0x82];
const SW_WRONG_OFFSET: [u8; 2] = [0x6B, 0x00];
const SW_INS_NOT_SUPPORTED: [u8; 2] = [0x6D, 0x00];
const SW_CLA_NOT_SUPPORTED: [u8; 2] = [0x6E, 0x00];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelectedFile {
    CapabilityContainer,
    Ndef,
}

/// An emulated NFC Forum Type 4 tag held entirely in memory.
///
/// Answers the subset of ISO 7816-4 the tag protocol uses: SELECT by AID and
/// by file id, READ BINARY, UPDATE BINARY, plus the reader-level GET UID
/// pseudo-APDU. Every command is recorded so tests can assert on the exact
/// exchange.
pub struct MemoryTag {
    uid: Vec<u8>,
    capability_container: [u8; 15],
    ndef_file: Vec<u8>,
    present: bool,
    application_selected: bool,
    selected: Option<SelectedFile>,
    fail_remaining: usize,
    log: Vec<Vec<u8>>,
}

impl MemoryTag {
    /// Size of the emulated NDEF file, length field included.
    pub const DEFAULT_FILE_SIZE: usize = 8192;

    /// Default 7-byte UID reported by GET UID.
    pub const DEFAULT_UID: [u8; 7] = [0x04, 0xA2, 0x3B, 0x5C, 0x6D, 0x7E, 0x80];

    /// Create a blank, formatted tag (NDEF length 0).
    pub fn new() -> Self {
        Self::from_image(Vec::new())
    }

    /// Create a tag whose NDEF file starts with `image`.
    ///
    /// The image is zero-extended to [`Self::DEFAULT_FILE_SIZE`]; longer
    /// images keep their length.
    pub fn from_image(image: impl Into<Vec<u8>>) -> Self {
        let mut ndef_file = image.into();
        if ndef_file.len() < Self::DEFAULT_FILE_SIZE {
            ndef_file.resize(Self::DEFAULT_FILE_SIZE, 0x00);
        }
        let max_ndef = (ndef_file.len().min(u16::MAX as usize) as u16).to_be_bytes();

        Self {
            uid: Self::DEFAULT_UID.to_vec(),
            capability_container: [
                0x00, 0x0F, // CCLEN
                0x20, // mapping version 2.0
                0x00, 0xFF, // MLe
                0x00, 0xFF, // MLc
                0x04, 0x06, // NDEF file control TLV
                0xE1, 0x04, // file id
                max_ndef[0], max_ndef[1],
                0x00, // read access
                0x00, // write access
            ],
            ndef_file,
            present: true,
            application_selected: false,
            selected: None,
            fail_remaining: 0,
            log: Vec::new(),
        }
    }

    /// Create a tag holding `message` in the standard Type 4 layout
    /// (2-byte big-endian length followed by the message).
    pub fn with_ndef_message(message: &[u8]) -> Self {
        let len = (message.len().min(u16::MAX as usize) as u16).to_be_bytes();
        let mut image = Vec::with_capacity(message.len() + 2);
        image.extend_from_slice(&len);
        image.extend_from_slice(message);
        Self::from_image(image)
    }

    /// Override the UID reported by GET UID.
    pub fn with_uid(mut self, uid: &[u8]) -> Self {
        self.uid = uid.to_vec();
        self
    }

    /// Contents of the NDEF file.
    pub fn image(&self) -> &[u8] {
        &self.ndef_file
    }

    /// Every command received so far, in order.
    pub fn commands(&self) -> &[Vec<u8>] {
        &self.log
    }

    /// Forget the recorded commands.
    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Make the next `count` exchanges fail with [`TransportError::TagLost`].
    pub fn fail_next(&mut self, count: usize) {
        self.fail_remaining = count;
    }

    /// Take the tag out of the field. Selection state is lost.
    pub fn remove(&mut self) {
        self.present = false;
        self.application_selected = false;
        self.selected = None;
    }

    /// Put the tag back into the field.
    pub fn insert(&mut self) {
        self.present = true;
    }

    fn respond(&self, command: &[u8]) -> Vec<u8> {
        if command.len() < 4 {
            return SW_WRONG_LENGTH.to_vec();
        }

        let (cla, ins, p1, p2) = (command[0], command[1], command[2], command[3]);

        if cla == 0xFF && ins == 0xCA {
            let mut out = self.uid.clone();
            out.extend_from_slice(&SW_OK);
            return out;
        }

        if cla != 0x00 {
            return SW_CLA_NOT_SUPPORTED.to_vec();
        }

        match ins {
            0xB0 => self.read_binary(u16::from_be_bytes([p1, p2]) as usize, command),
            _ => SW_INS_NOT_SUPPORTED.to_vec(),
        }
    }

    fn respond_mut(&mut self, command: &[u8]) -> Vec<u8> {
        if command.len() < 4 || command[0] != 0x00 {
            return self.respond(command);
        }

        match command[1] {
            0xA4 => self.select(command),
            0xD6 => self.update_binary(command),
            _ => self.respond(command),
        }
    }

    fn select(&mut self, command: &[u8]) -> Vec<u8> {
        let Some(data) = command_data(command) else {
            return SW_WRONG_LENGTH.to_vec();
        };

        match command[2] {
            0x04 => {
                if data == NDEF_AID {
                    self.application_selected = true;
                    self.selected = None;
                    SW_OK.to_vec()
                } else {
                    self.application_selected = false;
                    SW_FILE_NOT_FOUND.to_vec()
                }
            }
            0x00 => {
                if !self.application_selected || data.len() != 2 {
                    return SW_FILE_NOT_FOUND.to_vec();
                }
                match u16::from_be_bytes([data[0], data[1]]) {
                    CC_FILE_ID => {
                        self.selected = Some(SelectedFile::CapabilityContainer);
                        SW_OK.to_vec()
                    }
                    NDEF_FILE_ID => {
                        self.selected = Some(SelectedFile::Ndef);
                        SW_OK.to_vec()
                    }
                    _ => SW_FILE_NOT_FOUND.to_vec(),
                }
            }
            _ => SW_FILE_NOT_FOUND.to_vec(),
        }
    }

    fn read_binary(&self, offset: usize, command: &[u8]) -> Vec<u8> {
        let file: &[u8] = match self.selected {
            Some(SelectedFile::CapabilityContainer) => &self.capability_container,
            Some(SelectedFile::Ndef) => &self.ndef_file,
            None => return SW_NO_CURRENT_EF.to_vec(),
        };

        let expected = match command.get(4) {
            Some(0) | None => 256,
            Some(&le) => le as usize,
        };

        if offset > file.len() {
            return SW_WRONG_OFFSET.to_vec();
        }

        let end = (offset + expected).min(file.len());
        let mut out = file[offset..end].to_vec();
        out.extend_from_slice(&SW_OK);
        out
    }

    fn update_binary(&mut self, command: &[u8]) -> Vec<u8> {
        match self.selected {
            Some(SelectedFile::Ndef) => {}
            Some(SelectedFile::CapabilityContainer) => return SW_SECURITY_NOT_SATISFIED.to_vec(),
            None => return SW_NO_CURRENT_EF.to_vec(),
        }

        let Some(data) = command_data(command) else {
            return SW_WRONG_LENGTH.to_vec();
        };

        let offset = u16::from_be_bytes([command[2], command[3]]) as usize;
        if offset + data.len() > self.ndef_file.len() {
            return SW_WRONG_OFFSET.to_vec();
        }

        self.ndef_file[offset..offset + data.len()].copy_from_slice(data);
        SW_OK.to_vec()
    }
}

impl Default for MemoryTag {
    fn default() -> Self {
        Self::new()
    }
}

impl TagTransport for MemoryTag {
    fn transmit(&mut self, command: &[u8], max_response_len: usize) -> Result<Vec<u8>> {
        self.log.push(command.to_vec());

        if !self.present {
            return Err(TransportError::NoTag);
        }

        if self.fail_remaining > 0 {
            self.fail_remaining -= 1;
            debug!(remaining = self.fail_remaining, "injected exchange failure");
            return Err(TransportError::TagLost);
        }

        let response = self.respond_mut(command);
        trace!(
            command = %hex::encode(command),
            response = %hex::encode(&response),
            "memory tag exchange"
        );

        if response.len() > max_response_len {
            return Err(TransportError::ResponseTooLong {
                len: response.len(),
                max: max_response_len,
            });
        }

        Ok(response)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

impl std::fmt::Debug for MemoryTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTag")
            .field("uid", &hex::encode(&self.uid))
            .field("present", &self.present)
            .field("file_size", &self.ndef_file.len())
            .field("commands", &self.log.len())
            .finish()
    }
}

/// Data field of a short APDU with Lc, or `None` when Lc disagrees with the
/// command length.
fn command_data(command: &[u8]) -> Option<&[u8]> {
    let lc = *command.get(4)? as usize;
    command.get(5..5 + lc)
}
