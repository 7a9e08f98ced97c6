//! Command builders and response parsing for the Type 4 command set.

use std::fmt;

use bytes::Bytes;
use carecard_transport::TagTransport;
use tracing::debug;

use crate::error::{Result, TagFileError};

/// NDEF Tag Application AID (mapping version 2.0).
pub const NDEF_AID: [u8; 7] = [0xD2, 0x76, 0x00, 0x00, 0x85, 0x01, 0x01];
/// Capability container file identifier.
pub const CC_FILE_ID: u16 = 0xE103;
/// NDEF file identifier.
pub const NDEF_FILE_ID: u16 = 0xE104;
/// Size of the capability container read.
pub const CC_LEN: u8 = 0x0F;

const CLA: u8 = 0x00;
const INS_SELECT: u8 = 0xA4;
const INS_READ_BINARY: u8 = 0xB0;
const INS_UPDATE_BINARY: u8 = 0xD6;

/// `00 A4 04 00 07 <AID> 00`
pub fn select_application() -> Vec<u8> {
    let mut apdu = vec![CLA, INS_SELECT, 0x04, 0x00, NDEF_AID.len() as u8];
    apdu.extend_from_slice(&NDEF_AID);
    apdu.push(0x00);
    apdu
}

/// `00 A4 00 0C 02 <file id>`: select by file identifier, no FCI returned.
pub fn select_file(file_id: u16) -> Vec<u8> {
    let [hi, lo] = file_id.to_be_bytes();
    vec![CLA, INS_SELECT, 0x00, 0x0C, 0x02, hi, lo]
}

/// `00 B0 <offset hi> <offset lo> <len>`
pub fn read_binary(offset: u16, len: u8) -> Vec<u8> {
    let [hi, lo] = offset.to_be_bytes();
    vec![CLA, INS_READ_BINARY, hi, lo, len]
}

/// `00 D6 <offset hi> <offset lo> <len> <data>`
///
/// `data` must be at most 255 bytes.
pub fn update_binary(offset: u16, data: &[u8]) -> Vec<u8> {
    let [hi, lo] = offset.to_be_bytes();
    let mut apdu = Vec::with_capacity(5 + data.len());
    apdu.extend_from_slice(&[CLA, INS_UPDATE_BINARY, hi, lo, data.len() as u8]);
    apdu.extend_from_slice(data);
    apdu
}

/// `FF CA 00 00 00`: PC/SC pseudo-APDU returning the tag UID.
pub fn get_uid() -> Vec<u8> {
    vec![0xFF, 0xCA, 0x00, 0x00, 0x00]
}

/// The two status bytes that end every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusWord {
    pub sw1: u8,
    pub sw2: u8,
}

impl StatusWord {
    pub const SUCCESS: StatusWord = StatusWord::new(0x90, 0x00);

    pub const fn new(sw1: u8, sw2: u8) -> Self {
        Self { sw1, sw2 }
    }

    /// `90 00`, or `61 xx` (success, more data available).
    pub fn is_success(self) -> bool {
        matches!((self.sw1, self.sw2), (0x90, 0x00) | (0x61, _))
    }

    pub fn as_u16(self) -> u16 {
        u16::from_be_bytes([self.sw1, self.sw2])
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}", self.sw1, self.sw2)
    }
}

/// A response split into data and status trailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub data: Bytes,
    pub status: StatusWord,
}

impl Response {
    /// Split a raw response. `command` names the command in errors.
    pub fn parse(command: &'static str, raw: &[u8]) -> Result<Self> {
        let Some(split) = raw.len().checked_sub(2) else {
            return Err(TagFileError::ShortResponse {
                command,
                len: raw.len(),
            });
        };
        let (data, trailer) = raw.split_at(split);
        Ok(Self {
            data: Bytes::copy_from_slice(data),
            status: StatusWord::new(trailer[0], trailer[1]),
        })
    }

    /// Fail with [`TagFileError::Status`] unless the status is a success.
    pub fn check(self, command: &'static str) -> Result<Self> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(TagFileError::Status {
                command,
                status: self.status,
            })
        }
    }
}

/// Send one command and return its data, failing on any non-success status.
pub fn transceive<T: TagTransport + ?Sized>(
    transport: &mut T,
    command_name: &'static str,
    command: &[u8],
    max_response_len: usize,
) -> Result<Bytes> {
    let raw = transport.transmit(command, max_response_len)?;
    let response = Response::parse(command_name, &raw)?;
    debug!(
        command = command_name,
        status = %response.status,
        data_len = response.data.len(),
        "apdu exchange"
    );
    Ok(response.check(command_name)?.data)
}
