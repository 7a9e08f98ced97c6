use bytes::Bytes;

/// Message Begin: set on the first record of a message.
pub const FLAG_MB: u8 = 0x80;
/// Message End: set on the last record of a message.
pub const FLAG_ME: u8 = 0x40;
/// Short Record: payload length is one byte instead of four.
pub const FLAG_SR: u8 = 0x10;
/// ID Length present.
pub const FLAG_IL: u8 = 0x08;
/// Mask for the Type Name Format bits.
pub const TNF_MASK: u8 = 0x07;

/// Largest payload that still fits a short record.
pub const SHORT_RECORD_MAX: usize = 255;

/// Type Name Format, the low three bits of a record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tnf {
    Empty = 0x00,
    WellKnown = 0x01,
    Media = 0x02,
    AbsoluteUri = 0x03,
    External = 0x04,
    Unknown = 0x05,
    Unchanged = 0x06,
    Reserved = 0x07,
}

impl Tnf {
    /// Extract the TNF from a record header byte.
    pub fn from_header(header: u8) -> Self {
        match header & TNF_MASK {
            0x00 => Tnf::Empty,
            0x01 => Tnf::WellKnown,
            0x02 => Tnf::Media,
            0x03 => Tnf::AbsoluteUri,
            0x04 => Tnf::External,
            0x05 => Tnf::Unknown,
            0x06 => Tnf::Unchanged,
            _ => Tnf::Reserved,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Well-known record type `U`.
pub const RTD_URI: &[u8] = b"U";
/// Well-known record type `T`.
pub const RTD_TEXT: &[u8] = b"T";

/// A single NDEF record.
///
/// Header flags are not stored: MB, ME and SR are derived from the record's
/// position and payload size when a message is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdefRecord {
    pub tnf: Tnf,
    pub record_type: Bytes,
    pub payload: Bytes,
}

impl NdefRecord {
    pub fn new(tnf: Tnf, record_type: impl Into<Bytes>, payload: impl Into<Bytes>) -> Self {
        Self {
            tnf,
            record_type: record_type.into(),
            payload: payload.into(),
        }
    }

    /// A well-known URI record (`TNF=1`, type `U`).
    pub fn uri(uri: &str) -> Self {
        Self::new(Tnf::WellKnown, RTD_URI, crate::uri::encode_payload(uri))
    }

    /// A well-known Text record (`TNF=1`, type `T`) in English.
    pub fn text(text: &str) -> Self {
        Self::new(Tnf::WellKnown, RTD_TEXT, crate::text::encode_payload(text))
    }

    /// A media-type record (`TNF=2`).
    pub fn mime(mime_type: &str, payload: impl Into<Bytes>) -> Self {
        Self::new(
            Tnf::Media,
            Bytes::copy_from_slice(mime_type.as_bytes()),
            payload,
        )
    }

    pub fn is_well_known(&self, rtd: &[u8]) -> bool {
        self.tnf == Tnf::WellKnown && self.record_type.as_ref() == rtd
    }

    /// The record type interpreted as text (MIME type, RTD name).
    pub fn type_str(&self) -> String {
        String::from_utf8_lossy(&self.record_type).into_owned()
    }
}
