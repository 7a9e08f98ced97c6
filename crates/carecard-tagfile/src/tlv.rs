//! TLV framing of the stored NDEF message.
//!
//! ```text
//! ┌──────┬────────┬──────────────┬──────┬──────────────┐
//! │ 0x03 │ Len 1B │ NDEF message │ 0xFE │ 0x00 padding │
//! └──────┴────────┴──────────────┴──────┴──────────────┘
//! ```
//! The frame is padded to the next multiple of 4 bytes.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, TagFileError};

pub const TLV_NULL: u8 = 0x00;
pub const TLV_NDEF: u8 = 0x03;
pub const TLV_TERMINATOR: u8 = 0xFE;

/// Marks the three-byte length form.
pub const LONG_LENGTH_MARKER: u8 = 0xFF;

/// Largest message a one-byte TLV length can describe.
///
/// A length byte of `0xFF` is the NFC Forum marker for the three-byte long
/// form, so a 255-byte message already needs `FF 00 FF`. That form is not
/// written.
pub const MAX_MESSAGE_LEN: usize = 0xFE;

const PAD_TO: usize = 4;

/// Wrap `message` in an NDEF TLV, terminate and pad it.
///
/// Messages longer than [`MAX_MESSAGE_LEN`] are rejected.
pub fn wrap(message: &[u8]) -> Result<Bytes> {
    if message.len() > MAX_MESSAGE_LEN {
        return Err(TagFileError::MessageTooLong {
            len: message.len(),
            max: MAX_MESSAGE_LEN,
        });
    }

    let framed = message.len() + 3;
    let padded = framed.div_ceil(PAD_TO) * PAD_TO;

    let mut dst = BytesMut::with_capacity(padded);
    dst.put_u8(TLV_NDEF);
    dst.put_u8(message.len() as u8);
    dst.put_slice(message);
    dst.put_u8(TLV_TERMINATOR);
    dst.put_bytes(0x00, padded - framed);
    Ok(dst.freeze())
}

/// Find the NDEF message inside a stored TLV area.
///
/// Leading NULL TLVs are skipped, and both the one-byte and the three-byte
/// (`FF hi lo`) length forms are accepted.
pub fn unwrap(src: &[u8]) -> Result<&[u8]> {
    let start = src
        .iter()
        .position(|&byte| byte != TLV_NULL)
        .ok_or(TagFileError::MalformedTlv("no TLV present"))?;

    let rest = &src[start..];
    match rest[0] {
        TLV_NDEF => {}
        TLV_TERMINATOR => return Err(TagFileError::MalformedTlv("terminator before NDEF TLV")),
        _ => return Err(TagFileError::MalformedTlv("first TLV is not NDEF")),
    }

    let (len, header) = match rest.get(1) {
        Some(&LONG_LENGTH_MARKER) => match rest.get(2..4) {
            Some(&[hi, lo]) => (u16::from_be_bytes([hi, lo]) as usize, 4),
            _ => return Err(TagFileError::MalformedTlv("truncated length")),
        },
        Some(&len) => (len as usize, 2),
        None => return Err(TagFileError::MalformedTlv("truncated length")),
    };

    rest.get(header..header + len)
        .ok_or(TagFileError::MalformedTlv("value overruns buffer"))
}

/// Whether a stored area starts with an NDEF TLV rather than a length field.
pub fn looks_like_tlv(src: &[u8]) -> bool {
    src.first() == Some(&TLV_NDEF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_layout() {
        let framed = wrap(&[0xAA]).unwrap();
        assert_eq!(framed.as_ref(), &[0x03, 0x01, 0xAA, 0xFE]);

        let framed = wrap(&[0xAA, 0xBB]).unwrap();
        assert_eq!(framed.as_ref(), &[0x03, 0x02, 0xAA, 0xBB, 0xFE, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn padding_is_multiple_of_four() {
        for len in [0usize, 1, 2, 3, 4, 5, 100, 252, 253, 254] {
            let framed = wrap(&vec![0x55; len]).unwrap();
            assert_eq!(framed.len() % 4, 0, "len {len}");
            assert!(framed.len() >= len + 3, "len {len}");
            assert!(framed.len() < len + 3 + 4, "len {len}");
        }
    }

    #[test]
    fn too_long_rejected() {
        assert!(wrap(&[0u8; 254]).is_ok());
        let err = wrap(&[0u8; 255]).unwrap_err();
        assert!(matches!(err, TagFileError::MessageTooLong { len: 255, max: 254 }));
        assert!(err.to_string().contains("0xFF length marks the unsupported long form"));
    }

    #[test]
    fn unwrap_finds_message() {
        let framed = wrap(b"hello").unwrap();
        assert_eq!(unwrap(&framed).unwrap(), b"hello");

        let mut with_nulls = vec![0x00, 0x00];
        with_nulls.extend_from_slice(&framed);
        assert_eq!(unwrap(&with_nulls).unwrap(), b"hello");
    }

    #[test]
    fn unwrap_long_form() {
        let mut src = vec![0x03, 0xFF, 0x01, 0x00];
        src.extend(std::iter::repeat_n(0x42, 256));
        src.push(0xFE);
        assert_eq!(unwrap(&src).unwrap().len(), 256);
    }

    #[test]
    fn unwrap_errors() {
        assert!(matches!(unwrap(&[0, 0, 0]), Err(TagFileError::MalformedTlv(_))));
        assert!(matches!(unwrap(&[0xFE]), Err(TagFileError::MalformedTlv(_))));
        assert!(matches!(unwrap(&[0x01, 0x03]), Err(TagFileError::MalformedTlv(_))));
        assert!(matches!(unwrap(&[0x03]), Err(TagFileError::MalformedTlv(_))));
        assert!(matches!(unwrap(&[0x03, 0x05, 0x01]), Err(TagFileError::MalformedTlv(_))));
    }

    #[test]
    fn tlv_detection() {
        assert!(looks_like_tlv(&[0x03, 0x10]));
        assert!(!looks_like_tlv(&[0x00, 0x10]));
    }
}
