use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::{debug, warn};

use crate::error::{NdefError, Result};
use crate::record::{NdefRecord, Tnf, FLAG_IL, FLAG_MB, FLAG_ME, FLAG_SR, SHORT_RECORD_MAX};

/// Encode records into a single NDEF message.
///
/// Record layout:
/// ```text
/// ┌────────┬──────────┬──────────────────┬──────────┬─────────┐
/// │ Header │ Type len │ Payload len      │ Type     │ Payload │
/// │ (1B)   │ (1B)     │ (1B SR / 4B BE)  │          │         │
/// └────────┴──────────┴──────────────────┴──────────┴─────────┘
/// ```
///
/// The first record carries MB, the last carries ME, and SR is set whenever
/// the payload fits in one byte. An empty slice encodes to an empty message.
pub fn encode_message(records: &[NdefRecord]) -> Result<Bytes> {
    let mut dst = BytesMut::new();
    let last = records.len().saturating_sub(1);
    for (index, record) in records.iter().enumerate() {
        encode_record(record, index == 0, index == last, &mut dst)?;
    }
    Ok(dst.freeze())
}

/// Append one record to `dst` with the given message position flags.
pub fn encode_record(
    record: &NdefRecord,
    first: bool,
    last: bool,
    dst: &mut BytesMut,
) -> Result<()> {
    let type_len = record.record_type.len();
    if type_len > u8::MAX as usize {
        return Err(NdefError::TypeTooLong { len: type_len });
    }
    let payload_len = record.payload.len();
    if payload_len > u32::MAX as usize {
        return Err(NdefError::PayloadTooLarge {
            len: payload_len,
            max: u32::MAX as usize,
        });
    }

    let short = payload_len <= SHORT_RECORD_MAX;
    let mut header = record.tnf.as_u8();
    if first {
        header |= FLAG_MB;
    }
    if last {
        header |= FLAG_ME;
    }
    if short {
        header |= FLAG_SR;
    }

    dst.reserve(6 + type_len + payload_len);
    dst.put_u8(header);
    dst.put_u8(type_len as u8);
    if short {
        dst.put_u8(payload_len as u8);
    } else {
        dst.put_u32(payload_len as u32);
    }
    dst.put_slice(&record.record_type);
    dst.put_slice(&record.payload);
    Ok(())
}

/// Decode records from a raw NDEF message.
///
/// Decoding is best effort and never fails:
/// - a `0x00` header byte ends the message (zero padding after the data)
/// - declared type/payload lengths that overrun the buffer are clamped to
///   what is left, and the partial record is kept
/// - decoding stops after the record flagged ME
/// - ID fields are skipped
pub fn decode_records(src: &[u8]) -> Vec<NdefRecord> {
    let mut buf = src;
    let mut records = Vec::new();

    while buf.has_remaining() {
        let header = buf.get_u8();
        if header == 0x00 {
            break;
        }

        if !buf.has_remaining() {
            warn!(records = records.len(), "ndef record header truncated");
            break;
        }
        let type_len = buf.get_u8() as usize;

        let payload_len = if header & FLAG_SR != 0 {
            if !buf.has_remaining() {
                warn!(records = records.len(), "ndef short length truncated");
                break;
            }
            buf.get_u8() as usize
        } else {
            if buf.remaining() < 4 {
                warn!(records = records.len(), "ndef long length truncated");
                break;
            }
            buf.get_u32() as usize
        };

        let id_len = if header & FLAG_IL != 0 {
            if !buf.has_remaining() {
                warn!(records = records.len(), "ndef id length truncated");
                break;
            }
            buf.get_u8() as usize
        } else {
            0
        };

        let declared = type_len + id_len + payload_len;
        let (type_len, id_len, payload_len) = if declared > buf.remaining() {
            let available = buf.remaining();
            let type_take = type_len.min(available);
            let id_take = id_len.min(available - type_take);
            let payload_take = payload_len.min(available - type_take - id_take);
            warn!(declared, available, "ndef record overruns buffer, clamping");
            (type_take, id_take, payload_take)
        } else {
            (type_len, id_len, payload_len)
        };

        let record_type = Bytes::copy_from_slice(&buf[..type_len]);
        buf.advance(type_len + id_len);
        let payload = Bytes::copy_from_slice(&buf[..payload_len]);
        buf.advance(payload_len);

        let record = NdefRecord {
            tnf: Tnf::from_header(header),
            record_type,
            payload,
        };
        debug!(
            tnf = ?record.tnf,
            record_type = %record.type_str(),
            payload_len,
            "ndef record decoded"
        );
        records.push(record);

        if header & FLAG_ME != 0 {
            break;
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RTD_TEXT, RTD_URI};

    fn sample() -> Vec<NdefRecord> {
        vec![
            NdefRecord::uri("https://vcard.example.com/profile/jane"),
            NdefRecord::mime("text/vcard", &b"BEGIN:VCARD\nEND:VCARD\n"[..]),
            NdefRecord::text("EMERGENCY CONTACT INFORMATION"),
        ]
    }

    #[test]
    fn test_roundtrip_preserves_records() {
        let records = sample();
        let encoded = encode_message(&records).unwrap();
        let decoded = decode_records(&encoded);
        assert_eq!(decoded, records);
    }

    #[test]
    fn test_message_begin_and_end_flags() {
        let records = sample();
        let encoded = encode_message(&records).unwrap();

        let first = encoded[0];
        assert_eq!(first & FLAG_MB, FLAG_MB);
        assert_eq!(first & FLAG_ME, 0);

        // Walk to the last header: all sample records are short.
        let mut offset = 0;
        let mut headers = Vec::new();
        while offset < encoded.len() {
            headers.push(encoded[offset]);
            let type_len = encoded[offset + 1] as usize;
            let payload_len = encoded[offset + 2] as usize;
            offset += 3 + type_len + payload_len;
        }
        assert_eq!(headers.len(), 3);
        assert_eq!(headers[1] & (FLAG_MB | FLAG_ME), 0);
        assert_eq!(headers[2] & FLAG_ME, FLAG_ME);
        assert_eq!(headers[2] & FLAG_MB, 0);
    }

    #[test]
    fn test_single_record_has_both_flags() {
        let encoded = encode_message(&[NdefRecord::text("x")]).unwrap();
        assert_eq!(encoded[0], FLAG_MB | FLAG_ME | FLAG_SR | 0x01);
    }

    #[test]
    fn test_short_record_boundary() {
        let at_limit = NdefRecord::mime("a/b", vec![0x41; 255]);
        let encoded = encode_message(&[at_limit]).unwrap();
        assert_eq!(encoded[0] & FLAG_SR, FLAG_SR);
        assert_eq!(encoded[2], 255);
        assert_eq!(encoded.len(), 3 + 3 + 255);

        let over = NdefRecord::mime("a/b", vec![0x41; 256]);
        let encoded = encode_message(&[over.clone()]).unwrap();
        assert_eq!(encoded[0] & FLAG_SR, 0);
        assert_eq!(&encoded[2..6], &[0x00, 0x00, 0x01, 0x00]);
        assert_eq!(encoded.len(), 6 + 3 + 256);

        assert_eq!(decode_records(&encoded), vec![over]);
    }

    #[test]
    fn test_empty_message() {
        assert!(encode_message(&[]).unwrap().is_empty());
        assert!(decode_records(&[]).is_empty());
    }

    #[test]
    fn test_type_too_long() {
        let record = NdefRecord::new(Tnf::External, vec![b'x'; 256], Bytes::new());
        let err = encode_message(&[record]).unwrap_err();
        assert!(matches!(err, NdefError::TypeTooLong { len: 256 }));
    }

    #[test]
    fn test_zero_header_terminates() {
        let mut buf = encode_message(&[NdefRecord::text("one")]).unwrap().to_vec();
        // Clear ME so only the padding can stop the decoder.
        buf[0] &= !FLAG_ME;
        buf.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        let decoded = decode_records(&buf);
        assert_eq!(decoded.len(), 1);
    }

    #[test]
    fn test_stops_after_message_end() {
        let mut buf = encode_message(&[NdefRecord::text("one")]).unwrap().to_vec();
        buf.extend_from_slice(&encode_message(&[NdefRecord::text("two")]).unwrap());
        let decoded = decode_records(&buf);
        assert_eq!(decoded.len(), 1);
        assert!(decoded[0].is_well_known(RTD_TEXT));
    }

    #[test]
    fn test_truncated_payload_is_clamped() {
        let encoded = encode_message(&[NdefRecord::uri("https://example.com/long/path")]).unwrap();
        let cut = &encoded[..encoded.len() - 5];
        let decoded = decode_records(cut);
        assert_eq!(decoded.len(), 1);
        assert!(decoded[0].is_well_known(RTD_URI));
        assert_eq!(decoded[0].payload.len(), cut.len() - 4);
    }

    #[test]
    fn test_complete_records_survive_truncated_tail() {
        let records = sample();
        let encoded = encode_message(&records).unwrap();
        let cut = &encoded[..encoded.len() - 6];

        let decoded = decode_records(cut);
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded[..2], records[..2]);
        assert!(decoded[2].is_well_known(RTD_TEXT));
        let kept = records[2].payload.len() - 6;
        assert_eq!(decoded[2].payload, records[2].payload.slice(..kept));
    }

    #[test]
    fn test_truncated_header_yields_nothing() {
        assert!(decode_records(&[0xD1]).is_empty());
        assert!(decode_records(&[0xC1, 0x01, 0x00, 0x00]).is_empty());
    }

    #[test]
    fn test_id_field_is_skipped() {
        // MB|ME|SR|IL, TNF=1, type "T", id "ab", payload [0x02 'e' 'n' 'h' 'i']
        let buf = [
            0xD9, 0x01, 0x05, 0x02, b'T', b'a', b'b', 0x02, b'e', b'n', b'h', b'i',
        ];
        let decoded = decode_records(&buf);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].record_type.as_ref(), b"T");
        assert_eq!(decoded[0].payload.as_ref(), &[0x02, b'e', b'n', b'h', b'i']);
    }
}
