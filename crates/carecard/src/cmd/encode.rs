use carecard::ndef::{build_records, encode_records, StructuredTagData};
use carecard::tagfile::tlv;
use tracing::warn;

use crate::cmd::{load_json, EncodeArgs};
use crate::exit::{CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_encoded, EncodedOutput, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload: StructuredTagData = load_json(&args.payload)?;
    let encoded = encode_payload(&payload, &args.vcard_mime_type)?;
    print_encoded(&encoded, format);
    Ok(SUCCESS)
}

fn encode_payload(payload: &StructuredTagData, vcard_mime_type: &str) -> CliResult<EncodedOutput> {
    let records = build_records(payload, vcard_mime_type);
    if records.is_empty() {
        return Err(CliError::new(DATA_INVALID, "payload has nothing to encode"));
    }

    let message = encode_records(&records)
        .map_err(|err| CliError::new(DATA_INVALID, format!("encode failed: {err}")))?;
    let tlv = match tlv::wrap(&message) {
        Ok(frame) => Some(hex::encode(&frame)),
        Err(err) => {
            warn!(error = %err, "message cannot be written as a TLV frame");
            None
        }
    };

    Ok(EncodedOutput {
        records: records.len(),
        message_len: message.len(),
        message: hex::encode(&message),
        tlv,
    })
}

#[cfg(test)]
mod tests {
    use carecard::ndef::{PersonalField, PersonalInfo};

    use super::*;

    #[test]
    fn url_only_payload_encodes_one_record() {
        let payload = StructuredTagData {
            vcard_url: Some("https://example.com".into()),
            ..Default::default()
        };
        let encoded = encode_payload(&payload, "text/vcard").unwrap();
        assert_eq!(encoded.records, 1);
        assert!(encoded.message.starts_with("d101"));
        assert!(encoded.tlv.as_deref().is_some_and(|tlv| tlv.starts_with("03")));
    }

    #[test]
    fn oversized_payload_has_no_tlv_frame() {
        let payload = StructuredTagData {
            personal_info: PersonalInfo::new()
                .with(PersonalField::FullName, "N".repeat(300)),
            ..Default::default()
        };
        let encoded = encode_payload(&payload, "text/vcard").unwrap();
        assert!(encoded.message_len > 254);
        assert!(encoded.tlv.is_none());
    }

    #[test]
    fn empty_payload_is_rejected() {
        let err = encode_payload(&StructuredTagData::default(), "text/vcard").unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
    }
}
