use bytes::Bytes;
use tracing::debug;

use crate::codec::{decode_records, encode_message};
use crate::content::TagRecord;
use crate::error::Result;
use crate::model::{EmergencyField, StructuredTagData};
use crate::record::NdefRecord;

/// Decode a raw NDEF message into structured tag data.
///
/// Unrecognized records are skipped. Multiple vCard or emergency records
/// merge field by field, later records winning.
pub fn decode(message: &[u8]) -> StructuredTagData {
    let records = decode_records(message);
    let mut data = StructuredTagData::default();
    let mut recognized = 0usize;

    for record in &records {
        let Some(content) = TagRecord::from_record(record) else {
            continue;
        };
        recognized += 1;
        match content {
            TagRecord::Uri(target) => data.vcard_url = Some(target),
            TagRecord::VCard { info, .. } => data.personal_info.extend_from(&info),
            TagRecord::EmergencyContact(contact) => data.emergency_contact.extend_from(&contact),
            TagRecord::Policy(policy) => data.insurance_policies.push(policy),
        }
    }

    debug!(
        records = records.len(),
        recognized,
        policies = data.insurance_policies.len(),
        "ndef message decoded"
    );
    data
}

/// The record set for `data`, in tag order: URI, vCard, emergency contact,
/// then one record per policy.
///
/// The vCard is included when any personal field is set and the emergency
/// record only when the contact has a name.
pub fn build_records(data: &StructuredTagData, vcard_mime_type: &str) -> Vec<TagRecord> {
    let mut records = Vec::with_capacity(3 + data.insurance_policies.len());

    if let Some(target) = data.vcard_url.as_deref().filter(|url| !url.is_empty()) {
        records.push(TagRecord::Uri(target.to_string()));
    }
    if !data.personal_info.is_empty() {
        records.push(TagRecord::VCard {
            mime_type: vcard_mime_type.to_string(),
            info: data.personal_info.clone(),
        });
    }
    if data.emergency_contact.has(EmergencyField::Name) {
        records.push(TagRecord::EmergencyContact(data.emergency_contact.clone()));
    }
    records.extend(
        data.insurance_policies
            .iter()
            .cloned()
            .map(TagRecord::Policy),
    );

    records
}

/// Encode a record set into an NDEF message.
pub fn encode_records(records: &[TagRecord]) -> Result<Bytes> {
    let records: Vec<NdefRecord> = records.iter().map(TagRecord::to_record).collect();
    encode_message(&records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EmergencyContact, PersonalField, PersonalInfo, Policy, PolicyField};
    use crate::vcard::VCARD_MIME_TYPE;

    fn full() -> StructuredTagData {
        StructuredTagData {
            personal_info: PersonalInfo::new()
                .with(PersonalField::FullName, "Jane Doe")
                .with(PersonalField::Email, "jane@example.com"),
            emergency_contact: EmergencyContact::new()
                .with(EmergencyField::Name, "Ravi")
                .with(EmergencyField::Mobile, "+911234"),
            insurance_policies: vec![
                Policy::new()
                    .with(PolicyField::PolicyNumber, "P-1")
                    .with(PolicyField::Status, "Active"),
                Policy::new()
                    .with(PolicyField::PolicyNumber, "P-2")
                    .with(PolicyField::Insurer, "Acme"),
            ],
            vcard_url: Some("https://vcard.example.com/profile/jane".into()),
        }
    }

    #[test]
    fn test_record_order() {
        let records = build_records(&full(), VCARD_MIME_TYPE);
        assert_eq!(records.len(), 5);
        assert!(matches!(records[0], TagRecord::Uri(_)));
        assert!(matches!(records[1], TagRecord::VCard { .. }));
        assert!(matches!(records[2], TagRecord::EmergencyContact(_)));
        assert!(matches!(records[3], TagRecord::Policy(_)));
        assert!(matches!(records[4], TagRecord::Policy(_)));
    }

    #[test]
    fn test_emergency_requires_name() {
        let mut data = full();
        data.emergency_contact.remove(EmergencyField::Name);
        let records = build_records(&data, VCARD_MIME_TYPE);
        assert!(!records
            .iter()
            .any(|record| matches!(record, TagRecord::EmergencyContact(_))));
    }

    #[test]
    fn test_empty_data_builds_nothing() {
        assert!(build_records(&StructuredTagData::default(), VCARD_MIME_TYPE).is_empty());
    }

    #[test]
    fn test_encode_then_decode() {
        let data = full();
        let message = encode_records(&build_records(&data, VCARD_MIME_TYPE)).unwrap();
        let decoded = decode(&message);

        assert_eq!(decoded.vcard_url, data.vcard_url);
        assert_eq!(decoded.personal_info, data.personal_info);
        assert_eq!(decoded.emergency_contact.value(EmergencyField::Name), "Ravi");
        // Templates write every label, so blanks come back as empty strings.
        assert_eq!(decoded.emergency_contact.get(EmergencyField::Location), Some(""));
        assert_eq!(decoded.insurance_policies.len(), 2);
        assert_eq!(decoded.insurance_policies[1].value(PolicyField::Insurer), "Acme");
        assert_eq!(decoded.insurance_policies[1].value(PolicyField::Status), "");
    }

    #[test]
    fn test_decode_keeps_records_before_truncated_policy() {
        let mut data = full();
        data.personal_info = PersonalInfo::new();
        data.insurance_policies.truncate(1);
        data.insurance_policies[0].insert(PolicyField::Insurer, "Acme");
        let message = encode_records(&build_records(&data, VCARD_MIME_TYPE)).unwrap();
        let cut = &message[..message.len() - 4];

        assert_eq!(decode_records(cut).len(), 3);
        let decoded = decode(cut);
        assert_eq!(decoded.vcard_url, data.vcard_url);
        assert_eq!(decoded.emergency_contact.value(EmergencyField::Name), "Ravi");
        assert_eq!(decoded.emergency_contact.value(EmergencyField::Mobile), "+911234");
        assert_eq!(decoded.insurance_policies.len(), 1);
        assert_eq!(decoded.insurance_policies[0].value(PolicyField::Insurer), "Acme");
    }

    #[test]
    fn test_decode_garbage_is_empty() {
        assert!(decode(&[0x00, 0x00]).is_empty());
        assert!(decode(&[0xFF]).is_empty());
    }
}
