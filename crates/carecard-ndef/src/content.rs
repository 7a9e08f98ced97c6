use tracing::{debug, warn};

use crate::model::{
    EmergencyContact, EmergencyField, FieldKey, PersonalInfo, Policy, PolicyField,
};
use crate::record::{NdefRecord, Tnf, RTD_TEXT, RTD_URI};
use crate::{text, uri, vcard};

/// First line of the emergency contact text record.
pub const EMERGENCY_HEADER: &str = "EMERGENCY CONTACT INFORMATION";
/// First line of an insurance policy text record.
pub const POLICY_HEADER: &str = "INSURANCE INFORMATION - POLICY";

const EMERGENCY_MARKER: &str = "EMERGENCY CONTACT";
const POLICY_MARKER: &str = "INSURANCE INFORMATION";

/// A record the tag layout understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagRecord {
    /// Link to the holder's online vCard.
    Uri(String),
    /// Personal details as a vCard MIME record.
    VCard {
        mime_type: String,
        info: PersonalInfo,
    },
    EmergencyContact(EmergencyContact),
    Policy(Policy),
}

impl TagRecord {
    /// Classify a decoded record. Returns `None` for records that carry
    /// nothing we recognize.
    pub fn from_record(record: &NdefRecord) -> Option<Self> {
        if record.is_well_known(RTD_URI) {
            return Some(TagRecord::Uri(uri::decode_payload(&record.payload)));
        }

        if record.tnf == Tnf::Media && vcard::is_vcard_type(&record.type_str()) {
            let card = String::from_utf8_lossy(&record.payload);
            return Some(TagRecord::VCard {
                mime_type: record.type_str(),
                info: vcard::parse(&card),
            });
        }

        if record.is_well_known(RTD_TEXT) {
            let body = text::decode_payload(&record.payload);
            if body.contains(EMERGENCY_MARKER) {
                return Some(TagRecord::EmergencyContact(parse_emergency(&body)));
            }
            if body.contains(POLICY_MARKER) {
                let policy = parse_policy(&body);
                if policy.is_empty() {
                    warn!("policy record has no recognized fields, skipping");
                    return None;
                }
                return Some(TagRecord::Policy(policy));
            }
        }

        debug!(tnf = ?record.tnf, record_type = %record.type_str(), "unrecognized record");
        None
    }

    /// Build the NDEF record for this content.
    pub fn to_record(&self) -> NdefRecord {
        match self {
            TagRecord::Uri(target) => NdefRecord::uri(target),
            TagRecord::VCard { mime_type, info } => {
                NdefRecord::mime(mime_type, vcard::render(info).into_bytes())
            }
            TagRecord::EmergencyContact(contact) => NdefRecord::text(&render_emergency(contact)),
            TagRecord::Policy(policy) => NdefRecord::text(&render_policy(policy)),
        }
    }
}

/// Render a `HEADER`, blank line, then one `Label: value` line per field.
/// Every field is written, empty or not.
fn render_template<K: FieldKey>(header: &str, value: impl Fn(K) -> String) -> String {
    let mut out = String::from(header);
    out.push('\n');
    for &key in K::ALL {
        out.push('\n');
        out.push_str(key.label());
        out.push_str(": ");
        out.push_str(&value(key));
    }
    out
}

pub fn render_emergency(contact: &EmergencyContact) -> String {
    render_template::<EmergencyField>(EMERGENCY_HEADER, |key| contact.value(key).to_string())
}

pub fn render_policy(policy: &Policy) -> String {
    render_template::<PolicyField>(POLICY_HEADER, |key| policy.value(key).to_string())
}

fn lines(body: &str) -> impl Iterator<Item = &str> {
    body.split(['\r', '\n']).filter(|line| !line.is_empty())
}

fn after_colon(line: &str) -> Option<&str> {
    line.split_once(':').map(|(_, value)| value.trim())
}

/// Any line containing `Label:` sets that field to the text after the
/// line's first colon.
pub fn parse_emergency(body: &str) -> EmergencyContact {
    let mut contact = EmergencyContact::new();
    for line in lines(body) {
        for &field in EmergencyField::ALL {
            let tag = format!("{}:", field.label());
            if !line.contains(&tag) {
                continue;
            }
            if let Some(value) = after_colon(line) {
                contact.insert(field, value);
            }
        }
    }
    contact
}

/// Lines are `Key: value`; only exact known keys are kept.
pub fn parse_policy(body: &str) -> Policy {
    let mut policy = Policy::new();
    for line in lines(body) {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if let Some(&field) = PolicyField::ALL.iter().find(|field| field.label() == key) {
            policy.insert(field, value.trim());
        }
    }
    policy
}
