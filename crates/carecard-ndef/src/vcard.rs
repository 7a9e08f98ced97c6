//! Minimal vCard 3.0 rendering and parsing for [`PersonalInfo`].

use crate::model::{FieldKey, PersonalField, PersonalInfo};

/// MIME type of the vCard record.
pub const VCARD_MIME_TYPE: &str = "text/vcard";

fn property(field: PersonalField) -> &'static str {
    match field {
        PersonalField::FullName => "FN",
        PersonalField::Phone => "TEL",
        PersonalField::Email => "EMAIL",
        PersonalField::Organization => "ORG",
        PersonalField::JobTitle => "TITLE",
        PersonalField::Address => "ADR",
    }
}

/// Render personal info as a vCard, one line per non-empty field.
pub fn render(info: &PersonalInfo) -> String {
    let mut card = String::from("BEGIN:VCARD\nVERSION:3.0\n");
    for (field, value) in info.iter() {
        if value.is_empty() {
            continue;
        }
        card.push_str(property(field));
        card.push(':');
        card.push_str(value);
        card.push('\n');
    }
    card.push_str("END:VCARD\n");
    card
}

/// Parse the plain `PROP:value` lines we understand. Parameters
/// (`TEL;TYPE=CELL:`) and unknown properties are ignored.
pub fn parse(card: &str) -> PersonalInfo {
    let mut info = PersonalInfo::new();
    for line in card.split(['\r', '\n']).filter(|line| !line.is_empty()) {
        for &field in PersonalField::ALL {
            if let Some(value) = line
                .strip_prefix(property(field))
                .and_then(|rest| rest.strip_prefix(':'))
            {
                info.insert(field, value);
            }
        }
    }
    info
}

/// Whether a media type names a vCard (`text/vcard`, `text/x-vcard`).
pub fn is_vcard_type(media_type: &str) -> bool {
    media_type.contains("vcard")
}
