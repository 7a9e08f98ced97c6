//! NDEF record codec and the structured data carried on a carecard tag.
//!
//! A tag holds one NDEF message made of up to four kinds of records:
//! - a URI record pointing at the holder's online vCard
//! - a MIME `text/vcard` record with personal details
//! - a Text record with the emergency contact
//! - one Text record per insurance policy
//!
//! [`decode`] turns a raw message into [`StructuredTagData`];
//! [`build_records`] and [`encode_records`] go the other way.

pub mod codec;
pub mod content;
pub mod error;
pub mod message;
pub mod model;
pub mod record;
pub mod text;
pub mod uri;
pub mod vcard;

pub use codec::{decode_records, encode_message};
pub use content::TagRecord;
pub use error::{NdefError, Result};
pub use message::{build_records, decode, encode_records};
pub use model::{
    EmergencyContact, EmergencyField, FieldKey, Fields, PersonalField, PersonalInfo, Policy,
    PolicyField, StructuredTagData,
};
pub use record::{NdefRecord, Tnf};
