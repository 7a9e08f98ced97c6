//! The write pipeline and its ownership gate.
//!
//! A personalized tag may only be overwritten with data for the same
//! person. Before writing, the tag is read and its name, email and phone
//! are compared with the incoming data. A tag that cannot be read is
//! treated as blank.
//!
//! Ownership comes only from personal info. A tag holding nothing but
//! policies, emergency details or a profile URL has no owner yet, so any
//! writer may claim it and overwrite those records.

use std::fmt;

use carecard_ndef::{build_records, encode_records, PersonalField, PersonalInfo, StructuredTagData};
use carecard_tagfile::TagFileWriter;
use carecard_transport::TagTransport;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::pipeline::TagPipeline;
use crate::retry::Delay;

const ACCESS_DENIED_MESSAGE: &str =
    "Access Denied: This card belongs to a different user. Cannot write data.";
const NO_DATA_MESSAGE: &str = "No valid data to write";

/// How a write ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteStatus {
    Success,
    /// The tag belongs to someone else. Nothing was written.
    AccessDenied,
    /// There was nothing to write. The tag was not touched.
    NoData,
    /// Encoding or the tag exchange failed.
    Failed,
}

/// Result of a write, reported to the caller rather than raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteOutcome {
    pub status: WriteStatus,
    pub message: String,
    pub records_written: usize,
    pub bytes_written: usize,
}

impl WriteOutcome {
    fn new(status: WriteStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            records_written: 0,
            bytes_written: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == WriteStatus::Success
    }
}

/// Normalized identity fields used by the ownership gate.
///
/// Debug output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl Identity {
    /// Identity as stored on the tag. The phone keeps only digits and `+`.
    pub fn from_tag(info: &PersonalInfo) -> Self {
        Self {
            name: normalize_text(info.value(PersonalField::FullName)),
            email: normalize_text(info.value(PersonalField::Email)),
            phone: info
                .value(PersonalField::Phone)
                .trim()
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '+')
                .collect(),
        }
    }

    /// Identity from the data about to be written. The phone only loses
    /// whitespace, so `+1 (555) 010` will not match a tag's `+1555010`.
    pub fn from_incoming(info: &PersonalInfo) -> Self {
        Self {
            name: normalize_text(info.value(PersonalField::FullName)),
            email: normalize_text(info.value(PersonalField::Email)),
            phone: info
                .value(PersonalField::Phone)
                .trim()
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect(),
        }
    }

    /// Field-by-field comparison.
    pub fn compare(&self, other: &Identity) -> IdentityMatch {
        IdentityMatch {
            name: self.name == other.name,
            email: self.email == other.email,
            phone: self.phone == other.phone,
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("name", &format_args!("<redacted:{} chars>", self.name.chars().count()))
            .field("email", &format_args!("<redacted:{} chars>", self.email.chars().count()))
            .field("phone", &format_args!("<redacted:{} chars>", self.phone.chars().count()))
            .finish()
    }
}

fn normalize_text(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Which identity fields matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IdentityMatch {
    pub name: bool,
    pub email: bool,
    pub phone: bool,
}

impl IdentityMatch {
    pub fn all(self) -> bool {
        self.name && self.email && self.phone
    }
}

/// Verdict of the ownership gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipCheck {
    /// The tag has no personal info yet (or could not be read).
    FirstWrite,
    /// All three identity fields match.
    Confirmed,
    Denied(IdentityMatch),
}

impl OwnershipCheck {
    pub fn allows_write(self) -> bool {
        !matches!(self, OwnershipCheck::Denied(_))
    }
}

/// Decide whether `incoming` may overwrite `existing`.
pub fn check_ownership(
    existing: Option<&StructuredTagData>,
    incoming: &StructuredTagData,
) -> OwnershipCheck {
    let Some(existing) = existing.filter(|data| !data.personal_info.is_empty()) else {
        return OwnershipCheck::FirstWrite;
    };

    let matched = Identity::from_tag(&existing.personal_info)
        .compare(&Identity::from_incoming(&incoming.personal_info));
    if matched.all() {
        OwnershipCheck::Confirmed
    } else {
        OwnershipCheck::Denied(matched)
    }
}

impl<D: Delay> TagPipeline<D> {
    /// Write `data` to the tag if the ownership gate allows it.
    ///
    /// Never fails: denial, empty data and tag errors come back as a
    /// [`WriteOutcome`].
    pub fn write<T: TagTransport + ?Sized>(
        &self,
        transport: &mut T,
        data: &StructuredTagData,
    ) -> WriteOutcome {
        let records = build_records(data, &self.config.write.vcard_mime_type);
        if records.is_empty() {
            warn!("nothing to write");
            return WriteOutcome::new(WriteStatus::NoData, NO_DATA_MESSAGE);
        }

        self.delay.wait(self.config.write.pre_read_delay);
        let existing = match self.read(transport) {
            Ok(existing) => Some(existing),
            Err(err) => {
                info!(error = %err, "pre-write read failed, treating tag as blank");
                None
            }
        };

        match check_ownership(existing.as_ref(), data) {
            OwnershipCheck::FirstWrite => info!("first write to tag"),
            OwnershipCheck::Confirmed => info!("tag ownership confirmed"),
            OwnershipCheck::Denied(matched) => {
                warn!(
                    name = matched.name,
                    email = matched.email,
                    phone = matched.phone,
                    "tag belongs to a different user, write denied"
                );
                return WriteOutcome::new(WriteStatus::AccessDenied, ACCESS_DENIED_MESSAGE);
            }
        }

        let message = match encode_records(&records) {
            Ok(message) => message,
            Err(err) => {
                return WriteOutcome::new(WriteStatus::Failed, format!("Write failed: {err}"));
            }
        };

        let mut writer = TagFileWriter::with_config(&mut *transport, self.config.tag_file.clone());
        match writer.write_ndef(&message) {
            Ok(summary) => {
                info!(
                    records = records.len(),
                    bytes = summary.bytes_written,
                    "tag written"
                );
                WriteOutcome {
                    status: WriteStatus::Success,
                    message: format!("Successfully wrote {} records to card", records.len()),
                    records_written: records.len(),
                    bytes_written: summary.bytes_written,
                }
            }
            Err(err) => {
                warn!(error = %err, "tag write failed");
                WriteOutcome::new(WriteStatus::Failed, format!("Write failed: {err}"))
            }
        }
    }
}
