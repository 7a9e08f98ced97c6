//! Reconciling tag policies with a remote policy set.
//!
//! Sync is one-directional per call: [`compare`] reports what differs,
//! [`fold_remote_only`] adds missing policies to the tag data, and
//! [`tag_only_policies`] lists what the remote side lacks. Field-level
//! differences are reported but never written back.
//!
//! [`TagPipeline::sync_remote_to_tag`] does the tag half and hands the
//! upload half back in its [`SyncOutcome`].

use std::collections::HashSet;

use carecard_ndef::{
    FieldKey, PersonalField, PersonalInfo, Policy, PolicyField, StructuredTagData,
};
use carecard_transport::TagTransport;
use serde::Serialize;
use tracing::info;

use crate::pipeline::TagPipeline;
use crate::retry::Delay;
use crate::write::WriteOutcome;

/// Policy fields compared between matching tag and remote policies.
pub const COMPARED_FIELDS: [PolicyField; 3] =
    [PolicyField::Status, PolicyField::Insurer, PolicyField::Premium];

/// One field that differs between the tag and remote copy of a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDifference {
    pub policy_number: String,
    #[serde(serialize_with = "serialize_label")]
    pub field: PolicyField,
    pub tag_value: Option<String>,
    pub remote_value: Option<String>,
}

fn serialize_label<S: serde::Serializer>(field: &PolicyField, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(field.label())
}

/// Outcome of [`compare`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// On the tag, missing remotely.
    pub tag_only: Vec<Policy>,
    /// Remote, missing from the tag.
    pub remote_only: Vec<Policy>,
    pub field_differences: Vec<FieldDifference>,
    pub needs_sync: bool,
}

/// The remote policy collaborator.
pub trait PolicySource {
    /// All policies, in source order.
    fn policies(&self) -> Vec<Policy>;

    /// Find a policy by number (trimmed, case-insensitive).
    fn lookup(&self, policy_number: &str) -> Option<Policy> {
        let wanted = policy_number.trim().to_lowercase();
        self.policies()
            .into_iter()
            .find(|policy| policy.identity().as_deref() == Some(wanted.as_str()))
    }
}

impl PolicySource for [Policy] {
    fn policies(&self) -> Vec<Policy> {
        self.to_vec()
    }
}

impl PolicySource for Vec<Policy> {
    fn policies(&self) -> Vec<Policy> {
        self.clone()
    }
}

fn identities(policies: &[Policy]) -> HashSet<String> {
    policies.iter().filter_map(Policy::identity).collect()
}

fn missing_from(policies: &[Policy], other: &HashSet<String>) -> Vec<Policy> {
    policies
        .iter()
        .filter(|policy| {
            policy
                .identity()
                .is_none_or(|identity| !other.contains(&identity))
        })
        .cloned()
        .collect()
}

/// Compare tag policies against remote policies by policy number.
///
/// Policies without a number never match anything.
pub fn compare(tag: &[Policy], remote: &[Policy]) -> SyncReport {
    compare_with_source(tag, remote)
}

/// [`compare`] against any [`PolicySource`]; matches go through
/// [`PolicySource::lookup`].
pub fn compare_with_source<S: PolicySource + ?Sized>(tag: &[Policy], source: &S) -> SyncReport {
    let remote = source.policies();
    let tag_ids = identities(tag);

    let tag_only = tag_only_policies(tag, &remote);
    let remote_only = missing_from(&remote, &tag_ids);

    let mut field_differences = Vec::new();
    for tag_policy in tag {
        let Some(identity) = tag_policy.identity() else {
            continue;
        };
        let Some(remote_policy) = source.lookup(&identity) else {
            continue;
        };

        for field in COMPARED_FIELDS {
            let tag_value = tag_policy.get(field);
            let remote_value = remote_policy.get(field);
            if tag_value != remote_value {
                field_differences.push(FieldDifference {
                    policy_number: tag_policy.value(PolicyField::PolicyNumber).trim().to_string(),
                    field,
                    tag_value: tag_value.map(str::to_string),
                    remote_value: remote_value.map(str::to_string),
                });
            }
        }
    }

    let needs_sync =
        !tag_only.is_empty() || !remote_only.is_empty() || !field_differences.is_empty();

    SyncReport {
        tag_only,
        remote_only,
        field_differences,
        needs_sync,
    }
}

/// Tag data with every remote-only policy appended, in remote order.
pub fn fold_remote_only(tag: &StructuredTagData, remote: &[Policy]) -> StructuredTagData {
    let tag_ids = identities(&tag.insurance_policies);
    let mut merged = tag.clone();
    merged
        .insurance_policies
        .extend(missing_from(remote, &tag_ids));
    merged
}

/// Tag policies the remote side does not have, for upload.
pub fn tag_only_policies(tag: &[Policy], remote: &[Policy]) -> Vec<Policy> {
    missing_from(tag, &identities(remote))
}

/// Profile URL derived from the email local-part, lowercased.
///
/// `None` when the email is missing or has an empty local-part.
pub fn derive_vcard_url(info: &PersonalInfo, base_url: &str) -> Option<String> {
    let email = info.get(PersonalField::Email)?;
    let local = email.split('@').next().unwrap_or_default().trim();
    if local.is_empty() {
        return None;
    }
    Some(format!("{base_url}{}", local.to_lowercase()))
}

/// The data to write for an incoming payload: taken as-is, plus a derived
/// profile URL when none was supplied.
pub fn merge_incoming(incoming: &StructuredTagData, base_url: &str) -> StructuredTagData {
    let mut merged = incoming.clone();
    if merged.vcard_url.as_deref().is_none_or(str::is_empty) {
        merged.vcard_url = derive_vcard_url(&incoming.personal_info, base_url);
    }
    merged
}

/// Result of [`TagPipeline::sync_remote_to_tag`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    #[serde(flatten)]
    pub write: WriteOutcome,
    /// Policies found only on the tag, for the caller to upload.
    pub tag_only: Vec<Policy>,
}

impl<D: Delay> TagPipeline<D> {
    /// Write `incoming` as the authoritative tag contents.
    ///
    /// What is already on the tag matters only to the ownership gate.
    pub fn merge_and_write<T: TagTransport + ?Sized>(
        &self,
        transport: &mut T,
        incoming: &StructuredTagData,
    ) -> WriteOutcome {
        let merged = merge_incoming(incoming, &self.config.write.vcard_base_url);
        info!(
            policies = merged.insurance_policies.len(),
            has_url = merged.vcard_url.is_some(),
            "merged data prepared"
        );
        self.write(transport, &merged)
    }

    /// Read the tag, add the remote-only policies and write the result back.
    ///
    /// Tag-only policies are left on the tag and returned in the outcome.
    pub fn sync_remote_to_tag<T, S>(
        &self,
        transport: &mut T,
        source: &S,
    ) -> crate::Result<SyncOutcome>
    where
        T: TagTransport + ?Sized,
        S: PolicySource + ?Sized,
    {
        let existing = self.read(transport)?;
        let remote = source.policies();
        let tag_only = tag_only_policies(&existing.insurance_policies, &remote);
        if !tag_only.is_empty() {
            info!(count = tag_only.len(), "tag holds policies the remote side lacks");
        }

        let merged = fold_remote_only(&existing, &remote);
        let write = self.merge_and_write(transport, &merged);
        Ok(SyncOutcome { write, tag_only })
    }
}
