//! Structured tag contents.
//!
//! Field names double as the labels used on the tag (vCard fields and the
//! `Label: value` lines of the text templates) and as JSON keys. Incoming
//! JSON may also use camelCase aliases (`fullName`, `policyNumber`, ...).

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// A closed set of field names with a display label and a JSON alias.
pub trait FieldKey: Copy + Ord + fmt::Debug + 'static {
    /// Every key, in template order.
    const ALL: &'static [Self];

    /// The label written on the tag, e.g. `"Full Name"`.
    fn label(self) -> &'static str;

    /// The camelCase alias accepted from JSON, e.g. `"fullName"`.
    fn alias(self) -> &'static str;

    /// Look a key up by label or alias.
    fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|key| key.label() == name || key.alias() == name)
    }
}

macro_rules! field_key {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => ($label:literal, $alias:literal),)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $($variant,)+
        }

        impl FieldKey for $name {
            const ALL: &'static [Self] = &[$($name::$variant,)+];

            fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            fn alias(self) -> &'static str {
                match self {
                    $($name::$variant => $alias,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

field_key! {
    /// Personal details carried in the vCard record.
    pub enum PersonalField {
        FullName => ("Full Name", "fullName"),
        Phone => ("Phone", "phone"),
        Email => ("Email", "email"),
        Organization => ("Organization", "organization"),
        JobTitle => ("Job Title", "jobTitle"),
        Address => ("Address", "address"),
    }
}

field_key! {
    /// Lines of the emergency contact text record.
    pub enum EmergencyField {
        Name => ("Name", "name"),
        Mobile => ("Mobile", "mobile"),
        BloodGroup => ("Blood Group", "bloodGroup"),
        Location => ("Location", "location"),
        Relationship => ("Relationship", "relationship"),
    }
}

field_key! {
    /// Lines of an insurance policy text record.
    pub enum PolicyField {
        Policyholder => ("Policyholder", "policyholder"),
        Age => ("Age", "age"),
        Insurer => ("Insurer", "insurer"),
        PolicyType => ("Policy Type", "policyType"),
        Premium => ("Premium", "premium"),
        SumAssured => ("Sum Assured", "sumAssured"),
        PolicyStart => ("Policy Start", "policyStart"),
        PolicyEnd => ("Policy End", "policyEnd"),
        Status => ("Status", "status"),
        Contact => ("Contact", "contact"),
        Mobile => ("Mobile", "mobile"),
        PolicyNumber => ("Policy Number", "policyNumber"),
    }
}

/// A sparse map of string fields keyed by a [`FieldKey`] set.
///
/// Iteration follows key declaration order, which is also the order fields
/// are written to the tag.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Fields<K: FieldKey> {
    values: BTreeMap<K, String>,
}

pub type PersonalInfo = Fields<PersonalField>;
pub type EmergencyContact = Fields<EmergencyField>;
pub type Policy = Fields<PolicyField>;

impl<K: FieldKey> Fields<K> {
    pub fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: K) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    /// The value for `key`, or `""` when absent.
    pub fn value(&self, key: K) -> &str {
        self.get(key).unwrap_or("")
    }

    /// Whether `key` has a non-empty value.
    pub fn has(&self, key: K) -> bool {
        self.get(key).is_some_and(|value| !value.is_empty())
    }

    pub fn insert(&mut self, key: K, value: impl Into<String>) -> Option<String> {
        self.values.insert(key, value.into())
    }

    pub fn remove(&mut self, key: K) -> Option<String> {
        self.values.remove(&key)
    }

    pub fn with(mut self, key: K, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Overwrite fields with every field present in `other`.
    pub fn extend_from(&mut self, other: &Self) {
        for (key, value) in other.iter() {
            self.insert(key, value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &str)> + '_ {
        self.values.iter().map(|(key, value)| (*key, value.as_str()))
    }
}

impl<K: FieldKey> Default for Fields<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: FieldKey> fmt::Debug for Fields<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.values.iter().map(|(key, value)| (key.label(), value)))
            .finish()
    }
}

impl<K: FieldKey, V: Into<String>> FromIterator<(K, V)> for Fields<K> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(key, value)| (key, value.into()))
                .collect(),
        }
    }
}

impl Policy {
    /// The policy number used to match policies across sources:
    /// trimmed and lowercased, `None` when missing or blank.
    pub fn identity(&self) -> Option<String> {
        let number = self.get(PolicyField::PolicyNumber)?.trim();
        (!number.is_empty()).then(|| number.to_lowercase())
    }
}

impl<K: FieldKey> Serialize for Fields<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (key, value) in &self.values {
            map.serialize_entry(key.label(), value)?;
        }
        map.end()
    }
}

/// Scalar JSON values accepted as field values. Numbers and booleans come in
/// from upstream services (`"premium": 12000`) and are kept as text.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Scalar::Text(text) => text,
            Scalar::Integer(value) => value.to_string(),
            Scalar::Float(value) => value.to_string(),
            Scalar::Flag(value) => value.to_string(),
        }
    }
}

struct FieldsVisitor<K>(PhantomData<K>);

impl<'de, K: FieldKey> Visitor<'de> for FieldsVisitor<K> {
    type Value = Fields<K>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of field labels to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut fields = Fields::new();
        while let Some(name) = access.next_key::<String>()? {
            // Unknown keys (ids, timestamps, nested metadata) are ignored.
            let Some(key) = K::from_name(&name) else {
                access.next_value::<IgnoredAny>()?;
                continue;
            };
            if let Some(value) = access.next_value::<Option<Scalar>>()? {
                fields.insert(key, value.into_text());
            }
        }
        Ok(fields)
    }
}

impl<'de, K: FieldKey> Deserialize<'de> for Fields<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FieldsVisitor(PhantomData))
    }
}

/// Everything a tag can carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredTagData {
    #[serde(default)]
    pub personal_info: PersonalInfo,
    #[serde(default)]
    pub emergency_contact: EmergencyContact,
    #[serde(default)]
    pub insurance_policies: Vec<Policy>,
    #[serde(default, rename = "vCardUrl")]
    pub vcard_url: Option<String>,
}

impl StructuredTagData {
    /// True when there is nothing to write.
    pub fn is_empty(&self) -> bool {
        self.personal_info.is_empty()
            && self.emergency_contact.is_empty()
            && self.insurance_policies.is_empty()
            && self.vcard_url.as_deref().is_none_or(str::is_empty)
    }
}
