use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize, ser::SerializeMap};
use serde_json::Value;

use crate::util::{lenient_bool, lenient_number, lenient_string};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Jobs,
    Employers,
}

impl RecordKind {
    pub const fn variants() -> &'static [Self] { &[Self::Jobs, Self::Employers] }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jobs => "jobs",
            Self::Employers => "employers",
        }
    }
}

impl FromStr for RecordKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jobs" => Ok(Self::Jobs),
            "employers" => Ok(Self::Employers),
            _ => Err(()),
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// A remote collection together with the fixed filters used to page through it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Collection {
    Jobs(JobFilters),
    Employers,
}

impl Collection {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Jobs(_) => RecordKind::Jobs,
            Self::Employers => RecordKind::Employers,
        }
    }
}

impl From<RecordKind> for Collection {
    fn from(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Jobs => Self::Jobs(JobFilters::default()),
            RecordKind::Employers => Self::Employers,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct JobFilters {
    pub is_blocked: bool,
    pub approval_status: String,
}

impl Default for JobFilters {
    fn default() -> Self { Self { is_blocked: false, approval_status: "APPROVED".to_string() } }
}

/// A job listing as returned by the remote API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub workplace: Option<String>,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub created_at: Option<String>,
    pub airs_at: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub jobs_manned_amount: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub minimum_age: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub hourly_rate: Option<f64>,
    pub business: Option<JobBusiness>,
    #[serde(deserialize_with = "lenient_number")]
    pub total_whatsapp_applications: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub total_phone_applications: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub unique_applications: Option<f64>,
    pub end_time: Option<String>,
    pub addresses: Option<Vec<Value>>,
    pub area: Option<Area>,
    pub requirements: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobBusiness {
    pub owner: Option<BusinessOwner>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BusinessOwner {
    #[serde(deserialize_with = "lenient_string")]
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Area {
    #[serde(deserialize_with = "lenient_string")]
    pub id: Option<String>,
    pub name: Option<String>,
}

/// An employer user as returned by the remote API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmployerRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub created_at: Option<String>,
    pub last_activity: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_confirmed: Option<bool>,
    #[serde(deserialize_with = "lenient_bool")]
    pub has_active_job_listing: Option<bool>,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_archived: Option<bool>,
    pub business: Option<EmployerBusiness>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmployerBusiness {
    #[serde(deserialize_with = "lenient_string")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub branch: Option<Branch>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Branch {
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RemoteRecord {
    Job(JobRecord),
    Employer(EmployerRecord),
}

impl RemoteRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Job(_) => RecordKind::Jobs,
            Self::Employer(_) => RecordKind::Employers,
        }
    }

    /// Human-readable name shown while a fetch is in progress.
    pub fn label(&self) -> String {
        match self {
            Self::Job(job) => job.name.clone().unwrap_or_default(),
            Self::Employer(employer) => {
                full_name(employer.first_name.as_deref(), employer.last_name.as_deref())
            }
        }
    }
}

pub fn full_name(first: Option<&str>, last: Option<&str>) -> String {
    format!("{} {}", first.unwrap_or_default(), last.unwrap_or_default()).trim().to_string()
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Null,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl FieldValue {
    pub fn is_null(&self) -> bool { matches!(self, Self::Null) }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self { value.map_or(Self::Null, Self::Text) }
}

impl From<Option<&str>> for FieldValue {
    fn from(value: Option<&str>) -> Self { value.map_or(Self::Null, |s| Self::Text(s.to_string())) }
}

impl From<Option<f64>> for FieldValue {
    fn from(value: Option<f64>) -> Self { value.map_or(Self::Null, Self::Number) }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self { Self::Bool(value) }
}

impl Serialize for FieldValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Bool(b) => serializer.serialize_bool(*b),
        }
    }
}

pub const JOB_FIELDS: [&str; 21] = [
    "id",
    "name",
    "workplace",
    "phone",
    "whatsapp",
    "createdAt",
    "airsAt",
    "jobsMannedAmount",
    "minimumAge",
    "hourlyRate",
    "contactFirstName",
    "contactLastName",
    "whatsappApplications",
    "phoneApplications",
    "uniqueApplications",
    "endTime",
    "address",
    "area",
    "requirements",
    "description",
    "employerId",
];

pub const EMPLOYER_FIELDS: [&str; 14] = [
    "id",
    "firstName",
    "lastName",
    "phone",
    "address",
    "email",
    "createdAt",
    "lastActivity",
    "isConfirmed",
    "hasActiveJobListing",
    "isArchived",
    "businessId",
    "businessName",
    "businessBranch",
];

/// Flat field set produced from one remote record.
///
/// Always carries every field of its kind's schema, in schema order; absent values are
/// [`FieldValue::Null`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    kind: RecordKind,
    fields: Vec<(&'static str, FieldValue)>,
}

impl NormalizedRecord {
    pub fn job(values: [FieldValue; JOB_FIELDS.len()]) -> Self {
        Self { kind: RecordKind::Jobs, fields: JOB_FIELDS.into_iter().zip(values).collect() }
    }

    pub fn employer(values: [FieldValue; EMPLOYER_FIELDS.len()]) -> Self {
        Self {
            kind: RecordKind::Employers,
            fields: EMPLOYER_FIELDS.into_iter().zip(values).collect(),
        }
    }

    pub fn kind(&self) -> RecordKind { self.kind }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn text(&self, key: &str) -> Option<&str> { self.get(key).and_then(FieldValue::as_str) }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (*k, v))
    }
}

impl Serialize for NormalizedRecord {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
