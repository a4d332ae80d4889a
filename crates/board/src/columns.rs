use std::collections::BTreeMap;

use avoda_sync_core::{
    NormalizedRecord, RecordKind,
    models::{FieldValue, full_name},
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ColumnKind {
    Text,
    Numeric,
    Phone,
    Date,
    Label,
    /// Email columns take the plain address.
    Email,
}

/// A board column fed from one normalized field.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub id: &'static str,
    pub field: &'static str,
    pub kind: ColumnKind,
}

const fn column(id: &'static str, field: &'static str, kind: ColumnKind) -> Column {
    Column { id, field, kind }
}

pub const JOB_COLUMNS: &[Column] = &[
    column("text_mkq8p89b", "id", ColumnKind::Text),
    column("text_mknf8xdn", "name", ColumnKind::Text),
    column("text_mknf15z0", "workplace", ColumnKind::Text),
    column("phone_mknfj7z1", "phone", ColumnKind::Phone),
    column("text_mkq81xpz", "createdAt", ColumnKind::Text),
    column("date_mknfazz8", "airsAt", ColumnKind::Date),
    column("numeric_mknfhe4v", "jobsMannedAmount", ColumnKind::Numeric),
    column("numeric_mknffhqf", "minimumAge", ColumnKind::Numeric),
    column("numeric_mknfr56m", "hourlyRate", ColumnKind::Numeric),
    column("text_mknf6c64", "contactFirstName", ColumnKind::Text),
    column("text_mknfn83d", "contactLastName", ColumnKind::Text),
    column("numeric_mknfpgfc", "whatsappApplications", ColumnKind::Numeric),
    column("numeric_mkq8n6jr", "phoneApplications", ColumnKind::Numeric),
    column("numeric_mknf482k", "uniqueApplications", ColumnKind::Numeric),
    column("date_mknf3924", "endTime", ColumnKind::Date),
    column("text_mkq83nne", "address", ColumnKind::Text),
    column("text_mkq89cxm", "area", ColumnKind::Text),
    column("text_mknfzhyw", "requirements", ColumnKind::Text),
    column("text_mknfg5r9", "description", ColumnKind::Text),
    column("text_mknfzh0m", "employerId", ColumnKind::Text),
];

pub const EMPLOYER_COLUMNS: &[Column] = &[
    column("text_mkqcc626", "id", ColumnKind::Text),
    column("text_mknxwg7x", "firstName", ColumnKind::Text),
    column("text_mknxkn77", "lastName", ColumnKind::Text),
    column("phone_mkq85bdr", "phone", ColumnKind::Phone),
    column("date_mknf7w5k", "createdAt", ColumnKind::Date),
    column("text_mkqax1wa", "businessName", ColumnKind::Text),
    column("text_mknfq7yw", "businessId", ColumnKind::Text),
    column("email_mknx1jzw", "email", ColumnKind::Email),
    column("color_mknxqf9h", "isConfirmed", ColumnKind::Label),
    column("color_mknw5117", "hasActiveJobListing", ColumnKind::Label),
    column("text_mknwvns7", "address", ColumnKind::Text),
    column("date_mkqamv44", "lastActivity", ColumnKind::Date),
    column("text_mkqcezmy", "businessBranch", ColumnKind::Text),
    column("color_mkqadg1s", "isArchived", ColumnKind::Label),
];

pub fn columns_for(kind: RecordKind) -> &'static [Column] {
    match kind {
        RecordKind::Jobs => JOB_COLUMNS,
        RecordKind::Employers => EMPLOYER_COLUMNS,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Text(String),
    Number(f64),
    Phone {
        phone: String,
        #[serde(rename = "countryShortName")]
        country_short_name: String,
    },
    Date {
        date: String,
    },
    Label {
        label: String,
    },
}

pub type ColumnValues = BTreeMap<&'static str, ColumnValue>;

#[derive(Debug, Clone)]
pub struct ColumnOptions {
    /// `countryShortName` sent with phone numbers.
    pub country_code: String,
    /// Item name for job listings without a name.
    pub default_job_name: String,
}

impl Default for ColumnOptions {
    fn default() -> Self {
        Self { country_code: "IL".to_string(), default_job_name: "משרה חדשה".to_string() }
    }
}

/// Name and column values for one board item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemPayload {
    pub name: String,
    pub columns: ColumnValues,
}

impl ItemPayload {
    pub fn from_record(record: &NormalizedRecord, options: &ColumnOptions) -> Self {
        let columns = columns_for(record.kind())
            .iter()
            .filter_map(|column| {
                let value = record.get(column.field).unwrap_or(&FieldValue::Null);
                encode(column.kind, value, options).map(|encoded| (column.id, encoded))
            })
            .collect();
        Self { name: item_name(record, options), columns }
    }
}

pub fn item_name(record: &NormalizedRecord, options: &ColumnOptions) -> String {
    match record.kind() {
        RecordKind::Jobs => match record.text("name").map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => options.default_job_name.clone(),
        },
        RecordKind::Employers => full_name(record.text("firstName"), record.text("lastName")),
    }
}

// Null values are left out of the payload entirely; labels always carry a value.
fn encode(kind: ColumnKind, value: &FieldValue, options: &ColumnOptions) -> Option<ColumnValue> {
    let text = match (kind, value) {
        (ColumnKind::Label, value) => {
            let label = value.as_bool().unwrap_or(false).to_string();
            return Some(ColumnValue::Label { label });
        }
        (_, FieldValue::Null) => return None,
        (ColumnKind::Numeric, FieldValue::Number(n)) => return Some(ColumnValue::Number(*n)),
        (_, FieldValue::Text(s)) => s.clone(),
        (_, FieldValue::Number(n)) => n.to_string(),
        (_, FieldValue::Bool(b)) => b.to_string(),
    };
    Some(match kind {
        ColumnKind::Phone => {
            ColumnValue::Phone { phone: text, country_short_name: options.country_code.clone() }
        }
        ColumnKind::Date => ColumnValue::Date { date: text },
        _ => ColumnValue::Text(text),
    })
}
