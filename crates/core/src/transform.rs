use serde_json::Value;

use crate::{
    models::{EmployerRecord, FieldValue, JobRecord, NormalizedRecord, RemoteRecord},
    util::date_only,
};

/// Map a remote record onto the flat field set for its kind.
///
/// Never fails: any absent value, nested or not, becomes [`FieldValue::Null`].
pub fn normalize(record: &RemoteRecord) -> NormalizedRecord {
    match record {
        RemoteRecord::Job(job) => normalize_job(job),
        RemoteRecord::Employer(employer) => normalize_employer(employer),
    }
}

pub fn normalize_job(job: &JobRecord) -> NormalizedRecord {
    let owner = job.business.as_ref().and_then(|b| b.owner.as_ref());
    NormalizedRecord::job([
        job.id.clone().into(),
        job.name.clone().into(),
        job.workplace.clone().into(),
        job.phone.clone().into(),
        job.whatsapp.clone().into(),
        date(&job.created_at),
        date(&job.airs_at),
        job.jobs_manned_amount.into(),
        job.minimum_age.into(),
        job.hourly_rate.into(),
        owner.and_then(|o| o.first_name.as_deref()).into(),
        owner.and_then(|o| o.last_name.as_deref()).into(),
        job.total_whatsapp_applications.into(),
        job.total_phone_applications.into(),
        job.unique_applications.into(),
        date(&job.end_time),
        job.addresses.as_ref().and_then(|a| a.first()).map_or(FieldValue::Null, address),
        job.area.as_ref().and_then(|a| a.name.as_deref()).into(),
        job.requirements.clone().into(),
        job.description.clone().into(),
        owner.and_then(|o| o.id.as_deref()).into(),
    ])
}

pub fn normalize_employer(employer: &EmployerRecord) -> NormalizedRecord {
    let business = employer.business.as_ref();
    NormalizedRecord::employer([
        employer.id.clone().into(),
        employer.first_name.clone().into(),
        employer.last_name.clone().into(),
        employer.phone.clone().into(),
        employer.address.clone().into(),
        employer.email.clone().into(),
        date(&employer.created_at),
        date(&employer.last_activity),
        employer.is_confirmed.unwrap_or(false).into(),
        employer.has_active_job_listing.unwrap_or(false).into(),
        employer.is_archived.unwrap_or(false).into(),
        business.and_then(|b| b.id.as_deref()).into(),
        business.and_then(|b| b.name.as_deref()).into(),
        business.and_then(|b| b.branch.as_ref()).and_then(|b| b.name.as_deref()).into(),
    ])
}

fn date(value: &Option<String>) -> FieldValue {
    value.as_deref().filter(|s| !s.is_empty()).map(date_only).into()
}

// Addresses are usually plain strings; structured ones are kept as their JSON text.
fn address(value: &Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Null,
        Value::String(s) => FieldValue::Text(s.clone()),
        other => FieldValue::Text(other.to_string()),
    }
}
