use serde::{Deserialize, Serialize};
use time::Date;

use crate::error::ApiError;
use crate::jobs::dto::{require_trimmed, validate_job_url};
use crate::jobs::repo::{ApplicationStatus, JobApplication, JobFields, LocationType};

/// Postings captured by the extension are overwhelmingly remote boards,
/// so the ingest path defaults differently from the CRUD form.
fn default_location() -> LocationType {
    LocationType::Remote
}

/// Body captured by the browser extension.
#[derive(Debug, Deserialize)]
pub struct IngestJobRequest {
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub job_url: String,
    #[serde(default = "default_location")]
    pub location_type: LocationType,
    #[serde(default)]
    pub status: ApplicationStatus,
    #[serde(default)]
    pub referral: bool,
    #[serde(default)]
    pub notes: String,
}

impl IngestJobRequest {
    /// Validates required fields, first failure wins: job_url, then
    /// job_title, then company_name. `date_applied` is stamped with the
    /// ingest date on both the create and the overwrite path.
    pub fn into_fields(self, today: Date) -> Result<JobFields, ApiError> {
        let job_url = validate_job_url(&self.job_url)?;
        let job_title = require_trimmed("job_title", &self.job_title)?;
        let company_name = require_trimmed("company_name", &self.company_name)?;
        Ok(JobFields {
            company_name,
            job_title,
            job_url,
            location_type: self.location_type,
            status: self.status,
            referral: self.referral,
            date_applied: Some(today),
            notes: self.notes,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub created: bool,
    pub job: JobApplication,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn body(v: serde_json::Value) -> IngestJobRequest {
        serde_json::from_value(v).expect("deserialize")
    }

    #[test]
    fn ingest_defaults_to_remote_and_applied() {
        let req = body(serde_json::json!({
            "company_name": "Acme",
            "job_title": "Eng",
            "job_url": "https://acme.example/jobs/1"
        }));
        assert_eq!(req.location_type, LocationType::Remote);
        assert_eq!(req.status, ApplicationStatus::Applied);
        assert!(!req.referral);
        assert_eq!(req.notes, "");
    }

    #[test]
    fn ingest_stamps_date_applied_with_today() {
        let req = body(serde_json::json!({
            "company_name": "Acme",
            "job_title": "Eng",
            "job_url": "https://acme.example/jobs/1"
        }));
        let fields = req.into_fields(date!(2024 - 02 - 29)).unwrap();
        assert_eq!(fields.date_applied, Some(date!(2024 - 02 - 29)));
    }

    #[test]
    fn first_invalid_field_wins_in_order() {
        // All three required fields blank: job_url reported first.
        let req = body(serde_json::json!({}));
        match req.into_fields(date!(2024 - 01 - 01)) {
            Err(ApiError::Validation { field, .. }) => assert_eq!(field, "job_url"),
            other => panic!("expected validation error, got {other:?}"),
        }

        // Valid url, blank title and company: job_title reported next.
        let req = body(serde_json::json!({ "job_url": "https://x.example/j/1" }));
        match req.into_fields(date!(2024 - 01 - 01)) {
            Err(ApiError::Validation { field, .. }) => assert_eq!(field, "job_title"),
            other => panic!("expected validation error, got {other:?}"),
        }

        // Only company blank.
        let req = body(serde_json::json!({
            "job_url": "https://x.example/j/1",
            "job_title": "Eng"
        }));
        match req.into_fields(date!(2024 - 01 - 01)) {
            Err(ApiError::Validation { field, .. }) => assert_eq!(field, "company_name"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn malformed_url_is_rejected() {
        let req = body(serde_json::json!({
            "company_name": "Acme",
            "job_title": "Eng",
            "job_url": "not-a-url"
        }));
        assert!(req.into_fields(date!(2024 - 01 - 01)).is_err());
    }
}
