use serde::Deserialize;
use time::Date;
use url::Url;

use crate::error::ApiError;
use crate::jobs::repo::{ApplicationStatus, JobFields, JobPatch, LocationType};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Query parameters for the list endpoint.
#[derive(Debug, Deserialize)]
pub struct JobListQuery {
    pub search: Option<String>,
    pub ordering: Option<String>,
}

/// Body for create (POST) and full update (PUT). Required text fields
/// default to empty so their absence surfaces as a field-level 400
/// instead of a body rejection.
#[derive(Debug, Deserialize)]
pub struct JobWriteRequest {
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub job_url: String,
    #[serde(default)]
    pub location_type: LocationType,
    #[serde(default)]
    pub status: ApplicationStatus,
    #[serde(default)]
    pub referral: bool,
    #[serde(default, with = "iso_date::option")]
    pub date_applied: Option<Date>,
    #[serde(default)]
    pub notes: String,
}

/// Body for partial update (PATCH); absent fields keep stored values.
#[derive(Debug, Deserialize)]
pub struct JobPatchRequest {
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub job_url: Option<String>,
    pub location_type: Option<LocationType>,
    pub status: Option<ApplicationStatus>,
    pub referral: Option<bool>,
    #[serde(default, with = "iso_date::option")]
    pub date_applied: Option<Date>,
    pub notes: Option<String>,
}

pub(crate) fn require_trimmed(field: &'static str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(field, "This field may not be blank."));
    }
    Ok(trimmed.to_string())
}

/// The URL must be absolute and resolvable by a browser, i.e. http(s)
/// with a host.
pub(crate) fn validate_job_url(raw: &str) -> Result<String, ApiError> {
    let trimmed = require_trimmed("job_url", raw)?;
    let parsed =
        Url::parse(&trimmed).map_err(|_| ApiError::validation("job_url", "Enter a valid URL."))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ApiError::validation("job_url", "Enter a valid URL."));
    }
    Ok(trimmed)
}

impl JobWriteRequest {
    /// Validates required fields, first failure wins: job_url, then
    /// job_title, then company_name.
    pub fn into_fields(self) -> Result<JobFields, ApiError> {
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
            date_applied: self.date_applied,
            notes: self.notes,
        })
    }
}

impl JobPatchRequest {
    /// Validates only the fields the client actually sent.
    pub fn into_patch(self) -> Result<JobPatch, ApiError> {
        let job_url = self.job_url.as_deref().map(validate_job_url).transpose()?;
        let job_title = self
            .job_title
            .as_deref()
            .map(|v| require_trimmed("job_title", v))
            .transpose()?;
        let company_name = self
            .company_name
            .as_deref()
            .map(|v| require_trimmed("company_name", v))
            .transpose()?;
        Ok(JobPatch {
            company_name,
            job_title,
            job_url,
            location_type: self.location_type,
            status: self.status,
            referral: self.referral,
            date_applied: self.date_applied,
            notes: self.notes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crud_defaults_are_onsite_and_applied() {
        let req: JobWriteRequest = serde_json::from_value(serde_json::json!({
            "company_name": "Acme",
            "job_title": "Engineer",
            "job_url": "https://acme.example/jobs/1"
        }))
        .unwrap();
        assert_eq!(req.location_type, LocationType::Onsite);
        assert_eq!(req.status, ApplicationStatus::Applied);
        assert!(!req.referral);
        assert!(req.date_applied.is_none());

        let fields = req.into_fields().expect("valid request");
        assert_eq!(fields.company_name, "Acme");
    }

    #[test]
    fn write_request_trims_whitespace() {
        let req: JobWriteRequest = serde_json::from_value(serde_json::json!({
            "company_name": "  Acme  ",
            "job_title": "\tEngineer\n",
            "job_url": " https://acme.example/jobs/1 "
        }))
        .unwrap();
        let fields = req.into_fields().unwrap();
        assert_eq!(fields.company_name, "Acme");
        assert_eq!(fields.job_title, "Engineer");
        assert_eq!(fields.job_url, "https://acme.example/jobs/1");
    }

    #[test]
    fn blank_required_field_names_itself() {
        let req: JobWriteRequest = serde_json::from_value(serde_json::json!({
            "company_name": "   ",
            "job_title": "Engineer",
            "job_url": "https://acme.example/jobs/1"
        }))
        .unwrap();
        match req.into_fields() {
            Err(ApiError::Validation { field, .. }) => assert_eq!(field, "company_name"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn job_url_is_checked_before_other_fields() {
        // Everything blank: the url error must win.
        let req: JobWriteRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        match req.into_fields() {
            Err(ApiError::Validation { field, .. }) => assert_eq!(field, "job_url"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_and_relative_urls() {
        for bad in ["not-a-url", "ftp://acme.example/jobs", "/jobs/1", "javascript:alert(1)"] {
            match validate_job_url(bad) {
                Err(ApiError::Validation { field, .. }) => assert_eq!(field, "job_url"),
                other => panic!("{bad:?} should fail validation, got {other:?}"),
            }
        }
        assert!(validate_job_url("https://acme.example/jobs/1").is_ok());
        assert!(validate_job_url("http://localhost:8000/jobs/1").is_ok());
    }

    #[test]
    fn patch_validates_only_provided_fields() {
        let req: JobPatchRequest =
            serde_json::from_value(serde_json::json!({ "status": "ghosted" })).unwrap();
        let patch = req.into_patch().unwrap();
        assert_eq!(patch.status, Some(ApplicationStatus::Ghosted));
        assert!(patch.company_name.is_none());

        let req: JobPatchRequest =
            serde_json::from_value(serde_json::json!({ "job_url": "nope" })).unwrap();
        assert!(req.into_patch().is_err());
    }
}
