use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "location_type", rename_all = "snake_case")]
pub enum LocationType {
    #[default]
    Onsite,
    Remote,
    Hybrid,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "application_status", rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[default]
    Applied,
    InProgress,
    Accepted,
    Rejected,
    Ghosted,
}

/// Job application record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct JobApplication {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub company_name: String,
    pub job_title: String,
    pub job_url: String,
    pub location_type: LocationType,
    pub status: ApplicationStatus,
    pub referral: bool,
    #[serde(with = "iso_date::option")]
    pub date_applied: Option<Date>,
    pub notes: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Validated mutable fields, as accepted by insert/update/upsert. Owner
/// and timestamps are never part of this: the owner comes from the
/// authenticated caller, timestamps from the database.
#[derive(Debug, Clone)]
pub struct JobFields {
    pub company_name: String,
    pub job_title: String,
    pub job_url: String,
    pub location_type: LocationType,
    pub status: ApplicationStatus,
    pub referral: bool,
    pub date_applied: Option<Date>,
    pub notes: String,
}

/// Partial update: `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub job_url: Option<String>,
    pub location_type: Option<LocationType>,
    pub status: Option<ApplicationStatus>,
    pub referral: Option<bool>,
    pub date_applied: Option<Date>,
    pub notes: Option<String>,
}

/// Allowed list orderings. Kept as a closed enum so the ORDER BY clause
/// is always one of these fixed strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JobOrdering {
    #[default]
    DateAppliedDesc,
    DateAppliedAsc,
    CreatedAtDesc,
    CreatedAtAsc,
}

impl JobOrdering {
    /// Parses the `ordering` query parameter, DRF style: a field name
    /// with an optional leading `-` for descending.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "date_applied" => Some(JobOrdering::DateAppliedAsc),
            "-date_applied" => Some(JobOrdering::DateAppliedDesc),
            "created_at" => Some(JobOrdering::CreatedAtAsc),
            "-created_at" => Some(JobOrdering::CreatedAtDesc),
            _ => None,
        }
    }

    fn order_clause(self) -> &'static str {
        match self {
            JobOrdering::DateAppliedDesc => "date_applied DESC, created_at DESC",
            JobOrdering::DateAppliedAsc => "date_applied ASC, created_at ASC",
            JobOrdering::CreatedAtDesc => "created_at DESC",
            JobOrdering::CreatedAtAsc => "created_at ASC",
        }
    }
}

const JOB_COLUMNS: &str = "id, user_id, company_name, job_title, job_url, \
     location_type, status, referral, date_applied, notes, created_at, updated_at";

fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// True when the error is the database rejecting a duplicate
/// (user, job_url) pair.
pub fn is_unique_violation(e: &anyhow::Error) -> bool {
    e.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

#[derive(FromRow)]
struct UpsertedRow {
    #[sqlx(flatten)]
    job: JobApplication,
    was_created: bool,
}

impl JobApplication {
    pub async fn list_for_user(
        db: &PgPool,
        user_id: Uuid,
        search: Option<&str>,
        ordering: JobOrdering,
    ) -> anyhow::Result<Vec<JobApplication>> {
        let rows = match search {
            Some(term) => {
                let sql = format!(
                    "SELECT {JOB_COLUMNS} FROM job_applications \
                     WHERE user_id = $1 AND (company_name ILIKE $2 OR job_title ILIKE $2) \
                     ORDER BY {}",
                    ordering.order_clause()
                );
                sqlx::query_as::<_, JobApplication>(&sql)
                    .bind(user_id)
                    .bind(like_pattern(term))
                    .fetch_all(db)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {JOB_COLUMNS} FROM job_applications \
                     WHERE user_id = $1 ORDER BY {}",
                    ordering.order_clause()
                );
                sqlx::query_as::<_, JobApplication>(&sql)
                    .bind(user_id)
                    .fetch_all(db)
                    .await?
            }
        };
        Ok(rows)
    }

    pub async fn find(
        db: &PgPool,
        user_id: Uuid,
        id: Uuid,
    ) -> anyhow::Result<Option<JobApplication>> {
        let job = sqlx::query_as::<_, JobApplication>(&format!(
            "SELECT {JOB_COLUMNS} FROM job_applications WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(job)
    }

    pub async fn insert(
        db: &PgPool,
        user_id: Uuid,
        fields: &JobFields,
    ) -> anyhow::Result<JobApplication> {
        let job = sqlx::query_as::<_, JobApplication>(&format!(
            "INSERT INTO job_applications \
                 (user_id, company_name, job_title, job_url, location_type, \
                  status, referral, date_applied, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&fields.company_name)
        .bind(&fields.job_title)
        .bind(&fields.job_url)
        .bind(fields.location_type)
        .bind(fields.status)
        .bind(fields.referral)
        .bind(fields.date_applied)
        .bind(&fields.notes)
        .fetch_one(db)
        .await?;
        Ok(job)
    }

    /// Create-or-overwrite keyed by (user, job_url), as a single atomic
    /// statement. `xmax = 0` distinguishes a fresh insert from a
    /// conflict-update on the returned row.
    pub async fn upsert(
        db: &PgPool,
        user_id: Uuid,
        fields: &JobFields,
    ) -> anyhow::Result<(JobApplication, bool)> {
        let row = sqlx::query_as::<_, UpsertedRow>(&format!(
            "INSERT INTO job_applications \
                 (user_id, company_name, job_title, job_url, location_type, \
                  status, referral, date_applied, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (user_id, job_url) DO UPDATE SET \
                 company_name = EXCLUDED.company_name, \
                 job_title = EXCLUDED.job_title, \
                 location_type = EXCLUDED.location_type, \
                 status = EXCLUDED.status, \
                 referral = EXCLUDED.referral, \
                 date_applied = EXCLUDED.date_applied, \
                 notes = EXCLUDED.notes, \
                 updated_at = now() \
             RETURNING {JOB_COLUMNS}, (xmax = 0) AS was_created"
        ))
        .bind(user_id)
        .bind(&fields.company_name)
        .bind(&fields.job_title)
        .bind(&fields.job_url)
        .bind(fields.location_type)
        .bind(fields.status)
        .bind(fields.referral)
        .bind(fields.date_applied)
        .bind(&fields.notes)
        .fetch_one(db)
        .await?;
        Ok((row.job, row.was_created))
    }

    pub async fn update_full(
        db: &PgPool,
        user_id: Uuid,
        id: Uuid,
        fields: &JobFields,
    ) -> anyhow::Result<Option<JobApplication>> {
        let job = sqlx::query_as::<_, JobApplication>(&format!(
            "UPDATE job_applications SET \
                 company_name = $3, \
                 job_title = $4, \
                 job_url = $5, \
                 location_type = $6, \
                 status = $7, \
                 referral = $8, \
                 date_applied = $9, \
                 notes = $10, \
                 updated_at = now() \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .bind(&fields.company_name)
        .bind(&fields.job_title)
        .bind(&fields.job_url)
        .bind(fields.location_type)
        .bind(fields.status)
        .bind(fields.referral)
        .bind(fields.date_applied)
        .bind(&fields.notes)
        .fetch_optional(db)
        .await?;
        Ok(job)
    }

    pub async fn update_partial(
        db: &PgPool,
        user_id: Uuid,
        id: Uuid,
        patch: &JobPatch,
    ) -> anyhow::Result<Option<JobApplication>> {
        let job = sqlx::query_as::<_, JobApplication>(&format!(
            "UPDATE job_applications SET \
                 company_name = COALESCE($3, company_name), \
                 job_title = COALESCE($4, job_title), \
                 job_url = COALESCE($5, job_url), \
                 location_type = COALESCE($6, location_type), \
                 status = COALESCE($7, status), \
                 referral = COALESCE($8, referral), \
                 date_applied = COALESCE($9, date_applied), \
                 notes = COALESCE($10, notes), \
                 updated_at = now() \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .bind(&patch.company_name)
        .bind(&patch.job_title)
        .bind(&patch.job_url)
        .bind(patch.location_type)
        .bind(patch.status)
        .bind(patch.referral)
        .bind(patch.date_applied)
        .bind(&patch.notes)
        .fetch_optional(db)
        .await?;
        Ok(job)
    }

    pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM job_applications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn ordering_parses_the_allow_list_only() {
        assert_eq!(
            JobOrdering::parse("-date_applied"),
            Some(JobOrdering::DateAppliedDesc)
        );
        assert_eq!(
            JobOrdering::parse("created_at"),
            Some(JobOrdering::CreatedAtAsc)
        );
        assert_eq!(JobOrdering::parse("job_title"), None);
        assert_eq!(JobOrdering::parse("date_applied; DROP TABLE users"), None);
    }

    #[test]
    fn default_ordering_is_most_recent_first() {
        assert_eq!(
            JobOrdering::default().order_clause(),
            "date_applied DESC, created_at DESC"
        );
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_raise"), "%50\\%\\_raise%");
        assert_eq!(like_pattern("acme"), "%acme%");
    }

    #[test]
    fn job_serializes_without_owner_and_with_plain_dates() {
        let job = JobApplication {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            company_name: "Acme".into(),
            job_title: "Eng".into(),
            job_url: "https://acme.example/careers/1".into(),
            location_type: LocationType::Remote,
            status: ApplicationStatus::InProgress,
            referral: false,
            date_applied: Some(date!(2024 - 03 - 01)),
            notes: String::new(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_value(&job).unwrap();
        assert!(json.get("user_id").is_none());
        assert_eq!(json["date_applied"], "2024-03-01");
        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["location_type"], "remote");
        assert_eq!(json["created_at"], "1970-01-01T00:00:00Z");
    }
}
