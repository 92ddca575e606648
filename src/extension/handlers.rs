use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::{
    auth::extractors::AuthUser,
    error::ApiResult,
    extension::dto::{IngestJobRequest, IngestResponse},
    jobs::repo::JobApplication,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/extension/jobs/", post(ingest_job))
}

/// Create-or-update keyed by (caller, job_url). Saving the same posting
/// twice from the extension updates the existing record instead of
/// growing the list.
#[instrument(skip(state, payload))]
pub async fn ingest_job(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<IngestJobRequest>,
) -> ApiResult<(StatusCode, Json<IngestResponse>)> {
    let today = OffsetDateTime::now_utc().date();
    let fields = payload.into_fields(today)?;

    let (job, created) = JobApplication::upsert(&state.db, user_id, &fields).await?;

    info!(
        user_id = %user_id,
        job_id = %job.id,
        created,
        "extension job ingested"
    );
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(IngestResponse { created, job })))
}
