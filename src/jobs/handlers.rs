use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::{ApiError, ApiResult},
    jobs::dto::{JobListQuery, JobPatchRequest, JobWriteRequest},
    jobs::repo::{is_unique_violation, JobApplication, JobOrdering},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/jobs/", get(list_jobs).post(create_job))
        .route(
            "/api/jobs/:id/",
            get(get_job).put(put_job).patch(patch_job).delete(delete_job),
        )
}

fn duplicate_url_error() -> ApiError {
    ApiError::validation(
        "job_url",
        "A job application with this URL already exists.",
    )
}

#[instrument(skip(state))]
pub async fn list_jobs(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<JobListQuery>,
) -> ApiResult<Json<Vec<JobApplication>>> {
    let ordering = match q.ordering.as_deref() {
        None => JobOrdering::default(),
        Some(raw) => JobOrdering::parse(raw).ok_or_else(|| {
            ApiError::validation(
                "ordering",
                "Ordering must be one of: date_applied, -date_applied, created_at, -created_at.",
            )
        })?,
    };
    let search = q.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let jobs = JobApplication::list_for_user(&state.db, user_id, search, ordering).await?;
    Ok(Json(jobs))
}

#[instrument(skip(state, payload))]
pub async fn create_job(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<JobWriteRequest>,
) -> ApiResult<(StatusCode, Json<JobApplication>)> {
    // Owner is always the caller; a `user` field in the body is ignored
    // by deserialization, so ownership cannot be spoofed.
    let fields = payload.into_fields()?;

    match JobApplication::insert(&state.db, user_id, &fields).await {
        Ok(job) => {
            info!(user_id = %user_id, job_id = %job.id, "job application created");
            Ok((StatusCode::CREATED, Json(job)))
        }
        Err(e) if is_unique_violation(&e) => {
            warn!(user_id = %user_id, job_url = %fields.job_url, "duplicate job_url on create");
            Err(duplicate_url_error())
        }
        Err(e) => Err(e.into()),
    }
}

#[instrument(skip(state))]
pub async fn get_job(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<JobApplication>> {
    let job = JobApplication::find(&state.db, user_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Not found."))?;
    Ok(Json(job))
}

#[instrument(skip(state, payload))]
pub async fn put_job(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<JobWriteRequest>,
) -> ApiResult<Json<JobApplication>> {
    let fields = payload.into_fields()?;

    match JobApplication::update_full(&state.db, user_id, id, &fields).await {
        Ok(Some(job)) => Ok(Json(job)),
        // Unknown id and someone else's record look the same.
        Ok(None) => Err(ApiError::not_found("Not found.")),
        Err(e) if is_unique_violation(&e) => Err(duplicate_url_error()),
        Err(e) => Err(e.into()),
    }
}

#[instrument(skip(state, payload))]
pub async fn patch_job(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<JobPatchRequest>,
) -> ApiResult<Json<JobApplication>> {
    let patch = payload.into_patch()?;

    match JobApplication::update_partial(&state.db, user_id, id, &patch).await {
        Ok(Some(job)) => Ok(Json(job)),
        Ok(None) => Err(ApiError::not_found("Not found.")),
        Err(e) if is_unique_violation(&e) => Err(duplicate_url_error()),
        Err(e) => Err(e.into()),
    }
}

#[instrument(skip(state))]
pub async fn delete_job(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !JobApplication::delete(&state.db, user_id, id).await? {
        return Err(ApiError::not_found("Not found."));
    }
    info!(user_id = %user_id, job_id = %id, "job application deleted");
    Ok(StatusCode::NO_CONTENT)
}
