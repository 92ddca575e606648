use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Field-level request validation failure. Rendered the way the
    /// frontend already parses it: `{"<field>": ["<message>"]}`.
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("request was throttled")]
    Throttled,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Throttled => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            ApiError::Validation { field, message } => {
                let mut map = serde_json::Map::new();
                map.insert(field.to_string(), json!([message]));
                serde_json::Value::Object(map)
            }
            ApiError::Unauthorized(detail)
            | ApiError::NotFound(detail)
            | ApiError::Conflict(detail) => json!({ "detail": detail }),
            ApiError::Throttled => {
                json!({ "detail": "Request was throttled. Try again later." })
            }
            ApiError::Internal(e) => {
                error!(error = %e, "internal error");
                json!({ "detail": "Internal server error." })
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn validation_error_names_the_field() {
        let (status, body) =
            body_json(ApiError::validation("company_name", "This field may not be blank.")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["company_name"][0], "This field may not be blank.");
    }

    #[tokio::test]
    async fn not_found_uses_detail_key() {
        let (status, body) = body_json(ApiError::not_found("Not found.")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Not found.");
    }

    #[tokio::test]
    async fn internal_error_is_not_exposed() {
        let (status, body) =
            body_json(ApiError::Internal(anyhow::anyhow!("secret db detail"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Internal server error.");
    }

    #[tokio::test]
    async fn throttled_maps_to_429() {
        let (status, _) = body_json(ApiError::Throttled).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }
}
