//! Error rendering for the HTTP surface.
//!
//! Every endpoint shares one envelope: `{"success": false, "error": <text>,
//! "type": <code>}`. Server faults are logged here with their cause and leave
//! the process as a generic message.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::AppError;
use serde_json::json;

/// Wraps [`AppError`] so handlers can use `?` straight into a response.
pub struct ApiError(pub AppError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self.0 {
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::NotFound(..) => (StatusCode::NOT_FOUND, "NOT_FOUND", self.0.to_string()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
            }
            AppError::RateLimited { retry_after_secs } => {
                let minutes = retry_after_secs.div_ceil(60).max(1);
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    "RATE_LIMIT_EXCEEDED",
                    format!("Too many login attempts. Please try again in {minutes} minutes."),
                )
            }
            AppError::Database(cause) => {
                tracing::error!(%cause, "database failure reached the API boundary");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Internal server error".to_string(),
                )
            }
            AppError::Internal(cause) => {
                tracing::error!(%cause, "internal failure reached the API boundary");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "error": message,
            "type": kind,
        }));

        if let AppError::RateLimited { retry_after_secs } = &self.0 {
            let headers = [(header::RETRY_AFTER, retry_after_secs.to_string())];
            return (status, headers, body).into_response();
        }
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn client_errors_keep_their_message() {
        let response =
            ApiError(AppError::Validation("Title must be longer".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Title must be longer");
        assert_eq!(body["type"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn lockout_reports_minutes_and_retry_after() {
        let response = ApiError(AppError::RateLimited {
            retry_after_secs: 601,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "601");
        let body = body_json(response).await;
        assert_eq!(
            body["error"],
            "Too many login attempts. Please try again in 11 minutes."
        );
        assert_eq!(body["type"], "RATE_LIMIT_EXCEEDED");
    }

    #[tokio::test]
    async fn server_faults_never_leak_their_cause() {
        let response =
            ApiError(AppError::Database("connection refused on 5432".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body["type"], "DATABASE_ERROR");
    }

    #[tokio::test]
    async fn not_found_names_the_entity() {
        let response = ApiError(AppError::not_found("Thread", "abc")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Thread not found: abc");
        assert_eq!(body["type"], "NOT_FOUND");
    }
}
