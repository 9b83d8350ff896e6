use crate::utils::format::format_bytes;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Duplicate submission: {0}")]
    DuplicateSubmission(String),

    #[error("Quota exceeded: requested {requested} bytes, available {available} bytes")]
    QuotaExceeded {
        requested: i64,
        available: i64,
        limit: i64,
    },

    #[error("Payload Too Large: body exceeds {limit} bytes")]
    PayloadTooLarge {
        /// Configured request body limit
        limit: usize,
        /// Declared `Content-Length`, when the client sent one
        received: Option<u64>,
    },

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateSubmission(_) => StatusCode::CONFLICT,
            AppError::QuotaExceeded { .. } | AppError::PayloadTooLarge { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) | AppError::Database(_) | AppError::Anyhow(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message) = match self {
            AppError::Unauthenticated(msg) => ("UNAUTHENTICATED", msg),
            AppError::Validation(msg) => ("VALIDATION_ERROR", msg),
            AppError::DuplicateSubmission(msg) => ("DUPLICATE_SUBMISSION", msg),
            AppError::QuotaExceeded {
                requested,
                available,
                limit,
            } => (
                "QUOTA_EXCEEDED",
                format!(
                    "Storage quota exceeded. You are trying to upload {} but only {} of your {} limit is available.",
                    format_bytes(requested),
                    format_bytes(available),
                    format_bytes(limit)
                ),
            ),
            AppError::PayloadTooLarge { limit, received } => {
                let limit = format_bytes(i64::try_from(limit).unwrap_or(i64::MAX));
                let message = match received {
                    Some(size) => format!(
                        "Request body of {} exceeds the {} request size limit. Storage quota is checked only for requests within this limit.",
                        format_bytes(i64::try_from(size).unwrap_or(i64::MAX)),
                        limit
                    ),
                    None => format!(
                        "Request body exceeds the {} request size limit. Storage quota is checked only for requests within this limit.",
                        limit
                    ),
                };
                ("PAYLOAD_TOO_LARGE", message)
            }
            AppError::NotFound(msg) => ("NOT_FOUND", msg),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("INTERNAL_ERROR", "Internal server error".to_string())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                ("INTERNAL_ERROR", "Internal server error".to_string())
            }
            AppError::Anyhow(e) => {
                tracing::error!("Anyhow error: {:?}", e);
                ("INTERNAL_ERROR", "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": code,
            "message": message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_quota_message_names_sizes() {
        let limit = 2 * 1024 * 1024 * 1024_i64;
        let (status, json) = body_json(AppError::QuotaExceeded {
            requested: limit + 1,
            available: limit,
            limit,
        })
        .await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json["error"], "QUOTA_EXCEEDED");
        let message = json["message"].as_str().unwrap();
        assert!(message.contains("2 GB"));
        assert!(message.contains("limit"));
    }

    #[tokio::test]
    async fn test_internal_errors_are_generic() {
        let (status, json) =
            body_json(AppError::Internal("s3 bucket credentials leaked".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], "Internal server error");
    }

    #[tokio::test]
    async fn test_body_limit_message_names_sizes() {
        let (status, json) = body_json(AppError::PayloadTooLarge {
            limit: 512 * 1024 * 1024,
            received: Some(2 * 1024 * 1024 * 1024 + 1),
        })
        .await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json["error"], "PAYLOAD_TOO_LARGE");
        let message = json["message"].as_str().unwrap();
        assert!(message.contains("Request body of 2 GB"), "{}", message);
        assert!(message.contains("512 MB request size limit"), "{}", message);

        let (_, json) = body_json(AppError::PayloadTooLarge {
            limit: 1024,
            received: None,
        })
        .await;
        assert!(json["message"].as_str().unwrap().contains("1 KB"));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::DuplicateSubmission("x".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Validation("Title is required".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Unauthenticated("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
