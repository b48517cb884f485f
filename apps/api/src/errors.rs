use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::workflow::error::WorkflowError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Validation(format!("Malformed multipart body: {err}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut debug_url = None;
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Workflow(err) => {
                debug_url = err.debug_url().map(String::from);
                match err {
                    WorkflowError::InvalidInput(msg) => {
                        (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg.clone())
                    }
                    WorkflowError::UploadFailed { http_status, message } => {
                        tracing::error!("Upload failed ({http_status}): {message}");
                        (
                            StatusCode::BAD_GATEWAY,
                            "UPLOAD_FAILED",
                            format!("File upload failed: {http_status} {message}"),
                        )
                    }
                    WorkflowError::VendorRejected { code, message, .. } => {
                        tracing::error!("Vendor rejected request (code {code}): {message}");
                        (StatusCode::BAD_GATEWAY, "VENDOR_REJECTED", message.clone())
                    }
                    WorkflowError::Network(msg) => {
                        tracing::error!("Vendor unreachable: {msg}");
                        (
                            StatusCode::BAD_GATEWAY,
                            "NETWORK_ERROR",
                            "The workflow service could not be reached".to_string(),
                        )
                    }
                    WorkflowError::Timeout { attempts } => (
                        StatusCode::GATEWAY_TIMEOUT,
                        "TIMEOUT",
                        format!("Workflow still running after {attempts} status checks"),
                    ),
                }
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let Some(url) = debug_url {
            error["debug_url"] = json!(url);
        }

        (status, Json(json!({ "status": "Error", "error": error }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_vendor_rejection_keeps_message_and_debug_url() {
        let (status, body) = render(AppError::from(WorkflowError::VendorRejected {
            code: 4011,
            message: "token expired".to_string(),
            debug_url: Some("https://vendor.example/debug/3".to_string()),
        }))
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["status"], "Error");
        assert_eq!(body["error"]["message"], "token expired");
        assert_eq!(body["error"]["debug_url"], "https://vendor.example/debug/3");
    }

    #[tokio::test]
    async fn test_invalid_input_is_bad_request_without_debug_url() {
        let (status, body) = render(AppError::from(WorkflowError::InvalidInput(
            "jd file is required".to_string(),
        )))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_INPUT");
        assert!(body["error"].get("debug_url").is_none());
    }

    #[tokio::test]
    async fn test_timeout_is_gateway_timeout() {
        let (status, _) = render(AppError::from(WorkflowError::Timeout { attempts: 10 })).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    }
}
