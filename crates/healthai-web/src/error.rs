//! 错误到HTTP响应的映射

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use healthai_core::HealthError;
use serde_json::json;
use tracing::error;

/// 处理器错误
#[derive(Debug)]
pub struct ApiError(pub HealthError);

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<HealthError> for ApiError {
    fn from(e: HealthError) -> Self {
        ApiError(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(HealthError::Validation(rejection.body_text()))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            HealthError::Validation(_) | HealthError::Conflict(_) => StatusCode::BAD_REQUEST,
            HealthError::Auth(_) => StatusCode::UNAUTHORIZED,
            HealthError::NotFound(_) => StatusCode::NOT_FOUND,
            HealthError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            HealthError::Service(_)
            | HealthError::Database(_)
            | HealthError::Config(_)
            | HealthError::Network(_)
            | HealthError::Serialization(_)
            | HealthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed with {}: {}", status, self.0);
        }

        let message = self.0.to_string();
        let mut body = json!({
            "error": message,
            "message": message,
            "status": status.as_u16()
        });
        if let HealthError::Upstream {
            details: Some(details),
            ..
        } = self.0
        {
            body["details"] = details;
        }

        (status, Json(body)).into_response()
    }
}
