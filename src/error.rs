//! Typed errors at the two edges of the service: process configuration and
//! the HTTP surface. Everything in between propagates `anyhow::Error`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Fatal configuration problems, raised before the server binds.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing credential: set the {0} environment variable")]
    MissingCredential(&'static str),
    #[error("unknown {kind} provider: {name}. Supported: {supported}")]
    UnknownProvider {
        kind: &'static str,
        name: String,
        supported: &'static str,
    },
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Errors returned by request handlers. Rendered as `{"detail": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("模型尚未載入完成，請稍後再試")]
    NotReady,
    #[error("{0}")]
    Validation(String),
    #[error("生成運勢時發生錯誤：{0}")]
    Pipeline(String),
}

impl ApiError {
    /// Wrap a pipeline failure, keeping the whole context chain in the message.
    pub fn pipeline(err: &anyhow::Error) -> Self {
        ApiError::Pipeline(format!("{err:#}"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = Json(json!({ "detail": self.to_string() }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::NotReady.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            ApiError::Validation("missing field".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::Pipeline("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn pipeline_message_keeps_context_chain() {
        let err = anyhow::anyhow!("connection reset").context("generation request failed");
        let api = ApiError::pipeline(&err);
        let msg = api.to_string();
        assert!(msg.starts_with("生成運勢時發生錯誤："));
        assert!(msg.contains("generation request failed"));
        assert!(msg.contains("connection reset"));
    }
}
