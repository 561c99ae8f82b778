//! API error taxonomy and the problem-document renderer.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use vista_builder::BuilderError;
use vista_cache::CapturedResponse;
use vista_core::TypeError;
use vista_digest::DigestError;

use crate::{ENCODER_HINT, ENCODER_HINT_HEADER, PROBLEM_CONTENT_TYPE};

/// Namespace prefix for problem types.
pub const PROBLEM_TYPE_PREFIX: &str = "https://vista.network/problems/";

/// API error taxonomy. Every variant renders as one problem document.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Entity absent, or a list query with zero results.
    #[error("{0}")]
    NotFound(String),

    /// Malformed address/hash/height/offset in the request.
    #[error("{0}")]
    InvalidRequest(String),

    /// Builder rejected the submission.
    #[error("{0}")]
    Validation(String),

    /// Mutating call against a read-only instance.
    #[error("database is read-only")]
    ReadOnly,

    /// The endpoint needs a collaborator this node was not wired with.
    #[error("{0}")]
    Unavailable(String),

    /// Storage or rendering failure. Logged, never retried here.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status_tag_title(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not-found", "not found"),
            ApiError::InvalidRequest(_) => {
                (StatusCode::BAD_REQUEST, "invalid-request", "invalid request")
            }
            ApiError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "validation", "validation failed")
            }
            ApiError::ReadOnly => (
                StatusCode::FORBIDDEN,
                "read-only-violation",
                "read-only violation",
            ),
            ApiError::Unavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "unavailable",
                "service unavailable",
            ),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage",
                "internal error",
            ),
        }
    }

    /// Render into a buffered response, the same shape the wire carries.
    pub fn to_captured(&self) -> CapturedResponse {
        let (status, tag, title) = self.status_tag_title();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let problem = Problem {
            problem_type: format!("{PROBLEM_TYPE_PREFIX}{tag}"),
            title: title.to_string(),
            detail: self.to_string(),
        };
        let body = serde_json::to_vec(&problem).unwrap_or_default();
        CapturedResponse::new(status.as_u16(), PROBLEM_CONTENT_TYPE, ENCODER_HINT, body)
    }
}

/// RFC-7807-shaped error envelope.
#[derive(Debug, Serialize)]
struct Problem {
    #[serde(rename = "type")]
    problem_type: String,
    title: String,
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let captured = self.to_captured();
        let mut builder = Response::builder()
            .status(captured.status)
            .header(header::CONTENT_TYPE, captured.content_type.as_str());
        builder = builder.header(ENCODER_HINT_HEADER, captured.encoder_hint.as_str());
        builder
            .body(axum::body::Body::from(captured.body))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
    }
}

impl From<DigestError> for ApiError {
    fn from(err: DigestError) -> Self {
        match err {
            DigestError::ReadOnly => ApiError::ReadOnly,
            DigestError::Cursor(msg) => ApiError::InvalidRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<BuilderError> for ApiError {
    fn from(err: BuilderError) -> Self {
        match err {
            BuilderError::Decode(msg) => ApiError::InvalidRequest(msg),
            BuilderError::Validation(msg) | BuilderError::Placeholder(msg) => {
                ApiError::Validation(msg)
            }
            BuilderError::Type(TypeError::UnknownFactKind(kind)) => {
                ApiError::NotFound(format!("unknown operation: {kind}"))
            }
            BuilderError::Type(other) => ApiError::Validation(other.to_string()),
        }
    }
}

impl From<TypeError> for ApiError {
    fn from(err: TypeError) -> Self {
        ApiError::InvalidRequest(err.to_string())
    }
}

/// Result type for handler bodies.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn problem_document_shape() {
        let captured = ApiError::NotFound("account a:vca not found".into()).to_captured();
        assert_eq!(captured.status, 404);
        assert_eq!(captured.content_type, PROBLEM_CONTENT_TYPE);

        let value: serde_json::Value = serde_json::from_slice(&captured.body).unwrap();
        assert_eq!(
            value["type"],
            format!("{PROBLEM_TYPE_PREFIX}not-found")
        );
        assert_eq!(value["title"], "not found");
        assert_eq!(value["detail"], "account a:vca not found");
    }

    #[test]
    fn digest_errors_map_onto_the_taxonomy() {
        assert!(matches!(
            ApiError::from(DigestError::ReadOnly),
            ApiError::ReadOnly
        ));
        assert!(matches!(
            ApiError::from(DigestError::Cursor("x".into())),
            ApiError::InvalidRequest(_)
        ));
        assert!(matches!(
            ApiError::from(DigestError::Storage("x".into())),
            ApiError::Internal(_)
        ));
    }

    #[test]
    fn unknown_fact_kind_is_not_found() {
        let err = ApiError::from(BuilderError::Type(TypeError::UnknownFactKind("mint".into())));
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
