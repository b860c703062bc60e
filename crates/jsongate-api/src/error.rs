//! # API Error Types
//!
//! Every failure a request can hit is an [`AppError`]. Rendering is
//! deterministic and depends only on the failure class:
//!
//! - [`AppError::ValidationFailed`] → `400 {"error": "Bad Request",
//!   "reason": {"validation": [...]}}`
//! - anything else → `500 {"error": "Internal Error"}`. Internal detail is
//!   never written to the response body.
//!
//! The rendered response also carries the failure itself in a
//! [`FailureSlot`] extension, which the error translator middleware takes
//! out to log it. See [`crate::middleware::translator`].

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use jsongate_schema::{ConversionError, ValidationViolations};
use serde::Serialize;
use thiserror::Error;

/// `error` label for validation failures.
pub const BAD_REQUEST: &str = "Bad Request";

/// `error` label for every other failure.
pub const INTERNAL_ERROR: &str = "Internal Error";

/// Wire shape of every error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    /// Short class label.
    pub error: &'static str,
    /// Structured detail, present only for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ErrorReason>,
}

/// Detail attached to a `400` response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReason {
    /// Every violated constraint, in validator order.
    pub validation: ValidationViolations,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// The request body violates the route's schema (400).
    #[error("request body rejected by schema '{schema}':\n{violations}")]
    ValidationFailed {
        /// Schema the body was checked against.
        schema: String,
        /// Every violated constraint.
        violations: ValidationViolations,
    },

    /// The request body could not be read (500).
    #[error("request body could not be read: {0}")]
    BodyRead(String),

    /// The request body is not JSON (500).
    #[error("request body could not be parsed: {0}")]
    BodyParse(String),

    /// A handler asked for a validated body that no gate produced (500).
    #[error("no validated body for schema '{0}'; route is not behind its validation gate")]
    MissingValidatedBody(&'static str),

    /// A validated body could not be converted to its typed form (500).
    #[error("post-validation conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    /// A handler panicked (500).
    #[error("handler panicked: {0}")]
    Panic(String),

    /// Any other internal fault (500).
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this failure is an expected, client-caused rejection.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationFailed { .. })
    }

    /// Return the HTTP status code and wire body for this error.
    pub fn status_and_body(&self) -> (StatusCode, ErrorBody) {
        match self {
            Self::ValidationFailed { violations, .. } => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: BAD_REQUEST,
                    reason: Some(ErrorReason {
                        validation: violations.clone(),
                    }),
                },
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: INTERNAL_ERROR,
                    reason: None,
                },
            ),
        }
    }

    /// Render without attaching a [`FailureSlot`]. Used where the failure
    /// has already been logged.
    pub(crate) fn render(&self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

/// Response extension carrying the failure that produced the response.
#[derive(Debug, Clone)]
pub struct FailureSlot(pub Arc<AppError>);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut response = self.render();
        response.extensions_mut().insert(FailureSlot(Arc::new(self)));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use jsongate_schema::{AdditionalProperties, FieldSpec, Schema, ValidationResult};
    use serde_json::{json, Value};

    fn violations() -> ValidationViolations {
        let schema = Schema::builder("person", AdditionalProperties::Allow)
            .field("timestamp", FieldSpec::number())
            .build()
            .unwrap();
        match jsongate_schema::compile(&schema).unwrap().check(json!({})) {
            ValidationResult::Invalid(violations) => violations,
            ValidationResult::Valid(_) => panic!("expected violations"),
        }
    }

    async fn response_parts(err: AppError) -> (StatusCode, Value, bool) {
        let response = err.into_response();
        let status = response.status();
        let has_slot = response.extensions().get::<FailureSlot>().is_some();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap(), has_slot)
    }

    #[test]
    fn validation_maps_to_bad_request() {
        let err = AppError::ValidationFailed {
            schema: "person".into(),
            violations: violations(),
        };
        let (status, body) = err.status_and_body();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, BAD_REQUEST);
        assert_eq!(body.reason.unwrap().validation.len(), 1);
        assert!(err.is_validation());
    }

    #[test]
    fn every_other_failure_maps_to_internal_error() {
        let failures = [
            AppError::BodyRead("eof".into()),
            AppError::BodyParse("expected value".into()),
            AppError::MissingValidatedBody("dog"),
            AppError::Panic("boom".into()),
            AppError::Internal("db down".into()),
        ];
        for err in failures {
            let (status, body) = err.status_and_body();
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{err}");
            assert_eq!(body.error, INTERNAL_ERROR);
            assert!(body.reason.is_none());
            assert!(!err.is_validation());
        }
    }

    #[test]
    fn error_display_messages() {
        assert!(AppError::Internal("d".into()).to_string().contains('d'));
        assert!(AppError::MissingValidatedBody("dog").to_string().contains("dog"));
        assert!(AppError::BodyParse("trailing comma".into())
            .to_string()
            .contains("trailing comma"));
    }

    #[tokio::test]
    async fn into_response_validation_body() {
        let (status, body, has_slot) = response_parts(AppError::ValidationFailed {
            schema: "person".into(),
            violations: violations(),
        })
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Bad Request");
        let list = body["reason"]["validation"].as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["path"], "/timestamp");
        assert_eq!(list[0]["constraint"], "required");
        assert!(has_slot);
    }

    #[tokio::test]
    async fn into_response_internal_hides_details() {
        let (status, body, has_slot) =
            response_parts(AppError::Internal("db connection failed".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Internal Error"}));
        assert!(
            !body.to_string().contains("db connection"),
            "internal error details must not leak: {body}"
        );
        assert!(has_slot);
    }

    #[test]
    fn render_does_not_attach_slot() {
        let response = AppError::Panic("boom".into()).render();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.extensions().get::<FailureSlot>().is_none());
    }
}
