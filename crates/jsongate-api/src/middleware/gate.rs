//! # Validation Gate
//!
//! Route-level middleware placed in front of every schema-bound handler.
//!
//! The gate buffers the body (up to the configured limit), parses it as
//! JSON and checks it with the route's [`Validator`]. On success the
//! [`ValidBody`](jsongate_schema::ValidBody) replaces the raw body in the
//! request extensions and the handler runs. On failure the request is
//! answered with [`AppError::ValidationFailed`] and the handler never runs.
//!
//! The gate holds only an `Arc` to an immutable validator, so one instance
//! serves any number of concurrent requests.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::middleware::{from_fn_with_state, Next};
use axum::response::Response;
use axum::routing::MethodRouter;
use axum::Json;
use jsongate_schema::{ValidationResult, Validator};
use serde_json::Value;

use crate::error::AppError;

/// A validator bound to one route, plus the body size cap.
#[derive(Debug, Clone)]
pub struct Gate {
    validator: Arc<Validator>,
    body_limit: usize,
}

impl Gate {
    /// Bind `validator` to a route, reading at most `body_limit` bytes.
    pub fn new(validator: Arc<Validator>, body_limit: usize) -> Self {
        Self {
            validator,
            body_limit,
        }
    }

    /// Name of the schema this gate enforces.
    pub fn schema_name(&self) -> &str {
        self.validator.schema_name()
    }
}

/// Put `route` behind `gate`. Only requests matching the route's method
/// reach the gate.
pub fn guard<S>(route: MethodRouter<S>, gate: Gate) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    route.route_layer(from_fn_with_state(gate, validation_gate))
}

/// The gate middleware.
pub async fn validation_gate(
    State(gate): State<Gate>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = request.into_parts();
    let raw = read_json(body, gate.body_limit).await?;

    match gate.validator.check(raw) {
        ValidationResult::Valid(valid) => {
            parts.extensions.insert(valid);
            Ok(next.run(Request::from_parts(parts, Body::empty())).await)
        }
        ValidationResult::Invalid(violations) => Err(AppError::ValidationFailed {
            schema: gate.schema_name().to_string(),
            violations,
        }),
    }
}

/// Buffer and parse a request body.
async fn read_json(body: Body, limit: usize) -> Result<Value, AppError> {
    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| AppError::BodyRead(e.to_string()))?;
    let Json(value) =
        Json::<Value>::from_bytes(&bytes).map_err(|e| AppError::BodyParse(e.body_text()))?;
    Ok(value)
}
