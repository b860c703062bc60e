//! # jsongate-api — Schema-Gated JSON Endpoints
//!
//! An Axum service whose handlers only ever see request bodies that passed
//! their declared schema.
//!
//! ## API Surface
//!
//! | Route                  | Module              | Schema                          |
//! |------------------------|---------------------|---------------------------------|
//! | `POST /`               | [`routes::people`]  | `person` (extra fields allowed) |
//! | `POST /2`              | [`routes::dogs`]    | `dog` (extra fields rejected)   |
//! | `GET /health/liveness` |                     |                                 |
//! | `GET /health/readiness`|                     |                                 |
//!
//! ## Request Pipeline (execution order)
//!
//! ```text
//! TraceLayer → CatchPanic → ErrorTranslator → ValidationGate → Handler
//! ```
//!
//! A request that fails its gate is answered with `400` and the complete
//! violation list. Any other failure, including a handler panic, is
//! answered with `500 {"error": "Internal Error"}` and logged server-side.

pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod telemetry;

use std::any::Any;

use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;

use crate::middleware::gate::Gate;
use crate::middleware::translator::{translate_errors, ErrorTranslator};

pub use error::AppError;
pub use state::{AppConfig, AppState};

/// Assemble the full application router.
pub fn app(state: AppState) -> Router {
    let limit = state.config.body_limit;
    let api = Router::new()
        .merge(routes::people::router(Gate::new(
            state.validators.people.clone(),
            limit,
        )))
        .merge(routes::dogs::router(Gate::new(
            state.validators.dogs.clone(),
            limit,
        )))
        .with_state(state.clone());

    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    with_error_boundary(Router::new().merge(health).merge(api), state.translator)
}

/// Wrap `router` in the error translator, panic boundary and trace layer.
pub fn with_error_boundary(router: Router, translator: ErrorTranslator) -> Router {
    router
        .layer(from_fn_with_state(translator.clone(), translate_errors))
        .layer(CatchPanicLayer::custom(
            move |payload: Box<dyn Any + Send + 'static>| translator.panic_response(payload),
        ))
        .layer(middleware::tracing_layer::layer())
}

/// Liveness probe. Always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe. Schemas are compiled before the router exists, so a
/// serving process is ready.
async fn readiness() -> &'static str {
    "ready"
}
