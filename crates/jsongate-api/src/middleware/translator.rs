//! # Error Translator
//!
//! The pipeline's last-resort boundary. Every error response is rendered by
//! [`AppError`]'s `IntoResponse`; this layer takes the [`FailureSlot`] off
//! the response and reports it through the injected [`FailureLog`]:
//! unexpected failures as errors, validation rejections as information.
//! Handler panics are caught one layer further out by `CatchPanicLayer`,
//! which calls [`ErrorTranslator::panic_response`].
//!
//! Each failing request is reported exactly once: the slot is removed when
//! it is read, and panic responses never carry one.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::error::{AppError, FailureSlot};
use crate::telemetry::FailureLog;

/// Reports failures through an injected [`FailureLog`].
#[derive(Clone)]
pub struct ErrorTranslator {
    log: Arc<dyn FailureLog>,
}

impl fmt::Debug for ErrorTranslator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorTranslator").finish_non_exhaustive()
    }
}

impl ErrorTranslator {
    pub fn new(log: Arc<dyn FailureLog>) -> Self {
        Self { log }
    }

    /// Report one failure.
    pub fn report(&self, failure: &AppError) {
        match failure {
            AppError::ValidationFailed { schema, violations } => {
                self.log.rejected(schema, violations)
            }
            other => self.log.unexpected(other),
        }
    }

    /// Build the response for a caught panic and report it.
    pub fn panic_response(&self, payload: Box<dyn Any + Send + 'static>) -> Response {
        let failure = AppError::Panic(panic_message(payload.as_ref()));
        self.report(&failure);
        failure.render()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Middleware that reports the failure behind an error response.
pub async fn translate_errors(
    State(translator): State<ErrorTranslator>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    if let Some(FailureSlot(failure)) = response.extensions_mut().remove::<FailureSlot>() {
        translator.report(&failure);
    }
    response
}
