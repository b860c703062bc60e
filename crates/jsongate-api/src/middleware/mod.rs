//! # Middleware
//!
//! - [`gate`]: per-route schema validation.
//! - [`translator`]: failure reporting at the pipeline boundary.
//! - [`tracing_layer`]: request spans.

pub mod gate;
pub mod tracing_layer;
pub mod translator;
