//! # Telemetry
//!
//! Subscriber setup for the binary and the [`FailureLog`] capability the
//! error translator writes through. The translator never touches a global
//! logger directly; tests swap in their own `FailureLog`.

use std::fmt;
use std::str::FromStr;

use jsongate_schema::ValidationViolations;

use crate::error::AppError;

/// Output format for the process-wide subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}', expected 'text' or 'json'")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// `info` filter.
pub fn init(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Sink for failures seen by the error translator.
///
/// Implementations must not fail or panic: logging problems never turn
/// into HTTP failures.
pub trait FailureLog: Send + Sync + 'static {
    /// An unexpected failure, about to be answered with a 500.
    fn unexpected(&self, failure: &AppError);

    /// A body rejected by its schema, about to be answered with a 400.
    fn rejected(&self, schema: &str, violations: &ValidationViolations);
}

/// [`FailureLog`] backed by `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFailureLog;

impl FailureLog for TracingFailureLog {
    fn unexpected(&self, failure: &AppError) {
        tracing::error!(error = %failure, detail = "unexpected error", "request failed");
    }

    fn rejected(&self, schema: &str, violations: &ValidationViolations) {
        tracing::info!(
            schema,
            violations = violations.len(),
            "request body rejected by schema"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" text ".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("plain".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn tracing_log_accepts_both_failure_classes() {
        let log = TracingFailureLog;
        log.unexpected(&AppError::Internal("x".into()));
        let schema = jsongate_schema::Schema::builder("person", jsongate_schema::AdditionalProperties::Deny)
            .build()
            .unwrap();
        let violations = jsongate_schema::compile(&schema)
            .unwrap()
            .check(serde_json::json!({"extra": 1}))
            .into_result()
            .unwrap_err();
        log.rejected("person", &violations);
    }
}
