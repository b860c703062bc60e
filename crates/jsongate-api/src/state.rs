//! # Application State
//!
//! Configuration and the shared, read-only state built once at startup:
//! one compiled [`Validator`] per guarded route and the error translator.
//! Nothing in here is mutated after [`AppState::new`] returns.

use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use jsongate_schema::{SchemaDefinitionError, Validator};
use thiserror::Error;

use crate::middleware::translator::ErrorTranslator;
use crate::routes;
use crate::telemetry::{FailureLog, LogFormat, TracingFailureLog};

/// Default listening port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default cap on buffered request bodies.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Invalid configuration value.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {var}={value:?}: {reason}")]
    Invalid {
        /// Environment variable name.
        var: &'static str,
        /// Raw value found.
        value: String,
        /// Why it was refused.
        reason: String,
    },
}

/// Process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Port to bind (`PORT`).
    pub port: u16,
    /// Maximum request body size in bytes (`BODY_LIMIT_BYTES`).
    pub body_limit: usize,
    /// Subscriber output format (`LOG_FORMAT`).
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            body_limit: DEFAULT_BODY_LIMIT,
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through `lookup`; unset variables keep their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            port: parse_var(&lookup, "PORT", defaults.port)?,
            body_limit: parse_var(&lookup, "BODY_LIMIT_BYTES", defaults.body_limit)?,
            log_format: parse_var(&lookup, "LOG_FORMAT", defaults.log_format)?,
        })
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

/// Compiled validators, one per guarded route.
#[derive(Debug, Clone)]
pub struct RouteValidators {
    /// `POST /`
    pub people: Arc<Validator>,
    /// `POST /2`
    pub dogs: Arc<Validator>,
}

impl RouteValidators {
    /// Define and compile every route schema.
    ///
    /// # Errors
    ///
    /// Any [`SchemaDefinitionError`]; the process must not start serving.
    pub fn compile() -> Result<Self, SchemaDefinitionError> {
        Ok(Self {
            people: compile_logged(routes::people::schema()?)?,
            dogs: compile_logged(routes::dogs::schema()?)?,
        })
    }
}

fn compile_logged(schema: jsongate_schema::Schema) -> Result<Arc<Validator>, SchemaDefinitionError> {
    let validator = jsongate_schema::compile(&schema)?;
    tracing::info!(
        schema = schema.name(),
        additional_properties = %schema.additional_properties(),
        "schema ready"
    );
    Ok(Arc::new(validator))
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub validators: RouteValidators,
    pub translator: ErrorTranslator,
}

impl AppState {
    /// Build state with failures logged through `tracing`.
    pub fn new(config: AppConfig) -> Result<Self, SchemaDefinitionError> {
        Self::with_failure_log(config, Arc::new(TracingFailureLog))
    }

    /// Build state with an explicit failure log.
    pub fn with_failure_log(
        config: AppConfig,
        log: Arc<dyn FailureLog>,
    ) -> Result<Self, SchemaDefinitionError> {
        Ok(Self {
            config,
            validators: RouteValidators::compile()?,
            translator: ErrorTranslator::new(log),
        })
    }
}
