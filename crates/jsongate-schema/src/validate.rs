//! # Schema Validation
//!
//! Compiles a [`Schema`] into a reusable [`Validator`] backed by the
//! `jsonschema` crate (Draft 2020-12, format assertion enabled) and checks
//! parsed request bodies against it.
//!
//! ## Trust Boundary
//!
//! A body that passes [`Validator::check`] is wrapped in a [`ValidBody`].
//! `ValidBody` has no public constructor, so holding one proves the data
//! was checked against the named schema. Handlers obtain typed values from
//! it through [`ValidBody::decode`], an explicit conversion that refuses
//! to decode into a type bound to a different schema.
//!
//! ## Violations
//!
//! Every failed constraint is reported, not just the first. Each
//! [`Violation`] carries a JSON Pointer into the body, the engine's message
//! and the schema keyword that failed. A missing required field is reported
//! at the field's own path, and a strict schema reports one violation per
//! undeclared key.

use std::fmt;
use std::sync::Arc;

use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, ValidationError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::definition::{AdditionalProperties, Schema, SchemaDefinitionError};

/// A single validation violation with structured context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// JSON Pointer to the violating value in the body (`""` is the root).
    pub path: String,
    /// Human-readable description of the violation.
    pub message: String,
    /// The schema keyword that failed, e.g. `required` or `maximum`.
    pub constraint: String,
    /// JSON Pointer within the generated schema document. Not part of the
    /// wire shape.
    #[serde(skip)]
    pub schema_path: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "  (root) [{}]: {}", self.constraint, self.message)
        } else {
            write!(f, "  {} [{}]: {}", self.path, self.constraint, self.message)
        }
    }
}

/// Ordered collection of validation violations. Serializes as a plain list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationViolations {
    violations: Vec<Violation>,
}

impl ValidationViolations {
    /// Returns the number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Returns true if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns a slice of all violations.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Iterate over the violations in report order.
    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.violations.iter()
    }

    /// Violations reported at the given path.
    pub fn at<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a Violation> + 'a {
        self.violations.iter().filter(move |v| v.path == path)
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<Violation> {
        self.violations
    }
}

impl<'a> IntoIterator for &'a ValidationViolations {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.iter()
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

/// Outcome of checking one body.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    /// The body conforms to the schema.
    Valid(ValidBody),
    /// The body violates one or more constraints.
    Invalid(ValidationViolations),
}

impl ValidationResult {
    /// Returns `true` for [`ValidationResult::Valid`].
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Convert into a `Result`, for use with `?`.
    pub fn into_result(self) -> Result<ValidBody, ValidationViolations> {
        match self {
            Self::Valid(body) => Ok(body),
            Self::Invalid(violations) => Err(violations),
        }
    }
}

/// A request body known to conform to the schema it was checked against.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidBody {
    schema: Arc<str>,
    data: Value,
}

impl ValidBody {
    /// Name of the schema this body was validated against.
    pub fn schema_name(&self) -> &str {
        &self.schema
    }

    /// The validated JSON.
    pub fn as_value(&self) -> &Value {
        &self.data
    }

    /// Take the validated JSON.
    pub fn into_value(self) -> Value {
        self.data
    }

    /// Convert into the typed request bound to this body's schema.
    ///
    /// # Errors
    ///
    /// [`ConversionError::SchemaMismatch`] if `T` is bound to another
    /// schema; [`ConversionError::Deserialize`] if `T` cannot represent
    /// the validated data, which means `T` and its schema disagree.
    pub fn decode<T: Conforming>(self) -> Result<T, ConversionError> {
        if T::SCHEMA != &*self.schema {
            return Err(ConversionError::SchemaMismatch {
                expected: T::SCHEMA,
                actual: self.schema.to_string(),
            });
        }
        serde_json::from_value(self.data).map_err(|source| ConversionError::Deserialize {
            schema: T::SCHEMA,
            source,
        })
    }
}

/// A typed request body produced from data validated against a named schema.
pub trait Conforming: DeserializeOwned {
    /// Name of the schema the data must have passed.
    const SCHEMA: &'static str;
}

/// Failure to turn a [`ValidBody`] into its typed form.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// The body was validated against a different schema.
    #[error("body validated against schema '{actual}' cannot decode as '{expected}'")]
    SchemaMismatch {
        /// Schema the target type is bound to.
        expected: &'static str,
        /// Schema the body passed.
        actual: String,
    },

    /// The typed request does not match what its schema accepts.
    #[error("validated body does not decode as '{schema}': {source}")]
    Deserialize {
        /// Schema the target type is bound to.
        schema: &'static str,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

/// A compiled schema.
///
/// `Validator` is `Send + Sync` and holds no mutable state; share it behind
/// an `Arc` across requests.
pub struct Validator {
    schema: Arc<str>,
    additional_properties: AdditionalProperties,
    document: Value,
    compiled: jsonschema::Validator,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("schema", &self.schema)
            .field("additional_properties", &self.additional_properties)
            .finish_non_exhaustive()
    }
}

/// Compile a schema into a [`Validator`].
pub fn compile(schema: &Schema) -> Result<Validator, SchemaDefinitionError> {
    Validator::compile(schema)
}

impl Validator {
    /// Compile a schema into a validator.
    ///
    /// # Errors
    ///
    /// [`SchemaDefinitionError::Compile`] if the engine rejects the lowered
    /// document.
    pub fn compile(schema: &Schema) -> Result<Self, SchemaDefinitionError> {
        let document = schema.to_json_schema();
        let compiled = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .should_validate_formats(true)
            .build(&document)
            .map_err(|e| SchemaDefinitionError::Compile {
                schema: schema.name().to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!(
            schema = schema.name(),
            fields = schema.fields().count(),
            "compiled schema"
        );

        Ok(Self {
            schema: Arc::from(schema.name()),
            additional_properties: schema.additional_properties(),
            document,
            compiled,
        })
    }

    /// Name of the compiled schema.
    pub fn schema_name(&self) -> &str {
        &self.schema
    }

    /// Policy for undeclared fields.
    pub fn additional_properties(&self) -> AdditionalProperties {
        self.additional_properties
    }

    /// The JSON Schema document this validator was compiled from.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Check a parsed body, collecting every violation.
    pub fn check(&self, data: Value) -> ValidationResult {
        let violations: Vec<Violation> = self
            .compiled
            .iter_errors(&data)
            .flat_map(violations_from)
            .collect();

        if violations.is_empty() {
            ValidationResult::Valid(ValidBody {
                schema: Arc::clone(&self.schema),
                data,
            })
        } else {
            ValidationResult::Invalid(ValidationViolations { violations })
        }
    }
}

/// Map one engine error to one or more violations.
fn violations_from(error: ValidationError<'_>) -> Vec<Violation> {
    let instance_path = error.instance_path.to_string();
    let schema_path = error.schema_path.to_string();
    let constraint = keyword(&schema_path);

    match &error.kind {
        ValidationErrorKind::Required { property } => {
            let field = property
                .as_str()
                .map(str::to_owned)
                .unwrap_or_else(|| property.to_string());
            vec![Violation {
                path: child_pointer(&instance_path, &field),
                message: error.to_string(),
                constraint,
                schema_path,
            }]
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => unexpected
            .iter()
            .map(|key| Violation {
                path: child_pointer(&instance_path, key),
                message: format!("additional property \"{key}\" is not allowed"),
                constraint: constraint.clone(),
                schema_path: schema_path.clone(),
            })
            .collect(),
        _ => vec![Violation {
            path: instance_path,
            message: error.to_string(),
            constraint,
            schema_path,
        }],
    }
}

/// Last segment of a JSON Pointer, unescaped.
fn keyword(schema_path: &str) -> String {
    let last = schema_path.rsplit('/').next().unwrap_or(schema_path);
    last.replace("~1", "/").replace("~0", "~")
}

/// Append an escaped reference token to a JSON Pointer.
fn child_pointer(parent: &str, key: &str) -> String {
    format!("{parent}/{}", key.replace('~', "~0").replace('/', "~1"))
}
