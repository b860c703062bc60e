//! # Schema Definitions
//!
//! Declarative descriptions of acceptable request bodies. A [`Schema`] is a
//! named, ordered set of field constraints plus an explicit
//! additional-properties policy. Schemas are built once at startup and are
//! immutable afterwards.
//!
//! ## Lowering
//!
//! [`Schema::to_json_schema`] lowers a schema into a JSON Schema
//! (Draft 2020-12) document. The document is the only thing the validation
//! engine ever sees, so the same schema always produces the same checking
//! behavior.
//!
//! ## Definition Errors
//!
//! Internally inconsistent schemas (duplicate fields, empty enumerations,
//! inverted bounds) are rejected at construction with
//! [`SchemaDefinitionError`]. These errors are startup-fatal and never
//! occur per request.

use std::collections::HashSet;
use std::fmt;

use serde_json::{json, Map, Number, Value};
use thiserror::Error;

/// Dialect URI written into every generated document.
pub const DRAFT_2020_12: &str = "https://json-schema.org/draft/2020-12/schema";

/// Error raised while defining or compiling a schema.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaDefinitionError {
    /// Schemas must be named so validated bodies can be bound to them.
    #[error("schema name must not be empty")]
    EmptySchemaName,

    /// A field was declared with an empty name.
    #[error("schema '{schema}': field name must not be empty")]
    EmptyFieldName {
        /// Schema being defined.
        schema: String,
    },

    /// The same field name was declared twice.
    #[error("schema '{schema}': duplicate field '{field}'")]
    DuplicateField {
        /// Schema being defined.
        schema: String,
        /// The repeated field name.
        field: String,
    },

    /// An enumeration constraint lists no allowed values.
    #[error("schema '{schema}': enum field '{field}' has no allowed values")]
    EmptyEnum {
        /// Schema being defined.
        schema: String,
        /// The enum field.
        field: String,
    },

    /// An enumeration constraint lists the same value twice.
    #[error("schema '{schema}': enum field '{field}' lists '{value}' more than once")]
    DuplicateEnumValue {
        /// Schema being defined.
        schema: String,
        /// The enum field.
        field: String,
        /// The repeated literal.
        value: String,
    },

    /// Numeric or length bounds are unusable.
    #[error("schema '{schema}': field '{field}' has invalid bounds: {reason}")]
    InvalidBounds {
        /// Schema being defined.
        schema: String,
        /// Field carrying the bounds.
        field: String,
        /// What is wrong with them.
        reason: String,
    },

    /// A constraint was applied to a field kind that cannot carry it,
    /// e.g. a `format` on a number.
    #[error("schema '{schema}': constraint '{constraint}' does not apply to {kind} field '{field}'")]
    ConstraintMismatch {
        /// Schema being defined.
        schema: String,
        /// Offending field.
        field: String,
        /// The constraint keyword.
        constraint: &'static str,
        /// The field's kind.
        kind: &'static str,
    },

    /// The validation engine refused the generated document.
    #[error("schema '{schema}' failed to compile: {reason}")]
    Compile {
        /// Schema being compiled.
        schema: String,
        /// Engine-reported reason.
        reason: String,
    },
}

/// Whether a schema accepts keys it does not declare.
///
/// There is no default: every schema states its policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdditionalProperties {
    /// Undeclared keys are accepted and ignored.
    Allow,
    /// Every undeclared key is a violation.
    Deny,
}

impl AdditionalProperties {
    /// Returns `true` for [`AdditionalProperties::Allow`].
    pub fn allows(self) -> bool {
        matches!(self, Self::Allow)
    }
}

impl fmt::Display for AdditionalProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => f.write_str("allow"),
            Self::Deny => f.write_str("deny"),
        }
    }
}

/// String formats the validator asserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    /// RFC 4122 UUID.
    Uuid,
    /// Email address.
    Email,
    /// RFC 3339 date-time.
    DateTime,
    /// Absolute URI.
    Uri,
    /// Dotted-quad IPv4 address.
    Ipv4,
    /// IPv6 address.
    Ipv6,
}

impl StringFormat {
    /// The JSON Schema `format` keyword value.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Uuid => "uuid",
            Self::Email => "email",
            Self::DateTime => "date-time",
            Self::Uri => "uri",
            Self::Ipv4 => "ipv4",
            Self::Ipv6 => "ipv6",
        }
    }
}

/// A closed set of string literals usable as an enumeration constraint.
///
/// Implementors expose their allowed values at runtime so the validator
/// checks against the same literals the typed request deserializes from.
pub trait EnumValues {
    /// Every accepted literal, in declaration order.
    const VALUES: &'static [&'static str];
}

/// The primitive shape of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// A JSON string, optionally with a format and length bounds.
    String {
        format: Option<StringFormat>,
        min_length: Option<u64>,
        max_length: Option<u64>,
    },
    /// Any JSON number, with optional inclusive bounds.
    Number {
        minimum: Option<f64>,
        maximum: Option<f64>,
    },
    /// A JSON number with no fractional part.
    Integer {
        minimum: Option<f64>,
        maximum: Option<f64>,
    },
    /// `true` or `false`.
    Boolean,
    /// One of a closed set of string literals.
    Enum {
        values: Vec<String>,
    },
}

impl FieldKind {
    fn label(&self) -> &'static str {
        match self {
            Self::String { .. } => "string",
            Self::Number { .. } => "number",
            Self::Integer { .. } => "integer",
            Self::Boolean => "boolean",
            Self::Enum { .. } => "enum",
        }
    }
}

/// Constraint descriptor for a single field.
///
/// Fields are required unless [`FieldSpec::optional`] is called. Builder
/// methods that do not apply to the field's kind are recorded and reported
/// as [`SchemaDefinitionError::ConstraintMismatch`] when the schema is built.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    kind: FieldKind,
    required: bool,
    mismatch: Option<&'static str>,
}

impl FieldSpec {
    fn of(kind: FieldKind) -> Self {
        Self {
            kind,
            required: true,
            mismatch: None,
        }
    }

    /// A string field.
    pub fn string() -> Self {
        Self::of(FieldKind::String {
            format: None,
            min_length: None,
            max_length: None,
        })
    }

    /// A number field (integers and floats).
    pub fn number() -> Self {
        Self::of(FieldKind::Number {
            minimum: None,
            maximum: None,
        })
    }

    /// An integer field.
    pub fn integer() -> Self {
        Self::of(FieldKind::Integer {
            minimum: None,
            maximum: None,
        })
    }

    /// A boolean field.
    pub fn boolean() -> Self {
        Self::of(FieldKind::Boolean)
    }

    /// An enumeration over the given literals.
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::of(FieldKind::Enum {
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    /// An enumeration over the literals declared by `E`.
    pub fn enumeration<E: EnumValues>() -> Self {
        Self::one_of(E::VALUES.iter().copied())
    }

    /// Mark the field as optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Require a string format.
    pub fn format(mut self, format: StringFormat) -> Self {
        match &mut self.kind {
            FieldKind::String { format: slot, .. } => *slot = Some(format),
            _ => self.mismatch = Some("format"),
        }
        self
    }

    /// Inclusive upper bound for a number or integer.
    pub fn maximum(mut self, limit: f64) -> Self {
        match &mut self.kind {
            FieldKind::Number { maximum, .. } | FieldKind::Integer { maximum, .. } => {
                *maximum = Some(limit)
            }
            _ => self.mismatch = Some("maximum"),
        }
        self
    }

    /// Inclusive lower bound for a number or integer.
    pub fn minimum(mut self, limit: f64) -> Self {
        match &mut self.kind {
            FieldKind::Number { minimum, .. } | FieldKind::Integer { minimum, .. } => {
                *minimum = Some(limit)
            }
            _ => self.mismatch = Some("minimum"),
        }
        self
    }

    /// Minimum string length in characters.
    pub fn min_length(mut self, len: u64) -> Self {
        match &mut self.kind {
            FieldKind::String { min_length, .. } => *min_length = Some(len),
            _ => self.mismatch = Some("minLength"),
        }
        self
    }

    /// Maximum string length in characters.
    pub fn max_length(mut self, len: u64) -> Self {
        match &mut self.kind {
            FieldKind::String { max_length, .. } => *max_length = Some(len),
            _ => self.mismatch = Some("maxLength"),
        }
        self
    }

    /// The field's primitive shape.
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Whether the field must be present.
    pub fn is_required(&self) -> bool {
        self.required
    }

    fn check(&self, schema: &str, field: &str) -> Result<(), SchemaDefinitionError> {
        if let Some(constraint) = self.mismatch {
            return Err(SchemaDefinitionError::ConstraintMismatch {
                schema: schema.to_string(),
                field: field.to_string(),
                constraint,
                kind: self.kind.label(),
            });
        }

        let invalid = |reason: String| SchemaDefinitionError::InvalidBounds {
            schema: schema.to_string(),
            field: field.to_string(),
            reason,
        };

        match &self.kind {
            FieldKind::Number { minimum, maximum } | FieldKind::Integer { minimum, maximum } => {
                for bound in [minimum, maximum].into_iter().flatten() {
                    if !bound.is_finite() {
                        return Err(invalid(format!("{bound} is not a finite number")));
                    }
                }
                if let (Some(lo), Some(hi)) = (minimum, maximum) {
                    if lo > hi {
                        return Err(invalid(format!("minimum {lo} exceeds maximum {hi}")));
                    }
                }
            }
            FieldKind::String {
                min_length: Some(lo),
                max_length: Some(hi),
                ..
            } if lo > hi => {
                return Err(invalid(format!("minLength {lo} exceeds maxLength {hi}")));
            }
            FieldKind::Enum { values } => {
                if values.is_empty() {
                    return Err(SchemaDefinitionError::EmptyEnum {
                        schema: schema.to_string(),
                        field: field.to_string(),
                    });
                }
                let mut seen = HashSet::new();
                for value in values {
                    if !seen.insert(value.as_str()) {
                        return Err(SchemaDefinitionError::DuplicateEnumValue {
                            schema: schema.to_string(),
                            field: field.to_string(),
                            value: value.clone(),
                        });
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn to_json(&self) -> Value {
        let mut out = Map::new();
        match &self.kind {
            FieldKind::String {
                format,
                min_length,
                max_length,
            } => {
                out.insert("type".into(), json!("string"));
                if let Some(format) = format {
                    out.insert("format".into(), json!(format.keyword()));
                }
                if let Some(len) = min_length {
                    out.insert("minLength".into(), json!(len));
                }
                if let Some(len) = max_length {
                    out.insert("maxLength".into(), json!(len));
                }
            }
            FieldKind::Number { minimum, maximum } | FieldKind::Integer { minimum, maximum } => {
                out.insert("type".into(), json!(self.kind.label()));
                if let Some(limit) = minimum {
                    out.insert("minimum".into(), bound_to_json(*limit));
                }
                if let Some(limit) = maximum {
                    out.insert("maximum".into(), bound_to_json(*limit));
                }
            }
            FieldKind::Boolean => {
                out.insert("type".into(), json!("boolean"));
            }
            // No `type` keyword: a non-string value reports a single enum
            // violation rather than a type and an enum violation.
            FieldKind::Enum { values } => {
                out.insert("enum".into(), json!(values));
            }
        }
        Value::Object(out)
    }
}

/// Whole-valued bounds are written as JSON integers.
fn bound_to_json(limit: f64) -> Value {
    if limit.fract() == 0.0 && limit.abs() < i64::MAX as f64 {
        Value::Number(Number::from(limit as i64))
    } else {
        Number::from_f64(limit).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// An immutable, named description of a request body.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    fields: Vec<(String, FieldSpec)>,
    additional_properties: AdditionalProperties,
}

impl Schema {
    /// Build a schema from a name, an explicit additional-properties policy
    /// and a mapping of field name to constraint.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaDefinitionError`] for an empty name, an empty or
    /// duplicate field name, or any field whose constraints are inconsistent.
    pub fn new<N, I, F>(
        name: N,
        additional_properties: AdditionalProperties,
        fields: I,
    ) -> Result<Self, SchemaDefinitionError>
    where
        N: Into<String>,
        I: IntoIterator<Item = (F, FieldSpec)>,
        F: Into<String>,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SchemaDefinitionError::EmptySchemaName);
        }

        let mut seen = HashSet::new();
        let mut declared = Vec::new();
        for (field, spec) in fields {
            let field = field.into();
            if field.is_empty() {
                return Err(SchemaDefinitionError::EmptyFieldName { schema: name });
            }
            if !seen.insert(field.clone()) {
                return Err(SchemaDefinitionError::DuplicateField {
                    schema: name,
                    field,
                });
            }
            spec.check(&name, &field)?;
            declared.push((field, spec));
        }

        Ok(Self {
            name,
            fields: declared,
            additional_properties,
        })
    }

    /// Start a builder for a schema with the given name and policy.
    pub fn builder(name: impl Into<String>, additional_properties: AdditionalProperties) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            additional_properties,
            fields: Vec::new(),
        }
    }

    /// The schema's name, used in logs and typed-body binding.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether undeclared fields are accepted.
    pub fn additional_properties(&self) -> AdditionalProperties {
        self.additional_properties
    }

    /// Declared fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    /// Look up a declared field.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, spec)| spec)
    }

    /// Lower the schema into a JSON Schema (Draft 2020-12) document.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for (name, spec) in &self.fields {
            properties.insert(name.clone(), spec.to_json());
            if spec.required {
                required.push(Value::String(name.clone()));
            }
        }

        json!({
            "$schema": DRAFT_2020_12,
            "title": self.name,
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": self.additional_properties.allows(),
        })
    }
}

/// Incremental construction of a [`Schema`].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    additional_properties: AdditionalProperties,
    fields: Vec<(String, FieldSpec)>,
}

impl SchemaBuilder {
    /// Declare a field. Duplicates are reported by [`SchemaBuilder::build`].
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.push((name.into(), spec));
        self
    }

    /// Finish the schema.
    pub fn build(self) -> Result<Schema, SchemaDefinitionError> {
        Schema::new(self.name, self.additional_properties, self.fields)
    }
}
