//! # jsongate-schema — Request Body Schemas
//!
//! Declares the shapes request bodies must have and checks parsed bodies
//! against them.
//!
//! ## Schema Definitions (`definition`)
//!
//! A [`Schema`] is a named set of field constraints (`string` with optional
//! format and length bounds, `number`/`integer` with optional bounds,
//! `boolean`, and string enumerations) plus an explicit
//! [`AdditionalProperties`] policy. Inconsistent schemas are rejected at
//! construction with [`SchemaDefinitionError`].
//!
//! ## Validation (`validate`)
//!
//! [`compile`] lowers a schema to a JSON Schema (Draft 2020-12) document and
//! compiles it with the `jsonschema` crate. [`Validator::check`] returns a
//! [`ValidationResult`]: either a [`ValidBody`] or the complete list of
//! [`Violation`]s.
//!
//! ## Crate Policy
//!
//! - No HTTP types. The API crate decides how results become responses.
//! - Schemas and validators are immutable after construction and safe to
//!   share across threads.
//! - A [`ValidBody`] can only be produced by a validator; typed request
//!   values are produced from it via [`ValidBody::decode`].

pub mod definition;
pub mod validate;

pub use definition::{
    AdditionalProperties, EnumValues, FieldKind, FieldSpec, Schema, SchemaBuilder,
    SchemaDefinitionError, StringFormat,
};
pub use validate::{
    compile, Conforming, ConversionError, ValidBody, ValidationResult, ValidationViolations,
    Validator, Violation,
};
