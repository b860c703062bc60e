//! # People — `POST /`
//!
//! Echoes a person record. The schema is permissive: undeclared fields are
//! accepted and dropped.

use axum::routing::post;
use axum::{Json, Router};
use jsongate_schema::{
    AdditionalProperties, Conforming, FieldSpec, Schema, SchemaDefinitionError,
};
use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::extractors::Valid;
use crate::middleware::gate::{guard, Gate};
use crate::state::AppState;

pub const SCHEMA_NAME: &str = "person";

/// `{ id: string, name: string, timestamp: number }`, extra fields allowed.
pub fn schema() -> Result<Schema, SchemaDefinitionError> {
    Schema::builder(SCHEMA_NAME, AdditionalProperties::Allow)
        .field("id", FieldSpec::string())
        .field("name", FieldSpec::string())
        .field("timestamp", FieldSpec::number())
        .build()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PersonBody {
    pub id: String,
    pub name: String,
    pub timestamp: Number,
}

impl Conforming for PersonBody {
    const SCHEMA: &'static str = SCHEMA_NAME;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonEcho {
    pub sent_id: String,
    pub sent_name: String,
    pub sent_timestamp: Number,
}

impl From<PersonBody> for PersonEcho {
    fn from(body: PersonBody) -> Self {
        Self {
            sent_id: body.id,
            sent_name: body.name,
            sent_timestamp: body.timestamp,
        }
    }
}

/// Build the people router.
pub fn router(gate: Gate) -> Router<AppState> {
    Router::new().route("/", guard(post(echo_person), gate))
}

/// POST /: echo a validated person.
async fn echo_person(Valid(body): Valid<PersonBody>) -> Json<PersonEcho> {
    Json(body.into())
}
