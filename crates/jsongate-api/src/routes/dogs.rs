//! # Dogs — `POST /2`
//!
//! Echoes a dog record. The schema is strict: any undeclared field is a
//! violation, and the typed body refuses unknown fields as well.

use std::fmt;

use axum::routing::post;
use axum::{Json, Router};
use jsongate_schema::{
    AdditionalProperties, Conforming, EnumValues, FieldSpec, Schema, SchemaDefinitionError,
    StringFormat,
};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Number;
use uuid::Uuid;

use crate::extractors::Valid;
use crate::middleware::gate::{guard, Gate};
use crate::state::AppState;

pub const SCHEMA_NAME: &str = "dog";

/// Largest accepted `id`.
pub const MAX_ID: f64 = 3.0;

/// `{ id: number <= 3, dogId: uuid string, color: Color }`, no extra fields.
pub fn schema() -> Result<Schema, SchemaDefinitionError> {
    Schema::builder(SCHEMA_NAME, AdditionalProperties::Deny)
        .field("id", FieldSpec::number().maximum(MAX_ID))
        .field("dogId", FieldSpec::string().format(StringFormat::Uuid))
        .field("color", FieldSpec::enumeration::<Color>())
        .build()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Color {
    Blue,
    Brown,
    Yellow,
}

impl Color {
    pub const ALL: [Color; 3] = [Color::Blue, Color::Brown, Color::Yellow];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blue => "Blue",
            Self::Brown => "Brown",
            Self::Yellow => "Yellow",
        }
    }
}

impl EnumValues for Color {
    const VALUES: &'static [&'static str] = &["Blue", "Brown", "Yellow"];
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dog identifier: a UUID that keeps the exact text it was sent as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DogId {
    text: String,
    uuid: Uuid,
}

impl DogId {
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl Serialize for DogId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for DogId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let uuid = Uuid::parse_str(&text).map_err(D::Error::custom)?;
        Ok(Self { text, uuid })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DogBody {
    pub id: Number,
    pub dog_id: DogId,
    pub color: Color,
}

impl Conforming for DogBody {
    const SCHEMA: &'static str = SCHEMA_NAME;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DogEcho {
    pub sent_id: Number,
    pub sent_dog_id: DogId,
    pub sent_color: Color,
}

impl From<DogBody> for DogEcho {
    fn from(body: DogBody) -> Self {
        Self {
            sent_id: body.id,
            sent_dog_id: body.dog_id,
            sent_color: body.color,
        }
    }
}

/// Build the dogs router.
pub fn router(gate: Gate) -> Router<AppState> {
    Router::new().route("/2", guard(post(echo_dog), gate))
}

/// POST /2: echo a validated dog.
async fn echo_dog(Valid(body): Valid<DogBody>) -> Json<DogEcho> {
    tracing::debug!(dog_id = %body.dog_id.uuid(), color = %body.color, "dog accepted");
    Json(body.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn enum_values_match_rust_variants() {
        let names: Vec<&str> = Color::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(names, Color::VALUES);
        for color in Color::ALL {
            let parsed: Color = serde_json::from_value(json!(color.as_str())).unwrap();
            assert_eq!(parsed, color);
            assert_eq!(serde_json::to_value(color).unwrap(), json!(color.as_str()));
        }
    }

    #[test]
    fn dog_id_keeps_original_text() {
        let upper = "6F1C7B2E-3D4A-4C5B-9E8F-0A1B2C3D4E5F";
        let id: DogId = serde_json::from_value(json!(upper)).unwrap();
        assert_eq!(id.as_str(), upper);
        assert_eq!(id.uuid(), Uuid::parse_str(upper).unwrap());
        assert_eq!(serde_json::to_value(&id).unwrap(), json!(upper));
    }

    #[test]
    fn dog_id_rejects_garbage() {
        assert!(serde_json::from_value::<DogId>(json!("not-a-uuid")).is_err());
    }

    #[test]
    fn echo_serializes_camel_case() {
        let dog_id = Uuid::new_v4().to_string();
        let body: DogBody = serde_json::from_value(json!({
            "id": 2,
            "dogId": dog_id,
            "color": "Brown",
        }))
        .unwrap();
        assert_eq!(
            serde_json::to_value(DogEcho::from(body)).unwrap(),
            json!({"sentId": 2, "sentDogId": dog_id, "sentColor": "Brown"})
        );
    }

    #[test]
    fn schema_is_strict() {
        let schema = schema().unwrap();
        assert_eq!(schema.additional_properties(), AdditionalProperties::Deny);
        assert!(schema.field("dogId").is_some());
    }
}
