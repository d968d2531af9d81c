use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value as JsonValue};
use std::collections::BTreeMap;

/// Document fields keyed by name, in Firestore's typed wire representation.
pub type Fields = BTreeMap<String, Value>;

/// The body of a document write: `{"fields": {...}}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Document {
    #[serde(default)]
    pub fields: Fields,
}

/// A typed Firestore value.
///
/// Only the scalar types the proxy writes are modelled. `integerValue` is sent as the
/// JSON number the client supplied; Firestore itself answers with a decimal string,
/// so both forms are accepted when decoding.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    StringValue(String),
    #[serde(deserialize_with = "deserialize_integer")]
    IntegerValue(Number),
    BooleanValue(bool),
}

fn deserialize_integer<'de, D>(deserializer: D) -> Result<Number, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(Number),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Number(n) => Ok(n),
        Repr::Text(s) => s
            .parse::<i64>()
            .map(Number::from)
            .map_err(|e| D::Error::custom(format!("Failed to parse integer string '{}': {}", s, e))),
    }
}

impl Value {
    /// Maps a plain JSON value onto its wire type. Anything other than a string,
    /// number or boolean has no mapping.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::String(s) => Some(Self::StringValue(s.clone())),
            JsonValue::Number(n) => Some(Self::IntegerValue(n.clone())),
            JsonValue::Bool(b) => Some(Self::BooleanValue(*b)),
            JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::StringValue(s) => JsonValue::String(s.clone()),
            Self::IntegerValue(n) => JsonValue::Number(n.clone()),
            Self::BooleanValue(b) => JsonValue::Bool(*b),
        }
    }
}

/// Converts a flat JSON object into wire fields, dropping unsupported values.
pub fn encode_fields(object: &Map<String, JsonValue>) -> Fields {
    let mut fields = Fields::new();
    for (name, value) in object {
        match Value::from_json(value) {
            Some(value) => {
                fields.insert(name.clone(), value);
            }
            None => log::debug!("Dropping field '{}' with unsupported type", name),
        }
    }
    fields
}

/// Converts wire fields back into a flat JSON object.
pub fn decode_fields(fields: &Fields) -> Map<String, JsonValue> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), value.to_json()))
        .collect()
}
