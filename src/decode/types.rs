//! Decoder types and traits
//!
//! Defines where the records live inside a response body.

use crate::error::Result;
use crate::types::Row;
use serde::{Deserialize, Serialize};

/// Location of the records inside a JSON response body
///
/// In YAML this is either the keyword `list` (the body is a bare array) or a
/// mapping `{ field: data }` (the body is an object holding the array).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RecordShapeRepr", into = "RecordShapeRepr")]
pub enum RecordShape {
    /// The body is a JSON array of records (default)
    #[default]
    BareList,
    /// The body is a JSON object; records are read from the named field
    Field {
        /// Field holding the record array
        name: String,
    },
}

impl RecordShape {
    /// Records under the given object field
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field { name: name.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RecordShapeRepr {
    Keyword(String),
    Field { field: String },
}

impl TryFrom<RecordShapeRepr> for RecordShape {
    type Error = String;

    fn try_from(repr: RecordShapeRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            RecordShapeRepr::Keyword(k) if k == "list" => Ok(RecordShape::BareList),
            RecordShapeRepr::Keyword(k) => Err(format!(
                "unknown record shape '{k}', expected 'list' or {{ field: <name> }}"
            )),
            RecordShapeRepr::Field { field } if field.is_empty() => {
                Err("record field name must not be empty".to_string())
            }
            RecordShapeRepr::Field { field } => Ok(RecordShape::Field { name: field }),
        }
    }
}

impl From<RecordShape> for RecordShapeRepr {
    fn from(shape: RecordShape) -> Self {
        match shape {
            RecordShape::BareList => RecordShapeRepr::Keyword("list".to_string()),
            RecordShape::Field { name } => RecordShapeRepr::Field { field: name },
        }
    }
}

/// Trait for decoding response bodies into records
pub trait RecordDecoder: Send + Sync {
    /// Decode the response body into an ordered batch of records
    fn decode(&self, body: &str) -> Result<Vec<Row>>;
}
