//! Decoder implementations

use super::types::{RecordDecoder, RecordShape};
use crate::error::{Error, Result};
use crate::types::Row;
use serde_json::Value;

/// JSON decoder that extracts records according to a `RecordShape`
#[derive(Debug, Clone, Default)]
pub struct JsonDecoder {
    shape: RecordShape,
}

impl JsonDecoder {
    /// Create a decoder for a bare JSON array body
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder for the given shape
    pub fn with_shape(shape: RecordShape) -> Self {
        Self { shape }
    }

    /// The configured shape
    pub fn shape(&self) -> &RecordShape {
        &self.shape
    }

    fn extract_records(&self, value: Value) -> Result<Vec<Row>> {
        match (&self.shape, value) {
            (RecordShape::BareList, Value::Array(records)) => Ok(records),
            (RecordShape::BareList, other) => Err(Error::decode(format!(
                "expected a JSON array of records, got {}",
                kind_name(&other)
            ))),
            (RecordShape::Field { name }, Value::Object(mut map)) => match map.remove(name) {
                Some(Value::Array(records)) => Ok(records),
                // A missing or null field means the page holds no records
                None | Some(Value::Null) => Ok(Vec::new()),
                Some(other) => Err(Error::decode(format!(
                    "expected field '{name}' to be an array, got {}",
                    kind_name(&other)
                ))),
            },
            (RecordShape::Field { name }, other) => Err(Error::decode(format!(
                "expected a JSON object with field '{name}', got {}",
                kind_name(&other)
            ))),
        }
    }
}

impl RecordDecoder for JsonDecoder {
    fn decode(&self, body: &str) -> Result<Vec<Row>> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| Error::decode(format!("Failed to parse JSON: {e}")))?;
        self.extract_records(value)
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
