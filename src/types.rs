//! Common types used throughout sicop-extract
//!
//! Shared type aliases and small enums used across multiple modules.

use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// One record returned by the indicators API (normally a flat JSON object)
pub type Row = JsonValue;

// ============================================================================
// HTTP Types
// ============================================================================

/// HTTP method used by a data endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    GET,
    POST,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => reqwest::Method::GET,
            Method::POST => reqwest::Method::POST,
        }
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Numeric Kind
// ============================================================================

/// Numeric type a field is coerced to before summing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericKind {
    /// Whole counts (leads, quotes, sales)
    #[default]
    Integer,
    /// Fractional values
    Float,
}

impl std::fmt::Display for NumericKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NumericKind::Integer => write!(f, "integer"),
            NumericKind::Float => write!(f, "float"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_serde() {
        let m: Method = serde_json::from_str("\"POST\"").unwrap();
        assert_eq!(m, Method::POST);
        assert_eq!(reqwest::Method::from(m), reqwest::Method::POST);
        assert_eq!(Method::default(), Method::GET);
    }

    #[test]
    fn test_numeric_kind_serde() {
        let k: NumericKind = serde_json::from_str("\"float\"").unwrap();
        assert_eq!(k, NumericKind::Float);
        assert_eq!(NumericKind::default(), NumericKind::Integer);
        assert_eq!(NumericKind::Float.to_string(), "float");
    }
}
