//! Aggregation types

use crate::types::NumericKind;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// A field to sum and the numeric kind its values are coerced to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name in each row
    pub name: String,
    /// Numeric kind (defaults to integer)
    #[serde(default)]
    pub kind: NumericKind,
}

impl FieldSpec {
    /// Create a field spec
    pub fn new(name: impl Into<String>, kind: NumericKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// An integer field
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, NumericKind::Integer)
    }

    /// A float field
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, NumericKind::Float)
    }
}

/// Running or final sum of one field
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Total {
    /// Integer sum
    Integer(i64),
    /// Float sum
    Float(f64),
}

impl Total {
    /// The additive identity for a numeric kind
    pub fn zero(kind: NumericKind) -> Self {
        match kind {
            NumericKind::Integer => Total::Integer(0),
            NumericKind::Float => Total::Float(0.0),
        }
    }

    /// Add two totals of the same kind; `None` on integer overflow
    pub(crate) fn checked_add(self, other: Total) -> Option<Total> {
        match (self, other) {
            (Total::Integer(a), Total::Integer(b)) => a.checked_add(b).map(Total::Integer),
            (Total::Float(a), Total::Float(b)) => Some(Total::Float(a + b)),
            (Total::Integer(a), Total::Float(b)) | (Total::Float(b), Total::Integer(a)) => {
                Some(Total::Float(a as f64 + b))
            }
        }
    }

    /// The value as `i64`, if this is an integer total
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Total::Integer(v) => Some(*v),
            Total::Float(_) => None,
        }
    }

    /// The value as `f64`
    pub fn as_f64(&self) -> f64 {
        match self {
            Total::Integer(v) => *v as f64,
            Total::Float(v) => *v,
        }
    }
}

impl fmt::Display for Total {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Total::Integer(v) => write!(f, "{v}"),
            Total::Float(v) => write!(f, "{v}"),
        }
    }
}

/// Field totals in the order the fields were requested
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregateTotals {
    totals: Vec<(String, Total)>,
}

impl AggregateTotals {
    pub(crate) fn new(totals: Vec<(String, Total)>) -> Self {
        Self { totals }
    }

    /// Total for a field
    pub fn get(&self, name: &str) -> Option<Total> {
        self.totals
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, total)| *total)
    }

    /// Iterate over `(field, total)` in requested order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Total)> {
        self.totals.iter().map(|(field, total)| (field.as_str(), *total))
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.totals.len()
    }

    /// Whether no fields were aggregated
    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

impl fmt::Display for AggregateTotals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, total)) in self.totals.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "Total {field}: {total}")?;
        }
        Ok(())
    }
}

impl Serialize for AggregateTotals {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.totals.len()))?;
        for (field, total) in &self.totals {
            map.serialize_entry(field, total)?;
        }
        map.end()
    }
}

/// How the aggregator treats a row whose field cannot be coerced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowErrorPolicy {
    /// Stop with `MalformedRow`
    #[default]
    Abort,
    /// Leave the whole row out of every total and carry on
    Skip,
}

/// Totals plus bookkeeping about the rows that went into them
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AggregateReport {
    /// Field totals
    pub totals: AggregateTotals,
    /// Rows examined
    pub rows_seen: usize,
    /// Indexes of rows left out under `RowErrorPolicy::Skip`
    pub skipped_rows: Vec<usize>,
}
