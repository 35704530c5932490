//! Field aggregation
//!
//! Sums each requested field over all rows. Values are coerced to the field's
//! declared numeric kind; anything that does not coerce is a malformed row.

use super::types::{AggregateReport, AggregateTotals, FieldSpec, RowErrorPolicy, Total};
use crate::error::{Error, Result};
use crate::types::{NumericKind, Row};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Sum `fields` over `rows`, failing on the first malformed row
pub fn aggregate(rows: &[Row], fields: &[FieldSpec]) -> Result<AggregateTotals> {
    aggregate_with_policy(rows, fields, RowErrorPolicy::Abort).map(|report| report.totals)
}

/// Sum `fields` over `rows` with an explicit malformed-row policy
pub fn aggregate_with_policy(
    rows: &[Row],
    fields: &[FieldSpec],
    policy: RowErrorPolicy,
) -> Result<AggregateReport> {
    check_unique(fields)?;

    let mut sums: Vec<Total> = fields.iter().map(|f| Total::zero(f.kind)).collect();
    let mut skipped_rows = Vec::new();

    for (row_index, row) in rows.iter().enumerate() {
        match add_row(&sums, row, row_index, fields) {
            Ok(next) => sums = next,
            Err(e) => match policy {
                RowErrorPolicy::Abort => return Err(e),
                RowErrorPolicy::Skip => {
                    warn!("Skipping row: {}", e);
                    skipped_rows.push(row_index);
                }
            },
        }
    }

    debug!(
        "Aggregated {} fields over {} rows ({} skipped)",
        fields.len(),
        rows.len(),
        skipped_rows.len()
    );

    let totals = fields
        .iter()
        .zip(sums)
        .map(|(field, total)| (field.name.clone(), total))
        .collect();

    Ok(AggregateReport {
        totals: AggregateTotals::new(totals),
        rows_seen: rows.len(),
        skipped_rows,
    })
}

/// Reject an empty name or a field listed twice
pub fn check_unique(fields: &[FieldSpec]) -> Result<()> {
    let mut seen = HashSet::new();
    for field in fields {
        if field.name.trim().is_empty() {
            return Err(Error::invalid_value("fields", "field name must not be empty"));
        }
        if !seen.insert(field.name.as_str()) {
            return Err(Error::invalid_value(
                "fields",
                format!("field '{}' is listed more than once", field.name),
            ));
        }
    }
    Ok(())
}

/// Add one row to the running sums; the sums are untouched if any field fails
fn add_row(
    sums: &[Total],
    row: &Row,
    row_index: usize,
    fields: &[FieldSpec],
) -> Result<Vec<Total>> {
    let mut next = Vec::with_capacity(sums.len());
    for (sum, field) in sums.iter().zip(fields) {
        let value = coerce_field(row, field, row_index)?;
        let total = sum
            .checked_add(value)
            .ok_or_else(|| Error::malformed_row(&field.name, row_index, "integer overflow"))?;
        next.push(total);
    }
    Ok(next)
}

/// Coerce one field of a row to its declared kind
pub fn coerce_field(row: &Row, field: &FieldSpec, row_index: usize) -> Result<Total> {
    let malformed = |reason: String| Error::malformed_row(&field.name, row_index, reason);

    let object = row
        .as_object()
        .ok_or_else(|| malformed("row is not a JSON object".to_string()))?;
    let value = object
        .get(&field.name)
        .ok_or_else(|| malformed("is missing".to_string()))?;

    match field.kind {
        NumericKind::Integer => coerce_integer(value).map(Total::Integer).map_err(malformed),
        NumericKind::Float => coerce_float(value).map(Total::Float).map_err(malformed),
    }
}

fn coerce_integer(value: &Value) -> std::result::Result<i64, String> {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                return Ok(v);
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                    Ok(f as i64)
                }
                _ => Err(format!("expected an integer, got {n}")),
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("expected an integer, got string '{s}'")),
        other => Err(unexpected(other)),
    }
}

fn coerce_float(value: &Value) -> std::result::Result<f64, String> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("expected a number, got {n}")),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(f),
            _ => Err(format!("expected a number, got string '{s}'")),
        },
        other => Err(unexpected(other)),
    }
}

fn unexpected(value: &Value) -> String {
    match value {
        Value::Null => "is null".to_string(),
        Value::Bool(b) => format!("expected a number, got boolean {b}"),
        Value::Array(_) => "expected a number, got an array".to_string(),
        Value::Object(_) => "expected a number, got an object".to_string(),
        Value::Number(n) => format!("unexpected number {n}"),
        Value::String(s) => format!("unexpected string '{s}'"),
    }
}
