//! Aggregation module
//!
//! Turns the merged rows of a result set into one total per requested field.

mod aggregator;
mod types;

pub use aggregator::{aggregate, aggregate_with_policy, check_unique, coerce_field};
pub use types::{AggregateReport, AggregateTotals, FieldSpec, RowErrorPolicy, Total};
