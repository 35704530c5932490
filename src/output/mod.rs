//! Output module
//!
//! # Overview
//!
//! Two optional sinks for a finished result set:
//! - a delimited text file named after the run date and query filters
//! - a DuckDB table, reloaded page by page

mod csv;
mod table;

pub use csv::{
    csv_file_name, escape_field, format_value, write_rows, CsvConfig, CsvWriter,
    DEFAULT_DELIMITER,
};
pub use table::{ColumnType, TableColumn, TableConfig, TableLoadSummary, TableSink};
