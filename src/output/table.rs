//! Relational table sink (DuckDB)
//!
//! Replaces the contents of one table with the rows of a result set: the
//! table is emptied once, then each page is inserted in its own transaction.
//! A page whose insert fails is rolled back and logged; earlier and later
//! pages are kept.

use crate::error::{Error, Result};
use crate::pagination::ResultSet;
use crate::types::Row;
use duckdb::types::Value as SqlValue;
use duckdb::{params_from_iter, Connection};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, error, info};

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// SQL type of a table column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// VARCHAR
    #[default]
    Text,
    /// BIGINT
    Integer,
    /// DOUBLE
    Float,
}

impl ColumnType {
    fn sql(self) -> &'static str {
        match self {
            ColumnType::Text => "VARCHAR",
            ColumnType::Integer => "BIGINT",
            ColumnType::Float => "DOUBLE",
        }
    }
}

/// One table column, filled from the row field of the same name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableColumn {
    /// Column (and row field) name
    pub name: String,
    /// SQL type
    #[serde(default, rename = "type")]
    pub column_type: ColumnType,
}

impl TableColumn {
    /// Create a column
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Table sink settings of a run profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Table name
    pub table: String,
    /// Columns, in insert order
    pub columns: Vec<TableColumn>,
}

impl TableConfig {
    /// Check table and column names are plain identifiers
    pub fn validate(&self) -> Result<()> {
        if !IDENTIFIER.is_match(&self.table) {
            return Err(Error::invalid_value(
                "table.table",
                format!("'{}' is not a valid table name", self.table),
            ));
        }
        if self.columns.is_empty() {
            return Err(Error::invalid_value("table.columns", "at least one column is required"));
        }
        for column in &self.columns {
            if !IDENTIFIER.is_match(&column.name) {
                return Err(Error::invalid_value(
                    "table.columns",
                    format!("'{}' is not a valid column name", column.name),
                ));
            }
        }
        Ok(())
    }

    fn create_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| format!("\"{}\" {}", c.name, c.column_type.sql()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE IF NOT EXISTS {} ({columns})", self.table)
    }

    fn insert_sql(&self) -> String {
        let names = self
            .columns
            .iter()
            .map(|c| format!("\"{}\"", c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; self.columns.len()].join(", ");
        format!("INSERT INTO {} ({names}) VALUES ({placeholders})", self.table)
    }
}

/// Outcome of loading a result set into a table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableLoadSummary {
    /// Rows committed
    pub rows_inserted: usize,
    /// Pages whose batch was rolled back
    pub failed_pages: Vec<u32>,
}

/// Loads result sets into a DuckDB table
pub struct TableSink {
    conn: Connection,
    config: TableConfig,
}

impl TableSink {
    /// Open (or create) a database file and make sure the table exists
    pub fn open(path: impl AsRef<Path>, config: TableConfig) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        Self::with_connection(conn, config)
    }

    /// Use an in-memory database
    pub fn open_in_memory(config: TableConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, config)
    }

    fn with_connection(conn: Connection, config: TableConfig) -> Result<Self> {
        config.validate()?;
        conn.execute_batch(&config.create_sql())?;
        Ok(Self { conn, config })
    }

    /// Remove every row from the table
    pub fn truncate(&self) -> Result<()> {
        debug!("Truncating table {}", self.config.table);
        self.conn
            .execute_batch(&format!("DELETE FROM {}", self.config.table))?;
        Ok(())
    }

    /// Insert one page of rows in a single transaction
    ///
    /// On failure nothing from this page is kept.
    pub fn insert_batch(&mut self, rows: &[Row]) -> Result<usize> {
        let sql = self.config.insert_sql();
        let columns = &self.config.columns;
        let tx = self.conn.transaction()?;

        let result = (|| -> Result<usize> {
            let mut stmt = tx.prepare(&sql)?;
            for (index, row) in rows.iter().enumerate() {
                let params = row_params(row, index, columns)?;
                stmt.execute(params_from_iter(params))?;
            }
            Ok(rows.len())
        })();

        match result {
            Ok(count) => {
                tx.commit()?;
                Ok(count)
            }
            Err(e) => {
                tx.rollback()?;
                Err(e)
            }
        }
    }

    /// Truncate, then insert each page of `result` as its own batch
    pub fn load(&mut self, result: &ResultSet) -> Result<TableLoadSummary> {
        self.truncate()?;

        let mut summary = TableLoadSummary::default();
        for batch in result.pages() {
            match self.insert_batch(&batch.records) {
                Ok(count) => {
                    debug!("Inserted {} rows from page {}", count, batch.page);
                    summary.rows_inserted += count;
                }
                Err(e) => {
                    error!("Rolled back batch for page {}: {}", batch.page, e);
                    summary.failed_pages.push(batch.page);
                }
            }
        }

        info!(
            "Loaded {} rows into {}",
            summary.rows_inserted, self.config.table
        );
        Ok(summary)
    }

    /// Number of rows currently in the table
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.config.table),
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Table configuration
    pub fn config(&self) -> &TableConfig {
        &self.config
    }
}

fn row_params(row: &Row, index: usize, columns: &[TableColumn]) -> Result<Vec<SqlValue>> {
    let object = row
        .as_object()
        .ok_or_else(|| Error::output(format!("row {index} is not a JSON object")))?;

    columns
        .iter()
        .map(|column| match object.get(&column.name) {
            None | Some(Value::Null) => Ok(SqlValue::Null),
            Some(value) => to_sql_value(value, column.column_type).ok_or_else(|| {
                Error::output(format!(
                    "row {index}: cannot store {value} in {} column '{}'",
                    column.column_type.sql(),
                    column.name
                ))
            }),
        })
        .collect()
}

fn to_sql_value(value: &Value, column_type: ColumnType) -> Option<SqlValue> {
    match column_type {
        ColumnType::Text => Some(SqlValue::Text(match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })),
        ColumnType::Integer => match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
        .map(SqlValue::BigInt),
        ColumnType::Float => match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .map(SqlValue::Double),
    }
}
