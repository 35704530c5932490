//! Query templates
//!
//! A `QueryTemplate` holds the filter parameters shared verbatim by every page
//! request of a run (date range, frequency, grouping dimensions, indicator
//! names). `with_page(n)` produces an immutable per-page `PageQuery`; the
//! page number is the only thing that varies between requests.

use crate::error::{Error, Result};
use crate::template::{self, TemplateContext};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Date format used by the `fbyfechaini` / `fbyfechafin` filters
pub const DATE_FORMAT: &str = "%Y%m%d";

/// Start-of-range filter key
pub const DATE_FROM_KEY: &str = "fbyfechaini";

/// End-of-range filter key
pub const DATE_TO_KEY: &str = "fbyfechafin";

/// Frequency filter key
pub const FREQUENCY_KEY: &str = "frecuencia";

/// Default page parameter name
pub const DEFAULT_PAGE_PARAM: &str = "page";

/// Shared filter parameters for all page requests of one query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryTemplate {
    params: BTreeMap<String, Value>,
}

impl QueryTemplate {
    /// Create an empty template
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a scalar parameter
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), Value::String(value.into()));
        self
    }

    /// Set a list parameter (e.g. grouping dimensions)
    #[must_use]
    pub fn list<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values
            .into_iter()
            .map(|v| Value::String(v.into()))
            .collect();
        self.params.insert(key.into(), Value::Array(values));
        self
    }

    /// Set the date range filters from `YYYYMMDD` strings
    #[must_use]
    pub fn date_range(self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.param(DATE_FROM_KEY, from).param(DATE_TO_KEY, to)
    }

    /// Set the frequency filter (e.g. `DIARIA`)
    #[must_use]
    pub fn frequency(self, frequency: impl Into<String>) -> Self {
        self.param(FREQUENCY_KEY, frequency)
    }

    /// Get a parameter value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Get a scalar parameter as a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }

    /// Iterate over parameters in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.params.iter()
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether the template has no parameters
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Build the query for one page
    pub fn with_page(&self, page: u32) -> PageQuery {
        self.with_page_param(DEFAULT_PAGE_PARAM, page)
    }

    /// Build the query for one page using a custom page parameter name
    pub fn with_page_param(&self, page_param: &str, page: u32) -> PageQuery {
        PageQuery {
            params: self.params.clone(),
            page_param: page_param.to_string(),
            page,
        }
    }

    /// Render `{{ var }}` templates in every value
    pub fn render(&self, ctx: &TemplateContext) -> Result<Self> {
        let mut params = BTreeMap::new();
        for (key, value) in &self.params {
            params.insert(key.clone(), template::render_value(value, ctx)?);
        }
        Ok(Self { params })
    }

    /// Validate parameter shapes and the date range, if present
    pub fn validate(&self) -> Result<()> {
        for (key, value) in &self.params {
            let ok = match value {
                Value::String(_) | Value::Number(_) | Value::Bool(_) => true,
                Value::Array(items) => items.iter().all(Value::is_string),
                _ => false,
            };
            if !ok {
                return Err(Error::invalid_value(
                    format!("query.{key}"),
                    "expected a scalar or a list of strings",
                ));
            }
        }

        let from = self.get_str(DATE_FROM_KEY).map(parse_date).transpose()?;
        let to = self.get_str(DATE_TO_KEY).map(parse_date).transpose()?;
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(Error::invalid_value(
                    DATE_TO_KEY,
                    format!(
                        "end date {} is before start date {}",
                        to.format(DATE_FORMAT),
                        from.format(DATE_FORMAT)
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Parse a `YYYYMMDD` date
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    if value.len() != 8 {
        return Err(Error::invalid_value(
            "date",
            format!("'{value}' is not in YYYYMMDD format"),
        ));
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| {
        Error::invalid_value("date", format!("'{value}' is not a valid YYYYMMDD date: {e}"))
    })
}

/// The query for a single page: the shared template plus the page number
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    params: BTreeMap<String, Value>,
    page_param: String,
    page: u32,
}

impl PageQuery {
    /// Page number requested
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Query-string pairs for GET requests; list values are joined with `,`
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .params
            .iter()
            .filter(|(key, _)| **key != self.page_param)
            .map(|(key, value)| (key.clone(), scalar_string(value)))
            .collect();
        pairs.push((self.page_param.clone(), self.page.to_string()));
        pairs
    }

    /// JSON body for POST requests; list values stay arrays
    pub fn to_json_body(&self) -> Value {
        let mut body = Map::new();
        for (key, value) in &self.params {
            body.insert(key.clone(), value.clone());
        }
        body.insert(self.page_param.clone(), Value::from(self.page));
        Value::Object(body)
    }
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(scalar_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
