//! Template interpolation for run profiles
//!
//! Handles `{{ variable }}` interpolation in endpoint URLs, query values and
//! export file names. Variables are looked up in a flat or nested JSON
//! context, e.g. `{{ marca }}` or `{{ run.date }}`.

use crate::error::{Error, Result};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Regex for matching template variables: {{ variable.path }}
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\s*\}\}").unwrap()
});

/// Variables available to templates
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    vars: Map<String, Value>,
}

impl TemplateContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a variable in place
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Get a value by dotted path (e.g. "run.date")
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.vars.get(parts.next()?)?;
        for part in parts {
            match current {
                Value::Object(map) => current = map.get(part)?,
                _ => return None,
            }
        }
        Some(current)
    }
}

/// Render a template string with the given context
pub fn render(template: &str, ctx: &TemplateContext) -> Result<String> {
    let mut result = template.to_string();
    let mut errors = Vec::new();

    for cap in TEMPLATE_REGEX.captures_iter(template) {
        let full_match = cap.get(0).unwrap().as_str();
        let var_path = cap.get(1).unwrap().as_str();

        match ctx.get(var_path) {
            Some(value) => {
                let replacement = value_to_string(value);
                result = result.replace(full_match, &replacement);
            }
            None => {
                errors.push(var_path.to_string());
            }
        }
    }

    if errors.is_empty() {
        Ok(result)
    } else {
        Err(Error::undefined_var(errors.join(", ")))
    }
}

/// Check if a string contains template variables
pub fn has_templates(s: &str) -> bool {
    TEMPLATE_REGEX.is_match(s)
}

/// Extract all variable names from a template
pub fn extract_variables(template: &str) -> Vec<String> {
    TEMPLATE_REGEX
        .captures_iter(template)
        .map(|cap| cap.get(1).unwrap().as_str().to_string())
        .collect()
}

/// Convert a JSON value to a string for template substitution
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Render all string values in a JSON value (keys are left untouched)
pub fn render_value(value: &Value, ctx: &TemplateContext) -> Result<Value> {
    match value {
        Value::String(s) if has_templates(s) => Ok(Value::String(render(s, ctx)?)),
        Value::Object(map) => {
            let mut new_map = Map::new();
            for (k, v) in map {
                new_map.insert(k.clone(), render_value(v, ctx)?);
            }
            Ok(Value::Object(new_map))
        }
        Value::Array(arr) => {
            let new_arr: Result<Vec<Value>> = arr.iter().map(|v| render_value(v, ctx)).collect();
            Ok(Value::Array(new_arr?))
        }
        _ => Ok(value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_substitution() {
        let ctx = TemplateContext::new().with("marca", "acme");
        let result = render(
            "https://api.sicopweb.com/bi/prod/indicadores20/{{ marca }}/nacional",
            &ctx,
        )
        .unwrap();
        assert_eq!(
            result,
            "https://api.sicopweb.com/bi/prod/indicadores20/acme/nacional"
        );
    }

    #[test]
    fn test_nested_value() {
        let ctx = TemplateContext::new().with("run", json!({"date": "2026-01-18"}));
        let result = render("{{ run.date }}_quickcount.csv", &ctx).unwrap();
        assert_eq!(result, "2026-01-18_quickcount.csv");
    }

    #[test]
    fn test_undefined_variable() {
        let ctx = TemplateContext::new();
        let result = render("{{ marca }}/{{ run.missing }}", &ctx);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("marca"));
        assert!(err.contains("run.missing"));
    }

    #[test]
    fn test_no_templates() {
        let ctx = TemplateContext::new();
        let result = render("plain string without templates", &ctx).unwrap();
        assert_eq!(result, "plain string without templates");
    }

    #[test]
    fn test_has_templates() {
        assert!(has_templates("{{ marca }}"));
        assert!(has_templates("prefix {{ run.date }} suffix"));
        assert!(!has_templates("no templates here"));
        assert!(!has_templates("{ not a template }"));
    }

    #[test]
    fn test_extract_variables() {
        let vars = extract_variables("{{ marca }} and {{ run.date }}");
        assert_eq!(vars, vec!["marca", "run.date"]);
    }

    #[test]
    fn test_render_value_lists() {
        let ctx = TemplateContext::new().with("marca", "acme");
        let input = json!({
            "origen": "{{ marca }}",
            "gby": ["zona", "region"],
            "page": 1
        });

        let result = render_value(&input, &ctx).unwrap();
        assert_eq!(
            result,
            json!({"origen": "acme", "gby": ["zona", "region"], "page": 1})
        );
    }

    #[test]
    fn test_whitespace_in_template() {
        let ctx = TemplateContext::new().with("key", "value");
        assert_eq!(render("{{key}}", &ctx).unwrap(), "value");
        assert_eq!(render("{{ key }}", &ctx).unwrap(), "value");
        assert_eq!(render("{{  key  }}", &ctx).unwrap(), "value");
    }

    #[test]
    fn test_number_substitution() {
        let ctx = TemplateContext::new().with("limit", 100).with("enabled", true);
        let result = render("limit={{ limit }}&enabled={{ enabled }}", &ctx).unwrap();
        assert_eq!(result, "limit=100&enabled=true");
    }
}
