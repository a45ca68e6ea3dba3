//! Query-related data models.
//!
//! This module defines parameter values, row sets and write results shared by
//! every statement the engine executes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Default row limit for previews and raw queries.
pub const DEFAULT_ROW_LIMIT: u32 = 100;

/// Maximum allowed row limit.
pub const MAX_ROW_LIMIT: u32 = 10000;

/// Default statement timeout in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u32 = 30;

/// Maximum statement timeout in seconds.
pub const MAX_QUERY_TIMEOUT_SECS: u32 = 300;

/// A single row keyed by column name.
pub type Row = serde_json::Map<String, JsonValue>;

/// A parameter value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryParam {
    Null,
    Bool(bool),
    /// Stored as i64 for maximum range
    Int(i64),
    /// Values above `i64::MAX` (BIGINT UNSIGNED)
    UInt(u64),
    Float(f64),
    String(String),
    /// Arrays and objects, bound as MySQL JSON
    Json(JsonValue),
}

impl QueryParam {
    /// Convert a JSON row value into a bindable parameter.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::UInt(u)
                } else {
                    Self::Float(n.as_f64().unwrap_or_default())
                }
            }
            JsonValue::String(s) => Self::String(s.clone()),
            JsonValue::Array(_) | JsonValue::Object(_) => Self::Json(value.clone()),
        }
    }

    /// Check if this parameter is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this parameter for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Json(_) => "json",
        }
    }
}

impl From<&str> for QueryParam {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for QueryParam {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for QueryParam {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

/// Input for the raw query passthrough.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub sql: String,
    /// Positional values for `?` placeholders
    #[serde(default)]
    pub params: Vec<JsonValue>,
    /// Default: 100, max: 10000
    #[serde(default)]
    pub limit: Option<u32>,
    /// Default: engine timeout, max: 300
    #[serde(default)]
    pub timeout_secs: Option<u32>,
}

impl QueryRequest {
    /// Create a new query request with default options.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
            limit: None,
            timeout_secs: None,
        }
    }

    /// Add a parameter to this query.
    pub fn with_param(mut self, param: impl Into<JsonValue>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Set the row limit.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout_secs: u32) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    /// Row limit override clamped to `[1, MAX_ROW_LIMIT]`, if any.
    pub fn effective_limit(&self) -> Option<u32> {
        self.limit.map(|l| l.clamp(1, MAX_ROW_LIMIT))
    }

    /// Get the effective timeout override, if any (with bounds checking).
    pub fn effective_timeout(&self) -> Option<u32> {
        self.timeout_secs.map(|t| t.clamp(1, MAX_QUERY_TIMEOUT_SECS))
    }

    /// Bindable parameters.
    pub fn bind_params(&self) -> Vec<QueryParam> {
        self.params.iter().map(QueryParam::from_json).collect()
    }
}

/// Clamp a requested row limit to `[1, MAX_ROW_LIMIT]`, defaulting to 100.
pub fn clamp_limit(limit: Option<u32>) -> u32 {
    limit
        .map(|l| l.clamp(1, MAX_ROW_LIMIT))
        .unwrap_or(DEFAULT_ROW_LIMIT)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMetadata {
    pub name: String,
    /// Engine type name (e.g., "INT", "VARCHAR")
    pub type_name: String,
    pub nullable: bool,
}

impl ColumnMetadata {
    /// Create new column metadata.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable,
        }
    }
}

/// Rows returned by a read statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub columns: Vec<ColumnMetadata>,
    pub rows: Vec<Row>,
    /// True if more rows existed than the limit allowed
    pub truncated: bool,
    pub row_count: usize,
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Create an empty result.
    pub fn empty(execution_time_ms: u64) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            truncated: false,
            row_count: 0,
            execution_time_ms,
        }
    }

    /// Check if the result is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Outcome of a write statement.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResult {
    pub rows_affected: u64,
    pub last_insert_id: u64,
    pub execution_time_ms: u64,
}

/// Result of the raw query passthrough: rows for reads, counters for writes.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum QueryOutcome {
    Rows(QueryResult),
    Write(ExecuteResult),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_param_from_json() {
        assert_eq!(QueryParam::from_json(&json!(null)), QueryParam::Null);
        assert_eq!(QueryParam::from_json(&json!(42)), QueryParam::Int(42));
        assert_eq!(
            QueryParam::from_json(&json!(u64::MAX)),
            QueryParam::UInt(u64::MAX)
        );
        assert_eq!(QueryParam::from_json(&json!(1.5)), QueryParam::Float(1.5));
        assert_eq!(
            QueryParam::from_json(&json!("a@x.com")),
            QueryParam::String("a@x.com".to_string())
        );
        assert_eq!(QueryParam::from_json(&json!([1, 2])).type_name(), "json");
    }

    #[test]
    fn test_query_request_defaults() {
        let req = QueryRequest::new("SELECT 1");
        assert_eq!(req.effective_limit(), None);
        assert_eq!(req.effective_timeout(), None);
    }

    #[test]
    fn test_query_request_bounds() {
        let req = QueryRequest::new("SELECT 1")
            .with_limit(99999)
            .with_timeout(999);

        assert_eq!(req.effective_limit(), Some(MAX_ROW_LIMIT));
        assert_eq!(req.effective_timeout(), Some(MAX_QUERY_TIMEOUT_SECS));

        let req = QueryRequest::new("SELECT 1").with_limit(0).with_timeout(0);
        assert_eq!(req.effective_limit(), Some(1));
        assert_eq!(req.effective_timeout(), Some(1));
    }

    #[test]
    fn test_zero_limit_is_clamped_to_one() {
        assert_eq!(clamp_limit(Some(0)), 1);
    }

    #[test]
    fn test_query_result_empty() {
        let result = QueryResult::empty(10);
        assert!(result.is_empty());
        assert_eq!(result.row_count, 0);
    }
}
