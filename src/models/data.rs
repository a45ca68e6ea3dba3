//! Row-level request and result models.

use super::query::{ColumnMetadata, Row};
use super::schema::{ColumnDescriptor, ConstraintDescriptor, IndexInfo};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Input for a multi-row insert.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InsertRowsRequest {
    pub db_name: String,
    pub table_name: String,
    /// Every row must carry the same set of keys
    pub rows: Vec<Row>,
}

/// Input for snapshot-based delete.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRowsRequest {
    pub db_name: String,
    pub table_name: String,
    /// Full row snapshots; every field is matched by equality
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertResult {
    pub affected_rows: u64,
    pub last_insert_id: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub affected_rows: u64,
    pub statements_executed: usize,
    /// Snapshots that matched more than one row (duplicates or no primary key)
    pub over_matched_snapshots: usize,
}

/// Preview rows of one table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowSet {
    pub columns: Vec<ColumnMetadata>,
    pub rows: Vec<Row>,
    pub truncated: bool,
    pub execution_time_ms: u64,
}

/// Everything needed to recreate and repopulate one table elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub database: String,
    pub table: String,
    #[serde(rename = "sizeKB")]
    pub size_kb: f64,
    pub columns: Vec<ColumnDescriptor>,
    pub foreign_keys: Vec<ConstraintDescriptor>,
    pub indexes: Vec<IndexInfo>,
    pub rows: Vec<Row>,
    pub row_count: usize,
    /// True if the row limit cut the export short
    pub truncated: bool,
}
