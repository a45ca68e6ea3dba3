//! Data models for the admin engine.
//!
//! This module re-exports all model types used throughout the crate.

pub mod connection;
pub mod data;
pub mod export;
pub mod privilege;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use connection::{ConnectionConfig, ConnectionInfo, DEFAULT_MYSQL_PORT};
pub use data::{
    DeleteResult, DeleteRowsRequest, ExportBundle, InsertResult, InsertRowsRequest, RowSet,
};
pub use export::{DumpRequest, DumpResult};
pub use privilege::{
    CreateUserRequest, DEFAULT_USER_HOST, GrantEntry, GrantLine, GrantRequest, GrantsResult,
    UserDescriptor,
};
pub use query::{
    ColumnMetadata, DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_ROW_LIMIT, ExecuteResult,
    MAX_QUERY_TIMEOUT_SECS, MAX_ROW_LIMIT, QueryOutcome, QueryParam, QueryRequest, QueryResult,
    Row, clamp_limit,
};
pub use schema::{
    CheckAssociation, ColumnDescriptor, ColumnKey, ColumnSpec, ConstraintDescriptor,
    ConstraintSpec, ConstraintType, DatabaseDescriptor, DatabaseSummary, ForeignKeyAction,
    IndexInfo, LargestTable, ReplicationInfo, ServerOverview, ServerTotals, TableDescriptor,
    TableSummary,
};
