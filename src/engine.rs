//! The admin engine facade.
//!
//! [`AdminEngine`] bundles one [`PoolManager`] with every operation handler so
//! a routing layer (the CLI here) has a single entry point. Construct it with
//! [`AdminEngine::new`], call [`initialize`](AdminEngine::initialize) once and
//! share it behind an `Arc`.

use crate::db::{PoolManager, QueryExecutor};
use crate::error::DbResult;
use crate::models::{
    ColumnDescriptor, ColumnSpec, ConnectionConfig, ConnectionInfo, ConstraintDescriptor,
    ConstraintSpec, ConstraintType, CreateUserRequest, DatabaseDescriptor, DeleteResult,
    DeleteRowsRequest, DumpRequest, DumpResult, ExecuteResult, ExportBundle, GrantRequest,
    GrantsResult, InsertResult, InsertRowsRequest, QueryOutcome, QueryRequest, RowSet,
    ServerOverview, TableDescriptor, TableSummary, UserDescriptor,
};
use crate::ops::{
    DatabaseHandler, ExportHandler, QueryHandler, RowHandler, TableHandler, UserHandler,
};
use schemars::schema_for;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub struct AdminEngine {
    pool_manager: Arc<PoolManager>,
    executor: QueryExecutor,
    databases: DatabaseHandler,
    tables: TableHandler,
    rows: RowHandler,
    users: UserHandler,
    export: ExportHandler,
    query: QueryHandler,
}

impl AdminEngine {
    /// Create an engine over `pool_manager` with the default executor.
    pub fn new(pool_manager: Arc<PoolManager>) -> Self {
        Self::with_executor(pool_manager, QueryExecutor::new())
    }

    pub fn with_executor(pool_manager: Arc<PoolManager>, executor: QueryExecutor) -> Self {
        Self {
            databases: DatabaseHandler::new(pool_manager.clone(), executor.clone()),
            tables: TableHandler::new(pool_manager.clone(), executor.clone()),
            rows: RowHandler::new(pool_manager.clone(), executor.clone()),
            users: UserHandler::new(pool_manager.clone(), executor.clone()),
            export: ExportHandler::new(pool_manager.clone(), executor.clone()),
            query: QueryHandler::new(pool_manager.clone(), executor.clone()),
            pool_manager,
            executor,
        }
    }

    /// Rebuild the handlers with a different statement timeout.
    pub fn with_timeout(self, query_timeout: Duration) -> Self {
        let dump_binary = self.export.dump_binary().to_string();
        let executor = self.executor.with_timeout(query_timeout);
        Self::with_executor(self.pool_manager, executor).with_dump_binary(dump_binary)
    }

    /// Use a different dump executable for [`dump_database`](Self::dump_database).
    pub fn with_dump_binary(mut self, binary: impl Into<String>) -> Self {
        self.export = ExportHandler::new(self.pool_manager.clone(), self.executor.clone())
            .with_dump_binary(binary);
        self
    }

    pub fn pool_manager(&self) -> &Arc<PoolManager> {
        &self.pool_manager
    }

    pub fn query_timeout(&self) -> Duration {
        self.executor.timeout()
    }

    // Lifecycle

    /// Create the shared pool. Idempotent.
    pub async fn initialize(&self, config: ConnectionConfig) -> DbResult<ConnectionInfo> {
        self.pool_manager.initialize(config).await
    }

    pub async fn shutdown(&self) {
        self.pool_manager.shutdown().await;
    }

    // Server and databases

    pub async fn list_databases(&self) -> DbResult<Vec<String>> {
        self.databases.list_databases().await
    }

    pub async fn connection_overview(&self) -> DbResult<ServerOverview> {
        self.databases.connection_overview().await
    }

    pub async fn database_overview(&self, database: &str) -> DbResult<DatabaseDescriptor> {
        self.databases.database_overview(database).await
    }

    pub async fn database_schema(
        &self,
        database: &str,
    ) -> DbResult<BTreeMap<String, Vec<ColumnDescriptor>>> {
        self.databases.database_schema(database).await
    }

    pub async fn database_code(&self, database: &str) -> DbResult<BTreeMap<String, String>> {
        self.databases.database_code(database).await
    }

    pub async fn create_database(
        &self,
        name: &str,
        charset: Option<&str>,
        collation: Option<&str>,
    ) -> DbResult<ExecuteResult> {
        self.databases
            .create_database(name, charset, collation)
            .await
    }

    pub async fn drop_database(&self, name: &str) -> DbResult<ExecuteResult> {
        self.databases.drop_database(name).await
    }

    // Tables

    pub async fn list_tables(&self, database: &str) -> DbResult<Vec<TableSummary>> {
        self.tables.list_tables(database).await
    }

    pub async fn table_details(&self, database: &str, table: &str) -> DbResult<TableDescriptor> {
        self.tables.table_details(database, table).await
    }

    pub async fn table_constraints(
        &self,
        database: &str,
        table: &str,
    ) -> DbResult<Vec<ConstraintDescriptor>> {
        self.tables.table_constraints(database, table).await
    }

    pub async fn table_code(&self, database: &str, table: &str) -> DbResult<String> {
        self.tables.table_code(database, table).await
    }

    pub async fn create_table(
        &self,
        database: &str,
        table: &str,
        columns: &[ColumnSpec],
    ) -> DbResult<ExecuteResult> {
        self.tables.create_table(database, table, columns).await
    }

    pub async fn add_columns(
        &self,
        database: &str,
        table: &str,
        columns: &[ColumnSpec],
    ) -> DbResult<ExecuteResult> {
        self.tables.add_columns(database, table, columns).await
    }

    pub async fn drop_columns(
        &self,
        database: &str,
        table: &str,
        columns: &[String],
    ) -> DbResult<ExecuteResult> {
        self.tables.drop_columns(database, table, columns).await
    }

    pub async fn modify_column(
        &self,
        database: &str,
        table: &str,
        column: &ColumnSpec,
    ) -> DbResult<ExecuteResult> {
        self.tables.modify_column(database, table, column).await
    }

    pub async fn rename_column(
        &self,
        database: &str,
        table: &str,
        from: &str,
        to: &str,
    ) -> DbResult<ExecuteResult> {
        self.tables.rename_column(database, table, from, to).await
    }

    pub async fn add_constraint(
        &self,
        database: &str,
        table: &str,
        spec: &ConstraintSpec,
    ) -> DbResult<ExecuteResult> {
        self.tables.add_constraint(database, table, spec).await
    }

    pub async fn drop_constraint(
        &self,
        database: &str,
        table: &str,
        name: &str,
        constraint_type: Option<ConstraintType>,
    ) -> DbResult<ExecuteResult> {
        self.tables
            .drop_constraint(database, table, name, constraint_type)
            .await
    }

    pub async fn rename_table(
        &self,
        database: &str,
        from: &str,
        to: &str,
    ) -> DbResult<ExecuteResult> {
        self.tables.rename_table(database, from, to).await
    }

    pub async fn truncate_table(&self, database: &str, table: &str) -> DbResult<ExecuteResult> {
        self.tables.truncate_table(database, table).await
    }

    pub async fn drop_table(&self, database: &str, table: &str) -> DbResult<ExecuteResult> {
        self.tables.drop_table(database, table).await
    }

    // Rows

    pub async fn insert_rows(&self, request: &InsertRowsRequest) -> DbResult<InsertResult> {
        self.rows.insert_rows(request).await
    }

    pub async fn delete_rows(&self, request: &DeleteRowsRequest) -> DbResult<DeleteResult> {
        self.rows.delete_rows(request).await
    }

    pub async fn select_rows(
        &self,
        database: &str,
        table: &str,
        limit: Option<u32>,
    ) -> DbResult<RowSet> {
        self.rows.select_rows(database, table, limit).await
    }

    pub async fn export_rows(
        &self,
        database: &str,
        table: &str,
        limit: Option<u32>,
    ) -> DbResult<ExportBundle> {
        self.rows.export_rows(database, table, limit).await
    }

    // Users and privileges

    pub async fn list_users(&self) -> DbResult<Vec<UserDescriptor>> {
        self.users.list_users().await
    }

    pub async fn get_grants(&self, user: &str, host: &str) -> DbResult<GrantsResult> {
        self.users.get_grants(user, host).await
    }

    pub async fn create_user(&self, request: &CreateUserRequest) -> DbResult<ExecuteResult> {
        self.users.create_user(request).await
    }

    pub async fn drop_user(&self, user: &str, host: &str) -> DbResult<ExecuteResult> {
        self.users.drop_user(user, host).await
    }

    pub async fn grant(&self, request: &GrantRequest) -> DbResult<ExecuteResult> {
        self.users.grant(request).await
    }

    pub async fn revoke(&self, request: &GrantRequest) -> DbResult<ExecuteResult> {
        self.users.revoke(request).await
    }

    pub async fn flush_privileges(&self) -> DbResult<ExecuteResult> {
        self.users.flush_privileges().await
    }

    // Export and passthrough

    pub async fn dump_database(&self, request: &DumpRequest) -> DbResult<DumpResult> {
        self.export.dump_database(request).await
    }

    pub async fn run_query(&self, request: &QueryRequest) -> DbResult<QueryOutcome> {
        self.query.run_query(request).await
    }
}

/// JSON Schemas of the structured request contracts, keyed by type name.
pub fn request_schemas() -> BTreeMap<&'static str, JsonValue> {
    BTreeMap::from([
        ("ColumnSpec", schema_for!(ColumnSpec).to_value()),
        ("ConstraintSpec", schema_for!(ConstraintSpec).to_value()),
        ("InsertRowsRequest", schema_for!(InsertRowsRequest).to_value()),
        ("DeleteRowsRequest", schema_for!(DeleteRowsRequest).to_value()),
        ("CreateUserRequest", schema_for!(CreateUserRequest).to_value()),
        ("GrantRequest", schema_for!(GrantRequest).to_value()),
        ("DumpRequest", schema_for!(DumpRequest).to_value()),
        ("QueryRequest", schema_for!(QueryRequest).to_value()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;

    #[tokio::test]
    async fn test_operations_before_initialize_fail() {
        let engine = AdminEngine::new(Arc::new(PoolManager::new()));
        assert!(matches!(
            engine.list_databases().await,
            Err(DbError::NotInitialized)
        ));
        assert!(matches!(
            engine.run_query(&QueryRequest::new("SELECT 1")).await,
            Err(DbError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_validation_runs_before_pool_access() {
        // An uninitialized pool would yield NotInitialized; validation must win.
        let engine = AdminEngine::new(Arc::new(PoolManager::new()));
        let result = engine
            .create_table("shop", "bad\0name", &[ColumnSpec::new("id", "INT")])
            .await;
        assert!(matches!(result, Err(DbError::Validation { .. })));

        let result = engine.drop_database("").await;
        assert!(matches!(result, Err(DbError::Validation { .. })));
    }

    #[test]
    fn test_with_timeout_keeps_dump_binary() {
        let engine = AdminEngine::new(Arc::new(PoolManager::new()))
            .with_dump_binary("/opt/mysql/bin/mysqldump")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(engine.query_timeout(), Duration::from_secs(5));
        assert_eq!(engine.export.dump_binary(), "/opt/mysql/bin/mysqldump");
    }

    #[test]
    fn test_request_schemas_cover_contracts() {
        let schemas = request_schemas();
        assert_eq!(schemas.len(), 8);
        let insert = &schemas["InsertRowsRequest"];
        assert!(insert["properties"].get("dbName").is_some());
        assert!(insert["properties"].get("tableName").is_some());
    }
}
