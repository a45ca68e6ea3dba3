//! Table level operations: introspection and DDL.
//!
//! Every mutation validates and builds its statement before the pool is
//! touched, then runs exactly one statement.

use crate::db::{PoolManager, QueryExecutor, SchemaInspector};
use crate::error::{DbError, DbResult};
use crate::models::{
    ColumnSpec, ConstraintDescriptor, ConstraintSpec, ConstraintType, ExecuteResult,
    TableDescriptor, TableSummary,
};
use crate::sql::ddl;
use std::sync::Arc;
use tracing::info;

pub struct TableHandler {
    pool_manager: Arc<PoolManager>,
    executor: QueryExecutor,
    inspector: SchemaInspector,
}

impl TableHandler {
    pub fn new(pool_manager: Arc<PoolManager>, executor: QueryExecutor) -> Self {
        Self {
            pool_manager,
            inspector: SchemaInspector::new(executor.clone()),
            executor,
        }
    }

    pub async fn list_tables(&self, database: &str) -> DbResult<Vec<TableSummary>> {
        let pool = self.pool_manager.get_pool().await?;
        self.inspector.list_tables(&pool, database).await
    }

    pub async fn table_details(&self, database: &str, table: &str) -> DbResult<TableDescriptor> {
        let pool = self.pool_manager.get_pool().await?;
        self.inspector.table_details(&pool, database, table).await
    }

    pub async fn table_constraints(
        &self,
        database: &str,
        table: &str,
    ) -> DbResult<Vec<ConstraintDescriptor>> {
        let pool = self.pool_manager.get_pool().await?;
        self.inspector.table_constraints(&pool, database, table).await
    }

    pub async fn table_code(&self, database: &str, table: &str) -> DbResult<String> {
        let pool = self.pool_manager.get_pool().await?;
        self.inspector.show_create_table(&pool, database, table).await
    }

    pub async fn create_table(
        &self,
        database: &str,
        table: &str,
        columns: &[ColumnSpec],
    ) -> DbResult<ExecuteResult> {
        let sql = ddl::create_table(database, table, columns)?;
        let result = self
            .run(&sql, format!("create table {}.{}", database, table))
            .await?;

        info!(database, table, columns = columns.len(), "Table created");
        Ok(result)
    }

    pub async fn add_columns(
        &self,
        database: &str,
        table: &str,
        columns: &[ColumnSpec],
    ) -> DbResult<ExecuteResult> {
        let sql = ddl::add_columns(database, table, columns)?;
        let result = self
            .run(&sql, format!("add columns to {}.{}", database, table))
            .await?;

        info!(database, table, columns = columns.len(), "Columns added");
        Ok(result)
    }

    /// Drop columns. The current primary key is read first so a partial
    /// composite key drop is refused before anything runs.
    pub async fn drop_columns(
        &self,
        database: &str,
        table: &str,
        columns: &[String],
    ) -> DbResult<ExecuteResult> {
        if columns.is_empty() {
            return Err(DbError::validation("No columns to drop"));
        }

        let pool = self.pool_manager.get_pool().await?;
        let existing = self.inspector.table_columns(&pool, database, table).await?;
        if existing.is_empty() {
            return Err(DbError::not_found(
                "Table",
                format!("Table '{}.{}' not found", database, table),
            ));
        }
        let primary_key: Vec<String> = existing
            .iter()
            .filter(|c| c.is_primary_key())
            .map(|c| c.name.clone())
            .collect();

        let sql = ddl::drop_columns(database, table, columns, &primary_key)?;
        let result = self
            .executor
            .execute(
                &pool,
                &sql,
                &[],
                &format!("drop columns from {}.{}", database, table),
            )
            .await?;

        info!(database, table, columns = ?columns, "Columns dropped");
        Ok(result)
    }

    pub async fn modify_column(
        &self,
        database: &str,
        table: &str,
        column: &ColumnSpec,
    ) -> DbResult<ExecuteResult> {
        let sql = ddl::modify_column(database, table, column)?;
        let result = self
            .run(
                &sql,
                format!("modify column {}.{}.{}", database, table, column.name),
            )
            .await?;

        info!(database, table, column = %column.name, "Column modified");
        Ok(result)
    }

    pub async fn rename_column(
        &self,
        database: &str,
        table: &str,
        from: &str,
        to: &str,
    ) -> DbResult<ExecuteResult> {
        let sql = ddl::rename_column(database, table, from, to)?;
        let result = self
            .run(&sql, format!("rename column {}.{}.{}", database, table, from))
            .await?;

        info!(database, table, from, to, "Column renamed");
        Ok(result)
    }

    pub async fn add_constraint(
        &self,
        database: &str,
        table: &str,
        spec: &ConstraintSpec,
    ) -> DbResult<ExecuteResult> {
        let sql = ddl::add_constraint(database, table, spec)?;
        let result = self
            .run(
                &sql,
                format!("add {} constraint to {}.{}", spec.constraint_type, database, table),
            )
            .await?;

        info!(
            database,
            table,
            constraint = ?spec.name,
            constraint_type = %spec.constraint_type,
            "Constraint added"
        );
        Ok(result)
    }

    pub async fn drop_constraint(
        &self,
        database: &str,
        table: &str,
        name: &str,
        constraint_type: Option<ConstraintType>,
    ) -> DbResult<ExecuteResult> {
        let sql = ddl::drop_constraint(database, table, name, constraint_type)?;
        let result = self
            .run(
                &sql,
                format!("drop constraint {} on {}.{}", name, database, table),
            )
            .await?;

        info!(database, table, constraint = %name, "Constraint dropped");
        Ok(result)
    }

    pub async fn rename_table(
        &self,
        database: &str,
        from: &str,
        to: &str,
    ) -> DbResult<ExecuteResult> {
        let sql = ddl::rename_table(database, from, to)?;
        let result = self
            .run(&sql, format!("rename table {}.{}", database, from))
            .await?;

        info!(database, from, to, "Table renamed");
        Ok(result)
    }

    pub async fn truncate_table(&self, database: &str, table: &str) -> DbResult<ExecuteResult> {
        let sql = ddl::truncate_table(database, table)?;
        let result = self
            .run(&sql, format!("truncate table {}.{}", database, table))
            .await?;

        info!(database, table, "Table truncated");
        Ok(result)
    }

    pub async fn drop_table(&self, database: &str, table: &str) -> DbResult<ExecuteResult> {
        let sql = ddl::drop_table(database, table)?;
        let result = self
            .run(&sql, format!("drop table {}.{}", database, table))
            .await?;

        info!(database, table, "Table dropped");
        Ok(result)
    }

    async fn run(&self, sql: &str, operation: String) -> DbResult<ExecuteResult> {
        let pool = self.pool_manager.get_pool().await?;
        self.executor.execute(&pool, sql, &[], &operation).await
    }
}
