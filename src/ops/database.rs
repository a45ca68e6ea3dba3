//! Server and database level operations.

use crate::db::{PoolManager, QueryExecutor, SchemaInspector};
use crate::error::DbResult;
use crate::models::{ColumnDescriptor, DatabaseDescriptor, ExecuteResult, ServerOverview};
use crate::sql::ddl;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

pub struct DatabaseHandler {
    pool_manager: Arc<PoolManager>,
    executor: QueryExecutor,
    inspector: SchemaInspector,
}

impl DatabaseHandler {
    pub fn new(pool_manager: Arc<PoolManager>, executor: QueryExecutor) -> Self {
        Self {
            pool_manager,
            inspector: SchemaInspector::new(executor.clone()),
            executor,
        }
    }

    pub async fn list_databases(&self) -> DbResult<Vec<String>> {
        let pool = self.pool_manager.get_pool().await?;
        self.inspector.list_databases(&pool).await
    }

    /// Version, uptime, per-database sizes, variables and status.
    pub async fn connection_overview(&self) -> DbResult<ServerOverview> {
        let pool = self.pool_manager.get_pool().await?;
        self.inspector.server_overview(&pool).await
    }

    pub async fn database_overview(&self, database: &str) -> DbResult<DatabaseDescriptor> {
        let pool = self.pool_manager.get_pool().await?;
        self.inspector.database_overview(&pool, database).await
    }

    pub async fn database_schema(
        &self,
        database: &str,
    ) -> DbResult<BTreeMap<String, Vec<ColumnDescriptor>>> {
        let pool = self.pool_manager.get_pool().await?;
        self.inspector.database_schema(&pool, database).await
    }

    /// `SHOW CREATE TABLE` output for every table, keyed by table name.
    pub async fn database_code(&self, database: &str) -> DbResult<BTreeMap<String, String>> {
        let pool = self.pool_manager.get_pool().await?;
        self.inspector.database_code(&pool, database).await
    }

    pub async fn create_database(
        &self,
        name: &str,
        charset: Option<&str>,
        collation: Option<&str>,
    ) -> DbResult<ExecuteResult> {
        let sql = ddl::create_database(name, charset, collation)?;
        let pool = self.pool_manager.get_pool().await?;

        let result = self
            .executor
            .execute(&pool, &sql, &[], &format!("create database {}", name))
            .await?;

        info!(database = %name, charset = ?charset, collation = ?collation, "Database created");
        Ok(result)
    }

    pub async fn drop_database(&self, name: &str) -> DbResult<ExecuteResult> {
        let sql = ddl::drop_database(name)?;
        let pool = self.pool_manager.get_pool().await?;

        let result = self
            .executor
            .execute(&pool, &sql, &[], &format!("drop database {}", name))
            .await?;

        info!(database = %name, "Database dropped");
        Ok(result)
    }
}
