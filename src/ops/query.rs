//! Raw statement passthrough.

use crate::db::{PoolManager, QueryExecutor};
use crate::error::{DbError, DbResult};
use crate::models::{QueryOutcome, QueryRequest};
use crate::sql::dml::is_read_statement;
use std::sync::Arc;
use tracing::info;

pub struct QueryHandler {
    pool_manager: Arc<PoolManager>,
    executor: QueryExecutor,
}

impl QueryHandler {
    pub fn new(pool_manager: Arc<PoolManager>, executor: QueryExecutor) -> Self {
        Self {
            pool_manager,
            executor,
        }
    }

    /// Run caller-supplied SQL.
    ///
    /// Statements starting with SELECT, SHOW, DESCRIBE, DESC, EXPLAIN or WITH
    /// return rows (limit enforced while streaming); everything else returns
    /// affected rows and the last insert id.
    pub async fn run_query(&self, request: &QueryRequest) -> DbResult<QueryOutcome> {
        if request.sql.trim().is_empty() {
            return Err(DbError::validation("SQL statement cannot be empty"));
        }
        let pool = self.pool_manager.get_pool().await?;

        if is_read_statement(&request.sql) {
            let result = self.executor.execute_query(&pool, request).await?;
            return Ok(QueryOutcome::Rows(result));
        }

        let result = self
            .executor
            .for_request(request)
            .execute(&pool, &request.sql, &request.bind_params(), "query")
            .await?;

        info!(
            rows_affected = result.rows_affected,
            execution_time_ms = result.execution_time_ms,
            "Statement executed"
        );
        Ok(QueryOutcome::Write(result))
    }
}
