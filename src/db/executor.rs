//! Statement execution.
//!
//! This module provides statement execution with support for:
//! - Parameterized statements (values always travel as `?` bindings)
//! - Row limits (enforced via streaming - only fetches needed rows)
//! - Per-statement timeouts
//!
//! Every call carries an operation label (e.g. `"drop table shop.users"`)
//! that ends up in errors and logs.

use crate::db::params::bind_all;
use crate::db::types::RowToJson;
use crate::error::{DbError, DbResult};
use crate::models::{
    DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_ROW_LIMIT, ExecuteResult, MAX_ROW_LIMIT, QueryParam,
    QueryRequest, QueryResult,
};
use futures_util::StreamExt;
use sqlx::MySqlPool;
use sqlx::mysql::MySqlRow;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Executes statements against the shared pool under a timeout.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    default_timeout: Duration,
    default_limit: u32,
}

impl QueryExecutor {
    /// Create a new executor with default settings.
    pub fn new() -> Self {
        Self {
            default_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS as u64),
            default_limit: DEFAULT_ROW_LIMIT,
        }
    }

    /// Create a new executor with custom settings.
    pub fn with_defaults(timeout_secs: u64, row_limit: u32) -> Self {
        Self {
            default_timeout: Duration::from_secs(timeout_secs.max(1)),
            default_limit: row_limit.clamp(1, MAX_ROW_LIMIT),
        }
    }

    /// Copy of this executor with a different statement timeout.
    pub fn with_timeout(&self, query_timeout: Duration) -> Self {
        Self {
            default_timeout: query_timeout,
            default_limit: self.default_limit,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn default_limit(&self) -> u32 {
        self.default_limit
    }

    /// Execute a caller-supplied read statement honoring its limit and timeout.
    pub async fn execute_query(
        &self,
        pool: &MySqlPool,
        request: &QueryRequest,
    ) -> DbResult<QueryResult> {
        let row_limit = request.effective_limit().unwrap_or(self.default_limit);
        let params = request.bind_params();

        self.for_request(request)
            .fetch_limited(pool, &request.sql, &params, row_limit, "query")
            .await
    }

    /// Copy of this executor using the request's timeout override, if any.
    pub fn for_request(&self, request: &QueryRequest) -> Self {
        match request.effective_timeout() {
            Some(secs) => self.with_timeout(Duration::from_secs(u64::from(secs))),
            None => self.clone(),
        }
    }

    /// Fetch at most `row_limit` rows, flagging whether more existed.
    pub async fn fetch_limited(
        &self,
        pool: &MySqlPool,
        sql: &str,
        params: &[QueryParam],
        row_limit: u32,
        operation: &str,
    ) -> DbResult<QueryResult> {
        let start = Instant::now();
        let row_limit = row_limit.clamp(1, MAX_ROW_LIMIT);

        debug!(
            sql = %sql,
            params = params.len(),
            limit = row_limit,
            timeout_secs = self.default_timeout.as_secs(),
            operation,
            "Executing query"
        );

        // One extra row tells us whether the result was truncated
        let fetch_limit = row_limit as usize + 1;
        let rows_future = async {
            if params.is_empty() {
                use sqlx::Executor;
                pool.fetch(sql).take(fetch_limit).collect::<Vec<_>>().await
            } else {
                bind_all(sqlx::query(sql), params)
                    .fetch(pool)
                    .take(fetch_limit)
                    .collect::<Vec<_>>()
                    .await
            }
        };

        let rows = match timeout(self.default_timeout, rows_future).await {
            Ok(results) => collect_rows(pool, results, operation)?,
            Err(_) => return Err(timeout_error(operation, self.default_timeout)),
        };

        Ok(process_rows(rows, row_limit, start))
    }

    /// Fetch every row of a metadata statement.
    pub async fn fetch_all(
        &self,
        pool: &MySqlPool,
        sql: &str,
        params: &[QueryParam],
        operation: &str,
    ) -> DbResult<Vec<MySqlRow>> {
        debug!(sql = %sql, params = params.len(), operation, "Fetching rows");

        let result = if params.is_empty() {
            use sqlx::Executor;
            timeout(self.default_timeout, pool.fetch_all(sql)).await
        } else {
            timeout(
                self.default_timeout,
                bind_all(sqlx::query(sql), params).fetch_all(pool),
            )
            .await
        };

        match result {
            Ok(Ok(rows)) => Ok(rows),
            Ok(Err(e)) => Err(sqlx_error(pool, e, operation)),
            Err(_) => Err(timeout_error(operation, self.default_timeout)),
        }
    }

    /// Fetch at most one row.
    pub async fn fetch_optional(
        &self,
        pool: &MySqlPool,
        sql: &str,
        params: &[QueryParam],
        operation: &str,
    ) -> DbResult<Option<MySqlRow>> {
        debug!(sql = %sql, params = params.len(), operation, "Fetching row");

        let result = timeout(
            self.default_timeout,
            bind_all(sqlx::query(sql), params).fetch_optional(pool),
        )
        .await;

        match result {
            Ok(Ok(row)) => Ok(row),
            Ok(Err(e)) => Err(sqlx_error(pool, e, operation)),
            Err(_) => Err(timeout_error(operation, self.default_timeout)),
        }
    }

    /// Execute a DDL/DML statement and return affected rows and the last insert id.
    pub async fn execute(
        &self,
        pool: &MySqlPool,
        sql: &str,
        params: &[QueryParam],
        operation: &str,
    ) -> DbResult<ExecuteResult> {
        let start = Instant::now();

        debug!(
            sql = %sql,
            params = params.len(),
            timeout_secs = self.default_timeout.as_secs(),
            operation,
            "Executing statement"
        );

        // Without params, run through the text protocol: several
        // administrative statements cannot be prepared
        let result = if params.is_empty() {
            use sqlx::Executor;
            timeout(self.default_timeout, pool.execute(sql)).await
        } else {
            timeout(
                self.default_timeout,
                bind_all(sqlx::query(sql), params).execute(pool),
            )
            .await
        };

        match result {
            Ok(Ok(r)) => Ok(ExecuteResult {
                rows_affected: r.rows_affected(),
                last_insert_id: r.last_insert_id(),
                execution_time_ms: start.elapsed().as_millis() as u64,
            }),
            Ok(Err(e)) => Err(sqlx_error(pool, e, operation)),
            Err(_) => Err(timeout_error(operation, self.default_timeout)),
        }
    }
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn process_rows(rows: Vec<MySqlRow>, row_limit: u32, start: Instant) -> QueryResult {
    let execution_time_ms = start.elapsed().as_millis() as u64;

    let Some(first) = rows.first() else {
        return QueryResult::empty(execution_time_ms);
    };

    let columns = first.column_metadata();
    let total_rows = rows.len();
    let truncated = total_rows > row_limit as usize;

    let json_rows: Vec<_> = rows
        .iter()
        .take(row_limit as usize)
        .map(|r| r.to_json_map())
        .collect();

    if truncated {
        warn!(limit = row_limit, "Query result truncated");
    }

    QueryResult {
        columns,
        row_count: json_rows.len(),
        rows: json_rows,
        truncated,
        execution_time_ms,
    }
}

fn collect_rows<R>(
    pool: &MySqlPool,
    results: Vec<Result<R, sqlx::Error>>,
    operation: &str,
) -> DbResult<Vec<R>> {
    let mut rows = Vec::with_capacity(results.len());
    for result in results {
        rows.push(result.map_err(|e| sqlx_error(pool, e, operation))?);
    }
    Ok(rows)
}

/// Like [`DbError::from_sqlx`], but an acquire timeout reports the pool's
/// configured wait.
fn sqlx_error(pool: &MySqlPool, err: sqlx::Error, operation: &str) -> DbError {
    match err {
        sqlx::Error::PoolTimedOut => DbError::pool_timed_out(pool.options().get_acquire_timeout()),
        other => DbError::from_sqlx(other, operation),
    }
}

fn timeout_error(operation: &str, query_timeout: Duration) -> DbError {
    DbError::timeout(operation, query_timeout.as_secs())
}
