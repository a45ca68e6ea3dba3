//! Row operations: insert, snapshot delete, preview and export.

use crate::db::{PoolManager, QueryExecutor, SchemaInspector};
use crate::error::{DbError, DbResult};
use crate::models::{
    DeleteResult, DeleteRowsRequest, ExecuteResult, ExportBundle, InsertResult, InsertRowsRequest,
    MAX_ROW_LIMIT, RowSet, clamp_limit,
};
use crate::sql::dml::{self, SnapshotColumns, SnapshotMatch};
use std::sync::Arc;
use tracing::{info, warn};

pub struct RowHandler {
    pool_manager: Arc<PoolManager>,
    executor: QueryExecutor,
    inspector: SchemaInspector,
}

impl RowHandler {
    pub fn new(pool_manager: Arc<PoolManager>, executor: QueryExecutor) -> Self {
        Self {
            pool_manager,
            inspector: SchemaInspector::new(executor.clone()),
            executor,
        }
    }

    /// Insert every row with one multi-row statement.
    pub async fn insert_rows(&self, request: &InsertRowsRequest) -> DbResult<InsertResult> {
        let stmt = dml::insert_rows(&request.db_name, &request.table_name, &request.rows)?;
        let pool = self.pool_manager.get_pool().await?;

        let result = self
            .executor
            .execute(
                &pool,
                &stmt.sql,
                &stmt.params,
                &format!("insert into {}.{}", request.db_name, request.table_name),
            )
            .await?;

        info!(
            database = %request.db_name,
            table = %request.table_name,
            rows = request.rows.len(),
            affected_rows = result.rows_affected,
            "Rows inserted"
        );

        Ok(InsertResult {
            affected_rows: result.rows_affected,
            last_insert_id: result.last_insert_id,
        })
    }

    /// Delete rows by full snapshot, one statement per snapshot.
    ///
    /// Statements are not wrapped in a transaction. If statement N fails after
    /// earlier ones succeeded, the error is a `PartialFailure` carrying the
    /// completed count and rows already removed.
    pub async fn delete_rows(&self, request: &DeleteRowsRequest) -> DbResult<DeleteResult> {
        if request.rows.is_empty() {
            return Err(DbError::validation("No rows to delete"));
        }
        let pool = self.pool_manager.get_pool().await?;

        let columns: SnapshotColumns = self
            .inspector
            .table_columns(&pool, &request.db_name, &request.table_name)
            .await?
            .into_iter()
            .map(|c| {
                let kind = SnapshotMatch::for_column_type(&c.column_type);
                (c.name.to_lowercase(), kind)
            })
            .collect();

        let statements = request
            .rows
            .iter()
            .map(|snapshot| {
                dml::delete_snapshot(&request.db_name, &request.table_name, snapshot, &columns)
            })
            .collect::<DbResult<Vec<_>>>()?;

        let operation = format!("delete from {}.{}", request.db_name, request.table_name);
        let mut progress = DeleteProgress::new(&operation, statements.len());

        for (index, stmt) in statements.iter().enumerate() {
            let outcome = self
                .executor
                .execute(&pool, &stmt.sql, &stmt.params, &operation)
                .await;
            progress.record(index, outcome)?;
        }

        let result = progress.finish();
        info!(
            database = %request.db_name,
            table = %request.table_name,
            affected_rows = result.affected_rows,
            statements = result.statements_executed,
            "Rows deleted"
        );
        Ok(result)
    }

    /// Preview the first `limit` rows (default 100, clamped to [1, 10000]).
    pub async fn select_rows(
        &self,
        database: &str,
        table: &str,
        limit: Option<u32>,
    ) -> DbResult<RowSet> {
        let limit = clamp_limit(limit);
        let sql = dml::select_rows(database, table, limit + 1)?;
        let pool = self.pool_manager.get_pool().await?;

        let result = self
            .executor
            .fetch_limited(
                &pool,
                &sql,
                &[],
                limit,
                &format!("select from {}.{}", database, table),
            )
            .await?;

        Ok(RowSet {
            columns: result.columns,
            rows: result.rows,
            truncated: result.truncated,
            execution_time_ms: result.execution_time_ms,
        })
    }

    /// Table metadata plus up to `limit` rows (all rows up to 10000 when unset).
    pub async fn export_rows(
        &self,
        database: &str,
        table: &str,
        limit: Option<u32>,
    ) -> DbResult<ExportBundle> {
        let pool = self.pool_manager.get_pool().await?;

        let details = self.inspector.table_details(&pool, database, table).await?;
        let foreign_keys = self
            .inspector
            .table_foreign_keys(&pool, database, table)
            .await?;
        let indexes = self.inspector.table_indexes(&pool, database, table).await?;

        let limit = limit.map(|l| clamp_limit(Some(l))).unwrap_or(MAX_ROW_LIMIT);
        let sql = dml::select_rows(database, table, limit + 1)?;
        let rows = self
            .executor
            .fetch_limited(
                &pool,
                &sql,
                &[],
                limit,
                &format!("export rows from {}.{}", database, table),
            )
            .await?;

        if rows.truncated {
            warn!(database, table, limit, "Row export truncated");
        }

        Ok(ExportBundle {
            database: database.to_string(),
            table: details.name,
            size_kb: details.size_kb,
            columns: details.columns,
            foreign_keys,
            indexes,
            row_count: rows.rows.len(),
            rows: rows.rows,
            truncated: rows.truncated,
        })
    }
}

/// Running tally of a snapshot-by-snapshot delete.
#[derive(Debug)]
struct DeleteProgress<'a> {
    operation: &'a str,
    total: usize,
    result: DeleteResult,
}

impl<'a> DeleteProgress<'a> {
    fn new(operation: &'a str, total: usize) -> Self {
        Self {
            operation,
            total,
            result: DeleteResult::default(),
        }
    }

    /// Fold in the outcome of statement `index`.
    ///
    /// A failing first statement is returned as is; any later failure
    /// becomes a `PartialFailure` over the statements already applied.
    fn record(&mut self, index: usize, outcome: DbResult<ExecuteResult>) -> DbResult<()> {
        match outcome {
            Ok(r) => {
                self.result.affected_rows += r.rows_affected;
                self.result.statements_executed += 1;
                if r.rows_affected > 1 {
                    self.result.over_matched_snapshots += 1;
                    warn!(
                        operation = self.operation,
                        snapshot = index + 1,
                        rows_affected = r.rows_affected,
                        "Row snapshot matched more than one row"
                    );
                }
                Ok(())
            }
            Err(e) if self.result.statements_executed == 0 => Err(e),
            Err(e) => {
                warn!(
                    operation = self.operation,
                    completed = self.result.statements_executed,
                    total = self.total,
                    affected_rows = self.result.affected_rows,
                    error = %e,
                    "Bulk delete stopped part way"
                );
                Err(DbError::partial_failure(
                    self.operation,
                    self.result.statements_executed,
                    self.total,
                    self.result.affected_rows,
                    &e,
                ))
            }
        }
    }

    fn finish(self) -> DeleteResult {
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deleted(rows_affected: u64) -> DbResult<ExecuteResult> {
        Ok(ExecuteResult {
            rows_affected,
            last_insert_id: 0,
            execution_time_ms: 1,
        })
    }

    fn failed() -> DbResult<ExecuteResult> {
        Err(DbError::engine(
            "delete from shop.t",
            "Cannot delete or update a parent row",
            Some(1451),
            Some("23000".to_string()),
        ))
    }

    #[test]
    fn test_second_of_three_fails_reports_first_delete() {
        let mut progress = DeleteProgress::new("delete from shop.t", 3);
        progress.record(0, deleted(1)).unwrap();
        let err = progress.record(1, failed()).unwrap_err();

        match err {
            DbError::PartialFailure {
                completed,
                total,
                affected_rows,
                ref message,
                ..
            } => {
                assert_eq!(completed, 1);
                assert_eq!(total, 3);
                assert_eq!(affected_rows, 1);
                assert!(message.contains("parent row"));
            }
            other => panic!("expected PartialFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_first_failure_is_returned_unchanged() {
        let mut progress = DeleteProgress::new("delete from shop.t", 2);
        let err = progress.record(0, failed()).unwrap_err();
        assert!(matches!(err, DbError::Engine { code: Some(1451), .. }));
    }

    #[test]
    fn test_all_succeed_counts_over_matches() {
        let mut progress = DeleteProgress::new("delete from shop.t", 3);
        progress.record(0, deleted(1)).unwrap();
        progress.record(1, deleted(2)).unwrap();
        progress.record(2, deleted(0)).unwrap();

        let result = progress.finish();
        assert_eq!(result.affected_rows, 3);
        assert_eq!(result.statements_executed, 3);
        assert_eq!(result.over_matched_snapshots, 1);
    }
}
