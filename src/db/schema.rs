//! Schema introspection module.
//!
//! Everything here is read-only and built from `information_schema` and
//! `SHOW` statements.
//!
//! # Architecture
//!
//! SQL text lives in the `queries` submodule. Catalog columns are wrapped in
//! `CONVERT(... USING utf8mb4)` because some servers report them as VARBINARY;
//! the `get_*` helpers also fall back to raw bytes for the same reason.

use crate::db::executor::QueryExecutor;
use crate::error::{DbError, DbResult};
use crate::models::{
    CheckAssociation, ColumnDescriptor, ColumnKey, ConstraintDescriptor, ConstraintType,
    DatabaseDescriptor, DatabaseSummary, ForeignKeyAction, IndexInfo, LargestTable, QueryParam,
    ReplicationInfo, ServerOverview, ServerTotals, TableDescriptor, TableSummary,
};
use crate::sql::ddl;
use chrono::NaiveDateTime;
use sqlx::mysql::MySqlRow;
use sqlx::{Column, MySqlPool, Row};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Schemas that belong to the server itself and are left out of totals.
pub const SYSTEM_SCHEMAS: &[&str] = &["information_schema", "mysql", "performance_schema", "sys"];

mod queries {
    pub const LIST_DATABASES: &str = "SHOW DATABASES";

    pub const SHOW_VARIABLES: &str = "SHOW VARIABLES";

    pub const SHOW_GLOBAL_STATUS: &str = "SHOW GLOBAL STATUS";

    pub const CURRENT_USER: &str =
        "SELECT CONVERT(CURRENT_USER() USING utf8mb4) AS ACCOUNT_NAME";

    pub const SERVER_INFO: &str = r#"
        SELECT
            CONVERT(VERSION() USING utf8mb4) AS SERVER_VERSION,
            CONVERT(@@character_set_server USING utf8mb4) AS SERVER_CHARSET,
            CONVERT(@@collation_server USING utf8mb4) AS SERVER_COLLATION,
            CONVERT(CURRENT_USER() USING utf8mb4) AS ACCOUNT_NAME,
            CONVERT(DATABASE() USING utf8mb4) AS CURRENT_DB
        "#;

    pub const DATABASE_SIZES: &str = r#"
        SELECT
            CONVERT(s.SCHEMA_NAME USING utf8mb4) AS DB_NAME,
            CAST(COALESCE(SUM(t.DATA_LENGTH + t.INDEX_LENGTH), 0) AS UNSIGNED) AS SIZE_BYTES,
            CAST(COUNT(t.TABLE_NAME) AS UNSIGNED) AS TABLE_COUNT,
            CAST(COALESCE(SUM(t.TABLE_ROWS), 0) AS UNSIGNED) AS TOTAL_ROWS
        FROM information_schema.SCHEMATA s
        LEFT JOIN information_schema.TABLES t
            ON t.TABLE_SCHEMA = s.SCHEMA_NAME
        GROUP BY s.SCHEMA_NAME
        ORDER BY s.SCHEMA_NAME
        "#;

    pub const DATABASE_CHARSET: &str = r#"
        SELECT
            CONVERT(DEFAULT_CHARACTER_SET_NAME USING utf8mb4) AS CHARSET_NAME,
            CONVERT(DEFAULT_COLLATION_NAME USING utf8mb4) AS COLLATION_NAME
        FROM information_schema.SCHEMATA
        WHERE SCHEMA_NAME = ?
        "#;

    pub const DATABASE_STATS: &str = r#"
        SELECT
            CAST(COUNT(*) AS UNSIGNED) AS TABLE_COUNT,
            CAST(COALESCE(SUM(TABLE_ROWS), 0) AS UNSIGNED) AS TOTAL_ROWS,
            CAST(COALESCE(SUM(DATA_LENGTH + INDEX_LENGTH), 0) AS UNSIGNED) AS SIZE_BYTES,
            MIN(CREATE_TIME) AS CREATED_AT
        FROM information_schema.TABLES
        WHERE TABLE_SCHEMA = ?
        AND TABLE_TYPE = 'BASE TABLE'
        "#;

    pub const DATABASE_INDEX_COUNT: &str = r#"
        SELECT CAST(COUNT(DISTINCT TABLE_NAME, INDEX_NAME) AS UNSIGNED) AS INDEX_COUNT
        FROM information_schema.STATISTICS
        WHERE TABLE_SCHEMA = ?
        "#;

    pub const LARGEST_TABLES: &str = r#"
        SELECT
            CONVERT(TABLE_NAME USING utf8mb4) AS TABLE_NAME,
            CAST(COALESCE(DATA_LENGTH + INDEX_LENGTH, 0) AS UNSIGNED) AS SIZE_BYTES,
            CAST(COALESCE(TABLE_ROWS, 0) AS UNSIGNED) AS ROW_COUNT
        FROM information_schema.TABLES
        WHERE TABLE_SCHEMA = ?
        AND TABLE_TYPE = 'BASE TABLE'
        ORDER BY SIZE_BYTES DESC, TABLE_NAME
        LIMIT 5
        "#;

    pub const REPLICA_STATUS: &[&str] = &["SHOW REPLICA STATUS", "SHOW SLAVE STATUS"];

    pub const SOURCE_STATUS: &[&str] = &["SHOW BINARY LOG STATUS", "SHOW MASTER STATUS"];

    pub const LIST_TABLES: &str = r#"
        SELECT
            CONVERT(TABLE_NAME USING utf8mb4) AS TABLE_NAME,
            CONVERT(TABLE_TYPE USING utf8mb4) AS TABLE_TYPE,
            CONVERT(ENGINE USING utf8mb4) AS ENGINE,
            CAST(COALESCE(TABLE_ROWS, 0) AS UNSIGNED) AS ROW_COUNT,
            CAST(COALESCE(DATA_LENGTH + INDEX_LENGTH, 0) AS UNSIGNED) AS SIZE_BYTES
        FROM information_schema.TABLES
        WHERE TABLE_SCHEMA = ?
        ORDER BY TABLE_NAME
        "#;

    pub const TABLE_DETAILS: &str = r#"
        SELECT
            CONVERT(TABLE_NAME USING utf8mb4) AS TABLE_NAME,
            CONVERT(ENGINE USING utf8mb4) AS ENGINE,
            CONVERT(TABLE_COLLATION USING utf8mb4) AS TABLE_COLLATION,
            CAST(COALESCE(TABLE_ROWS, 0) AS UNSIGNED) AS ROW_COUNT,
            CAST(COALESCE(DATA_LENGTH + INDEX_LENGTH, 0) AS UNSIGNED) AS SIZE_BYTES
        FROM information_schema.TABLES
        WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
        "#;

    pub const TABLE_COLUMNS: &str = r#"
        SELECT
            CONVERT(COLUMN_NAME USING utf8mb4) AS COLUMN_NAME,
            CONVERT(COLUMN_TYPE USING utf8mb4) AS COLUMN_TYPE,
            CONVERT(IS_NULLABLE USING utf8mb4) AS IS_NULLABLE,
            CONVERT(COLUMN_KEY USING utf8mb4) AS COLUMN_KEY,
            CONVERT(COLUMN_DEFAULT USING utf8mb4) AS COLUMN_DEFAULT,
            CONVERT(EXTRA USING utf8mb4) AS EXTRA
        FROM information_schema.COLUMNS
        WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
        ORDER BY ORDINAL_POSITION
        "#;

    pub const DATABASE_COLUMNS: &str = r#"
        SELECT
            CONVERT(TABLE_NAME USING utf8mb4) AS TABLE_NAME,
            CONVERT(COLUMN_NAME USING utf8mb4) AS COLUMN_NAME,
            CONVERT(COLUMN_TYPE USING utf8mb4) AS COLUMN_TYPE,
            CONVERT(IS_NULLABLE USING utf8mb4) AS IS_NULLABLE,
            CONVERT(COLUMN_KEY USING utf8mb4) AS COLUMN_KEY,
            CONVERT(COLUMN_DEFAULT USING utf8mb4) AS COLUMN_DEFAULT,
            CONVERT(EXTRA USING utf8mb4) AS EXTRA
        FROM information_schema.COLUMNS
        WHERE TABLE_SCHEMA = ?
        ORDER BY TABLE_NAME, ORDINAL_POSITION
        "#;

    pub const KEY_CONSTRAINTS: &str = r#"
        SELECT
            CONVERT(tc.CONSTRAINT_NAME USING utf8mb4) AS CONSTRAINT_NAME,
            CONVERT(tc.CONSTRAINT_TYPE USING utf8mb4) AS CONSTRAINT_TYPE,
            CONVERT(GROUP_CONCAT(kcu.COLUMN_NAME ORDER BY kcu.ORDINAL_POSITION SEPARATOR x'00') USING utf8mb4) AS COLUMN_NAMES,
            CONVERT(MAX(kcu.REFERENCED_TABLE_NAME) USING utf8mb4) AS REFERENCED_TABLE_NAME,
            CONVERT(GROUP_CONCAT(kcu.REFERENCED_COLUMN_NAME ORDER BY kcu.ORDINAL_POSITION SEPARATOR x'00') USING utf8mb4) AS REFERENCED_COLUMN_NAMES,
            CONVERT(MAX(rc.DELETE_RULE) USING utf8mb4) AS DELETE_RULE,
            CONVERT(MAX(rc.UPDATE_RULE) USING utf8mb4) AS UPDATE_RULE
        FROM information_schema.TABLE_CONSTRAINTS tc
        JOIN information_schema.KEY_COLUMN_USAGE kcu
            ON kcu.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA
            AND kcu.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
            AND kcu.TABLE_NAME = tc.TABLE_NAME
        LEFT JOIN information_schema.REFERENTIAL_CONSTRAINTS rc
            ON rc.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA
            AND rc.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
            AND rc.TABLE_NAME = tc.TABLE_NAME
        WHERE tc.TABLE_SCHEMA = ? AND tc.TABLE_NAME = ?
        GROUP BY tc.CONSTRAINT_NAME, tc.CONSTRAINT_TYPE
        ORDER BY tc.CONSTRAINT_TYPE, tc.CONSTRAINT_NAME
        "#;

    pub const CHECK_CONSTRAINTS_CATALOG: &str = r#"
        SELECT
            CONVERT(cc.CONSTRAINT_NAME USING utf8mb4) AS CONSTRAINT_NAME,
            CONVERT(cc.CHECK_CLAUSE USING utf8mb4) AS CHECK_CLAUSE
        FROM information_schema.CHECK_CONSTRAINTS cc
        JOIN information_schema.TABLE_CONSTRAINTS tc
            ON tc.CONSTRAINT_SCHEMA = cc.CONSTRAINT_SCHEMA
            AND tc.CONSTRAINT_NAME = cc.CONSTRAINT_NAME
        WHERE tc.TABLE_SCHEMA = ? AND tc.TABLE_NAME = ?
        AND tc.CONSTRAINT_TYPE = 'CHECK'
        ORDER BY cc.CONSTRAINT_NAME
        "#;

    pub const CHECK_CONSTRAINTS_BY_PREFIX: &str = r#"
        SELECT
            CONVERT(CONSTRAINT_NAME USING utf8mb4) AS CONSTRAINT_NAME,
            CONVERT(CHECK_CLAUSE USING utf8mb4) AS CHECK_CLAUSE
        FROM information_schema.CHECK_CONSTRAINTS
        WHERE CONSTRAINT_SCHEMA = ? AND CONSTRAINT_NAME LIKE ?
        ORDER BY CONSTRAINT_NAME
        "#;

    pub const TABLE_INDEXES: &str = r#"
        SELECT
            CONVERT(INDEX_NAME USING utf8mb4) AS INDEX_NAME,
            CONVERT(GROUP_CONCAT(COLUMN_NAME ORDER BY SEQ_IN_INDEX SEPARATOR x'00') USING utf8mb4) AS COLUMN_NAMES,
            CAST(MAX(NON_UNIQUE) AS UNSIGNED) AS NON_UNIQUE,
            CONVERT(MAX(INDEX_TYPE) USING utf8mb4) AS INDEX_ALGORITHM
        FROM information_schema.STATISTICS
        WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
        GROUP BY INDEX_NAME
        ORDER BY INDEX_NAME
        "#;
}

/// Schema inspector for database introspection.
#[derive(Debug, Clone, Default)]
pub struct SchemaInspector {
    executor: QueryExecutor,
}

impl SchemaInspector {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    /// Database names in server order.
    pub async fn list_databases(&self, pool: &MySqlPool) -> DbResult<Vec<String>> {
        let rows = self
            .executor
            .fetch_all(pool, queries::LIST_DATABASES, &[], "list databases")
            .await?;

        // SHOW DATABASES returns a single column "Database"
        let databases: Vec<String> = rows
            .iter()
            .filter_map(|row| get_string_by_index(row, 0))
            .collect();

        debug!(count = databases.len(), "Listed databases");
        Ok(databases)
    }

    /// Whether a schema with this exact name exists.
    pub async fn database_exists(&self, pool: &MySqlPool, database: &str) -> DbResult<bool> {
        Ok(self.database_charset(pool, database).await?.is_some())
    }

    async fn database_charset(
        &self,
        pool: &MySqlPool,
        database: &str,
    ) -> DbResult<Option<(Option<String>, Option<String>)>> {
        let row = self
            .executor
            .fetch_optional(
                pool,
                queries::DATABASE_CHARSET,
                &[QueryParam::from(database)],
                "look up database",
            )
            .await?;

        Ok(row.map(|r| {
            (
                get_optional_string(&r, "CHARSET_NAME"),
                get_optional_string(&r, "COLLATION_NAME"),
            )
        }))
    }

    async fn ensure_database(&self, pool: &MySqlPool, database: &str) -> DbResult<()> {
        if self.database_exists(pool, database).await? {
            Ok(())
        } else {
            Err(database_not_found(database))
        }
    }

    /// Server-wide overview: version, sizes, variables and status.
    pub async fn server_overview(&self, pool: &MySqlPool) -> DbResult<ServerOverview> {
        let info = self
            .executor
            .fetch_optional(pool, queries::SERVER_INFO, &[], "server overview")
            .await?
            .ok_or_else(|| DbError::engine("server overview", "No server info returned", None, None))?;

        let (current_user, current_host) = split_account(&get_string(&info, "ACCOUNT_NAME"));

        let variables = self
            .name_value_pairs(pool, queries::SHOW_VARIABLES, "show variables")
            .await?;
        let status = self
            .name_value_pairs(pool, queries::SHOW_GLOBAL_STATUS, "show global status")
            .await?;
        let uptime_seconds = status
            .get("Uptime")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or_default();

        let rows = self
            .executor
            .fetch_all(pool, queries::DATABASE_SIZES, &[], "database sizes")
            .await?;

        let mut databases = Vec::with_capacity(rows.len());
        let mut totals = ServerTotals::default();
        let mut total_bytes = 0u64;
        for row in &rows {
            let name = get_string(row, "DB_NAME");
            let size_bytes = try_get_u64(row, "SIZE_BYTES").unwrap_or_default();
            if !is_system_schema(&name) {
                totals.tables += try_get_u64(row, "TABLE_COUNT").unwrap_or_default();
                totals.rows += try_get_u64(row, "TOTAL_ROWS").unwrap_or_default();
                total_bytes += size_bytes;
            }
            databases.push(DatabaseSummary {
                name,
                size_mb: bytes_to_mb(size_bytes),
                size_formatted: format_bytes(size_bytes),
            });
        }
        totals.size_mb = bytes_to_mb(total_bytes);

        debug!(databases = databases.len(), "Built server overview");

        Ok(ServerOverview {
            version: get_string(&info, "SERVER_VERSION"),
            uptime_seconds,
            charset: get_optional_string(&info, "SERVER_CHARSET"),
            collation: get_optional_string(&info, "SERVER_COLLATION"),
            databases,
            totals,
            variables,
            status,
            current_user,
            current_host,
            current_database: get_optional_string(&info, "CURRENT_DB"),
        })
    }

    async fn name_value_pairs(
        &self,
        pool: &MySqlPool,
        sql: &str,
        operation: &str,
    ) -> DbResult<BTreeMap<String, String>> {
        let rows = self.executor.fetch_all(pool, sql, &[], operation).await?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                let name = get_string_by_index(row, 0)?;
                Some((name, get_string_by_index(row, 1).unwrap_or_default()))
            })
            .collect())
    }

    /// Aggregate statistics for one database.
    pub async fn database_overview(
        &self,
        pool: &MySqlPool,
        database: &str,
    ) -> DbResult<DatabaseDescriptor> {
        let (charset, collation) = self
            .database_charset(pool, database)
            .await?
            .ok_or_else(|| database_not_found(database))?;

        let params = [QueryParam::from(database)];
        let stats = self
            .executor
            .fetch_optional(pool, queries::DATABASE_STATS, &params, "database stats")
            .await?;

        let (table_count, total_rows, size_bytes, creation_date) = match &stats {
            Some(row) => (
                try_get_u64(row, "TABLE_COUNT").unwrap_or_default(),
                try_get_u64(row, "TOTAL_ROWS").unwrap_or_default(),
                try_get_u64(row, "SIZE_BYTES").unwrap_or_default(),
                row.try_get::<Option<NaiveDateTime>, _>("CREATED_AT")
                    .ok()
                    .flatten()
                    .map(|dt| dt.and_utc()),
            ),
            None => (0, 0, 0, None),
        };

        let total_indexes = self
            .executor
            .fetch_optional(pool, queries::DATABASE_INDEX_COUNT, &params, "database index count")
            .await?
            .and_then(|row| try_get_u64(&row, "INDEX_COUNT"))
            .unwrap_or_default();

        let largest_tables = self
            .executor
            .fetch_all(pool, queries::LARGEST_TABLES, &params, "largest tables")
            .await?
            .iter()
            .map(|row| LargestTable {
                name: get_string(row, "TABLE_NAME"),
                size_mb: bytes_to_mb(try_get_u64(row, "SIZE_BYTES").unwrap_or_default()),
                rows: try_get_u64(row, "ROW_COUNT").unwrap_or_default(),
            })
            .collect();

        let replication = self.replication_info(pool).await;

        Ok(DatabaseDescriptor {
            name: database.to_string(),
            size_mb: bytes_to_mb(size_bytes),
            size_formatted: format_bytes(size_bytes),
            charset,
            collation,
            table_count,
            total_rows,
            total_indexes,
            creation_date,
            replication,
            largest_tables,
        })
    }

    /// Best-effort replication role. Any failure yields `None`.
    pub async fn replication_info(&self, pool: &MySqlPool) -> Option<ReplicationInfo> {
        for sql in queries::REPLICA_STATUS {
            match self.executor.fetch_all(pool, sql, &[], "replication status").await {
                Ok(rows) => {
                    if let Some(row) = rows.first() {
                        return Some(ReplicationInfo {
                            role: "replica".to_string(),
                            details: row_to_string_map(row),
                        });
                    }
                    break;
                }
                Err(e) => debug!(sql, error = %e, "Replica status unavailable"),
            }
        }

        for sql in queries::SOURCE_STATUS {
            match self.executor.fetch_all(pool, sql, &[], "replication status").await {
                Ok(rows) => {
                    return rows.first().map(|row| ReplicationInfo {
                        role: "source".to_string(),
                        details: row_to_string_map(row),
                    });
                }
                Err(e) => debug!(sql, error = %e, "Source status unavailable"),
            }
        }

        None
    }

    /// Tables and views of a database.
    pub async fn list_tables(
        &self,
        pool: &MySqlPool,
        database: &str,
    ) -> DbResult<Vec<TableSummary>> {
        self.ensure_database(pool, database).await?;

        let rows = self
            .executor
            .fetch_all(pool, queries::LIST_TABLES, &[QueryParam::from(database)], "list tables")
            .await?;

        let tables: Vec<TableSummary> = rows
            .iter()
            .filter_map(|row| {
                let name = get_string(row, "TABLE_NAME");
                if name.is_empty() {
                    return None;
                }
                Some(TableSummary {
                    name,
                    table_type: get_string(row, "TABLE_TYPE"),
                    engine: get_optional_string(row, "ENGINE").filter(|e| !e.is_empty()),
                    row_count: try_get_u64(row, "ROW_COUNT").unwrap_or_default(),
                    size_kb: bytes_to_kb(try_get_u64(row, "SIZE_BYTES").unwrap_or_default()),
                })
            })
            .collect();

        debug!(database, count = tables.len(), "Listed tables");
        Ok(tables)
    }

    /// Map of table name to its ordered columns.
    pub async fn database_schema(
        &self,
        pool: &MySqlPool,
        database: &str,
    ) -> DbResult<BTreeMap<String, Vec<ColumnDescriptor>>> {
        self.ensure_database(pool, database).await?;

        let rows = self
            .executor
            .fetch_all(
                pool,
                queries::DATABASE_COLUMNS,
                &[QueryParam::from(database)],
                "database schema",
            )
            .await?;

        let mut schema: BTreeMap<String, Vec<ColumnDescriptor>> = BTreeMap::new();
        for row in &rows {
            schema
                .entry(get_string(row, "TABLE_NAME"))
                .or_default()
                .push(column_from_row(row));
        }
        Ok(schema)
    }

    pub async fn table_details(
        &self,
        pool: &MySqlPool,
        database: &str,
        table: &str,
    ) -> DbResult<TableDescriptor> {
        let row = self
            .executor
            .fetch_optional(
                pool,
                queries::TABLE_DETAILS,
                &[QueryParam::from(database), QueryParam::from(table)],
                "table details",
            )
            .await?
            .ok_or_else(|| table_not_found(database, table))?;

        let columns = self.table_columns(pool, database, table).await?;

        Ok(TableDescriptor {
            name: get_string(&row, "TABLE_NAME"),
            engine: get_optional_string(&row, "ENGINE").filter(|e| !e.is_empty()),
            collation: get_optional_string(&row, "TABLE_COLLATION").filter(|c| !c.is_empty()),
            row_count: try_get_u64(&row, "ROW_COUNT").unwrap_or_default(),
            size_kb: bytes_to_kb(try_get_u64(&row, "SIZE_BYTES").unwrap_or_default()),
            columns,
        })
    }

    async fn ensure_table(&self, pool: &MySqlPool, database: &str, table: &str) -> DbResult<()> {
        let found = self
            .executor
            .fetch_optional(
                pool,
                queries::TABLE_DETAILS,
                &[QueryParam::from(database), QueryParam::from(table)],
                "look up table",
            )
            .await?;
        if found.is_some() {
            Ok(())
        } else {
            Err(table_not_found(database, table))
        }
    }

    /// Columns in ordinal order. Empty when the table does not exist.
    pub async fn table_columns(
        &self,
        pool: &MySqlPool,
        database: &str,
        table: &str,
    ) -> DbResult<Vec<ColumnDescriptor>> {
        let rows = self
            .executor
            .fetch_all(
                pool,
                queries::TABLE_COLUMNS,
                &[QueryParam::from(database), QueryParam::from(table)],
                "table columns",
            )
            .await?;
        Ok(rows.iter().map(column_from_row).collect())
    }

    /// Primary key, unique, foreign key and CHECK constraints of a table.
    pub async fn table_constraints(
        &self,
        pool: &MySqlPool,
        database: &str,
        table: &str,
    ) -> DbResult<Vec<ConstraintDescriptor>> {
        self.ensure_table(pool, database, table).await?;

        let mut constraints = self.key_constraints(pool, database, table).await?;
        constraints.extend(self.check_constraints(pool, database, table).await);
        Ok(constraints)
    }

    pub async fn table_foreign_keys(
        &self,
        pool: &MySqlPool,
        database: &str,
        table: &str,
    ) -> DbResult<Vec<ConstraintDescriptor>> {
        Ok(self
            .key_constraints(pool, database, table)
            .await?
            .into_iter()
            .filter(|c| c.constraint_type == ConstraintType::ForeignKey)
            .collect())
    }

    async fn key_constraints(
        &self,
        pool: &MySqlPool,
        database: &str,
        table: &str,
    ) -> DbResult<Vec<ConstraintDescriptor>> {
        let rows = self
            .executor
            .fetch_all(
                pool,
                queries::KEY_CONSTRAINTS,
                &[QueryParam::from(database), QueryParam::from(table)],
                "table constraints",
            )
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let name = get_string(row, "CONSTRAINT_NAME");
                let Some(constraint_type) = ConstraintType::parse(&get_string(row, "CONSTRAINT_TYPE"))
                else {
                    debug!(name = %name, "Skipping constraint of unknown type");
                    return None;
                };

                let mut descriptor = ConstraintDescriptor::new(
                    name,
                    constraint_type,
                    split_list(get_optional_string(row, "COLUMN_NAMES")),
                );
                if constraint_type == ConstraintType::ForeignKey {
                    descriptor.referenced_table = get_optional_string(row, "REFERENCED_TABLE_NAME");
                    descriptor.referenced_columns =
                        split_list(get_optional_string(row, "REFERENCED_COLUMN_NAMES"));
                    descriptor.on_delete =
                        get_optional_string(row, "DELETE_RULE").map(|r| ForeignKeyAction::parse(&r));
                    descriptor.on_update =
                        get_optional_string(row, "UPDATE_RULE").map(|r| ForeignKeyAction::parse(&r));
                }
                Some(descriptor)
            })
            .collect())
    }

    /// CHECK constraints, joined through the catalog when the server allows
    /// it and matched on the `<table>_chk_` name prefix otherwise.
    async fn check_constraints(
        &self,
        pool: &MySqlPool,
        database: &str,
        table: &str,
    ) -> Vec<ConstraintDescriptor> {
        let catalog = self
            .executor
            .fetch_all(
                pool,
                queries::CHECK_CONSTRAINTS_CATALOG,
                &[QueryParam::from(database), QueryParam::from(table)],
                "check constraints",
            )
            .await;

        let (rows, association) = match catalog {
            Ok(rows) => (rows, CheckAssociation::Catalog),
            Err(e) => {
                warn!(
                    database,
                    table,
                    error = %e,
                    "CHECK catalog join unavailable, matching constraints by name prefix"
                );
                let pattern = format!("{}\\_chk\\_%", escape_like(table));
                match self
                    .executor
                    .fetch_all(
                        pool,
                        queries::CHECK_CONSTRAINTS_BY_PREFIX,
                        &[QueryParam::from(database), QueryParam::from(pattern)],
                        "check constraints",
                    )
                    .await
                {
                    Ok(rows) => (rows, CheckAssociation::NamePrefix),
                    Err(e) => {
                        warn!(database, table, error = %e, "CHECK constraints unavailable");
                        return Vec::new();
                    }
                }
            }
        };

        rows.iter()
            .map(|row| {
                let mut descriptor = ConstraintDescriptor::new(
                    get_string(row, "CONSTRAINT_NAME"),
                    ConstraintType::Check,
                    Vec::new(),
                );
                descriptor.check_expression = get_optional_string(row, "CHECK_CLAUSE");
                descriptor.association = Some(association);
                descriptor
            })
            .collect()
    }

    pub async fn table_indexes(
        &self,
        pool: &MySqlPool,
        database: &str,
        table: &str,
    ) -> DbResult<Vec<IndexInfo>> {
        let rows = self
            .executor
            .fetch_all(
                pool,
                queries::TABLE_INDEXES,
                &[QueryParam::from(database), QueryParam::from(table)],
                "table indexes",
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let name = get_string(row, "INDEX_NAME");
                let is_primary = name == "PRIMARY";
                let non_unique = try_get_u64(row, "NON_UNIQUE").unwrap_or(1);
                let mut index = IndexInfo::new(&name, split_list(get_optional_string(row, "COLUMN_NAMES")))
                    .with_unique(non_unique == 0)
                    .with_primary(is_primary);
                if let Some(algorithm) = get_optional_string(row, "INDEX_ALGORITHM") {
                    index = index.with_algorithm(algorithm);
                }
                index
            })
            .collect())
    }

    /// `SHOW CREATE TABLE` text.
    pub async fn show_create_table(
        &self,
        pool: &MySqlPool,
        database: &str,
        table: &str,
    ) -> DbResult<String> {
        let sql = ddl::show_create_table(database, table)?;
        let operation = format!("show create table {}.{}", database, table);
        let rows = self.executor.fetch_all(pool, &sql, &[], &operation).await?;

        rows.first()
            .and_then(|row| get_string_by_index(row, 1))
            .ok_or_else(|| table_not_found(database, table))
    }

    /// `SHOW CREATE TABLE` for every table and view, keyed by name.
    pub async fn database_code(
        &self,
        pool: &MySqlPool,
        database: &str,
    ) -> DbResult<BTreeMap<String, String>> {
        let tables = self.list_tables(pool, database).await?;

        let mut code = BTreeMap::new();
        for table in tables {
            let ddl = self.show_create_table(pool, database, &table.name).await?;
            code.insert(table.name, ddl);
        }
        Ok(code)
    }

    /// The account the server authenticated us as, e.g. `root@%`.
    pub async fn current_user(&self, pool: &MySqlPool) -> DbResult<String> {
        let row = self
            .executor
            .fetch_optional(pool, queries::CURRENT_USER, &[], "current user")
            .await?;
        Ok(row.map(|r| get_string(&r, "ACCOUNT_NAME")).unwrap_or_default())
    }
}

fn database_not_found(database: &str) -> DbError {
    DbError::not_found("Database", format!("Database '{}' not found", database))
}

fn table_not_found(database: &str, table: &str) -> DbError {
    DbError::not_found("Table", format!("Table '{}.{}' not found", database, table))
}

fn column_from_row(row: &MySqlRow) -> ColumnDescriptor {
    let mut column = ColumnDescriptor::new(
        get_string(row, "COLUMN_NAME"),
        get_string(row, "COLUMN_TYPE"),
        get_string(row, "IS_NULLABLE") == "YES",
    )
    .with_key(ColumnKey::parse(&get_string(row, "COLUMN_KEY")))
    .with_extra(get_string(row, "EXTRA"));

    if let Some(default) = get_optional_string(row, "COLUMN_DEFAULT") {
        column = column.with_default(default);
    }
    column
}

fn row_to_string_map(row: &MySqlRow) -> BTreeMap<String, String> {
    row.columns()
        .iter()
        .filter_map(|col| {
            let value = get_string_by_index(row, col.ordinal())?;
            Some((col.name().to_string(), value))
        })
        .collect()
}

/// Split `CURRENT_USER()` output on the last `@`.
pub(crate) fn split_account(account: &str) -> (String, String) {
    match account.rsplit_once('@') {
        Some((user, host)) => (user.to_string(), host.to_string()),
        None => (account.to_string(), String::new()),
    }
}

pub(crate) fn is_system_schema(name: &str) -> bool {
    SYSTEM_SCHEMAS.iter().any(|s| s.eq_ignore_ascii_case(name))
}

/// Escape `\`, `%` and `_` for a LIKE pattern.
pub(crate) fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `GROUP_CONCAT` separator for name lists. Identifiers may contain commas
/// but never NUL.
const LIST_SEPARATOR: char = '\0';

fn split_list(value: Option<String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(LIST_SEPARATOR)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn bytes_to_mb(bytes: u64) -> f64 {
    round2(bytes as f64 / (1024.0 * 1024.0))
}

pub(crate) fn bytes_to_kb(bytes: u64) -> f64 {
    round2(bytes as f64 / 1024.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn format_bytes(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Try to get a u64 value from a row, handling MySQL version differences.
/// MySQL 5.x may return BIGINT (i64), MySQL 8.x returns BIGINT UNSIGNED (u64).
pub(crate) fn try_get_u64(row: &MySqlRow, column: &str) -> Option<u64> {
    if let Ok(Some(v)) = row.try_get::<Option<u64>, _>(column) {
        return Some(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(column) {
        return u64::try_from(v).ok();
    }
    None
}

/// Safely get a string from a MySQL row.
/// MySQL may return VARBINARY instead of VARCHAR depending on charset configuration.
pub(crate) fn get_string(row: &MySqlRow, column: &str) -> String {
    get_optional_string(row, column).unwrap_or_default()
}

/// Safely get an optional string from a MySQL row.
pub(crate) fn get_optional_string(row: &MySqlRow, column: &str) -> Option<String> {
    row.try_get::<Option<String>, _>(column)
        .ok()
        .flatten()
        .or_else(|| {
            row.try_get::<Option<Vec<u8>>, _>(column)
                .ok()
                .flatten()
                .and_then(|bytes| String::from_utf8(bytes).ok())
        })
}

/// Safely get a string from a MySQL row by index.
pub(crate) fn get_string_by_index(row: &MySqlRow, index: usize) -> Option<String> {
    row.try_get::<Option<String>, _>(index)
        .ok()
        .flatten()
        .or_else(|| {
            row.try_get::<Option<Vec<u8>>, _>(index)
                .ok()
                .flatten()
                .and_then(|bytes| String::from_utf8(bytes).ok())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_account_uses_last_at() {
        assert_eq!(
            split_account("root@localhost"),
            ("root".to_string(), "localhost".to_string())
        );
        assert_eq!(
            split_account("we@ird@%"),
            ("we@ird".to_string(), "%".to_string())
        );
        assert_eq!(split_account("nohost"), ("nohost".to_string(), String::new()));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("order_items"), "order\\_items");
        assert_eq!(escape_like("50%\\off"), "50\\%\\\\off");
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(Some("a\0b".to_string())), vec!["a", "b"]);
        assert_eq!(
            split_list(Some("a,b\0c".to_string())),
            vec!["a,b", "c"]
        );
        assert!(split_list(None).is_empty());
        assert!(split_list(Some(String::new())).is_empty());
    }

    #[test]
    fn test_name_lists_use_nul_separator() {
        for sql in [queries::KEY_CONSTRAINTS, queries::TABLE_INDEXES] {
            let concats = sql.matches("GROUP_CONCAT(").count();
            assert!(concats > 0);
            assert_eq!(sql.matches("SEPARATOR x'00'").count(), concats);
        }
    }

    #[test]
    fn test_size_conversions_round_to_two_places() {
        assert_eq!(bytes_to_mb(1024 * 1024), 1.0);
        assert_eq!(bytes_to_mb(1_572_864), 1.5);
        assert_eq!(bytes_to_kb(1536), 1.5);
        assert_eq!(bytes_to_kb(0), 0.0);
    }

    #[test]
    fn test_system_schemas() {
        assert!(is_system_schema("mysql"));
        assert!(is_system_schema("INFORMATION_SCHEMA"));
        assert!(!is_system_schema("shop"));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert!(format_bytes(2 * 1024 * 1024).contains("MiB"));
    }
}
