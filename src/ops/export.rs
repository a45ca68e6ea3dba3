//! Database dumps through the external `mysqldump` utility.
//!
//! The child gets the target as positional arguments, the password through
//! `MYSQL_PWD` and its stdout redirected straight into the output file.
//! Anything written to stderr counts as a failure, even with a zero exit code.

use crate::config::DEFAULT_DUMP_BINARY;
use crate::db::{PoolManager, QueryExecutor, SchemaInspector};
use crate::error::{DbError, DbResult};
use crate::models::{DumpRequest, DumpResult};
use crate::sql::quote::validate_identifier;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, warn};

pub struct ExportHandler {
    pool_manager: Arc<PoolManager>,
    inspector: SchemaInspector,
    dump_binary: String,
}

impl ExportHandler {
    pub fn new(pool_manager: Arc<PoolManager>, executor: QueryExecutor) -> Self {
        Self {
            pool_manager,
            inspector: SchemaInspector::new(executor),
            dump_binary: DEFAULT_DUMP_BINARY.to_string(),
        }
    }

    /// Use a different dump executable (path or name on `PATH`).
    pub fn with_dump_binary(mut self, binary: impl Into<String>) -> Self {
        self.dump_binary = binary.into();
        self
    }

    pub fn dump_binary(&self) -> &str {
        &self.dump_binary
    }

    /// Dump a database, or one table of it, to
    /// `<outputPath>/<database>_<table|dump>.sql`.
    pub async fn dump_database(&self, request: &DumpRequest) -> DbResult<DumpResult> {
        validate_dump_request(request).await?;

        let config = self.pool_manager.config().await?;
        let pool = self.pool_manager.get_pool().await?;
        let requested_by = self.inspector.current_user(&pool).await?;

        info!(
            requested_by = %requested_by,
            database = %request.database,
            table = ?request.table,
            dump_user = %request.username,
            "Starting dump"
        );

        let target = request.target_file()?;
        let bytes_written =
            run_dump(&self.dump_binary, &config.host, config.port, request, &target).await?;

        info!(
            file = %target.display(),
            bytes = bytes_written,
            "Dump finished"
        );

        Ok(DumpResult {
            file_path: target,
            database: request.database.clone(),
            table: request.table.clone(),
            requested_by,
            bytes_written,
        })
    }
}

/// Names end up both in argv and in the dump file name.
fn validate_dump_name(name: &str, what: &str) -> DbResult<()> {
    validate_identifier(name)?;
    if name.starts_with('-') {
        return Err(DbError::validation(format!(
            "{} name cannot start with '-': {}",
            what, name
        )));
    }
    if name.contains(['/', '\\']) || name == ".." || name == "." {
        return Err(DbError::validation(format!(
            "{} name cannot contain path separators: {}",
            what, name
        )));
    }
    Ok(())
}

async fn validate_dump_request(request: &DumpRequest) -> DbResult<()> {
    validate_dump_name(&request.database, "Database")?;
    if let Some(table) = &request.table {
        validate_dump_name(table, "Table")?;
    }
    if request.username.is_empty() {
        return Err(DbError::validation("Dump user name cannot be empty"));
    }

    match tokio::fs::metadata(&request.output_path).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(DbError::validation(format!(
            "Output path is not a directory: {}",
            request.output_path.display()
        ))),
        Err(e) => Err(DbError::validation(format!(
            "Output directory {} is not accessible: {}",
            request.output_path.display(),
            e
        ))),
    }
}

/// Run the dump utility with stdout redirected into `target`.
///
/// Returns the size of the written file. On failure the partial file is
/// removed.
pub(crate) async fn run_dump(
    binary: &str,
    host: &str,
    port: u16,
    request: &DumpRequest,
    target: &Path,
) -> DbResult<u64> {
    let file = tokio::fs::File::create(target).await.map_err(|e| {
        DbError::export(format!("Cannot create {}: {}", target.display(), e))
    })?;
    let stdout = file.into_std().await;

    let mut command = Command::new(binary);
    command
        .arg("-h")
        .arg(host)
        .arg("-P")
        .arg(port.to_string())
        .arg("-u")
        .arg(&request.username)
        .arg(&request.database);
    if let Some(table) = &request.table {
        command.arg(table);
    }
    command
        .env("MYSQL_PWD", &request.password)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(
        binary,
        host,
        port,
        database = %request.database,
        table = ?request.table,
        "Spawning dump utility"
    );

    let outcome = match command.output().await {
        Err(e) => Err(DbError::export(format!("Failed to start {}: {}", binary, e))),
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if !output.status.success() {
                Err(DbError::export(format!(
                    "{} exited with {}: {}",
                    binary, output.status, stderr
                )))
            } else if !stderr.is_empty() {
                Err(DbError::export(format!("{} reported: {}", binary, stderr)))
            } else {
                Ok(())
            }
        }
    };

    if let Err(e) = outcome {
        if let Err(remove_err) = tokio::fs::remove_file(target).await {
            warn!(file = %target.display(), error = %remove_err, "Could not remove partial dump");
        }
        return Err(e);
    }

    let bytes = tokio::fs::metadata(target)
        .await
        .map(|m| m.len())
        .unwrap_or_default();
    Ok(bytes)
}
