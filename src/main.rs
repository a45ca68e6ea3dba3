//! db-admin - command line entry point.
//!
//! Every command prints one JSON envelope on stdout. Row previews and raw
//! query results can be rendered as a table or Markdown instead.

use db_admin_engine::config::{Command, Config};
use db_admin_engine::models::{
    ColumnSpec, ConnectionConfig, ConstraintSpec, ConstraintType, CreateUserRequest,
    DeleteRowsRequest, DumpRequest, GrantRequest, InsertRowsRequest, QueryOutcome, QueryRequest,
    Row,
};
use db_admin_engine::ops::format::{self, OutputFormat};
use db_admin_engine::{AdminEngine, ApiResponse, DbError, DbResult, PoolManager, request_schemas};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber. Logs go to stderr so stdout stays
/// machine readable.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Successful command output before it is wrapped in the envelope.
struct Reply {
    message: String,
    status: u16,
    data: JsonValue,
    /// Column names, rows and timing for non-JSON rendering
    rows: Option<(Vec<String>, Vec<Row>, u64)>,
}

impl Reply {
    fn new(message: impl Into<String>, data: impl Serialize) -> DbResult<Self> {
        Ok(Self {
            message: message.into(),
            status: 200,
            data: to_json(&data)?,
            rows: None,
        })
    }

    fn created(message: impl Into<String>, data: impl Serialize) -> DbResult<Self> {
        let mut reply = Self::new(message, data)?;
        reply.status = 201;
        Ok(reply)
    }
}

fn to_json(value: &impl Serialize) -> DbResult<JsonValue> {
    serde_json::to_value(value)
        .map_err(|e| DbError::validation(format!("Cannot serialize result: {}", e)))
}

fn parse_json<T: DeserializeOwned>(argument: &str, raw: &str) -> DbResult<T> {
    serde_json::from_str(raw)
        .map_err(|e| DbError::validation(format!("Invalid JSON for {}: {}", argument, e)))
}

fn parse_constraint_type(raw: Option<&str>) -> DbResult<Option<ConstraintType>> {
    raw.map(|s| {
        ConstraintType::parse(s)
            .ok_or_else(|| DbError::validation(format!("Unknown constraint type: {}", s)))
    })
    .transpose()
}

async fn dispatch(
    engine: &AdminEngine,
    connection: &ConnectionConfig,
    command: Command,
) -> DbResult<Reply> {
    match command {
        Command::Overview => Reply::new(
            "Server overview",
            engine.connection_overview().await?,
        ),
        Command::Databases => Reply::new("Databases", engine.list_databases().await?),
        Command::DatabaseInfo { database } => Reply::new(
            format!("Database {}", database),
            engine.database_overview(&database).await?,
        ),
        Command::CreateDatabase {
            name,
            charset,
            collation,
        } => Reply::created(
            format!("Database {} created", name),
            engine
                .create_database(&name, charset.as_deref(), collation.as_deref())
                .await?,
        ),
        Command::DropDatabase { name } => Reply::new(
            format!("Database {} dropped", name),
            engine.drop_database(&name).await?,
        ),
        Command::Schema { database } => Reply::new(
            format!("Schema of {}", database),
            engine.database_schema(&database).await?,
        ),
        Command::Tables { database } => Reply::new(
            format!("Tables in {}", database),
            engine.list_tables(&database).await?,
        ),
        Command::Table { database, table } => Reply::new(
            format!("Table {}.{}", database, table),
            engine.table_details(&database, &table).await?,
        ),
        Command::Constraints { database, table } => Reply::new(
            format!("Constraints on {}.{}", database, table),
            engine.table_constraints(&database, &table).await?,
        ),
        Command::Code {
            database,
            table: Some(table),
        } => Reply::new(
            format!("Definition of {}.{}", database, table),
            engine.table_code(&database, &table).await?,
        ),
        Command::Code {
            database,
            table: None,
        } => Reply::new(
            format!("Definitions in {}", database),
            engine.database_code(&database).await?,
        ),
        Command::CreateTable {
            database,
            table,
            columns,
        } => {
            let columns: Vec<ColumnSpec> = parse_json("--columns", &columns)?;
            Reply::created(
                format!("Table {}.{} created", database, table),
                engine.create_table(&database, &table, &columns).await?,
            )
        }
        Command::AddColumns {
            database,
            table,
            columns,
        } => {
            let columns: Vec<ColumnSpec> = parse_json("--columns", &columns)?;
            Reply::new(
                format!("{} column(s) added to {}.{}", columns.len(), database, table),
                engine.add_columns(&database, &table, &columns).await?,
            )
        }
        Command::DropColumns {
            database,
            table,
            columns,
        } => Reply::new(
            format!("{} column(s) dropped from {}.{}", columns.len(), database, table),
            engine.drop_columns(&database, &table, &columns).await?,
        ),
        Command::ModifyColumn {
            database,
            table,
            column,
        } => {
            let column: ColumnSpec = parse_json("--column", &column)?;
            Reply::new(
                format!("Column {} modified", column.name),
                engine.modify_column(&database, &table, &column).await?,
            )
        }
        Command::RenameColumn {
            database,
            table,
            from,
            to,
        } => Reply::new(
            format!("Column {} renamed to {}", from, to),
            engine.rename_column(&database, &table, &from, &to).await?,
        ),
        Command::AddConstraint {
            database,
            table,
            constraint,
        } => {
            let spec: ConstraintSpec = parse_json("--constraint", &constraint)?;
            Reply::created(
                format!("{} constraint added to {}.{}", spec.constraint_type, database, table),
                engine.add_constraint(&database, &table, &spec).await?,
            )
        }
        Command::DropConstraint {
            database,
            table,
            name,
            constraint_type,
        } => {
            let constraint_type = parse_constraint_type(constraint_type.as_deref())?;
            Reply::new(
                format!("Constraint {} dropped", name),
                engine
                    .drop_constraint(&database, &table, &name, constraint_type)
                    .await?,
            )
        }
        Command::RenameTable { database, from, to } => Reply::new(
            format!("Table {} renamed to {}", from, to),
            engine.rename_table(&database, &from, &to).await?,
        ),
        Command::TruncateTable { database, table } => Reply::new(
            format!("Table {}.{} truncated", database, table),
            engine.truncate_table(&database, &table).await?,
        ),
        Command::DropTable { database, table } => Reply::new(
            format!("Table {}.{} dropped", database, table),
            engine.drop_table(&database, &table).await?,
        ),
        Command::Insert {
            database,
            table,
            rows,
        } => {
            let request = InsertRowsRequest {
                db_name: database,
                table_name: table,
                rows: parse_json("--rows", &rows)?,
            };
            let result = engine.insert_rows(&request).await?;
            Reply::created(format!("{} row(s) inserted", result.affected_rows), result)
        }
        Command::Delete {
            database,
            table,
            rows,
        } => {
            let request = DeleteRowsRequest {
                db_name: database,
                table_name: table,
                rows: parse_json("--rows", &rows)?,
            };
            let result = engine.delete_rows(&request).await?;
            Reply::new(format!("{} row(s) deleted", result.affected_rows), result)
        }
        Command::Select {
            database,
            table,
            limit,
        } => {
            let result = engine.select_rows(&database, &table, limit).await?;
            let columns = format::column_names(&result.columns, &result.rows);
            let mut reply = Reply::new(format!("{} row(s)", result.rows.len()), &result)?;
            reply.rows = Some((columns, result.rows, result.execution_time_ms));
            Ok(reply)
        }
        Command::ExportRows {
            database,
            table,
            limit,
        } => {
            let bundle = engine.export_rows(&database, &table, limit).await?;
            Reply::new(
                format!("Exported {} row(s) from {}.{}", bundle.row_count, database, table),
                bundle,
            )
        }
        Command::Users => Reply::new("Users", engine.list_users().await?),
        Command::Grants { user, host } => Reply::new(
            format!("Grants for {}@{}", user, host),
            engine.get_grants(&user, &host).await?,
        ),
        Command::CreateUser {
            user,
            host,
            password,
        } => {
            let request = CreateUserRequest::new(&user, password).with_host(&host);
            Reply::created(
                format!("User {}@{} created", user, host),
                engine.create_user(&request).await?,
            )
        }
        Command::DropUser { user, host } => Reply::new(
            format!("User {}@{} dropped", user, host),
            engine.drop_user(&user, &host).await?,
        ),
        Command::Grant {
            user,
            privileges,
            host,
            database,
            table,
        } => {
            let request = GrantRequest::new(&user, privileges)
                .with_host(&host)
                .on_database(database)
                .on_table(table);
            Reply::new(
                format!("Privileges granted to {}@{}", user, host),
                engine.grant(&request).await?,
            )
        }
        Command::Revoke {
            user,
            privileges,
            host,
            database,
            table,
        } => {
            let request = GrantRequest::new(&user, privileges)
                .with_host(&host)
                .on_database(database)
                .on_table(table);
            Reply::new(
                format!("Privileges revoked from {}@{}", user, host),
                engine.revoke(&request).await?,
            )
        }
        Command::FlushPrivileges => {
            Reply::new("Privileges flushed", engine.flush_privileges().await?)
        }
        Command::Dump {
            database,
            table,
            output,
        } => {
            let mut request =
                DumpRequest::new(database, &connection.user, &connection.password, output);
            if let Some(table) = table {
                request = request.with_table(table);
            }
            let result = engine.dump_database(&request).await?;
            Reply::created(format!("Dump written to {}", result.file_path.display()), result)
        }
        Command::Query { sql, params, limit } => {
            let mut request = QueryRequest::new(sql);
            if let Some(raw) = params {
                request.params = parse_json("--params", &raw)?;
            }
            request.limit = limit;

            match engine.run_query(&request).await? {
                QueryOutcome::Rows(result) => {
                    let columns = format::column_names(&result.columns, &result.rows);
                    let mut reply =
                        Reply::new(format!("{} row(s)", result.row_count), &result)?;
                    reply.rows = Some((columns, result.rows, result.execution_time_ms));
                    Ok(reply)
                }
                QueryOutcome::Write(result) => Reply::new(
                    format!("{} row(s) affected", result.rows_affected),
                    result,
                ),
            }
        }
        Command::Schemas => Reply::new("Request schemas", request_schemas()),
    }
}

async fn run(engine: &AdminEngine, config: &Config, command: Command) -> DbResult<Reply> {
    let connection = config.connection_config()?;
    let info = engine.initialize(connection.clone()).await?;
    info!(
        host = %info.host,
        port = info.port,
        server_version = ?info.server_version,
        "Connected"
    );
    dispatch(engine, &connection, command).await
}

fn print_json(value: &impl Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => error!(error = %e, "Failed to serialize response"),
    }
}

fn emit(reply: Reply, output: OutputFormat) {
    if let Some((columns, rows, elapsed)) = &reply.rows {
        if let Some(rendered) = format::render_rows(output, columns, rows, *elapsed) {
            println!("{}", rendered);
            return;
        }
    }
    let response = ApiResponse::ok_with_message(reply.message, reply.data).with_status(reply.status);
    print_json(&response);
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse configuration from command line and environment
    let config = Config::parse_args();

    init_tracing(&config);

    let command = config.command.clone();
    let engine = AdminEngine::new(Arc::new(PoolManager::new()))
        .with_timeout(config.query_timeout_duration())
        .with_dump_binary(config.dump_binary.clone());

    if command.is_offline() {
        return match Reply::new("Request schemas", request_schemas()) {
            Ok(reply) => {
                emit(reply, config.format);
                ExitCode::SUCCESS
            }
            Err(e) => {
                print_json(&ApiResponse::from_error(&e, config.diagnostics));
                ExitCode::FAILURE
            }
        };
    }

    let outcome = run(&engine, &config, command).await;
    engine.shutdown().await;

    match outcome {
        Ok(reply) => {
            emit(reply, config.format);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, kind = e.kind(), "Command failed");
            print_json(&ApiResponse::from_error(&e, config.diagnostics));
            ExitCode::FAILURE
        }
    }
}
