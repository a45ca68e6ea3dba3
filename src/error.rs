//! Error types for the admin engine.
//!
//! All failures are expressed as a single [`DbError`] enum built with `thiserror`.
//! Each variant maps onto an HTTP-style status class so the routing layer in
//! front of the engine can answer without inspecting messages.

use std::time::Duration;
use thiserror::Error;

/// MySQL error numbers that mean "this object already exists".
const CONFLICT_CODES: &[u16] = &[
    1007, // ER_DB_CREATE_EXISTS
    1050, // ER_TABLE_EXISTS_ERROR
    1060, // ER_DUP_FIELDNAME
    1061, // ER_DUP_KEYNAME
    1062, // ER_DUP_ENTRY
    1068, // ER_MULTIPLE_PRI_KEY
    1396, // ER_CANNOT_USER (CREATE USER on an existing account)
    1826, // ER_FK_DUP_NAME
    3822, // ER_CHECK_CONSTRAINT_DUP_NAME
];

/// MySQL error numbers that mean "the referenced object does not exist".
const NOT_FOUND_CODES: &[u16] = &[
    1008, // ER_DB_DROP_EXISTS
    1049, // ER_BAD_DB_ERROR
    1054, // ER_BAD_FIELD_ERROR
    1091, // ER_CANT_DROP_FIELD_OR_KEY
    1141, // ER_NONEXISTING_GRANT
    1146, // ER_NO_SUCH_TABLE
    1147, // ER_NONEXISTING_TABLE_GRANT
    3821, // ER_CHECK_CONSTRAINT_NOT_FOUND
];

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Connection pool is not initialized. Connect to a server first.")]
    NotInitialized,

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Invalid input: {message}")]
    Validation { message: String },

    #[error("{object} not found: {message}")]
    NotFound { object: String, message: String },

    #[error("Conflict during {operation}: {message}")]
    Conflict {
        operation: String,
        message: String,
        code: Option<u16>,
    },

    #[error("Database error during {operation}: {message}")]
    Engine {
        operation: String,
        message: String,
        /// MySQL error number, e.g. 1064 for a syntax error
        code: Option<u16>,
        /// e.g. "42000"
        sql_state: Option<String>,
    },

    /// A multi-statement operation stopped part way; earlier statements are committed.
    #[error(
        "Partially applied {operation}: {completed} of {total} statements succeeded ({affected_rows} rows affected) before failure: {message}"
    )]
    PartialFailure {
        operation: String,
        completed: usize,
        total: usize,
        affected_rows: u64,
        message: String,
    },

    #[error("Export failed: {message}")]
    Export { message: String },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout { operation: String, elapsed_secs: u64 },
}

impl DbError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not found error for the given object kind.
    pub fn not_found(object: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            object: object.into(),
            message: message.into(),
        }
    }

    /// Create a conflict error.
    pub fn conflict(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            operation: operation.into(),
            message: message.into(),
            code: None,
        }
    }

    /// Create an engine error with optional native code and SQL state.
    pub fn engine(
        operation: impl Into<String>,
        message: impl Into<String>,
        code: Option<u16>,
        sql_state: Option<String>,
    ) -> Self {
        Self::Engine {
            operation: operation.into(),
            message: message.into(),
            code,
            sql_state,
        }
    }

    /// Create a partial failure error for a non-atomic statement sequence.
    pub fn partial_failure(
        operation: impl Into<String>,
        completed: usize,
        total: usize,
        affected_rows: u64,
        cause: &DbError,
    ) -> Self {
        Self::PartialFailure {
            operation: operation.into(),
            completed,
            total,
            affected_rows,
            message: cause.to_string(),
        }
    }

    /// Create an export error.
    pub fn export(message: impl Into<String>) -> Self {
        Self::Export {
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// No pooled connection became free within the pool's acquire timeout.
    pub fn pool_timed_out(acquire_timeout: Duration) -> Self {
        Self::timeout("connection pool acquire", acquire_timeout.as_secs())
    }

    /// Wrap a sqlx error with the operation that produced it.
    ///
    /// Database errors are classified by MySQL error number into conflict,
    /// not-found or generic engine failures.
    pub fn from_sqlx(err: sqlx::Error, operation: impl Into<String>) -> Self {
        let operation = operation.into();
        match err {
            sqlx::Error::Database(db_err) => {
                let number = db_err
                    .try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>()
                    .map(|e| e.number());
                let sql_state = db_err.code().map(|c| c.to_string());
                let message = db_err.message().to_string();
                match number {
                    Some(n) if CONFLICT_CODES.contains(&n) => Self::Conflict {
                        operation,
                        message,
                        code: Some(n),
                    },
                    Some(n) if NOT_FOUND_CODES.contains(&n) => {
                        Self::not_found(operation, message)
                    }
                    _ => Self::engine(operation, message, number, sql_state),
                }
            }
            sqlx::Error::RowNotFound => Self::not_found(operation, "No rows returned"),
            sqlx::Error::Configuration(msg) => Self::configuration(msg.to_string()),
            // The configured wait is only known to the pool; see `pool_timed_out`
            sqlx::Error::PoolTimedOut => Self::connection(
                "Timed out waiting for a pooled connection",
                "Raise max_connections or acquire_timeout, or look for long-running statements",
            ),
            sqlx::Error::PoolClosed => {
                Self::connection("Connection pool is closed", "Reconnect to the server")
            }
            sqlx::Error::Io(io_err) => Self::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => Self::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => Self::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                Self::engine(operation, format!("Column not found: {}", col), None, None)
            }
            sqlx::Error::ColumnDecode { index, source } => Self::engine(
                operation,
                format!("Failed to decode column {}: {}", index, source),
                None,
                None,
            ),
            other => Self::engine(operation, other.to_string(), None, None),
        }
    }

    /// HTTP-style status class for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Configuration { .. } | Self::Validation { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::NotInitialized => 503,
            Self::Connection { .. }
            | Self::Engine { .. }
            | Self::PartialFailure { .. }
            | Self::Export { .. }
            | Self::Timeout { .. } => 500,
        }
    }

    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration_error",
            Self::NotInitialized => "not_initialized",
            Self::Connection { .. } => "connection_error",
            Self::Validation { .. } => "validation_error",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::Engine { .. } => "engine_error",
            Self::PartialFailure { .. } => "partial_failure",
            Self::Export { .. } => "export_error",
            Self::Timeout { .. } => "timeout",
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::NotInitialized => Some("Initialize the connection pool before issuing requests"),
            Self::PartialFailure { .. } => {
                Some("Earlier statements were committed; re-read the table before retrying")
            }
            _ => None,
        }
    }

    /// Check if this error is retryable by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }

    /// Native diagnostic details (engine code, SQL state, progress counters).
    ///
    /// Only attached to responses when diagnostics are enabled.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Engine {
                code, sql_state, ..
            } => Some(serde_json::json!({ "code": code, "sqlState": sql_state })),
            Self::Conflict { code, .. } => Some(serde_json::json!({ "code": code })),
            Self::PartialFailure {
                completed,
                total,
                affected_rows,
                ..
            } => Some(serde_json::json!({
                "completed": completed,
                "total": total,
                "affectedRows": affected_rows,
            })),
            _ => None,
        }
    }
}

/// Convert sqlx errors without operation context.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        DbError::from_sqlx(err, "statement")
    }
}

/// Result type alias for engine operations.
pub type DbResult<T> = Result<T, DbError>;
