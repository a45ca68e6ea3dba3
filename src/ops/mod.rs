//! Operation handlers.
//!
//! Each handler owns a handle to the shared [`PoolManager`](crate::db::PoolManager)
//! and a [`QueryExecutor`](crate::db::QueryExecutor) carrying the statement
//! timeout. Handlers validate and build SQL first, then acquire the pool.

pub mod database;
pub mod export;
pub mod format;
pub mod query;
pub mod rows;
pub mod table;
pub mod users;

pub use database::DatabaseHandler;
pub use export::ExportHandler;
pub use format::OutputFormat;
pub use query::QueryHandler;
pub use rows::RowHandler;
pub use table::TableHandler;
pub use users::UserHandler;
