//! Schema and data operations engine for MySQL.
//!
//! This library provides validated DDL and DML builders, catalog
//! introspection, account management and dump orchestration on top of one
//! shared connection pool. [`AdminEngine`] is the entry point; results are
//! wrapped in [`ApiResponse`] by the routing layer.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod ops;
pub mod response;
pub mod sql;

pub use config::Config;
pub use db::PoolManager;
pub use engine::{AdminEngine, request_schemas};
pub use error::{DbError, DbResult};
pub use response::ApiResponse;
