//! Database access layer.
//!
//! This module provides database access functionality:
//! - Connection pool management
//! - Statement execution under timeouts
//! - Schema introspection
//! - Row-to-JSON type mappings

pub mod executor;
pub mod params;
pub mod pool;
pub mod schema;
pub mod types;

pub use executor::QueryExecutor;
pub use pool::PoolManager;
pub use schema::SchemaInspector;
