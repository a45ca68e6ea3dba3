//! SQL text generation.
//!
//! Every statement the engine runs is assembled here. Identifiers go through
//! [`quote`]; row values never appear in the text and are bound as `?`
//! parameters instead.

pub mod ddl;
pub mod dml;
pub mod privilege;
pub mod quote;
