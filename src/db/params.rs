//! Parameter binding for MySQL statements.
//!
//! Every value that reaches the server as data goes through [`bind_param`];
//! identifiers are handled separately by `sql::quote`.

use crate::models::QueryParam;
use sqlx::MySql;
use sqlx::mysql::MySqlArguments;
use sqlx::types::Json;

pub(crate) type MySqlQuery<'q> = sqlx::query::Query<'q, MySql, MySqlArguments>;

/// Bind a parameter to a MySQL query.
pub(crate) fn bind_param<'q>(query: MySqlQuery<'q>, param: &'q QueryParam) -> MySqlQuery<'q> {
    match param {
        QueryParam::Null => query.bind(None::<String>),
        QueryParam::Bool(v) => query.bind(*v),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::UInt(v) => query.bind(*v),
        QueryParam::Float(v) => query.bind(*v),
        QueryParam::String(v) => query.bind(v.as_str()),
        QueryParam::Json(v) => query.bind(Json(v)),
    }
}

/// Bind every parameter in order.
pub(crate) fn bind_all<'q>(mut query: MySqlQuery<'q>, params: &'q [QueryParam]) -> MySqlQuery<'q> {
    for param in params {
        query = bind_param(query, param);
    }
    query
}
