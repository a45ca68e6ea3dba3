//! Row statement builders.
//!
//! Builders return the SQL text together with the values to bind, in
//! placeholder order.

use super::quote::{qualify, quote_identifier};
use crate::db::types::{TypeCategory, categorize_type};
use crate::error::{DbError, DbResult};
use crate::models::{QueryParam, Row};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// MySQL rejects prepared statements with more placeholders than this.
pub const MAX_PLACEHOLDERS: usize = 65_535;

/// A statement plus its bound values.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub sql: String,
    pub params: Vec<QueryParam>,
}

/// Multi-row INSERT. The column list comes from the first row; every other
/// row must carry exactly the same keys.
pub fn insert_rows(database: &str, table: &str, rows: &[Row]) -> DbResult<BoundStatement> {
    let Some(first) = rows.first() else {
        return Err(DbError::validation("No rows to insert"));
    };
    if first.is_empty() {
        return Err(DbError::validation("Rows to insert must have at least one column"));
    }

    let columns: Vec<&String> = first.keys().collect();
    for (index, row) in rows.iter().enumerate().skip(1) {
        if row.len() != columns.len() || !columns.iter().all(|c| row.contains_key(*c)) {
            return Err(DbError::validation(format!(
                "Row {} has different columns than the first row",
                index + 1
            )));
        }
    }

    let placeholders = rows.len() * columns.len();
    if placeholders > MAX_PLACEHOLDERS {
        return Err(DbError::validation(format!(
            "Insert needs {} placeholders; split it into batches of at most {}",
            placeholders, MAX_PLACEHOLDERS
        )));
    }

    let column_list = columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<DbResult<Vec<_>>>()?
        .join(", ");
    let tuple = format!("({})", vec!["?"; columns.len()].join(", "));
    let values = vec![tuple.as_str(); rows.len()].join(", ");

    let params = rows
        .iter()
        .flat_map(|row| columns.iter().map(move |c| QueryParam::from_json(&row[c.as_str()])))
        .collect();

    Ok(BoundStatement {
        sql: format!(
            "INSERT INTO {} ({}) VALUES {}",
            qualify(database, table)?,
            column_list,
            values
        ),
        params,
    })
}

/// How a snapshot field is compared with its column.
///
/// Row previews render JSON columns as JSON values and binary columns as
/// text or base64, so those need a conversion on the server side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotMatch {
    #[default]
    Plain,
    Json,
    Binary,
}

impl SnapshotMatch {
    /// Pick the comparison for a full column type such as `varbinary(16)`.
    pub fn for_column_type(column_type: &str) -> Self {
        let base = column_type
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or_default();
        match categorize_type(base) {
            TypeCategory::Json => Self::Json,
            TypeCategory::Binary => Self::Binary,
            _ => Self::Plain,
        }
    }
}

/// Comparison per column, keyed by lowercase column name. Columns missing
/// from the map compare as [`SnapshotMatch::Plain`].
pub type SnapshotColumns = HashMap<String, SnapshotMatch>;

/// Whether `text` is base64 for bytes that are not valid UTF-8, which is
/// the only case where a preview falls back to base64.
fn is_base64_preview(text: &str) -> bool {
    STANDARD
        .decode(text)
        .is_ok_and(|bytes| std::str::from_utf8(&bytes).is_err())
}

/// DELETE matching one row snapshot on every field. Null fields compare with
/// `IS NULL`; no LIMIT is added, so duplicate rows all go.
///
/// JSON columns compare through `CAST(? AS JSON)`. Binary columns whose
/// value looks like a base64 preview also accept the decoded bytes.
pub fn delete_snapshot(
    database: &str,
    table: &str,
    snapshot: &Row,
    columns: &SnapshotColumns,
) -> DbResult<BoundStatement> {
    if snapshot.is_empty() {
        return Err(DbError::validation("Row snapshot to delete is empty"));
    }

    let mut conditions = Vec::with_capacity(snapshot.len());
    let mut params = Vec::new();
    for (column, value) in snapshot {
        let quoted = quote_identifier(column)?;
        let kind = columns
            .get(&column.to_lowercase())
            .copied()
            .unwrap_or_default();
        match (kind, value) {
            (_, JsonValue::Null) => conditions.push(format!("{} IS NULL", quoted)),
            (SnapshotMatch::Json, _) => {
                conditions.push(format!("{} = CAST(? AS JSON)", quoted));
                params.push(QueryParam::String(value.to_string()));
            }
            (SnapshotMatch::Binary, JsonValue::String(text)) if is_base64_preview(text) => {
                conditions.push(format!("({0} = ? OR {0} = FROM_BASE64(?))", quoted));
                params.push(QueryParam::String(text.clone()));
                params.push(QueryParam::String(text.clone()));
            }
            _ => {
                conditions.push(format!("{} = ?", quoted));
                params.push(QueryParam::from_json(value));
            }
        }
    }

    Ok(BoundStatement {
        sql: format!(
            "DELETE FROM {} WHERE {}",
            qualify(database, table)?,
            conditions.join(" AND ")
        ),
        params,
    })
}

/// Preview query. `fetch_limit` is the number of rows to ask the server for.
pub fn select_rows(database: &str, table: &str, fetch_limit: u32) -> DbResult<String> {
    Ok(format!(
        "SELECT * FROM {} LIMIT {}",
        qualify(database, table)?,
        fetch_limit
    ))
}

/// Keywords that start statements returning a result set.
const READ_KEYWORDS: &[&str] = &["SELECT", "SHOW", "DESCRIBE", "DESC", "EXPLAIN", "WITH"];

/// Whether a raw statement returns rows, judged by its first keyword.
///
/// Leading whitespace, `--`/`#` line comments, `/* */` block comments and
/// opening parentheses are skipped.
pub fn is_read_statement(sql: &str) -> bool {
    let mut rest = sql;
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
        if let Some(after) = rest.strip_prefix("--").or_else(|| rest.strip_prefix('#')) {
            rest = after.split_once('\n').map(|(_, tail)| tail).unwrap_or("");
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = after.split_once("*/").map(|(_, tail)| tail).unwrap_or("");
        } else {
            break;
        }
    }

    let keyword: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_uppercase();
    READ_KEYWORDS.contains(&keyword.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Row {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected a JSON object"),
        }
    }

    #[test]
    fn test_insert_rows_multi_row() {
        let rows = vec![
            row(json!({"email": "a@x.com", "name": "A"})),
            row(json!({"name": "B", "email": "b@x.com"})),
        ];
        let stmt = insert_rows("shop", "users", &rows).unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO `shop`.`users` (`email`, `name`) VALUES (?, ?), (?, ?)"
        );
        assert_eq!(
            stmt.params,
            vec![
                QueryParam::from("a@x.com"),
                QueryParam::from("A"),
                QueryParam::from("b@x.com"),
                QueryParam::from("B"),
            ]
        );
    }

    #[test]
    fn test_insert_rows_rejects_mismatched_keys() {
        let rows = vec![
            row(json!({"a": 1, "b": 2})),
            row(json!({"a": 1, "c": 2})),
        ];
        let result = insert_rows("shop", "t", &rows);
        assert!(matches!(result, Err(DbError::Validation { .. })));

        let missing = vec![row(json!({"a": 1, "b": 2})), row(json!({"a": 1}))];
        assert!(insert_rows("shop", "t", &missing).is_err());
    }

    #[test]
    fn test_insert_rows_rejects_empty_input() {
        assert!(insert_rows("shop", "t", &[]).is_err());
        assert!(insert_rows("shop", "t", &[Row::new()]).is_err());
    }

    #[test]
    fn test_insert_value_never_in_sql_text() {
        let rows = vec![row(json!({"name": "x'); DROP TABLE users; --"}))];
        let stmt = insert_rows("shop", "users", &rows).unwrap();
        assert!(!stmt.sql.contains("DROP"));
        assert_eq!(stmt.params.len(), 1);
    }

    #[test]
    fn test_delete_snapshot_uses_is_null() {
        let snapshot = row(json!({"id": 7, "note": null}));
        let stmt = delete_snapshot("shop", "t", &snapshot, &SnapshotColumns::new()).unwrap();
        assert_eq!(
            stmt.sql,
            "DELETE FROM `shop`.`t` WHERE `id` = ? AND `note` IS NULL"
        );
        assert_eq!(stmt.params, vec![QueryParam::Int(7)]);
        assert!(!stmt.sql.contains("LIMIT"));
    }

    #[test]
    fn test_delete_snapshot_casts_json_columns() {
        let snapshot = row(json!({"id": 1, "doc": {"a": [1, 2]}, "tag": "x"}));
        let columns = SnapshotColumns::from([
            ("doc".to_string(), SnapshotMatch::Json),
            ("tag".to_string(), SnapshotMatch::Json),
        ]);
        let stmt = delete_snapshot("shop", "t", &snapshot, &columns).unwrap();
        assert_eq!(
            stmt.sql,
            "DELETE FROM `shop`.`t` WHERE `doc` = CAST(? AS JSON) AND `id` = ? \
             AND `tag` = CAST(? AS JSON)"
        );
        assert_eq!(
            stmt.params,
            vec![
                QueryParam::String("{\"a\":[1,2]}".to_string()),
                QueryParam::Int(1),
                QueryParam::String("\"x\"".to_string()),
            ]
        );
    }

    #[test]
    fn test_delete_snapshot_decodes_base64_binary_preview() {
        // Bytes that are not UTF-8 come back from previews as base64
        let preview = match crate::db::types::binary_to_json(&[0xff, 0x00, 0x10]) {
            JsonValue::String(s) => s,
            other => panic!("unexpected preview {:?}", other),
        };
        let snapshot = row(json!({"Payload": preview, "label": "plain"}));
        let columns = SnapshotColumns::from([
            ("payload".to_string(), SnapshotMatch::Binary),
            ("label".to_string(), SnapshotMatch::Binary),
        ]);
        let stmt = delete_snapshot("shop", "t", &snapshot, &columns).unwrap();
        assert_eq!(
            stmt.sql,
            "DELETE FROM `shop`.`t` WHERE (`Payload` = ? OR `Payload` = FROM_BASE64(?)) \
             AND `label` = ?"
        );
        assert_eq!(stmt.params.len(), 3);
        assert_eq!(stmt.params[1], QueryParam::String(preview));
    }

    #[test]
    fn test_snapshot_match_for_column_type() {
        assert_eq!(SnapshotMatch::for_column_type("json"), SnapshotMatch::Json);
        assert_eq!(SnapshotMatch::for_column_type("varbinary(16)"), SnapshotMatch::Binary);
        assert_eq!(SnapshotMatch::for_column_type("longblob"), SnapshotMatch::Binary);
        assert_eq!(SnapshotMatch::for_column_type("varchar(20)"), SnapshotMatch::Plain);
        assert_eq!(SnapshotMatch::for_column_type("int unsigned"), SnapshotMatch::Plain);
    }

    #[test]
    fn test_delete_snapshot_rejects_empty() {
        assert!(matches!(
            delete_snapshot("shop", "t", &Row::new(), &SnapshotColumns::new()),
            Err(DbError::Validation { .. })
        ));
    }

    #[test]
    fn test_select_rows() {
        assert_eq!(
            select_rows("shop", "users", 101).unwrap(),
            "SELECT * FROM `shop`.`users` LIMIT 101"
        );
    }

    #[test]
    fn test_is_read_statement() {
        assert!(is_read_statement("SELECT 1"));
        assert!(is_read_statement("  select * from t"));
        assert!(is_read_statement("SHOW TABLES"));
        assert!(is_read_statement("desc t"));
        assert!(is_read_statement("WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(is_read_statement("-- note\nSELECT 1"));
        assert!(is_read_statement("/* hint */ EXPLAIN SELECT 1"));
        assert!(is_read_statement("(SELECT 1) UNION (SELECT 2)"));

        assert!(!is_read_statement("UPDATE t SET a = 1"));
        assert!(!is_read_statement("INSERT INTO t VALUES (1)"));
        assert!(!is_read_statement("DELETE FROM t"));
        assert!(!is_read_statement("SELECTED"));
        assert!(!is_read_statement(""));
    }
}
