//! Identifier quoting and literal formatting.
//!
//! Identifiers (databases, tables, columns, constraint names) cannot be bound
//! as parameters, so every name that reaches a statement passes through
//! [`quote_identifier`]. Row values never come through here; they are bound
//! as `?` placeholders.
//!
//! The few literals that must be inlined into DDL (column defaults, account
//! names, passwords) are produced by the functions below, which refuse
//! anything they cannot represent safely.

use crate::error::{DbError, DbResult};
use serde_json::Value as JsonValue;

/// MySQL limit for database, table, column, index and constraint names.
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// MySQL limit for the user part of an account name.
pub const MAX_USER_NAME_LENGTH: usize = 32;

/// MySQL limit for the host part of an account name.
pub const MAX_HOST_NAME_LENGTH: usize = 255;

/// Validate an identifier.
///
/// Rejects empty names, names containing NUL and names longer than
/// [`MAX_IDENTIFIER_LENGTH`] characters. Everything else, including
/// backticks, is escapable.
pub fn validate_identifier(name: &str) -> DbResult<()> {
    if name.is_empty() {
        return Err(DbError::validation("Identifier cannot be empty"));
    }

    if name.contains('\0') {
        return Err(DbError::validation(format!(
            "Identifier contains a NUL byte: {:?}",
            name
        )));
    }

    let length = name.chars().count();
    if length > MAX_IDENTIFIER_LENGTH {
        return Err(DbError::validation(format!(
            "Identifier exceeds maximum length of {} characters (got {}): {:?}",
            MAX_IDENTIFIER_LENGTH, length, name
        )));
    }

    Ok(())
}

/// Quote an identifier using backticks.
///
/// ```
/// use db_admin_engine::sql::quote::quote_identifier;
/// assert_eq!(quote_identifier("users").unwrap(), "`users`");
/// assert_eq!(quote_identifier("we`ird").unwrap(), "`we``ird`");
/// ```
pub fn quote_identifier(name: &str) -> DbResult<String> {
    validate_identifier(name)?;
    Ok(format!("`{}`", name.replace('`', "``")))
}

/// Quote every identifier in order, joined with `", "`.
pub fn quote_identifier_list(names: &[String]) -> DbResult<String> {
    let quoted = names
        .iter()
        .map(|n| quote_identifier(n))
        .collect::<DbResult<Vec<_>>>()?;
    Ok(quoted.join(", "))
}

/// Qualify a table with its database: `` `db`.`table` ``.
pub fn qualify(database: &str, table: &str) -> DbResult<String> {
    Ok(format!(
        "{}.{}",
        quote_identifier(database)?,
        quote_identifier(table)?
    ))
}

/// Single-quoted string literal with `\` and `'` escaped.
pub fn quote_string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("''"),
            '\0' => out.push_str("\\0"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

/// Account name in `'user'@'host'` form.
pub fn format_grantee(user: &str, host: &str) -> DbResult<String> {
    if user.is_empty() {
        return Err(DbError::validation("User name cannot be empty"));
    }
    if user.chars().count() > MAX_USER_NAME_LENGTH {
        return Err(DbError::validation(format!(
            "User name exceeds maximum length of {} characters",
            MAX_USER_NAME_LENGTH
        )));
    }
    if host.is_empty() {
        return Err(DbError::validation("Host cannot be empty; use '%' for any host"));
    }
    if host.chars().count() > MAX_HOST_NAME_LENGTH {
        return Err(DbError::validation(format!(
            "Host exceeds maximum length of {} characters",
            MAX_HOST_NAME_LENGTH
        )));
    }
    if user.contains('\0') || host.contains('\0') {
        return Err(DbError::validation("Account name contains a NUL byte"));
    }
    Ok(format!(
        "{}@{}",
        quote_string_literal(user),
        quote_string_literal(host)
    ))
}

/// One side of a grant scope: `*` stays bare, anything else is quoted.
pub fn scope_segment(name: &str) -> DbResult<String> {
    if name == "*" {
        Ok("*".to_string())
    } else {
        quote_identifier(name)
    }
}

/// Validate a column type such as `VARCHAR(255)` or `ENUM('a','b')`.
///
/// The type is inlined into DDL, so it must start with a letter, keep its
/// parentheses balanced and stay clear of terminators and comments.
pub fn validate_sql_type(sql_type: &str) -> DbResult<()> {
    let trimmed = sql_type.trim();
    if trimmed.is_empty() {
        return Err(DbError::validation("Column type cannot be empty"));
    }
    if !trimmed.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(DbError::validation(format!(
            "Column type must start with a type name: {:?}",
            sql_type
        )));
    }
    reject_injection_markers(trimmed, "Column type")?;
    if trimmed.contains('`') {
        return Err(DbError::validation(format!(
            "Column type contains a backtick: {:?}",
            sql_type
        )));
    }

    let shape = scan_nesting(trimmed);
    if !shape.balanced {
        return Err(DbError::validation(format!(
            "Column type has unbalanced parentheses or quotes: {:?}",
            sql_type
        )));
    }
    // Commas are only legal inside a length, precision or value list
    if shape.top_level_comma {
        return Err(DbError::validation(format!(
            "Column type contains a comma outside parentheses: {:?}",
            sql_type
        )));
    }
    Ok(())
}

/// Validate a CHECK expression against statement and comment injection.
///
/// The expression is wrapped in `CHECK (...)`, so its parentheses must
/// balance outside string literals or it could close the clause early.
pub fn validate_check_expression(expression: &str) -> DbResult<()> {
    if expression.trim().is_empty() {
        return Err(DbError::validation("CHECK expression cannot be empty"));
    }
    reject_injection_markers(expression, "CHECK expression")?;
    if !scan_nesting(expression).balanced {
        return Err(DbError::validation(format!(
            "CHECK expression has unbalanced parentheses or quotes: {:?}",
            expression
        )));
    }
    Ok(())
}

struct Nesting {
    balanced: bool,
    top_level_comma: bool,
}

/// Track parenthesis depth outside `'...'` and `"..."` literals.
fn scan_nesting(text: &str) -> Nesting {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut top_level_comma = false;
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match (quote, ch) {
            (Some(_), '\\') => {
                chars.next();
            }
            (Some(q), c) if c == q => {
                if chars.peek() == Some(&q) {
                    chars.next();
                } else {
                    quote = None;
                }
            }
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth -= 1;
                if depth < 0 {
                    return Nesting {
                        balanced: false,
                        top_level_comma,
                    };
                }
            }
            (None, ',') if depth == 0 => top_level_comma = true,
            _ => {}
        }
    }
    Nesting {
        balanced: depth == 0 && quote.is_none(),
        top_level_comma,
    }
}

/// Validate a character set or collation name (`utf8mb4`, `utf8mb4_0900_ai_ci`).
pub fn validate_charset_name(name: &str) -> DbResult<()> {
    if name.is_empty() || name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(DbError::validation(format!(
            "Invalid character set or collation name: {:?}",
            name
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(DbError::validation(format!(
            "Character set and collation names may only contain letters, digits and '_': {:?}",
            name
        )));
    }
    Ok(())
}

fn reject_injection_markers(text: &str, what: &str) -> DbResult<()> {
    if text.contains(';') {
        return Err(DbError::validation(format!(
            "{} contains a statement terminator: {:?}",
            what, text
        )));
    }
    if text.contains("--") || text.contains("/*") || text.contains("*/") || text.contains('#') {
        return Err(DbError::validation(format!(
            "{} contains comment markers: {:?}",
            what, text
        )));
    }
    Ok(())
}

/// Base type name: lowercase, without length, precision or attributes.
fn base_type(sql_type: &str) -> String {
    sql_type
        .trim()
        .split(|c: char| c == '(' || c.is_whitespace())
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Types whose DEFAULT literal must be a quoted string.
pub fn is_string_like_type(sql_type: &str) -> bool {
    matches!(
        base_type(sql_type).as_str(),
        "char"
            | "varchar"
            | "tinytext"
            | "text"
            | "mediumtext"
            | "longtext"
            | "binary"
            | "varbinary"
            | "tinyblob"
            | "blob"
            | "mediumblob"
            | "longblob"
            | "enum"
            | "set"
            | "date"
            | "datetime"
            | "timestamp"
            | "time"
            | "json"
    )
}

fn is_temporal_type(sql_type: &str) -> bool {
    matches!(
        base_type(sql_type).as_str(),
        "date" | "datetime" | "timestamp" | "time"
    )
}

/// `CURRENT_TIMESTAMP`, `CURRENT_TIMESTAMP()` or `CURRENT_TIMESTAMP(n)`.
fn is_current_timestamp(token: &str) -> bool {
    let upper = token.trim().to_uppercase();
    let Some(rest) = upper.strip_prefix("CURRENT_TIMESTAMP") else {
        return false;
    };
    if rest.is_empty() {
        return true;
    }
    rest.strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .is_some_and(|digits| digits.chars().all(|c| c.is_ascii_digit()) && digits.len() <= 1)
}

fn is_numeric_literal(token: &str) -> bool {
    let token = token.trim();
    !token.is_empty()
        && token.chars().any(|c| c.is_ascii_digit())
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        && token.parse::<f64>().is_ok()
}

/// Format a DEFAULT value according to the column type.
///
/// String-like types get a quoted literal (`'abc'`); temporal types also
/// accept a bare `CURRENT_TIMESTAMP[(n)]`. Other types take numbers,
/// booleans, `NULL` and `CURRENT_TIMESTAMP[(n)]` bare; any other token is
/// rejected.
pub fn format_default_literal(value: &JsonValue, sql_type: &str) -> DbResult<String> {
    if value.is_null() {
        return Ok("NULL".to_string());
    }

    if is_string_like_type(sql_type) {
        return match value {
            JsonValue::String(s) if is_temporal_type(sql_type) && is_current_timestamp(s) => {
                Ok(s.trim().to_uppercase())
            }
            JsonValue::String(s) => Ok(quote_string_literal(s)),
            JsonValue::Number(n) => Ok(quote_string_literal(&n.to_string())),
            JsonValue::Bool(b) => Ok(quote_string_literal(if *b { "1" } else { "0" })),
            JsonValue::Array(_) | JsonValue::Object(_) if base_type(sql_type) == "json" => {
                Ok(quote_string_literal(&value.to_string()))
            }
            _ => Err(DbError::validation(format!(
                "Unsupported default value for type {}: {}",
                sql_type, value
            ))),
        };
    }

    match value {
        JsonValue::Number(n) => Ok(n.to_string()),
        JsonValue::Bool(b) => Ok(if *b { "TRUE" } else { "FALSE" }.to_string()),
        JsonValue::String(s) => {
            let token = s.trim();
            let upper = token.to_uppercase();
            if is_numeric_literal(token) {
                Ok(token.to_string())
            } else if matches!(upper.as_str(), "NULL" | "TRUE" | "FALSE") || is_current_timestamp(token) {
                Ok(upper)
            } else {
                Err(DbError::validation(format!(
                    "Default value {:?} is not a valid literal for type {}",
                    s, sql_type
                )))
            }
        }
        _ => Err(DbError::validation(format!(
            "Unsupported default value for type {}: {}",
            sql_type, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use serde_json::json;

    fn unquote(quoted: &str) -> String {
        quoted[1..quoted.len() - 1].replace("``", "`")
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("users").unwrap(), "`users`");
        assert_eq!(quote_identifier("order items").unwrap(), "`order items`");
        assert_eq!(quote_identifier("a`b").unwrap(), "`a``b`");
    }

    #[test]
    fn test_quote_identifier_rejects_invalid() {
        assert!(quote_identifier("").is_err());
        assert!(quote_identifier("bad\0name").is_err());
        assert!(quote_identifier(&"x".repeat(65)).is_err());
        assert!(quote_identifier(&"x".repeat(64)).is_ok());
    }

    #[test]
    fn test_quote_identifier_counts_characters_not_bytes() {
        let name = "é".repeat(64);
        assert!(quote_identifier(&name).is_ok());
    }

    #[test]
    fn test_quote_identifier_round_trip_random() {
        let alphabet: Vec<char> = "ab`c'\"; -_ é表`".chars().collect();
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let len = rng.gen_range(1..=MAX_IDENTIFIER_LENGTH);
            let name: String = (0..len)
                .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
                .collect();
            let quoted = quote_identifier(&name).unwrap();
            assert!(quoted.starts_with('`') && quoted.ends_with('`'));
            assert_eq!(unquote(&quoted), name);
        }
    }

    #[test]
    fn test_qualify() {
        assert_eq!(qualify("shop", "users").unwrap(), "`shop`.`users`");
        assert!(qualify("", "users").is_err());
    }

    #[test]
    fn test_quote_string_literal() {
        assert_eq!(quote_string_literal("abc"), "'abc'");
        assert_eq!(quote_string_literal("O'Brien"), "'O''Brien'");
        assert_eq!(quote_string_literal("a\\b"), "'a\\\\b'");
        assert_eq!(quote_string_literal("x\\'; DROP"), "'x\\\\''; DROP'");
    }

    #[test]
    fn test_format_grantee() {
        assert_eq!(format_grantee("app", "%").unwrap(), "'app'@'%'");
        assert_eq!(format_grantee("o'neil", "10.0.0.1").unwrap(), "'o''neil'@'10.0.0.1'");
        assert!(format_grantee("", "%").is_err());
        assert!(format_grantee("app", "").is_err());
        assert!(format_grantee(&"u".repeat(33), "%").is_err());
    }

    #[test]
    fn test_scope_segment() {
        assert_eq!(scope_segment("*").unwrap(), "*");
        assert_eq!(scope_segment("shop").unwrap(), "`shop`");
    }

    #[test]
    fn test_default_string_type_is_quoted() {
        assert_eq!(
            format_default_literal(&json!("abc"), "varchar(10)").unwrap(),
            "'abc'"
        );
        assert_eq!(format_default_literal(&json!("x"), "ENUM('x','y')").unwrap(), "'x'");
        assert_eq!(format_default_literal(&json!(5), "CHAR(2)").unwrap(), "'5'");
    }

    #[test]
    fn test_default_numeric_type_is_bare() {
        assert_eq!(format_default_literal(&json!(5), "int").unwrap(), "5");
        assert_eq!(format_default_literal(&json!(2.5), "DECIMAL(5,2)").unwrap(), "2.5");
        assert_eq!(format_default_literal(&json!("-10"), "bigint").unwrap(), "-10");
        assert_eq!(format_default_literal(&json!(true), "tinyint(1)").unwrap(), "TRUE");
    }

    #[test]
    fn test_default_null_and_keywords() {
        assert_eq!(format_default_literal(&json!(null), "varchar(5)").unwrap(), "NULL");
        assert_eq!(format_default_literal(&json!("null"), "int").unwrap(), "NULL");
        assert_eq!(
            format_default_literal(&json!("current_timestamp"), "timestamp").unwrap(),
            "CURRENT_TIMESTAMP"
        );
        assert_eq!(
            format_default_literal(&json!("CURRENT_TIMESTAMP(3)"), "DATETIME(3)").unwrap(),
            "CURRENT_TIMESTAMP(3)"
        );
    }

    #[test]
    fn test_default_temporal_literal_is_quoted() {
        assert_eq!(
            format_default_literal(&json!("2024-01-01"), "date").unwrap(),
            "'2024-01-01'"
        );
    }

    #[test]
    fn test_default_rejects_arbitrary_tokens() {
        assert!(format_default_literal(&json!("1; DROP TABLE users"), "int").is_err());
        assert!(format_default_literal(&json!("abc"), "int").is_err());
        assert!(format_default_literal(&json!("inf"), "double").is_err());
        assert!(format_default_literal(&json!([1]), "int").is_err());
    }

    #[test]
    fn test_default_json_object() {
        assert_eq!(
            format_default_literal(&json!({"a": 1}), "json").unwrap(),
            "'{\"a\":1}'"
        );
    }

    #[test]
    fn test_validate_sql_type() {
        assert!(validate_sql_type("INT").is_ok());
        assert!(validate_sql_type("varchar(255)").is_ok());
        assert!(validate_sql_type("DECIMAL(10, 2) UNSIGNED").is_ok());
        assert!(validate_sql_type("ENUM('a','it''s')").is_ok());
        assert!(validate_sql_type("").is_err());
        assert!(validate_sql_type("INT; DROP TABLE x").is_err());
        assert!(validate_sql_type("INT -- x").is_err());
        assert!(validate_sql_type("VARCHAR(10").is_err());
        assert!(validate_sql_type("(INT)").is_err());
        assert!(validate_sql_type("ENUM('a)").is_err());
    }

    #[test]
    fn test_validate_sql_type_rejects_top_level_comma() {
        assert!(validate_sql_type("INT, `evil` INT").is_err());
        assert!(validate_sql_type("INT),x INT").is_err());
        assert!(validate_sql_type("DECIMAL(10,2)").is_ok());
        assert!(validate_sql_type("ENUM('a,b','c')").is_ok());
        assert!(validate_sql_type("SET('x)','y')").is_ok());
    }

    #[test]
    fn test_validate_check_expression() {
        assert!(validate_check_expression("price > 0").is_ok());
        assert!(validate_check_expression("status IN ('a', 'b')").is_ok());
        assert!(validate_check_expression("1=1; DROP TABLE users").is_err());
        assert!(validate_check_expression("1=1 -- x").is_err());
        assert!(validate_check_expression("1=1 /* x */").is_err());
        assert!(validate_check_expression("  ").is_err());
    }

    #[test]
    fn test_validate_check_expression_requires_balanced_parens() {
        assert!(validate_check_expression("1=1), DROP COLUMN `id`, ADD CHECK (1=1").is_err());
        assert!(validate_check_expression("price > 0), `evil` INT, CHECK (1").is_err());
        assert!(validate_check_expression("(a > 0").is_err());
        assert!(validate_check_expression("name <> 'x").is_err());
        assert!(validate_check_expression("(a > 0) AND (b < 10)").is_ok());
        assert!(validate_check_expression("label <> ')'").is_ok());
        assert!(validate_check_expression("label <> 'it''s ('").is_ok());
    }

    #[test]
    fn test_validate_charset_name() {
        assert!(validate_charset_name("utf8mb4").is_ok());
        assert!(validate_charset_name("utf8mb4_0900_ai_ci").is_ok());
        assert!(validate_charset_name("utf8 COLLATE x").is_err());
        assert!(validate_charset_name("").is_err());
    }
}
