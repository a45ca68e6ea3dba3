//! Account and privilege statements, plus a best-effort `SHOW GRANTS` parser.

use super::quote::{format_grantee, quote_string_literal, scope_segment};
use crate::error::{DbError, DbResult};
use crate::models::{CreateUserRequest, GrantEntry, GrantRequest};

pub const LIST_USERS: &str = r#"
    SELECT
        CONVERT(User USING utf8mb4) AS USER_NAME,
        CONVERT(Host USING utf8mb4) AS HOST_NAME
    FROM mysql.user
    ORDER BY User, Host
    "#;

pub const FLUSH_PRIVILEGES: &str = "FLUSH PRIVILEGES";

/// Privilege keywords accepted by GRANT and REVOKE.
pub const ALLOWED_PRIVILEGES: &[&str] = &[
    "ALL",
    "ALL PRIVILEGES",
    "ALTER",
    "ALTER ROUTINE",
    "CREATE",
    "CREATE ROLE",
    "CREATE ROUTINE",
    "CREATE TABLESPACE",
    "CREATE TEMPORARY TABLES",
    "CREATE USER",
    "CREATE VIEW",
    "DELETE",
    "DROP",
    "DROP ROLE",
    "EVENT",
    "EXECUTE",
    "FILE",
    "GRANT OPTION",
    "INDEX",
    "INSERT",
    "LOCK TABLES",
    "PROCESS",
    "PROXY",
    "REFERENCES",
    "RELOAD",
    "REPLICATION CLIENT",
    "REPLICATION SLAVE",
    "SELECT",
    "SHOW DATABASES",
    "SHOW VIEW",
    "SHUTDOWN",
    "SUPER",
    "TRIGGER",
    "UPDATE",
    "USAGE",
    // Dynamic privileges (MySQL 8.0+)
    "APPLICATION_PASSWORD_ADMIN",
    "AUDIT_ADMIN",
    "BACKUP_ADMIN",
    "BINLOG_ADMIN",
    "BINLOG_ENCRYPTION_ADMIN",
    "CONNECTION_ADMIN",
    "ENCRYPTION_KEY_ADMIN",
    "FLUSH_OPTIMIZER_COSTS",
    "FLUSH_STATUS",
    "FLUSH_TABLES",
    "FLUSH_USER_RESOURCES",
    "GROUP_REPLICATION_ADMIN",
    "PERSIST_RO_VARIABLES_ADMIN",
    "REPLICATION_APPLIER",
    "REPLICATION_SLAVE_ADMIN",
    "RESOURCE_GROUP_ADMIN",
    "RESOURCE_GROUP_USER",
    "ROLE_ADMIN",
    "SESSION_VARIABLES_ADMIN",
    "SET_USER_ID",
    "SHOW_ROUTINE",
    "SYSTEM_USER",
    "SYSTEM_VARIABLES_ADMIN",
    "TABLE_ENCRYPTION_ADMIN",
    "XA_RECOVER_ADMIN",
];

/// Uppercase, collapse inner whitespace and check against the allow-list.
pub fn normalize_privileges(privileges: &[String]) -> DbResult<Vec<String>> {
    if privileges.is_empty() {
        return Err(DbError::validation("At least one privilege is required"));
    }

    let mut normalized: Vec<String> = Vec::with_capacity(privileges.len());
    for privilege in privileges {
        let keyword = privilege
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();
        if !ALLOWED_PRIVILEGES.contains(&keyword.as_str()) {
            return Err(DbError::validation(format!(
                "Unknown privilege: {}",
                privilege
            )));
        }
        if !normalized.contains(&keyword) {
            normalized.push(keyword);
        }
    }
    Ok(normalized)
}

pub fn create_user(request: &CreateUserRequest) -> DbResult<String> {
    if request.password.is_empty() {
        return Err(DbError::validation("Password cannot be empty"));
    }
    Ok(format!(
        "CREATE USER IF NOT EXISTS {} IDENTIFIED BY {}",
        format_grantee(&request.user, &request.host)?,
        quote_string_literal(&request.password)
    ))
}

pub fn drop_user(user: &str, host: &str) -> DbResult<String> {
    Ok(format!("DROP USER IF EXISTS {}", format_grantee(user, host)?))
}

pub fn show_grants(user: &str, host: &str) -> DbResult<String> {
    Ok(format!("SHOW GRANTS FOR {}", format_grantee(user, host)?))
}

fn grant_scope(request: &GrantRequest) -> DbResult<String> {
    if request.db_name == "*" && request.table_name != "*" {
        return Err(DbError::validation(
            "A table-level grant needs a database name",
        ));
    }
    Ok(format!(
        "{}.{}",
        scope_segment(&request.db_name)?,
        scope_segment(&request.table_name)?
    ))
}

/// `GRANT p1, p2 ON db.table TO 'user'@'host'`
pub fn grant(request: &GrantRequest) -> DbResult<String> {
    Ok(format!(
        "GRANT {} ON {} TO {}",
        normalize_privileges(&request.privileges)?.join(", "),
        grant_scope(request)?,
        format_grantee(&request.user, &request.host)?
    ))
}

/// `REVOKE p1, p2 ON db.table FROM 'user'@'host'`
pub fn revoke(request: &GrantRequest) -> DbResult<String> {
    Ok(format!(
        "REVOKE {} ON {} FROM {}",
        normalize_privileges(&request.privileges)?.join(", "),
        grant_scope(request)?,
        format_grantee(&request.user, &request.host)?
    ))
}

/// Parse one `SHOW GRANTS` line.
///
/// Handles privilege grants of the form `GRANT <privs> ON <db>.<table> TO
/// <grantee> [WITH GRANT OPTION]`. Role grants, proxy grants and anything
/// else return `None`.
pub fn parse_grant_line(line: &str) -> Option<GrantEntry> {
    let line = line.trim();
    let body = strip_prefix_ignore_case(line, "GRANT ")?;

    let on = find_top_level(body, " ON ")?;
    let privilege_list = &body[..on];
    let rest = &body[on + " ON ".len()..];

    let to = find_top_level(rest, " TO ")?;
    let scope = rest[..to].trim();
    let target = rest[to + " TO ".len()..].trim();

    let dot = find_top_level(scope, ".")?;
    let database = unquote(scope[..dot].trim());
    let table = unquote(scope[dot + 1..].trim());

    let grantee_end = [" WITH ", " IDENTIFIED ", " REQUIRE ", " AS "]
        .iter()
        .filter_map(|kw| find_top_level(target, kw))
        .min()
        .unwrap_or(target.len());
    let grantee = target[..grantee_end].trim().to_string();
    let with_grant_option = find_top_level(target, " WITH GRANT OPTION").is_some();

    let privileges: Vec<String> = split_top_level(privilege_list, ',')
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if privileges.is_empty() || grantee.is_empty() {
        return None;
    }

    Some(GrantEntry {
        privileges,
        database,
        table,
        grantee,
        with_grant_option,
    })
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

/// Byte offsets of characters outside quotes and parentheses.
fn top_level_positions(s: &str) -> impl Iterator<Item = usize> + '_ {
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    s.char_indices().filter_map(move |(i, c)| {
        match quote {
            Some(q) if c == q => {
                quote = None;
                return None;
            }
            Some(_) => return None,
            None => {}
        }
        match c {
            '`' | '\'' | '"' => {
                quote = Some(c);
                None
            }
            '(' => {
                depth += 1;
                None
            }
            ')' => {
                depth = depth.saturating_sub(1);
                None
            }
            _ if depth == 0 => Some(i),
            _ => None,
        }
    })
}

fn find_top_level(s: &str, needle: &str) -> Option<usize> {
    top_level_positions(s).find(|&i| {
        s.get(i..i + needle.len())
            .is_some_and(|w| w.eq_ignore_ascii_case(needle))
    })
}

fn split_top_level(s: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for i in top_level_positions(s) {
        if s[i..].starts_with(separator) {
            parts.push(&s[start..i]);
            start = i + separator.len_utf8();
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Strip one level of backtick or single quotes, undoubling the quote char.
fn unquote(s: &str) -> String {
    for q in ['`', '\''] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            let doubled = format!("{}{}", q, q);
            return s[1..s.len() - 1].replace(&doubled, &q.to_string());
        }
    }
    s.to_string()
}
