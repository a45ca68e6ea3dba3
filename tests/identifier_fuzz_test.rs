//! Randomized tests for identifier quoting and statement builders.
//!
//! No server required. Random and hostile names must either be rejected
//! with a validation error or come back quoted so that unquoting yields the
//! original name.

use db_admin_engine::DbError;
use db_admin_engine::models::{ColumnSpec, ConstraintSpec, ForeignKeyAction};
use db_admin_engine::sql::{ddl, privilege, quote};
use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;

/// Generate random string of given length
fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Random name mixing alphanumerics with characters that need escaping.
fn random_hostile_name(max_len: usize) -> String {
    const SPICY: &[char] = &['`', '\'', '"', ';', ' ', '-', '\\', '.', '(', ')', 'é', '表'];
    let mut rng = rand::thread_rng();
    let len = rng.gen_range(1..=max_len);
    (0..len)
        .map(|_| {
            if rng.gen_bool(0.3) {
                *SPICY.choose(&mut rng).unwrap_or(&'`')
            } else {
                char::from(rng.sample(Alphanumeric))
            }
        })
        .collect()
}

fn edge_case_strings() -> Vec<String> {
    vec![
        String::new(),                       // Empty
        " ".to_string(),                     // Single space
        "\0".to_string(),                    // Null byte
        "a\0b".to_string(),                  // Embedded null
        "`".to_string(),                     // Lone backtick
        "``".to_string(),                    // Escaped backtick
        "x` ; DROP TABLE users; --".to_string(),
        "'OR 1=1--".to_string(),             // SQL injection
        "🚀".repeat(64),                     // Multi-byte at the limit
        "a".repeat(65),                      // One over the limit
        "a".repeat(100_000),                 // Very long
    ]
}

/// Reverse of `quote_identifier`.
fn unquote(quoted: &str) -> String {
    assert!(quoted.starts_with('`') && quoted.ends_with('`'));
    quoted[1..quoted.len() - 1].replace("``", "`")
}

#[test]
fn test_quote_round_trip_random_names() {
    for _ in 0..500 {
        let name = random_hostile_name(64);
        let quoted = quote::quote_identifier(&name).unwrap();
        assert_eq!(unquote(&quoted), name, "round trip failed for {:?}", name);

        // The body never contains a lone backtick
        let body = &quoted[1..quoted.len() - 1];
        assert_eq!(body.matches('`').count() % 2, 0);
    }
}

#[test]
fn test_edge_case_names_never_panic() {
    for name in edge_case_strings() {
        match quote::quote_identifier(&name) {
            Ok(quoted) => assert_eq!(unquote(&quoted), name),
            Err(e) => assert!(matches!(e, DbError::Validation { .. }), "{:?}", e),
        }
    }
}

#[test]
fn test_builders_reject_invalid_names_before_anything_else() {
    let columns = vec![ColumnSpec::new("id", "INT").primary_key()];
    for name in ["", "\0", "a\0b"] {
        assert!(matches!(
            ddl::create_table("shop", name, &columns),
            Err(DbError::Validation { .. })
        ));
        assert!(matches!(
            ddl::drop_table(name, "users"),
            Err(DbError::Validation { .. })
        ));
        assert!(matches!(
            ddl::create_database(name, None, None),
            Err(DbError::Validation { .. })
        ));
    }
}

#[test]
fn test_random_table_names_produce_single_statement() {
    for _ in 0..200 {
        let db = random_string(12);
        let table = random_hostile_name(32);
        let columns = vec![
            ColumnSpec::new("id", "INT").primary_key().auto_increment(),
            ColumnSpec::new(random_hostile_name(16), "VARCHAR(20)").with_default("x'y"),
        ];
        // Column name collisions are possible but unlikely; skip them
        if columns[1].name.eq_ignore_ascii_case("id") {
            continue;
        }
        let sql = ddl::create_table(&db, &table, &columns).unwrap();
        assert!(sql.starts_with("CREATE TABLE "));
        assert_eq!(sql.matches("PRIMARY KEY").count(), 1);
        assert!(sql.contains(&quote::quote_identifier(&table).unwrap()));
    }
}

#[test]
fn test_foreign_key_with_hostile_reference() {
    let name = random_hostile_name(20);
    let spec = ConstraintSpec::foreign_key(
        format!("fk_{}", random_string(6)),
        vec!["user_id".to_string()],
        name.clone(),
        vec!["id".to_string()],
    )
    .with_on_delete(ForeignKeyAction::Cascade);

    let sql = ddl::add_constraint("shop", "orders", &spec).unwrap();
    assert!(sql.contains(&quote::quote_identifier(&name).unwrap()));
    assert!(sql.ends_with("ON DELETE CASCADE"));
}

#[test]
fn test_random_account_names_are_quoted_literals() {
    for _ in 0..200 {
        let user = random_hostile_name(32);
        let grantee = quote::format_grantee(&user, "%").unwrap();
        assert!(grantee.starts_with('\''));
        assert!(grantee.ends_with("@'%'"));
        let sql = privilege::drop_user(&user, "%").unwrap();
        assert!(sql.contains(&grantee));
    }
}
