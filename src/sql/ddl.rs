//! DDL statement builders.
//!
//! Pure functions: each validates its input and returns exactly one
//! statement. Nothing here touches the server.

use super::quote::{
    format_default_literal, qualify, quote_identifier, quote_identifier_list,
    validate_charset_name, validate_check_expression, validate_sql_type,
};
use crate::error::{DbError, DbResult};
use crate::models::{ColumnSpec, ConstraintSpec, ConstraintType};
use std::collections::HashSet;

pub fn create_database(
    name: &str,
    charset: Option<&str>,
    collation: Option<&str>,
) -> DbResult<String> {
    let mut sql = format!("CREATE DATABASE {}", quote_identifier(name)?);
    if let Some(charset) = charset {
        validate_charset_name(charset)?;
        sql.push_str(&format!(" CHARACTER SET {}", charset));
    }
    if let Some(collation) = collation {
        validate_charset_name(collation)?;
        sql.push_str(&format!(" COLLATE {}", collation));
    }
    Ok(sql)
}

pub fn drop_database(name: &str) -> DbResult<String> {
    Ok(format!("DROP DATABASE {}", quote_identifier(name)?))
}

/// Column definition without any PRIMARY KEY clause:
/// `` `name` TYPE [NOT NULL] [UNIQUE] [AUTO_INCREMENT] [DEFAULT lit] [CHECK (expr)] ``
pub fn column_definition(column: &ColumnSpec) -> DbResult<String> {
    if column.name.trim().is_empty() {
        return Err(DbError::validation("Column name is required"));
    }
    validate_sql_type(&column.column_type).map_err(|e| match e {
        DbError::Validation { message } => {
            DbError::validation(format!("Column '{}': {}", column.name, message))
        }
        other => other,
    })?;

    let mut def = format!(
        "{} {}",
        quote_identifier(&column.name)?,
        column.column_type.trim()
    );
    if column.not_null {
        def.push_str(" NOT NULL");
    }
    if column.unique {
        def.push_str(" UNIQUE");
    }
    if column.auto_increment {
        def.push_str(" AUTO_INCREMENT");
    }
    if let Some(default) = &column.default {
        def.push_str(" DEFAULT ");
        def.push_str(&format_default_literal(default, &column.column_type)?);
    }
    if let Some(check) = &column.check {
        validate_check_expression(check)?;
        def.push_str(&format!(" CHECK ({})", check.trim()));
    }
    Ok(def)
}

fn ensure_unique_names<'a>(names: impl IntoIterator<Item = &'a str>, what: &str) -> DbResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        // Column names are case-insensitive in MySQL
        if !seen.insert(name.to_lowercase()) {
            return Err(DbError::validation(format!(
                "Duplicate {} name: {}",
                what, name
            )));
        }
    }
    Ok(())
}

/// CREATE TABLE with a single trailing `PRIMARY KEY (...)` over every
/// column flagged `primary_key`.
pub fn create_table(database: &str, table: &str, columns: &[ColumnSpec]) -> DbResult<String> {
    if columns.is_empty() {
        return Err(DbError::validation(
            "A table needs at least one column",
        ));
    }
    ensure_unique_names(columns.iter().map(|c| c.name.as_str()), "column")?;

    let mut parts = columns
        .iter()
        .map(column_definition)
        .collect::<DbResult<Vec<_>>>()?;

    let primary_key: Vec<String> = columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| c.name.clone())
        .collect();
    if !primary_key.is_empty() {
        parts.push(format!("PRIMARY KEY ({})", quote_identifier_list(&primary_key)?));
    }

    Ok(format!(
        "CREATE TABLE {} ({})",
        qualify(database, table)?,
        parts.join(", ")
    ))
}

/// One ALTER TABLE adding every column. Columns flagged `primary_key`
/// share a single trailing `ADD PRIMARY KEY (...)` clause.
pub fn add_columns(database: &str, table: &str, columns: &[ColumnSpec]) -> DbResult<String> {
    if columns.is_empty() {
        return Err(DbError::validation("No columns to add"));
    }
    ensure_unique_names(columns.iter().map(|c| c.name.as_str()), "column")?;

    let mut clauses = columns
        .iter()
        .map(|c| Ok(format!("ADD COLUMN {}", column_definition(c)?)))
        .collect::<DbResult<Vec<_>>>()?;

    let primary_key: Vec<String> = columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| c.name.clone())
        .collect();
    if !primary_key.is_empty() {
        clauses.push(format!(
            "ADD PRIMARY KEY ({})",
            quote_identifier_list(&primary_key)?
        ));
    }

    Ok(format!(
        "ALTER TABLE {} {}",
        qualify(database, table)?,
        clauses.join(", ")
    ))
}

/// One ALTER TABLE dropping every named column.
///
/// `primary_key` lists the table's current primary key columns. Dropping
/// some but not all of them is rejected; dropping all of them is allowed.
pub fn drop_columns(
    database: &str,
    table: &str,
    columns: &[String],
    primary_key: &[String],
) -> DbResult<String> {
    if columns.is_empty() {
        return Err(DbError::validation("No columns to drop"));
    }
    ensure_unique_names(columns.iter().map(String::as_str), "column")?;

    let dropping: HashSet<String> = columns.iter().map(|c| c.to_lowercase()).collect();
    let pk_dropped = primary_key
        .iter()
        .filter(|c| dropping.contains(&c.to_lowercase()))
        .count();
    if pk_dropped > 0 && pk_dropped < primary_key.len() {
        return Err(DbError::validation(format!(
            "Cannot drop part of the composite primary key ({}); drop all of its columns or the key first",
            primary_key.join(", ")
        )));
    }

    let clauses = columns
        .iter()
        .map(|c| Ok(format!("DROP COLUMN {}", quote_identifier(c)?)))
        .collect::<DbResult<Vec<_>>>()?;

    Ok(format!(
        "ALTER TABLE {} {}",
        qualify(database, table)?,
        clauses.join(", ")
    ))
}

/// MODIFY COLUMN with the full column definition. The primary key is left
/// untouched; use [`add_constraint`] to change it.
pub fn modify_column(database: &str, table: &str, column: &ColumnSpec) -> DbResult<String> {
    Ok(format!(
        "ALTER TABLE {} MODIFY COLUMN {}",
        qualify(database, table)?,
        column_definition(column)?
    ))
}

pub fn rename_column(database: &str, table: &str, from: &str, to: &str) -> DbResult<String> {
    if from == to {
        return Err(DbError::validation(format!(
            "Column is already named {}",
            from
        )));
    }
    Ok(format!(
        "ALTER TABLE {} RENAME COLUMN {} TO {}",
        qualify(database, table)?,
        quote_identifier(from)?,
        quote_identifier(to)?
    ))
}

fn required_name(spec: &ConstraintSpec) -> DbResult<String> {
    match spec.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => quote_identifier(name),
        _ => Err(DbError::validation(format!(
            "{} constraint requires a name",
            spec.constraint_type
        ))),
    }
}

fn required_columns(spec: &ConstraintSpec) -> DbResult<String> {
    if spec.columns.is_empty() {
        return Err(DbError::validation(format!(
            "{} constraint requires at least one column",
            spec.constraint_type
        )));
    }
    ensure_unique_names(spec.columns.iter().map(String::as_str), "column")?;
    quote_identifier_list(&spec.columns)
}

/// ALTER TABLE ... ADD for one constraint.
pub fn add_constraint(database: &str, table: &str, spec: &ConstraintSpec) -> DbResult<String> {
    let clause = match spec.constraint_type {
        ConstraintType::PrimaryKey => {
            format!("ADD PRIMARY KEY ({})", required_columns(spec)?)
        }
        ConstraintType::Unique => format!(
            "ADD CONSTRAINT {} UNIQUE ({})",
            required_name(spec)?,
            required_columns(spec)?
        ),
        ConstraintType::ForeignKey => {
            let name = required_name(spec)?;
            let columns = required_columns(spec)?;
            let referenced_table = match spec.referenced_table.as_deref().map(str::trim) {
                Some(t) if !t.is_empty() => t,
                _ => {
                    return Err(DbError::validation(
                        "FOREIGN KEY constraint requires a referenced table",
                    ));
                }
            };
            if spec.referenced_columns.len() != spec.columns.len() {
                return Err(DbError::validation(format!(
                    "FOREIGN KEY has {} column(s) but {} referenced column(s)",
                    spec.columns.len(),
                    spec.referenced_columns.len()
                )));
            }
            let mut clause = format!(
                "ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
                name,
                columns,
                qualify(database, referenced_table)?,
                quote_identifier_list(&spec.referenced_columns)?
            );
            if let Some(action) = spec.on_delete {
                clause.push_str(&format!(" ON DELETE {}", action));
            }
            if let Some(action) = spec.on_update {
                clause.push_str(&format!(" ON UPDATE {}", action));
            }
            clause
        }
        ConstraintType::Check => {
            let name = required_name(spec)?;
            let expression = spec.check_expression.as_deref().unwrap_or_default();
            validate_check_expression(expression)?;
            format!("ADD CONSTRAINT {} CHECK ({})", name, expression.trim())
        }
    };

    Ok(format!("ALTER TABLE {} {}", qualify(database, table)?, clause))
}

/// ALTER TABLE ... DROP for one constraint.
///
/// Without a type this emits the generic `DROP CONSTRAINT` (MySQL 8.0.19+).
/// With a type it emits the form every supported server understands.
pub fn drop_constraint(
    database: &str,
    table: &str,
    name: &str,
    constraint_type: Option<ConstraintType>,
) -> DbResult<String> {
    let clause = match constraint_type {
        Some(ConstraintType::PrimaryKey) => "DROP PRIMARY KEY".to_string(),
        Some(ConstraintType::Unique) => format!("DROP INDEX {}", quote_identifier(name)?),
        Some(ConstraintType::ForeignKey) => {
            format!("DROP FOREIGN KEY {}", quote_identifier(name)?)
        }
        Some(ConstraintType::Check) => format!("DROP CHECK {}", quote_identifier(name)?),
        None => format!("DROP CONSTRAINT {}", quote_identifier(name)?),
    };
    Ok(format!("ALTER TABLE {} {}", qualify(database, table)?, clause))
}

pub fn rename_table(database: &str, from: &str, to: &str) -> DbResult<String> {
    if from == to {
        return Err(DbError::validation(format!(
            "Table is already named {}",
            from
        )));
    }
    Ok(format!(
        "RENAME TABLE {} TO {}",
        qualify(database, from)?,
        qualify(database, to)?
    ))
}

pub fn truncate_table(database: &str, table: &str) -> DbResult<String> {
    Ok(format!("TRUNCATE TABLE {}", qualify(database, table)?))
}

pub fn drop_table(database: &str, table: &str) -> DbResult<String> {
    Ok(format!("DROP TABLE {}", qualify(database, table)?))
}

pub fn show_create_table(database: &str, table: &str) -> DbResult<String> {
    Ok(format!("SHOW CREATE TABLE {}", qualify(database, table)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ForeignKeyAction;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_create_database() {
        assert_eq!(create_database("shop", None, None).unwrap(), "CREATE DATABASE `shop`");
        assert_eq!(
            create_database("shop", Some("utf8mb4"), Some("utf8mb4_unicode_ci")).unwrap(),
            "CREATE DATABASE `shop` CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci"
        );
        assert!(create_database("shop", Some("utf8; DROP"), None).is_err());
    }

    #[test]
    fn test_drop_database_quotes_name() {
        assert_eq!(drop_database("we`ird").unwrap(), "DROP DATABASE `we``ird`");
    }

    #[test]
    fn test_create_table_single_primary_key() {
        let columns = vec![
            ColumnSpec::new("id", "INT").primary_key().auto_increment(),
            ColumnSpec::new("email", "VARCHAR(255)").not_null().unique(),
        ];
        assert_eq!(
            create_table("shop", "users", &columns).unwrap(),
            "CREATE TABLE `shop`.`users` (`id` INT AUTO_INCREMENT, \
             `email` VARCHAR(255) NOT NULL UNIQUE, PRIMARY KEY (`id`))"
        );
    }

    #[test]
    fn test_create_table_composite_primary_key_emitted_once() {
        let columns = vec![
            ColumnSpec::new("colA", "INT").primary_key(),
            ColumnSpec::new("colB", "INT").primary_key(),
            ColumnSpec::new("qty", "INT").with_default(0),
        ];
        let sql = create_table("shop", "pairs", &columns).unwrap();
        assert_eq!(sql.matches("PRIMARY KEY").count(), 1);
        assert!(sql.ends_with("PRIMARY KEY (`colA`, `colB`))"));
        assert!(sql.contains("`qty` INT DEFAULT 0"));
    }

    #[test]
    fn test_create_table_string_default_and_check() {
        let columns = vec![
            ColumnSpec::new("status", "varchar(10)").with_default("new"),
            ColumnSpec::new("price", "DECIMAL(10,2)").with_check("price >= 0"),
        ];
        let sql = create_table("shop", "orders", &columns).unwrap();
        assert!(sql.contains("`status` varchar(10) DEFAULT 'new'"));
        assert!(sql.contains("`price` DECIMAL(10,2) CHECK (price >= 0)"));
        assert!(!sql.contains("PRIMARY KEY"));
    }

    #[test]
    fn test_create_table_validation() {
        assert!(matches!(
            create_table("shop", "t", &[]),
            Err(DbError::Validation { .. })
        ));
        assert!(create_table("shop", "t", &[ColumnSpec::new("", "INT")]).is_err());
        assert!(create_table("shop", "t", &[ColumnSpec::new("a", "")]).is_err());
        assert!(
            create_table(
                "shop",
                "t",
                &[ColumnSpec::new("a", "INT"), ColumnSpec::new("A", "INT")]
            )
            .is_err()
        );
        assert!(
            create_table(
                "shop",
                "t",
                &[ColumnSpec::new("a", "INT").with_check("1=1; DROP TABLE x")]
            )
            .is_err()
        );
    }

    #[test]
    fn test_add_columns_single_statement() {
        let columns = vec![
            ColumnSpec::new("a", "INT"),
            ColumnSpec::new("b", "TEXT").not_null(),
        ];
        assert_eq!(
            add_columns("shop", "t", &columns).unwrap(),
            "ALTER TABLE `shop`.`t` ADD COLUMN `a` INT, ADD COLUMN `b` TEXT NOT NULL"
        );
        assert!(add_columns("shop", "t", &[]).is_err());
    }

    #[test]
    fn test_add_columns_primary_key_emitted_once() {
        let columns = vec![
            ColumnSpec::new("a", "INT").primary_key(),
            ColumnSpec::new("b", "INT").primary_key(),
            ColumnSpec::new("c", "TEXT"),
        ];
        let sql = add_columns("shop", "t", &columns).unwrap();
        assert_eq!(
            sql,
            "ALTER TABLE `shop`.`t` ADD COLUMN `a` INT, ADD COLUMN `b` INT, \
             ADD COLUMN `c` TEXT, ADD PRIMARY KEY (`a`, `b`)"
        );
        assert_eq!(sql.matches("PRIMARY KEY").count(), 1);
    }

    #[test]
    fn test_check_expression_cannot_close_clause_early() {
        let spec = ConstraintSpec::check("c", "1=1), DROP COLUMN `id`, ADD CHECK (1=1");
        assert!(matches!(
            add_constraint("shop", "t", &spec),
            Err(DbError::Validation { .. })
        ));

        let columns = vec![
            ColumnSpec::new("price", "INT").with_check("price > 0), `evil` INT, CHECK (1"),
        ];
        assert!(matches!(
            create_table("shop", "t", &columns),
            Err(DbError::Validation { .. })
        ));
    }

    #[test]
    fn test_column_type_cannot_add_columns() {
        let columns = vec![ColumnSpec::new("a", "INT, `evil` INT")];
        assert!(matches!(
            create_table("shop", "t", &columns),
            Err(DbError::Validation { .. })
        ));
        assert!(matches!(
            add_columns("shop", "t", &columns),
            Err(DbError::Validation { .. })
        ));
        let ok = vec![ColumnSpec::new("a", "DECIMAL(10,2)")];
        assert!(create_table("shop", "t", &ok).is_ok());
    }

    #[test]
    fn test_drop_columns() {
        assert_eq!(
            drop_columns("shop", "t", &names(&["a", "b"]), &[]).unwrap(),
            "ALTER TABLE `shop`.`t` DROP COLUMN `a`, DROP COLUMN `b`"
        );
        assert!(drop_columns("shop", "t", &[], &[]).is_err());
    }

    #[test]
    fn test_drop_columns_rejects_partial_composite_key() {
        let pk = names(&["colA", "colB"]);
        let result = drop_columns("shop", "t", &names(&["colA"]), &pk);
        assert!(matches!(result, Err(DbError::Validation { .. })));

        assert!(drop_columns("shop", "t", &names(&["colA", "colB"]), &pk).is_ok());
        assert!(drop_columns("shop", "t", &names(&["other"]), &pk).is_ok());
    }

    #[test]
    fn test_modify_and_rename_column() {
        let spec = ColumnSpec::new("name", "VARCHAR(100)").not_null();
        assert_eq!(
            modify_column("shop", "t", &spec).unwrap(),
            "ALTER TABLE `shop`.`t` MODIFY COLUMN `name` VARCHAR(100) NOT NULL"
        );
        assert_eq!(
            rename_column("shop", "t", "name", "full_name").unwrap(),
            "ALTER TABLE `shop`.`t` RENAME COLUMN `name` TO `full_name`"
        );
        assert!(rename_column("shop", "t", "a", "a").is_err());
    }

    #[test]
    fn test_add_foreign_key_with_actions() {
        let spec = ConstraintSpec::foreign_key(
            "fk_orders_user",
            names(&["user_id"]),
            "users",
            names(&["id"]),
        )
        .with_on_delete(ForeignKeyAction::Cascade);
        assert_eq!(
            add_constraint("shop", "orders", &spec).unwrap(),
            "ALTER TABLE `shop`.`orders` ADD CONSTRAINT `fk_orders_user` FOREIGN KEY (`user_id`) \
             REFERENCES `shop`.`users` (`id`) ON DELETE CASCADE"
        );
    }

    #[test]
    fn test_add_foreign_key_validation() {
        let mismatched =
            ConstraintSpec::foreign_key("fk", names(&["a", "b"]), "users", names(&["id"]));
        assert!(add_constraint("shop", "t", &mismatched).is_err());

        let no_table = ConstraintSpec::foreign_key("fk", names(&["a"]), "", names(&["id"]));
        assert!(add_constraint("shop", "t", &no_table).is_err());
    }

    #[test]
    fn test_add_primary_unique_and_check() {
        assert_eq!(
            add_constraint("shop", "t", &ConstraintSpec::primary_key(names(&["a", "b"]))).unwrap(),
            "ALTER TABLE `shop`.`t` ADD PRIMARY KEY (`a`, `b`)"
        );
        assert_eq!(
            add_constraint("shop", "t", &ConstraintSpec::unique("uq_email", names(&["email"])))
                .unwrap(),
            "ALTER TABLE `shop`.`t` ADD CONSTRAINT `uq_email` UNIQUE (`email`)"
        );
        assert_eq!(
            add_constraint("shop", "t", &ConstraintSpec::check("t_chk_1", "qty > 0")).unwrap(),
            "ALTER TABLE `shop`.`t` ADD CONSTRAINT `t_chk_1` CHECK (qty > 0)"
        );
    }

    #[test]
    fn test_add_constraint_requires_name_except_primary_key() {
        let mut spec = ConstraintSpec::unique("x", names(&["a"]));
        spec.name = None;
        assert!(add_constraint("shop", "t", &spec).is_err());

        let empty_check = ConstraintSpec::check("c", "  ");
        assert!(add_constraint("shop", "t", &empty_check).is_err());
    }

    #[test]
    fn test_drop_constraint_forms() {
        assert_eq!(
            drop_constraint("shop", "t", "c1", None).unwrap(),
            "ALTER TABLE `shop`.`t` DROP CONSTRAINT `c1`"
        );
        assert_eq!(
            drop_constraint("shop", "t", "PRIMARY", Some(ConstraintType::PrimaryKey)).unwrap(),
            "ALTER TABLE `shop`.`t` DROP PRIMARY KEY"
        );
        assert_eq!(
            drop_constraint("shop", "t", "fk", Some(ConstraintType::ForeignKey)).unwrap(),
            "ALTER TABLE `shop`.`t` DROP FOREIGN KEY `fk`"
        );
        assert_eq!(
            drop_constraint("shop", "t", "uq", Some(ConstraintType::Unique)).unwrap(),
            "ALTER TABLE `shop`.`t` DROP INDEX `uq`"
        );
    }

    #[test]
    fn test_rename_truncate_drop_table() {
        assert_eq!(
            rename_table("shop", "a", "b").unwrap(),
            "RENAME TABLE `shop`.`a` TO `shop`.`b`"
        );
        assert!(matches!(
            rename_table("shop", "a", "a"),
            Err(DbError::Validation { .. })
        ));
        assert_eq!(truncate_table("shop", "a").unwrap(), "TRUNCATE TABLE `shop`.`a`");
        assert_eq!(drop_table("shop", "a").unwrap(), "DROP TABLE `shop`.`a`");
    }
}
