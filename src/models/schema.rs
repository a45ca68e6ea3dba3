//! Schema-related data models.
//!
//! Descriptors are read models rebuilt from `information_schema` on every
//! request. Specs are caller-supplied intent for DDL.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One database in the server overview.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSummary {
    pub name: String,
    #[serde(rename = "sizeInMB")]
    pub size_mb: f64,
    pub size_formatted: String,
}

/// Aggregate statistics across every user database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerTotals {
    pub tables: u64,
    pub rows: u64,
    #[serde(rename = "sizeInMB")]
    pub size_mb: f64,
}

/// Server-wide overview returned right after connecting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerOverview {
    pub version: String,
    pub uptime_seconds: u64,
    pub charset: Option<String>,
    pub collation: Option<String>,
    pub databases: Vec<DatabaseSummary>,
    pub totals: ServerTotals,
    pub variables: BTreeMap<String, String>,
    pub status: BTreeMap<String, String>,
    pub current_user: String,
    pub current_host: String,
    pub current_database: Option<String>,
}

/// One of the biggest tables in a database.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LargestTable {
    pub name: String,
    #[serde(rename = "sizeInMB")]
    pub size_mb: f64,
    pub rows: u64,
}

/// Replication role reported by `SHOW REPLICA STATUS` / `SHOW MASTER STATUS`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationInfo {
    /// "replica" or "source"
    pub role: String,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseDescriptor {
    pub name: String,
    #[serde(rename = "sizeInMB")]
    pub size_mb: f64,
    pub size_formatted: String,
    pub charset: Option<String>,
    pub collation: Option<String>,
    pub table_count: u64,
    pub total_rows: u64,
    pub total_indexes: u64,
    /// Earliest table CREATE_TIME; MySQL keeps no database creation date
    pub creation_date: Option<DateTime<Utc>>,
    /// Best effort; `None` when the status statements are unavailable
    pub replication: Option<ReplicationInfo>,
    pub largest_tables: Vec<LargestTable>,
}

/// A table row from `information_schema.TABLES`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSummary {
    pub name: String,
    /// "BASE TABLE" or "VIEW"
    pub table_type: String,
    pub engine: Option<String>,
    pub row_count: u64,
    #[serde(rename = "sizeKB")]
    pub size_kb: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDescriptor {
    pub name: String,
    pub engine: Option<String>,
    pub collation: Option<String>,
    pub row_count: u64,
    #[serde(rename = "sizeKB")]
    pub size_kb: f64,
    pub columns: Vec<ColumnDescriptor>,
}

/// Value of `COLUMN_KEY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColumnKey {
    #[serde(rename = "PRI")]
    Primary,
    #[serde(rename = "UNI")]
    Unique,
    #[serde(rename = "MUL")]
    Multiple,
    #[default]
    #[serde(rename = "")]
    None,
}

impl ColumnKey {
    /// Parse from the catalog string.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "PRI" => Self::Primary,
            "UNI" => Self::Unique,
            "MUL" => Self::Multiple,
            _ => Self::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "PRI",
            Self::Unique => "UNI",
            Self::Multiple => "MUL",
            Self::None => "",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub name: String,
    /// Full type (e.g., `varchar(255)`, `int unsigned`)
    #[serde(rename = "type")]
    pub column_type: String,
    pub nullable: bool,
    pub key: ColumnKey,
    pub default: Option<String>,
    /// e.g. `auto_increment`
    pub extra: String,
}

impl ColumnDescriptor {
    /// Create a new column descriptor.
    pub fn new(name: impl Into<String>, column_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            nullable,
            key: ColumnKey::None,
            default: None,
            extra: String::new(),
        }
    }

    /// Set the key flag.
    pub fn with_key(mut self, key: ColumnKey) -> Self {
        self.key = key;
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Set the extra attributes.
    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = extra.into();
        self
    }

    pub fn is_primary_key(&self) -> bool {
        self.key == ColumnKey::Primary
    }
}

/// Column definition used by CREATE TABLE, ADD COLUMN and MODIFY COLUMN.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    pub name: String,
    /// SQL type, e.g. `INT` or `VARCHAR(255)`
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub auto_increment: bool,
    /// Formatted according to the column type (quoted for string-like types)
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    /// CHECK expression without the surrounding parentheses
    #[serde(default)]
    pub check: Option<String>,
}

impl ColumnSpec {
    /// Create a new column spec.
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            ..Self::default()
        }
    }

    /// Mark the column as part of the primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark the column NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Mark the column UNIQUE.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Mark the column AUTO_INCREMENT.
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Set the CHECK expression.
    pub fn with_check(mut self, expression: impl Into<String>) -> Self {
        self.check = Some(expression.into());
        self
    }
}

/// Kind of table constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ConstraintType {
    #[serde(rename = "PRIMARY KEY")]
    PrimaryKey,
    #[serde(rename = "UNIQUE")]
    Unique,
    #[serde(rename = "FOREIGN KEY")]
    ForeignKey,
    #[serde(rename = "CHECK")]
    Check,
}

impl ConstraintType {
    /// Parse from `TABLE_CONSTRAINTS.CONSTRAINT_TYPE`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PRIMARY KEY" | "PRIMARY" => Some(Self::PrimaryKey),
            "UNIQUE" | "UNIQUE KEY" => Some(Self::Unique),
            "FOREIGN KEY" => Some(Self::ForeignKey),
            "CHECK" => Some(Self::Check),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PrimaryKey => write!(f, "PRIMARY KEY"),
            Self::Unique => write!(f, "UNIQUE"),
            Self::ForeignKey => write!(f, "FOREIGN KEY"),
            Self::Check => write!(f, "CHECK"),
        }
    }
}

/// Foreign key referential action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum ForeignKeyAction {
    /// No action (error if referenced)
    #[default]
    #[serde(rename = "NO ACTION")]
    NoAction,
    #[serde(rename = "RESTRICT")]
    Restrict,
    #[serde(rename = "CASCADE")]
    Cascade,
    #[serde(rename = "SET NULL")]
    SetNull,
    #[serde(rename = "SET DEFAULT")]
    SetDefault,
}

impl ForeignKeyAction {
    /// Parse from the catalog's UPDATE_RULE / DELETE_RULE.
    pub fn parse(s: &str) -> Self {
        let upper = s.trim().to_uppercase();
        match upper.as_str() {
            "CASCADE" => Self::Cascade,
            "SET NULL" => Self::SetNull,
            "SET DEFAULT" => Self::SetDefault,
            "RESTRICT" => Self::Restrict,
            _ => Self::NoAction,
        }
    }
}

impl std::fmt::Display for ForeignKeyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoAction => write!(f, "NO ACTION"),
            Self::Restrict => write!(f, "RESTRICT"),
            Self::Cascade => write!(f, "CASCADE"),
            Self::SetNull => write!(f, "SET NULL"),
            Self::SetDefault => write!(f, "SET DEFAULT"),
        }
    }
}

/// Constraint requested by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintSpec {
    /// Required for every type except PRIMARY KEY
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub constraint_type: ConstraintType,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub referenced_table: Option<String>,
    #[serde(default)]
    pub referenced_columns: Vec<String>,
    #[serde(default)]
    pub on_delete: Option<ForeignKeyAction>,
    #[serde(default)]
    pub on_update: Option<ForeignKeyAction>,
    #[serde(default)]
    pub check_expression: Option<String>,
}

impl ConstraintSpec {
    /// PRIMARY KEY over the given columns.
    pub fn primary_key(columns: Vec<String>) -> Self {
        Self::new(None, ConstraintType::PrimaryKey, columns)
    }

    /// Named UNIQUE constraint.
    pub fn unique(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self::new(Some(name.into()), ConstraintType::Unique, columns)
    }

    /// Named FOREIGN KEY constraint.
    pub fn foreign_key(
        name: impl Into<String>,
        columns: Vec<String>,
        referenced_table: impl Into<String>,
        referenced_columns: Vec<String>,
    ) -> Self {
        let mut spec = Self::new(Some(name.into()), ConstraintType::ForeignKey, columns);
        spec.referenced_table = Some(referenced_table.into());
        spec.referenced_columns = referenced_columns;
        spec
    }

    /// Named CHECK constraint.
    pub fn check(name: impl Into<String>, expression: impl Into<String>) -> Self {
        let mut spec = Self::new(Some(name.into()), ConstraintType::Check, Vec::new());
        spec.check_expression = Some(expression.into());
        spec
    }

    /// Set the ON DELETE action.
    pub fn with_on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    /// Set the ON UPDATE action.
    pub fn with_on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = Some(action);
        self
    }

    fn new(name: Option<String>, constraint_type: ConstraintType, columns: Vec<String>) -> Self {
        Self {
            name,
            constraint_type,
            columns,
            referenced_table: None,
            referenced_columns: Vec::new(),
            on_delete: None,
            on_update: None,
            check_expression: None,
        }
    }
}

/// How a CHECK constraint was tied to its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckAssociation {
    /// Joined through `TABLE_CONSTRAINTS`
    Catalog,
    /// Inferred from the `<table>_chk_` name prefix; may miss or misattribute
    NamePrefix,
}

/// Constraint as stored by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub constraint_type: ConstraintType,
    pub columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referenced_table: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub referenced_columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ForeignKeyAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_update: Option<ForeignKeyAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub association: Option<CheckAssociation>,
}

impl ConstraintDescriptor {
    /// Create a new descriptor without references.
    pub fn new(name: impl Into<String>, constraint_type: ConstraintType, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            constraint_type,
            columns,
            referenced_table: None,
            referenced_columns: Vec::new(),
            on_delete: None,
            on_update: None,
            check_expression: None,
            association: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexInfo {
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
    pub is_primary: bool,
    /// BTREE, HASH, FULLTEXT, etc.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_algorithm: Option<String>,
}

impl IndexInfo {
    /// Create a new index info.
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            is_unique: false,
            is_primary: false,
            index_algorithm: None,
        }
    }

    /// Set whether this is a unique index.
    pub fn with_unique(mut self, is_unique: bool) -> Self {
        self.is_unique = is_unique;
        self
    }

    /// Set whether this is the primary key index.
    pub fn with_primary(mut self, is_primary: bool) -> Self {
        self.is_primary = is_primary;
        if is_primary {
            self.is_unique = true;
        }
        self
    }

    /// Set the index algorithm.
    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.index_algorithm = Some(algorithm.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_column_key_parsing() {
        assert_eq!(ColumnKey::parse("PRI"), ColumnKey::Primary);
        assert_eq!(ColumnKey::parse("uni"), ColumnKey::Unique);
        assert_eq!(ColumnKey::parse("MUL"), ColumnKey::Multiple);
        assert_eq!(ColumnKey::parse(""), ColumnKey::None);
    }

    #[test]
    fn test_column_key_serializes_as_catalog_string() {
        let col = ColumnDescriptor::new("id", "int", false).with_key(ColumnKey::Primary);
        let value = serde_json::to_value(&col).unwrap();
        assert_eq!(value["key"], "PRI");
        assert_eq!(value["type"], "int");
    }

    #[test]
    fn test_foreign_key_action_parsing() {
        assert_eq!(ForeignKeyAction::parse("CASCADE"), ForeignKeyAction::Cascade);
        assert_eq!(ForeignKeyAction::parse("set null"), ForeignKeyAction::SetNull);
        assert_eq!(ForeignKeyAction::parse("UNKNOWN"), ForeignKeyAction::NoAction);
    }

    #[test]
    fn test_constraint_spec_deserializes_from_camel_case() {
        let spec: ConstraintSpec = serde_json::from_value(json!({
            "name": "fk_orders_user",
            "type": "FOREIGN KEY",
            "columns": ["user_id"],
            "referencedTable": "users",
            "referencedColumns": ["id"],
            "onDelete": "CASCADE"
        }))
        .unwrap();
        assert_eq!(spec.constraint_type, ConstraintType::ForeignKey);
        assert_eq!(spec.on_delete, Some(ForeignKeyAction::Cascade));
        assert_eq!(spec.on_update, None);
    }

    #[test]
    fn test_column_spec_deserializes_from_camel_case() {
        let spec: ColumnSpec = serde_json::from_value(json!({
            "name": "id",
            "type": "INT",
            "primaryKey": true,
            "autoIncrement": true
        }))
        .unwrap();
        assert!(spec.primary_key);
        assert!(spec.auto_increment);
        assert!(!spec.not_null);
    }

    #[test]
    fn test_index_info_builder() {
        let index = IndexInfo::new("PRIMARY", vec!["id".to_string()])
            .with_primary(true)
            .with_algorithm("BTREE");

        assert!(index.is_primary);
        assert!(index.is_unique);
        assert_eq!(index.index_algorithm, Some("BTREE".to_string()));
    }

    #[test]
    fn test_database_descriptor_uses_contract_field_names() {
        let db = DatabaseDescriptor {
            name: "shop".to_string(),
            size_mb: 1.5,
            size_formatted: "1.5 MB".to_string(),
            charset: Some("utf8mb4".to_string()),
            collation: None,
            table_count: 2,
            total_rows: 10,
            total_indexes: 3,
            creation_date: None,
            replication: None,
            largest_tables: Vec::new(),
        };
        let value = serde_json::to_value(&db).unwrap();
        assert_eq!(value["sizeInMB"], 1.5);
        assert_eq!(value["tableCount"], 2);
        assert!(value["replication"].is_null());
    }
}
