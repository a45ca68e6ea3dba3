//! User and privilege data models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Host wildcard used when the caller does not name one.
pub const DEFAULT_USER_HOST: &str = "%";

fn default_host() -> String {
    DEFAULT_USER_HOST.to_string()
}

fn default_scope() -> String {
    "*".to_string()
}

/// An account row from `mysql.user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDescriptor {
    pub user: String,
    pub host: String,
}

impl UserDescriptor {
    pub fn new(user: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            host: host.into(),
        }
    }
}

/// Input for CREATE USER.
#[derive(Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub user: String,
    #[serde(default = "default_host")]
    pub host: String,
    /// Contains sensitive data - never log
    #[serde(skip_serializing)]
    pub password: String,
}

impl CreateUserRequest {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            host: default_host(),
            password: password.into(),
        }
    }

    /// Set the host pattern.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }
}

impl std::fmt::Debug for CreateUserRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateUserRequest")
            .field("user", &self.user)
            .field("host", &self.host)
            .field("password", &"****")
            .finish()
    }
}

/// Input for GRANT and REVOKE.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrantRequest {
    pub user: String,
    #[serde(default = "default_host")]
    pub host: String,
    /// e.g. `["SELECT", "INSERT"]` or `["ALL PRIVILEGES"]`
    pub privileges: Vec<String>,
    /// `*` for every database
    #[serde(default = "default_scope")]
    pub db_name: String,
    /// `*` for every table
    #[serde(default = "default_scope")]
    pub table_name: String,
}

impl GrantRequest {
    /// Grant on `*.*` from any host.
    pub fn new(user: impl Into<String>, privileges: Vec<String>) -> Self {
        Self {
            user: user.into(),
            host: default_host(),
            privileges,
            db_name: default_scope(),
            table_name: default_scope(),
        }
    }

    /// Set the host pattern.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Limit the scope to one database.
    pub fn on_database(mut self, db_name: impl Into<String>) -> Self {
        self.db_name = db_name.into();
        self
    }

    /// Limit the scope to one table.
    pub fn on_table(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }
}

/// One `SHOW GRANTS` line broken into its parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantEntry {
    pub privileges: Vec<String>,
    /// Unquoted database, or `*`
    pub database: String,
    /// Unquoted table, or `*`
    pub table: String,
    /// Grantee as printed by the server, e.g. `'app'@'%'`
    pub grantee: String,
    pub with_grant_option: bool,
}

/// Raw grant line with its parsed form, if the line could be parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantLine {
    pub raw: String,
    pub parsed: Option<GrantEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantsResult {
    pub user: String,
    pub host: String,
    pub grants: Vec<GrantLine>,
}

impl GrantsResult {
    /// True if any parsed grant includes `privilege` (or ALL) on the given scope.
    pub fn has_privilege(&self, privilege: &str, database: &str, table: &str) -> bool {
        let wanted = privilege.to_uppercase();
        self.grants.iter().filter_map(|g| g.parsed.as_ref()).any(|entry| {
            let scope_matches = (entry.database == "*" || entry.database == database)
                && (entry.table == "*" || entry.table == table);
            scope_matches
                && entry
                    .privileges
                    .iter()
                    .any(|p| p == &wanted || p == "ALL PRIVILEGES" || p == "ALL")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_grant_request_defaults() {
        let req: GrantRequest = serde_json::from_value(json!({
            "user": "app",
            "privileges": ["SELECT"]
        }))
        .unwrap();
        assert_eq!(req.host, "%");
        assert_eq!(req.db_name, "*");
        assert_eq!(req.table_name, "*");
    }

    #[test]
    fn test_create_user_debug_masks_password() {
        let req = CreateUserRequest::new("app", "hunter2");
        let debug = format!("{:?}", req);
        assert!(!debug.contains("hunter2"));
        assert_eq!(req.host, DEFAULT_USER_HOST);
    }

    #[test]
    fn test_has_privilege_respects_scope() {
        let result = GrantsResult {
            user: "app".to_string(),
            host: "%".to_string(),
            grants: vec![GrantLine {
                raw: "GRANT SELECT, INSERT ON `shop`.* TO `app`@`%`".to_string(),
                parsed: Some(GrantEntry {
                    privileges: vec!["SELECT".to_string(), "INSERT".to_string()],
                    database: "shop".to_string(),
                    table: "*".to_string(),
                    grantee: "`app`@`%`".to_string(),
                    with_grant_option: false,
                }),
            }],
        };
        assert!(result.has_privilege("select", "shop", "users"));
        assert!(!result.has_privilege("SELECT", "other", "users"));
        assert!(!result.has_privilege("DELETE", "shop", "users"));
    }
}
