//! Dump request and result models.

use crate::error::{DbError, DbResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Input for the external dump utility.
#[derive(Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DumpRequest {
    pub database: String,
    /// Dump only this table when set
    #[serde(default)]
    pub table: Option<String>,
    pub username: String,
    /// Passed to the child through `MYSQL_PWD`, never argv
    #[serde(skip_serializing)]
    pub password: String,
    /// Existing directory that receives `<database>_<table|dump>.sql`
    pub output_path: PathBuf,
}

impl DumpRequest {
    pub fn new(
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            database: database.into(),
            table: None,
            username: username.into(),
            password: password.into(),
            output_path: output_path.into(),
        }
    }

    /// Restrict the dump to one table.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// File the dump is written to: always a direct child of `output_path`.
    pub fn target_file(&self) -> DbResult<PathBuf> {
        let suffix = self.table.as_deref().unwrap_or("dump");
        let file_name = format!("{}_{}.sql", self.database, suffix);

        let mut components = Path::new(&file_name).components();
        let single_file = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(name)), None) if name == file_name.as_str()
        );
        let target = self.output_path.join(&file_name);
        if !single_file || target.parent() != Some(self.output_path.as_path()) {
            return Err(DbError::validation(format!(
                "Dump file name {:?} would leave the output directory",
                file_name
            )));
        }
        Ok(target)
    }
}

impl std::fmt::Debug for DumpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DumpRequest")
            .field("database", &self.database)
            .field("table", &self.table)
            .field("username", &self.username)
            .field("password", &"****")
            .field("output_path", &self.output_path)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DumpResult {
    pub file_path: PathBuf,
    pub database: String,
    pub table: Option<String>,
    /// `CURRENT_USER()` of the pool connection that authorized the dump
    pub requested_by: String,
    pub bytes_written: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_file_for_database() {
        let req = DumpRequest::new("shop", "root", "pw", "/tmp/out");
        assert_eq!(
            req.target_file().unwrap(),
            PathBuf::from("/tmp/out/shop_dump.sql")
        );
    }

    #[test]
    fn test_target_file_for_table() {
        let req = DumpRequest::new("shop", "root", "pw", "/tmp/out").with_table("users");
        assert_eq!(
            req.target_file().unwrap(),
            PathBuf::from("/tmp/out/shop_users.sql")
        );
    }

    #[test]
    fn test_target_file_stays_in_output_directory() {
        let absolute = DumpRequest::new("/etc/cron.d/x", "root", "pw", "/tmp/out");
        assert!(matches!(
            absolute.target_file(),
            Err(DbError::Validation { .. })
        ));

        let upward = DumpRequest::new("shop", "root", "pw", "/tmp/out").with_table("../../x");
        assert!(upward.target_file().is_err());

        let nested = DumpRequest::new("a/b", "root", "pw", "/tmp/out");
        assert!(nested.target_file().is_err());

        let dots = DumpRequest::new("shop..v2", "root", "pw", "/tmp/out");
        assert_eq!(
            dots.target_file().unwrap(),
            PathBuf::from("/tmp/out/shop..v2_dump.sql")
        );
    }

    #[test]
    fn test_debug_masks_password() {
        let req = DumpRequest::new("shop", "root", "s3cret", "/tmp");
        assert!(!format!("{:?}", req).contains("s3cret"));
    }
}
