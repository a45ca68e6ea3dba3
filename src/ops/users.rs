//! Account and privilege management.

use crate::db::schema::{get_string, get_string_by_index};
use crate::db::{PoolManager, QueryExecutor};
use crate::error::DbResult;
use crate::models::{
    CreateUserRequest, ExecuteResult, GrantLine, GrantRequest, GrantsResult, UserDescriptor,
};
use crate::sql::privilege;
use std::sync::Arc;
use tracing::{debug, info};

pub struct UserHandler {
    pool_manager: Arc<PoolManager>,
    executor: QueryExecutor,
}

impl UserHandler {
    pub fn new(pool_manager: Arc<PoolManager>, executor: QueryExecutor) -> Self {
        Self {
            pool_manager,
            executor,
        }
    }

    /// Accounts from `mysql.user`.
    pub async fn list_users(&self) -> DbResult<Vec<UserDescriptor>> {
        let pool = self.pool_manager.get_pool().await?;
        let rows = self
            .executor
            .fetch_all(&pool, privilege::LIST_USERS, &[], "list users")
            .await?;

        Ok(rows
            .iter()
            .map(|row| UserDescriptor::new(get_string(row, "USER_NAME"), get_string(row, "HOST_NAME")))
            .collect())
    }

    /// Raw `SHOW GRANTS` lines with a best-effort parse of each.
    pub async fn get_grants(&self, user: &str, host: &str) -> DbResult<GrantsResult> {
        let sql = privilege::show_grants(user, host)?;
        let pool = self.pool_manager.get_pool().await?;
        let rows = self
            .executor
            .fetch_all(&pool, &sql, &[], &format!("show grants for {}@{}", user, host))
            .await?;

        let grants: Vec<GrantLine> = rows
            .iter()
            .filter_map(|row| get_string_by_index(row, 0))
            .map(|raw| {
                let parsed = privilege::parse_grant_line(&raw);
                if parsed.is_none() {
                    debug!(line = %raw, "Grant line not parsed");
                }
                GrantLine { raw, parsed }
            })
            .collect();

        Ok(GrantsResult {
            user: user.to_string(),
            host: host.to_string(),
            grants,
        })
    }

    pub async fn create_user(&self, request: &CreateUserRequest) -> DbResult<ExecuteResult> {
        let sql = privilege::create_user(request)?;
        let pool = self.pool_manager.get_pool().await?;

        let result = self
            .executor
            .execute(
                &pool,
                &sql,
                &[],
                &format!("create user {}@{}", request.user, request.host),
            )
            .await?;

        info!(user = %request.user, host = %request.host, "User created");
        Ok(result)
    }

    pub async fn drop_user(&self, user: &str, host: &str) -> DbResult<ExecuteResult> {
        let sql = privilege::drop_user(user, host)?;
        let pool = self.pool_manager.get_pool().await?;

        let result = self
            .executor
            .execute(&pool, &sql, &[], &format!("drop user {}@{}", user, host))
            .await?;

        info!(user, host, "User dropped");
        Ok(result)
    }

    pub async fn grant(&self, request: &GrantRequest) -> DbResult<ExecuteResult> {
        let sql = privilege::grant(request)?;
        let result = self
            .run(&sql, format!("grant to {}@{}", request.user, request.host))
            .await?;

        info!(
            user = %request.user,
            host = %request.host,
            privileges = ?request.privileges,
            database = %request.db_name,
            table = %request.table_name,
            "Privileges granted"
        );
        Ok(result)
    }

    pub async fn revoke(&self, request: &GrantRequest) -> DbResult<ExecuteResult> {
        let sql = privilege::revoke(request)?;
        let result = self
            .run(&sql, format!("revoke from {}@{}", request.user, request.host))
            .await?;

        info!(
            user = %request.user,
            host = %request.host,
            privileges = ?request.privileges,
            database = %request.db_name,
            table = %request.table_name,
            "Privileges revoked"
        );
        Ok(result)
    }

    pub async fn flush_privileges(&self) -> DbResult<ExecuteResult> {
        let result = self
            .run(privilege::FLUSH_PRIVILEGES, "flush privileges".to_string())
            .await?;
        info!("Privileges flushed");
        Ok(result)
    }

    async fn run(&self, sql: &str, operation: String) -> DbResult<ExecuteResult> {
        let pool = self.pool_manager.get_pool().await?;
        self.executor.execute(&pool, sql, &[], &operation).await
    }
}
