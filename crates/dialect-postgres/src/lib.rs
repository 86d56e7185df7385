mod adapter;
mod deploy_queries;

use std::time::Duration;

use sqlcode_core::{ConnectionConfig, DeployDialect, ExecuteError, Executor, Session};

pub use adapter::PostgresExecutor;

const DIALECT_NAME: &str = "postgres";

/// P-dialect deployment: pg advisory locking, SET ROLE impersonation, and
/// the `sqlcode` helper functions.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl PostgresDialect {
    pub fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Executor>, ExecuteError> {
        Ok(Box::new(adapter::connect(config)?))
    }
}

impl DeployDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        DIALECT_NAME
    }

    fn begin_sql(&self) -> &'static str {
        deploy_queries::BEGIN_SQL
    }

    fn commit_sql(&self) -> &'static str {
        deploy_queries::COMMIT_SQL
    }

    fn rollback_sql(&self) -> &'static str {
        deploy_queries::ROLLBACK_SQL
    }

    fn impersonate_sql(&self) -> &'static str {
        deploy_queries::IMPERSONATE_SQL
    }

    fn revert_sql(&self) -> &'static str {
        deploy_queries::REVERT_SQL
    }

    fn schema_exists_sql(&self, schema: &str) -> String {
        deploy_queries::schema_exists_sql(schema)
    }

    fn acquire_lock_sql(&self, key: &str, timeout: Duration) -> String {
        deploy_queries::acquire_lock_sql(key, timeout.as_millis())
    }

    fn release_lock_sql(&self, key: &str) -> String {
        deploy_queries::release_lock_sql(key)
    }

    /// A lock wait that exceeds `lock_timeout` raises a cancellation error
    /// instead of returning a status, so acquisition is overridden to map
    /// that error onto the timeout result.
    fn acquire_lock(
        &self,
        session: &mut dyn Session,
        key: &str,
        timeout: Duration,
    ) -> Result<bool, ExecuteError> {
        match session.execute(&self.acquire_lock_sql(key, timeout)) {
            Ok(()) => Ok(true),
            Err(ExecuteError::Server { diagnostics })
                if diagnostics
                    .iter()
                    .any(|item| item.message.contains("lock timeout")) =>
            {
                Ok(false)
            }
            Err(error) => Err(error),
        }
    }

    fn create_schema_sql(&self, suffix: &str) -> String {
        deploy_queries::create_schema_sql(suffix)
    }

    fn drop_schema_sql(&self, suffix: &str) -> String {
        deploy_queries::drop_schema_sql(suffix)
    }

    fn list_schemas_sql(&self) -> &'static str {
        deploy_queries::LIST_SCHEMAS_QUERY
    }
}
