mod adapter;
mod deploy_queries;

use std::time::Duration;

use sqlcode_core::{ConnectionConfig, DeployDialect, ExecuteError, Executor};

pub use adapter::MssqlExecutor;

const DIALECT_NAME: &str = "mssql";

/// T-dialect deployment: sp_getapplock advisory locking, EXECUTE AS
/// impersonation, and the `[sqlcode]` helper procedures.
#[derive(Debug, Default, Clone, Copy)]
pub struct MssqlDialect;

impl MssqlDialect {
    pub fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Executor>, ExecuteError> {
        Ok(Box::new(adapter::connect(config)?))
    }
}

impl DeployDialect for MssqlDialect {
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

    fn lock_granted(&self, scalar: Option<&str>) -> bool {
        scalar
            .and_then(|value| value.trim().parse::<i32>().ok())
            .is_some_and(|status| status >= 0)
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
