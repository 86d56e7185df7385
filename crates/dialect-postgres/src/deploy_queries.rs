// Deployment statements for Postgres. Values are embedded as quoted
// literals; the suffix is validated against ']' before it gets here.

pub(crate) const BEGIN_SQL: &str = "BEGIN";
pub(crate) const COMMIT_SQL: &str = "COMMIT";
pub(crate) const ROLLBACK_SQL: &str = "ROLLBACK";

pub(crate) const IMPERSONATE_SQL: &str = "SET ROLE \"sqlcode-sandbox\";";
pub(crate) const REVERT_SQL: &str = "RESET ROLE;";

/// Postgres keeps no creation timestamps for schema contents, so the date
/// columns are empty.
pub(crate) const LIST_SCHEMAS_QUERY: &str = r#"
SELECT
    n.nspname AS schema_name,
    (SELECT COUNT(*) FROM pg_catalog.pg_proc AS p WHERE p.pronamespace = n.oid)::text AS object_count,
    '' AS created,
    '' AS modified
FROM pg_catalog.pg_namespace AS n
WHERE n.nspname LIKE 'code@%'
ORDER BY n.nspname ASC;
"#;

pub(crate) fn schema_exists_sql(schema: &str) -> String {
    format!(
        "SELECT COUNT(*)::text FROM pg_catalog.pg_namespace WHERE nspname = {};",
        quote_string(schema)
    )
}

/// Advisory locks are heavyweight locks, so `lock_timeout` bounds the wait;
/// a timeout surfaces as a cancellation error rather than a status code.
/// The setting must not outlive the acquisition.
pub(crate) fn acquire_lock_sql(key: &str, timeout_ms: u128) -> String {
    format!(
        "SET lock_timeout = '{timeout_ms}ms';\n\
         SELECT pg_advisory_lock(hashtext({key}));\n\
         RESET lock_timeout;",
        key = quote_string(key),
    )
}

pub(crate) fn release_lock_sql(key: &str) -> String {
    format!("SELECT pg_advisory_unlock(hashtext({}));", quote_string(key))
}

pub(crate) fn create_schema_sql(suffix: &str) -> String {
    format!(
        "SELECT sqlcode.create_code_schema({});",
        quote_string(suffix)
    )
}

pub(crate) fn drop_schema_sql(suffix: &str) -> String {
    format!("SELECT sqlcode.drop_code_schema({});", quote_string(suffix))
}

pub(crate) fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
