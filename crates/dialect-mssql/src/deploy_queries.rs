// Deployment statements for SQL Server. Everything runs through
// simple_query, so values are embedded as quoted literals; the suffix is
// validated against ']' before it gets here.

pub(crate) const BEGIN_SQL: &str = "BEGIN TRANSACTION";
pub(crate) const COMMIT_SQL: &str = "COMMIT TRANSACTION";
pub(crate) const ROLLBACK_SQL: &str = "ROLLBACK TRANSACTION";

/// The sandbox user owns nothing and can only run the sqlcode helpers; the
/// whole upload transaction runs as it.
pub(crate) const IMPERSONATE_SQL: &str = "EXECUTE AS USER = N'sqlcode-sandbox';";
pub(crate) const REVERT_SQL: &str = "REVERT;";

pub(crate) const LIST_SCHEMAS_QUERY: &str = r#"
SELECT
    s.name AS schema_name,
    CAST(COUNT(o.object_id) AS nvarchar(32)) AS object_count,
    COALESCE(CONVERT(nvarchar(33), MIN(o.create_date), 126), '') AS created,
    COALESCE(CONVERT(nvarchar(33), MAX(o.modify_date), 126), '') AS modified
FROM sys.schemas AS s
LEFT JOIN sys.objects AS o ON o.schema_id = s.schema_id
WHERE s.name LIKE N'code@%'
GROUP BY s.name
ORDER BY s.name ASC;
"#;

pub(crate) fn schema_exists_sql(schema: &str) -> String {
    format!(
        "SELECT CAST(COUNT(*) AS nvarchar(16)) FROM sys.schemas WHERE name = {};",
        quote_string(schema)
    )
}

/// sp_getapplock returns >= 0 when the lock was granted and a negative
/// status on timeout or failure. Session owner: the lock must outlive the
/// upload transaction, so it cannot be transaction-owned.
pub(crate) fn acquire_lock_sql(key: &str, timeout_ms: u128) -> String {
    format!(
        "DECLARE @result int;\n\
         EXEC @result = sp_getapplock @Resource = {resource}, @LockMode = 'Exclusive', @LockOwner = 'Session', @LockTimeout = {timeout_ms};\n\
         SELECT CAST(@result AS nvarchar(16));",
        resource = quote_string(key),
    )
}

pub(crate) fn release_lock_sql(key: &str) -> String {
    format!(
        "EXEC sp_releaseapplock @Resource = {}, @LockOwner = 'Session';",
        quote_string(key)
    )
}

pub(crate) fn create_schema_sql(suffix: &str) -> String {
    format!(
        "EXEC [sqlcode].[create_code_schema] @suffix = {};",
        quote_string(suffix)
    )
}

pub(crate) fn drop_schema_sql(suffix: &str) -> String {
    format!(
        "EXEC [sqlcode].[drop_code_schema] @suffix = {};",
        quote_string(suffix)
    )
}

pub(crate) fn quote_string(value: &str) -> String {
    format!("N'{}'", value.replace('\'', "''"))
}
