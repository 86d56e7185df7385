use crate::ExecuteError;

/// Handle to one target database.
///
/// The deployment coordinator caches successful uploads per handle by
/// address identity: two semantically equal handles that are distinct
/// references are cached separately. That is acceptable because the cache is
/// an optimization; correctness comes from the server-side advisory lock and
/// the exists check.
pub trait Executor: Send + Sync {
    /// Borrows a connection for this caller's exclusive use until the boxed
    /// session is dropped.
    fn exclusive(&self) -> Result<Box<dyn Session + '_>, ExecuteError>;
}

/// One exclusively held connection. Impersonation and transaction state set
/// through [`Session::execute`] stays on the connection until reverted, so
/// implementations must not hand the underlying connection to anyone else
/// while the session lives.
pub trait Session {
    fn execute(&mut self, sql: &str) -> Result<(), ExecuteError>;

    fn query_rows(&mut self, sql: &str) -> Result<Vec<Vec<String>>, ExecuteError>;

    fn query_scalar(&mut self, sql: &str) -> Result<Option<String>, ExecuteError> {
        Ok(self
            .query_rows(sql)?
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next()))
    }
}
