use std::{
    collections::BTreeSet,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use crate::{
    DeployError, Document, ExecuteError, Executor, PreprocessError, PreprocessedBatch,
    ServerFailure, ServerFailureItem, Session, preprocess, suffix,
};

/// Upper bound on waiting for the server-side advisory lock.
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(20);

/// The SQL a target server needs for deployment. Implemented by the dialect
/// crates as constant statement text; the coordinator owns the sequencing.
pub trait DeployDialect: Send + Sync {
    fn name(&self) -> &'static str;

    fn begin_sql(&self) -> &'static str;
    fn commit_sql(&self) -> &'static str;
    fn rollback_sql(&self) -> &'static str;

    /// Switches the connection to the low-privilege deployment identity.
    fn impersonate_sql(&self) -> &'static str;
    /// Restores the connection's own identity. The coordinator issues this
    /// on every exit path before the session is released.
    fn revert_sql(&self) -> &'static str;

    /// Single-row query returning nonzero iff `schema` exists.
    fn schema_exists_sql(&self, schema: &str) -> String;

    fn acquire_lock_sql(&self, key: &str, timeout: Duration) -> String;
    fn release_lock_sql(&self, key: &str) -> String;

    /// Interprets the scalar produced by [`DeployDialect::acquire_lock_sql`].
    fn lock_granted(&self, scalar: Option<&str>) -> bool {
        let _ = scalar;
        true
    }

    /// Acquires the named advisory lock, returning false on timeout.
    fn acquire_lock(
        &self,
        session: &mut dyn Session,
        key: &str,
        timeout: Duration,
    ) -> Result<bool, ExecuteError> {
        let scalar = session.query_scalar(&self.acquire_lock_sql(key, timeout))?;
        Ok(self.lock_granted(scalar.as_deref()))
    }

    /// Invokes the server-side helper that creates `code@<suffix>`.
    fn create_schema_sql(&self, suffix: &str) -> String;
    /// Invokes the server-side helper that drops `code@<suffix>`.
    fn drop_schema_sql(&self, suffix: &str) -> String;

    /// Rows of (name, object count, create date, modify date) for every
    /// schema matching `code@*`.
    fn list_schemas_sql(&self) -> &'static str;
}

/// One row from [`list_uploaded`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedSchema {
    pub name: String,
    pub object_count: u32,
    pub created: String,
    pub modified: String,
}

/// A parsed document bound to a target schema suffix, plus the cache of
/// executor handles known to already hold a successful upload.
pub struct Deployable {
    document: Document,
    suffix: String,
    uploaded: Mutex<BTreeSet<usize>>,
}

impl Deployable {
    /// Binds a document to a caller-chosen suffix.
    pub fn with_suffix(
        document: Document,
        suffix: impl Into<String>,
    ) -> Result<Self, PreprocessError> {
        let suffix = suffix.into();
        if suffix.contains(']') {
            return Err(PreprocessError::InvalidSuffix { suffix });
        }
        Ok(Self {
            document,
            suffix,
            uploaded: Mutex::new(BTreeSet::new()),
        })
    }

    /// Binds a document to its derived content-hash suffix.
    #[must_use]
    pub fn derived(document: Document) -> Self {
        let suffix = suffix::derive_suffix(&document);
        Self {
            document,
            suffix,
            uploaded: Mutex::new(BTreeSet::new()),
        }
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    #[must_use]
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    #[must_use]
    pub fn schema_name(&self) -> String {
        suffix::schema_name(&self.suffix)
    }

    fn lock_key(&self) -> String {
        format!("sqlcode.EnsureUploaded/{}", self.suffix)
    }

    /// True when `executor` is already known to hold this deployable.
    #[must_use]
    pub fn is_uploaded(&self, executor: &dyn Executor) -> bool {
        self.uploaded_set().contains(&handle_key(executor))
    }

    /// Queries the server for the target schema's existence.
    pub fn exists(
        &self,
        dialect: &dyn DeployDialect,
        executor: &dyn Executor,
    ) -> Result<bool, DeployError> {
        let mut session = executor.exclusive()?;
        self.exists_on(dialect, session.as_mut())
    }

    /// Single-shot upload. Fails if the target schema already exists.
    pub fn upload(
        &self,
        dialect: &dyn DeployDialect,
        executor: &dyn Executor,
    ) -> Result<(), DeployError> {
        let mut session = executor.exclusive()?;
        if self.exists_on(dialect, session.as_mut())? {
            return Err(DeployError::SchemaExists {
                schema: self.schema_name(),
            });
        }
        let result = self.upload_on(dialect, session.as_mut());
        drop(session);
        if result.is_ok() {
            self.mark_uploaded(executor);
        }
        result
    }

    /// Idempotent upload: returns immediately when this executor is cached,
    /// otherwise serializes on the server-side advisory lock, re-checks
    /// existence, and uploads only when the schema is absent. Two concurrent
    /// callers for one suffix observe serialized outcomes: one uploads, the
    /// other's exists check short-circuits.
    pub fn ensure_uploaded(
        &self,
        dialect: &dyn DeployDialect,
        executor: &dyn Executor,
    ) -> Result<(), DeployError> {
        if self.is_uploaded(executor) {
            return Ok(());
        }
        let mut session = executor.exclusive()?;
        let result = self.ensure_locked(dialect, session.as_mut());
        drop(session);
        if result.is_ok() {
            self.mark_uploaded(executor);
        }
        result
    }

    /// Overwrite deployment for named suffixes: drops the schema when
    /// present, then uploads.
    pub fn drop_and_upload(
        &self,
        dialect: &dyn DeployDialect,
        executor: &dyn Executor,
    ) -> Result<(), DeployError> {
        let mut session = executor.exclusive()?;
        if self.exists_on(dialect, session.as_mut())? {
            session.execute(&dialect.drop_schema_sql(&self.suffix))?;
        }
        let result = self.upload_on(dialect, session.as_mut());
        drop(session);
        if result.is_ok() {
            self.mark_uploaded(executor);
        }
        result
    }

    fn ensure_locked(
        &self,
        dialect: &dyn DeployDialect,
        session: &mut dyn Session,
    ) -> Result<(), DeployError> {
        let key = self.lock_key();
        if !dialect.acquire_lock(session, &key, LOCK_TIMEOUT)? {
            return Err(DeployError::LockTimeout { key });
        }
        let result = self.ensure_under_lock(dialect, session);
        let released = session.execute(&dialect.release_lock_sql(&key));
        match (result, released) {
            (Err(error), _) => Err(error),
            (Ok(()), Err(error)) => Err(error.into()),
            (Ok(()), Ok(())) => Ok(()),
        }
    }

    fn ensure_under_lock(
        &self,
        dialect: &dyn DeployDialect,
        session: &mut dyn Session,
    ) -> Result<(), DeployError> {
        if self.exists_on(dialect, session)? {
            return Ok(());
        }
        self.upload_on(dialect, session)
    }

    /// Runs the transactional upload under the deployment identity. The
    /// revert statement executes on every path out of here, including
    /// failures, so the session never returns to its owner with elevated
    /// state.
    fn upload_on(
        &self,
        dialect: &dyn DeployDialect,
        session: &mut dyn Session,
    ) -> Result<(), DeployError> {
        session.execute(dialect.impersonate_sql())?;
        let result = self.upload_transaction(dialect, session);
        let reverted = session.execute(dialect.revert_sql());
        match (result, reverted) {
            (Err(error), _) => Err(error),
            (Ok(()), Err(error)) => Err(error.into()),
            (Ok(()), Ok(())) => Ok(()),
        }
    }

    fn upload_transaction(
        &self,
        dialect: &dyn DeployDialect,
        session: &mut dyn Session,
    ) -> Result<(), DeployError> {
        session.execute(dialect.begin_sql())?;
        match self.upload_batches(dialect, session) {
            Ok(()) => {
                session.execute(dialect.commit_sql())?;
                Ok(())
            }
            Err(error) => {
                let _ = session.execute(dialect.rollback_sql());
                Err(error)
            }
        }
    }

    fn upload_batches(
        &self,
        dialect: &dyn DeployDialect,
        session: &mut dyn Session,
    ) -> Result<(), DeployError> {
        session.execute(&dialect.create_schema_sql(&self.suffix))?;
        let batches = preprocess(&self.document, &self.suffix)?;
        for batch in &batches {
            if let Err(error) = session.execute(&batch.sql) {
                return Err(wrap_batch_failure(batch, error));
            }
        }
        Ok(())
    }

    fn exists_on(
        &self,
        dialect: &dyn DeployDialect,
        session: &mut dyn Session,
    ) -> Result<bool, DeployError> {
        let scalar = session.query_scalar(&dialect.schema_exists_sql(&self.schema_name()))?;
        Ok(scalar
            .is_some_and(|value| value.trim().parse::<i64>().is_ok_and(|count| count != 0)))
    }

    fn mark_uploaded(&self, executor: &dyn Executor) {
        self.uploaded_set().insert(handle_key(executor));
    }

    fn uploaded_set(&self) -> std::sync::MutexGuard<'_, BTreeSet<usize>> {
        self.uploaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Enumerates the `code@*` schemas present on the target.
pub fn list_uploaded(
    dialect: &dyn DeployDialect,
    executor: &dyn Executor,
) -> Result<Vec<UploadedSchema>, DeployError> {
    let mut session = executor.exclusive()?;
    let rows = session.query_rows(dialect.list_schemas_sql())?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let mut fields = row.into_iter();
            Some(UploadedSchema {
                name: fields.next()?,
                object_count: fields
                    .next()
                    .and_then(|value| value.trim().parse().ok())
                    .unwrap_or(0),
                created: fields.next().unwrap_or_default(),
                modified: fields.next().unwrap_or_default(),
            })
        })
        .collect())
}

/// Translates a server failure's batch-relative line numbers to source
/// lines through the batch's correction table.
fn wrap_batch_failure(batch: &PreprocessedBatch, error: ExecuteError) -> DeployError {
    match error {
        ExecuteError::Server { diagnostics } => DeployError::Server(ServerFailure {
            items: diagnostics
                .into_iter()
                .map(|item| ServerFailureItem {
                    file: batch.start.file.clone(),
                    line: batch.source_line(item.line),
                    procedure: batch.create_name.clone(),
                    message: item.message,
                })
                .collect(),
        }),
        other => DeployError::Execute(other),
    }
}

fn handle_key(executor: &dyn Executor) -> usize {
    std::ptr::from_ref(executor).cast::<()>() as usize
}
