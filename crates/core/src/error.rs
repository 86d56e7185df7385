use std::{error::Error as StdError, fmt, sync::Arc};

use thiserror::Error;

use crate::{Pos, SourcePath};

pub type BoxedError = Box<dyn StdError + Send + Sync + 'static>;

/// A parse- or resolve-time problem collected on a [`crate::Document`].
/// Collection never aborts parsing; the document stays inspectable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub pos: Pos,
    pub message: String,
}

impl Issue {
    pub fn new(pos: Pos, message: impl Into<String>) -> Self {
        Self {
            pos,
            message: message.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.pos, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("dependency cycle through {name}")]
    Cycle { name: String, pos: Pos },
    #[error("{name} is not defined in this package")]
    NotFound { name: String, pos: Pos },
}

impl ResolveError {
    #[must_use]
    pub fn pos(&self) -> &Pos {
        match self {
            ResolveError::Cycle { pos, .. } | ResolveError::NotFound { pos, .. } => pos,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreprocessError {
    #[error("{pos}: constant not declared: {name}")]
    ConstantNotDeclared { name: String, pos: Pos },
    #[error("{pos}: constant {name} is declared without a value")]
    ConstantWithoutValue { name: String, pos: Pos },
    #[error("schema suffix must not contain ']': {suffix:?}")]
    InvalidSuffix { suffix: String },
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: content is identical to {earlier}")]
    Duplicate { path: String, earlier: String },
}

/// One diagnostic item from a server-reported execution failure. The line
/// number counts within the executed batch, before any mapping back to
/// source lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDiagnostic {
    pub line: u32,
    pub message: String,
    pub procedure: Option<String>,
    pub code: Option<i64>,
}

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("{}", render_diagnostics(diagnostics))]
    Server { diagnostics: Vec<ServerDiagnostic> },
    #[error("driver error: {0}")]
    Driver(#[source] BoxedError),
}

fn render_diagnostics(diagnostics: &[ServerDiagnostic]) -> String {
    let rendered = diagnostics
        .iter()
        .map(|item| item.message.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    format!("server error: {rendered}")
}

/// A server failure tied back to the batch that produced it, with the
/// server's batch-relative line numbers already translated to source lines
/// through the preprocessor's correction table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerFailure {
    pub items: Vec<ServerFailureItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerFailureItem {
    pub file: Option<Arc<SourcePath>>,
    pub line: u32,
    pub procedure: String,
    pub message: String,
}

impl fmt::Display for ServerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, item) in self.items.iter().enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            match &item.file {
                Some(file) => write!(
                    f,
                    "{}:{} ({}): {}",
                    file, item.line, item.procedure, item.message
                )?,
                None => write!(f, "{} ({}): {}", item.line, item.procedure, item.message)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("schema {schema} already exists")]
    SchemaExists { schema: String },
    #[error("timed out acquiring deployment lock {key}")]
    LockTimeout { key: String },
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error("{0}")]
    Server(ServerFailure),
    #[error("execute error: {0}")]
    Execute(#[from] ExecuteError),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),
    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),
    #[error("preprocess error: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("execute error: {0}")]
    Execute(#[from] ExecuteError),
    #[error("deploy error: {0}")]
    Deploy(#[from] DeployError),
}

pub type Result<T> = std::result::Result<T, Error>;
