mod config;
mod deploy;
mod dialect;
mod document;
mod error;
mod executor;
mod ingest;
mod keywords;
mod ordering;
mod parse;
mod patch;
mod position;
mod preprocess;
mod scan;
mod suffix;
mod token;

pub use config::ConnectionConfig;
pub use deploy::{DeployDialect, Deployable, LOCK_TIMEOUT, UploadedSchema, list_uploaded};
pub use dialect::Dialect;
pub use document::{
    Create, CreateKind, Declare, DeclareType, DependencyRef, Document, TypeArg, is_constant_name,
    is_constant_reference, is_declare_name, is_virtual_schema,
};
pub use error::{
    BoxedError, DeployError, Error, ExecuteError, IngestError, Issue, PreprocessError,
    ResolveError, Result, ServerDiagnostic, ServerFailure, ServerFailureItem,
};
pub use executor::{Executor, Session};
pub use ingest::{DirTree, SourceTree, read_trees};
pub use patch::patch;
pub use position::{Pos, SourcePath};
pub use preprocess::{LineCorrection, PreprocessedBatch, preprocess};
pub use scan::Scanner;
pub use suffix::{SCHEMA_PREFIX, derive_suffix, schema_name};
pub use token::{Token, TokenKind};
