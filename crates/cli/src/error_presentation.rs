use std::path::PathBuf;

use anyhow::Context;
use miette::Report;
use sqlcode_core::Issue;

pub(crate) type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug)]
pub(crate) enum CliError {
    Usage(String),
    Config {
        path: PathBuf,
        source: anyhow::Error,
    },
    Source {
        issues: Vec<Issue>,
    },
    Core(sqlcode_core::Error),
}

impl From<sqlcode_core::Error> for CliError {
    fn from(value: sqlcode_core::Error) -> Self {
        Self::Core(value)
    }
}

impl From<sqlcode_core::IngestError> for CliError {
    fn from(value: sqlcode_core::IngestError) -> Self {
        Self::Core(value.into())
    }
}

impl From<sqlcode_core::PreprocessError> for CliError {
    fn from(value: sqlcode_core::PreprocessError) -> Self {
        Self::Core(value.into())
    }
}

impl From<sqlcode_core::ExecuteError> for CliError {
    fn from(value: sqlcode_core::ExecuteError) -> Self {
        Self::Core(value.into())
    }
}

impl From<sqlcode_core::DeployError> for CliError {
    fn from(value: sqlcode_core::DeployError) -> Self {
        Self::Core(value.into())
    }
}

pub(crate) fn render_runtime_error(error: CliError) -> String {
    match error {
        CliError::Usage(message) => format!("[usage] {message}"),
        CliError::Config { path, source } => {
            let context = format!("while loading target config `{}`", path.display());
            format!("[config] {:#}", source.context(context))
        }
        CliError::Source { issues } => issues
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n"),
        CliError::Core(source) => {
            let category = core_category(&source);
            let report = report_with_context(source, "while running sqlcode");
            format!("[{category}] {report}")
        }
    }
}

fn report_with_context<E, C>(source: E, context: C) -> Report
where
    E: std::error::Error + Send + Sync + 'static,
    C: Into<String>,
{
    let context = context.into();
    let anyhow_error = std::result::Result::<(), E>::Err(source)
        .context(context)
        .expect_err("context wrapping must produce an error");
    miette::miette!("{anyhow_error:#}")
}

fn core_category(error: &sqlcode_core::Error) -> &'static str {
    match error {
        sqlcode_core::Error::Ingest(_) => "io",
        sqlcode_core::Error::Resolve(_) => "resolve",
        sqlcode_core::Error::Preprocess(_) => "preprocess",
        sqlcode_core::Error::Execute(_) => "execute",
        sqlcode_core::Error::Deploy(_) => "deploy",
    }
}
