mod config;
mod error_presentation;

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    process::ExitCode,
    str::FromStr,
};

use clap::{Parser, Subcommand};
use error_presentation::{CliError, CliResult, render_runtime_error};
use sqlcode_core::{
    ConnectionConfig, DeployDialect, Deployable, Dialect, DirTree, Document, Executor, SourceTree,
    derive_suffix, list_uploaded, preprocess, read_trees,
};
use sqlcode_dialect_mssql::MssqlDialect;
use sqlcode_dialect_postgres::PostgresDialect;

#[derive(Parser)]
#[command(name = "sqlcode", version, about = "Manage versioned SQL stored code")]
struct Cli {
    /// Target configuration file.
    #[arg(long, global = true, default_value = "sqlcode.yaml")]
    config: PathBuf,
    /// Source dialect to operate on.
    #[arg(long, global = true, default_value = "mssql")]
    dialect: String,
    /// Build tags consumed by include-if pragmas, comma separated.
    #[arg(long, global = true)]
    tags: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Preprocess a package and print every batch.
    Build {
        package: PathBuf,
        suffix: String,
    },
    /// Drop the target schema if it exists, then upload. Target is <db>:<suffix>.
    Up {
        target: String,
        #[arg(default_value = ".")]
        package: PathBuf,
    },
    /// Print the derived schema suffix for a package.
    Hash {
        #[arg(default_value = ".")]
        package: PathBuf,
    },
    /// Print declared constants in canonical declare form.
    Constants {
        #[arg(default_value = ".")]
        package: PathBuf,
    },
    /// Print every create and its resolved dependencies.
    Dep {
        #[arg(default_value = ".")]
        package: PathBuf,
    },
    /// List uploaded code schemas on a configured database.
    Ls { database: String },
    /// Print configured database names.
    Remote,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{}", render_runtime_error(error));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let tags = parse_tags(cli.tags.as_deref());
    let dialect = Dialect::from_str(&cli.dialect).map_err(CliError::Usage)?;

    match &cli.command {
        Command::Build { package, suffix } => build(dialect, package, &tags, suffix),
        Command::Up { target, package } => up(&cli.config, package, &tags, target),
        Command::Hash { package } => {
            let document = load_package(dialect, package, &tags)?;
            println!("{}", derive_suffix(&document));
            Ok(())
        }
        Command::Constants { package } => {
            let document = load_package(dialect, package, &tags)?;
            for declare in &document.declares {
                println!("{}", declare.canonical());
            }
            Ok(())
        }
        Command::Dep { package } => {
            let document = load_package(dialect, package, &tags)?;
            for create in &document.creates {
                let deps = create
                    .deps
                    .iter()
                    .map(|dep| dep.name.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                println!("{}: {deps}", create.quoted_name);
            }
            Ok(())
        }
        Command::Ls { database } => ls(&cli.config, database),
        Command::Remote => remote(&cli.config),
    }
}

fn build(dialect: Dialect, package: &Path, tags: &BTreeSet<String>, suffix: &str) -> CliResult<()> {
    let document = load_package(dialect, package, tags)?;
    let batches = preprocess(&document, suffix).map_err(CliError::from)?;
    for batch in &batches {
        println!("{}", batch.sql);
        if dialect == Dialect::Mssql {
            println!("go");
        }
    }
    Ok(())
}

fn up(config_path: &Path, package: &Path, tags: &BTreeSet<String>, target: &str) -> CliResult<()> {
    let Some((database, suffix)) = target.split_once(':') else {
        return Err(CliError::Usage(format!(
            "expected <db>:<suffix>, got `{target}`"
        )));
    };

    let config = load_config(config_path)?;
    let target_config = lookup_target(&config, database)?;
    let dialect = Dialect::from_str(&target_config.driver).map_err(CliError::Usage)?;
    let document = load_package(dialect, package, tags)?;
    let deployable = Deployable::with_suffix(document, suffix).map_err(CliError::from)?;

    let (deploy, executor) = connect_target(dialect, &target_config.connection())?;
    deployable
        .drop_and_upload(deploy.as_ref(), executor.as_ref())
        .map_err(CliError::from)?;

    println!("uploaded {}", deployable.schema_name());
    Ok(())
}

fn ls(config_path: &Path, database: &str) -> CliResult<()> {
    let config = load_config(config_path)?;
    let target_config = lookup_target(&config, database)?;
    let dialect = Dialect::from_str(&target_config.driver).map_err(CliError::Usage)?;

    let (deploy, executor) = connect_target(dialect, &target_config.connection())?;
    let schemas = list_uploaded(deploy.as_ref(), executor.as_ref()).map_err(CliError::from)?;
    for schema in schemas {
        println!(
            "{}\t{}\t{}\t{}",
            schema.name, schema.object_count, schema.created, schema.modified
        );
    }
    Ok(())
}

fn remote(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    for name in config.databases.keys() {
        println!("{name}");
    }
    Ok(())
}

fn load_config(config_path: &Path) -> CliResult<config::Config> {
    config::load(config_path).map_err(|source| CliError::Config {
        path: config_path.to_path_buf(),
        source,
    })
}

fn lookup_target<'a>(
    config: &'a config::Config,
    database: &str,
) -> CliResult<&'a config::TargetConfig> {
    config.databases.get(database).ok_or_else(|| {
        CliError::Usage(format!("no configured database named `{database}`"))
    })
}

fn connect_target(
    dialect: Dialect,
    connection: &ConnectionConfig,
) -> CliResult<(Box<dyn DeployDialect>, Box<dyn Executor>)> {
    match dialect {
        Dialect::Mssql => {
            let deploy = MssqlDialect;
            let executor = deploy.connect(connection).map_err(CliError::from)?;
            Ok((Box::new(deploy), executor))
        }
        Dialect::Postgres => {
            let deploy = PostgresDialect;
            let executor = deploy.connect(connection).map_err(CliError::from)?;
            Ok((Box::new(deploy), executor))
        }
    }
}

fn load_package(dialect: Dialect, package: &Path, tags: &BTreeSet<String>) -> CliResult<Document> {
    let tree = DirTree::new(package);
    let trees: [&dyn SourceTree; 1] = [&tree];
    let document = read_trees(dialect, &trees, tags)?;
    if !document.errors.is_empty() {
        return Err(CliError::Source {
            issues: document.errors,
        });
    }
    Ok(document)
}

fn parse_tags(raw: Option<&str>) -> BTreeSet<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(ToString::to_string)
        .collect()
}
