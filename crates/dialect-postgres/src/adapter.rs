use std::{
    io,
    sync::{Mutex, MutexGuard},
};

use postgres::{Client, NoTls, SimpleQueryMessage, error::ErrorPosition};
use sqlcode_core::{ConnectionConfig, ExecuteError, Executor, ServerDiagnostic, Session};

const DEFAULT_POSTGRES_HOST: &str = "127.0.0.1";
const POISONED_CLIENT_MESSAGE: &str = "postgres connection state was poisoned";

/// Synchronous `postgres`-backed [`Executor`]. The single connection lives
/// in a mutex; an exclusive session is the held guard.
pub struct PostgresExecutor {
    client: Mutex<Client>,
}

struct PostgresSession<'a> {
    client: MutexGuard<'a, Client>,
}

pub fn connect(config: &ConnectionConfig) -> Result<PostgresExecutor, ExecuteError> {
    let client = connect_client(config)?;
    Ok(PostgresExecutor {
        client: Mutex::new(client),
    })
}

impl Executor for PostgresExecutor {
    fn exclusive(&self) -> Result<Box<dyn Session + '_>, ExecuteError> {
        let client = self
            .client
            .lock()
            .map_err(|_| driver_error(io::Error::other(POISONED_CLIENT_MESSAGE)))?;
        Ok(Box::new(PostgresSession { client }))
    }
}

impl Session for PostgresSession<'_> {
    fn execute(&mut self, sql: &str) -> Result<(), ExecuteError> {
        self.client
            .batch_execute(sql)
            .map_err(|source| execute_error(sql, source))
    }

    fn query_rows(&mut self, sql: &str) -> Result<Vec<Vec<String>>, ExecuteError> {
        let messages = self
            .client
            .simple_query(sql)
            .map_err(|source| execute_error(sql, source))?;

        let mut rows = Vec::new();
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                let mut values = Vec::with_capacity(row.len());
                for index in 0..row.len() {
                    values.push(row.get(index).unwrap_or_default().to_string());
                }
                rows.push(values);
            }
        }
        Ok(rows)
    }
}

fn connect_client(config: &ConnectionConfig) -> Result<Client, ExecuteError> {
    let mut postgres_config = postgres::Config::new();

    if let Some(host) = &config.host {
        postgres_config.host(host);
    } else {
        postgres_config.host(DEFAULT_POSTGRES_HOST);
    }
    if let Some(port) = config.port {
        postgres_config.port(port);
    }
    if let Some(user) = &config.user {
        postgres_config.user(user);
    }
    if let Some(password) = &config.password {
        postgres_config.password(password);
    }
    postgres_config.dbname(&config.database);

    postgres_config.connect(NoTls).map_err(driver_error)
}

/// Postgres reports an error cursor as a character offset into the query;
/// the offset is converted to a line number here so the coordinator can
/// translate it like any other server-reported line.
fn execute_error(sql: &str, source: postgres::Error) -> ExecuteError {
    let Some(db_error) = source.as_db_error() else {
        return driver_error(source);
    };

    let line = db_error
        .position()
        .map(|position| match position {
            ErrorPosition::Original(offset) => line_of_offset(sql, *offset),
            ErrorPosition::Internal { position, .. } => line_of_offset(sql, *position),
        })
        .unwrap_or(1);

    ExecuteError::Server {
        diagnostics: vec![ServerDiagnostic {
            line,
            message: db_error.message().to_string(),
            procedure: db_error.routine().map(str::to_string),
            code: None,
        }],
    }
}

fn line_of_offset(sql: &str, offset: u32) -> u32 {
    let preceding = sql.chars().take(offset.saturating_sub(1) as usize);
    1 + preceding.filter(|&ch| ch == '\n').count() as u32
}

fn driver_error<E>(source: E) -> ExecuteError
where
    E: std::error::Error + Send + Sync + 'static,
{
    ExecuteError::Driver(Box::new(source))
}
