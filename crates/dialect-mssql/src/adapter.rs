use std::{
    io,
    sync::{Mutex, MutexGuard},
};

use futures_util::TryStreamExt;
use sqlcode_core::{ConnectionConfig, ExecuteError, Executor, ServerDiagnostic, Session};
use tiberius::{AuthMethod, Client, Config, QueryItem};
use tokio::{
    net::TcpStream,
    runtime::{Builder, Runtime},
};
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

type TdsClient = Client<Compat<TcpStream>>;

const DEFAULT_MSSQL_HOST: &str = "127.0.0.1";
const DEFAULT_MSSQL_PORT: u16 = 1433;
const POISONED_CONNECTION_MESSAGE: &str = "mssql connection state was poisoned";

/// Tiberius-backed [`Executor`]. The driver is async; a current-thread
/// runtime drives it behind a synchronous facade, and the connection lives
/// in a mutex so an exclusive session is simply the held guard.
pub struct MssqlExecutor {
    state: Mutex<LiveState>,
}

struct LiveState {
    runtime: Runtime,
    client: TdsClient,
}

struct MssqlSession<'a> {
    state: MutexGuard<'a, LiveState>,
}

pub fn connect(config: &ConnectionConfig) -> Result<MssqlExecutor, ExecuteError> {
    let state = connect_live_state(config)?;
    Ok(MssqlExecutor {
        state: Mutex::new(state),
    })
}

impl Executor for MssqlExecutor {
    fn exclusive(&self) -> Result<Box<dyn Session + '_>, ExecuteError> {
        let state = self
            .state
            .lock()
            .map_err(|_| driver_error(io::Error::other(POISONED_CONNECTION_MESSAGE)))?;
        Ok(Box::new(MssqlSession { state }))
    }
}

impl Session for MssqlSession<'_> {
    fn execute(&mut self, sql: &str) -> Result<(), ExecuteError> {
        execute_live(&mut self.state, sql)
    }

    fn query_rows(&mut self, sql: &str) -> Result<Vec<Vec<String>>, ExecuteError> {
        query_rows_live(&mut self.state, sql)
    }
}

fn connect_live_state(config: &ConnectionConfig) -> Result<LiveState, ExecuteError> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(driver_error)?;
    let tds_config = build_tiberius_config(config)?;

    let client = runtime.block_on(async {
        let tcp = TcpStream::connect(tds_config.get_addr())
            .await
            .map_err(driver_error)?;
        tcp.set_nodelay(true).map_err(driver_error)?;

        Client::connect(tds_config, tcp.compat_write())
            .await
            .map_err(execute_error)
    })?;

    Ok(LiveState { runtime, client })
}

fn build_tiberius_config(config: &ConnectionConfig) -> Result<Config, ExecuteError> {
    let host = config
        .host
        .as_deref()
        .unwrap_or(DEFAULT_MSSQL_HOST)
        .to_string();
    let port = config.port.unwrap_or(DEFAULT_MSSQL_PORT);
    let user = config
        .user
        .clone()
        .ok_or_else(|| driver_error(io::Error::other("mssql user is required")))?;
    let password = config.password.clone().unwrap_or_default();

    let mut tds_config = Config::new();
    tds_config.host(host.as_str());
    tds_config.port(port);
    tds_config.database(config.database.clone());
    tds_config.authentication(AuthMethod::sql_server(user, password));
    tds_config.trust_cert();

    Ok(tds_config)
}

fn execute_live(state: &mut LiveState, sql: &str) -> Result<(), ExecuteError> {
    let LiveState { runtime, client } = state;

    runtime.block_on(async {
        let mut stream = client.simple_query(sql).await.map_err(execute_error)?;
        while stream.try_next().await.map_err(execute_error)?.is_some() {}
        Ok(())
    })
}

fn query_rows_live(state: &mut LiveState, sql: &str) -> Result<Vec<Vec<String>>, ExecuteError> {
    let LiveState { runtime, client } = state;

    runtime.block_on(async {
        let mut stream = client.simple_query(sql).await.map_err(execute_error)?;
        let mut rows = Vec::new();

        while let Some(item) = stream.try_next().await.map_err(execute_error)? {
            if let QueryItem::Row(row) = item {
                let mut values = Vec::with_capacity(row.columns().len());
                for index in 0..row.columns().len() {
                    values.push(
                        row.get::<&str, usize>(index)
                            .unwrap_or_default()
                            .to_string(),
                    );
                }
                rows.push(values);
            }
        }

        Ok(rows)
    })
}

/// Server-raised errors keep their per-item line numbers so the coordinator
/// can translate them back to source positions; everything else is a driver
/// failure.
fn execute_error(source: tiberius::error::Error) -> ExecuteError {
    match source {
        tiberius::error::Error::Server(token) => ExecuteError::Server {
            diagnostics: vec![ServerDiagnostic {
                line: token.line(),
                message: token.message().to_string(),
                procedure: Some(token.procedure().to_string())
                    .filter(|procedure| !procedure.is_empty()),
                code: Some(i64::from(token.code())),
            }],
        },
        other => ExecuteError::Driver(Box::new(other)),
    }
}

fn driver_error<E>(source: E) -> ExecuteError
where
    E: std::error::Error + Send + Sync + 'static,
{
    ExecuteError::Driver(Box::new(source))
}
