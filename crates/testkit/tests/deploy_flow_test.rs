use sqlcode_core::{Deployable, DeployError, Dialect, Document, ServerDiagnostic};
use sqlcode_dialect_mssql::MssqlDialect;
use sqlcode_dialect_postgres::PostgresDialect;
use sqlcode_testkit::ScriptedExecutor;

fn deployable(suffix: &str) -> Deployable {
    let document = Document::parse(
        Dialect::Mssql,
        None,
        b"create procedure [code].P as select 1",
    );
    Deployable::with_suffix(document, suffix).expect("suffix must be valid")
}

fn index_of(log: &[String], needle: &str) -> usize {
    log.iter()
        .position(|statement| statement.contains(needle))
        .unwrap_or_else(|| panic!("no statement containing {needle:?} in {log:#?}"))
}

#[test]
fn ensure_uploaded_runs_the_full_sequence_in_order() {
    let executor = ScriptedExecutor::new();
    executor.respond_scalar("sp_getapplock", "0");
    executor.respond_scalar("sys.schemas", "0");

    let deployable = deployable("abc");
    deployable
        .ensure_uploaded(&MssqlDialect, &executor)
        .expect("upload must succeed");

    let log = executor.executed();
    let lock = index_of(&log, "sp_getapplock");
    let exists = index_of(&log, "sys.schemas");
    let impersonate = index_of(&log, "EXECUTE AS USER");
    let begin = index_of(&log, "BEGIN TRANSACTION");
    let helper = index_of(&log, "[sqlcode].[create_code_schema]");
    let batch = index_of(&log, "[code@abc].P");
    let commit = index_of(&log, "COMMIT TRANSACTION");
    let revert = index_of(&log, "REVERT");
    let release = index_of(&log, "sp_releaseapplock");

    assert!(lock < exists);
    assert!(exists < impersonate);
    assert!(impersonate < begin);
    assert!(begin < helper);
    assert!(helper < batch);
    assert!(batch < commit);
    assert!(commit < revert);
    assert!(revert < release);

    assert!(log.iter().any(|statement| statement
        .contains("sqlcode.EnsureUploaded/abc")));
}

#[test]
fn a_second_ensure_uploaded_is_served_from_the_cache() {
    let executor = ScriptedExecutor::new();
    executor.respond_scalar("sp_getapplock", "0");
    executor.respond_scalar("sys.schemas", "0");

    let deployable = deployable("abc");
    deployable
        .ensure_uploaded(&MssqlDialect, &executor)
        .expect("first upload must succeed");
    let after_first = executor.executed().len();

    deployable
        .ensure_uploaded(&MssqlDialect, &executor)
        .expect("cached call must succeed");
    assert_eq!(executor.executed().len(), after_first);
}

#[test]
fn an_existing_schema_short_circuits_under_the_lock() {
    let executor = ScriptedExecutor::new();
    executor.respond_scalar("sp_getapplock", "0");
    executor.respond_scalar("sys.schemas", "1");

    let deployable = deployable("abc");
    deployable
        .ensure_uploaded(&MssqlDialect, &executor)
        .expect("existing schema is success");

    let log = executor.executed();
    assert!(!log.iter().any(|statement| statement.contains("EXECUTE AS")));
    assert!(!log.iter().any(|statement| statement.contains("BEGIN TRANSACTION")));
    assert!(log.iter().any(|statement| statement.contains("sp_releaseapplock")));
}

#[test]
fn lock_timeouts_are_fatal_and_do_not_release() {
    let executor = ScriptedExecutor::new();
    executor.respond_scalar("sp_getapplock", "-1");

    let deployable = deployable("abc");
    let error = deployable
        .ensure_uploaded(&MssqlDialect, &executor)
        .expect_err("lock timeout must fail");
    assert!(matches!(error, DeployError::LockTimeout { .. }));

    let log = executor.executed();
    assert!(!log.iter().any(|statement| statement.contains("sp_releaseapplock")));
    assert!(!log.iter().any(|statement| statement.contains("EXECUTE AS")));
}

#[test]
fn a_failing_batch_rolls_back_reverts_and_releases() {
    let executor = ScriptedExecutor::new();
    executor.respond_scalar("sp_getapplock", "0");
    executor.respond_scalar("sys.schemas", "0");
    executor.fail_with(
        "[code@abc].P",
        vec![ServerDiagnostic {
            line: 1,
            message: "boom".to_string(),
            procedure: None,
            code: Some(2714),
        }],
    );

    let deployable = deployable("abc");
    let error = deployable
        .ensure_uploaded(&MssqlDialect, &executor)
        .expect_err("failing batch must fail");

    match &error {
        DeployError::Server(failure) => {
            assert_eq!(failure.items.len(), 1);
            assert_eq!(failure.items[0].line, 1);
            assert_eq!(failure.items[0].procedure, "[P]");
            assert_eq!(failure.to_string(), "1 ([P]): boom");
        }
        other => panic!("expected Server failure, got {other:?}"),
    }

    let log = executor.executed();
    let rollback = index_of(&log, "ROLLBACK TRANSACTION");
    let revert = index_of(&log, "REVERT");
    let release = index_of(&log, "sp_releaseapplock");
    assert!(rollback < revert);
    assert!(revert < release);
    assert!(!log.iter().any(|statement| statement.contains("COMMIT")));

    assert!(!deployable.is_uploaded(&executor));
}

#[test]
fn server_lines_map_through_the_correction_table() {
    let source = "declare @ConstMsg varchar(max) = 'a\nb\nc';\n\
                  go\n\
                  create procedure [code].P as\n\
                  print @ConstMsg\n\
                  print 'after'";
    let document = Document::parse(Dialect::Mssql, None, source.as_bytes());
    assert!(document.errors.is_empty(), "{:?}", document.errors);

    let executor = ScriptedExecutor::new();
    executor.respond_scalar("sp_getapplock", "0");
    executor.respond_scalar("sys.schemas", "0");
    // The constant expands line 2 of the batch by two lines, so the server
    // sees 'after' on batch line 5; the source has it on file line 7.
    executor.fail_with(
        "print 'after'",
        vec![ServerDiagnostic {
            line: 5,
            message: "syntax error".to_string(),
            procedure: None,
            code: None,
        }],
    );

    let deployable = Deployable::with_suffix(document, "abc").expect("suffix must be valid");
    let error = deployable
        .ensure_uploaded(&MssqlDialect, &executor)
        .expect_err("failing batch must fail");

    match error {
        DeployError::Server(failure) => assert_eq!(failure.items[0].line, 7),
        other => panic!("expected Server failure, got {other:?}"),
    }
}

#[test]
fn upload_refuses_to_overwrite_an_existing_schema() {
    let executor = ScriptedExecutor::new();
    executor.respond_scalar("sys.schemas", "1");

    let deployable = deployable("abc");
    let error = deployable
        .upload(&MssqlDialect, &executor)
        .expect_err("existing schema must fail single-shot upload");
    assert!(matches!(error, DeployError::SchemaExists { .. }));
}

#[test]
fn drop_and_upload_always_overwrites() {
    let executor = ScriptedExecutor::new();
    executor.respond_scalar("sys.schemas", "1");

    let deployable = deployable("abc");
    deployable
        .drop_and_upload(&MssqlDialect, &executor)
        .expect("overwrite must succeed");

    let log = executor.executed();
    let drop = index_of(&log, "[sqlcode].[drop_code_schema]");
    let create = index_of(&log, "[sqlcode].[create_code_schema]");
    assert!(drop < create);
}

#[test]
fn distinct_executor_handles_are_cached_separately() {
    let first = ScriptedExecutor::new();
    first.respond_scalar("sp_getapplock", "0");
    first.respond_scalar("sys.schemas", "0");
    let second = ScriptedExecutor::new();
    second.respond_scalar("sp_getapplock", "0");
    second.respond_scalar("sys.schemas", "0");

    let deployable = deployable("abc");
    deployable
        .ensure_uploaded(&MssqlDialect, &first)
        .expect("first handle must upload");
    assert!(deployable.is_uploaded(&first));
    assert!(!deployable.is_uploaded(&second));

    deployable
        .ensure_uploaded(&MssqlDialect, &second)
        .expect("second handle must upload");
    assert!(deployable.is_uploaded(&second));
}

#[test]
fn the_postgres_dialect_drives_the_same_sequence() {
    let executor = ScriptedExecutor::new();
    executor.respond_scalar("pg_namespace", "0");

    let document = Document::parse(
        Dialect::Postgres,
        None,
        b"create function [code].F() returns int as $$ select 1 $$ language sql;",
    );
    let deployable = Deployable::with_suffix(document, "abc").expect("suffix must be valid");
    deployable
        .ensure_uploaded(&PostgresDialect, &executor)
        .expect("upload must succeed");

    let log = executor.executed();
    let lock = index_of(&log, "pg_advisory_lock");
    let exists = index_of(&log, "pg_namespace");
    let role = index_of(&log, "SET ROLE");
    let begin = log
        .iter()
        .position(|statement| statement == "BEGIN")
        .expect("BEGIN must run");
    let helper = index_of(&log, "sqlcode.create_code_schema");
    let batch = index_of(&log, "[code@abc].F");
    let commit = index_of(&log, "COMMIT");
    let reset = index_of(&log, "RESET ROLE");
    let release = index_of(&log, "pg_advisory_unlock");

    assert!(lock < exists);
    assert!(exists < role);
    assert!(role < begin);
    assert!(begin < helper);
    assert!(helper < batch);
    assert!(batch < commit);
    assert!(commit < reset);
    assert!(reset < release);
}

#[test]
fn list_uploaded_parses_the_listing_rows() {
    let executor = ScriptedExecutor::new();
    executor.respond(
        "sys.schemas",
        vec![
            vec![
                "code@abc".to_string(),
                "3".to_string(),
                "2024-01-01T00:00:00".to_string(),
                "2024-02-01T00:00:00".to_string(),
            ],
            vec!["code@def".to_string(), "0".to_string(), String::new(), String::new()],
        ],
    );

    let schemas = sqlcode_core::list_uploaded(&MssqlDialect, &executor)
        .expect("listing must succeed");
    assert_eq!(schemas.len(), 2);
    assert_eq!(schemas[0].name, "code@abc");
    assert_eq!(schemas[0].object_count, 3);
    assert_eq!(schemas[1].object_count, 0);
}
