use std::{collections::BTreeSet, fs, path::Path};

use sqlcode_core::{Dialect, DirTree, IngestError, SourceTree, read_trees};

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(path, contents).expect("write fixture file");
}

fn ingest(root: &Path) -> sqlcode_core::Document {
    ingest_with_tags(root, &BTreeSet::new())
}

fn ingest_with_tags(root: &Path, tags: &BTreeSet<String>) -> sqlcode_core::Document {
    let tree = DirTree::new(root);
    let trees: [&dyn SourceTree; 1] = [&tree];
    read_trees(Dialect::Mssql, &trees, tags).expect("ingestion must succeed")
}

#[test]
fn only_files_with_sqlcode_markers_are_picked_up() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "a.sql", "select * from t");
    write(dir.path(), "b.sql", "create procedure [code].B as select 1");

    let document = ingest(dir.path());
    assert_eq!(document.creates.len(), 1);
    assert_eq!(document.creates[0].quoted_name, "[B]");
}

#[test]
fn hidden_paths_are_ignored() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(
        dir.path(),
        ".hidden/c.sql",
        "create procedure [code].C as select 1",
    );
    write(
        dir.path(),
        ".ignored.sql",
        "create procedure [code].D as select 1",
    );

    let document = ingest(dir.path());
    assert!(document.creates.is_empty());
}

#[test]
fn unsupported_extensions_are_ignored() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "a.txt", "create procedure [code].A as select 1");
    write(dir.path(), "b.pgsql", "create function [code].B() as $$x$$;");

    let document = ingest(dir.path());
    assert!(document.creates.is_empty());
}

#[test]
fn duplicate_file_contents_are_a_hard_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let body = "create procedure [code].Dup as select 1";
    write(dir.path(), "a.sql", body);
    write(dir.path(), "sub/b.sql", body);

    let tree = DirTree::new(dir.path());
    let trees: [&dyn SourceTree; 1] = [&tree];
    let error = read_trees(Dialect::Mssql, &trees, &BTreeSet::new())
        .expect_err("duplicate content must fail");
    match error {
        IngestError::Duplicate { path, earlier } => {
            assert_eq!(earlier, "a.sql");
            assert_eq!(path, "sub/b.sql");
        }
        other => panic!("expected Duplicate, got {other:?}"),
    }
}

#[test]
fn files_merge_and_sort_topologically() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(
        dir.path(),
        "a.sql",
        "create procedure [code].A as exec [code].B",
    );
    write(
        dir.path(),
        "b.sql",
        "create procedure [code].B as select 1",
    );

    let document = ingest(dir.path());
    assert!(document.errors.is_empty(), "{:?}", document.errors);
    let names = document
        .creates
        .iter()
        .map(|create| create.quoted_name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["[B]", "[A]"]);
}

#[test]
fn resolver_problems_become_document_errors_not_io_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(
        dir.path(),
        "a.sql",
        "create procedure [code].A as exec [code].Nope",
    );

    let document = ingest(dir.path());
    assert_eq!(document.errors.len(), 1);
    assert!(document.errors[0].message.contains("not defined"));
}

#[test]
fn include_if_tags_gate_file_inclusion() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(
        dir.path(),
        "tagged.sql",
        "--sqlcode:include-if debug\ncreate procedure [code].T as select 1",
    );

    let without = ingest(dir.path());
    assert!(without.creates.is_empty());

    let tags = BTreeSet::from(["debug".to_string()]);
    let with = ingest_with_tags(dir.path(), &tags);
    assert_eq!(with.creates.len(), 1);
}

#[test]
fn a_declare_only_file_needs_a_pragma_to_be_sniffed() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "bare.sql", "declare @EnumX int = 3");
    write(
        dir.path(),
        "marked.sql",
        "--sqlcode:include-if all\ndeclare @EnumY int = 4",
    );

    let tags = BTreeSet::from(["all".to_string()]);
    let document = ingest_with_tags(dir.path(), &tags);
    let names = document
        .declares
        .iter()
        .map(|declare| declare.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["@EnumY"]);
}

#[test]
fn source_positions_carry_the_file_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "bad.sql", "create procedure dbo.P as select 1 [code]");

    let document = ingest(dir.path());
    assert_eq!(document.errors.len(), 1);
    let rendered = document.errors[0].to_string();
    assert!(rendered.starts_with("bad.sql:1:18:"), "{rendered}");
}
