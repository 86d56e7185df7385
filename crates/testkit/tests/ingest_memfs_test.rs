use std::collections::BTreeSet;

use sqlcode_core::{Dialect, Document, SourceTree, derive_suffix, read_trees};
use sqlcode_testkit::MemoryTree;

fn ingest(tree: &MemoryTree, dialect: Dialect) -> Document {
    let trees: [&dyn SourceTree; 1] = [tree];
    read_trees(dialect, &trees, &BTreeSet::new()).expect("ingestion must succeed")
}

#[test]
fn merges_creates_across_files() {
    let tree = MemoryTree::new()
        .file("a.sql", "create procedure [code].A as exec [code].B")
        .file("b.sql", "create procedure [code].B as select 1")
        .file("notes.txt", "[code] but wrong extension");

    let document = ingest(&tree, Dialect::Mssql);
    assert!(document.errors.is_empty(), "{:?}", document.errors);
    let names = document
        .creates
        .iter()
        .map(|create| create.quoted_name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["[B]", "[A]"]);
}

#[test]
fn the_derived_suffix_ignores_file_ordering() {
    let first = MemoryTree::new()
        .file("a.sql", "create procedure [code].One as select 1")
        .file("b.sql", "create procedure [code].Two as select 2");
    let second = MemoryTree::new()
        .file("a.sql", "create procedure [code].Two as select 2")
        .file("b.sql", "create procedure [code].One as select 1");

    let suffix_first = derive_suffix(&ingest(&first, Dialect::Mssql));
    let suffix_second = derive_suffix(&ingest(&second, Dialect::Mssql));
    assert_eq!(suffix_first, suffix_second);
}

#[test]
fn cycles_surface_as_document_errors() {
    let tree = MemoryTree::new()
        .file("a.sql", "create procedure [code].A as exec [code].B")
        .file("b.sql", "create procedure [code].B as exec [code].A");

    let document = ingest(&tree, Dialect::Mssql);
    assert_eq!(document.errors.len(), 1);
    assert!(document.errors[0].message.contains("dependency cycle"));
}

#[test]
fn postgres_sources_use_the_pgsql_extension() {
    let tree = MemoryTree::new()
        .file(
            "f.pgsql",
            "create function [code].F() returns int as $$ select 1 $$ language sql;",
        )
        .file("ignored.sql", "create procedure [code].M as select 1");

    let document = ingest(&tree, Dialect::Postgres);
    assert_eq!(document.creates.len(), 1);
    assert_eq!(document.creates[0].quoted_name, "[F]");
    assert_eq!(document.creates[0].dialect, Dialect::Postgres);
}

#[test]
fn multiple_trees_are_walked_in_order() {
    let first = MemoryTree::new().file("a.sql", "create procedure [code].A as select 1");
    let second = MemoryTree::new().file("b.sql", "create procedure [code].B as select 2");

    let trees: [&dyn SourceTree; 2] = [&first, &second];
    let document =
        read_trees(Dialect::Mssql, &trees, &BTreeSet::new()).expect("ingestion must succeed");
    assert_eq!(document.creates.len(), 2);
}

#[test]
fn include_tags_must_be_a_superset_of_the_pragma() {
    let tree = MemoryTree::new().file(
        "t.sql",
        "--sqlcode:include-if fast,debug\ncreate procedure [code].T as select 1",
    );

    let trees: [&dyn SourceTree; 1] = [&tree];
    let partial = BTreeSet::from(["fast".to_string()]);
    let document = read_trees(Dialect::Mssql, &trees, &partial).expect("ingestion must succeed");
    assert!(document.creates.is_empty());

    let full = BTreeSet::from(["fast".to_string(), "debug".to_string(), "extra".to_string()]);
    let document = read_trees(Dialect::Mssql, &trees, &full).expect("ingestion must succeed");
    assert_eq!(document.creates.len(), 1);
}
