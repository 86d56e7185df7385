use sqlcode_core::{Dialect, Document, derive_suffix, schema_name};

fn parse(sql: &str) -> Document {
    Document::parse(Dialect::Mssql, None, sql.as_bytes())
}

#[test]
fn the_suffix_is_twelve_hex_characters() {
    let document = parse("create procedure [code].P as select 1");
    let suffix = derive_suffix(&document);
    assert_eq!(suffix.len(), 12);
    assert!(suffix.bytes().all(|b| b.is_ascii_hexdigit()));
}

#[test]
fn identical_content_derives_identical_suffixes() {
    let source = "declare @EnumA int = 1;\ngo\ncreate procedure [code].P as select @EnumA";
    assert_eq!(derive_suffix(&parse(source)), derive_suffix(&parse(source)));
}

#[test]
fn source_paths_do_not_affect_the_suffix() {
    use std::sync::Arc;

    use sqlcode_core::SourcePath;

    let source = b"create procedure [code].P as select 1";
    let named = Document::parse(
        Dialect::Mssql,
        Some(Arc::new(SourcePath::new(0, "a/p.sql"))),
        source,
    );
    let unnamed = Document::parse(Dialect::Mssql, None, source);
    assert_eq!(derive_suffix(&named), derive_suffix(&unnamed));
}

#[test]
fn body_changes_change_the_suffix() {
    let before = parse("create procedure [code].P as select 1");
    let after = parse("create procedure [code].P as select 2");
    assert_ne!(derive_suffix(&before), derive_suffix(&after));
}

#[test]
fn declare_changes_change_the_suffix() {
    let before = parse("declare @EnumA int = 1;\ngo\ncreate procedure [code].P as select 1");
    let after = parse("declare @EnumA int = 2;\ngo\ncreate procedure [code].P as select 1");
    assert_ne!(derive_suffix(&before), derive_suffix(&after));
}

#[test]
fn the_target_schema_name_is_prefixed() {
    assert_eq!(schema_name("abc123"), "code@abc123");
}
