use sqlcode_core::patch;

#[test]
fn replaces_every_occurrence_case_insensitively() {
    let patched = patch("select * from [code].A join [CODE].B on [Code].f() = 1", "abc");
    assert_eq!(
        patched,
        "select * from [code@abc].A join [code@abc].B on [code@abc].f() = 1"
    );
}

#[test]
fn leaves_other_identifiers_alone() {
    assert_eq!(patch("select * from [codex].A", "abc"), "select * from [codex].A");
    assert_eq!(patch("select '[code' from t", "abc"), "select '[code' from t");
}

#[test]
fn is_idempotent() {
    let once = patch("exec [code].P", "abc");
    assert_eq!(patch(&once, "abc"), once);
}

#[test]
fn rewrites_inside_strings_and_comments_by_design() {
    assert_eq!(
        patch("select '[code].P' -- [code].Q", "s"),
        "select '[code@s].P' -- [code@s].Q"
    );
}

#[test]
fn suffixes_with_dollar_signs_are_literal() {
    assert_eq!(patch("[code].P", "a$1"), "[code@a$1].P");
}
