use std::sync::LazyLock;

use regex::{NoExpand, Regex};

static VIRTUAL_SCHEMA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\[code\]").unwrap());

/// Rewrites every case-insensitive `[code]` occurrence in an arbitrary SQL
/// string to `[code@<suffix>]`.
///
/// Purely textual: strings and comments are not recognized. This is the
/// runtime companion to the preprocessor for queries an application builds
/// on the fly, and it is idempotent because the replacement no longer
/// matches the pattern.
#[must_use]
pub fn patch(sql: &str, suffix: &str) -> String {
    let replacement = format!("[code@{suffix}]");
    VIRTUAL_SCHEMA
        .replace_all(sql, NoExpand(&replacement))
        .into_owned()
}
