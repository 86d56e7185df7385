use std::{fmt, str::FromStr};

/// The SQL dialects understood by the pipeline.
///
/// A [`crate::Document`] is parsed for exactly one dialect; the dialect
/// selects the scanner's quoting rules, the source-file extension, the parser
/// recovery set, and the batch restrictions the target server imposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Mssql,
    Postgres,
}

impl Dialect {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Mssql => "mssql",
            Dialect::Postgres => "postgres",
        }
    }

    /// File extensions (without the dot) ingested for this dialect.
    #[must_use]
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Dialect::Mssql => &["sql"],
            Dialect::Postgres => &["pgsql"],
        }
    }

    /// Reserved words that can begin a top-level statement; the parser skips
    /// to one of these (or a batch separator) when recovering from an error.
    pub(crate) fn statement_starts(self) -> &'static [&'static str] {
        match self {
            Dialect::Mssql => &["create", "declare"],
            Dialect::Postgres => &["create"],
        }
    }

    /// SQL Server refuses CREATE PROCEDURE/FUNCTION unless it is the only
    /// statement in its batch; Postgres has no such restriction.
    pub(crate) fn routine_alone_in_batch(self) -> bool {
        match self {
            Dialect::Mssql => true,
            Dialect::Postgres => false,
        }
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mssql" | "sqlserver" => Ok(Dialect::Mssql),
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            _ => Err(format!(
                "unrecognized driver: {s}. Valid options: mssql, postgres"
            )),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
