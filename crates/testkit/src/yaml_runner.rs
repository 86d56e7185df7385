use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Deserialize;
use sqlcode_core::{Dialect, Document};

/// One parser expectation, loaded from a YAML map of name → case.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParseCase {
    pub sql: String,
    /// Defaults to mssql.
    pub dialect: Option<String>,
    /// Expected create names in document order after the topological sort.
    pub creates: Vec<String>,
    /// Expected canonical declare renderings, in order.
    pub declares: Vec<String>,
    /// Substrings that must each occur in some collected error.
    pub errors: Vec<String>,
    /// Expected dependency lists per create name.
    pub deps: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestResult {
    Passed,
    Failed(String),
}

pub fn load_cases_from_str(yaml: &str) -> Result<BTreeMap<String, ParseCase>, serde_yaml::Error> {
    serde_yaml::from_str(yaml)
}

pub fn run_parse_case(case: &ParseCase) -> TestResult {
    let dialect = match case.dialect.as_deref() {
        None => Dialect::Mssql,
        Some(name) => match Dialect::from_str(name) {
            Ok(dialect) => dialect,
            Err(message) => return TestResult::Failed(message),
        },
    };

    let mut document = Document::parse(dialect, None, case.sql.as_bytes());
    if case.errors.is_empty()
        && let Err(error) = document.sort()
    {
        return TestResult::Failed(format!("sort failed: {error}"));
    }

    let create_names = document
        .creates
        .iter()
        .map(|create| create.quoted_name.clone())
        .collect::<Vec<_>>();
    if !case.creates.is_empty() && create_names != case.creates {
        return TestResult::Failed(format!(
            "creates mismatch: expected {:?}, got {:?}",
            case.creates, create_names
        ));
    }

    let declare_forms = document
        .declares
        .iter()
        .map(sqlcode_core::Declare::canonical)
        .collect::<Vec<_>>();
    if !case.declares.is_empty() && declare_forms != case.declares {
        return TestResult::Failed(format!(
            "declares mismatch: expected {:?}, got {:?}",
            case.declares, declare_forms
        ));
    }

    for expected in &case.errors {
        if !document
            .errors
            .iter()
            .any(|issue| issue.message.contains(expected))
        {
            return TestResult::Failed(format!(
                "expected an error containing {expected:?}, errors were {:?}",
                document
                    .errors
                    .iter()
                    .map(|issue| issue.message.clone())
                    .collect::<Vec<_>>()
            ));
        }
    }
    if case.errors.is_empty() && !document.errors.is_empty() {
        return TestResult::Failed(format!(
            "unexpected errors: {:?}",
            document
                .errors
                .iter()
                .map(|issue| issue.to_string())
                .collect::<Vec<_>>()
        ));
    }

    for (name, expected_deps) in &case.deps {
        let Some(create) = document
            .creates
            .iter()
            .find(|create| &create.quoted_name == name)
        else {
            return TestResult::Failed(format!("no create named {name}"));
        };
        let dep_names = create
            .deps
            .iter()
            .map(|dep| dep.name.clone())
            .collect::<Vec<_>>();
        if &dep_names != expected_deps {
            return TestResult::Failed(format!(
                "deps mismatch for {name}: expected {expected_deps:?}, got {dep_names:?}"
            ));
        }
    }

    TestResult::Passed
}
