use std::sync::{Mutex, PoisonError};

use sqlcode_core::{ExecuteError, Executor, ServerDiagnostic, Session};

/// A scripted [`Executor`] for coordinator tests: every statement is
/// recorded in order, and queries are answered by the first rule whose
/// needle occurs in the statement text. Statements without a matching rule
/// succeed with no rows.
#[derive(Default)]
pub struct ScriptedExecutor {
    state: Mutex<ScriptedState>,
}

#[derive(Default)]
struct ScriptedState {
    log: Vec<String>,
    rules: Vec<Rule>,
}

struct Rule {
    needle: String,
    outcome: Outcome,
}

enum Outcome {
    Rows(Vec<Vec<String>>),
    Fail(Vec<ServerDiagnostic>),
}

impl ScriptedExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Statements containing `needle` answer with `rows`.
    pub fn respond(&self, needle: impl Into<String>, rows: Vec<Vec<String>>) {
        self.state().rules.push(Rule {
            needle: needle.into(),
            outcome: Outcome::Rows(rows),
        });
    }

    /// Statements containing `needle` answer with a single scalar.
    pub fn respond_scalar(&self, needle: impl Into<String>, value: impl Into<String>) {
        self.respond(needle, vec![vec![value.into()]]);
    }

    /// Statements containing `needle` fail with a server error.
    pub fn fail_with(&self, needle: impl Into<String>, diagnostics: Vec<ServerDiagnostic>) {
        self.state().rules.push(Rule {
            needle: needle.into(),
            outcome: Outcome::Fail(diagnostics),
        });
    }

    /// Everything executed so far, in order.
    #[must_use]
    pub fn executed(&self) -> Vec<String> {
        self.state().log.clone()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ScriptedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run(&self, sql: &str) -> Result<Vec<Vec<String>>, ExecuteError> {
        let mut state = self.state();
        state.log.push(sql.to_string());
        for rule in &state.rules {
            if sql.contains(&rule.needle) {
                return match &rule.outcome {
                    Outcome::Rows(rows) => Ok(rows.clone()),
                    Outcome::Fail(diagnostics) => Err(ExecuteError::Server {
                        diagnostics: diagnostics.clone(),
                    }),
                };
            }
        }
        Ok(Vec::new())
    }
}

struct ScriptedSession<'a> {
    owner: &'a ScriptedExecutor,
}

impl Executor for ScriptedExecutor {
    fn exclusive(&self) -> Result<Box<dyn Session + '_>, ExecuteError> {
        Ok(Box::new(ScriptedSession { owner: self }))
    }
}

impl Session for ScriptedSession<'_> {
    fn execute(&mut self, sql: &str) -> Result<(), ExecuteError> {
        self.owner.run(sql).map(|_| ())
    }

    fn query_rows(&mut self, sql: &str) -> Result<Vec<Vec<String>>, ExecuteError> {
        self.owner.run(sql)
    }
}
