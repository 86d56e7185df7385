mod fake;
mod memfs;
mod yaml_runner;

pub use fake::ScriptedExecutor;
pub use memfs::MemoryTree;
pub use yaml_runner::{ParseCase, TestResult, load_cases_from_str, run_parse_case};
