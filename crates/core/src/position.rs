use std::{fmt, sync::Arc};

/// A source file as seen by the ingestor: which tree it came from plus its
/// path relative to that tree's root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourcePath {
    pub tree: usize,
    pub path: String,
}

impl SourcePath {
    pub fn new(tree: usize, path: impl Into<String>) -> Self {
        Self {
            tree,
            path: path.into(),
        }
    }
}

impl fmt::Display for SourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Position of a token or node. Line and column are 1-indexed; the column is
/// measured in bytes from the byte following the preceding newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pos {
    pub file: Option<Arc<SourcePath>>,
    pub line: u32,
    pub col: u32,
}

impl Pos {
    pub fn new(file: Option<Arc<SourcePath>>, line: u32, col: u32) -> Self {
        Self { file, line, col }
    }

    pub fn unnamed(line: u32, col: u32) -> Self {
        Self {
            file: None,
            line,
            col,
        }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}:{}", file, self.line, self.col),
            None => write!(f, "{}:{}", self.line, self.col),
        }
    }
}
