use std::{
    collections::{BTreeMap, BTreeSet},
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, LazyLock},
};

use regex::bytes::Regex;
use sha2::{Digest, Sha256};

use crate::{Dialect, Document, IngestError, Issue, SourcePath};

/// A file is a sqlcode source if it starts with a pragma marker or mentions
/// the virtual schema anywhere. The sniff runs on raw bytes before parsing;
/// parse errors never make a file disappear from ingestion.
static SOURCE_SNIFF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A--sqlcode:|\[code\]").unwrap());

/// A virtual tree of source files. Implementations return relative paths in
/// sorted order so ingestion is deterministic.
pub trait SourceTree {
    fn list(&self) -> io::Result<Vec<String>>;
    fn read(&self, path: &str) -> io::Result<Vec<u8>>;
}

/// [`SourceTree`] over a directory on disk.
#[derive(Debug, Clone)]
pub struct DirTree {
    root: PathBuf,
}

impl DirTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SourceTree for DirTree {
    fn list(&self) -> io::Result<Vec<String>> {
        let mut paths = Vec::new();
        walk(&self.root, "", &mut paths)?;
        paths.sort();
        Ok(paths)
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        fs::read(self.root.join(path))
    }
}

fn walk(dir: &Path, prefix: &str, out: &mut Vec<String>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let relative = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        if entry.file_type()?.is_dir() {
            walk(&entry.path(), &relative, out)?;
        } else {
            out.push(relative);
        }
    }
    Ok(())
}

/// Walks the given trees in order and parses every matching source file into
/// one merged document of the given dialect.
///
/// Hidden paths are skipped, extensions outside the dialect's set are
/// skipped, files failing the content sniff are silently skipped, and two
/// files with identical bytes in one invocation are a hard error. A file
/// whose `include-if` tags are not all present in `include_tags` parses but
/// does not merge. After ingestion the creates are topologically sorted;
/// sort failures are recorded as document errors, not returned.
pub fn read_trees(
    dialect: Dialect,
    trees: &[&dyn SourceTree],
    include_tags: &BTreeSet<String>,
) -> Result<Document, IngestError> {
    let mut document = Document::new(dialect);
    let mut seen = BTreeMap::<[u8; 32], String>::new();

    for (tree_index, tree) in trees.iter().enumerate() {
        let paths = tree.list().map_err(|source| IngestError::Read {
            path: format!("tree #{tree_index}"),
            source,
        })?;

        for path in paths {
            if is_hidden(&path) || !has_extension(&path, dialect.extensions()) {
                continue;
            }
            let contents = tree.read(&path).map_err(|source| IngestError::Read {
                path: path.clone(),
                source,
            })?;
            if !SOURCE_SNIFF.is_match(&contents) {
                continue;
            }

            let digest: [u8; 32] = Sha256::digest(&contents).into();
            if let Some(earlier) = seen.get(&digest) {
                return Err(IngestError::Duplicate {
                    path,
                    earlier: earlier.clone(),
                });
            }
            seen.insert(digest, path.clone());

            let file = Arc::new(SourcePath::new(tree_index, path));
            let parsed = Document::parse(dialect, Some(file), &contents);
            if parsed.included_by(include_tags) {
                document.merge(parsed);
            }
        }
    }

    if let Err(error) = document.sort() {
        let issue = Issue::new(error.pos().clone(), error.to_string());
        document.errors.push(issue);
    }
    Ok(document)
}

fn is_hidden(path: &str) -> bool {
    path.split('/')
        .any(|component| component.starts_with('.'))
}

fn has_extension(path: &str, extensions: &[&str]) -> bool {
    Path::new(path)
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            extensions
                .iter()
                .any(|supported| supported.eq_ignore_ascii_case(extension))
        })
}
