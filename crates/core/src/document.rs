use std::{collections::BTreeSet, fmt, sync::Arc};

use crate::{Dialect, Issue, Pos, ResolveError, SourcePath, Token, ordering, parse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateKind {
    Procedure,
    Function,
    Type,
}

impl fmt::Display for CreateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreateKind::Procedure => f.write_str("procedure"),
            CreateKind::Function => f.write_str("function"),
            CreateKind::Type => f.write_str("type"),
        }
    }
}

/// A `[code].name` reference found in a routine body, with the position of
/// the referenced name for resolver diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRef {
    pub name: String,
    pub pos: Pos,
}

/// One routine definition. The body tokens re-emit the original source
/// region byte for byte; the name is stored bracket-quoted for uniform
/// comparison regardless of how it was quoted in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Create {
    pub kind: CreateKind,
    pub quoted_name: String,
    pub body: Vec<Token>,
    pub deps: Vec<DependencyRef>,
    pub docstring: Vec<Token>,
    pub yaml: String,
    pub dialect: Dialect,
}

impl Create {
    #[must_use]
    pub fn start(&self) -> Pos {
        self.body
            .first()
            .map(|token| token.start.clone())
            .unwrap_or_else(|| Pos::unnamed(1, 1))
    }

    #[must_use]
    pub fn body_text(&self) -> String {
        self.body.iter().map(|token| token.raw.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeArg {
    Number(String),
    Max,
}

impl fmt::Display for TypeArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeArg::Number(value) => f.write_str(value),
            TypeArg::Max => f.write_str("max"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclareType {
    pub base: String,
    pub args: Vec<TypeArg>,
}

impl fmt::Display for DeclareType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)?;
        if self.args.is_empty() {
            return Ok(());
        }
        f.write_str("(")?;
        for (index, arg) in self.args.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")
    }
}

/// A first-batch constant declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declare {
    pub name: String,
    pub ty: DeclareType,
    pub literal: Option<Token>,
    pub start: Pos,
    pub stop: Pos,
}

impl Declare {
    /// Stable single-line rendering used for suffix hashing and by the
    /// `constants` command.
    #[must_use]
    pub fn canonical(&self) -> String {
        match &self.literal {
            Some(literal) => format!("declare {} {} = {};", self.name, self.ty, literal.raw),
            None => format!("declare {} {};", self.name, self.ty),
        }
    }
}

/// True for names the parser accepts in a declare statement: the constant
/// prefixes plus the `@Global` family.
#[must_use]
pub fn is_declare_name(name: &str) -> bool {
    is_constant_name(name) || has_prefix(name, "@global")
}

/// True for names the preprocessor will inline. Deliberately narrower than
/// [`is_declare_name`]: the `@Global` family is declarable but not inlined,
/// and referencing one reports "constant not declared".
#[must_use]
pub fn is_constant_name(name: &str) -> bool {
    has_prefix(name, "@enum") || has_prefix(name, "@const")
}

/// True for names that look like constants from the preprocessor's point of
/// view: anything declarable. References with these prefixes must resolve to
/// an inlinable declaration or fail.
#[must_use]
pub fn is_constant_reference(name: &str) -> bool {
    is_declare_name(name)
}

fn has_prefix(name: &str, prefix: &str) -> bool {
    name.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// True for the virtual-schema literal `[code]`, matched case-insensitively
/// on the identifier inside the brackets.
#[must_use]
pub fn is_virtual_schema(text: &str) -> bool {
    text.strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .is_some_and(|inner| inner.eq_ignore_ascii_case("code"))
}

/// The parsed content of one or more source files of a single dialect.
///
/// Parser and resolver problems accumulate in `errors`; they never abort
/// parsing, so best-effort results stay inspectable.
#[derive(Debug, Clone)]
pub struct Document {
    pub dialect: Dialect,
    pub creates: Vec<Create>,
    pub declares: Vec<Declare>,
    pub errors: Vec<Issue>,
    pub include_if: Vec<String>,
}

impl Document {
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            creates: Vec::new(),
            declares: Vec::new(),
            errors: Vec::new(),
            include_if: Vec::new(),
        }
    }

    /// Parses one source buffer into a fresh document.
    #[must_use]
    pub fn parse(dialect: Dialect, file: Option<Arc<SourcePath>>, input: &[u8]) -> Self {
        parse::parse_source(dialect, file, input)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.declares.is_empty() && self.errors.is_empty()
    }

    /// True when every `include-if` tag of this document is present in
    /// `tags`. A document without pragmas is always included.
    #[must_use]
    pub fn included_by(&self, tags: &BTreeSet<String>) -> bool {
        self.include_if.iter().all(|tag| tags.contains(tag))
    }

    /// Folds another parsed file into this document.
    pub fn merge(&mut self, other: Document) {
        self.creates.extend(other.creates);
        self.declares.extend(other.declares);
        self.errors.extend(other.errors);
        for tag in other.include_if {
            if !self.include_if.contains(&tag) {
                self.include_if.push(tag);
            }
        }
    }

    /// Reorders `creates` so every dependency precedes its dependents. On
    /// failure the current order is kept and the error is returned.
    pub fn sort(&mut self) -> Result<(), ResolveError> {
        ordering::sort_creates(&mut self.creates)
    }
}
