//! Python syntax trees as a closed, tagged-variant model.
//!
//! Source text is parsed with tree-sitter and lowered into the small set of
//! statement and expression shapes the extractors care about. Everything
//! else is kept as [`Expr::Other`] / [`BlockKind::Other`] with its children,
//! so walkers still see nested calls and assignments.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐   lower.rs    ┌─────────────────────┐
//! │ tree-sitter    │ ────────────▶ │ ParsedModule        │
//! │ concrete tree  │               │  Stmt / Expr enums  │
//! └────────────────┘               └──────────┬──────────┘
//!                                             │
//!                        ┌────────────────────┼───────────────────┐
//!                        ▼                    ▼                   ▼
//!                 ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//!                 │  visit.rs   │     │  render.rs   │     │ extractors  │
//!                 │  walkers    │     │  to_source() │     │ (exhaustive │
//!                 │             │     │              │     │   match)    │
//!                 └─────────────┘     └──────────────┘     └─────────────┘
//! ```
//!
//! A tree containing any error or missing node is rejected as a
//! [`SyntaxError`]; there is no partial recovery.

mod lower;
mod render;
pub mod visit;

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::error::{ApiResult, ApiSurfaceError, IoResultExt};

pub use visit::{walk_block, walk_class_def, walk_expr, walk_function_def, walk_module, walk_stmt, Visit};

/// Syntax failure reported by the parser.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at line {line}, column {column}")]
pub struct SyntaxError {
    pub message: String,
    /// 1-indexed
    pub line: usize,
    /// 1-indexed
    pub column: usize,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

/// A parsed source file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedModule {
    pub body: Vec<Stmt>,
}

impl ParsedModule {
    /// Module docstring, if the first statement is a string literal.
    pub fn docstring(&self) -> Option<&str> {
        docstring(&self.body)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    ClassDef(ClassDef),
    FunctionDef(FunctionDef),
    /// `a = b = value`; chained targets are flattened in source order.
    Assign { targets: Vec<Expr>, value: Expr },
    /// `target: annotation [= value]`
    AnnAssign {
        target: Expr,
        annotation: Expr,
        value: Option<Expr>,
    },
    Import(Vec<ImportAlias>),
    ImportFrom(ImportFrom),
    Expr(Expr),
    /// Compound or simple statement that only matters for what it contains.
    Block(Block),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub name: String,
    /// Positional base expressions; keyword arguments such as `metaclass=` are dropped.
    pub bases: Vec<Expr>,
    pub decorators: Vec<Expr>,
    pub body: Vec<Stmt>,
    pub line: usize,
}

impl ClassDef {
    pub fn docstring(&self) -> Option<&str> {
        docstring(&self.body)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub returns: Option<Expr>,
    pub decorators: Vec<Expr>,
    pub body: Vec<Stmt>,
    pub is_async: bool,
    pub line: usize,
}

impl FunctionDef {
    pub fn docstring(&self) -> Option<&str> {
        docstring(&self.body)
    }

    /// True if decorated with `@overload` or `@<module>.overload`.
    pub fn is_overload(&self) -> bool {
        self.decorators.iter().any(|d| match d {
            Expr::Name(id) => id == "overload",
            Expr::Attribute { attr, .. } => attr == "overload",
            _ => false,
        })
    }

    /// Plain-name decorators (`@property`, `@classmethod`, ...).
    pub fn has_name_decorator(&self, name: &str) -> bool {
        self.decorators
            .iter()
            .any(|d| matches!(d, Expr::Name(id) if id == name))
    }

    /// True for `@<prop>.setter` / `@<prop>.deleter` accessors.
    pub fn is_property_accessor(&self) -> bool {
        self.decorators.iter().any(|d| {
            matches!(d, Expr::Attribute { attr, .. } if attr == "setter" || attr == "deleter")
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    PositionalOnly,
    Regular,
    VarArgs,
    KeywordOnly,
    KwArgs,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
    pub annotation: Option<Expr>,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportAlias {
    /// Dotted module or member name as written.
    pub name: String,
    pub asname: Option<String>,
}

impl ImportAlias {
    /// The name this import binds in the importing module.
    pub fn bound_name(&self) -> &str {
        self.asname.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFrom {
    pub module: Option<String>,
    /// Number of leading dots; 0 for absolute imports.
    pub level: usize,
    pub names: Vec<ImportAlias>,
    pub wildcard: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    If,
    For,
    AsyncFor,
    While,
    With,
    AsyncWith,
    Try,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    /// Header expressions (conditions, iterables, context managers, ...).
    pub exprs: Vec<Expr>,
    /// Statements of every clause, flattened.
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Name(String),
    Attribute { value: Box<Expr>, attr: String },
    /// `value[slice]`; several subscripts are packed into a [`Expr::Tuple`].
    Subscript { value: Box<Expr>, slice: Box<Expr> },
    /// Binary `|`.
    Union { left: Box<Expr>, right: Box<Expr> },
    /// String literal contents without prefix or quotes.
    Str(String),
    /// Numbers, `True`, `False`, `None`, `...`.
    Constant(String),
    Tuple(Vec<Expr>),
    List(Vec<Expr>),
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        line: usize,
    },
    Await(Box<Expr>),
    Other { text: String, children: Vec<Expr> },
}

impl Expr {
    /// `a.b.c` for a chain of attributes ending in a name.
    pub fn dotted_name(&self) -> Option<String> {
        match self {
            Expr::Name(id) => Some(id.clone()),
            Expr::Attribute { value, attr } => {
                value.dotted_name().map(|base| format!("{}.{}", base, attr))
            }
            _ => None,
        }
    }
}

/// Docstring of a body: its first statement, when that is a string literal.
pub fn docstring(body: &[Stmt]) -> Option<&str> {
    match body.first() {
        Some(Stmt::Expr(Expr::Str(s))) => Some(s.as_str()),
        _ => None,
    }
}

/// Parses Python source into a [`ParsedModule`].
pub fn parse_module(source: &str) -> Result<ParsedModule, SyntaxError> {
    lower::parse_module(source)
}

/// Parses a single expression, as used by string forward references.
pub fn parse_expression(source: &str) -> Result<Expr, SyntaxError> {
    let module = lower::parse_module(source.trim())?;
    let mut body = module.body.into_iter();
    match (body.next(), body.next()) {
        (Some(Stmt::Expr(expr)), None) => Ok(expr),
        _ => Err(SyntaxError::new("expected a single expression", 1, 1)),
    }
}

/// Reads and parses a file, mapping failures onto [`ApiSurfaceError`].
pub fn parse_file(path: &Path) -> ApiResult<ParsedModule> {
    let bytes = fs::read(path).with_path(path)?;
    let source = String::from_utf8(bytes).map_err(|e| ApiSurfaceError::encoding(path, e.utf8_error()))?;
    parse_module(&source).map_err(|e| ApiSurfaceError::syntax(path, e))
}
