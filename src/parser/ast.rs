//! Abstract Syntax Tree types for the system template language

use std::fmt;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Root AST node - a complete template description
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub statements: Vec<Spanned<Statement>>,
}

/// A single declaration
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `system "name", :key => value do ... end`
    System(SystemDecl),
    /// `server "name", :key => value`
    Server(ServerDecl),
    /// `aka "from", "to"`
    Aka(AkaDecl),
    /// `override "path", value`
    Override(OverrideDecl),
}

/// One `key => value` pair from a declaration's argument list
#[derive(Debug, Clone, PartialEq)]
pub struct OptionDecl {
    pub key: Spanned<String>,
    pub value: Spanned<OptionValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemDecl {
    pub name: Spanned<String>,
    pub options: Vec<OptionDecl>,
    /// Nested declarations; `None` when no `do ... end` block follows
    pub body: Option<Vec<Spanned<Statement>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerDecl {
    pub name: Spanned<String>,
    pub options: Vec<OptionDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AkaDecl {
    pub from: Spanned<String>,
    pub to: Spanned<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverrideDecl {
    pub path: Spanned<String>,
    pub value: Spanned<OptionValue>,
}

/// A literal option value. Types are preserved exactly as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    /// `:name`
    Symbol(String),
    List(Vec<OptionValue>),
}

impl OptionValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            OptionValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the items if this is a list made only of strings
    pub fn as_string_list(&self) -> Option<Vec<String>> {
        match self {
            OptionValue::List(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => None,
        }
    }

    /// Short type name used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            OptionValue::String(_) => "string",
            OptionValue::Integer(_) => "integer",
            OptionValue::Boolean(_) => "boolean",
            OptionValue::Symbol(_) => "symbol",
            OptionValue::List(_) => "list",
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::String(s) => write!(f, "{:?}", s),
            OptionValue::Integer(n) => write!(f, "{}", n),
            OptionValue::Boolean(b) => write!(f, "{}", b),
            OptionValue::Symbol(s) => write!(f, ":{}", s),
            OptionValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::String(s.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(s: String) -> Self {
        OptionValue::String(s)
    }
}

impl From<i64> for OptionValue {
    fn from(n: i64) -> Self {
        OptionValue::Integer(n)
    }
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self {
        OptionValue::Boolean(b)
    }
}
