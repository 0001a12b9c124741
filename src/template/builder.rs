//! Cursor-driven construction of the template tree
//!
//! The builder evaluates declarations in order. Each `system` either becomes
//! the root or is appended to the currently open system; each `server` is
//! appended to the currently open system. Which system is "open" is decided
//! by the [`Scoping`] mode.

use thiserror::Error;
use tracing::{debug, trace};

use super::config::{BuilderConfig, Scoping};
use super::tree::{
    AliasEntry, Node, OptionValue, Options, OverrideEntry, ServerNode, SystemNode, Template,
};
use crate::parser::ast::{Document, OptionDecl, Span, Spanned, Statement};

/// Errors that can occur while building the tree from declarations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuildError {
    /// A declaration that needs a parent appeared with no system open
    #[error("{kind} '{name}' declared with no open system")]
    NoOpenSystem {
        kind: &'static str,
        name: String,
        span: Option<Span>,
    },

    /// The description declares no system at all
    #[error("malformed description: no root system declared")]
    MissingRoot,

    /// A second top-level system
    #[error("system '{name}' declared at top level, but '{root}' is already the root")]
    MultipleRoots {
        name: String,
        root: String,
        span: Option<Span>,
    },

    /// A well-known option with the wrong type
    #[error("option '{key}' of '{node}' must be {expected}, found {found}")]
    InvalidOption {
        node: String,
        key: String,
        expected: &'static str,
        found: String,
        span: Option<Span>,
    },

    #[error("{kind} declared with an empty name")]
    EmptyName {
        kind: &'static str,
        span: Option<Span>,
    },
}

impl BuildError {
    fn invalid_option(
        node: &str,
        key: &str,
        expected: &'static str,
        found: &OptionValue,
    ) -> Self {
        Self::InvalidOption {
            node: node.to_string(),
            key: key.to_string(),
            expected,
            found: format!("{} {}", found.kind(), found),
            span: None,
        }
    }

    /// Get the source span if available
    pub fn span(&self) -> Option<&Span> {
        match self {
            Self::NoOpenSystem { span, .. }
            | Self::MultipleRoots { span, .. }
            | Self::InvalidOption { span, .. }
            | Self::EmptyName { span, .. } => span.as_ref(),
            Self::MissingRoot => None,
        }
    }

    /// Attach a span unless a more precise one is already set
    fn or_span(mut self, at: &Span) -> Self {
        if let Self::NoOpenSystem { span, .. }
        | Self::MultipleRoots { span, .. }
        | Self::InvalidOption { span, .. }
        | Self::EmptyName { span, .. } = &mut self
        {
            if span.is_none() {
                *span = Some(at.clone());
            }
        }
        self
    }
}

/// Body of a `system` declaration with nothing nested
pub type NoBody = fn(&mut TemplateBuilder) -> Result<(), BuildError>;

/// Builds one [`Template`] from a sequence of declarations.
///
/// The cursor is a stack of child-index paths from the root, one entry per
/// open system. It only lives as long as the builder.
#[derive(Debug, Default)]
pub struct TemplateBuilder {
    config: BuilderConfig,
    root: Option<SystemNode>,
    cursor: Vec<Vec<usize>>,
    aliases: Vec<AliasEntry>,
    overrides: Vec<OverrideEntry>,
}

impl TemplateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: BuilderConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Declare a system. It becomes the root when nothing is open, otherwise
    /// the last child of the open system. The cursor moves to the new system
    /// before `body` runs, so declarations made by `body` attach to it.
    pub fn system<F>(
        &mut self,
        name: impl Into<String>,
        options: Options,
        body: Option<F>,
    ) -> Result<(), BuildError>
    where
        F: FnOnce(&mut Self) -> Result<(), BuildError>,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(BuildError::EmptyName {
                kind: "system",
                span: None,
            });
        }
        expect_count(&name, &options)?;

        let path = match self.cursor.last().cloned() {
            Some(parent_path) => {
                let Some(parent) = self.system_at_mut(&parent_path) else {
                    return Err(BuildError::NoOpenSystem {
                        kind: "system",
                        name,
                        span: None,
                    });
                };
                debug!(system = %name, parent = %parent.name, "attaching system");
                parent
                    .children
                    .push(Node::System(SystemNode::with_options(name, options)));
                let index = parent.children.len() - 1;

                let mut path = parent_path;
                path.push(index);
                path
            }
            None => {
                if let Some(root) = &self.root {
                    return Err(BuildError::MultipleRoots {
                        name,
                        root: root.name.clone(),
                        span: None,
                    });
                }
                debug!(system = %name, "root system");
                self.root = Some(SystemNode::with_options(name, options));
                Vec::new()
            }
        };

        match self.config.scoping {
            Scoping::Lexical => match body {
                Some(body) => {
                    self.cursor.push(path);
                    let result = body(self);
                    self.cursor.pop();
                    result
                }
                None => Ok(()),
            },
            Scoping::Sticky => {
                self.cursor.clear();
                self.cursor.push(path);
                body.map_or(Ok(()), |body| body(self))
            }
        }
    }

    /// Declare a system with no nested declarations
    pub fn leaf_system(&mut self, name: impl Into<String>, options: Options) -> Result<(), BuildError> {
        self.system::<NoBody>(name, options, None)
    }

    /// Declare a server in the open system. `image` and `install` are also
    /// copied into typed fields; the options are kept verbatim.
    pub fn server(&mut self, name: impl Into<String>, options: Options) -> Result<(), BuildError> {
        let name = name.into();
        if name.is_empty() {
            return Err(BuildError::EmptyName {
                kind: "server",
                span: None,
            });
        }
        let Some(path) = self.cursor.last().cloned() else {
            return Err(BuildError::NoOpenSystem {
                kind: "server",
                name,
                span: None,
            });
        };

        let image = match options.get("image") {
            None => None,
            Some(OptionValue::String(image)) => Some(image.clone()),
            Some(other) => {
                return Err(BuildError::invalid_option(&name, "image", "a string", other))
            }
        };
        let install = match options.get("install") {
            None => Vec::new(),
            Some(value) => value.as_string_list().ok_or_else(|| {
                BuildError::invalid_option(&name, "install", "a list of strings", value)
            })?,
        };
        if let Some(value) = options.get("requires") {
            if value.as_string_list().is_none() {
                return Err(BuildError::invalid_option(
                    &name,
                    "requires",
                    "a list of strings",
                    value,
                ));
            }
        }
        expect_count(&name, &options)?;

        let Some(parent) = self.system_at_mut(&path) else {
            return Err(BuildError::NoOpenSystem {
                kind: "server",
                name,
                span: None,
            });
        };
        debug!(server = %name, parent = %parent.name, "attaching server");
        parent.children.push(Node::Server(ServerNode {
            name,
            image,
            install,
            options,
        }));
        Ok(())
    }

    /// Record an alias. Aliases are not applied to the tree.
    pub fn aka(&mut self, from: impl Into<String>, to: impl Into<String>) {
        let entry = AliasEntry {
            from: from.into(),
            to: to.into(),
        };
        trace!(from = %entry.from, to = %entry.to, "recorded alias");
        self.aliases.push(entry);
    }

    /// Record an override. Overrides are not applied to the tree.
    pub fn r#override(&mut self, path: impl Into<String>, value: impl Into<OptionValue>) {
        let entry = OverrideEntry {
            path: path.into(),
            value: value.into(),
        };
        trace!(path = %entry.path, value = %entry.value, "recorded override");
        self.overrides.push(entry);
    }

    /// The system declarations currently attach to
    pub fn current(&self) -> Option<&SystemNode> {
        let path = self.cursor.last()?;
        let mut node = self.root.as_ref()?;
        for &index in path {
            node = node.children.get(index)?.as_system()?;
        }
        Some(node)
    }

    /// Evaluate parsed statements in order
    pub fn evaluate(&mut self, statements: &[Spanned<Statement>]) -> Result<(), BuildError> {
        for statement in statements {
            let span = &statement.span;
            match &statement.node {
                Statement::System(decl) => {
                    let body = decl
                        .body
                        .as_deref()
                        .map(|body| move |builder: &mut Self| builder.evaluate(body));
                    self.system(decl.name.node.clone(), collect_options(&decl.options), body)
                        .map_err(|e| e.or_span(span))?;
                }
                Statement::Server(decl) => {
                    self.server(decl.name.node.clone(), collect_options(&decl.options))
                        .map_err(|e| e.or_span(span))?;
                }
                Statement::Aka(decl) => self.aka(decl.from.node.clone(), decl.to.node.clone()),
                Statement::Override(decl) => {
                    self.r#override(decl.path.node.clone(), decl.value.node.clone())
                }
            }
        }
        Ok(())
    }

    /// Hand back the finished template
    pub fn finish(self) -> Result<Template, BuildError> {
        let root = self.root.ok_or(BuildError::MissingRoot)?;
        Ok(Template {
            root,
            aliases: self.aliases,
            overrides: self.overrides,
        })
    }

    fn system_at_mut(&mut self, path: &[usize]) -> Option<&mut SystemNode> {
        let mut node = self.root.as_mut()?;
        for &index in path {
            node = match node.children.get_mut(index)? {
                Node::System(system) => system,
                Node::Server(_) => return None,
            };
        }
        Some(node)
    }
}

/// Build a template from a parsed document
pub fn build(document: &Document, config: &BuilderConfig) -> Result<Template, BuildError> {
    let mut builder = TemplateBuilder::with_config(config.clone());
    builder.evaluate(&document.statements)?;
    let template = builder.finish()?;
    debug!(
        root = %template.root.name,
        aliases = template.aliases.len(),
        overrides = template.overrides.len(),
        "template built"
    );
    Ok(template)
}

fn collect_options(decls: &[OptionDecl]) -> Options {
    decls
        .iter()
        .map(|o| (o.key.node.clone(), o.value.node.clone()))
        .collect()
}

fn expect_count(node: &str, options: &Options) -> Result<(), BuildError> {
    match options.get("count") {
        Some(value) if value.as_integer().is_none() => Err(BuildError::invalid_option(
            node,
            "count",
            "an integer",
            value,
        )),
        _ => Ok(()),
    }
}
