//! The loaded topology: systems, servers and the alias/override side tables

use std::fmt;

pub use crate::parser::ast::OptionValue;

/// Ordered option bag. Keys keep the order they were first declared in;
/// inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    entries: Vec<(String, OptionValue)>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the previous one for this key if any
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Option<OptionValue> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<OptionValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Integer value of the `count` option, if present and an integer
    pub fn count(&self) -> Option<i64> {
        self.get("count").and_then(OptionValue::as_integer)
    }
}

impl<K: Into<String>, V: Into<OptionValue>> FromIterator<(K, V)> for Options {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut options = Options::new();
        for (key, value) in iter {
            options.insert(key, value);
        }
        options
    }
}

/// A named grouping of servers and nested systems
#[derive(Debug, Clone, PartialEq)]
pub struct SystemNode {
    pub name: String,
    pub children: Vec<Node>,
    pub options: Options,
}

impl SystemNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_options(name, Options::new())
    }

    pub fn with_options(name: impl Into<String>, options: Options) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            options,
        }
    }

    /// Append a child node (builder style)
    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn count(&self) -> Option<i64> {
        self.options.count()
    }

    /// The unresolved `external` template reference, if declared
    pub fn external(&self) -> Option<&str> {
        self.options.get("external").and_then(OptionValue::as_str)
    }

    pub fn systems(&self) -> impl Iterator<Item = &SystemNode> {
        self.children.iter().filter_map(Node::as_system)
    }

    pub fn servers(&self) -> impl Iterator<Item = &ServerNode> {
        self.children.iter().filter_map(Node::as_server)
    }

    /// Find a descendant by a slash-separated path of names relative to this
    /// node, e.g. `"ning/aclu/appcore"`. The first matching child wins.
    pub fn find(&self, path: &str) -> Option<&Node> {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let first = segments.next()?;
        let mut node = self.children.iter().find(|c| c.name() == first)?;
        for segment in segments {
            node = node
                .as_system()?
                .children
                .iter()
                .find(|c| c.name() == segment)?;
        }
        Some(node)
    }

    fn write_outline(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{}system {:?}", "  ".repeat(depth), self.name)?;
        write_options(f, &self.options)?;
        writeln!(f)?;
        for child in &self.children {
            match child {
                Node::System(system) => system.write_outline(f, depth + 1)?,
                Node::Server(server) => server.write_outline(f, depth + 1)?,
            }
        }
        Ok(())
    }
}

/// Indented outline, one node per line
impl fmt::Display for SystemNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_outline(f, 0)
    }
}

/// A deployable unit: an image plus the packages installed on it
#[derive(Debug, Clone, PartialEq)]
pub struct ServerNode {
    pub name: String,
    pub image: Option<String>,
    pub install: Vec<String>,
    /// Every declared option, `image` and `install` included
    pub options: Options,
}

impl ServerNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: None,
            install: Vec::new(),
            options: Options::new(),
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        let image = image.into();
        self.options.insert("image", image.as_str());
        self.image = Some(image);
        self
    }

    pub fn with_install<S: Into<String>>(mut self, items: impl IntoIterator<Item = S>) -> Self {
        self.install.extend(items.into_iter().map(Into::into));
        let list = self.install.iter().map(|i| OptionValue::from(i.as_str())).collect();
        self.options.insert("install", OptionValue::List(list));
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.options.insert(key, value);
        self
    }

    pub fn count(&self) -> Option<i64> {
        self.options.count()
    }

    /// Environment properties every instance of this server needs
    pub fn requires(&self) -> Vec<String> {
        self.options
            .get("requires")
            .and_then(OptionValue::as_string_list)
            .unwrap_or_default()
    }

    fn write_outline(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{}server {:?}", "  ".repeat(depth), self.name)?;
        write_options(f, &self.options)?;
        writeln!(f)
    }
}

impl fmt::Display for ServerNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_outline(f, 0)
    }
}

fn write_options(f: &mut fmt::Formatter<'_>, options: &Options) -> fmt::Result {
    for (key, value) in options.iter() {
        write!(f, " {}={}", key, value)?;
    }
    Ok(())
}

/// A child of a system
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    System(SystemNode),
    Server(ServerNode),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::System(s) => &s.name,
            Node::Server(s) => &s.name,
        }
    }

    pub fn options(&self) -> &Options {
        match self {
            Node::System(s) => &s.options,
            Node::Server(s) => &s.options,
        }
    }

    pub fn count(&self) -> Option<i64> {
        self.options().count()
    }

    pub fn as_system(&self) -> Option<&SystemNode> {
        match self {
            Node::System(s) => Some(s),
            Node::Server(_) => None,
        }
    }

    pub fn as_server(&self) -> Option<&ServerNode> {
        match self {
            Node::Server(s) => Some(s),
            Node::System(_) => None,
        }
    }
}

impl From<SystemNode> for Node {
    fn from(node: SystemNode) -> Self {
        Node::System(node)
    }
}

impl From<ServerNode> for Node {
    fn from(node: ServerNode) -> Self {
        Node::Server(node)
    }
}

/// `aka "from", "to"`: recorded, not applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    pub from: String,
    pub to: String,
}

/// `override "path", value`: recorded, not applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideEntry {
    pub path: String,
    pub value: OptionValue,
}

/// Result of loading one description
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub root: SystemNode,
    pub aliases: Vec<AliasEntry>,
    pub overrides: Vec<OverrideEntry>,
}

impl Template {
    pub fn into_root(self) -> SystemNode {
        self.root
    }
}
