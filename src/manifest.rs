//! Expansion of a template tree into concrete server instances
//!
//! Every node carries a cardinality: the environment's value for its path,
//! else its `count` option, else 1. A system with cardinality `n` has its
//! whole subtree repeated `n` times, so counts multiply down the tree. The
//! root is never repeated.
//!
//! Servers may list the environment properties they need with
//! `:requires => [...]`; [`Manifest::validate`] reports the instances that
//! lack them.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::environment::Environment;
use crate::template::{Node, ServerNode, SystemNode};

/// Upper bound on the number of instances one manifest may hold
pub const MAX_INSTANCES: usize = 1_000_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("expanding '{path}' would create more than {limit} instances")]
    TooManyInstances { path: String, limit: usize },
}

/// One server to provision
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    /// Slash-joined path from the root, e.g. `/shebang/ning/resolver`
    pub name: String,
    /// Position among the instances sharing `name`, starting at 0
    pub ordinal: usize,
    pub server: ServerNode,
    pub properties: BTreeMap<String, String>,
}

impl Instance {
    /// Problems with this instance: required properties the environment
    /// does not provide
    pub fn validate(&self) -> Vec<String> {
        self.server
            .requires()
            .into_iter()
            .filter(|key| !self.properties.contains_key(key))
            .map(|key| format!("required property '{}' missing", key))
            .collect()
    }
}

/// Ordered list of instances, in depth-first declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    instances: Vec<Instance>,
}

impl Manifest {
    /// Expand `root` using the cardinalities and properties of `env`
    ///
    /// Fails without allocating anything when the expansion would exceed
    /// [`MAX_INSTANCES`].
    pub fn build(root: &SystemNode, env: &Environment) -> Result<Self, ManifestError> {
        let mut expander = Expander {
            env,
            names: vec![root.name.clone()],
            ordinals: HashMap::new(),
            instances: Vec::new(),
        };
        let total = expander.size(root)?;
        expander.instances.reserve(total);
        expander.expand(root)?;
        debug!(
            root = %root.name,
            instances = expander.instances.len(),
            "manifest built"
        );
        Ok(Self {
            instances: expander.instances,
        })
    }

    /// Instances with problems, in manifest order
    pub fn validate(&self) -> Vec<&Instance> {
        self.instances
            .iter()
            .filter(|i| !i.validate().is_empty())
            .collect()
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instance> {
        self.instances.iter()
    }

    /// All instances at one path
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Instance> + 'a {
        self.instances.iter().filter(move |i| i.name == name)
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instance in &self.instances {
            write!(f, "{}#{}", instance.name, instance.ordinal)?;
            if let Some(image) = &instance.server.image {
                write!(f, " {}", image)?;
            }
            if !instance.server.install.is_empty() {
                write!(f, " [{}]", instance.server.install.join(", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

struct Expander<'e> {
    env: &'e Environment,
    names: Vec<String>,
    ordinals: HashMap<String, usize>,
    instances: Vec<Instance>,
}

impl Expander<'_> {
    fn path(&self) -> String {
        self.names.iter().map(|n| format!("/{}", n)).collect()
    }

    fn copies(&self, child: &Node) -> (String, usize) {
        let path = self.path();
        let copies = self.env.cardinality_for(&path, child.count().unwrap_or(1));
        (path, copies)
    }

    /// Number of instances one copy of `system`'s children expands to
    fn size(&mut self, system: &SystemNode) -> Result<usize, ManifestError> {
        let mut total = 0usize;
        for child in &system.children {
            self.names.push(child.name().to_string());
            let (path, copies) = self.copies(child);
            let each = match child {
                Node::System(nested) => self.size(nested)?,
                Node::Server(_) => 1,
            };
            total = copies
                .checked_mul(each)
                .and_then(|n| total.checked_add(n))
                .filter(|n| *n <= MAX_INSTANCES)
                .ok_or(ManifestError::TooManyInstances {
                    path,
                    limit: MAX_INSTANCES,
                })?;
            self.names.pop();
        }
        Ok(total)
    }

    fn expand(&mut self, system: &SystemNode) -> Result<(), ManifestError> {
        for child in &system.children {
            self.names.push(child.name().to_string());
            let (path, copies) = self.copies(child);

            match child {
                Node::System(nested) => {
                    // Repeating a subtree with no servers adds nothing
                    if self.size(nested)? > 0 {
                        for _ in 0..copies {
                            self.expand(nested)?;
                        }
                    }
                }
                Node::Server(server) => {
                    for _ in 0..copies {
                        let ordinal = self.ordinals.entry(path.clone()).or_insert(0);
                        self.instances.push(Instance {
                            name: path.clone(),
                            ordinal: *ordinal,
                            server: server.clone(),
                            properties: self.env.properties_for(&path),
                        });
                        *ordinal += 1;
                    }
                }
            }

            self.names.pop();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{OptionValue, Options};

    fn counted(count: i64) -> Options {
        [("count", count)].into_iter().collect()
    }

    fn sample() -> SystemNode {
        SystemNode::new("shebang")
            .child(ServerNode::new("geponsole").with_image("ami-1"))
            .child(
                SystemNode::with_options("aclu", counted(2))
                    .child(ServerNode::new("appcore").with_option("count", 3i64)),
            )
    }

    #[test]
    fn test_counts_multiply() {
        let manifest = Manifest::build(&sample(), &Environment::default()).expect("Should expand");
        assert_eq!(manifest.len(), 7);
        assert_eq!(manifest.named("/shebang/geponsole").count(), 1);
        assert_eq!(manifest.named("/shebang/aclu/appcore").count(), 6);
    }

    #[test]
    fn test_ordinals_are_per_name() {
        let manifest = Manifest::build(&sample(), &Environment::default()).expect("Should expand");
        let ordinals: Vec<_> = manifest
            .named("/shebang/aclu/appcore")
            .map(|i| i.ordinal)
            .collect();
        assert_eq!(ordinals, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(manifest.instances()[0].ordinal, 0);
    }

    #[test]
    fn test_environment_overrides_cardinality() {
        let env = Environment::from_str(
            r#"
[cardinality]
"/shebang/aclu" = 1
"/shebang/geponsole" = 0
"#,
        )
        .expect("Should parse");
        let manifest = Manifest::build(&sample(), &env).expect("Should expand");
        assert_eq!(manifest.named("/shebang/geponsole").count(), 0);
        assert_eq!(manifest.named("/shebang/aclu/appcore").count(), 3);
    }

    #[test]
    fn test_root_count_is_ignored() {
        let root = SystemNode::with_options("root", counted(5)).child(ServerNode::new("web"));
        let manifest = Manifest::build(&root, &Environment::default()).expect("Should expand");
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.instances()[0].name, "/root/web");
    }

    #[test]
    fn test_properties_attached() {
        let env = Environment::from_str(
            r#"
[properties."/shebang/geponsole"]
region = "us-east-1"
"#,
        )
        .expect("Should parse");
        let manifest = Manifest::build(&sample(), &env).expect("Should expand");
        let gepo = manifest.named("/shebang/geponsole").next().expect("geponsole");
        assert_eq!(gepo.properties.get("region").map(String::as_str), Some("us-east-1"));
        let app = manifest.named("/shebang/aclu/appcore").next().expect("appcore");
        assert!(app.properties.is_empty());
    }

    #[test]
    fn test_empty_root() {
        let manifest = Manifest::build(&SystemNode::new("empty"), &Environment::default())
            .expect("Should expand");
        assert!(manifest.is_empty());
        assert_eq!(manifest.to_string(), "");
    }

    #[test]
    fn test_oversized_count_is_rejected() {
        let root = SystemNode::new("r").child(ServerNode::new("web").with_option("count", i64::MAX));
        let err = Manifest::build(&root, &Environment::default()).unwrap_err();
        assert_eq!(
            err,
            ManifestError::TooManyInstances {
                path: "/r/web".to_string(),
                limit: MAX_INSTANCES,
            }
        );
    }

    #[test]
    fn test_nested_counts_overflow() {
        let root = SystemNode::new("r").child(
            SystemNode::with_options("outer", counted(1 << 40)).child(
                SystemNode::with_options("inner", counted(1 << 40))
                    .child(ServerNode::new("web")),
            ),
        );
        let err = Manifest::build(&root, &Environment::default()).unwrap_err();
        assert!(matches!(err, ManifestError::TooManyInstances { .. }));
    }

    #[test]
    fn test_huge_empty_system_expands_to_nothing() {
        let root = SystemNode::new("r")
            .child(SystemNode::with_options("e", counted(i64::MAX)))
            .child(ServerNode::new("web"));
        let manifest = Manifest::build(&root, &Environment::default()).expect("Should expand");
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.instances()[0].name, "/r/web");
    }

    #[test]
    fn test_environment_cardinality_is_bounded() {
        let env = Environment::from_str(
            r#"
[cardinality]
"/shebang/geponsole" = 2_000_000
"#,
        )
        .expect("Should parse");
        assert!(Manifest::build(&sample(), &env).is_err());
    }

    #[test]
    fn test_validate_required_properties() {
        let root = SystemNode::new("r")
            .child(ServerNode::new("db").with_option(
                "requires",
                OptionValue::List(vec!["password".into(), "region".into()]),
            ))
            .child(ServerNode::new("web"));
        let env = Environment::from_str(
            r#"
[properties."/r/db"]
region = "us-east-1"
"#,
        )
        .expect("Should parse");
        let manifest = Manifest::build(&root, &env).expect("Should expand");

        let bad = manifest.validate();
        assert_eq!(bad.len(), 1);
        assert_eq!(bad[0].name, "/r/db");
        assert_eq!(bad[0].validate(), vec!["required property 'password' missing"]);
    }

    #[test]
    fn test_validate_passes_when_properties_present() {
        let root = SystemNode::new("r").child(
            ServerNode::new("db").with_option("requires", OptionValue::List(vec!["region".into()])),
        );
        let env = Environment::from_str(
            r#"
[properties."/r/db"]
region = "us-east-1"
"#,
        )
        .expect("Should parse");
        let manifest = Manifest::build(&root, &env).expect("Should expand");
        assert!(manifest.validate().is_empty());
    }

    #[test]
    fn test_display() {
        let root = SystemNode::new("r").child(
            ServerNode::new("web")
                .with_image("ami-1")
                .with_install(["chef:web-1.0", "chef:tls"])
                .with_option("count", 2i64),
        );
        let manifest = Manifest::build(&root, &Environment::default()).expect("Should expand");
        assert_eq!(
            manifest.to_string(),
            "/r/web#0 ami-1 [chef:web-1.0, chef:tls]\n/r/web#1 ami-1 [chef:web-1.0, chef:tls]\n"
        );
    }
}
