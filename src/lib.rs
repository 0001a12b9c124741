//! Atlas Template - a loader for declarative system topology descriptions
//!
//! This library parses the template language and builds a rooted tree of
//! systems and servers, plus the aliases and overrides the description
//! declares.
//!
//! # Example
//!
//! ```rust
//! use atlas_template::load;
//!
//! let template = load(r#"
//!     system "shebang" do
//!         server "geponsole", :image => "ami-f8b35e91"
//!     end
//! "#, "example.atl").unwrap();
//!
//! assert_eq!(template.root.name, "shebang");
//! assert_eq!(template.root.children.len(), 1);
//! ```

pub mod environment;
pub mod error;
pub mod manifest;
pub mod parser;
pub mod template;

use std::path::Path;

pub use environment::{Environment, EnvironmentError};
pub use error::ParseError;
pub use manifest::{Instance, Manifest, ManifestError, MAX_INSTANCES};
pub use parser::{parse, Document, MAX_NESTING};
pub use template::{
    AliasEntry, BuildError, BuilderConfig, Node, OptionValue, Options, OverrideEntry, Scoping,
    ServerNode, SystemNode, Template, TemplateBuilder,
};

use thiserror::Error;

/// Errors that can occur while loading a description
#[derive(Debug, Error)]
pub enum LoadError {
    /// The text is not valid template language
    #[error("malformed description {source_id}: {}", format_parse_errors(.errors))]
    Malformed {
        source_id: String,
        errors: Vec<ParseError>,
    },

    /// The declarations parsed but do not form a valid tree
    #[error("{source_id}: {error}")]
    Build {
        source_id: String,
        #[source]
        error: BuildError,
    },

    /// The description file could not be read
    #[error("cannot read {source_id}: {error}")]
    Io {
        source_id: String,
        #[source]
        error: std::io::Error,
    },
}

fn format_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl LoadError {
    /// True for syntax errors and for descriptions with no root system
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            LoadError::Malformed { .. }
                | LoadError::Build {
                    error: BuildError::MissingRoot,
                    ..
                }
        )
    }

    /// Render the error against its source text using ariadne
    pub fn report(&self, source: &str) -> String {
        match self {
            LoadError::Malformed { source_id, errors } => errors
                .iter()
                .map(|e| e.format(source, source_id))
                .collect::<Vec<_>>()
                .join("\n"),
            LoadError::Build { source_id, error } => match error.span() {
                Some(span) => {
                    error::report(source, source_id, span, &error.to_string(), &error.to_string())
                }
                None => self.to_string(),
            },
            LoadError::Io { .. } => self.to_string(),
        }
    }
}

/// Load a description with default configuration
///
/// `source_id` only labels error messages.
pub fn load(source: &str, source_id: &str) -> Result<Template, LoadError> {
    load_with_config(source, source_id, &BuilderConfig::default())
}

/// Load a description with custom configuration
///
/// # Example
///
/// ```rust
/// use atlas_template::{load_with_config, BuilderConfig, Node, Scoping};
///
/// let source = r#"
///     system "outer" do
///         system "inner" do
///         end
///         server "web"
///     end
/// "#;
///
/// let config = BuilderConfig::new().with_scoping(Scoping::Sticky);
/// let template = load_with_config(source, "legacy.atl", &config).unwrap();
///
/// // The legacy cursor never leaves "inner"
/// let inner = template.root.systems().next().unwrap();
/// assert_eq!(inner.children.iter().map(Node::name).collect::<Vec<_>>(), vec!["web"]);
/// ```
pub fn load_with_config(
    source: &str,
    source_id: &str,
    config: &BuilderConfig,
) -> Result<Template, LoadError> {
    // Parse the source
    let document = parse(source).map_err(|errors| LoadError::Malformed {
        source_id: source_id.to_string(),
        errors,
    })?;

    // Evaluate declarations into the tree
    template::build(&document, config).map_err(|error| LoadError::Build {
        source_id: source_id.to_string(),
        error,
    })
}

/// Read and load a description file
pub fn load_file(path: &Path, config: &BuilderConfig) -> Result<Template, LoadError> {
    let source_id = path.display().to_string();
    let source = std::fs::read_to_string(path).map_err(|error| LoadError::Io {
        source_id: source_id.clone(),
        error,
    })?;
    load_with_config(&source, &source_id, config)
}
