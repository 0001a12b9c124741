//! Template tree construction
//!
//! This module turns a parsed description into a rooted tree of systems and
//! servers, plus the recorded (but unapplied) aliases and overrides.
//!
//! # Example
//!
//! ```text
//! system "shebang" do
//!   server "geponsole", :image => "ami-f8b35e91"
//!   system "ning", :count => 2 do
//!     server "resolver", :install => ["chef:galaxy"]
//!   end
//! end
//! ```

mod builder;
mod config;
mod tree;

pub use builder::{build, BuildError, NoBody, TemplateBuilder};
pub use config::{BuilderConfig, Scoping};
pub use tree::{
    AliasEntry, Node, OptionValue, Options, OverrideEntry, ServerNode, SystemNode, Template,
};
