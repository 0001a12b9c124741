//! Configuration for template building

/// How the builder decides which system a declaration attaches to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scoping {
    /// Declarations attach to the innermost enclosing `do ... end` body.
    /// Leaving a body restores the previous parent.
    #[default]
    Lexical,
    /// Declarations attach to the most recently declared system, whether or
    /// not its body has closed. This is the legacy evaluator behavior:
    /// siblings following a nested block end up inside that block.
    Sticky,
}

/// Configuration options for the template builder
#[derive(Debug, Clone, Default)]
pub struct BuilderConfig {
    pub scoping: Scoping,
}

impl BuilderConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scoping mode
    pub fn with_scoping(mut self, scoping: Scoping) -> Self {
        self.scoping = scoping;
        self
    }
}
