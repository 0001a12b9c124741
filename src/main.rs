//! Atlas Template CLI
//!
//! Usage:
//!   atlas-template [OPTIONS] [FILE]
//!
//! Options:
//!   -e, --environment <FILE>  Environment file for cardinality and properties (TOML format)
//!   -m, --manifest            Print the expanded instance list instead of the tree
//!   --legacy-cursor           Attach declarations to the most recent system (legacy behavior)
//!   -v, --verbose             Log builder decisions to stderr
//!   -h, --help                Print help

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use atlas_template::{load_with_config, BuilderConfig, Environment, Manifest, Scoping};

#[derive(Parser)]
#[command(name = "atlas-template")]
#[command(about = "Load a system topology description and print its tree")]
struct Cli {
    /// Input file (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Environment file for cardinality and properties (TOML format)
    #[arg(short, long)]
    environment: Option<PathBuf>,

    /// Print the expanded instance list instead of the tree
    #[arg(short, long)]
    manifest: bool,

    /// Keep the cursor on the most recently declared system after its block closes
    #[arg(long)]
    legacy_cursor: bool,

    /// Log builder decisions to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    // Load environment
    let environment = match &cli.environment {
        Some(path) => match Environment::from_file(path) {
            Ok(env) => env,
            Err(e) => {
                eprintln!("Error loading environment '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => Environment::default(),
    };

    // Read input
    let (source, source_id) = match &cli.input {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => (content, path.display().to_string()),
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => (buffer, "<stdin>".to_string()),
                Err(e) => {
                    eprintln!("Error reading from stdin: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    let scoping = if cli.legacy_cursor {
        Scoping::Sticky
    } else {
        Scoping::Lexical
    };
    let config = BuilderConfig::new().with_scoping(scoping);

    match load_with_config(&source, &source_id, &config) {
        Ok(template) => {
            if cli.manifest {
                let manifest = match Manifest::build(&template.root, &environment) {
                    Ok(manifest) => manifest,
                    Err(e) => {
                        eprintln!("Error expanding '{}': {}", source_id, e);
                        std::process::exit(1);
                    }
                };
                print!("{}", manifest);
                let invalid = manifest.validate();
                for instance in &invalid {
                    for problem in instance.validate() {
                        eprintln!("{}#{}: {}", instance.name, instance.ordinal, problem);
                    }
                }
                if !invalid.is_empty() {
                    std::process::exit(1);
                }
            } else {
                print!("{}", template.root);
                for alias in &template.aliases {
                    println!("aka {:?} {:?}", alias.from, alias.to);
                }
                for entry in &template.overrides {
                    println!("override {:?} {}", entry.path, entry.value);
                }
            }
        }
        Err(e) => {
            eprintln!("{}", e.report(&source));
            std::process::exit(1);
        }
    }
}
