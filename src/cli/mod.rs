//! Command-line interface for chorus.
//!
//! Provides commands for indexing a choreography against the registry,
//! validating a document offline, and inspecting the resolved
//! configuration.

use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::HttpRegistry;
use crate::config;
use crate::core::Indexer;
use crate::domain::ChoreographySpec;

/// chorus - choreography indexer for a trigger/rule registry
#[derive(Parser, Debug)]
#[command(name = "chorus")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a choreography document against the registry
    Index {
        /// Choreography YAML file (reads from stdin if not provided)
        file: Option<PathBuf>,

        /// Registry base URL (overrides config)
        #[arg(long, env = "CHORUS_BASE_URL")]
        base_url: Option<String>,

        /// Bearer token for the registry (overrides config)
        #[arg(long, env = "CHORUS_TOKEN")]
        token: Option<String>,
    },

    /// Parse and validate a choreography document (no network)
    Validate {
        /// Choreography YAML file (reads from stdin if not provided)
        file: Option<PathBuf>,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the parsed command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Index {
                file,
                base_url,
                token,
            } => index_command(file, base_url, token).await,
            Commands::Validate { file } => validate_command(file),
            Commands::Config => config_command(),
        }
    }
}

/// Read the document from a file or stdin
fn read_document(file: Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read choreography file: {}", path.display())),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read choreography from stdin")?;
            Ok(buffer)
        }
    }
}

async fn index_command(
    file: Option<PathBuf>,
    base_url: Option<String>,
    token: Option<String>,
) -> Result<()> {
    let content = read_document(file)?;

    let cfg = config::config()?;
    let base_url = base_url.unwrap_or_else(|| cfg.base_url.clone());
    let token = token.or_else(|| cfg.token.clone());

    let registry = HttpRegistry::new(base_url, token);
    let indexer = Indexer::new(Arc::new(registry));

    let summary = indexer.index_from_yaml(&content).await?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn validate_command(file: Option<PathBuf>) -> Result<()> {
    let content = read_document(file)?;

    let spec = ChoreographySpec::from_yaml(&content)?;
    spec.validate()?;

    println!(
        "OK: {} trigger(s), {} link(s)",
        spec.triggers.len(),
        spec.links.len()
    );
    Ok(())
}

fn config_command() -> Result<()> {
    let cfg = config::config()?;

    println!("base_url: {}", cfg.base_url);
    println!(
        "token: {}",
        if cfg.token.is_some() { "set" } else { "not set" }
    );
    match &cfg.config_file {
        Some(path) => println!("config_file: {}", path.display()),
        None => println!("config_file: none"),
    }
    Ok(())
}
