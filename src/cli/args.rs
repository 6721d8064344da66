//! Command line argument parsing.
//!
//! Everything the pipeline needs comes from configuration layers; the command
//! line only points at files and adds `key=value` overrides on top.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Webhook-driven release pipeline
#[derive(Parser, Debug)]
#[command(
    name = "kodegen_release_pipeline",
    version,
    about = "Webhook-driven release pipeline",
    long_about = "Clone the repository named by the triggering event, run the release steps
with their configured hooks, then push the release commit and tag.

Configuration is merged from ~/.kodegen/release.toml, --config files, the
repository's .kodegen-release.toml, KODEGEN_RELEASE_* environment variables and
--set overrides, in that order."
)]
pub struct Args {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the release pipeline
    Start {
        /// Additional configuration file, applied after the system file
        #[arg(short, long, value_name = "FILE")]
        config: Vec<PathBuf>,

        /// Override a setting, e.g. `--set engine_disable_test=true`
        #[arg(short = 's', long = "set", value_name = "KEY=VALUE", value_parser = parse_override)]
        overrides: Vec<String>,

        /// Ignore KODEGEN_RELEASE_* environment variables
        #[arg(long)]
        no_env: bool,

        /// Ignore ~/.kodegen/release.toml
        #[arg(long)]
        no_system_config: bool,
    },

    /// List the pipeline steps in execution order
    Steps,

    /// List the variables available to hook commands
    Variables,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

fn parse_override(raw: &str) -> anyhow::Result<String> {
    let Some((key, _)) = raw.split_once('=') else {
        anyhow::bail!("expected KEY=VALUE, got '{}'", raw);
    };
    if key.trim().is_empty() {
        anyhow::bail!("override '{}' has an empty key", raw);
    }
    Ok(raw.to_string())
}
