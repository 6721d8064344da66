//! Command line interface for the release pipeline.

mod args;
mod output;

pub use args::{Args, Command};
pub use output::OutputManager;

use crate::adapters::Registry;
use crate::config::Config;
use crate::error::Result;
use crate::hooks::TEMPLATE_VARIABLES;
use crate::pipeline::{Pipeline, STEPS};
use std::path::PathBuf;

/// Main CLI entry point
pub fn run() -> Result<i32> {
    execute_command(Args::parse_args())
}

/// Execute a parsed command, returning the process exit code
pub fn execute_command(args: Args) -> Result<i32> {
    let output = OutputManager::new();

    match args.command {
        Command::Start {
            config,
            overrides,
            no_env,
            no_system_config,
        } => {
            let config = build_config(&config, &overrides, no_env, no_system_config)?;
            let mut pipeline = Pipeline::new(config, Registry::with_builtins());
            pipeline.start()?;

            let version = &pipeline.state().release_version;
            let _ = output.success(&format!("Released v{}", version));
            Ok(0)
        }
        Command::Steps => {
            let config = Config::builder().with_system_file()?.with_env()?.build()?;
            let _ = output.section("Pipeline steps");
            for step in STEPS {
                let mut notes = Vec::new();
                if !step.overridable {
                    notes.push("fixed");
                }
                if step.is_disabled(config.settings()) {
                    notes.push("disabled");
                }
                let line = if notes.is_empty() {
                    step.name.to_string()
                } else {
                    format!("{} ({})", step.name, notes.join(", "))
                };
                let _ = output.indent(&line);
            }
            Ok(0)
        }
        Command::Variables => {
            let _ = output.section("Hook template variables");
            for variable in TEMPLATE_VARIABLES {
                let _ = output.indent(&format!("{{{}}}", variable));
            }
            Ok(0)
        }
    }
}

fn build_config(
    files: &[PathBuf],
    overrides: &[String],
    no_env: bool,
    no_system_config: bool,
) -> Result<Config> {
    let mut builder = Config::builder();
    if !no_system_config {
        builder = builder.with_system_file()?;
    }
    for file in files {
        builder = builder.with_file(file)?;
    }
    if !no_env {
        builder = builder.with_env()?;
    }
    builder.with_overrides(overrides)?.build()
}
