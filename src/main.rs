//! Kodegen Release Pipeline - webhook-driven releases with hook-wrapped steps.
//!
//! Logging is controlled through `RUST_LOG` (defaults to `info`).

use kodegen_release_pipeline::cli;
use kodegen_release_pipeline::cli::OutputManager;
use std::process;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match cli::run() {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            let output = OutputManager::new();
            output.error(&format!("Fatal error: {e}"));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                let _ = output.println("\nRecovery suggestions:");
                for suggestion in suggestions {
                    let _ = output.indent(&suggestion);
                }
            }

            process::exit(1);
        }
    }
}
