//! Engine for packages that keep their version in a plain text file.

use super::{EngineAdapter, Metadata, run_commands};
use crate::config::Settings;
use crate::error::{EngineError, Result};
use crate::git;
use crate::pipeline::PipelineState;
use crate::version::{read_version_file, write_version_file};
use std::path::Path;

/// Engine registered as `generic`
#[derive(Debug, Default)]
pub struct GenericEngine {
    current: Metadata,
    next: Metadata,
}

impl GenericEngine {
    /// Engine with no metadata read yet
    pub fn new() -> Self {
        Self::default()
    }
}

fn metadata_path(settings: &Settings, local_path: &Path) -> std::path::PathBuf {
    local_path.join(&settings.engine_version_metadata_path)
}

impl EngineAdapter for GenericEngine {
    fn validate_tools(&mut self, settings: &Settings) -> Result<()> {
        for tool in &settings.engine_required_tools {
            let found = which::which(tool).map_err(|e| EngineError::ToolValidation {
                tool: tool.clone(),
                reason: e.to_string(),
            })?;
            log::debug!("{} found at {}", tool, found.display());
        }
        Ok(())
    }

    fn assemble_step(&mut self, settings: &Settings, state: &mut PipelineState) -> Result<()> {
        let local_path = state.require_local_path()?;
        let path = metadata_path(settings, local_path);
        if !path.is_file() {
            return Err(EngineError::BuildInvalid {
                reason: format!(
                    "version file ({}) is required for metadata storage via generic engine",
                    settings.engine_version_metadata_path
                ),
            }
            .into());
        }

        let current = read_version_file(&path)?;
        let next = settings.engine_version_bump_type.bump(&current);
        write_version_file(&path, &next)?;
        log::info!("Version bumped from {} to {}", current, next);

        let name = state.head.as_ref().map(|head| head.repo.name.clone());
        self.current = Metadata {
            name: name.clone(),
            version: Some(current),
        };
        self.next = Metadata {
            name,
            version: Some(next.clone()),
        };
        state.release_version = next.to_string();
        Ok(())
    }

    fn dependencies_step(&mut self, _settings: &Settings, _state: &mut PipelineState) -> Result<()> {
        Ok(())
    }

    fn compile_step(&mut self, settings: &Settings, state: &mut PipelineState) -> Result<()> {
        run_commands(&settings.engine_cmd_compile, state, "compile", |reason| {
            EngineError::BuildFailed { reason }
        })
    }

    fn test_step(&mut self, settings: &Settings, state: &mut PipelineState) -> Result<()> {
        if !settings.engine_disable_lint {
            run_commands(&settings.engine_cmd_lint, state, "lint", |reason| {
                EngineError::TestFailed { reason }
            })?;
        }

        run_commands(&settings.engine_cmd_test, state, "test", |reason| {
            EngineError::TestFailed { reason }
        })?;

        if !settings.engine_disable_security_check {
            run_commands(
                &settings.engine_cmd_security_check,
                state,
                "security_check",
                |reason| EngineError::TestFailed { reason },
            )?;
        }
        Ok(())
    }

    fn package_step(&mut self, settings: &Settings, state: &mut PipelineState) -> Result<()> {
        let local_path = state.require_local_path()?.to_path_buf();
        let next = self
            .next
            .version
            .clone()
            .ok_or_else(|| EngineError::BuildInvalid {
                reason: "package step ran before the version was bumped".to_string(),
            })?;

        let message = format!("(v{}) {}", next, settings.engine_version_bump_msg);
        git::commit(&local_path, &message)?;
        let release_commit = git::tag(&local_path, &format!("v{}", next), &message)?;

        state.release_commit = release_commit;
        state.release_version = next.to_string();
        Ok(())
    }

    fn dist_step(&mut self, _settings: &Settings, _state: &mut PipelineState) -> Result<()> {
        log::info!("generic engine has no registry to distribute to");
        Ok(())
    }

    fn current_metadata(&self) -> Metadata {
        self.current.clone()
    }

    fn next_metadata(&self) -> Metadata {
        self.next.clone()
    }
}
