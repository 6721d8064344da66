//! Manager that runs configured dependency and distribution commands.

use super::{ManagerAdapter, Metadata, run_commands};
use crate::config::Settings;
use crate::error::{EngineError, Result};
use crate::pipeline::PipelineState;

/// Manager registered as `generic`
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericManager;

impl ManagerAdapter for GenericManager {
    fn validate_tools(&mut self, _settings: &Settings) -> Result<()> {
        Ok(())
    }

    fn assemble_step(&mut self, _settings: &Settings, _state: &mut PipelineState) -> Result<()> {
        Ok(())
    }

    fn dependencies_step(
        &mut self,
        settings: &Settings,
        state: &mut PipelineState,
        _current: &Metadata,
        _next: &Metadata,
    ) -> Result<()> {
        run_commands(&settings.mgr_cmd_dependencies, state, "mgr_dependencies", |reason| {
            EngineError::BuildFailed { reason }
        })
    }

    fn package_step(
        &mut self,
        _settings: &Settings,
        _state: &mut PipelineState,
        _current: &Metadata,
        _next: &Metadata,
    ) -> Result<()> {
        Ok(())
    }

    fn dist_step(
        &mut self,
        settings: &Settings,
        state: &mut PipelineState,
        _current: &Metadata,
        next: &Metadata,
    ) -> Result<()> {
        if let Some(version) = &next.version {
            log::info!("Distributing version {}", version);
        }
        run_commands(&settings.mgr_cmd_dist, state, "mgr_dist", |reason| {
            EngineError::DistPackage { reason }
        })
    }
}
