//! Fixed, ordered step table.

use super::Pipeline;
use crate::config::Settings;
use crate::error::Result;

/// One entry of the step table
#[derive(Clone, Copy)]
pub struct StepDescriptor {
    /// Step name; also the hook key under `[hooks.<name>]`
    pub name: &'static str,
    /// Whether the step is wrapped in hooks and notifications
    pub overridable: bool,
    /// Returns true when configuration disables the step
    pub disabled: Option<fn(&Settings) -> bool>,
    /// Core action
    pub action: fn(&mut Pipeline) -> Result<()>,
}

impl StepDescriptor {
    /// Whether `settings` disable this step
    pub fn is_disabled(&self, settings: &Settings) -> bool {
        self.disabled.is_some_and(|disabled| disabled(settings))
    }
}

impl std::fmt::Debug for StepDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepDescriptor")
            .field("name", &self.name)
            .field("overridable", &self.overridable)
            .field("disableable", &self.disabled.is_some())
            .finish()
    }
}

const fn step(name: &'static str, action: fn(&mut Pipeline) -> Result<()>) -> StepDescriptor {
    StepDescriptor {
        name,
        overridable: true,
        disabled: None,
        action,
    }
}

const fn fixed(name: &'static str, action: fn(&mut Pipeline) -> Result<()>) -> StepDescriptor {
    StepDescriptor {
        name,
        overridable: false,
        disabled: None,
        action,
    }
}

const fn toggled(
    name: &'static str,
    disabled: fn(&Settings) -> bool,
    action: fn(&mut Pipeline) -> Result<()>,
) -> StepDescriptor {
    StepDescriptor {
        name,
        overridable: true,
        disabled: Some(disabled),
        action,
    }
}

/// Every step in execution order
pub const STEPS: &[StepDescriptor] = &[
    fixed("init", Pipeline::init_step),
    fixed("retrieve_payload", Pipeline::retrieve_payload_step),
    fixed("checkout", Pipeline::checkout_step),
    step("parse_config", Pipeline::parse_config_step),
    step("mgr_init", Pipeline::mgr_init_step),
    step("validate_tools", Pipeline::validate_tools_step),
    step("mgr_validate_tools", Pipeline::mgr_validate_tools_step),
    step("assemble", Pipeline::assemble_step),
    step("dependencies", Pipeline::dependencies_step),
    toggled(
        "compile",
        |s| s.engine_disable_compile,
        Pipeline::compile_step,
    ),
    toggled("test", |s| s.engine_disable_test, Pipeline::test_step),
    step("package", Pipeline::package_step),
    toggled("dist", |s| s.engine_disable_dist, Pipeline::dist_step),
    toggled(
        "scm_publish",
        |s| s.scm_disable_publish,
        Pipeline::scm_publish_step,
    ),
    toggled(
        "scm_cleanup",
        |s| s.scm_disable_cleanup,
        Pipeline::scm_cleanup_step,
    ),
];

/// Step named `name`
pub fn find_step(name: &str) -> Option<&'static StepDescriptor> {
    STEPS.iter().find(|step| step.name == name)
}
