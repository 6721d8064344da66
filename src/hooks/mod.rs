//! Hook dispatch around pipeline steps.
//!
//! Hooks are looked up as `hooks.<step>.<phase>`, rendered with
//! [`TemplateContext`] and run in the working copy. Output lines are prefixed with
//! `<step>.<phase>.<index>`.

mod exec;
mod template;

pub use exec::{run_command_list, run_shell};
pub use template::{TEMPLATE_VARIABLES, TemplateContext};

use crate::config::Settings;
use crate::error::Result;
use std::fmt;
use std::path::Path;

/// Position of a hook relative to a step's core action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    /// Before the core action
    Pre,
    /// Instead of the core action
    Override,
    /// After the core action
    Post,
}

impl HookPhase {
    /// Key used in configuration and output prefixes
    pub fn as_str(self) -> &'static str {
        match self {
            HookPhase::Pre => "pre",
            HookPhase::Override => "override",
            HookPhase::Post => "post",
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves and runs the hooks configured in [`Settings`]
#[derive(Debug, Clone, Copy)]
pub struct HookRunner<'a> {
    settings: &'a Settings,
}

impl<'a> HookRunner<'a> {
    /// Runner over the hooks in `settings`
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Command templates for `step` in `phase`, in execution order
    pub fn commands(&self, step: &str, phase: HookPhase) -> &'a [String] {
        match self.settings.step_hooks(step) {
            Some(hooks) => match phase {
                HookPhase::Pre => hooks.pre.as_slice(),
                HookPhase::Override => hooks.override_cmds.as_slice(),
                HookPhase::Post => hooks.post.as_slice(),
            },
            None => &[],
        }
    }

    /// Whether `step` has override commands replacing its core action
    pub fn has_override(&self, step: &str) -> bool {
        !self.commands(step, HookPhase::Override).is_empty()
    }

    /// Render and run every command of `step`/`phase`, stopping at the first failure
    pub fn run(
        &self,
        step: &str,
        phase: HookPhase,
        context: &TemplateContext,
        working_dir: &Path,
    ) -> Result<()> {
        let commands = self.commands(step, phase);
        if commands.is_empty() {
            return Ok(());
        }

        log::info!("{}.{}", step, phase);
        for (index, template) in commands.iter().enumerate() {
            let command = context.render(template);
            run_shell(&command, working_dir, &format!("{}.{}.{}", step, phase, index))?;
        }
        Ok(())
    }
}
