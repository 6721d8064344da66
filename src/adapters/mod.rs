//! Narrow interfaces the pipeline drives, and the registry that builds them.
//!
//! A [`SourceAdapter`] owns the payload, the working copy and publishing; an
//! [`EngineAdapter`] builds, tests and versions the package; a [`ManagerAdapter`]
//! installs dependencies and distributes it. Implementations are created by name
//! through [`Registry`].

mod generic_engine;
mod generic_manager;
mod git_source;
mod host;

pub use generic_engine::GenericEngine;
pub use generic_manager::GenericManager;
pub use git_source::GitSource;
pub use host::{OfflineHost, ReleaseHandle, ReleaseHost, ReleaseRequest};

use crate::config::{CommandList, Config, Settings};
use crate::error::{EngineError, ReleaseError, Result, ScmError};
use crate::hooks::{TemplateContext, run_shell};
use crate::pipeline::{Payload, PipelineState};
use std::collections::HashMap;
use std::fmt;

/// State reported to the source host for a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyState {
    /// A step started
    Pending,
    /// Every step completed
    Success,
    /// A step failed
    Failure,
}

impl NotifyState {
    /// Wire value of the state
    pub fn as_str(self) -> &'static str {
        match self {
            NotifyState::Pending => "pending",
            NotifyState::Success => "success",
            NotifyState::Failure => "failure",
        }
    }
}

impl fmt::Display for NotifyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Package name and version an engine reads or computes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Package name, when the engine knows it
    pub name: Option<String>,
    /// Package version, when the engine knows it
    pub version: Option<semver::Version>,
}

/// Receives commit status updates
pub trait NotificationSink {
    /// Report `state` with `message` against commit `sha`
    fn notify(&mut self, sha: &str, state: NotifyState, message: &str) -> Result<()>;
}

/// Source host integration: payload, working copy, publishing and cleanup
pub trait SourceAdapter: NotificationSink {
    /// Prepare the parent directory the working copy is cloned under
    fn init(&mut self, settings: &Settings, state: &mut PipelineState) -> Result<()>;

    /// Read and validate the event that triggered the run
    fn retrieve_payload(&mut self, settings: &Settings, state: &mut PipelineState)
    -> Result<Payload>;

    /// Clone and check out the pushed branch
    fn checkout_push_payload(
        &mut self,
        settings: &Settings,
        state: &mut PipelineState,
        payload: &Payload,
    ) -> Result<()>;

    /// Clone the base repository and merge the pull request into a local branch
    fn checkout_pull_request_payload(
        &mut self,
        settings: &Settings,
        state: &mut PipelineState,
        payload: &Payload,
    ) -> Result<()>;

    /// Push the release branch and tag, then create the release
    fn publish(&mut self, settings: &Settings, state: &mut PipelineState) -> Result<()>;

    /// Upload the configured release assets to `release`
    fn publish_assets(
        &mut self,
        settings: &Settings,
        state: &PipelineState,
        release: &ReleaseHandle,
    ) -> Result<()>;

    /// Remove host-side leftovers; [`ScmError::CleanupSkipped`] when nothing applies
    fn cleanup(&mut self, settings: &Settings, state: &PipelineState) -> Result<()>;
}

/// Language toolchain integration: versioning, build and test
pub trait EngineAdapter {
    /// Check the executables the engine needs
    fn validate_tools(&mut self, settings: &Settings) -> Result<()>;

    /// Read current metadata and write the bumped version
    fn assemble_step(&mut self, settings: &Settings, state: &mut PipelineState) -> Result<()>;

    /// Install dependencies
    fn dependencies_step(&mut self, settings: &Settings, state: &mut PipelineState) -> Result<()>;

    /// Compile the package
    fn compile_step(&mut self, settings: &Settings, state: &mut PipelineState) -> Result<()>;

    /// Run lint, test and security check commands
    fn test_step(&mut self, settings: &Settings, state: &mut PipelineState) -> Result<()>;

    /// Commit the version bump and tag the release locally
    fn package_step(&mut self, settings: &Settings, state: &mut PipelineState) -> Result<()>;

    /// Distribute the package to its registry
    fn dist_step(&mut self, settings: &Settings, state: &mut PipelineState) -> Result<()>;

    /// Metadata before the version bump
    fn current_metadata(&self) -> Metadata;

    /// Metadata after the version bump
    fn next_metadata(&self) -> Metadata;

    /// Manager used when `mgr_type` is not configured
    fn default_manager(&self) -> &str {
        "generic"
    }
}

/// Dependency manager integration
pub trait ManagerAdapter {
    /// Check the executables the manager needs
    fn validate_tools(&mut self, settings: &Settings) -> Result<()>;

    /// Prepare manager specific files
    fn assemble_step(&mut self, settings: &Settings, state: &mut PipelineState) -> Result<()>;

    /// Install dependencies
    fn dependencies_step(
        &mut self,
        settings: &Settings,
        state: &mut PipelineState,
        current: &Metadata,
        next: &Metadata,
    ) -> Result<()>;

    /// Update manager specific files before the release commit
    fn package_step(
        &mut self,
        settings: &Settings,
        state: &mut PipelineState,
        current: &Metadata,
        next: &Metadata,
    ) -> Result<()>;

    /// Publish the package
    fn dist_step(
        &mut self,
        settings: &Settings,
        state: &mut PipelineState,
        current: &Metadata,
        next: &Metadata,
    ) -> Result<()>;
}

type SourceFactory = Box<dyn Fn(&Config) -> Result<Box<dyn SourceAdapter>>>;
type EngineFactory = Box<dyn Fn(&Config) -> Result<Box<dyn EngineAdapter>>>;
type ManagerFactory = Box<dyn Fn(&Config) -> Result<Box<dyn ManagerAdapter>>>;

/// Constructors for adapters, keyed by type name
pub struct Registry {
    sources: HashMap<String, SourceFactory>,
    engines: HashMap<String, EngineFactory>,
    managers: HashMap<String, ManagerFactory>,
}

impl Registry {
    /// Registry with nothing registered
    pub fn empty() -> Self {
        Self {
            sources: HashMap::new(),
            engines: HashMap::new(),
            managers: HashMap::new(),
        }
    }

    /// Registry with the built-in `git` source, `generic` engine and `generic` manager
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register_source("git", |_| Ok(Box::new(GitSource::new(Box::new(OfflineHost)))));
        registry.register_engine("generic", |_| Ok(Box::new(GenericEngine::new())));
        registry.register_manager("generic", |_| Ok(Box::new(GenericManager)));
        registry
    }

    /// Register (or replace) a source constructor
    pub fn register_source<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&Config) -> Result<Box<dyn SourceAdapter>> + 'static,
    {
        self.sources.insert(name.to_string(), Box::new(factory));
    }

    /// Register (or replace) an engine constructor
    pub fn register_engine<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&Config) -> Result<Box<dyn EngineAdapter>> + 'static,
    {
        self.engines.insert(name.to_string(), Box::new(factory));
    }

    /// Register (or replace) a manager constructor
    pub fn register_manager<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&Config) -> Result<Box<dyn ManagerAdapter>> + 'static,
    {
        self.managers.insert(name.to_string(), Box::new(factory));
    }

    /// Build the source registered as `name`
    pub fn create_source(&self, name: &str, config: &Config) -> Result<Box<dyn SourceAdapter>> {
        let factory = self.sources.get(name).ok_or_else(|| unknown("scm", name))?;
        factory(config)
    }

    /// Build the engine registered as `name`
    pub fn create_engine(&self, name: &str, config: &Config) -> Result<Box<dyn EngineAdapter>> {
        let factory = self.engines.get(name).ok_or_else(|| unknown("engine", name))?;
        factory(config)
    }

    /// Build the manager registered as `name`
    pub fn create_manager(&self, name: &str, config: &Config) -> Result<Box<dyn ManagerAdapter>> {
        let factory = self.managers.get(name).ok_or_else(|| unknown("manager", name))?;
        factory(config)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Run a configured command list in the working copy.
///
/// Commands are rendered with the state's template values; a failing command
/// becomes the engine error built by `wrap`.
pub(crate) fn run_commands(
    commands: &CommandList,
    state: &PipelineState,
    prefix: &str,
    wrap: fn(String) -> EngineError,
) -> Result<()> {
    if commands.is_empty() {
        return Ok(());
    }

    let working_dir = state.require_local_path()?;
    let context = TemplateContext::from_state(state);
    for (index, template) in commands.as_slice().iter().enumerate() {
        let command = context.render(template);
        if let Err(e) = run_shell(&command, working_dir, &format!("{}.{}", prefix, index)) {
            return Err(match e {
                ReleaseError::Hook(hook) => wrap(hook.to_string()).into(),
                other => other,
            });
        }
    }
    Ok(())
}

fn unknown(kind: &'static str, name: &str) -> ScmError {
    ScmError::UnknownAdapter {
        kind,
        name: name.to_string(),
    }
}
