//! Release pipeline orchestration.
//!
//! A [`Pipeline`] walks the fixed step table in [`steps::STEPS`]. Every step past
//! `checkout` reports a `pending` status, runs its `pre` hooks, then either its
//! `override` hooks or its core action, then its `post` hooks. The first failure
//! is reported as `failure` and aborts the run. The directory holding the working
//! copy is removed exactly once, whichever way the run ends.

mod state;
pub mod steps;

pub use state::{CommitRef, Payload, PipelineState, ReleaseAsset, RepoInfo};
pub use steps::{STEPS, StepDescriptor, find_step};

use crate::adapters::{EngineAdapter, ManagerAdapter, NotifyState, Registry, SourceAdapter};
use crate::config::Config;
use crate::error::{EngineError, Result, ScmError};
use crate::hooks::{HookPhase, HookRunner, TemplateContext};

const SUCCESS_MESSAGE: &str = "Pull-request was successfully merged, new release created.";

/// One release run over a single working copy
pub struct Pipeline {
    config: Config,
    registry: Registry,
    state: PipelineState,
    source: Option<Box<dyn SourceAdapter>>,
    engine: Option<Box<dyn EngineAdapter>>,
    manager: Option<Box<dyn ManagerAdapter>>,
    payload: Option<Payload>,
}

fn require<'a, T: ?Sized>(slot: &'a mut Option<Box<T>>, role: &str) -> Result<&'a mut T> {
    slot.as_deref_mut().ok_or_else(|| {
        EngineError::BuildInvalid {
            reason: format!("{} adapter used before it was created", role),
        }
        .into()
    })
}

impl Pipeline {
    /// Pipeline over `config`, building adapters from `registry`
    pub fn new(config: Config, registry: Registry) -> Self {
        Self {
            config,
            registry,
            state: PipelineState::default(),
            source: None,
            engine: None,
            manager: None,
            payload: None,
        }
    }

    /// State accumulated by the steps run so far
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Configuration, including the repository file once `parse_config` ran
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run every step in order.
    ///
    /// `success` is reported once when all steps completed. The working copy's
    /// parent directory is removed before returning, on success and on failure.
    pub fn start(&mut self) -> Result<()> {
        log::info!("Starting release pipeline");
        let outcome = self.run_steps();

        match &outcome {
            Ok(()) => {
                log::info!("Release pipeline completed");
                self.notify(NotifyState::Success, SUCCESS_MESSAGE);
            }
            Err(e) => log::error!("Release pipeline failed: {}", e),
        }

        self.cleanup();
        outcome
    }

    fn run_steps(&mut self) -> Result<()> {
        for step in STEPS {
            self.run_step(step)?;
        }
        Ok(())
    }

    fn run_step(&mut self, step: &StepDescriptor) -> Result<()> {
        if step.is_disabled(self.config.settings()) {
            log::info!("Step '{}' is disabled, skipping", step.name);
            return Ok(());
        }

        log::info!("==> {}", step.name);
        if !step.overridable {
            return (step.action)(self);
        }

        self.notify(
            NotifyState::Pending,
            &format!(
                "Started '{}' step. Pull request will be merged automatically when complete.",
                step.name
            ),
        );

        if let Err(e) = self.run_hooked(step) {
            self.notify(NotifyState::Failure, &format!("Error: '{}'", e));
            return Err(e);
        }
        Ok(())
    }

    fn run_hooked(&mut self, step: &StepDescriptor) -> Result<()> {
        self.run_hooks(step.name, HookPhase::Pre)?;

        if HookRunner::new(self.config.settings()).has_override(step.name) {
            self.run_hooks(step.name, HookPhase::Override)?;
        } else {
            match (step.action)(self) {
                Err(e) if e.is_soft() => log::info!("Step '{}' did nothing: {}", step.name, e),
                other => other?,
            }
        }

        self.run_hooks(step.name, HookPhase::Post)
    }

    fn run_hooks(&self, step: &str, phase: HookPhase) -> Result<()> {
        let runner = HookRunner::new(self.config.settings());
        if runner.commands(step, phase).is_empty() {
            return Ok(());
        }

        let working_dir = self.state.require_local_path()?;
        let context = TemplateContext::from_state(&self.state);
        runner.run(step, phase, &context, working_dir)
    }

    fn notify(&mut self, state: NotifyState, message: &str) {
        let sha = self.state.head_sha().to_string();
        if let Some(source) = self.source.as_deref_mut()
            && let Err(e) = source.notify(&sha, state, message)
        {
            log::warn!("Failed to report {} status for {}: {}", state, sha, e);
        }
    }

    fn cleanup(&mut self) {
        let Some(parent_path) = self.state.parent_path.take() else {
            return;
        };

        if self.config.settings().engine_disable_cleanup {
            log::info!("Cleanup disabled, working copy kept at {}", parent_path.display());
            return;
        }

        match std::fs::remove_dir_all(&parent_path) {
            Ok(()) => log::info!("Removed {}", parent_path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove {}: {}", parent_path.display(), e),
        }
    }

    fn ensure_engine(&mut self) -> Result<()> {
        if self.engine.is_none() {
            let package_type = &self.config.settings().package_type;
            log::info!("Using '{}' engine", package_type);
            self.engine = Some(self.registry.create_engine(package_type, &self.config)?);
        }
        Ok(())
    }

    pub(crate) fn init_step(&mut self) -> Result<()> {
        let scm = &self.config.settings().scm;
        log::info!("Using '{}' source", scm);
        let mut source = self.registry.create_source(scm, &self.config)?;
        source.init(self.config.settings(), &mut self.state)?;
        self.source = Some(source);
        Ok(())
    }

    pub(crate) fn retrieve_payload_step(&mut self) -> Result<()> {
        let source = require(&mut self.source, "source")?;
        let payload = source.retrieve_payload(self.config.settings(), &mut self.state)?;
        self.payload = Some(payload);
        Ok(())
    }

    pub(crate) fn checkout_step(&mut self) -> Result<()> {
        let payload = self
            .payload
            .clone()
            .ok_or(ScmError::PayloadFormat { field: "head" })?;
        let source = require(&mut self.source, "source")?;
        let settings = self.config.settings();

        if payload.is_pull_request() {
            source.checkout_pull_request_payload(settings, &mut self.state, &payload)
        } else {
            source.checkout_push_payload(settings, &mut self.state, &payload)
        }
    }

    pub(crate) fn parse_config_step(&mut self) -> Result<()> {
        let local_path = self.state.require_local_path()?.to_path_buf();
        self.config.merge_repo_file(&local_path)?;
        self.state.release_assets = self.config.settings().scm_release_assets.clone();
        self.ensure_engine()
    }

    pub(crate) fn mgr_init_step(&mut self) -> Result<()> {
        self.ensure_engine()?;
        let name = match &self.config.settings().mgr_type {
            Some(name) => name.clone(),
            None => require(&mut self.engine, "engine")?.default_manager().to_string(),
        };
        log::info!("Using '{}' manager", name);
        self.manager = Some(self.registry.create_manager(&name, &self.config)?);
        Ok(())
    }

    pub(crate) fn validate_tools_step(&mut self) -> Result<()> {
        require(&mut self.engine, "engine")?.validate_tools(self.config.settings())
    }

    pub(crate) fn mgr_validate_tools_step(&mut self) -> Result<()> {
        require(&mut self.manager, "manager")?.validate_tools(self.config.settings())
    }

    pub(crate) fn assemble_step(&mut self) -> Result<()> {
        let settings = self.config.settings();
        require(&mut self.engine, "engine")?.assemble_step(settings, &mut self.state)?;
        require(&mut self.manager, "manager")?.assemble_step(settings, &mut self.state)
    }

    pub(crate) fn dependencies_step(&mut self) -> Result<()> {
        let settings = self.config.settings();
        let engine = require(&mut self.engine, "engine")?;
        let manager = require(&mut self.manager, "manager")?;

        engine.dependencies_step(settings, &mut self.state)?;
        let (current, next) = (engine.current_metadata(), engine.next_metadata());
        manager.dependencies_step(settings, &mut self.state, &current, &next)
    }

    pub(crate) fn compile_step(&mut self) -> Result<()> {
        require(&mut self.engine, "engine")?.compile_step(self.config.settings(), &mut self.state)
    }

    pub(crate) fn test_step(&mut self) -> Result<()> {
        require(&mut self.engine, "engine")?.test_step(self.config.settings(), &mut self.state)
    }

    pub(crate) fn package_step(&mut self) -> Result<()> {
        let settings = self.config.settings();
        let engine = require(&mut self.engine, "engine")?;
        let manager = require(&mut self.manager, "manager")?;

        let (current, next) = (engine.current_metadata(), engine.next_metadata());
        manager.package_step(settings, &mut self.state, &current, &next)?;
        engine.package_step(settings, &mut self.state)
    }

    pub(crate) fn dist_step(&mut self) -> Result<()> {
        let settings = self.config.settings();
        let engine = require(&mut self.engine, "engine")?;
        let manager = require(&mut self.manager, "manager")?;

        let (current, next) = (engine.current_metadata(), engine.next_metadata());
        manager.dist_step(settings, &mut self.state, &current, &next)?;
        engine.dist_step(settings, &mut self.state)
    }

    pub(crate) fn scm_publish_step(&mut self) -> Result<()> {
        require(&mut self.source, "source")?.publish(self.config.settings(), &mut self.state)
    }

    pub(crate) fn scm_cleanup_step(&mut self) -> Result<()> {
        require(&mut self.source, "source")?.cleanup(self.config.settings(), &self.state)
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{Metadata, NotificationSink, ReleaseHandle};
    use crate::config::Settings;
    use crate::error::{ReleaseError, ScmError};
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;

    type Events = Rc<RefCell<Vec<String>>>;

    struct FakeSource {
        events: Events,
        cleanup_skipped: bool,
    }

    impl NotificationSink for FakeSource {
        fn notify(&mut self, sha: &str, state: NotifyState, message: &str) -> Result<()> {
            self.events
                .borrow_mut()
                .push(format!("notify:{}:{}:{}", sha, state, message));
            Ok(())
        }
    }

    impl SourceAdapter for FakeSource {
        fn init(&mut self, settings: &Settings, state: &mut PipelineState) -> Result<()> {
            self.events.borrow_mut().push("source:init".to_string());
            state.parent_path = settings.scm_git_parent_path.clone();
            Ok(())
        }

        fn retrieve_payload(
            &mut self,
            _settings: &Settings,
            state: &mut PipelineState,
        ) -> Result<Payload> {
            self.events.borrow_mut().push("source:retrieve_payload".to_string());
            let payload = Payload {
                head: CommitRef {
                    sha: "abc123".to_string(),
                    git_ref: "master".to_string(),
                    repo: RepoInfo {
                        clone_url: "https://example.com/acme/widget.git".to_string(),
                        name: "widget".to_string(),
                        full_name: "acme/widget".to_string(),
                    },
                },
                ..Payload::default()
            };
            state.head = Some(payload.head.clone());
            Ok(payload)
        }

        fn checkout_push_payload(
            &mut self,
            _settings: &Settings,
            state: &mut PipelineState,
            _payload: &Payload,
        ) -> Result<()> {
            self.events.borrow_mut().push("source:checkout_push".to_string());
            let parent = state.parent_path.clone().unwrap_or_default();
            let local_path = parent.join("widget");
            std::fs::create_dir_all(&local_path)?;
            state.local_branch = "master".to_string();
            state.local_path = Some(local_path);
            Ok(())
        }

        fn checkout_pull_request_payload(
            &mut self,
            _settings: &Settings,
            _state: &mut PipelineState,
            _payload: &Payload,
        ) -> Result<()> {
            self.events.borrow_mut().push("source:checkout_pull_request".to_string());
            Ok(())
        }

        fn publish(&mut self, _settings: &Settings, _state: &mut PipelineState) -> Result<()> {
            self.events.borrow_mut().push("source:publish".to_string());
            Ok(())
        }

        fn publish_assets(
            &mut self,
            _settings: &Settings,
            _state: &PipelineState,
            _release: &ReleaseHandle,
        ) -> Result<()> {
            Ok(())
        }

        fn cleanup(&mut self, _settings: &Settings, _state: &PipelineState) -> Result<()> {
            self.events.borrow_mut().push("source:cleanup".to_string());
            if self.cleanup_skipped {
                return Err(ScmError::CleanupSkipped {
                    reason: "not a pull request".to_string(),
                }
                .into());
            }
            Ok(())
        }
    }

    struct FakeEngine {
        events: Events,
        fail_test: bool,
    }

    impl FakeEngine {
        fn record(&self, step: &str) {
            self.events.borrow_mut().push(format!("engine:{}", step));
        }
    }

    impl EngineAdapter for FakeEngine {
        fn validate_tools(&mut self, _settings: &Settings) -> Result<()> {
            self.record("validate_tools");
            Ok(())
        }

        fn assemble_step(&mut self, _settings: &Settings, state: &mut PipelineState) -> Result<()> {
            self.record("assemble");
            state.release_version = "1.0.1".to_string();
            Ok(())
        }

        fn dependencies_step(&mut self, _settings: &Settings, _state: &mut PipelineState) -> Result<()> {
            self.record("dependencies");
            Ok(())
        }

        fn compile_step(&mut self, _settings: &Settings, _state: &mut PipelineState) -> Result<()> {
            self.record("compile");
            Ok(())
        }

        fn test_step(&mut self, _settings: &Settings, _state: &mut PipelineState) -> Result<()> {
            self.record("test");
            if self.fail_test {
                return Err(EngineError::TestFailed {
                    reason: "2 tests failed".to_string(),
                }
                .into());
            }
            Ok(())
        }

        fn package_step(&mut self, _settings: &Settings, _state: &mut PipelineState) -> Result<()> {
            self.record("package");
            Ok(())
        }

        fn dist_step(&mut self, _settings: &Settings, _state: &mut PipelineState) -> Result<()> {
            self.record("dist");
            Ok(())
        }

        fn current_metadata(&self) -> Metadata {
            Metadata::default()
        }

        fn next_metadata(&self) -> Metadata {
            Metadata::default()
        }

        fn default_manager(&self) -> &str {
            "fake"
        }
    }

    struct FakeManager {
        events: Events,
    }

    impl FakeManager {
        fn record(&self, step: &str) {
            self.events.borrow_mut().push(format!("manager:{}", step));
        }
    }

    impl ManagerAdapter for FakeManager {
        fn validate_tools(&mut self, _settings: &Settings) -> Result<()> {
            self.record("validate_tools");
            Ok(())
        }

        fn assemble_step(&mut self, _settings: &Settings, _state: &mut PipelineState) -> Result<()> {
            self.record("assemble");
            Ok(())
        }

        fn dependencies_step(
            &mut self,
            _settings: &Settings,
            _state: &mut PipelineState,
            _current: &Metadata,
            _next: &Metadata,
        ) -> Result<()> {
            self.record("dependencies");
            Ok(())
        }

        fn package_step(
            &mut self,
            _settings: &Settings,
            _state: &mut PipelineState,
            _current: &Metadata,
            _next: &Metadata,
        ) -> Result<()> {
            self.record("package");
            Ok(())
        }

        fn dist_step(
            &mut self,
            _settings: &Settings,
            _state: &mut PipelineState,
            _current: &Metadata,
            _next: &Metadata,
        ) -> Result<()> {
            self.record("dist");
            Ok(())
        }
    }

    struct Harness {
        _dir: tempfile::TempDir,
        parent: PathBuf,
        events: Events,
        pipeline: Pipeline,
    }

    fn harness(extra_toml: &str, fail_test: bool, cleanup_skipped: bool) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let parent = dir.path().join("work");
        std::fs::create_dir_all(&parent).unwrap();

        let toml = format!(
            "scm = \"fake\"\npackage_type = \"fake\"\nscm_git_parent_path = '{}'\n{}",
            parent.display(),
            extra_toml
        );
        let config = Config::builder()
            .with_toml_str("test", &toml)
            .unwrap()
            .build()
            .unwrap();

        let events: Events = Rc::default();
        let mut registry = Registry::empty();
        let source_events = events.clone();
        registry.register_source("fake", move |_| {
            Ok(Box::new(FakeSource {
                events: source_events.clone(),
                cleanup_skipped,
            }))
        });
        let engine_events = events.clone();
        registry.register_engine("fake", move |_| {
            Ok(Box::new(FakeEngine {
                events: engine_events.clone(),
                fail_test,
            }))
        });
        let manager_events = events.clone();
        registry.register_manager("fake", move |_| {
            Ok(Box::new(FakeManager {
                events: manager_events.clone(),
            }))
        });

        Harness {
            _dir: dir,
            parent,
            events,
            pipeline: Pipeline::new(config, registry),
        }
    }

    fn calls(events: &Events) -> Vec<String> {
        events
            .borrow()
            .iter()
            .filter(|event| !event.starts_with("notify:"))
            .cloned()
            .collect()
    }

    fn notifications(events: &Events, state: &str) -> Vec<String> {
        let prefix = format!("notify:abc123:{}:", state);
        events
            .borrow()
            .iter()
            .filter_map(|event| event.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    #[test]
    fn steps_drive_adapters_in_order() {
        let mut h = harness("", false, false);
        h.pipeline.start().unwrap();

        assert_eq!(
            calls(&h.events),
            [
                "source:init",
                "source:retrieve_payload",
                "source:checkout_push",
                "engine:validate_tools",
                "manager:validate_tools",
                "engine:assemble",
                "manager:assemble",
                "engine:dependencies",
                "manager:dependencies",
                "engine:compile",
                "engine:test",
                "manager:package",
                "engine:package",
                "manager:dist",
                "engine:dist",
                "source:publish",
                "source:cleanup",
            ]
        );
        assert_eq!(notifications(&h.events, "pending").len(), 12);
        assert_eq!(notifications(&h.events, "success"), [SUCCESS_MESSAGE]);
        assert!(notifications(&h.events, "failure").is_empty());
        assert!(!h.parent.exists());
    }

    #[test]
    fn disabled_step_is_skipped_entirely() {
        let mut h = harness(
            "engine_disable_compile = true\n[hooks.compile]\npre = \"touch pre-compile\"\n",
            false,
            false,
        );
        h.pipeline.start().unwrap();

        assert!(!calls(&h.events).contains(&"engine:compile".to_string()));
        assert!(
            !notifications(&h.events, "pending")
                .iter()
                .any(|message| message.contains("'compile'"))
        );
        assert_eq!(notifications(&h.events, "pending").len(), 11);
    }

    #[test]
    fn failing_step_aborts_and_still_cleans_up() {
        let mut h = harness("", true, false);
        let err = h.pipeline.start().unwrap_err();

        assert!(matches!(err, ReleaseError::Engine(EngineError::TestFailed { .. })));
        let calls = calls(&h.events);
        assert_eq!(calls.last().map(String::as_str), Some("engine:test"));
        assert!(!calls.contains(&"engine:package".to_string()));

        let failures = notifications(&h.events, "failure");
        assert_eq!(failures.len(), 1);
        assert!(failures[0].starts_with("Error: '"));
        assert!(failures[0].contains("2 tests failed"));
        assert!(notifications(&h.events, "success").is_empty());
        assert!(!h.parent.exists());
    }

    #[test]
    fn override_hooks_replace_core_action() {
        let mut h = harness(
            "engine_disable_cleanup = true\n[hooks.compile]\noverride = \"echo {release_version} > overridden\"\npost = \"touch after-compile\"\n",
            false,
            false,
        );
        h.pipeline.start().unwrap();

        assert!(!calls(&h.events).contains(&"engine:compile".to_string()));
        let local_path = h.parent.join("widget");
        assert_eq!(
            std::fs::read_to_string(local_path.join("overridden")).unwrap().trim(),
            "1.0.1"
        );
        assert!(local_path.join("after-compile").is_file());
    }

    #[test]
    fn failing_pre_hook_skips_core_action() {
        let mut h = harness("[hooks.package]\npre = \"exit 3\"\n", false, false);
        let err = h.pipeline.start().unwrap_err();

        assert!(matches!(err, ReleaseError::Hook(_)));
        assert!(!calls(&h.events).contains(&"engine:package".to_string()));
        assert_eq!(notifications(&h.events, "failure").len(), 1);
    }

    #[test]
    fn skipped_cleanup_is_not_a_failure() {
        let mut h = harness(
            "engine_disable_cleanup = true\n[hooks.scm_cleanup]\npost = \"touch cleaned\"\n",
            false,
            true,
        );
        h.pipeline.start().unwrap();

        assert!(notifications(&h.events, "failure").is_empty());
        assert_eq!(notifications(&h.events, "success").len(), 1);
        assert!(h.parent.join("widget/cleaned").is_file());
    }

    #[test]
    fn disabled_cleanup_keeps_working_copy() {
        let mut h = harness("engine_disable_cleanup = true\n", false, false);
        h.pipeline.start().unwrap();
        drop(h.pipeline);

        assert!(h.parent.join("widget").is_dir());
    }

    #[test]
    fn drop_removes_working_copy_when_start_never_finished() {
        let mut h = harness("", false, false);
        h.pipeline.init_step().unwrap();
        h.pipeline.retrieve_payload_step().unwrap();
        h.pipeline.checkout_step().unwrap();
        assert!(h.parent.join("widget").is_dir());

        drop(h.pipeline);
        assert!(!h.parent.exists());
    }

    #[test]
    fn unknown_source_fails_init() {
        let mut h = harness("", false, false);
        h.pipeline.config = Config::builder()
            .with_overrides(&["scm=svn"])
            .unwrap()
            .build()
            .unwrap();
        let err = h.pipeline.start().unwrap_err();
        assert!(matches!(
            err,
            ReleaseError::Scm(ScmError::UnknownAdapter { kind: "scm", .. })
        ));
        assert!(notifications(&h.events, "failure").is_empty());
    }
}
