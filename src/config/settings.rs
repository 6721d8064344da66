//! Typed view of the merged configuration layers.

use crate::pipeline::ReleaseAsset;
use crate::version::VersionBump;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Ordered shell commands; accepts a single string or a list in configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "OneOrMany")]
pub struct CommandList(pub Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for CommandList {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(command) => CommandList(vec![command]),
            OneOrMany::Many(commands) => CommandList(commands),
        }
    }
}

impl CommandList {
    /// Commands in execution order
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Whether no command is configured
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Hooks configured for one step under `[hooks.<step>]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StepHooks {
    /// Run before the step
    pub pre: CommandList,
    /// Replace the step's core action when non-empty
    #[serde(rename = "override")]
    pub override_cmds: CommandList,
    /// Run after the step
    pub post: CommandList,
}

/// Every setting the pipeline and built-in adapters read
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Source adapter name
    pub scm: String,
    /// Engine adapter name
    pub package_type: String,
    /// Manager adapter name; the engine's default manager when unset
    pub mgr_type: Option<String>,

    /// Pushed commit sha, or the pull request head sha
    pub scm_sha: Option<String>,
    /// Pushed branch, or the pull request head branch
    pub scm_branch: Option<String>,
    /// Clone URL of the head repository
    pub scm_clone_url: Option<String>,
    /// Name of the head repository
    pub scm_repo_name: Option<String>,
    /// `owner/name` of the head repository
    pub scm_repo_full_name: Option<String>,
    /// Pull request number; absent for push events
    pub scm_pull_request: Option<u64>,
    /// Pull request title
    pub scm_pull_request_title: Option<String>,
    /// Pull request state; only `open` pull requests are released
    pub scm_pull_request_state: String,
    /// Host-provided merge ref, `{number}` is replaced with the pull request number
    pub scm_pull_request_merge_ref: Option<String>,
    /// Pull request base sha
    pub scm_base_sha: Option<String>,
    /// Pull request base branch
    pub scm_base_branch: Option<String>,
    /// Clone URL of the base repository
    pub scm_base_clone_url: Option<String>,
    /// Name of the base repository
    pub scm_base_repo_name: Option<String>,
    /// `owner/name` of the base repository
    pub scm_base_repo_full_name: Option<String>,
    /// Default branch of the base repository
    pub scm_default_branch: Option<String>,
    /// Token embedded into clone URLs
    pub scm_access_token: Option<String>,
    /// Directory the working copy is cloned under; a fresh temporary directory when unset
    pub scm_git_parent_path: Option<PathBuf>,
    /// Skip the scm_publish step
    pub scm_disable_publish: bool,
    /// Skip the scm_cleanup step
    pub scm_disable_cleanup: bool,
    /// Delete merged pull request branches
    pub scm_enable_branch_cleanup: bool,
    /// Build the changelog from the pull request range instead of the nearest tag
    pub scm_disable_nearest_tag_changelog: bool,
    /// Files uploaded to the release
    pub scm_release_assets: Vec<ReleaseAsset>,
    /// Upload attempts per asset
    pub scm_asset_upload_attempts: u32,
    /// Delay between upload attempts in milliseconds
    pub scm_asset_upload_delay_ms: u64,

    /// Skip the compile step
    pub engine_disable_compile: bool,
    /// Skip the test step
    pub engine_disable_test: bool,
    /// Skip lint commands inside the test step
    pub engine_disable_lint: bool,
    /// Skip security check commands inside the test step
    pub engine_disable_security_check: bool,
    /// Skip the dist step
    pub engine_disable_dist: bool,
    /// Keep the working copy after the run
    pub engine_disable_cleanup: bool,
    /// Version component incremented by a release
    pub engine_version_bump_type: VersionBump,
    /// Commit and tag message suffix for the version bump
    pub engine_version_bump_msg: String,
    /// Version file relative to the working copy
    pub engine_version_metadata_path: String,
    /// Executables that must be on PATH
    pub engine_required_tools: Vec<String>,
    /// Compile commands
    pub engine_cmd_compile: CommandList,
    /// Lint commands
    pub engine_cmd_lint: CommandList,
    /// Test commands
    pub engine_cmd_test: CommandList,
    /// Security check commands
    pub engine_cmd_security_check: CommandList,

    /// Dependency installation commands
    pub mgr_cmd_dependencies: CommandList,
    /// Distribution commands
    pub mgr_cmd_dist: CommandList,

    /// Hooks keyed by step name
    pub hooks: BTreeMap<String, StepHooks>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scm: "git".to_string(),
            package_type: "generic".to_string(),
            mgr_type: None,
            scm_sha: None,
            scm_branch: None,
            scm_clone_url: None,
            scm_repo_name: None,
            scm_repo_full_name: None,
            scm_pull_request: None,
            scm_pull_request_title: None,
            scm_pull_request_state: "open".to_string(),
            scm_pull_request_merge_ref: None,
            scm_base_sha: None,
            scm_base_branch: None,
            scm_base_clone_url: None,
            scm_base_repo_name: None,
            scm_base_repo_full_name: None,
            scm_default_branch: None,
            scm_access_token: None,
            scm_git_parent_path: None,
            scm_disable_publish: false,
            scm_disable_cleanup: false,
            scm_enable_branch_cleanup: false,
            scm_disable_nearest_tag_changelog: false,
            scm_release_assets: Vec::new(),
            scm_asset_upload_attempts: 5,
            scm_asset_upload_delay_ms: 1000,
            engine_disable_compile: false,
            engine_disable_test: false,
            engine_disable_lint: false,
            engine_disable_security_check: false,
            engine_disable_dist: false,
            engine_disable_cleanup: false,
            engine_version_bump_type: VersionBump::Patch,
            engine_version_bump_msg: "Automated packaging of release by kodegen-release"
                .to_string(),
            engine_version_metadata_path: "VERSION".to_string(),
            engine_required_tools: Vec::new(),
            engine_cmd_compile: CommandList::default(),
            engine_cmd_lint: CommandList::default(),
            engine_cmd_test: CommandList::default(),
            engine_cmd_security_check: CommandList::default(),
            mgr_cmd_dependencies: CommandList::default(),
            mgr_cmd_dist: CommandList::default(),
            hooks: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Hooks configured for `step`, if any
    pub fn step_hooks(&self, step: &str) -> Option<&StepHooks> {
        self.hooks.get(step)
    }
}
