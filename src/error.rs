//! Error types for release pipeline operations.
//!
//! Each concern (git, source host, engine, hooks, configuration) owns an error enum;
//! [`ReleaseError`] wraps them so every step returns the same [`Result`].

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for release pipeline operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all release pipeline operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Git operation errors
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    /// Source host / payload errors
    #[error("Scm error: {0}")]
    Scm(#[from] ScmError),

    /// Build engine and package manager errors
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Hook command errors
    #[error("Hook error: {0}")]
    Hook(#[from] HookError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<git2::Error> for ReleaseError {
    fn from(err: git2::Error) -> Self {
        ReleaseError::Git(GitError::Git(err))
    }
}

/// Git workflow errors
#[derive(Error, Debug)]
pub enum GitError {
    /// Path collision, repository open failure or reference lookup failure
    #[error("Filesystem error: {reason}")]
    Filesystem {
        /// Reason for the error
        reason: String,
    },

    /// Three-way merge produced conflicts; no commit was created
    #[error("Merge of '{remote_branch}' into '{local_branch}' has conflicts in: {paths:?}")]
    MergeConflict {
        /// Branch being merged into
        local_branch: String,
        /// Branch being merged
        remote_branch: String,
        /// Conflicting paths
        paths: Vec<String>,
    },

    /// Remote branch is already contained in the local branch
    #[error("Nothing to merge: '{remote_branch}' is already contained in '{local_branch}'")]
    NothingToMerge {
        /// Branch being merged into
        local_branch: String,
        /// Branch being merged
        remote_branch: String,
    },

    /// Merge analysis returned a state the workflow cannot act on
    #[error("Unexpected merge analysis result: {analysis}")]
    MergeAnalysisUnknown {
        /// Debug rendering of the analysis
        analysis: String,
    },

    /// Remote refused one or more ref updates
    #[error("Push rejected by remote: {}", rejections.join("; "))]
    PushRejected {
        /// `<refname>: <message>` per rejected ref
        rejections: Vec<String>,
    },

    /// Underlying libgit2 failure (network, object database, ...)
    #[error(transparent)]
    Git(#[from] git2::Error),
}

/// Source host and payload errors
#[derive(Error, Debug)]
pub enum ScmError {
    /// Payload is missing a required field
    #[error("Incorrectly formatted payload, missing '{field}' key")]
    PayloadFormat {
        /// Missing field name
        field: &'static str,
    },

    /// Payload describes an event the pipeline does not release from
    #[error("Unsupported payload: {reason}")]
    PayloadUnsupported {
        /// Reason for the error
        reason: String,
    },

    /// Could not authenticate against the source host
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed {
        /// Reason for the error
        reason: String,
    },

    /// Source cleanup intentionally did nothing
    #[error("Cleanup skipped: {reason}")]
    CleanupSkipped {
        /// Reason the cleanup was skipped
        reason: String,
    },

    /// No adapter registered under the requested name
    #[error("Unknown {kind} type: '{name}'")]
    UnknownAdapter {
        /// Adapter family (scm, engine, manager)
        kind: &'static str,
        /// Requested name
        name: String,
    },

    /// Release host API failure
    #[error("Release host error: {reason}")]
    Host {
        /// Reason for the error
        reason: String,
    },
}

/// Engine and package manager errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Required executable is not on PATH
    #[error("Required tool '{tool}' is not available: {reason}")]
    ToolValidation {
        /// Tool name
        tool: String,
        /// Reason for the error
        reason: String,
    },

    /// Package is missing required files or metadata
    #[error("Invalid package: {reason}")]
    BuildInvalid {
        /// Reason for the error
        reason: String,
    },

    /// Compile command failed
    #[error("Build failed: {reason}")]
    BuildFailed {
        /// Reason for the error
        reason: String,
    },

    /// Lint or test command failed
    #[error("Test failed: {reason}")]
    TestFailed {
        /// Reason for the error
        reason: String,
    },

    /// Distribution credentials were not configured
    #[error("Missing distribution credentials: {reason}")]
    DistCredentialsMissing {
        /// Reason for the error
        reason: String,
    },

    /// Distribution command failed
    #[error("Distribution failed: {reason}")]
    DistPackage {
        /// Reason for the error
        reason: String,
    },

    /// Version string could not be parsed or bumped
    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion {
        /// Version string
        version: String,
        /// Reason for the error
        reason: String,
    },
}

/// Hook and external command errors
#[derive(Error, Debug)]
pub enum HookError {
    /// Command exited with a non-zero status
    #[error("Command '{command}' ({label}) failed with {status}")]
    CommandFailed {
        /// Log label of the command
        label: String,
        /// Rendered command
        command: String,
        /// Exit status description
        status: String,
    },

    /// Command could not be started
    #[error("Failed to start '{command}': {source}")]
    Spawn {
        /// Rendered command
        command: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Working directory must be absolute
    #[error("Working directory must be an absolute path: {path}")]
    RelativeWorkingDir {
        /// Offending path
        path: PathBuf,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Configuration file or merged layers did not match the schema
    #[error("Invalid configuration ({origin}): {reason}")]
    Parse {
        /// Layer or file the error came from
        origin: String,
        /// Reason for the error
        reason: String,
    },

    /// Environment variable value has the wrong shape
    #[error("Invalid value for environment variable {var}: {reason}")]
    InvalidEnv {
        /// Variable name
        var: String,
        /// Reason for the error
        reason: String,
    },

    /// Explicit override could not be applied
    #[error("Invalid override '{key}': {reason}")]
    InvalidOverride {
        /// Override key
        key: String,
        /// Reason for the error
        reason: String,
    },
}

impl ReleaseError {
    /// Soft errors signal that a step intentionally did nothing
    pub fn is_soft(&self) -> bool {
        matches!(self, ReleaseError::Scm(ScmError::CleanupSkipped { .. }))
    }

    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::Git(GitError::MergeConflict { local_branch, .. }) => vec![
                format!("Rebase the pull request onto '{}' and resolve conflicts", local_branch),
                "Push the resolved branch and re-run the pipeline".to_string(),
            ],
            ReleaseError::Git(GitError::NothingToMerge { .. }) => vec![
                "The pull request has no commits that are not already on the base branch"
                    .to_string(),
            ],
            ReleaseError::Git(GitError::PushRejected { .. }) => vec![
                "The remote branch moved while the pipeline was running".to_string(),
                "Re-run the pipeline against the new branch tip".to_string(),
            ],
            ReleaseError::Scm(ScmError::PayloadFormat { field }) => vec![format!(
                "Provide '{}' through configuration or KODEGEN_RELEASE_* environment variables",
                field
            )],
            ReleaseError::Scm(ScmError::AuthenticationFailed { .. }) => vec![
                "Set scm_access_token (or KODEGEN_RELEASE_SCM_ACCESS_TOKEN)".to_string(),
            ],
            ReleaseError::Engine(EngineError::ToolValidation { tool, .. }) => {
                vec![format!("Install '{}' and make sure it is on PATH", tool)]
            }
            ReleaseError::Hook(HookError::CommandFailed { label, .. }) => vec![format!(
                "Inspect the output prefixed with '{}' above",
                label
            )],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}
