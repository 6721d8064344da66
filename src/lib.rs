//! # Kodegen Release Pipeline
//!
//! Webhook-driven release pipeline for git hosted packages.
//!
//! A run clones the repository named by the triggering push or pull request,
//! walks a fixed list of steps (assemble, dependencies, compile, test, package,
//! dist, publish, cleanup), and lets configuration wrap or replace each step with
//! shell hooks. Git work (clone, merge, commit, tag, push, changelog) goes through
//! libgit2 with no git CLI dependency.
//!
//! ## Features
//!
//! - **Hook-wrapped steps**: `pre`, `override` and `post` commands per step
//! - **Pull request merges**: fast-forward or two-parent merge commits, conflicts reported by path
//! - **Layered configuration**: system file, explicit files, repository file, environment, overrides
//! - **Pluggable adapters**: source, engine and manager chosen by name from a registry
//! - **Status reporting**: `pending`, `failure` and `success` notifications per commit
//!
//! ## Usage
//!
//! ```bash
//! kodegen_release_pipeline start --config release.toml
//! kodegen_release_pipeline start --set engine_disable_test=true
//! kodegen_release_pipeline steps
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod adapters;
pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod hooks;
pub mod pipeline;
pub mod retry;
pub mod version;

// Re-export main types for public API
pub use adapters::{EngineAdapter, ManagerAdapter, NotifyState, Registry, SourceAdapter};
pub use cli::Args;
pub use config::{Config, Settings};
pub use error::{ReleaseError, Result};
pub use pipeline::{Pipeline, PipelineState};
pub use version::VersionBump;
