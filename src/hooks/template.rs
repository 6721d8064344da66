//! `{name}` substitution for hook and engine commands.

use crate::pipeline::PipelineState;
use std::collections::BTreeMap;

/// Names a command template may reference
pub const TEMPLATE_VARIABLES: &[&str] = &[
    "release_version",
    "release_commit",
    "local_branch",
    "local_path",
    "parent_path",
    "remote_url",
    "head_sha",
    "head_ref",
    "base_sha",
    "base_ref",
    "repo_name",
    "repo_full_name",
    "nearest_tag",
    "is_pull_request",
];

/// Values available to command templates
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    values: BTreeMap<&'static str, String>,
}

impl TemplateContext {
    /// Snapshot the template values of `state`; unset values render empty
    pub fn from_state(state: &PipelineState) -> Self {
        let path = |p: &Option<std::path::PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        };
        let head = state.head.as_ref();
        let base = state.base.as_ref();

        let mut values = BTreeMap::new();
        values.insert("release_version", state.release_version.clone());
        values.insert("release_commit", state.release_commit.clone());
        values.insert("local_branch", state.local_branch.clone());
        values.insert("local_path", path(&state.local_path));
        values.insert("parent_path", path(&state.parent_path));
        values.insert("remote_url", state.remote_url.clone());
        values.insert("head_sha", head.map(|c| c.sha.clone()).unwrap_or_default());
        values.insert("head_ref", head.map(|c| c.git_ref.clone()).unwrap_or_default());
        values.insert("base_sha", base.map(|c| c.sha.clone()).unwrap_or_default());
        values.insert("base_ref", base.map(|c| c.git_ref.clone()).unwrap_or_default());
        // releases land in the base repository for pull requests
        let target = base.or(head);
        values.insert(
            "repo_name",
            target.map(|c| c.repo.name.clone()).unwrap_or_default(),
        );
        values.insert(
            "repo_full_name",
            target.map(|c| c.repo.full_name.clone()).unwrap_or_default(),
        );
        values.insert(
            "nearest_tag",
            state
                .nearest_tag
                .as_ref()
                .map(|t| t.short_name.clone())
                .unwrap_or_default(),
        );
        values.insert("is_pull_request", state.is_pull_request.to_string());

        Self { values }
    }

    /// Value bound to `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Replace every known `{name}`; unknown braces are copied through untouched
    pub fn render(&self, template: &str) -> String {
        let mut rendered = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            rendered.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            match after.find('}') {
                Some(close) if self.values.contains_key(&after[..close]) => {
                    rendered.push_str(&self.values[&after[..close]]);
                    rest = &after[close + 1..];
                }
                _ => {
                    rendered.push('{');
                    rest = after;
                }
            }
        }

        rendered.push_str(rest);
        rendered
    }
}
