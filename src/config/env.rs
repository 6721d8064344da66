//! `KODEGEN_RELEASE_*` environment bindings.

use crate::error::{ConfigError, Result};
use toml::{Table, Value};

/// Prefix shared by every bound environment variable
pub const ENV_PREFIX: &str = "KODEGEN_RELEASE_";

/// How an environment value is converted before it joins the layer chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvKind {
    /// Taken verbatim
    Str,
    /// `true`/`false`/`1`/`0`/`yes`/`no`
    Bool,
    /// Unsigned integer
    Int,
    /// JSON array of strings, or one plain string
    List,
}

/// Setting keys readable from the environment, as `KODEGEN_RELEASE_<KEY>`
pub const ENV_BINDINGS: &[(&str, EnvKind)] = &[
    ("scm", EnvKind::Str),
    ("package_type", EnvKind::Str),
    ("mgr_type", EnvKind::Str),
    ("scm_sha", EnvKind::Str),
    ("scm_branch", EnvKind::Str),
    ("scm_clone_url", EnvKind::Str),
    ("scm_repo_name", EnvKind::Str),
    ("scm_repo_full_name", EnvKind::Str),
    ("scm_pull_request", EnvKind::Int),
    ("scm_pull_request_title", EnvKind::Str),
    ("scm_pull_request_state", EnvKind::Str),
    ("scm_pull_request_merge_ref", EnvKind::Str),
    ("scm_base_sha", EnvKind::Str),
    ("scm_base_branch", EnvKind::Str),
    ("scm_base_clone_url", EnvKind::Str),
    ("scm_base_repo_name", EnvKind::Str),
    ("scm_base_repo_full_name", EnvKind::Str),
    ("scm_default_branch", EnvKind::Str),
    ("scm_access_token", EnvKind::Str),
    ("scm_git_parent_path", EnvKind::Str),
    ("scm_disable_publish", EnvKind::Bool),
    ("scm_disable_cleanup", EnvKind::Bool),
    ("scm_enable_branch_cleanup", EnvKind::Bool),
    ("scm_disable_nearest_tag_changelog", EnvKind::Bool),
    ("scm_asset_upload_attempts", EnvKind::Int),
    ("scm_asset_upload_delay_ms", EnvKind::Int),
    ("engine_disable_compile", EnvKind::Bool),
    ("engine_disable_test", EnvKind::Bool),
    ("engine_disable_lint", EnvKind::Bool),
    ("engine_disable_security_check", EnvKind::Bool),
    ("engine_disable_dist", EnvKind::Bool),
    ("engine_disable_cleanup", EnvKind::Bool),
    ("engine_version_bump_type", EnvKind::Str),
    ("engine_version_bump_msg", EnvKind::Str),
    ("engine_version_metadata_path", EnvKind::Str),
    ("engine_required_tools", EnvKind::List),
    ("engine_cmd_compile", EnvKind::List),
    ("engine_cmd_lint", EnvKind::List),
    ("engine_cmd_test", EnvKind::List),
    ("engine_cmd_security_check", EnvKind::List),
    ("mgr_cmd_dependencies", EnvKind::List),
    ("mgr_cmd_dist", EnvKind::List),
];

/// Environment variable name bound to `key`
pub fn env_var_name(key: &str) -> String {
    format!("{}{}", ENV_PREFIX, key.to_uppercase())
}

/// Build the environment layer from `lookup`, which resolves a variable name to its value
pub fn env_layer<F>(lookup: F) -> Result<Table>
where
    F: Fn(&str) -> Option<String>,
{
    let mut table = Table::new();

    for (key, kind) in ENV_BINDINGS {
        let var = env_var_name(key);
        if let Some(raw) = lookup(&var) {
            table.insert(key.to_string(), convert(&var, &raw, *kind)?);
        }
    }

    Ok(table)
}

fn convert(var: &str, raw: &str, kind: EnvKind) -> Result<Value> {
    let invalid = |reason: String| ConfigError::InvalidEnv {
        var: var.to_string(),
        reason,
    };

    let value = match kind {
        EnvKind::Str => Value::String(raw.to_string()),
        EnvKind::Bool => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Value::Boolean(true),
            "false" | "0" | "no" | "" => Value::Boolean(false),
            other => return Err(invalid(format!("expected a boolean, got '{}'", other)).into()),
        },
        EnvKind::Int => {
            let parsed: u64 = raw
                .trim()
                .parse()
                .map_err(|e| invalid(format!("expected an unsigned integer: {}", e)))?;
            let parsed = i64::try_from(parsed)
                .map_err(|_| invalid("integer out of range".to_string()))?;
            Value::Integer(parsed)
        }
        EnvKind::List => {
            let trimmed = raw.trim();
            if trimmed.starts_with('[') {
                let items: Vec<String> = serde_json::from_str(trimmed)
                    .map_err(|e| invalid(format!("expected a JSON array of strings: {}", e)))?;
                Value::Array(items.into_iter().map(Value::String).collect())
            } else {
                Value::Array(vec![Value::String(raw.to_string())])
            }
        }
    };

    Ok(value)
}
