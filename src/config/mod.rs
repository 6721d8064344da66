//! Layered pipeline configuration.
//!
//! Layers are merged in precedence order, lowest first:
//! built-in defaults, the system file (`~/.kodegen/release.toml`), explicit files,
//! the repository file (`<working copy>/.kodegen-release.toml`), the
//! `KODEGEN_RELEASE_*` environment, then explicit `key=value` overrides.
//! Tables merge recursively; any other value replaces the lower layer's value.

mod env;
mod settings;

pub use env::{ENV_BINDINGS, ENV_PREFIX, EnvKind, env_layer, env_var_name};
pub use settings::{CommandList, Settings, StepHooks};

use crate::error::{ConfigError, Result};
use std::path::{Path, PathBuf};
use toml::{Table, Value};

/// File name of the per-repository configuration
pub const REPO_CONFIG_FILE: &str = ".kodegen-release.toml";

/// Where a layer came from; also its precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LayerKind {
    /// `~/.kodegen/release.toml`
    System,
    /// File passed explicitly (`--config`) or an inline table
    File,
    /// Configuration file inside the checked out repository
    Repo,
    /// `KODEGEN_RELEASE_*` environment variables
    Env,
    /// `key=value` overrides
    Override,
}

#[derive(Debug, Clone)]
struct Layer {
    kind: LayerKind,
    origin: String,
    table: Table,
}

/// Merged configuration and its typed [`Settings`]
#[derive(Debug, Clone)]
pub struct Config {
    layers: Vec<Layer>,
    settings: Settings,
}

impl Config {
    /// Start an empty layer chain
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Configuration made only of built-in defaults
    pub fn defaults() -> Self {
        Self {
            layers: Vec::new(),
            settings: Settings::default(),
        }
    }

    /// Typed settings resolved from every layer
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Merge `<local_path>/.kodegen-release.toml` below the environment and overrides.
    ///
    /// Returns whether a repository file was found.
    pub fn merge_repo_file(&mut self, local_path: &Path) -> Result<bool> {
        let path = local_path.join(REPO_CONFIG_FILE);
        if !path.is_file() {
            log::debug!("No repository configuration at {}", path.display());
            return Ok(false);
        }

        log::info!("Loading repository configuration: {}", path.display());
        let table = read_table(&path)?;
        self.layers.retain(|layer| layer.kind != LayerKind::Repo);
        self.layers.push(Layer {
            kind: LayerKind::Repo,
            origin: path.display().to_string(),
            table,
        });
        self.settings = resolve(&mut self.layers)?;
        Ok(true)
    }
}

/// Collects layers and resolves them into a [`Config`]
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    layers: Vec<Layer>,
}

impl ConfigBuilder {
    /// Add `~/.kodegen/release.toml` when it exists
    pub fn with_system_file(self) -> Result<Self> {
        match system_config_path() {
            Some(path) if path.is_file() => self.with_layer_file(LayerKind::System, &path),
            _ => Ok(self),
        }
    }

    /// Add an explicit configuration file; a missing file is an error
    pub fn with_file(self, path: &Path) -> Result<Self> {
        self.with_layer_file(LayerKind::File, path)
    }

    /// Add an inline TOML document at file precedence
    pub fn with_toml_str(mut self, origin: &str, content: &str) -> Result<Self> {
        let table = parse_table(origin, content)?;
        self.layers.push(Layer {
            kind: LayerKind::File,
            origin: origin.to_string(),
            table,
        });
        Ok(self)
    }

    /// Add the `KODEGEN_RELEASE_*` variables of the process environment
    pub fn with_env(self) -> Result<Self> {
        self.with_env_lookup(|name| std::env::var(name).ok())
    }

    /// Add environment bindings resolved through `lookup`
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let table = env_layer(lookup)?;
        self.layers.push(Layer {
            kind: LayerKind::Env,
            origin: "environment".to_string(),
            table,
        });
        Ok(self)
    }

    /// Add `key=value` overrides; dotted keys address nested tables
    pub fn with_overrides<S: AsRef<str>>(mut self, overrides: &[S]) -> Result<Self> {
        let mut table = Table::new();
        for entry in overrides {
            let (key, value) = parse_override(entry.as_ref())?;
            insert_dotted(&mut table, &key, value)?;
        }
        self.layers.push(Layer {
            kind: LayerKind::Override,
            origin: "overrides".to_string(),
            table,
        });
        Ok(self)
    }

    /// Merge every layer and deserialize the result
    pub fn build(mut self) -> Result<Config> {
        let settings = resolve(&mut self.layers)?;
        Ok(Config {
            layers: self.layers,
            settings,
        })
    }

    fn with_layer_file(mut self, kind: LayerKind, path: &Path) -> Result<Self> {
        log::info!("Loading configuration file: {}", path.display());
        let table = read_table(path)?;
        self.layers.push(Layer {
            kind,
            origin: path.display().to_string(),
            table,
        });
        Ok(self)
    }
}

/// Location of the system configuration file
pub fn system_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".kodegen").join("release.toml"))
}

fn read_table(path: &Path) -> Result<Table> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_table(&path.display().to_string(), &content)
}

fn parse_table(origin: &str, content: &str) -> Result<Table> {
    toml::from_str(content).map_err(|e| {
        ConfigError::Parse {
            origin: origin.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

fn resolve(layers: &mut [Layer]) -> Result<Settings> {
    // stable: equal kinds keep insertion order
    layers.sort_by_key(|layer| layer.kind);

    let mut merged = Table::new();
    for layer in layers.iter() {
        log::trace!("Merging configuration layer {:?} ({})", layer.kind, layer.origin);
        merge_tables(&mut merged, &layer.table);
    }

    Value::Table(merged).try_into().map_err(|e: toml::de::Error| {
        ConfigError::Parse {
            origin: "merged configuration".to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

fn merge_tables(base: &mut Table, overlay: &Table) {
    for (key, value) in overlay {
        match (base.get_mut(key), value) {
            (Some(Value::Table(existing)), Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

fn parse_override(entry: &str) -> Result<(String, Value)> {
    let (key, raw) = entry.split_once('=').ok_or_else(|| ConfigError::InvalidOverride {
        key: entry.to_string(),
        reason: "expected key=value".to_string(),
    })?;

    let key = key.trim();
    if key.is_empty() {
        return Err(ConfigError::InvalidOverride {
            key: entry.to_string(),
            reason: "empty key".to_string(),
        }
        .into());
    }

    // TOML literals (true, 5, ["a", "b"]) keep their type; anything else is a string
    let value = toml::from_str::<Table>(&format!("value = {}", raw.trim()))
        .ok()
        .and_then(|mut table| table.remove("value"))
        .unwrap_or_else(|| Value::String(raw.to_string()));

    Ok((key.to_string(), value))
}

fn insert_dotted(table: &mut Table, key: &str, value: Value) -> Result<()> {
    let mut parts: Vec<&str> = key.split('.').collect();
    let last = parts.pop().unwrap_or(key);

    let mut current = table;
    for part in parts {
        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Table(Table::new()));
        current = match entry {
            Value::Table(nested) => nested,
            _ => {
                return Err(ConfigError::InvalidOverride {
                    key: key.to_string(),
                    reason: format!("'{}' is not a table", part),
                }
                .into());
            }
        };
    }

    current.insert(last.to_string(), value);
    Ok(())
}
