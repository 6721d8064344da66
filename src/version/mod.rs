//! Semantic version bumping for the version metadata file.

use crate::error::{EngineError, Result};
use semver::Version;
use serde::Deserialize;
use std::path::Path;

/// Which part of the version a release increments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionBump {
    /// `1.2.3` → `2.0.0`
    Major,
    /// `1.2.3` → `1.3.0`
    Minor,
    /// `1.2.3` → `1.2.4`
    #[default]
    Patch,
}

impl VersionBump {
    /// Next version after `current`; pre-release and build metadata are dropped
    pub fn bump(self, current: &Version) -> Version {
        match self {
            VersionBump::Major => Version::new(current.major + 1, 0, 0),
            VersionBump::Minor => Version::new(current.major, current.minor + 1, 0),
            VersionBump::Patch => Version::new(current.major, current.minor, current.patch + 1),
        }
    }
}

impl TryFrom<&str> for VersionBump {
    type Error = String;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        match value {
            "major" => Ok(VersionBump::Major),
            "minor" => Ok(VersionBump::Minor),
            "patch" => Ok(VersionBump::Patch),
            other => Err(format!("Unknown version bump interval: {}", other)),
        }
    }
}

/// Read and parse the version stored in `path`.
///
/// A leading `v` is accepted so files written by hand as `v1.2.3` still parse.
pub fn read_version_file(path: &Path) -> Result<Version> {
    let content = std::fs::read_to_string(path).map_err(|e| EngineError::BuildInvalid {
        reason: format!(
            "version file ({}) is required for metadata storage: {}",
            path.display(),
            e
        ),
    })?;

    let raw = content.trim();
    let version = raw.strip_prefix('v').unwrap_or(raw);
    Version::parse(version).map_err(|e| {
        EngineError::InvalidVersion {
            version: raw.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Overwrite `path` with `version`
pub fn write_version_file(path: &Path, version: &Version) -> Result<()> {
    std::fs::write(path, version.to_string())?;
    Ok(())
}
