//! `qmemman.toml` loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::policy::MemoryPolicy;

pub const CONFIG_FILE_NAME: &str = "qmemman.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QmemmanConfig {
    #[serde(skip_serializing_if = "MemoryPolicy::is_default")]
    pub policy: MemoryPolicy,
}

impl QmemmanConfig {
    /// Load config with fallback chain:
    ///
    /// 1. `explicit` path if given; it must exist.
    /// 2. `~/.config/qmemman/qmemman.toml` if it exists.
    /// 3. Built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::load_with_paths(explicit, Self::user_config_path().as_deref())
    }

    /// Load config from explicit paths. Testable without global filesystem state.
    pub(crate) fn load_with_paths(
        explicit: Option<&Path>,
        user_path: Option<&Path>,
    ) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }
        match user_path {
            Some(path) if path.exists() => Self::load_from_path(path),
            _ => {
                debug!("no qmemman config found, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config
            .policy
            .validate()
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        debug!(path = %path.display(), "loaded qmemman config");
        Ok(config)
    }

    /// Path to user-level config: `~/.config/qmemman/qmemman.toml`.
    ///
    /// Returns None if the config directory cannot be determined
    /// (e.g., no HOME in containers).
    pub fn user_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "qmemman")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
