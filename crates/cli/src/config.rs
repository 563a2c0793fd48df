//! Configuration management for the CLI

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Optional defaults read from `~/.config/wla/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Analyzer service URL
    pub server_url: Option<String>,
    /// Default namespace
    pub default_namespace: Option<String>,
    /// Chat model for local analysis
    pub model: Option<String>,
}

impl Config {
    /// Load configuration from the default location, if present
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).context("Failed to read config file")?;

        serde_json::from_str(&content).context("Failed to parse config file")
    }

    fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("wla").join("config.json"))
    }
}

/// Resolve the kubeconfig to use
///
/// An explicit path wins, then `KUBECONFIG`, then `~/.kube/config` when it
/// exists. `None` falls back to in-cluster or inferred configuration.
pub fn kubeconfig_path(override_path: Option<&str>) -> Option<PathBuf> {
    let from_env = std::env::var("KUBECONFIG").ok();
    let home = dirs_next::home_dir();
    resolve_kubeconfig(override_path, from_env.as_deref(), home.as_deref())
}

fn resolve_kubeconfig(
    override_path: Option<&str>,
    from_env: Option<&str>,
    home: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(path) = override_path.filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }

    // KUBECONFIG may list several files; the first one is used
    if let Some(first) = from_env
        .and_then(|v| std::env::split_paths(v).next())
        .filter(|p| !p.as_os_str().is_empty())
    {
        return Some(first);
    }

    home.map(|h| h.join(".kube").join("config"))
        .filter(|p| p.exists())
}
