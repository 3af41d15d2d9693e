use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::NodeSpec;

/// The configured node set: which hosts exist and how many concurrent
/// workers each may run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterConfig {
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
}

impl ClusterConfig {
    /// Reject node tables the master cannot key by name.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_nodes(&self.nodes)
    }
}

/// Reject node tables the master cannot key by name: empty names and
/// duplicates would silently collapse into one map entry.
pub fn validate_nodes(nodes: &[NodeSpec]) -> Result<(), CoreError> {
    let mut seen = HashSet::new();
    for node in nodes {
        if node.name.is_empty() {
            return Err(CoreError::Config("node with empty name".into()));
        }
        if !seen.insert(node.name.as_str()) {
            return Err(CoreError::Config(format!(
                "duplicate node name '{}'",
                node.name
            )));
        }
    }
    Ok(())
}

/// Master tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterConfig {
    /// Events kept per job in the in-memory event log.
    pub event_capacity: usize,
    /// Upper bound on a single worker's runtime. 0 disables the bound.
    pub worker_timeout_ms: u64,
}

impl MasterConfig {
    /// The worker runtime bound as a duration, if one is configured.
    pub fn worker_timeout(&self) -> Option<std::time::Duration> {
        if self.worker_timeout_ms == 0 {
            None
        } else {
            Some(std::time::Duration::from_millis(self.worker_timeout_ms))
        }
    }
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            event_capacity: 1000,
            worker_timeout_ms: 0,
        }
    }
}

/// Top-level configuration aggregating all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlotillaConfig {
    #[serde(default)]
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub master: MasterConfig,
}

/// Read configuration from a TOML file. A missing or unreadable file is
/// normal on first start; a file that exists but does not parse is
/// ignored with a warning. Both cases yield the defaults so the master
/// can still come up.
pub fn load_config(path: &str) -> FlotillaConfig {
    let Ok(raw) = std::fs::read_to_string(path) else {
        tracing::debug!("No config at {}, starting from defaults", path);
        return FlotillaConfig::default();
    };
    toml::from_str(&raw).unwrap_or_else(|e| {
        tracing::warn!("Ignoring unparseable config {}: {}", path, e);
        FlotillaConfig::default()
    })
}

/// Write configuration as TOML, creating missing parent directories.
pub fn save_config(config: &FlotillaConfig, path: &str) -> Result<(), CoreError> {
    let rendered = toml::to_string_pretty(config)?;
    let path = std::path::Path::new(path);
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)?,
        _ => {}
    }
    std::fs::write(path, rendered)?;
    tracing::debug!("Wrote config to {}", path.display());
    Ok(())
}
