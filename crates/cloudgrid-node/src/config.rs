//! Node configuration – reads `cloudgrid.toml`.
//!
//! All values are read once at startup and fixed thereafter.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Startup configuration for the downsample node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Upper bound on points per emitted cluster.
    #[serde(default = "default_max_points")]
    pub max_points: usize,

    /// Cluster emission rate (clusters per second).
    #[serde(default = "default_rate")]
    pub rate: f64,

    /// When true, updating a known region id replaces the stored entry
    /// instead of also appending a duplicate (the upstream nodelet keeps
    /// the duplicate).
    #[serde(default)]
    pub dedup_on_update: bool,

    /// When true (upstream behavior), a merged cloud whose size is an
    /// exact multiple of `max_points` emits a trailing empty cluster.
    #[serde(default = "default_true")]
    pub trailing_empty_cluster: bool,
}

fn default_max_points() -> usize {
    300
}
fn default_rate() -> f64 {
    1.0
}
fn default_true() -> bool {
    true
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            max_points: default_max_points(),
            rate: default_rate(),
            dedup_on_update: false,
            trailing_empty_cluster: default_true(),
        }
    }
}

impl NodeConfig {
    /// Load the config from `path`.  A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let mut cfg = if path.exists() {
            let raw = fs::read_to_string(path)
                .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
            toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?
        } else {
            Self::default()
        };
        apply_env_overrides(&mut cfg);
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_points == 0 {
            return Err("max_points must be at least 1".to_string());
        }
        if !self.rate.is_finite() || self.rate <= 0.0 {
            return Err(format!("rate must be positive, got {}", self.rate));
        }
        Ok(())
    }
}

/// Apply `CLOUDGRID_*` environment variable overrides to `cfg`.
///
/// Supported variables:
///
/// | Variable | Config field |
/// |---|---|
/// | `CLOUDGRID_MAX_POINTS` | `max_points` |
/// | `CLOUDGRID_RATE` | `rate` |
pub fn apply_env_overrides(cfg: &mut NodeConfig) {
    if let Ok(v) = std::env::var("CLOUDGRID_MAX_POINTS")
        && let Ok(n) = v.parse::<usize>()
    {
        cfg.max_points = n;
    }
    if let Ok(v) = std::env::var("CLOUDGRID_RATE")
        && let Ok(r) = v.parse::<f64>()
    {
        cfg.rate = r;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_upstream_values() {
        let cfg = NodeConfig::default();
        assert_eq!(cfg.max_points, 300);
        assert!((cfg.rate - 1.0).abs() < f64::EPSILON);
        assert!(!cfg.dedup_on_update);
        assert!(cfg.trailing_empty_cluster);
    }

    #[test]
    fn load_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let cfg = NodeConfig::load_from(&dir.path().join("cloudgrid.toml")).expect("load");
        assert_eq!(cfg, NodeConfig::default());
    }

    #[test]
    fn load_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("cloudgrid.toml");
        fs::write(&path, "max_points = 50\n").expect("write");
        let cfg = NodeConfig::load_from(&path).expect("load");
        assert_eq!(cfg.max_points, 50);
        assert!((cfg.rate - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn load_rejects_zero_max_points() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("cloudgrid.toml");
        fs::write(&path, "max_points = 0\n").expect("write");
        assert!(NodeConfig::load_from(&path).is_err());
    }

    #[test]
    fn validate_rejects_nonpositive_rate() {
        let mut cfg = NodeConfig::default();
        cfg.rate = 0.0;
        assert!(cfg.validate().is_err());
        cfg.rate = -2.0;
        assert!(cfg.validate().is_err());
        cfg.rate = 5.0;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn apply_env_overrides_changes_max_points() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("CLOUDGRID_MAX_POINTS", "128") };
        let mut cfg = NodeConfig::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.max_points, 128);
        unsafe { std::env::remove_var("CLOUDGRID_MAX_POINTS") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_rate() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("CLOUDGRID_RATE", "not-a-rate") };
        let mut cfg = NodeConfig::default();
        apply_env_overrides(&mut cfg);
        assert!((cfg.rate - 1.0).abs() < f64::EPSILON);
        unsafe { std::env::remove_var("CLOUDGRID_RATE") };
    }

    #[test]
    fn roundtrip_toml() {
        let cfg = NodeConfig {
            max_points: 42,
            rate: 2.5,
            dedup_on_update: true,
            trailing_empty_cluster: false,
        };
        let raw = toml::to_string_pretty(&cfg).expect("serialize");
        let back: NodeConfig = toml::from_str(&raw).expect("parse");
        assert_eq!(cfg, back);
    }
}
