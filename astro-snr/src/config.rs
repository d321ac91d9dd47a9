//! Pipeline configuration
//!
//! Every stage option has a default, so a JSON file only needs to name the
//! settings it changes:
//!
//! ```json
//! { "cluster": "optimal_split", "regions": { "fill_holes": true } }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::image_proc::{ClusterStrategy, NormalizeOptions, RegionOptions, ThresholdStrategy};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Options for each pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SnrConfig {
    pub normalize: NormalizeOptions,
    pub threshold: ThresholdStrategy,
    pub regions: RegionOptions,
    pub cluster: ClusterStrategy,
}

impl SnrConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&content)?;
        log::debug!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Write as pretty-printed JSON
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_proc::NormalizeMode;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SnrConfig =
            serde_json::from_str(r#"{ "cluster": "optimal_split", "regions": { "fill_holes": true } }"#)
                .unwrap();

        assert_eq!(config.cluster, ClusterStrategy::OptimalSplit);
        assert!(config.regions.fill_holes);
        assert_eq!(config.regions.min_area, 1);
        assert_eq!(config.threshold, ThresholdStrategy::Otsu { bins: 256 });
        assert_eq!(config.normalize, NormalizeOptions::default());
    }

    #[test]
    fn test_strategy_json_shapes() {
        let config: SnrConfig = serde_json::from_str(
            r#"{
                "normalize": { "mode": "min_max", "ceiling": 1.0 },
                "threshold": { "fixed": { "value": 0.5 } },
                "cluster": { "k_means": { "max_iterations": 10 } }
            }"#,
        )
        .unwrap();

        assert_eq!(config.normalize.mode, NormalizeMode::MinMax);
        assert_eq!(config.threshold, ThresholdStrategy::Fixed { value: 0.5 });
        assert_eq!(config.cluster, ClusterStrategy::KMeans { max_iterations: 10 });
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snr.json");

        let config = SnrConfig {
            cluster: ClusterStrategy::OptimalSplit,
            ..Default::default()
        };
        config.save_json(&path).unwrap();

        assert_eq!(SnrConfig::load_json(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            SnrConfig::load_json(&path),
            Err(ConfigError::Json(_))
        ));
    }
}
