use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::graph::Coord;

/// Default seed for random-removal trials.
pub const DEFAULT_SEED: u64 = 0x6772_6964_6c6f_636b;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub centrality: CentralityConfig,
    #[serde(default)]
    pub bridges: BridgeConfig,
    #[serde(default)]
    pub study_area: Option<StudyArea>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            enabled: default_true(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Removal percentages; level k is `floor(N * p / 100)`.
    #[serde(default = "default_fractions")]
    pub fractions: Vec<u32>,
    /// Number of random trials per series, e.g. `random_10`.
    #[serde(default = "default_trial_counts")]
    pub trial_counts: Vec<usize>,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_true")]
    pub parallel: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            fractions: default_fractions(),
            trial_counts: default_trial_counts(),
            seed: default_seed(),
            parallel: default_true(),
        }
    }
}

/// Distance used by closeness and betweenness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathMetric {
    /// Every edge costs one hop.
    #[default]
    Hops,
    /// Edge weights are distances.
    Length,
}

/// Which edges closeness follows from a vertex.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosenessMode {
    /// Edges are followed in either direction.
    #[default]
    Undirected,
    /// Only outgoing edges are followed.
    Outgoing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CentralityConfig {
    #[serde(default)]
    pub path_metric: PathMetric,
    #[serde(default)]
    pub closeness_mode: ClosenessMode,
}

/// How dominator edges are turned into strong bridges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeMode {
    /// Keep only edges whose removal disconnects H.
    #[default]
    Exact,
    /// Plain union of forward and reverse `idom(v) = u` edges.
    EdgeDominators,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_true")]
    pub exclude_loop_edges: bool,
    #[serde(default)]
    pub mode: BridgeMode,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            exclude_loop_edges: default_true(),
            mode: BridgeMode::default(),
        }
    }
}

/// Polygon of `[lon, lat]` points bounding the analyzed area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyArea {
    pub polygon: Vec<[f64; 2]>,
}

impl StudyArea {
    /// Even-odd point-in-polygon test. Points on an edge may land either side.
    #[must_use]
    pub fn contains(&self, point: Coord) -> bool {
        let n = self.polygon.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let [xi, yi] = self.polygon[i];
            let [xj, yj] = self.polygon[j];
            if (yi > point.y) != (yj > point.y)
                && point.x < (xj - xi) * (point.y - yi) / (yj - yi) + xi
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

impl AnalysisConfig {
    /// Reject values the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation.fractions.is_empty() {
            return Err(ConfigError::Invalid {
                field: "simulation.fractions",
                reason: "at least one removal percentage is required".into(),
            });
        }
        if let Some(p) = self
            .simulation
            .fractions
            .iter()
            .find(|p| !(1..=100).contains(*p))
        {
            return Err(ConfigError::Invalid {
                field: "simulation.fractions",
                reason: format!("{p} is outside 1..=100"),
            });
        }
        if self.simulation.trial_counts.contains(&0) {
            return Err(ConfigError::Invalid {
                field: "simulation.trial_counts",
                reason: "trial counts must be positive".into(),
            });
        }
        if self.cache.lock_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "cache.lock_timeout_ms",
                reason: "must be positive".into(),
            });
        }
        if let Some(area) = &self.study_area {
            if area.polygon.len() < 3 {
                return Err(ConfigError::Invalid {
                    field: "study_area.polygon",
                    reason: format!("needs at least 3 points, got {}", area.polygon.len()),
                });
            }
        }
        Ok(())
    }
}

/// Load and validate a config file. A missing file yields the defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, fails to parse, or
/// holds invalid values.
pub fn load_config(path: &Path) -> Result<AnalysisConfig> {
    if !path.exists() {
        return Ok(AnalysisConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config = toml::from_str::<AnalysisConfig>(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config
        .validate()
        .with_context(|| format!("Invalid config in {}", path.display()))?;
    Ok(config)
}

fn default_true() -> bool {
    true
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".gridlock/cache")
}

const fn default_lock_timeout_ms() -> u64 {
    5000
}

fn default_fractions() -> Vec<u32> {
    (1..=100).collect()
}

fn default_trial_counts() -> Vec<usize> {
    vec![10, 20, 100]
}

const fn default_seed() -> u64 {
    DEFAULT_SEED
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("gridlock.toml");
        std::fs::write(&path, content).expect("write config");
        path
    }

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let config = load_config(&dir.path().join("absent.toml"))?;
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.simulation.fractions.len(), 100);
        assert_eq!(config.simulation.trial_counts, vec![10, 20, 100]);
        assert!(config.cache.enabled);
        assert_eq!(config.bridges.mode, BridgeMode::Exact);
        Ok(())
    }

    #[test]
    fn partial_file_keeps_other_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write_config(
            &dir,
            r#"
[simulation]
trial_counts = [5]
seed = 7

[centrality]
path_metric = "length"
closeness_mode = "outgoing"

[bridges]
mode = "edge_dominators"
"#,
        );
        let config = load_config(&path)?;
        assert_eq!(config.simulation.trial_counts, vec![5]);
        assert_eq!(config.simulation.seed, 7);
        assert_eq!(config.simulation.fractions.len(), 100);
        assert_eq!(config.centrality.path_metric, PathMetric::Length);
        assert_eq!(config.centrality.closeness_mode, ClosenessMode::Outgoing);
        assert_eq!(config.bridges.mode, BridgeMode::EdgeDominators);
        assert!(config.bridges.exclude_loop_edges);
        Ok(())
    }

    #[test]
    fn malformed_file_is_parse_error() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write_config(&dir, "[simulation\nseed = ");
        let err = load_config(&path).expect_err("malformed");
        let config_err = err.downcast_ref::<ConfigError>().expect("typed error");
        assert_eq!(config_err.code(), crate::error::ErrorCode::ConfigParseError);
        Ok(())
    }

    #[test]
    fn out_of_range_fraction_is_rejected() {
        let mut config = AnalysisConfig::default();
        config.simulation.fractions = vec![0, 50];
        let err = config.validate().expect_err("0 is out of range");
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "simulation.fractions",
                ..
            }
        ));
    }

    #[test]
    fn zero_trial_count_is_rejected() {
        let mut config = AnalysisConfig::default();
        config.simulation.trial_counts = vec![10, 0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn degenerate_polygon_is_rejected() {
        let config = AnalysisConfig {
            study_area: Some(StudyArea {
                polygon: vec![[0.0, 0.0], [1.0, 1.0]],
            }),
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn study_area_contains_interior_points() {
        let square = StudyArea {
            polygon: vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]],
        };
        assert!(square.contains(Coord { x: 5.0, y: 5.0 }));
        assert!(!square.contains(Coord { x: 15.0, y: 5.0 }));
        assert!(!square.contains(Coord { x: -1.0, y: -1.0 }));
    }
}
