//! Scenario configuration: seed, fleet selection, warehouse dimensions
//!
//! Loaded from YAML/JSON via `ScenarioConfig::from_file`, or built
//! directly by the CLI from a comma-separated `--robots` argument.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported file format")]
    UnsupportedFormat,
}

/// The built-in fallback fleet, used when no `--robots` argument is given.
pub const DEFAULT_ROBOT_IDS: &[u32] = &[76, 77, 78];

/// `W x H` grid dimensions. The default layout (`wfleet_map::Grid::default_layout`)
/// is fixed at 20x41; this struct exists so a scenario file can still
/// declare the dimensions explicitly for documentation/validation purposes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WarehouseConfig {
    #[serde(default = "default_width")]
    pub width: i32,
    #[serde(default = "default_height")]
    pub height: i32,
}

fn default_width() -> i32 {
    20
}

fn default_height() -> i32 {
    41
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self { width: default_width(), height: default_height() }
    }
}

/// Top-level scenario: RNG seed plus the fleet to instantiate.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioConfig {
    pub seed: u64,
    #[serde(default)]
    pub warehouse: WarehouseConfig,
    pub robot_ids: Vec<u32>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self { seed: 0, warehouse: WarehouseConfig::default(), robot_ids: DEFAULT_ROBOT_IDS.to_vec() }
    }
}

impl ScenarioConfig {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        if path.ends_with(".json") {
            Ok(serde_json::from_str(&content)?)
        } else if path.ends_with(".yaml") || path.ends_with(".yml") {
            Ok(serde_yaml::from_str(&content)?)
        } else {
            Err(ConfigError::UnsupportedFormat)
        }
    }

    /// Build a scenario from the CLI's `--robots` argument: a
    /// comma-separated list of robot identifiers, falling back to
    /// `DEFAULT_ROBOT_IDS` when absent or empty.
    pub fn with_robot_list(seed: u64, robots_arg: Option<&str>) -> Result<Self, ConfigError> {
        let robot_ids = match robots_arg.map(str::trim).filter(|s| !s.is_empty()) {
            Some(csv) => parse_robot_list(csv)?,
            None => DEFAULT_ROBOT_IDS.to_vec(),
        };
        Ok(Self { seed, warehouse: WarehouseConfig::default(), robot_ids })
    }
}

/// Parse a comma-separated list of robot identifiers, e.g. `"76,77,78"`.
pub fn parse_robot_list(csv: &str) -> Result<Vec<u32>, ConfigError> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u32>().map_err(|e| ConfigError::Validation(format!("invalid robot id '{s}': {e}"))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_robot_list() {
        assert_eq!(parse_robot_list("76,77,78").unwrap(), vec![76, 77, 78]);
    }

    #[test]
    fn test_parse_robot_list_trims_whitespace() {
        assert_eq!(parse_robot_list(" 76 , 77 ").unwrap(), vec![76, 77]);
    }

    #[test]
    fn test_parse_robot_list_rejects_non_numeric() {
        assert!(parse_robot_list("76,abc").is_err());
    }

    #[test]
    fn test_with_robot_list_falls_back_to_default() {
        let cfg = ScenarioConfig::with_robot_list(1, None).unwrap();
        assert_eq!(cfg.robot_ids, DEFAULT_ROBOT_IDS.to_vec());
    }

    #[test]
    fn test_with_robot_list_empty_string_falls_back_to_default() {
        let cfg = ScenarioConfig::with_robot_list(1, Some("  ")).unwrap();
        assert_eq!(cfg.robot_ids, DEFAULT_ROBOT_IDS.to_vec());
    }

    #[test]
    fn test_with_robot_list_uses_provided_list() {
        let cfg = ScenarioConfig::with_robot_list(1, Some("76,79")).unwrap();
        assert_eq!(cfg.robot_ids, vec![76, 79]);
    }

    #[test]
    fn test_default_warehouse_dimensions() {
        let cfg = WarehouseConfig::default();
        assert_eq!((cfg.width, cfg.height), (20, 41));
    }
}
