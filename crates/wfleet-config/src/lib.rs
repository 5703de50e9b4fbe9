//! Wfleet Config - scenario and warehouse-dimension configuration

pub mod scenario;

pub use scenario::{parse_robot_list, ConfigError, ScenarioConfig, WarehouseConfig, DEFAULT_ROBOT_IDS};
