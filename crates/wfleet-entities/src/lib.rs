//! Wfleet Entities - runtime views over robots and orders

pub mod order;
pub mod robot;

pub use order::{Order, OrderLine};
pub use robot::{BatteryThresholds, CarriedItem, Robot, RobotState};
