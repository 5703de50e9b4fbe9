//! Wfleet Metrics - simulation diagnostics collection and reporting (C8)

pub mod collector;
pub mod report;

pub use collector::{MetricsCollector, RobotSnapshot};
pub use report::{OrderOutcomeReport, OrderStatusReport, RobotReport, RunReport};
