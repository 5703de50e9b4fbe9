//! Run report (C8)
//!
//! A plain serde-serializable snapshot of one simulation run, built from
//! a `MetricsCollector` plus whatever routing statistics the caller
//! wants included. Rendering this to HTML/PDF/charts is out of scope;
//! `to_json` is the only emitter.

use serde::Serialize;
use std::collections::HashMap;

use wfleet_core::{OrderId, RobotId};
use wfleet_map::AlgorithmStats;
use wfleet_storage::OrderStatus;

use crate::collector::MetricsCollector;

#[derive(Clone, Debug, Serialize)]
pub struct RobotReport {
    pub robot_id: RobotId,
    pub status: String,
    pub x: i32,
    pub y: i32,
    pub battery: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderStatusReport {
    pub order_id: OrderId,
    pub status: OrderStatus,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct OrderOutcomeReport {
    pub done: u32,
    pub partial: u32,
    pub failed: u32,
    pub avg_cycle_time_s: f64,
    pub p95_cycle_time_s: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub robots: Vec<RobotReport>,
    pub orders: Vec<OrderStatusReport>,
    pub order_outcomes: OrderOutcomeReport,
    pub cells_reserved: usize,
    pub deadlock_chains_resolved: u64,
    pub retreat_maneuvers_executed: u64,
    pub retreat_maneuvers_failed: u64,
    pub cannot_retreat_events: u64,
    pub routing_stats: HashMap<String, AlgorithmStats>,
}

impl RunReport {
    pub fn build(
        collector: &MetricsCollector,
        cells_reserved: usize,
        routing_stats: HashMap<String, AlgorithmStats>,
    ) -> Self {
        let robots = collector
            .robot_snapshots()
            .map(|s| RobotReport { robot_id: s.robot_id, status: s.status.clone(), x: s.x, y: s.y, battery: s.battery })
            .collect();
        let orders = collector
            .order_status()
            .iter()
            .map(|(&order_id, &status)| OrderStatusReport { order_id, status })
            .collect();

        Self {
            robots,
            orders,
            order_outcomes: OrderOutcomeReport {
                done: collector.orders_done(),
                partial: collector.orders_partial(),
                failed: collector.orders_failed(),
                avg_cycle_time_s: collector.avg_cycle_time_s(),
                p95_cycle_time_s: collector.p95_cycle_time_s(),
            },
            cells_reserved,
            deadlock_chains_resolved: collector.deadlock_chains_resolved(),
            retreat_maneuvers_executed: collector.retreat_maneuvers_executed(),
            retreat_maneuvers_failed: collector.retreat_maneuvers_failed(),
            cannot_retreat_events: collector.cannot_retreat_events(),
            routing_stats,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::RobotSnapshot;

    #[test]
    fn test_build_report_from_collector() {
        let mut c = MetricsCollector::new();
        c.record_robot_snapshot(RobotSnapshot { robot_id: RobotId(76), status: "idle".into(), x: 18, y: 2, battery: 99.0 });
        c.record_order_status(OrderId(1), OrderStatus::Done);
        c.record_order_completion(100.0, OrderStatus::Done);

        let report = RunReport::build(&c, 3, HashMap::new());
        assert_eq!(report.robots.len(), 1);
        assert_eq!(report.orders.len(), 1);
        assert_eq!(report.order_outcomes.done, 1);
        assert_eq!(report.cells_reserved, 3);
    }

    #[test]
    fn test_report_serializes_to_json() {
        let c = MetricsCollector::new();
        let report = RunReport::build(&c, 0, HashMap::new());
        let json = report.to_json().unwrap();
        assert!(json.contains("\"robots\""));
        assert!(json.contains("\"cells_reserved\""));
    }
}
