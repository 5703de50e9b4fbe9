//! Run-time metrics collection (C8)
//!
//! Accumulates the counters and snapshots that feed `report::RunReport`.
//! Collection is push-based: the agent loop and reservation registry
//! report events as they happen rather than the collector polling state,
//! so the cost of metrics is proportional to actual activity.

use std::collections::HashMap;

use wfleet_core::{OrderId, RobotId};
use wfleet_storage::OrderStatus;

/// A single robot's state at the moment it was last sampled.
#[derive(Clone, Debug)]
pub struct RobotSnapshot {
    pub robot_id: RobotId,
    pub status: String,
    pub x: i32,
    pub y: i32,
    pub battery: f64,
}

#[derive(Clone, Default)]
pub struct MetricsCollector {
    robot_snapshots: HashMap<RobotId, RobotSnapshot>,
    order_status: HashMap<OrderId, OrderStatus>,
    deadlock_chains_resolved: u64,
    retreat_maneuvers_executed: u64,
    retreat_maneuvers_failed: u64,
    cannot_retreat_events: u64,
    order_completion_times_s: Vec<f64>,
    orders_done: u32,
    orders_partial: u32,
    orders_failed: u32,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_robot_snapshot(&mut self, snapshot: RobotSnapshot) {
        self.robot_snapshots.insert(snapshot.robot_id, snapshot);
    }

    pub fn record_order_status(&mut self, order_id: OrderId, status: OrderStatus) {
        self.order_status.insert(order_id, status);
    }

    pub fn record_deadlock_chain_resolved(&mut self) {
        self.deadlock_chains_resolved += 1;
    }

    pub fn record_retreat_maneuver(&mut self, succeeded: bool) {
        if succeeded {
            self.retreat_maneuvers_executed += 1;
        } else {
            self.retreat_maneuvers_failed += 1;
        }
    }

    pub fn record_cannot_retreat(&mut self) {
        self.cannot_retreat_events += 1;
    }

    pub fn record_order_completion(&mut self, cycle_time_s: f64, status: OrderStatus) {
        self.order_completion_times_s.push(cycle_time_s);
        match status {
            OrderStatus::Done => self.orders_done += 1,
            OrderStatus::Partial => self.orders_partial += 1,
            OrderStatus::Failed => self.orders_failed += 1,
            _ => {}
        }
    }

    pub fn robot_snapshots(&self) -> impl Iterator<Item = &RobotSnapshot> {
        self.robot_snapshots.values()
    }

    pub fn order_status(&self) -> &HashMap<OrderId, OrderStatus> {
        &self.order_status
    }

    pub fn deadlock_chains_resolved(&self) -> u64 {
        self.deadlock_chains_resolved
    }

    pub fn retreat_maneuvers_executed(&self) -> u64 {
        self.retreat_maneuvers_executed
    }

    pub fn retreat_maneuvers_failed(&self) -> u64 {
        self.retreat_maneuvers_failed
    }

    pub fn cannot_retreat_events(&self) -> u64 {
        self.cannot_retreat_events
    }

    pub fn orders_done(&self) -> u32 {
        self.orders_done
    }

    pub fn orders_partial(&self) -> u32 {
        self.orders_partial
    }

    pub fn orders_failed(&self) -> u32 {
        self.orders_failed
    }

    pub fn avg_cycle_time_s(&self) -> f64 {
        if self.order_completion_times_s.is_empty() {
            0.0
        } else {
            self.order_completion_times_s.iter().sum::<f64>() / self.order_completion_times_s.len() as f64
        }
    }

    pub fn p95_cycle_time_s(&self) -> f64 {
        if self.order_completion_times_s.is_empty() {
            return 0.0;
        }
        let mut sorted = self.order_completion_times_s.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let idx = (sorted.len() as f64 * 0.95) as usize;
        sorted.get(idx.min(sorted.len() - 1)).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_read_robot_snapshot() {
        let mut c = MetricsCollector::new();
        c.record_robot_snapshot(RobotSnapshot { robot_id: RobotId(76), status: "idle".into(), x: 18, y: 2, battery: 99.0 });
        assert_eq!(c.robot_snapshots().count(), 1);
    }

    #[test]
    fn test_retreat_maneuver_counters() {
        let mut c = MetricsCollector::new();
        c.record_retreat_maneuver(true);
        c.record_retreat_maneuver(false);
        assert_eq!(c.retreat_maneuvers_executed(), 1);
        assert_eq!(c.retreat_maneuvers_failed(), 1);
    }

    #[test]
    fn test_order_completion_tallies_by_status() {
        let mut c = MetricsCollector::new();
        c.record_order_completion(120.0, OrderStatus::Done);
        c.record_order_completion(200.0, OrderStatus::Partial);
        assert_eq!(c.orders_done(), 1);
        assert_eq!(c.orders_partial(), 1);
        assert_eq!(c.avg_cycle_time_s(), 160.0);
    }

    #[test]
    fn test_p95_cycle_time_with_single_sample() {
        let mut c = MetricsCollector::new();
        c.record_order_completion(50.0, OrderStatus::Done);
        assert_eq!(c.p95_cycle_time_s(), 50.0);
    }
}
