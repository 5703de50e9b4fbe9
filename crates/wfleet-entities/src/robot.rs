//! Robot runtime state
//!
//! `Robot` is the in-memory counterpart of `wfleet_storage::RobotRow`: the
//! control loop (`wfleet-sim::agent`) mutates a `Robot`, and writes it
//! through to the persistence gateway after every motion step and state
//! transition so external observers always see fresh state.

use wfleet_core::{OrderId, RobotId};
use wfleet_map::Cell;
use wfleet_storage::{RobotRow, RobotStatus};

/// Battery thresholds, shared by every robot in the fleet.
#[derive(Clone, Copy, Debug)]
pub struct BatteryThresholds {
    pub critical: f64,
    pub low: f64,
    pub resume: f64,
    pub full: f64,
}

impl Default for BatteryThresholds {
    fn default() -> Self {
        Self { critical: 10.0, low: 20.0, resume: 30.0, full: 100.0 }
    }
}

/// A line item the robot is currently carrying toward delivery.
#[derive(Clone, Debug)]
pub struct CarriedItem {
    pub item_id: wfleet_core::ItemId,
    pub order_id: OrderId,
    pub quantity: u32,
}

/// High-level control-loop state. `RobotStatus` (the storage row's
/// version) is the externally-visible projection of this; several of
/// these states map to `RobotStatus::Moving` since the distinction
/// between e.g. "moving to a pallet" and "retreating" only matters
/// internally.
#[derive(Clone, Debug, PartialEq)]
pub enum RobotState {
    Idle,
    Moving,
    Waiting,
    Charging,
    Retreating,
    Processing(OrderId),
    Terminating,
}

/// A robot in the fleet: identity, physical state, and whatever it's
/// currently carrying. Everything about task execution (which order,
/// which line item, how many attempts remain) lives on the agent that
/// owns this robot, not here — `Robot` is the physical half.
#[derive(Clone, Debug)]
pub struct Robot {
    pub id: RobotId,
    pub name: String,
    pub state: RobotState,
    pub position: Cell,
    pub battery: f64,
    pub charging_cell: Cell,
    pub parking_cell: Cell,
    pub max_payload_kg: f64,
    pub empty_mass_kg: f64,
    pub capacity_units: u32,
    pub carrying: Vec<CarriedItem>,
    pub thresholds: BatteryThresholds,
    pub is_charging: bool,
}

impl Robot {
    pub fn new(id: RobotId, name: impl Into<String>, position: Cell, charging_cell: Cell, parking_cell: Cell) -> Self {
        Self {
            id,
            name: name.into(),
            state: RobotState::Idle,
            position,
            battery: 100.0,
            charging_cell,
            parking_cell,
            max_payload_kg: 20.0,
            empty_mass_kg: 50.0,
            capacity_units: 6,
            carrying: Vec::new(),
            thresholds: BatteryThresholds::default(),
            is_charging: false,
        }
    }

    pub fn with_battery(mut self, battery: f64) -> Self {
        self.battery = battery;
        self
    }

    pub fn carried_units(&self) -> u32 {
        self.carrying.iter().map(|c| c.quantity).sum()
    }

    pub fn has_capacity_for(&self, qty: u32) -> bool {
        self.carried_units() + qty <= self.capacity_units
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, RobotState::Idle)
    }

    pub fn is_battery_critical(&self) -> bool {
        self.battery <= self.thresholds.critical
    }

    pub fn needs_charging(&self) -> bool {
        self.battery < self.thresholds.low
    }

    pub fn can_resume_from_charging(&self, has_pending_work: bool) -> bool {
        self.battery >= self.thresholds.full
            || (has_pending_work && self.battery >= self.thresholds.resume)
    }

    /// Payload mass used by the energy model: configured max while the
    /// robot is carrying anything, zero while running empty.
    pub fn current_payload_kg(&self) -> f64 {
        if self.carrying.is_empty() { 0.0 } else { self.max_payload_kg }
    }

    pub fn to_row(&self) -> RobotRow {
        let status = match &self.state {
            RobotState::Idle => RobotStatus::Idle,
            RobotState::Moving | RobotState::Waiting | RobotState::Retreating => RobotStatus::Moving,
            RobotState::Charging => RobotStatus::Charging,
            RobotState::Processing(order_id) => RobotStatus::Processing(*order_id),
            RobotState::Terminating => RobotStatus::Idle,
        };
        RobotRow {
            id: self.id,
            name: self.name.clone(),
            status,
            x: self.position.0,
            y: self.position.1,
            battery: self.battery,
            updated_at: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn robot() -> Robot {
        Robot::new(RobotId(76), "R76", (18, 2), (19, 2), (18, 2))
    }

    #[test]
    fn test_new_robot_is_idle_and_full() {
        let r = robot();
        assert!(r.is_idle());
        assert_eq!(r.battery, 100.0);
    }

    #[test]
    fn test_battery_thresholds() {
        let mut r = robot().with_battery(9.0);
        assert!(r.is_battery_critical());
        r.battery = 19.0;
        assert!(r.needs_charging());
        assert!(!r.is_battery_critical());
    }

    #[test]
    fn test_resume_from_charging_needs_pending_work_at_30() {
        let r = robot().with_battery(30.0);
        assert!(!r.can_resume_from_charging(false));
        assert!(r.can_resume_from_charging(true));
    }

    #[test]
    fn test_capacity() {
        let mut r = robot();
        assert!(r.has_capacity_for(6));
        r.carrying.push(CarriedItem { item_id: wfleet_core::ItemId(1), order_id: OrderId(1), quantity: 4 });
        assert!(r.has_capacity_for(2));
        assert!(!r.has_capacity_for(3));
    }
}
