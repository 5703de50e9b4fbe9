//! World state container
//!
//! Everything the agent control loop needs, gathered in one place so
//! `handlers.rs` doesn't have to thread a dozen parameters through every
//! call. `World` owns no simulation time of its own — that lives on the
//! `Kernel` in `runner.rs`.

use std::collections::HashMap;
use std::sync::Arc;

use wfleet_core::{IdGenerator, OrderId, RobotId, SimRng};
use wfleet_map::{Grid, ReservationRegistry, Router};
use wfleet_metrics::MetricsCollector;
use wfleet_policies::EnergyModel;
use wfleet_storage::Store;

use crate::agent::AgentTask;

/// Every robot identifier `76+k` is assigned charging cell `(19, 2+k)`
/// and parking cell `(18, 2+k)`, per the operator surface's static map.
pub fn charging_cell_for(robot_index: u32) -> (i32, i32) {
    (19, 2 + robot_index as i32)
}

pub fn parking_cell_for(robot_index: u32) -> (i32, i32) {
    (18, 2 + robot_index as i32)
}

pub struct World {
    pub rng: SimRng,
    pub grid: Grid,
    pub registry: ReservationRegistry,
    pub router: Router,
    pub store: Arc<dyn Store>,
    pub energy: EnergyModel,
    pub metrics: MetricsCollector,
    pub robots: HashMap<RobotId, wfleet_entities::Robot>,
    pub tasks: HashMap<RobotId, AgentTask>,
    pub order_id_gen: IdGenerator<OrderId>,
}

impl World {
    pub fn new(seed: u64, store: Arc<dyn Store>) -> Self {
        Self {
            rng: SimRng::new(seed),
            grid: Grid::default_layout(),
            registry: ReservationRegistry::new(),
            router: Router::new(),
            store,
            energy: EnergyModel::default(),
            metrics: MetricsCollector::new(),
            robots: HashMap::new(),
            tasks: HashMap::new(),
            order_id_gen: IdGenerator::new(),
        }
    }

    pub fn next_order_id(&mut self) -> OrderId {
        self.order_id_gen.next_id()
    }

    pub fn get_robot(&self, id: RobotId) -> Option<&wfleet_entities::Robot> {
        self.robots.get(&id)
    }

    pub fn get_robot_mut(&mut self, id: RobotId) -> Option<&mut wfleet_entities::Robot> {
        self.robots.get_mut(&id)
    }

    /// Persist a robot's current physical state so external observers
    /// (the operator surface, §6) always see fresh data.
    pub fn write_through_robot(&self, id: RobotId) {
        if let Some(robot) = self.robots.get(&id) {
            self.store.put_robot(robot.to_row());
        }
    }

    /// True if a free, unreserved neighbor exists for `robot` at its
    /// current position — used by the deadlock-retreat priority rule.
    pub fn has_free_neighbor(&self, robot: RobotId) -> bool {
        let Some(r) = self.robots.get(&robot) else { return false };
        self.grid.neighbors(r.position).any(|n| {
            matches!(self.grid.cell_type(n), Some(ct) if ct.is_walkable()) && self.registry.owner_of(n).is_none()
        })
    }
}
