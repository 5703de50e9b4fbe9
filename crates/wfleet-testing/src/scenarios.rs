//! Concrete scenario builders
//!
//! One function per named case: bootstraps a store, a fleet, and (where
//! relevant) an order, and hands back a ready-to-run `SimulationRunner`
//! or a bare `World`/`Kernel` pair for cases that need to reach past the
//! runner's public surface (a custom grid, robots parked off the
//! standard layout).

use std::sync::Arc;

use wfleet_core::{ItemId, OrderId, RobotId};
use wfleet_entities::Robot;
use wfleet_map::{CellType, Grid};
use wfleet_sim::{fleet, world, SimulationRunner, World};
use wfleet_storage::{ItemRow, MemStore, OrderItemRow, OrderRow, OrderStatus, Store};

/// Scenario 1: a single robot, an empty order backlog. Nothing should
/// ever move; the robot idles at its parking cell.
pub fn single_agent_empty_world() -> SimulationRunner {
    let store: Arc<dyn Store> = Arc::new(MemStore::new());
    SimulationRunner::new(1, store, &[76], 60.0, 0.0)
}

/// Scenario 1b: a single robot with one order it can fully satisfy from
/// the nearest pallet.
pub fn single_agent_one_order(quantity: u32) -> (SimulationRunner, OrderId) {
    let store: Arc<dyn Store> = Arc::new(MemStore::new());
    let mut runner = SimulationRunner::new(1, store, &[76], 900.0, 0.0);

    let item_id = runner.world().store.list_items()[0].id;
    let order_id = OrderId(1);
    runner.admit_order(
        OrderRow { id: order_id, created_at: 0.0, status: OrderStatus::Pending },
        vec![OrderItemRow { id: 0, order_id, item_id, quantity }],
    );
    (runner, order_id)
}

/// Scenario 2: two robots placed on adjacent free cells away from their
/// parking spots, each given an order whose nearest pallet sits past the
/// other robot, forcing their motion to contend for the corridor between
/// them. Exercises the reservation registry's collision-avoidance and
/// deadlock-retreat path under contention rather than idle motion.
pub fn head_on_pair() -> World {
    let store: Arc<dyn Store> = Arc::new(MemStore::new());
    fleet::seed_default_layout(store.as_ref(), 20);

    let mut world = World::new(2, store);

    let a = RobotId(76);
    let b = RobotId(77);
    let robot_a = Robot::new(a, "robot-76", (10, 5), world::charging_cell_for(0), world::parking_cell_for(0));
    let robot_b = Robot::new(b, "robot-77", (11, 5), world::charging_cell_for(1), world::parking_cell_for(1));

    world.store.put_robot(robot_a.to_row());
    world.store.put_robot(robot_b.to_row());
    world.robots.insert(a, robot_a);
    world.robots.insert(b, robot_b);
    world.tasks.insert(a, wfleet_sim::AgentTask::new());
    world.tasks.insert(b, wfleet_sim::AgentTask::new());

    let item_id = world.store.list_items()[0].id;
    world.store.put_order(OrderRow { id: OrderId(1), created_at: 0.0, status: OrderStatus::Pending });
    world.store.put_order_item(OrderItemRow { id: 0, order_id: OrderId(1), item_id, quantity: 1 });

    world
}

/// Scenario 3: a robot whose every 4-neighbor is a pallet. No retreat
/// cell can ever be selected for it, regardless of registry occupancy.
pub fn boxed_in_no_capacity() -> (Grid, RobotId, (i32, i32)) {
    let mut grid = Grid::new(3, 3);
    for cell in [(0, 1), (2, 1), (1, 0), (1, 2)] {
        grid.set_cell_type(cell, CellType::Pallet);
    }
    (grid, RobotId(76), (1, 1))
}

/// Scenario 4: the order's only line references an item with zero pallet
/// stock anywhere in the warehouse. Claiming must fail outright rather
/// than hang waiting for stock that will never arrive.
pub fn unavailable_order() -> (SimulationRunner, OrderId) {
    let store: Arc<dyn Store> = Arc::new(MemStore::new());
    store.put_item(ItemRow { id: ItemId(99), name: "phantom-sku".into() });
    // No pallet ever carries item 99.
    let mut runner = SimulationRunner::new(1, store, &[76], 120.0, 0.0);

    let order_id = OrderId(1);
    runner.admit_order(
        OrderRow { id: order_id, created_at: 0.0, status: OrderStatus::Pending },
        vec![OrderItemRow { id: 0, order_id, item_id: ItemId(99), quantity: 1 }],
    );
    (runner, order_id)
}

/// Scenario 5: a robot parked at a battery level too low to clear the
/// three-leg safety margin for even the closest pallet. It must divert
/// to its charger instead of claiming the order, which stays `Pending`.
pub fn low_battery_admission() -> (SimulationRunner, OrderId) {
    let store: Arc<dyn Store> = Arc::new(MemStore::new());
    let mut runner = SimulationRunner::new(1, store, &[76], 120.0, 0.0);

    if let Some(robot) = runner.world_mut().get_robot_mut(RobotId(76)) {
        robot.battery = 5.0;
    }

    let item_id = runner.world().store.list_items()[0].id;
    let order_id = OrderId(1);
    runner.admit_order(
        OrderRow { id: order_id, created_at: 0.0, status: OrderStatus::Pending },
        vec![OrderItemRow { id: 0, order_id, item_id, quantity: 1 }],
    );
    (runner, order_id)
}

/// Scenario 6: two concurrent orders for two different items. A busy
/// shelf must never hold stock belonging to more than one order at once.
pub fn shelf_purity_contention() -> (SimulationRunner, OrderId, OrderId) {
    let store: Arc<dyn Store> = Arc::new(MemStore::new());
    let mut runner = SimulationRunner::new(1, store, &[76, 77], 900.0, 0.0);

    let items = runner.world().store.list_items();
    let item_a = items[0].id;
    let item_b = items[1].id;

    let order_a = OrderId(1);
    let order_b = OrderId(2);
    runner.admit_order(
        OrderRow { id: order_a, created_at: 0.0, status: OrderStatus::Pending },
        vec![OrderItemRow { id: 0, order_id: order_a, item_id: item_a, quantity: 1 }],
    );
    runner.admit_order(
        OrderRow { id: order_b, created_at: 0.0, status: OrderStatus::Pending },
        vec![OrderItemRow { id: 1, order_id: order_b, item_id: item_b, quantity: 1 }],
    );
    (runner, order_a, order_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_agent_empty_world_never_moves() {
        let mut runner = single_agent_empty_world();
        let report = runner.run();
        assert_eq!(report.order_outcomes.done, 0);
        assert_eq!(report.order_outcomes.partial, 0);
        assert_eq!(report.order_outcomes.failed, 0);
    }

    #[test]
    fn test_single_agent_one_order_completes() {
        let (mut runner, order_id) = single_agent_one_order(3);
        runner.run();
        let order = runner.world().store.get_order(order_id).unwrap();
        assert_ne!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn test_boxed_in_robot_has_no_retreat_cell() {
        let (grid, robot, from) = boxed_in_no_capacity();
        let registry = wfleet_map::ReservationRegistry::new();
        let mut rng = wfleet_core::SimRng::new(7);
        let cell = wfleet_policies::select_retreat_cell(&grid, &registry, robot, from, &mut rng);
        assert!(cell.is_none());
    }

    #[test]
    fn test_unavailable_order_fails_immediately() {
        let (mut runner, order_id) = unavailable_order();
        runner.run();
        let order = runner.world().store.get_order(order_id).unwrap();
        assert_eq!(order.status, OrderStatus::Failed);
    }

    #[test]
    fn test_low_battery_robot_defers_claim() {
        let (mut runner, order_id) = low_battery_admission();
        runner.run();
        let order = runner.world().store.get_order(order_id).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn test_shelf_purity_holds_across_two_orders() {
        let (mut runner, order_a, order_b) = shelf_purity_contention();
        runner.run();
        for shelf in runner.world().store.list_shelves() {
            if let Some(order_id) = shelf.order_id {
                assert!(order_id == order_a || order_id == order_b);
            }
        }
    }

    #[test]
    fn test_head_on_pair_never_lets_two_robots_share_a_cell() {
        let mut world = head_on_pair();
        let ids: Vec<RobotId> = world.robots.keys().copied().collect();
        for tick in 0..200 {
            for &id in &ids {
                wfleet_sim::agent::on_wake(&mut world, id, tick as f64);
            }
            let positions: Vec<_> = world.robots.values().map(|r| r.position).collect();
            assert_ne!(positions[0], positions[1]);
        }
    }
}
