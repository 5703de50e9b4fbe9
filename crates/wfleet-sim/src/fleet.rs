//! Fleet bootstrap (C7)
//!
//! Instantiates one agent per selected robot identifier and seeds the
//! default warehouse layout (pallets, shelves, items, initial stock) into
//! the persistence gateway. Each robot becomes an independent schedulable
//! entity inside the kernel: a single `AgentWake` event gets the whole
//! chain going.

use std::sync::Arc;

use wfleet_core::{Kernel, PalletId, RobotId, ShelfId, SimEvent, SimTime};
use wfleet_entities::Robot;
use wfleet_storage::{ItemRow, PalletRow, ShelfRow, ShelfStatus, Store};

use crate::agent::AgentTask;
use crate::world::{charging_cell_for, parking_cell_for, World};

/// Seeds the reference warehouse layout (§6): 30 pallets on the 5x6
/// subgrid, 120 shelves in 3 lanes, and a handful of SKUs distributed
/// across the pallets with a modest initial stock level.
pub fn seed_default_layout(store: &dyn Store, items_per_pallet_qty: u32) {
    let mut pallet_id = 0u32;
    let mut item_id = 0u32;
    let pallet_xs = [6, 8, 10, 12, 14];
    let pallet_ys = [2, 4, 6, 8, 10, 12];

    for &x in &pallet_xs {
        for &y in &pallet_ys {
            store.put_item(ItemRow { id: wfleet_core::ItemId(item_id), name: format!("sku-{item_id}") });
            store.put_pallet(PalletRow { id: PalletId(pallet_id), label: format!("P{pallet_id}"), x, y });
            store.seed_pallet_stock(wfleet_core::ItemId(item_id), PalletId(pallet_id), items_per_pallet_qty);
            pallet_id += 1;
            item_id += 1;
        }
    }

    let mut shelf_id = 0u32;
    for y in 1..=40 {
        for lane in [1, 2, 3] {
            store.put_shelf(ShelfRow {
                id: ShelfId(shelf_id),
                shelf_code: format!("{y}-{lane}"),
                x: lane,
                y,
                capacity: 50,
                status: ShelfStatus::Free,
                robot_id: None,
                order_id: None,
                updated_at: 0.0,
            });
            shelf_id += 1;
        }
    }
}

/// Instantiates one `Robot`/`AgentTask` per `robot_ids` entry, assigns
/// charging/parking cells by fleet index (not by the robot's raw
/// identifier — the `76+k` convention only holds for the default fleet),
/// writes each robot's initial row through to the store, and schedules
/// its first `AgentWake`.
pub fn spawn_fleet(world: &mut World, kernel: &mut Kernel, robot_ids: &[u32]) {
    for (k, &raw_id) in robot_ids.iter().enumerate() {
        let robot_id = RobotId(raw_id);
        let charging_cell = charging_cell_for(k as u32);
        let parking_cell = parking_cell_for(k as u32);

        let robot = Robot::new(robot_id, format!("robot-{raw_id}"), parking_cell, charging_cell, parking_cell);
        world.store.put_robot(robot.to_row());
        world.robots.insert(robot_id, robot);
        world.tasks.insert(robot_id, AgentTask::new());

        kernel.schedule_at(SimTime::ZERO, SimEvent::AgentWake { robot_id });
    }
}

/// Build a `World` wired to `store`, seed the default layout if the
/// store has no pallets yet (so re-running against a persisted sled
/// database doesn't duplicate stock), and spawn the fleet.
pub fn bootstrap(seed: u64, store: Arc<dyn Store>, robot_ids: &[u32], kernel: &mut Kernel) -> World {
    if store.list_pallets().is_empty() {
        seed_default_layout(store.as_ref(), 20);
    }
    let mut world = World::new(seed, store);
    spawn_fleet(&mut world, kernel, robot_ids);
    world
}

#[cfg(test)]
mod tests {
    use super::*;
    use wfleet_storage::MemStore;

    #[test]
    fn test_seed_default_layout_creates_30_pallets_and_120_shelves() {
        let store = MemStore::new();
        seed_default_layout(&store, 10);
        assert_eq!(store.list_pallets().len(), 30);
        assert_eq!(store.list_shelves().len(), 120);
    }

    #[test]
    fn test_spawn_fleet_assigns_sequential_charging_cells() {
        let store: Arc<dyn Store> = Arc::new(MemStore::new());
        let mut kernel = Kernel::new();
        let mut world = World::new(1, store);
        spawn_fleet(&mut world, &mut kernel, &[76, 77]);

        assert_eq!(world.robots.len(), 2);
        assert_eq!(world.get_robot(RobotId(76)).unwrap().charging_cell, (19, 2));
        assert_eq!(world.get_robot(RobotId(77)).unwrap().charging_cell, (19, 3));
        assert_eq!(kernel.pending_count(), 2);
    }

    #[test]
    fn test_bootstrap_does_not_reseed_an_existing_store() {
        let store: Arc<dyn Store> = Arc::new(MemStore::new());
        seed_default_layout(store.as_ref(), 5);
        let mut kernel = Kernel::new();
        let _world = bootstrap(1, store.clone(), &[76], &mut kernel);
        assert_eq!(store.list_pallets().len(), 30);
    }
}
