//! The persistence gateway trait
//!
//! A narrow, operation-shaped contract rather than a generic query
//! builder: every method here is something the robot control loop or the
//! operator surface actually does. The two serializability-critical
//! transitions — order claim and shelf claim — are named as atomic
//! operations (`claim_order`, `claim_shelf`) so every backend is forced
//! to implement them as a single atomic step, not a read-then-write pair.

use wfleet_core::{ItemId, OrderId, PalletId, RobotId, ShelfId, WfleetResult};

use crate::model::{InventoryRow, ItemRow, OrderItemRow, OrderRow, PalletRow, RobotRow, ShelfRow, WarehouseConfigRow};

pub trait Store: Send + Sync {
    // --- robots ---
    fn get_robot(&self, id: RobotId) -> Option<RobotRow>;
    fn put_robot(&self, row: RobotRow);
    fn list_robots(&self) -> Vec<RobotRow>;

    // --- items ---
    fn get_item(&self, id: ItemId) -> Option<ItemRow>;
    fn put_item(&self, row: ItemRow);
    fn list_items(&self) -> Vec<ItemRow>;

    // --- pallets ---
    fn get_pallet(&self, id: PalletId) -> Option<PalletRow>;
    fn put_pallet(&self, row: PalletRow);
    fn list_pallets(&self) -> Vec<PalletRow>;

    // --- shelves ---
    fn get_shelf(&self, id: ShelfId) -> Option<ShelfRow>;
    fn put_shelf(&self, row: ShelfRow);
    fn list_shelves(&self) -> Vec<ShelfRow>;
    /// Atomic `UPDATE shelves SET status='reserved', robot_id=?, order_id=? WHERE id=? AND status='free'`.
    fn claim_shelf(&self, shelf_id: ShelfId, robot: RobotId, order_id: OrderId) -> bool;
    /// Find a shelf already holding this order's items (status=busy).
    fn find_shelf_for_order(&self, order_id: OrderId) -> Option<ShelfId>;
    /// Find any fully empty, free shelf.
    fn find_empty_free_shelf(&self) -> Option<ShelfId>;

    // --- orders ---
    fn get_order(&self, id: OrderId) -> Option<OrderRow>;
    fn put_order(&self, row: OrderRow);
    fn list_orders(&self) -> Vec<OrderRow>;
    fn order_items(&self, order_id: OrderId) -> Vec<OrderItemRow>;
    fn put_order_item(&self, row: OrderItemRow);
    /// Lowest-identifier order currently `pending`.
    fn lowest_pending_order(&self) -> Option<OrderId>;
    /// Atomic `UPDATE orders SET status='processing' WHERE id=? AND status='pending'`.
    fn claim_order(&self, order_id: OrderId) -> bool;
    fn set_order_status(&self, order_id: OrderId, status: crate::model::OrderStatus);
    fn delete_order(&self, order_id: OrderId);

    // --- inventory ---
    /// Find a pallet inventory row for `item_id` with at least one unit,
    /// excluding the pallets in `exclude` (the agent's `failed_pallets`
    /// set).
    fn find_pallet_stock(&self, item_id: ItemId, exclude: &[PalletId]) -> Option<InventoryRow>;
    /// Atomically take up to `qty` units from an inventory row, returning
    /// the amount actually taken (may be less than requested).
    fn inventory_take(&self, row_id: u32, qty: u32) -> WfleetResult<u32>;
    /// Insert or merge a shelf inventory row for `order_id`, rejecting the
    /// write if the shelf already carries a different order's items (I4).
    fn inventory_place_on_shelf(
        &self,
        shelf_id: ShelfId,
        item_id: ItemId,
        qty: u32,
        order_id: OrderId,
    ) -> WfleetResult<()>;
    fn inventory_on_shelf(&self, shelf_id: ShelfId) -> Vec<InventoryRow>;
    fn inventory_clear_shelf(&self, shelf_id: ShelfId);
    /// Scenario bootstrap only: place initial stock on a pallet. No agent
    /// operation ever calls this — pallets never gain stock at runtime.
    fn seed_pallet_stock(&self, item_id: ItemId, pallet_id: PalletId, qty: u32) -> u32;

    // --- config ---
    fn warehouse_config(&self) -> WarehouseConfigRow;
}
