//! In-memory `Store` backed by mutex-guarded maps
//!
//! Used by unit tests and by the fast-path scenario runner; implements
//! exactly the same atomicity contract as `SledStore` so agent logic
//! never needs to know which backend it's talking to.

use std::collections::HashMap;
use std::sync::Mutex;

use wfleet_core::{ItemId, OrderId, PalletId, RobotId, ShelfId, WfleetError, WfleetResult};

use crate::model::{
    InventoryRow, ItemRow, OrderItemRow, OrderRow, OrderStatus, PalletRow, RobotRow, ShelfRow,
    ShelfStatus, WarehouseConfigRow,
};
use crate::store::Store;

#[derive(Default)]
struct Tables {
    robots: HashMap<RobotId, RobotRow>,
    items: HashMap<ItemId, ItemRow>,
    pallets: HashMap<PalletId, PalletRow>,
    shelves: HashMap<ShelfId, ShelfRow>,
    orders: HashMap<OrderId, OrderRow>,
    order_items: Vec<OrderItemRow>,
    inventory: HashMap<u32, InventoryRow>,
    next_inventory_id: u32,
    next_order_item_id: u32,
    config: WarehouseConfigRow,
}

pub struct MemStore {
    tables: Mutex<Tables>,
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables {
                config: WarehouseConfigRow { id: 1, width: 20, height: 41 },
                ..Default::default()
            }),
        }
    }

    pub fn with_config(width: i32, height: i32) -> Self {
        let store = Self::new();
        store.tables.lock().unwrap().config = WarehouseConfigRow { id: 1, width, height };
        store
    }

    /// Insert an inventory row, assigning the next id. Used by scenario
    /// setup; not part of the `Store` trait since the real agent loop
    /// never creates stock out of thin air.
    pub fn seed_inventory(&self, item_id: ItemId, location_type: crate::model::LocationType, location_id: u32, quantity: u32) -> u32 {
        let mut t = self.tables.lock().unwrap();
        let id = t.next_inventory_id;
        t.next_inventory_id += 1;
        t.inventory.insert(id, InventoryRow { id, item_id, location_type, location_id, quantity, order_id: None });
        id
    }
}

impl Store for MemStore {
    fn get_robot(&self, id: RobotId) -> Option<RobotRow> {
        self.tables.lock().unwrap().robots.get(&id).cloned()
    }

    fn put_robot(&self, row: RobotRow) {
        self.tables.lock().unwrap().robots.insert(row.id, row);
    }

    fn list_robots(&self) -> Vec<RobotRow> {
        self.tables.lock().unwrap().robots.values().cloned().collect()
    }

    fn get_item(&self, id: ItemId) -> Option<ItemRow> {
        self.tables.lock().unwrap().items.get(&id).cloned()
    }

    fn put_item(&self, row: ItemRow) {
        self.tables.lock().unwrap().items.insert(row.id, row);
    }

    fn list_items(&self) -> Vec<ItemRow> {
        self.tables.lock().unwrap().items.values().cloned().collect()
    }

    fn get_pallet(&self, id: PalletId) -> Option<PalletRow> {
        self.tables.lock().unwrap().pallets.get(&id).cloned()
    }

    fn put_pallet(&self, row: PalletRow) {
        self.tables.lock().unwrap().pallets.insert(row.id, row);
    }

    fn list_pallets(&self) -> Vec<PalletRow> {
        self.tables.lock().unwrap().pallets.values().cloned().collect()
    }

    fn get_shelf(&self, id: ShelfId) -> Option<ShelfRow> {
        self.tables.lock().unwrap().shelves.get(&id).cloned()
    }

    fn put_shelf(&self, row: ShelfRow) {
        self.tables.lock().unwrap().shelves.insert(row.id, row);
    }

    fn list_shelves(&self) -> Vec<ShelfRow> {
        self.tables.lock().unwrap().shelves.values().cloned().collect()
    }

    fn claim_shelf(&self, shelf_id: ShelfId, robot: RobotId, order_id: OrderId) -> bool {
        let mut t = self.tables.lock().unwrap();
        match t.shelves.get_mut(&shelf_id) {
            Some(shelf) if shelf.status == ShelfStatus::Free => {
                shelf.status = ShelfStatus::Reserved;
                shelf.robot_id = Some(robot);
                shelf.order_id = Some(order_id);
                true
            }
            _ => false,
        }
    }

    fn find_shelf_for_order(&self, order_id: OrderId) -> Option<ShelfId> {
        let t = self.tables.lock().unwrap();
        t.shelves
            .values()
            .filter(|s| s.status == ShelfStatus::Busy && s.order_id == Some(order_id))
            .map(|s| s.id)
            .next()
    }

    fn find_empty_free_shelf(&self) -> Option<ShelfId> {
        let t = self.tables.lock().unwrap();
        let mut candidates: Vec<ShelfId> = t
            .shelves
            .values()
            .filter(|s| s.status == ShelfStatus::Free)
            .filter(|s| !t.inventory.values().any(|inv| {
                inv.location_type == crate::model::LocationType::Shelf && inv.location_id == s.id.as_u32()
            }))
            .map(|s| s.id)
            .collect();
        candidates.sort_by_key(|id| id.as_u32());
        candidates.into_iter().next()
    }

    fn get_order(&self, id: OrderId) -> Option<OrderRow> {
        self.tables.lock().unwrap().orders.get(&id).cloned()
    }

    fn put_order(&self, row: OrderRow) {
        self.tables.lock().unwrap().orders.insert(row.id, row);
    }

    fn list_orders(&self) -> Vec<OrderRow> {
        self.tables.lock().unwrap().orders.values().cloned().collect()
    }

    fn order_items(&self, order_id: OrderId) -> Vec<OrderItemRow> {
        self.tables
            .lock()
            .unwrap()
            .order_items
            .iter()
            .filter(|oi| oi.order_id == order_id)
            .cloned()
            .collect()
    }

    fn put_order_item(&self, mut row: OrderItemRow) {
        let mut t = self.tables.lock().unwrap();
        if row.id == 0 {
            row.id = t.next_order_item_id;
            t.next_order_item_id += 1;
        }
        t.order_items.push(row);
    }

    fn lowest_pending_order(&self) -> Option<OrderId> {
        let t = self.tables.lock().unwrap();
        t.orders
            .values()
            .filter(|o| o.status == OrderStatus::Pending)
            .map(|o| o.id)
            .min_by_key(|id| id.as_u32())
    }

    fn claim_order(&self, order_id: OrderId) -> bool {
        let mut t = self.tables.lock().unwrap();
        match t.orders.get_mut(&order_id) {
            Some(order) if order.status == OrderStatus::Pending => {
                order.status = OrderStatus::Processing;
                true
            }
            _ => false,
        }
    }

    fn set_order_status(&self, order_id: OrderId, status: OrderStatus) {
        if let Some(order) = self.tables.lock().unwrap().orders.get_mut(&order_id) {
            order.status = status;
        }
    }

    fn delete_order(&self, order_id: OrderId) {
        let mut t = self.tables.lock().unwrap();
        t.orders.remove(&order_id);
        t.order_items.retain(|oi| oi.order_id != order_id);
    }

    fn find_pallet_stock(&self, item_id: ItemId, exclude: &[PalletId]) -> Option<InventoryRow> {
        let t = self.tables.lock().unwrap();
        t.inventory
            .values()
            .filter(|inv| {
                inv.location_type == crate::model::LocationType::Pallet
                    && inv.item_id == item_id
                    && inv.quantity > 0
                    && !exclude.contains(&PalletId(inv.location_id))
            })
            .max_by_key(|inv| inv.quantity)
            .cloned()
    }

    fn inventory_take(&self, row_id: u32, qty: u32) -> WfleetResult<u32> {
        let mut t = self.tables.lock().unwrap();
        let row = t
            .inventory
            .get_mut(&row_id)
            .ok_or_else(|| WfleetError::ResourceExhausted(format!("inventory row {row_id} not found")))?;
        let taken = qty.min(row.quantity);
        row.quantity -= taken;
        if row.quantity == 0 {
            t.inventory.remove(&row_id);
        }
        Ok(taken)
    }

    fn inventory_place_on_shelf(
        &self,
        shelf_id: ShelfId,
        item_id: ItemId,
        qty: u32,
        order_id: OrderId,
    ) -> WfleetResult<()> {
        let mut t = self.tables.lock().unwrap();
        let conflicting = t.inventory.values().any(|inv| {
            inv.location_type == crate::model::LocationType::Shelf
                && inv.location_id == shelf_id.as_u32()
                && inv.order_id.is_some()
                && inv.order_id != Some(order_id)
        });
        if conflicting {
            return Err(WfleetError::InvalidState(format!(
                "shelf {} already holds items for a different order",
                shelf_id.as_u32()
            )));
        }

        if let Some(existing) = t.inventory.values_mut().find(|inv| {
            inv.location_type == crate::model::LocationType::Shelf
                && inv.location_id == shelf_id.as_u32()
                && inv.item_id == item_id
                && inv.order_id == Some(order_id)
        }) {
            existing.quantity += qty;
            return Ok(());
        }

        let id = t.next_inventory_id;
        t.next_inventory_id += 1;
        t.inventory.insert(
            id,
            InventoryRow {
                id,
                item_id,
                location_type: crate::model::LocationType::Shelf,
                location_id: shelf_id.as_u32(),
                quantity: qty,
                order_id: Some(order_id),
            },
        );
        Ok(())
    }

    fn inventory_on_shelf(&self, shelf_id: ShelfId) -> Vec<InventoryRow> {
        self.tables
            .lock()
            .unwrap()
            .inventory
            .values()
            .filter(|inv| inv.location_type == crate::model::LocationType::Shelf && inv.location_id == shelf_id.as_u32())
            .cloned()
            .collect()
    }

    fn inventory_clear_shelf(&self, shelf_id: ShelfId) {
        self.tables
            .lock()
            .unwrap()
            .inventory
            .retain(|_, inv| !(inv.location_type == crate::model::LocationType::Shelf && inv.location_id == shelf_id.as_u32()));
    }

    fn seed_pallet_stock(&self, item_id: ItemId, pallet_id: PalletId, qty: u32) -> u32 {
        self.seed_inventory(item_id, crate::model::LocationType::Pallet, pallet_id.as_u32(), qty)
    }

    fn warehouse_config(&self) -> WarehouseConfigRow {
        self.tables.lock().unwrap().config.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LocationType;

    #[test]
    fn test_claim_order_is_exclusive() {
        let store = MemStore::new();
        store.put_order(OrderRow { id: OrderId(1), created_at: 0.0, status: OrderStatus::Pending });
        assert!(store.claim_order(OrderId(1)));
        assert!(!store.claim_order(OrderId(1)));
    }

    #[test]
    fn test_claim_shelf_is_exclusive() {
        let store = MemStore::new();
        store.put_shelf(ShelfRow {
            id: ShelfId(1), shelf_code: "1-1".into(), x: 1, y: 1, capacity: 10,
            status: ShelfStatus::Free, robot_id: None, order_id: None, updated_at: 0.0,
        });
        assert!(store.claim_shelf(ShelfId(1), RobotId(76), OrderId(1)));
        assert!(!store.claim_shelf(ShelfId(1), RobotId(77), OrderId(2)));
    }

    #[test]
    fn test_inventory_take_caps_at_available() {
        let store = MemStore::new();
        let id = store.seed_inventory(ItemId(1), LocationType::Pallet, 1, 3);
        assert_eq!(store.inventory_take(id, 10).unwrap(), 3);
        assert!(store.find_pallet_stock(ItemId(1), &[]).is_none());
    }

    #[test]
    fn test_shelf_purity_rejects_second_order() {
        let store = MemStore::new();
        store.inventory_place_on_shelf(ShelfId(5), ItemId(1), 2, OrderId(1)).unwrap();
        let err = store.inventory_place_on_shelf(ShelfId(5), ItemId(2), 1, OrderId(2));
        assert!(err.is_err());
    }

    #[test]
    fn test_lowest_pending_order() {
        let store = MemStore::new();
        store.put_order(OrderRow { id: OrderId(5), created_at: 0.0, status: OrderStatus::Pending });
        store.put_order(OrderRow { id: OrderId(2), created_at: 0.0, status: OrderStatus::Pending });
        store.put_order(OrderRow { id: OrderId(1), created_at: 0.0, status: OrderStatus::Done });
        assert_eq!(store.lowest_pending_order(), Some(OrderId(2)));
    }
}
