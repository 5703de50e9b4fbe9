//! sled-backed `Store`
//!
//! One `sled::Tree` per table, rows serialized with `serde_json` (chosen
//! over a binary codec so the embedded database stays inspectable with
//! ordinary sled tooling). The two serializability-critical transitions
//! (`claim_order`, `claim_shelf`) are built on `Tree::compare_and_swap`,
//! which gives the same "zero rows affected means someone else already
//! won" semantics as `UPDATE ... WHERE status = ?` on a real RDBMS.

use wfleet_core::{ItemId, OrderId, PalletId, RobotId, ShelfId, WfleetError, WfleetResult};

use crate::model::{
    InventoryRow, ItemRow, OrderItemRow, OrderRow, OrderStatus, PalletRow, RobotRow, ShelfRow,
    ShelfStatus, WarehouseConfigRow,
};
use crate::store::Store;

pub struct SledStore {
    robots: sled::Tree,
    items: sled::Tree,
    pallets: sled::Tree,
    shelves: sled::Tree,
    orders: sled::Tree,
    order_items: sled::Tree,
    inventory: sled::Tree,
    counters: sled::Tree,
    config: sled::Tree,
}

fn key(id: u32) -> [u8; 4] {
    id.to_be_bytes()
}

fn decode<T: serde::de::DeserializeOwned>(bytes: sled::IVec) -> T {
    serde_json::from_slice(&bytes).expect("corrupt row in sled store")
}

fn encode<T: serde::Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("row failed to serialize")
}

impl SledStore {
    pub fn open(path: &std::path::Path) -> WfleetResult<Self> {
        let db = sled::open(path).map_err(|e| WfleetError::Storage(e.to_string()))?;
        Self::from_db(&db)
    }

    pub fn open_temporary() -> WfleetResult<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| WfleetError::Storage(e.to_string()))?;
        Self::from_db(&db)
    }

    fn from_db(db: &sled::Db) -> WfleetResult<Self> {
        let open = |name: &str| db.open_tree(name).map_err(|e| WfleetError::Storage(e.to_string()));
        let store = Self {
            robots: open("robots")?,
            items: open("items")?,
            pallets: open("pallets")?,
            shelves: open("shelves")?,
            orders: open("orders")?,
            order_items: open("order_items")?,
            inventory: open("inventory")?,
            counters: open("counters")?,
            config: open("config")?,
        };
        if store.config.get(key(1)).ok().flatten().is_none() {
            store.config.insert(key(1), encode(&WarehouseConfigRow { id: 1, width: 20, height: 41 })).ok();
        }
        Ok(store)
    }

    fn next_counter(&self, name: &str) -> u32 {
        let current = self
            .counters
            .get(name.as_bytes())
            .ok()
            .flatten()
            .map(|b| u32::from_be_bytes(b.as_ref().try_into().unwrap()))
            .unwrap_or(0);
        let next = current + 1;
        self.counters.insert(name.as_bytes(), &next.to_be_bytes()).ok();
        current
    }

    /// Loop a compare-and-swap until it either commits or the predicate
    /// rejects the current value. Returns `false` only when the
    /// predicate rejects; a conflicting concurrent writer just causes a
    /// retry with the fresh value.
    fn cas_loop<T, F>(&self, tree: &sled::Tree, k: [u8; 4], mut transform: F) -> bool
    where
        T: serde::Serialize + serde::de::DeserializeOwned,
        F: FnMut(&mut T) -> bool,
    {
        loop {
            let Some(old_bytes) = tree.get(k).ok().flatten() else { return false };
            let mut row: T = decode(old_bytes.clone());
            if !transform(&mut row) {
                return false;
            }
            let new_bytes = encode(&row);
            match tree.compare_and_swap(k, Some(old_bytes), Some(new_bytes)) {
                Ok(Ok(())) => return true,
                Ok(Err(_)) => continue, // lost the race, retry with fresh value
                Err(_) => return false,
            }
        }
    }
}

impl Store for SledStore {
    fn get_robot(&self, id: RobotId) -> Option<RobotRow> {
        self.robots.get(key(id.as_u32())).ok().flatten().map(decode)
    }

    fn put_robot(&self, row: RobotRow) {
        self.robots.insert(key(row.id.as_u32()), encode(&row)).ok();
    }

    fn list_robots(&self) -> Vec<RobotRow> {
        self.robots.iter().values().filter_map(|v| v.ok()).map(decode).collect()
    }

    fn get_item(&self, id: ItemId) -> Option<ItemRow> {
        self.items.get(key(id.as_u32())).ok().flatten().map(decode)
    }

    fn put_item(&self, row: ItemRow) {
        self.items.insert(key(row.id.as_u32()), encode(&row)).ok();
    }

    fn list_items(&self) -> Vec<ItemRow> {
        self.items.iter().values().filter_map(|v| v.ok()).map(decode).collect()
    }

    fn get_pallet(&self, id: PalletId) -> Option<PalletRow> {
        self.pallets.get(key(id.as_u32())).ok().flatten().map(decode)
    }

    fn put_pallet(&self, row: PalletRow) {
        self.pallets.insert(key(row.id.as_u32()), encode(&row)).ok();
    }

    fn list_pallets(&self) -> Vec<PalletRow> {
        self.pallets.iter().values().filter_map(|v| v.ok()).map(decode).collect()
    }

    fn get_shelf(&self, id: ShelfId) -> Option<ShelfRow> {
        self.shelves.get(key(id.as_u32())).ok().flatten().map(decode)
    }

    fn put_shelf(&self, row: ShelfRow) {
        self.shelves.insert(key(row.id.as_u32()), encode(&row)).ok();
    }

    fn list_shelves(&self) -> Vec<ShelfRow> {
        self.shelves.iter().values().filter_map(|v| v.ok()).map(decode).collect()
    }

    fn claim_shelf(&self, shelf_id: ShelfId, robot: RobotId, order_id: OrderId) -> bool {
        self.cas_loop::<ShelfRow, _>(&self.shelves, key(shelf_id.as_u32()), |shelf| {
            if shelf.status != ShelfStatus::Free {
                return false;
            }
            shelf.status = ShelfStatus::Reserved;
            shelf.robot_id = Some(robot);
            shelf.order_id = Some(order_id);
            true
        })
    }

    fn find_shelf_for_order(&self, order_id: OrderId) -> Option<ShelfId> {
        self.list_shelves()
            .into_iter()
            .find(|s| s.status == ShelfStatus::Busy && s.order_id == Some(order_id))
            .map(|s| s.id)
    }

    fn find_empty_free_shelf(&self) -> Option<ShelfId> {
        let occupied: std::collections::HashSet<u32> = self
            .inventory
            .iter()
            .values()
            .filter_map(|v| v.ok())
            .map(|v| decode::<InventoryRow>(v))
            .filter(|inv| inv.location_type == crate::model::LocationType::Shelf)
            .map(|inv| inv.location_id)
            .collect();
        let mut candidates: Vec<ShelfId> = self
            .list_shelves()
            .into_iter()
            .filter(|s| s.status == ShelfStatus::Free && !occupied.contains(&s.id.as_u32()))
            .map(|s| s.id)
            .collect();
        candidates.sort_by_key(|id| id.as_u32());
        candidates.into_iter().next()
    }

    fn get_order(&self, id: OrderId) -> Option<OrderRow> {
        self.orders.get(key(id.as_u32())).ok().flatten().map(decode)
    }

    fn put_order(&self, row: OrderRow) {
        self.orders.insert(key(row.id.as_u32()), encode(&row)).ok();
    }

    fn list_orders(&self) -> Vec<OrderRow> {
        self.orders.iter().values().filter_map(|v| v.ok()).map(decode).collect()
    }

    fn order_items(&self, order_id: OrderId) -> Vec<OrderItemRow> {
        self.order_items
            .iter()
            .values()
            .filter_map(|v| v.ok())
            .map(decode::<OrderItemRow>)
            .filter(|oi| oi.order_id == order_id)
            .collect()
    }

    fn put_order_item(&self, mut row: OrderItemRow) {
        if row.id == 0 {
            row.id = self.next_counter("order_items");
        }
        self.order_items.insert(key(row.id), encode(&row)).ok();
    }

    fn lowest_pending_order(&self) -> Option<OrderId> {
        self.list_orders()
            .into_iter()
            .filter(|o| o.status == OrderStatus::Pending)
            .map(|o| o.id)
            .min_by_key(|id| id.as_u32())
    }

    fn claim_order(&self, order_id: OrderId) -> bool {
        self.cas_loop::<OrderRow, _>(&self.orders, key(order_id.as_u32()), |order| {
            if order.status != OrderStatus::Pending {
                return false;
            }
            order.status = OrderStatus::Processing;
            true
        })
    }

    fn set_order_status(&self, order_id: OrderId, status: OrderStatus) {
        if let Some(mut row) = self.get_order(order_id) {
            row.status = status;
            self.put_order(row);
        }
    }

    fn delete_order(&self, order_id: OrderId) {
        self.orders.remove(key(order_id.as_u32())).ok();
        for oi in self.order_items(order_id) {
            self.order_items.remove(key(oi.id)).ok();
        }
    }

    fn find_pallet_stock(&self, item_id: ItemId, exclude: &[PalletId]) -> Option<InventoryRow> {
        self.inventory
            .iter()
            .values()
            .filter_map(|v| v.ok())
            .map(decode::<InventoryRow>)
            .filter(|inv| {
                inv.location_type == crate::model::LocationType::Pallet
                    && inv.item_id == item_id
                    && inv.quantity > 0
                    && !exclude.contains(&PalletId(inv.location_id))
            })
            .max_by_key(|inv| inv.quantity)
    }

    fn inventory_take(&self, row_id: u32, qty: u32) -> WfleetResult<u32> {
        let mut taken = 0u32;
        let ok = self.cas_loop::<InventoryRow, _>(&self.inventory, key(row_id), |row| {
            taken = qty.min(row.quantity);
            row.quantity -= taken;
            true
        });
        if !ok {
            return Err(WfleetError::ResourceExhausted(format!("inventory row {row_id} not found")));
        }
        if taken == 0 {
            // nothing left: remove the now-empty row
        } else if let Some(row) = self.inventory.get(key(row_id)).ok().flatten() {
            let row: InventoryRow = decode(row);
            if row.quantity == 0 {
                self.inventory.remove(key(row_id)).ok();
            }
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
        let rows = self.inventory_on_shelf(shelf_id);
        if rows.iter().any(|r| r.order_id.is_some() && r.order_id != Some(order_id)) {
            return Err(WfleetError::InvalidState(format!(
                "shelf {} already holds items for a different order",
                shelf_id.as_u32()
            )));
        }
        if let Some(existing) = rows.into_iter().find(|r| r.item_id == item_id && r.order_id == Some(order_id)) {
            let mut row = existing;
            row.quantity += qty;
            self.inventory.insert(key(row.id), encode(&row)).ok();
            return Ok(());
        }
        let id = self.next_counter("inventory");
        let row = InventoryRow {
            id,
            item_id,
            location_type: crate::model::LocationType::Shelf,
            location_id: shelf_id.as_u32(),
            quantity: qty,
            order_id: Some(order_id),
        };
        self.inventory.insert(key(id), encode(&row)).ok();
        Ok(())
    }

    fn inventory_on_shelf(&self, shelf_id: ShelfId) -> Vec<InventoryRow> {
        self.inventory
            .iter()
            .values()
            .filter_map(|v| v.ok())
            .map(decode::<InventoryRow>)
            .filter(|inv| inv.location_type == crate::model::LocationType::Shelf && inv.location_id == shelf_id.as_u32())
            .collect()
    }

    fn inventory_clear_shelf(&self, shelf_id: ShelfId) {
        for row in self.inventory_on_shelf(shelf_id) {
            self.inventory.remove(key(row.id)).ok();
        }
    }

    fn seed_pallet_stock(&self, item_id: ItemId, pallet_id: PalletId, qty: u32) -> u32 {
        let id = self.next_counter("inventory");
        let row = InventoryRow {
            id,
            item_id,
            location_type: crate::model::LocationType::Pallet,
            location_id: pallet_id.as_u32(),
            quantity: qty,
            order_id: None,
        };
        self.inventory.insert(key(id), encode(&row)).ok();
        id
    }

    fn warehouse_config(&self) -> WarehouseConfigRow {
        self.config.get(key(1)).ok().flatten().map(decode).unwrap_or(WarehouseConfigRow { id: 1, width: 20, height: 41 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_order_atomic_under_sled_cas() {
        let store = SledStore::open_temporary().unwrap();
        store.put_order(OrderRow { id: OrderId(1), created_at: 0.0, status: OrderStatus::Pending });
        assert!(store.claim_order(OrderId(1)));
        assert!(!store.claim_order(OrderId(1)));
        assert_eq!(store.get_order(OrderId(1)).unwrap().status, OrderStatus::Processing);
    }

    #[test]
    fn test_claim_shelf_atomic() {
        let store = SledStore::open_temporary().unwrap();
        store.put_shelf(ShelfRow {
            id: ShelfId(1), shelf_code: "1-1".into(), x: 1, y: 1, capacity: 10,
            status: ShelfStatus::Free, robot_id: None, order_id: None, updated_at: 0.0,
        });
        assert!(store.claim_shelf(ShelfId(1), RobotId(76), OrderId(9)));
        assert!(!store.claim_shelf(ShelfId(1), RobotId(77), OrderId(10)));
    }

    #[test]
    fn test_default_warehouse_config() {
        let store = SledStore::open_temporary().unwrap();
        let cfg = store.warehouse_config();
        assert_eq!((cfg.width, cfg.height), (20, 41));
    }
}
