//! Row shapes for the persistence gateway
//!
//! These mirror the schema: thin, denormalized rows with no behavior of
//! their own. `wfleet-entities` builds richer runtime types from them;
//! the store only ever sees these.

use serde::{Deserialize, Serialize};
use wfleet_core::{ItemId, OrderId, PalletId, RobotId, ShelfId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RobotStatus {
    Idle,
    Moving,
    GoingToCharge,
    Charging,
    Processing(OrderId),
}

impl std::fmt::Display for RobotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RobotStatus::Idle => write!(f, "idle"),
            RobotStatus::Moving => write!(f, "moving"),
            RobotStatus::GoingToCharge => write!(f, "going_to_charge"),
            RobotStatus::Charging => write!(f, "charging"),
            RobotStatus::Processing(order_id) => write!(f, "processing_order_{}", order_id.as_u32()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShelfStatus {
    Free,
    Reserved,
    Busy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Processing,
    Done,
    Partial,
    Failed,
    /// Terminal state of the separate, non-robot "clear order" operator
    /// action (distinct from the robot-driven `Done`/`Partial`/`Failed`
    /// outcomes), matching the donor script's `clear_all_shelves_for_order`.
    Completed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationType {
    Pallet,
    Shelf,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RobotRow {
    pub id: RobotId,
    pub name: String,
    pub status: RobotStatus,
    pub x: i32,
    pub y: i32,
    pub battery: f64,
    pub updated_at: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ItemRow {
    pub id: ItemId,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PalletRow {
    pub id: PalletId,
    pub label: String,
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShelfRow {
    pub id: ShelfId,
    pub shelf_code: String,
    pub x: i32,
    pub y: i32,
    pub capacity: u32,
    pub status: ShelfStatus,
    pub robot_id: Option<RobotId>,
    pub order_id: Option<OrderId>,
    pub updated_at: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderRow {
    pub id: OrderId,
    pub created_at: f64,
    pub status: OrderStatus,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderItemRow {
    pub id: u32,
    pub order_id: OrderId,
    pub item_id: ItemId,
    pub quantity: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InventoryRow {
    pub id: u32,
    pub item_id: ItemId,
    pub location_type: LocationType,
    pub location_id: u32,
    pub quantity: u32,
    pub order_id: Option<OrderId>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WarehouseConfigRow {
    pub id: u32,
    pub width: i32,
    pub height: i32,
}
