//! Order runtime view
//!
//! Thin wrapper around `wfleet_storage::OrderRow` plus its line items.
//! The gateway owns the authoritative row; this type exists so the
//! control loop and metrics code can ask order-shaped questions
//! (`is_complete`, `total_items`, `is_late`) without reaching back into
//! storage for every check.

use wfleet_core::{ItemId, OrderId};
use wfleet_storage::{OrderRow, OrderStatus};

/// A single requested item/quantity pair within an order.
#[derive(Clone, Debug)]
pub struct OrderLine {
    pub item_id: ItemId,
    pub quantity: u32,
    pub fulfilled: u32,
}

impl OrderLine {
    pub fn new(item_id: ItemId, quantity: u32) -> Self {
        Self { item_id, quantity, fulfilled: 0 }
    }

    pub fn is_fulfilled(&self) -> bool {
        self.fulfilled >= self.quantity
    }
}

#[derive(Clone, Debug)]
pub struct Order {
    pub id: OrderId,
    pub created_at: f64,
    pub due_time: Option<f64>,
    pub lines: Vec<OrderLine>,
    pub status: OrderStatus,
    pub completion_time: Option<f64>,
}

impl Order {
    pub fn new(id: OrderId, created_at: f64, lines: Vec<OrderLine>, due_time: Option<f64>) -> Self {
        Self { id, created_at, due_time, lines, status: OrderStatus::Pending, completion_time: None }
    }

    pub fn from_row(row: &OrderRow, lines: Vec<OrderLine>) -> Self {
        Self {
            id: row.id,
            created_at: row.created_at,
            due_time: None,
            lines,
            status: row.status,
            completion_time: None,
        }
    }

    pub fn to_row(&self) -> OrderRow {
        OrderRow { id: self.id, created_at: self.created_at, status: self.status }
    }

    pub fn total_items(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn total_lines(&self) -> usize {
        self.lines.len()
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.status, OrderStatus::Done | OrderStatus::Completed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Done | OrderStatus::Partial | OrderStatus::Failed | OrderStatus::Completed
        )
    }

    pub fn is_late(&self, current_time: f64) -> bool {
        self.due_time.map_or(false, |due| current_time > due && !self.is_terminal())
    }

    pub fn cycle_time(&self) -> Option<f64> {
        self.completion_time.map(|c| c - self.created_at)
    }

    pub fn all_lines_fulfilled(&self) -> bool {
        self.lines.iter().all(OrderLine::is_fulfilled)
    }

    pub fn start(&mut self) {
        if self.status == OrderStatus::Pending {
            self.status = OrderStatus::Processing;
        }
    }

    pub fn finish(&mut self, status: OrderStatus, completion_time: f64) {
        self.status = status;
        self.completion_time = Some(completion_time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Order {
        Order::new(
            OrderId(1),
            0.0,
            vec![OrderLine::new(ItemId(1), 3), OrderLine::new(ItemId(2), 1)],
            Some(500.0),
        )
    }

    #[test]
    fn test_total_items_sums_quantities() {
        assert_eq!(sample().total_items(), 4);
    }

    #[test]
    fn test_start_transitions_pending_to_processing() {
        let mut o = sample();
        o.start();
        assert_eq!(o.status, OrderStatus::Processing);
        o.start();
        assert_eq!(o.status, OrderStatus::Processing);
    }

    #[test]
    fn test_is_late_only_when_incomplete_and_past_due() {
        let mut o = sample();
        assert!(!o.is_late(100.0));
        assert!(o.is_late(600.0));
        o.finish(OrderStatus::Done, 550.0);
        assert!(!o.is_late(600.0));
    }

    #[test]
    fn test_all_lines_fulfilled() {
        let mut o = sample();
        assert!(!o.all_lines_fulfilled());
        o.lines[0].fulfilled = 3;
        o.lines[1].fulfilled = 1;
        assert!(o.all_lines_fulfilled());
    }
}
