//! Cell reservation registry
//!
//! The single process-wide shared service through which robots coordinate
//! motion. It is deliberately small: an atomic test-and-set for claiming a
//! cell, a blocked-cell predicate, and deadlock-chain detection. There is
//! no time-windowed reservation here (contrast the donor codebase's
//! `ReservationManager`, which reserves an edge/node for an interval) —
//! ownership is instantaneous and lasts until the owning robot releases it.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use wfleet_core::RobotId;

use crate::deadlock;
use crate::grid::{Cell, CellType, Grid};

#[derive(Default)]
struct Inner {
    cells: HashMap<Cell, RobotId>,
    destinations: HashMap<RobotId, Cell>,
    cannot_retreat: HashSet<RobotId>,
}

/// Shared registry of cell ownership and robot destinations.
pub struct ReservationRegistry {
    inner: Mutex<Inner>,
}

impl Default for ReservationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ReservationRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Atomically claim `cell` for `robot`. Succeeds if the cell is
    /// unowned or already owned by `robot`. On success also records
    /// `cell` as `robot`'s current destination (I2: a robot's destination
    /// always tracks the cell it is moving into or already owns).
    pub fn try_reserve(&self, robot: RobotId, cell: Cell) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.cells.get(&cell) {
            Some(&owner) if owner != robot => false,
            _ => {
                inner.cells.insert(cell, robot);
                inner.destinations.insert(robot, cell);
                true
            }
        }
    }

    /// Release `cell` if owned by `robot`. Idempotent.
    pub fn release(&self, robot: RobotId, cell: Cell) {
        let mut inner = self.inner.lock().unwrap();
        if inner.cells.get(&cell) == Some(&robot) {
            inner.cells.remove(&cell);
        }
    }

    /// Clear a robot's recorded destination, e.g. after it arrives.
    pub fn clear_destination(&self, robot: RobotId) {
        self.inner.lock().unwrap().destinations.remove(&robot);
    }

    pub fn owner_of(&self, cell: Cell) -> Option<RobotId> {
        self.inner.lock().unwrap().cells.get(&cell).copied()
    }

    pub fn destination_of(&self, robot: RobotId) -> Option<Cell> {
        self.inner.lock().unwrap().destinations.get(&robot).copied()
    }

    /// True if `cell` cannot presently be entered by `by_robot` en route
    /// to `goal`: out of bounds, a pallet, a shelf other than the robot's
    /// own goal, owned by somebody else, or somebody else's declared
    /// destination (prevents two robots converging on the same cell from
    /// opposite sides).
    pub fn is_blocked(&self, grid: &Grid, cell: Cell, by_robot: RobotId, goal: Cell) -> bool {
        if !grid.in_bounds(cell) {
            return true;
        }
        match grid.cell_type(cell) {
            Some(CellType::Pallet) => return true,
            Some(CellType::Shelf) if cell != goal => return true,
            _ => {}
        }

        let inner = self.inner.lock().unwrap();
        if let Some(&owner) = inner.cells.get(&cell) {
            if owner != by_robot {
                return true;
            }
        }
        inner
            .destinations
            .iter()
            .any(|(&robot, &dest)| robot != by_robot && dest == cell)
    }

    /// Detect whether `robot` waiting to enter `target` is part of a
    /// cyclic blockage. See `deadlock::find_chain`.
    pub fn deadlock_chain(&self, robot: RobotId, target: Cell) -> Option<Vec<RobotId>> {
        let inner = self.inner.lock().unwrap();
        deadlock::find_chain(&inner.cells, &inner.destinations, robot, target)
    }

    pub fn mark_cannot_retreat(&self, robot: RobotId) {
        self.inner.lock().unwrap().cannot_retreat.insert(robot);
    }

    pub fn clear_cannot_retreat(&self, robot: RobotId) {
        self.inner.lock().unwrap().cannot_retreat.remove(&robot);
    }

    pub fn is_cannot_retreat(&self, robot: RobotId) -> bool {
        self.inner.lock().unwrap().cannot_retreat.contains(&robot)
    }

    /// Reserved-cell count, used by diagnostics (C8).
    pub fn reserved_count(&self) -> usize {
        self.inner.lock().unwrap().cells.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_then_release_is_noop() {
        let reg = ReservationRegistry::new();
        assert!(reg.try_reserve(RobotId(1), (0, 0)));
        reg.release(RobotId(1), (0, 0));
        assert_eq!(reg.owner_of((0, 0)), None);
    }

    #[test]
    fn test_mutual_exclusion() {
        let reg = ReservationRegistry::new();
        assert!(reg.try_reserve(RobotId(1), (0, 0)));
        assert!(!reg.try_reserve(RobotId(2), (0, 0)));
        assert!(reg.try_reserve(RobotId(1), (0, 0))); // re-reserving own cell is fine
    }

    #[test]
    fn test_release_by_non_owner_is_noop() {
        let reg = ReservationRegistry::new();
        reg.try_reserve(RobotId(1), (0, 0));
        reg.release(RobotId(2), (0, 0));
        assert_eq!(reg.owner_of((0, 0)), Some(RobotId(1)));
    }

    #[test]
    fn test_is_blocked_pallet() {
        let grid = Grid::default_layout();
        let reg = ReservationRegistry::new();
        assert!(reg.is_blocked(&grid, (6, 2), RobotId(1), (10, 10)));
    }

    #[test]
    fn test_is_blocked_shelf_unless_goal() {
        let grid = Grid::default_layout();
        let reg = ReservationRegistry::new();
        assert!(reg.is_blocked(&grid, (1, 1), RobotId(1), (10, 10)));
        assert!(!reg.is_blocked(&grid, (1, 1), RobotId(1), (1, 1)));
    }

    #[test]
    fn test_is_blocked_by_destination_of_other_robot() {
        let grid = Grid::default_layout();
        let reg = ReservationRegistry::new();
        reg.try_reserve(RobotId(2), (5, 5));
        reg.release(RobotId(2), (5, 5)); // owns nothing now, but destination persists
        assert!(reg.is_blocked(&grid, (5, 5), RobotId(1), (10, 10)));
    }

    #[test]
    fn test_deadlock_chain_pairwise() {
        let reg = ReservationRegistry::new();
        reg.try_reserve(RobotId(1), (0, 0));
        reg.try_reserve(RobotId(2), (1, 0));
        // robot 1 wants (1,0), robot 2 wants (0,0)
        reg.inner.lock().unwrap().destinations.insert(RobotId(2), (0, 0));
        let chain = reg.deadlock_chain(RobotId(1), (1, 0)).unwrap();
        assert_eq!(chain, vec![RobotId(1), RobotId(2)]);
    }

    #[test]
    fn test_cannot_retreat_set() {
        let reg = ReservationRegistry::new();
        assert!(!reg.is_cannot_retreat(RobotId(1)));
        reg.mark_cannot_retreat(RobotId(1));
        assert!(reg.is_cannot_retreat(RobotId(1)));
        reg.clear_cannot_retreat(RobotId(1));
        assert!(!reg.is_cannot_retreat(RobotId(1)));
    }
}
