//! Static grid model of the warehouse floor
//!
//! A warehouse is a `width x height` grid of cells. Each cell carries a
//! fixed type determined at construction time; runtime occupancy (which
//! robot currently sits where) is tracked separately by the reservation
//! registry, not here.

use serde::{Deserialize, Serialize};

/// The 4-neighborhood directions, in a fixed order so iteration is
/// deterministic regardless of hashing.
pub const DIRECTIONS_4: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// Static classification of a grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellType {
    /// Open floor, walkable.
    Free,
    /// A shelf slot. Walkable only as a motion *goal*, never as a
    /// pass-through cell.
    Shelf,
    /// A pallet. Never walkable, not even as a goal's pass-through.
    Pallet,
    /// A robot charging spot.
    Charging,
    /// A robot's default parking spot when idle and not charging.
    StandardPark,
}

impl CellType {
    pub fn is_walkable(&self) -> bool {
        !matches!(self, CellType::Pallet)
    }
}

/// A `(x, y)` grid coordinate.
pub type Cell = (i32, i32);

pub fn euclidean_distance(a: Cell, b: Cell) -> f64 {
    let dx = (a.0 - b.0) as f64;
    let dy = (a.1 - b.1) as f64;
    (dx * dx + dy * dy).sqrt()
}

/// The static warehouse grid: dimensions plus a per-cell type lookup.
#[derive(Clone, Debug)]
pub struct Grid {
    pub width: i32,
    pub height: i32,
    cells: Vec<CellType>,
}

impl Grid {
    /// Build an all-free grid of the given size.
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            cells: vec![CellType::Free; (width * height) as usize],
        }
    }

    #[inline]
    fn index(&self, cell: Cell) -> Option<usize> {
        if self.in_bounds(cell) {
            Some((cell.1 * self.width + cell.0) as usize)
        } else {
            None
        }
    }

    #[inline]
    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.0 >= 0 && cell.1 >= 0 && cell.0 < self.width && cell.1 < self.height
    }

    pub fn cell_type(&self, cell: Cell) -> Option<CellType> {
        self.index(cell).map(|i| self.cells[i])
    }

    pub fn set_cell_type(&mut self, cell: Cell, ty: CellType) {
        if let Some(i) = self.index(cell) {
            self.cells[i] = ty;
        }
    }

    /// The 4-neighbors of `cell` that fall inside the grid, regardless of
    /// cell type. Occupancy and cell-type admissibility are the path
    /// planner's concern (`routing::CellOracle`), not the grid's.
    pub fn neighbors(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        DIRECTIONS_4
            .iter()
            .map(move |(dx, dy)| (cell.0 + dx, cell.1 + dy))
            .filter(move |&n| self.in_bounds(n))
    }

    /// Builds the default reference warehouse layout described in the
    /// operator surface: 20x41 grid, 120 shelves in 3 lanes at x in
    /// {1,2,3}, 30 pallets on a 5x6 subgrid, and 15 charging/parking
    /// cells along the x=19/x=18 columns.
    pub fn default_layout() -> Self {
        let mut grid = Self::new(20, 41);

        for y in 1..=40 {
            for x in [1, 2, 3] {
                grid.set_cell_type((x, y), CellType::Shelf);
            }
        }

        for x in [6, 8, 10, 12, 14] {
            for y in [2, 4, 6, 8, 10, 12] {
                grid.set_cell_type((x, y), CellType::Pallet);
            }
        }

        for y in 2..=16 {
            grid.set_cell_type((19, y), CellType::Charging);
            grid.set_cell_type((18, y), CellType::StandardPark);
        }

        grid
    }
}
