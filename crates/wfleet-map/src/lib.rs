//! Wfleet Map - grid model, cell reservation registry, and path planning

pub mod deadlock;
pub mod grid;
pub mod reservation;
pub mod routing;

pub use grid::{Cell, CellType, Grid};
pub use reservation::ReservationRegistry;
pub use routing::{Algorithm, AlgorithmChoice, AlgorithmStats, Router};
