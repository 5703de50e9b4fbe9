//! Wfleet Storage - the persistence gateway (C4)
//!
//! A narrow `Store` trait plus two implementations: `SledStore` (the
//! durable reference backend) and `MemStore` (fast, in-memory, used by
//! tests and quick scenario runs). Swapping the backend technology is an
//! integration concern; the trait is the actual contract the robot
//! control loop and operator surface depend on.

pub mod mem_store;
pub mod model;
pub mod sled_store;
pub mod store;

pub use mem_store::MemStore;
pub use model::*;
pub use sled_store::SledStore;
pub use store::Store;
