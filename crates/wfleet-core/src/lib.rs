//! Wfleet Core - Core types and DES kernel for the warehouse robot fleet
//!
//! This crate provides the fundamental types and discrete-event simulation
//! kernel used throughout the fleet coordinator. None of it is
//! warehouse-specific: the kernel moves logical time forward and dispatches
//! events, the ID types give every entity a typed handle, and `SimRng`
//! gives deterministic randomness.

pub mod error;
pub mod event;
pub mod id;
pub mod kernel;
pub mod rng;
pub mod time;

pub use error::{WfleetError, WfleetResult};
pub use event::{ScheduledEvent, SimEvent};
pub use id::*;
pub use kernel::Kernel;
pub use rng::SimRng;
pub use time::SimTime;
