//! Wfleet Sim - simulation orchestration (C6/C7)
//!
//! The robot control loop (`agent`), fleet bootstrap (`fleet`), event
//! dispatch (`handlers`), and the run loop that ties them to the
//! discrete-event kernel (`runner`). `world` holds everything these
//! modules share.

pub mod agent;
pub mod fleet;
pub mod handlers;
pub mod runner;
pub mod world;

pub use agent::{AgentTask, MotionPurpose, NextAction};
pub use handlers::EventHandler;
pub use runner::SimulationRunner;
pub use world::World;
