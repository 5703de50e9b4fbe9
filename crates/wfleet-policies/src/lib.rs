//! Wfleet Policies - battery-feasibility and deadlock-retreat rules

pub mod energy;
pub mod retreat;

pub use energy::EnergyModel;
pub use retreat::{decide, select_retreat_cell, RetreatDecision};
