//! Wfleet Testing - scenario construction and invariant checks
//!
//! `scenarios` builds the named situations a reviewer would reach for
//! when asking "does this behave correctly here"; `properties` asserts
//! the invariants that must hold regardless of how a run got there.

pub mod properties;
pub mod scenarios;
