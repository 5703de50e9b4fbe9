//! Error types for the fleet coordinator

use thiserror::Error;

/// Top-level error type returned by fallible fleet operations.
///
/// The variants mirror the error taxonomy: transient contention and local
/// planning failures are handled internally by the agent loop and rarely
/// surface as `Err` at all, but persistence failures, exhausted retries,
/// and configuration problems do.
#[derive(Error, Debug)]
pub enum WfleetError {
    /// Configuration error (bad warehouse layout, malformed scenario file)
    #[error("configuration error: {0}")]
    Config(String),

    /// Validation error
    #[error("validation error: {0}")]
    Validation(String),

    /// Entity not found
    #[error("entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: &'static str, id: u32 },

    /// Invalid state transition
    #[error("invalid state transition: {0}")]
    InvalidState(String),

    /// No path between two cells
    #[error("no path from {from:?} to {to:?}")]
    NoPath { from: (i32, i32), to: (i32, i32) },

    /// A resource (shelf, pallet stock) is exhausted
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Battery insufficient for the attempted plan
    #[error("insufficient battery: need {needed:.1}%, have {available:.1}%")]
    InsufficientBattery { needed: f64, available: f64 },

    /// A contested claim (order or shelf) lost a race to another agent
    #[error("claim lost: {0}")]
    ClaimLost(String),

    /// Underlying persistence failure
    #[error("storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl WfleetError {
    pub fn robot_not_found(id: u32) -> Self {
        Self::NotFound { entity_type: "Robot", id }
    }

    pub fn order_not_found(id: u32) -> Self {
        Self::NotFound { entity_type: "Order", id }
    }

    pub fn shelf_not_found(id: u32) -> Self {
        Self::NotFound { entity_type: "Shelf", id }
    }

    pub fn pallet_not_found(id: u32) -> Self {
        Self::NotFound { entity_type: "Pallet", id }
    }

    pub fn item_not_found(id: u32) -> Self {
        Self::NotFound { entity_type: "Item", id }
    }
}

/// Result type alias for fleet operations
pub type WfleetResult<T> = Result<T, WfleetError>;
