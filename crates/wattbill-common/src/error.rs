//! Error types for the wattbill engine
//!
//! Provides a unified error type and domain-specific error variants.
//! Every failure is recoverable at the request boundary; nothing here is
//! fatal to the process.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Result type alias using BillingError
pub type Result<T> = std::result::Result<T, BillingError>;

/// Unified error type for wattbill operations
#[derive(Debug, Error)]
pub enum BillingError {
    // Malformed or out-of-range input
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // State the operation is not allowed to overwrite
    #[error("Conflict: {0}")]
    Conflict(#[from] ConflictError),

    // Missing cycle/config/reading
    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Input validation errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Collection date {collection_date} cannot be before cycle start {start_date}")]
    CollectionBeforeStart {
        collection_date: DateTime<Utc>,
        start_date: DateTime<Utc>,
    },

    #[error("Reading value cannot be negative: {0}")]
    NegativeReadingValue(Decimal),

    #[error("Consumption target must be positive: {0}")]
    NonPositiveTarget(Decimal),

    #[error("Slab tier range is invalid: from {from_unit} to {to_unit}")]
    InvalidTierRange { from_unit: Decimal, to_unit: Decimal },

    #[error("Slab rate cannot be negative: {0}")]
    NegativeTierRate(Decimal),

    #[error("Configuration name is required")]
    EmptyConfigName,
}

/// Conflicts with existing state
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConflictError {
    #[error("An active billing cycle already exists starting {started_on}")]
    ActiveCycleExists { started_on: DateTime<Utc> },

    #[error("Cannot delete a cycle that owns {count} readings")]
    CycleHasReadings { count: usize },

    #[error("Cannot delete the active tariff configuration")]
    TariffConfigActive,
}

/// Missing entities
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NotFoundError {
    #[error("No active billing cycle found")]
    NoActiveCycle,

    #[error("Billing cycle not found: {0}")]
    CycleNotFound(Uuid),

    #[error("Reading not found: {0}")]
    ReadingNotFound(Uuid),

    #[error("No active slab rate configuration found")]
    NoActiveTariff,

    #[error("Tariff configuration not found: {0}")]
    TariffConfigNotFound(Uuid),
}

// Implement From for common external error types
impl From<serde_json::Error> for BillingError {
    fn from(err: serde_json::Error) -> Self {
        BillingError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for BillingError {
    fn from(err: std::io::Error) -> Self {
        BillingError::Storage(err.to_string())
    }
}

impl From<anyhow::Error> for BillingError {
    fn from(err: anyhow::Error) -> Self {
        BillingError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let id = Uuid::new_v4();
        let err = BillingError::NotFound(NotFoundError::CycleNotFound(id));
        assert!(err.to_string().contains(&id.to_string()));
    }

    #[test]
    fn test_conflict_error() {
        let err = ConflictError::CycleHasReadings { count: 7 };
        assert!(err.to_string().contains("7 readings"));
    }
}
