//! Meter readings
//!
//! A reading stores the absolute register value seen on the meter plus a
//! derived `units_since_previous` delta. The delta is a cache over the raw
//! per-meter sequence: the ledger that owns readings recomputes it whenever
//! an insert or delete changes a reading's chronological predecessor.

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recorded meter reading
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    /// Reading id
    pub id: Uuid,
    /// Meter the register value was read from
    pub meter_id: Uuid,
    /// Billing cycle the reading was recorded under
    pub cycle_id: Uuid,
    /// When the register was read
    pub recorded_at: DateTime<Utc>,
    /// Absolute register value (units)
    pub value: Decimal,
    /// Consumption since the chronologically previous reading for the same
    /// meter (any cycle), or the value itself for the first reading
    pub units_since_previous: Decimal,
    /// Free-text notes
    pub notes: Option<String>,
    /// Whether the value was estimated rather than read off the register
    pub is_estimated: bool,
}

/// Input for recording a reading
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReading {
    pub meter_id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub value: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_estimated: bool,
}

impl NewReading {
    /// Create a new reading input
    pub fn new(meter_id: Uuid, recorded_at: DateTime<Utc>, value: Decimal) -> Self {
        Self {
            meter_id,
            recorded_at,
            value,
            notes: None,
            is_estimated: false,
        }
    }

    /// Attach notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Mark the value as estimated
    pub fn estimated(mut self) -> Self {
        self.is_estimated = true;
        self
    }

    /// Validate the input
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.value < Decimal::ZERO {
            return Err(ValidationError::NegativeReadingValue(self.value));
        }
        Ok(())
    }
}
