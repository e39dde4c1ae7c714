//! Electricity meter records
//!
//! Meters are created by configuration and read-only to the engine. At most
//! one general-purpose meter is the currently active general meter at a
//! time; that invariant is owned by the collaborator that manages meters,
//! the engine only consumes the flags.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A physical electricity meter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meter {
    /// Meter id
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Free-form category, e.g. "domestic" or "borewell"
    pub meter_type: String,
    /// Whether this meter is a general-purpose (shared) meter
    pub is_general_purpose: bool,
    /// Whether this is the currently active general-purpose meter
    pub is_currently_active_general: bool,
}

impl Meter {
    /// Create a new meter record
    pub fn new(name: impl Into<String>, meter_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            meter_type: meter_type.into(),
            is_general_purpose: false,
            is_currently_active_general: false,
        }
    }

    /// Mark the meter as general purpose
    pub fn general_purpose(mut self, currently_active: bool) -> Self {
        self.is_general_purpose = true;
        self.is_currently_active_general = currently_active;
        self
    }
}
