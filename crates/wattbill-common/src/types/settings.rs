//! User settings

use crate::error::ValidationError;
use crate::DEFAULT_CONSUMPTION_TARGET_UNITS;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-installation settings consumed by the summary builder
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    /// Unit threshold driving progress and pace displays
    pub consumption_target: Decimal,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            consumption_target: Decimal::from(DEFAULT_CONSUMPTION_TARGET_UNITS),
        }
    }
}

impl UserSettings {
    /// Validate the settings
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.consumption_target <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveTarget(self.consumption_target));
        }
        Ok(())
    }
}
