//! Progressive tariff configuration
//!
//! A slab config carries two explicit ordered tier lists: one applied when
//! a meter's total consumption stays within 500 units, one applied once it
//! exceeds 500. Selection is a discrete switch on the total, not a blend:
//! crossing the boundary re-prices every unit under the other tier set.
//! That cliff is billing policy, reproduced exactly.

use crate::error::ValidationError;
use crate::TIER_SET_SPLIT_UNITS;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One pricing tier within a tier set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlabTier {
    /// First unit priced by this tier (1-based)
    pub from_unit: Decimal,
    /// Last unit priced by this tier; `None` means open ended
    pub to_unit: Option<Decimal>,
    /// Price per unit
    pub rate: Decimal,
}

impl SlabTier {
    /// Create a bounded tier
    pub fn new(from_unit: Decimal, to_unit: Decimal, rate: Decimal) -> Self {
        Self {
            from_unit,
            to_unit: Some(to_unit),
            rate,
        }
    }

    /// Create an open-ended tier (no upper bound)
    pub fn open_ended(from_unit: Decimal, rate: Decimal) -> Self {
        Self {
            from_unit,
            to_unit: None,
            rate,
        }
    }

    /// Display label for the tier range, e.g. "101-300" or "501+"
    pub fn range_label(&self) -> String {
        match self.to_unit {
            Some(to) => format!("{}-{}", self.from_unit, to),
            None => format!("{}+", self.from_unit),
        }
    }

    /// Validate the tier bounds and rate
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(to) = self.to_unit {
            if to < self.from_unit {
                return Err(ValidationError::InvalidTierRange {
                    from_unit: self.from_unit,
                    to_unit: to,
                });
            }
        }
        if self.rate < Decimal::ZERO {
            return Err(ValidationError::NegativeTierRate(self.rate));
        }
        Ok(())
    }
}

/// A progressive tariff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlabRateConfig {
    /// Config id
    pub id: Uuid,
    /// Display name, e.g. "Domestic LT-1 2024"
    pub config_name: String,
    /// Date the tariff came into force
    pub effective_date: DateTime<Utc>,
    /// Whether this is the config currently used for billing; at most one
    /// config carries this flag at a time
    pub is_currently_active: bool,
    /// Tier set applied when total consumption is at most 500 units
    pub slabs_up_to_500: Vec<SlabTier>,
    /// Tier set applied once total consumption exceeds 500 units
    pub slabs_above_500: Vec<SlabTier>,
}

impl SlabRateConfig {
    /// Create a new inactive config
    pub fn new(
        config_name: impl Into<String>,
        effective_date: DateTime<Utc>,
        slabs_up_to_500: Vec<SlabTier>,
        slabs_above_500: Vec<SlabTier>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            config_name: config_name.into(),
            effective_date,
            is_currently_active: false,
            slabs_up_to_500,
            slabs_above_500,
        }
    }

    /// Select the tier set that applies to a consumption total
    pub fn applicable_slabs(&self, consumed_units: Decimal) -> &[SlabTier] {
        if consumed_units <= Decimal::from(TIER_SET_SPLIT_UNITS) {
            &self.slabs_up_to_500
        } else {
            &self.slabs_above_500
        }
    }

    /// Validate the config name and every tier in both sets
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.config_name.trim().is_empty() {
            return Err(ValidationError::EmptyConfigName);
        }
        for tier in self.slabs_up_to_500.iter().chain(&self.slabs_above_500) {
            tier.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn config(up_to: Vec<SlabTier>, above: Vec<SlabTier>) -> SlabRateConfig {
        SlabRateConfig::new("test", Utc::now(), up_to, above)
    }

    #[test]
    fn test_tier_set_selection_switches_at_500() {
        let cfg = config(
            vec![SlabTier::new(dec!(1), dec!(500), dec!(2))],
            vec![SlabTier::open_ended(dec!(1), dec!(7))],
        );

        assert_eq!(cfg.applicable_slabs(dec!(500))[0].rate, dec!(2));
        assert_eq!(cfg.applicable_slabs(dec!(500.01))[0].rate, dec!(7));
    }

    #[test]
    fn test_range_labels() {
        assert_eq!(SlabTier::new(dec!(101), dec!(300), dec!(3)).range_label(), "101-300");
        assert_eq!(SlabTier::open_ended(dec!(501), dec!(7)).range_label(), "501+");
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let cfg = config(vec![SlabTier::new(dec!(100), dec!(1), dec!(2))], vec![]);
        assert!(matches!(
            cfg.validate(),
            Err(ValidationError::InvalidTierRange { .. })
        ));
    }
}
