//! Slab tariff walk
//!
//! Converts a consumption total into billed cost under a progressive tariff:
//!
//! ```text
//! cost = Σ over tiers of units_in_tier × tier_rate
//! units_in_tier = min(consumed, to_unit) - max(billed_so_far, from_unit - 1)
//! ```
//!
//! The tier set is chosen by the total (≤500 units vs >500 units) before the
//! walk starts; crossing the boundary re-prices every unit under the other
//! set. Costs are rounded half-up to 2 decimals wherever they surface.

use crate::round2;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use wattbill_common::{SlabRateConfig, SlabTier};

/// The tier a consumption total currently sits in, for display only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierQuote {
    /// Price per unit in the tier
    pub rate: Decimal,
    /// Display label for the tier range, e.g. "101-300"
    pub range_label: String,
}

/// Progressive tariff calculator
pub struct TariffCalculator;

impl TariffCalculator {
    /// Billed cost for a consumption total under a slab config
    ///
    /// Total over non-negative input: non-positive consumption costs zero,
    /// an empty tier set costs zero. Unsorted tier sets are tolerated; the
    /// walk sorts by `from_unit` before pricing.
    #[instrument(skip(config), fields(config_name = %config.config_name))]
    pub fn compute_cost(consumed_units: Decimal, config: &SlabRateConfig) -> Decimal {
        if consumed_units <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let mut slabs: Vec<SlabTier> = config.applicable_slabs(consumed_units).to_vec();
        slabs.sort_by(|a, b| a.from_unit.cmp(&b.from_unit));

        let mut total_cost = Decimal::ZERO;
        // Units already attributed to lower tiers
        let mut billed = Decimal::ZERO;

        for slab in &slabs {
            if consumed_units > slab.from_unit - Decimal::ONE {
                let upper = match slab.to_unit {
                    Some(to) => consumed_units.min(to),
                    None => consumed_units,
                };
                let lower = billed.max(slab.from_unit - Decimal::ONE);
                let units_in_slab = upper - lower;

                if units_in_slab > Decimal::ZERO {
                    total_cost += units_in_slab * slab.rate;
                    billed += units_in_slab;
                }
            }
            if billed >= consumed_units {
                break;
            }
        }

        round2(total_cost)
    }

    /// The tier a consumption total currently falls in
    ///
    /// Walks the selected tier set ascending and returns the last tier whose
    /// `from_unit` does not exceed the total. Display only; no cost
    /// implication.
    pub fn current_tier(consumed_units: Decimal, config: &SlabRateConfig) -> Option<TierQuote> {
        let mut slabs: Vec<SlabTier> = config.applicable_slabs(consumed_units).to_vec();
        slabs.sort_by(|a, b| a.from_unit.cmp(&b.from_unit));

        slabs
            .iter()
            .filter(|slab| slab.from_unit <= consumed_units)
            .last()
            .map(|slab| TierQuote {
                rate: slab.rate,
                range_label: slab.range_label(),
            })
    }
}
