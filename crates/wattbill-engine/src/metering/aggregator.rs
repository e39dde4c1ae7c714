//! Consumption aggregation
//!
//! Per-cycle, per-meter consumption is a plain fold over the reading deltas
//! of that cycle. Cross-meter cost is the sum of each meter's independently
//! calculated tariff cost: every meter is billed as if it were the sole
//! consumer, and the per-meter costs are summed afterwards. The tariff is
//! never applied to the combined multi-meter total.

use crate::metering::ReadingLedger;
use crate::tariff::TariffCalculator;
use crate::round2;
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;
use wattbill_common::{Reading, SlabRateConfig};

/// Combined figures for one cycle across all meters
#[derive(Debug, Clone, PartialEq)]
pub struct CycleTotals {
    /// Sum of every meter's consumption
    pub total_units: Decimal,
    /// Sum of every meter's independently calculated cost
    pub total_cost: Decimal,
}

/// Read-side aggregation over the reading ledger
pub struct ConsumptionAggregator;

impl ConsumptionAggregator {
    /// Total consumption for an ordered slice of readings
    pub fn total_consumption(readings: &[Reading]) -> Decimal {
        readings.iter().map(|r| r.units_since_previous).sum()
    }

    /// Per-meter consumption for one cycle
    pub fn consumption_by_meter(ledger: &ReadingLedger, cycle_id: Uuid) -> HashMap<Uuid, Decimal> {
        ledger
            .meters_with_readings(cycle_id)
            .into_iter()
            .map(|meter_id| (meter_id, ledger.consumption_for(meter_id, cycle_id)))
            .collect()
    }

    /// Combined units and summed per-meter costs for one cycle
    ///
    /// With no tariff config available every cost is zero, matching the
    /// calculator's behaviour for absent configuration.
    pub fn cycle_totals(
        consumption_by_meter: &HashMap<Uuid, Decimal>,
        config: Option<&SlabRateConfig>,
    ) -> CycleTotals {
        let mut total_units = Decimal::ZERO;
        let mut total_cost = Decimal::ZERO;

        for units in consumption_by_meter.values() {
            total_units += *units;
            if let Some(config) = config {
                total_cost += TariffCalculator::compute_cost(*units, config);
            }
        }

        CycleTotals {
            total_units: round2(total_units),
            total_cost: round2(total_cost),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use wattbill_common::SlabTier;

    fn flat_config(rate: Decimal) -> SlabRateConfig {
        SlabRateConfig::new(
            "flat",
            Utc::now(),
            vec![SlabTier::open_ended(dec!(1), rate)],
            vec![SlabTier::open_ended(dec!(1), rate)],
        )
    }

    #[test]
    fn test_per_meter_costs_are_independent() {
        // Two meters at 400 units each stay inside the ≤500 tier set even
        // though the household total is 800.
        let config = SlabRateConfig::new(
            "split",
            Utc::now(),
            vec![SlabTier::open_ended(dec!(1), dec!(2))],
            vec![SlabTier::open_ended(dec!(1), dec!(10))],
        );

        let mut by_meter = HashMap::new();
        by_meter.insert(Uuid::new_v4(), dec!(400));
        by_meter.insert(Uuid::new_v4(), dec!(400));

        let totals = ConsumptionAggregator::cycle_totals(&by_meter, Some(&config));
        assert_eq!(totals.total_units, dec!(800));
        // 2 × (400 × 2), not 800 × 10
        assert_eq!(totals.total_cost, dec!(1600.00));
    }

    #[test]
    fn test_totals_without_config() {
        let mut by_meter = HashMap::new();
        by_meter.insert(Uuid::new_v4(), dec!(123.45));

        let totals = ConsumptionAggregator::cycle_totals(&by_meter, None);
        assert_eq!(totals.total_units, dec!(123.45));
        assert_eq!(totals.total_cost, dec!(0));
    }

    #[test]
    fn test_ledger_backed_aggregation() {
        use wattbill_common::NewReading;

        let ledger = ReadingLedger::new();
        let meter = Uuid::new_v4();
        let cycle = Uuid::new_v4();

        ledger
            .record(NewReading::new(meter, Utc::now(), dec!(100)), cycle)
            .unwrap();
        ledger
            .record(
                NewReading::new(meter, Utc::now() + chrono::Duration::days(1), dec!(160)),
                cycle,
            )
            .unwrap();

        let by_meter = ConsumptionAggregator::consumption_by_meter(&ledger, cycle);
        assert_eq!(by_meter.get(&meter), Some(&dec!(160)));

        // The fold over the raw readings agrees with the per-meter map
        let readings = ledger.meter_readings_for_cycle(meter, cycle);
        assert_eq!(ConsumptionAggregator::total_consumption(&readings), dec!(160));

        let totals = ConsumptionAggregator::cycle_totals(&by_meter, Some(&flat_config(dec!(2))));
        assert_eq!(totals.total_cost, dec!(320.00));
    }
}
