//! Cycle reports and analytics series
//!
//! Enriches stored cycles with the per-meter consumption/cost breakdown the
//! cycle listing and the export collaborator share, and shapes the two
//! chart series: per-cycle totals and the per-meter stacked breakdown.

use crate::metering::ConsumptionAggregator;
use crate::round2;
use crate::tariff::TariffCalculator;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use wattbill_common::{BillingCycle, Meter, SlabRateConfig};

/// One meter's row in a cycle report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterBreakdownEntry {
    pub meter_id: Uuid,
    pub meter_name: String,
    pub meter_type: String,
    pub units: Decimal,
    pub cost: Decimal,
}

/// A cycle enriched with totals and its per-meter breakdown
///
/// Feeds the cycle listing and the bill export identically.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    #[serde(flatten)]
    pub cycle: BillingCycle,
    pub total_units: Decimal,
    pub total_cost: Decimal,
    pub meter_details: Vec<MeterBreakdownEntry>,
}

/// One cycle's point in the consumption/cost trend chart
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleTotalsPoint {
    pub id: Uuid,
    pub name: String,
    pub total_consumption: Decimal,
    pub total_cost: Decimal,
}

/// One meter's contribution within a [`MeterSeriesPoint`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterConsumptionEntry {
    pub meter_id: Uuid,
    pub meter_name: String,
    pub consumption: Decimal,
}

/// One cycle's point in the stacked per-meter chart
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterSeriesPoint {
    pub name: String,
    pub meters: Vec<MeterConsumptionEntry>,
}

/// Shapes cycles and aggregated consumption into report DTOs
pub struct ReportBuilder;

impl ReportBuilder {
    /// Short date for chart labels, e.g. "5 Mar"
    fn format_date(date: DateTime<Utc>) -> String {
        date.format("%-d %b").to_string()
    }

    /// Chart label for a cycle: "5 Mar - 10 May", or "5 Mar (Current)"
    /// while the cycle is active
    pub fn cycle_label(cycle: &BillingCycle) -> String {
        if cycle.is_active() {
            format!("{} (Current)", Self::format_date(cycle.start_date))
        } else {
            let end = cycle
                .end_date
                .map(Self::format_date)
                .unwrap_or_else(|| "N/A".to_string());
            format!("{} - {}", Self::format_date(cycle.start_date), end)
        }
    }

    /// Enrich a cycle with totals and its per-meter breakdown
    ///
    /// Meters missing from the registry still appear, under a placeholder
    /// name, so historical readings survive meter reconfiguration. Without
    /// a tariff config every cost is zero.
    pub fn cycle_report(
        cycle: &BillingCycle,
        consumption_by_meter: &HashMap<Uuid, Decimal>,
        meters: &[Meter],
        config: Option<&SlabRateConfig>,
    ) -> CycleReport {
        let totals = ConsumptionAggregator::cycle_totals(consumption_by_meter, config);

        let mut meter_details: Vec<MeterBreakdownEntry> = consumption_by_meter
            .iter()
            .map(|(meter_id, units)| {
                let meter = meters.iter().find(|m| m.id == *meter_id);
                let cost = config
                    .map(|c| TariffCalculator::compute_cost(*units, c))
                    .unwrap_or(Decimal::ZERO);
                MeterBreakdownEntry {
                    meter_id: *meter_id,
                    meter_name: meter.map_or("Unknown Meter".to_string(), |m| m.name.clone()),
                    meter_type: meter.map_or("N/A".to_string(), |m| m.meter_type.clone()),
                    units: round2(*units),
                    cost,
                }
            })
            .collect();
        meter_details.sort_by(|a, b| a.meter_name.cmp(&b.meter_name));

        CycleReport {
            cycle: cycle.clone(),
            total_units: totals.total_units,
            total_cost: totals.total_cost,
            meter_details,
        }
    }

    /// One point of the per-cycle totals series
    pub fn totals_point(
        cycle: &BillingCycle,
        consumption_by_meter: &HashMap<Uuid, Decimal>,
        config: Option<&SlabRateConfig>,
    ) -> CycleTotalsPoint {
        let totals = ConsumptionAggregator::cycle_totals(consumption_by_meter, config);
        CycleTotalsPoint {
            id: cycle.id,
            name: Self::cycle_label(cycle),
            total_consumption: totals.total_units,
            total_cost: totals.total_cost,
        }
    }

    /// One point of the stacked per-meter series
    pub fn meter_series_point(
        cycle: &BillingCycle,
        consumption_by_meter: &HashMap<Uuid, Decimal>,
        meters: &[Meter],
    ) -> MeterSeriesPoint {
        let mut entries: Vec<MeterConsumptionEntry> = consumption_by_meter
            .iter()
            .map(|(meter_id, units)| MeterConsumptionEntry {
                meter_id: *meter_id,
                meter_name: meters
                    .iter()
                    .find(|m| m.id == *meter_id)
                    .map_or("Unknown Meter".to_string(), |m| m.name.clone()),
                consumption: round2(*units),
            })
            .collect();
        entries.sort_by(|a, b| a.meter_name.cmp(&b.meter_name));

        MeterSeriesPoint {
            name: Self::cycle_label(cycle),
            meters: entries,
        }
    }
}
