//! Summary computation for the dashboard
//!
//! Derives the per-meter figures a dashboard or export needs from the
//! active cycle: daily average, progress against the consumption target,
//! pace projection, current tariff tier, and the previous-cycle comparison.
//! Dashboard and export collaborators consume the same DTO, so both
//! surfaces always report the same numbers.

use crate::round2;
use crate::tariff::{TariffCalculator, TierQuote};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use wattbill_common::{
    BillingCycle, Meter, SlabRateConfig, UserSettings, SAFE_PACE_DAYS, TIGHT_PACE_DAYS,
};

/// Seconds per day, for cycle day counting
const DAY_SECONDS: i64 = 24 * 60 * 60;

/// Projection of when the consumption target will be reached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaceStatus {
    /// Consumption already exceeds the target
    LimitExceeded,
    /// More than [`SAFE_PACE_DAYS`] away from the target at the current pace
    Safe,
    /// Projected days until the target is reached; `tight` under
    /// [`TIGHT_PACE_DAYS`] days
    DaysToLimit { days: i64, tight: bool },
    /// No consumption yet, so no pace can be projected
    Unknown,
}

impl PaceStatus {
    /// Project the pace from remaining units and the daily average
    pub fn project(is_over_limit: bool, units_remaining: Decimal, average_daily: Decimal) -> Self {
        if is_over_limit {
            return PaceStatus::LimitExceeded;
        }
        if average_daily <= Decimal::ZERO {
            return PaceStatus::Unknown;
        }

        let days = (units_remaining / average_daily)
            .floor()
            .to_i64()
            .unwrap_or(i64::MAX);
        if days > SAFE_PACE_DAYS {
            PaceStatus::Safe
        } else {
            PaceStatus::DaysToLimit {
                days,
                tight: days < TIGHT_PACE_DAYS,
            }
        }
    }

    /// Display label
    pub fn label(&self) -> String {
        match self {
            PaceStatus::LimitExceeded => "Limit exceeded".to_string(),
            PaceStatus::Safe => "Pace: Safe".to_string(),
            PaceStatus::DaysToLimit { days, .. } => format!("~{} days to limit", days),
            PaceStatus::Unknown => "-".to_string(),
        }
    }
}

/// Per-meter dashboard figures
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterSummary {
    pub meter_id: Uuid,
    pub meter_name: String,
    pub meter_type: String,
    pub is_general_purpose: bool,
    pub is_currently_active_general: bool,
    pub current_cycle_consumption: Decimal,
    pub current_cycle_cost: Decimal,
    pub average_daily_consumption: Decimal,
    pub units_remaining_to_target: Decimal,
    pub percentage_to_target: Decimal,
    pub consumption_target: Decimal,
    pub is_over_limit: bool,
    pub pace: PaceStatus,
    pub pace_label: String,
    pub current_tier: Option<TierQuote>,
    pub previous_cycle_consumption: Decimal,
}

/// Facts about the active cycle as shown on the dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveCycleInfo {
    pub id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: wattbill_common::CycleStatus,
    pub notes: Option<String>,
    pub days_in_cycle: i64,
}

/// The active tariff as shown on the dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTariffInfo {
    pub id: Uuid,
    pub config_name: String,
    pub effective_date: DateTime<Utc>,
}

/// Complete dashboard summary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub current_billing_cycle: ActiveCycleInfo,
    pub previous_billing_cycle: Option<BillingCycle>,
    pub active_slab_configuration: ActiveTariffInfo,
    pub meter_summaries: Vec<MeterSummary>,
    pub current_cycle_total_bill: Decimal,
    pub global_consumption_target: Decimal,
}

/// Builds dashboard summaries from aggregated consumption
pub struct SummaryBuilder;

impl SummaryBuilder {
    /// Whole days elapsed in the cycle, rounded up and clamped to at least 1
    ///
    /// A clock that sits before the cycle start is treated as the start
    /// itself, so a future-dated cycle reads as day 1.
    pub fn days_in_cycle(start_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
        let effective_now = now.max(start_date);
        let seconds = (effective_now - start_date).num_seconds();
        let days = (seconds + DAY_SECONDS - 1) / DAY_SECONDS;
        days.max(1)
    }

    /// Summarize one meter's cycle so far
    pub fn meter_summary(
        meter: &Meter,
        consumption: Decimal,
        previous_cycle_consumption: Decimal,
        days_in_cycle: i64,
        config: &SlabRateConfig,
        target: Decimal,
    ) -> MeterSummary {
        let consumption = round2(consumption);
        let cost = TariffCalculator::compute_cost(consumption, config);
        let average_daily = round2(consumption / Decimal::from(days_in_cycle));

        let units_remaining = round2((target - consumption).max(Decimal::ZERO));
        let percentage = round2(consumption / target * Decimal::ONE_HUNDRED);
        let is_over_limit = consumption > target;

        let pace = PaceStatus::project(is_over_limit, units_remaining, average_daily);

        MeterSummary {
            meter_id: meter.id,
            meter_name: meter.name.clone(),
            meter_type: meter.meter_type.clone(),
            is_general_purpose: meter.is_general_purpose,
            is_currently_active_general: meter.is_currently_active_general,
            current_cycle_consumption: consumption,
            current_cycle_cost: cost,
            average_daily_consumption: average_daily,
            units_remaining_to_target: units_remaining,
            percentage_to_target: percentage,
            consumption_target: target,
            is_over_limit,
            pace_label: pace.label(),
            pace,
            current_tier: TariffCalculator::current_tier(consumption, config),
            previous_cycle_consumption: round2(previous_cycle_consumption),
        }
    }

    /// Build the full dashboard summary
    ///
    /// `now` is injected so projections are reproducible under test.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        active_cycle: &BillingCycle,
        previous_cycle: Option<&BillingCycle>,
        config: &SlabRateConfig,
        meters: &[Meter],
        consumption_by_meter: &HashMap<Uuid, Decimal>,
        previous_by_meter: &HashMap<Uuid, Decimal>,
        settings: &UserSettings,
        now: DateTime<Utc>,
    ) -> DashboardSummary {
        let days_in_cycle = Self::days_in_cycle(active_cycle.start_date, now);
        let target = settings.consumption_target;

        let mut total_bill = Decimal::ZERO;
        let meter_summaries: Vec<MeterSummary> = meters
            .iter()
            .map(|meter| {
                let consumption = consumption_by_meter
                    .get(&meter.id)
                    .copied()
                    .unwrap_or(Decimal::ZERO);
                let previous = previous_by_meter
                    .get(&meter.id)
                    .copied()
                    .unwrap_or(Decimal::ZERO);
                let summary =
                    Self::meter_summary(meter, consumption, previous, days_in_cycle, config, target);
                total_bill += summary.current_cycle_cost;
                summary
            })
            .collect();

        DashboardSummary {
            current_billing_cycle: ActiveCycleInfo {
                id: active_cycle.id,
                start_date: active_cycle.start_date,
                end_date: active_cycle.end_date,
                status: active_cycle.status,
                notes: active_cycle.notes.clone(),
                days_in_cycle,
            },
            previous_billing_cycle: previous_cycle.cloned(),
            active_slab_configuration: ActiveTariffInfo {
                id: config.id,
                config_name: config.config_name.clone(),
                effective_date: config.effective_date,
            },
            meter_summaries,
            current_cycle_total_bill: round2(total_bill),
            global_consumption_target: target,
        }
    }
}
