//! # Wattbill Engine
//!
//! Billing computation engine for household electricity tracking.
//!
//! ## Pipeline
//!
//! ```text
//! Readings → ConsumptionAggregator → TariffCalculator → SummaryBuilder
//! ```
//!
//! Readings feed per-meter, per-cycle consumption; a progressive slab
//! tariff converts each meter's consumption into cost independently; the
//! summary builder derives the dashboard figures. [`CycleManager`] governs
//! which cycle new readings attach to and enforces the single-active-cycle
//! invariant, independently of the computation pipeline.
//!
//! [`BillingEngine`] wires the pieces behind one facade for transport
//! collaborators.

pub mod cycles;
pub mod metering;
pub mod summary;
pub mod tariff;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;
use wattbill_common::{
    BillingCycle, ConflictError, Meter, NewReading, NotFoundError, Reading, Result,
    SlabRateConfig, UserSettings, MONEY_SCALE,
};

pub use cycles::{CycleManager, CycleTransition};
pub use metering::{ConsumptionAggregator, CycleTotals, ReadingLedger};
pub use summary::{
    CycleReport, CycleTotalsPoint, DashboardSummary, MeterSeriesPoint, PaceStatus, ReportBuilder,
    SummaryBuilder,
};
pub use tariff::{TariffCalculator, TierQuote};

/// Round to the 2 decimal places used everywhere cost and consumption
/// totals are surfaced; half-up, away from zero
pub(crate) fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// The billing engine facade
///
/// Owns the reading ledger, the cycle table, the tariff configs, the meter
/// registry, and the settings record. All state is in process; collaborators
/// provide meters and tariff configs and consume the computed DTOs.
pub struct BillingEngine {
    ledger: Arc<ReadingLedger>,
    cycles: CycleManager,
    meters: RwLock<Vec<Meter>>,
    tariffs: RwLock<Vec<SlabRateConfig>>,
    settings: RwLock<UserSettings>,
}

impl BillingEngine {
    /// Create an engine with no meters, cycles, or tariffs
    pub fn new() -> Self {
        let ledger = Arc::new(ReadingLedger::new());
        Self {
            cycles: CycleManager::new(ledger.clone()),
            ledger,
            meters: RwLock::new(Vec::new()),
            tariffs: RwLock::new(Vec::new()),
            settings: RwLock::new(UserSettings::default()),
        }
    }

    // =========================================================================
    // Meter registry (provided by configuration, read-only to the engine)
    // =========================================================================

    /// Replace the meter registry
    pub async fn set_meters(&self, meters: Vec<Meter>) {
        *self.meters.write().await = meters;
    }

    /// The configured meters
    pub async fn meters(&self) -> Vec<Meter> {
        self.meters.read().await.clone()
    }

    // =========================================================================
    // Tariff configs
    // =========================================================================

    /// Add a tariff config
    ///
    /// A config flagged active displaces the previous active config; the
    /// clear-and-set runs under one write guard so at most one config ever
    /// carries the flag.
    #[instrument(skip(self, config), fields(config_name = %config.config_name))]
    pub async fn add_tariff_config(&self, config: SlabRateConfig) -> Result<SlabRateConfig> {
        config.validate()?;

        let mut tariffs = self.tariffs.write().await;
        if config.is_currently_active {
            for existing in tariffs.iter_mut() {
                existing.is_currently_active = false;
            }
        }
        tariffs.push(config.clone());
        info!(config_id = %config.id, "Added tariff config");
        Ok(config)
    }

    /// Make a config the active one, displacing the previous holder
    pub async fn activate_tariff_config(&self, config_id: Uuid) -> Result<SlabRateConfig> {
        let mut tariffs = self.tariffs.write().await;

        let position = tariffs
            .iter()
            .position(|t| t.id == config_id)
            .ok_or(NotFoundError::TariffConfigNotFound(config_id))?;

        for config in tariffs.iter_mut() {
            config.is_currently_active = false;
        }
        tariffs[position].is_currently_active = true;
        Ok(tariffs[position].clone())
    }

    /// Delete an inactive tariff config
    pub async fn delete_tariff_config(&self, config_id: Uuid) -> Result<()> {
        let mut tariffs = self.tariffs.write().await;

        let position = tariffs
            .iter()
            .position(|t| t.id == config_id)
            .ok_or(NotFoundError::TariffConfigNotFound(config_id))?;

        if tariffs[position].is_currently_active {
            return Err(ConflictError::TariffConfigActive.into());
        }

        tariffs.remove(position);
        Ok(())
    }

    /// All tariff configs, newest effective date first
    pub async fn tariff_configs(&self) -> Vec<SlabRateConfig> {
        let mut tariffs = self.tariffs.read().await.clone();
        tariffs.sort_by(|a, b| b.effective_date.cmp(&a.effective_date));
        tariffs
    }

    /// The active tariff config, if any
    pub async fn active_tariff_config(&self) -> Option<SlabRateConfig> {
        self.tariffs
            .read()
            .await
            .iter()
            .find(|t| t.is_currently_active)
            .cloned()
    }

    // =========================================================================
    // Settings
    // =========================================================================

    /// The current settings record
    pub async fn settings(&self) -> UserSettings {
        self.settings.read().await.clone()
    }

    /// Update the consumption target
    pub async fn set_consumption_target(&self, target: Decimal) -> Result<UserSettings> {
        let updated = UserSettings {
            consumption_target: target,
        };
        updated.validate()?;

        let mut settings = self.settings.write().await;
        *settings = updated;
        Ok(settings.clone())
    }

    // =========================================================================
    // Readings
    // =========================================================================

    /// Record a reading against the active cycle
    pub async fn record_reading(&self, input: NewReading) -> Result<Reading> {
        let active = self
            .cycles
            .active()
            .await
            .ok_or(NotFoundError::NoActiveCycle)?;
        self.ledger.record(input, active.id)
    }

    /// Delete a reading; its successor's delta is recomputed
    pub async fn delete_reading(&self, reading_id: Uuid) -> Result<Reading> {
        self.ledger.remove(reading_id)
    }

    /// All readings under a cycle, ordered by timestamp
    pub async fn readings_for_cycle(&self, cycle_id: Uuid) -> Vec<Reading> {
        self.ledger.readings_for_cycle(cycle_id)
    }

    /// Per-meter consumption for a cycle
    pub async fn consumption_by_meter(&self, cycle_id: Uuid) -> HashMap<Uuid, Decimal> {
        ConsumptionAggregator::consumption_by_meter(&self.ledger, cycle_id)
    }

    // =========================================================================
    // Cycle lifecycle
    // =========================================================================

    /// Start a new billing cycle
    pub async fn start_cycle(
        &self,
        start_date: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<BillingCycle> {
        self.cycles.start(start_date, notes).await
    }

    /// Close the active cycle and start its successor
    pub async fn close_cycle(
        &self,
        collection_date: DateTime<Utc>,
        notes_for_closed: Option<String>,
        notes_for_new: Option<String>,
    ) -> Result<CycleTransition> {
        self.cycles
            .close(collection_date, notes_for_closed, notes_for_new)
            .await
    }

    /// Delete a cycle that owns no readings
    pub async fn delete_cycle(&self, cycle_id: Uuid) -> Result<BillingCycle> {
        self.cycles.delete(cycle_id).await
    }

    /// Replace the notes on a cycle
    pub async fn update_cycle_notes(
        &self,
        cycle_id: Uuid,
        notes: Option<String>,
    ) -> Result<BillingCycle> {
        self.cycles.update_notes(cycle_id, notes).await
    }

    /// The active cycle
    pub async fn active_cycle(&self) -> Result<BillingCycle> {
        self.cycles.active().await.ok_or_else(|| NotFoundError::NoActiveCycle.into())
    }

    /// A cycle by id
    pub async fn cycle(&self, cycle_id: Uuid) -> Result<BillingCycle> {
        self.cycles
            .get(cycle_id)
            .await
            .ok_or_else(|| NotFoundError::CycleNotFound(cycle_id).into())
    }

    /// All cycles, newest first
    pub async fn list_cycles(&self) -> Vec<BillingCycle> {
        self.cycles.list().await
    }

    // =========================================================================
    // Reports & summaries
    // =========================================================================

    /// Every cycle enriched with totals and meter breakdown, newest first
    pub async fn list_cycle_reports(&self) -> Vec<CycleReport> {
        let config = self.active_tariff_config().await;
        let meters = self.meters().await;

        let mut reports = Vec::new();
        for cycle in self.cycles.list().await {
            let by_meter = self.consumption_by_meter(cycle.id).await;
            reports.push(ReportBuilder::cycle_report(
                &cycle,
                &by_meter,
                &meters,
                config.as_ref(),
            ));
        }
        reports
    }

    /// One cycle's report
    pub async fn cycle_report(&self, cycle_id: Uuid) -> Result<CycleReport> {
        let cycle = self.cycle(cycle_id).await?;
        let config = self.active_tariff_config().await;
        let meters = self.meters().await;
        let by_meter = self.consumption_by_meter(cycle.id).await;
        Ok(ReportBuilder::cycle_report(
            &cycle,
            &by_meter,
            &meters,
            config.as_ref(),
        ))
    }

    /// Per-cycle totals for the trend chart, oldest first
    pub async fn cycle_totals_series(&self) -> Vec<CycleTotalsPoint> {
        let config = self.active_tariff_config().await;

        let mut cycles = self.cycles.list().await;
        cycles.sort_by_key(|c| c.start_date);

        let mut series = Vec::new();
        for cycle in cycles {
            let by_meter = self.consumption_by_meter(cycle.id).await;
            if by_meter.is_empty() {
                continue;
            }
            series.push(ReportBuilder::totals_point(&cycle, &by_meter, config.as_ref()));
        }
        series
    }

    /// Per-cycle, per-meter consumption for the stacked chart, oldest first
    pub async fn meter_breakdown_series(&self) -> Vec<MeterSeriesPoint> {
        let meters = self.meters().await;

        let mut cycles = self.cycles.list().await;
        cycles.sort_by_key(|c| c.start_date);

        let mut series = Vec::new();
        for cycle in cycles {
            let by_meter = self.consumption_by_meter(cycle.id).await;
            if by_meter.is_empty() {
                continue;
            }
            series.push(ReportBuilder::meter_series_point(&cycle, &by_meter, &meters));
        }
        series
    }

    /// The dashboard summary for the active cycle, evaluated now
    pub async fn dashboard_summary(&self) -> Result<DashboardSummary> {
        self.dashboard_summary_at(Utc::now()).await
    }

    /// The dashboard summary with an injected clock, for reproducible tests
    #[instrument(skip(self))]
    pub async fn dashboard_summary_at(&self, now: DateTime<Utc>) -> Result<DashboardSummary> {
        let active = self
            .cycles
            .active()
            .await
            .ok_or(NotFoundError::NoActiveCycle)?;
        let config = self
            .active_tariff_config()
            .await
            .ok_or(NotFoundError::NoActiveTariff)?;

        let meters = self.meters().await;
        let settings = self.settings().await;
        let consumption = self.consumption_by_meter(active.id).await;

        let previous = self.cycles.previous_closed(active.start_date, active.id).await;
        let previous_consumption = match &previous {
            Some(cycle) => self.consumption_by_meter(cycle.id).await,
            None => HashMap::new(),
        };

        Ok(SummaryBuilder::build(
            &active,
            previous.as_ref(),
            &config,
            &meters,
            &consumption,
            &previous_consumption,
            &settings,
            now,
        ))
    }
}

impl Default for BillingEngine {
    fn default() -> Self {
        Self::new()
    }
}
