//! End-to-end engine scenarios
//!
//! Drives the `BillingEngine` facade the way a transport collaborator
//! would: configure meters and tariffs, run billing cycles, record
//! readings, and read back summaries and reports.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal_macros::dec;
use wattbill_engine::{BillingEngine, PaceStatus};
use wattbill_common::{
    BillingError, ConflictError, CycleStatus, Meter, NewReading, NotFoundError, SlabRateConfig,
    SlabTier,
};

fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

fn domestic_tariff() -> SlabRateConfig {
    let mut config = SlabRateConfig::new(
        "Domestic LT-1",
        date(2023, 4, 1),
        vec![
            SlabTier::new(dec!(1), dec!(100), dec!(2.00)),
            SlabTier::new(dec!(101), dec!(300), dec!(3.00)),
            SlabTier::new(dec!(301), dec!(500), dec!(4.50)),
        ],
        vec![
            SlabTier::new(dec!(1), dec!(500), dec!(5)),
            SlabTier::open_ended(dec!(501), dec!(7)),
        ],
    );
    config.is_currently_active = true;
    config
}

/// Engine with two meters, an active tariff, a closed baseline cycle
/// (holding each meter's first reading) and an active cycle starting Jan 1.
async fn engine_with_history() -> (BillingEngine, Meter, Meter) {
    let engine = BillingEngine::new();

    let main = Meter::new("Main House", "domestic").general_purpose(true);
    let borewell = Meter::new("Borewell", "motor");
    engine.set_meters(vec![main.clone(), borewell.clone()]).await;
    engine.add_tariff_config(domestic_tariff()).await.unwrap();

    engine.start_cycle(date(2023, 12, 1), None).await.unwrap();
    engine
        .record_reading(NewReading::new(main.id, date(2023, 12, 2), dec!(1000)))
        .await
        .unwrap();
    engine
        .record_reading(NewReading::new(borewell.id, date(2023, 12, 2), dec!(500)))
        .await
        .unwrap();
    engine.close_cycle(date(2024, 1, 1), None, None).await.unwrap();

    (engine, main, borewell)
}

#[tokio::test]
async fn dashboard_summary_bills_each_meter_independently() {
    let (engine, main, borewell) = engine_with_history().await;

    engine
        .record_reading(NewReading::new(main.id, date(2024, 1, 20), dec!(1250)))
        .await
        .unwrap();
    engine
        .record_reading(NewReading::new(borewell.id, date(2024, 1, 25), dec!(560)))
        .await
        .unwrap();

    let summary = engine.dashboard_summary_at(date(2024, 1, 25)).await.unwrap();

    assert_eq!(summary.current_billing_cycle.days_in_cycle, 24);
    assert_eq!(summary.meter_summaries.len(), 2);

    let main_summary = summary
        .meter_summaries
        .iter()
        .find(|m| m.meter_id == main.id)
        .unwrap();
    // 250 units: 100 × 2.00 + 150 × 3.00
    assert_eq!(main_summary.current_cycle_consumption, dec!(250));
    assert_eq!(main_summary.current_cycle_cost, dec!(650.00));
    assert_eq!(main_summary.previous_cycle_consumption, dec!(1000));
    assert_eq!(main_summary.current_tier.as_ref().unwrap().rate, dec!(3.00));

    let borewell_summary = summary
        .meter_summaries
        .iter()
        .find(|m| m.meter_id == borewell.id)
        .unwrap();
    // 60 units inside the first tier
    assert_eq!(borewell_summary.current_cycle_consumption, dec!(60));
    assert_eq!(borewell_summary.current_cycle_cost, dec!(120.00));

    // Sum of the independent per-meter costs, never one tariff over 310
    assert_eq!(summary.current_cycle_total_bill, dec!(770.00));
    assert!(summary.previous_billing_cycle.is_some());
}

#[tokio::test]
async fn pace_projection_scenarios() {
    let (engine, main, _) = engine_with_history().await;

    // 520 consumed against a 500 target
    engine
        .record_reading(NewReading::new(main.id, date(2024, 1, 20), dec!(1520)))
        .await
        .unwrap();

    let summary = engine.dashboard_summary_at(date(2024, 1, 21)).await.unwrap();
    let main_summary = summary
        .meter_summaries
        .iter()
        .find(|m| m.meter_id == main.id)
        .unwrap();

    assert!(main_summary.is_over_limit);
    assert_eq!(main_summary.units_remaining_to_target, dec!(0));
    assert_eq!(main_summary.pace, PaceStatus::LimitExceeded);
    assert_eq!(main_summary.pace_label, "Limit exceeded");
}

#[tokio::test]
async fn readings_attach_to_the_active_cycle_only() {
    let engine = BillingEngine::new();
    let meter = Meter::new("Main House", "domestic");
    engine.set_meters(vec![meter.clone()]).await;

    // No active cycle yet
    let err = engine
        .record_reading(NewReading::new(meter.id, date(2024, 1, 2), dec!(100)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BillingError::NotFound(NotFoundError::NoActiveCycle)
    ));

    let cycle = engine.start_cycle(date(2024, 1, 1), None).await.unwrap();
    let reading = engine
        .record_reading(
            NewReading::new(meter.id, date(2024, 1, 2), dec!(100))
                .with_notes("initial register value")
                .estimated(),
        )
        .await
        .unwrap();
    assert_eq!(reading.cycle_id, cycle.id);
    assert!(reading.is_estimated);
    assert_eq!(reading.notes.as_deref(), Some("initial register value"));
    assert_eq!(engine.readings_for_cycle(cycle.id).await.len(), 1);
}

#[tokio::test]
async fn cycle_lifecycle_via_facade() {
    let engine = BillingEngine::new();

    let first = engine.start_cycle(date(2024, 1, 1), None).await.unwrap();

    // Second start conflicts
    let err = engine.start_cycle(date(2024, 2, 1), None).await.unwrap_err();
    assert!(matches!(err, BillingError::Conflict(_)));

    // Close flips the first cycle and opens a successor atomically
    let transition = engine
        .close_cycle(date(2024, 3, 1), Some("paid".into()), None)
        .await
        .unwrap();
    assert_eq!(transition.closed.id, first.id);
    assert_eq!(transition.closed.status, CycleStatus::Closed);
    assert_eq!(engine.active_cycle().await.unwrap().id, transition.started.id);
}

#[tokio::test]
async fn concurrent_starts_admit_exactly_one_cycle() {
    let engine = std::sync::Arc::new(BillingEngine::new());

    let (a, b) = tokio::join!(
        engine.start_cycle(date(2024, 1, 1), None),
        engine.start_cycle(date(2024, 1, 1), None),
    );

    assert!(a.is_ok() != b.is_ok(), "exactly one start must win");
    assert!(engine.active_cycle().await.is_ok());
}

#[tokio::test]
async fn delete_cycle_respects_owned_readings() {
    let (engine, main, _) = engine_with_history().await;
    let active = engine.active_cycle().await.unwrap();

    let reading = engine
        .record_reading(NewReading::new(main.id, date(2024, 1, 10), dec!(1100)))
        .await
        .unwrap();

    let err = engine.delete_cycle(active.id).await.unwrap_err();
    assert!(matches!(
        err,
        BillingError::Conflict(ConflictError::CycleHasReadings { count: 1 })
    ));

    // Once the reading is gone the cycle can be deleted, active or not
    engine.delete_reading(reading.id).await.unwrap();
    engine.delete_cycle(active.id).await.unwrap();
    assert!(engine.active_cycle().await.is_err());
}

#[tokio::test]
async fn deleting_a_reading_recomputes_downstream_consumption() {
    let (engine, main, _) = engine_with_history().await;
    let active = engine.active_cycle().await.unwrap();

    let middle = engine
        .record_reading(NewReading::new(main.id, date(2024, 1, 10), dec!(1100)))
        .await
        .unwrap();
    engine
        .record_reading(NewReading::new(main.id, date(2024, 1, 20), dec!(1250)))
        .await
        .unwrap();

    let by_meter = engine.consumption_by_meter(active.id).await;
    assert_eq!(by_meter.get(&main.id), Some(&dec!(250)));

    // Dropping the middle reading must not change the cycle total: the last
    // reading's delta widens to span the gap.
    engine.delete_reading(middle.id).await.unwrap();
    let by_meter = engine.consumption_by_meter(active.id).await;
    assert_eq!(by_meter.get(&main.id), Some(&dec!(250)));
}

#[tokio::test]
async fn tariff_activation_keeps_a_single_active_config() {
    let engine = BillingEngine::new();

    let first = engine.add_tariff_config(domestic_tariff()).await.unwrap();
    let mut second = domestic_tariff();
    second.config_name = "Domestic LT-1 revised".into();
    second.is_currently_active = false;
    let second = engine.add_tariff_config(second).await.unwrap();

    engine.activate_tariff_config(second.id).await.unwrap();

    let configs = engine.tariff_configs().await;
    assert_eq!(configs.iter().filter(|c| c.is_currently_active).count(), 1);
    assert_eq!(engine.active_tariff_config().await.unwrap().id, second.id);

    // The active config is protected from deletion
    let err = engine.delete_tariff_config(second.id).await.unwrap_err();
    assert!(matches!(
        err,
        BillingError::Conflict(ConflictError::TariffConfigActive)
    ));
    engine.delete_tariff_config(first.id).await.unwrap();
}

#[tokio::test]
async fn cycle_reports_and_series_cover_history() {
    let (engine, main, borewell) = engine_with_history().await;

    engine
        .record_reading(NewReading::new(main.id, date(2024, 1, 20), dec!(1250)))
        .await
        .unwrap();
    engine
        .record_reading(NewReading::new(borewell.id, date(2024, 1, 25), dec!(560)))
        .await
        .unwrap();

    let reports = engine.list_cycle_reports().await;
    assert_eq!(reports.len(), 2);

    // Newest first: the active cycle leads
    assert!(reports[0].cycle.is_active());
    assert_eq!(reports[0].total_units, dec!(310));
    assert_eq!(reports[0].total_cost, dec!(770.00));
    assert_eq!(reports[0].meter_details.len(), 2);

    // Baseline cycle: first readings consume their whole register value,
    // and the 1000-unit meter crosses into the high-usage tier set.
    assert_eq!(reports[1].total_units, dec!(1500));
    // main: 500 × 5 + 500 × 7 = 6000; borewell: 200 + 600 + 900 = 1700
    assert_eq!(reports[1].total_cost, dec!(7700.00));

    let totals = engine.cycle_totals_series().await;
    assert_eq!(totals.len(), 2);
    // Oldest first, closed cycles labelled by their span
    assert_eq!(totals[0].name, "1 Dec - 1 Jan");
    assert_eq!(totals[0].total_cost, dec!(7700.00));
    assert!(totals[1].name.ends_with("(Current)"));

    let breakdown = engine.meter_breakdown_series().await;
    assert_eq!(breakdown.len(), 2);
    assert_eq!(breakdown[1].meters.len(), 2);
    let main_entry = breakdown[1]
        .meters
        .iter()
        .find(|m| m.meter_id == main.id)
        .unwrap();
    assert_eq!(main_entry.consumption, dec!(250));
}

#[tokio::test]
async fn consumption_target_feeds_the_summary() {
    let (engine, main, _) = engine_with_history().await;

    engine
        .record_reading(NewReading::new(main.id, date(2024, 1, 20), dec!(1250)))
        .await
        .unwrap();

    engine.set_consumption_target(dec!(250)).await.unwrap();
    let summary = engine.dashboard_summary_at(date(2024, 1, 25)).await.unwrap();

    assert_eq!(summary.global_consumption_target, dec!(250));
    let main_summary = summary
        .meter_summaries
        .iter()
        .find(|m| m.meter_id == main.id)
        .unwrap();
    // Exactly on target is not over the limit
    assert!(!main_summary.is_over_limit);
    assert_eq!(main_summary.percentage_to_target, dec!(100.00));

    let err = engine.set_consumption_target(dec!(0)).await.unwrap_err();
    assert!(matches!(err, BillingError::Validation(_)));
}

#[tokio::test]
async fn summary_requires_active_cycle_and_tariff() {
    let engine = BillingEngine::new();

    let err = engine.dashboard_summary().await.unwrap_err();
    assert!(matches!(
        err,
        BillingError::NotFound(NotFoundError::NoActiveCycle)
    ));

    engine.start_cycle(date(2024, 1, 1), None).await.unwrap();
    let err = engine.dashboard_summary().await.unwrap_err();
    assert!(matches!(
        err,
        BillingError::NotFound(NotFoundError::NoActiveTariff)
    ));
}
