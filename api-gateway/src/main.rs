//! Wattbill API Gateway
//!
//! JSON surface over the billing engine:
//! - Dashboard: per-meter consumption, cost, pace projection
//! - Billing cycles: start / close / delete lifecycle with reports
//! - Readings: record and delete with automatic delta maintenance
//! - Analytics: per-cycle totals and stacked per-meter series
//! - Tariffs & settings: slab config management and consumption target

use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::Json,
    routing::{delete, get, post},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use uuid::Uuid;
use wattbill_common::{BillingError, Meter, NewReading, SlabRateConfig, SlabTier, UserSettings};
use wattbill_engine::{BillingEngine, CycleReport, DashboardSummary};

// ============ STATE ============

#[derive(Clone)]
struct AppState {
    engine: Arc<BillingEngine>,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

/// Map typed engine errors onto HTTP status codes
fn error_response(err: BillingError) -> ApiError {
    let status = match &err {
        BillingError::Validation(_) => StatusCode::BAD_REQUEST,
        BillingError::Conflict(_) => StatusCode::CONFLICT,
        BillingError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "message": err.to_string() })))
}

// ============ REQUEST TYPES ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartCycleRequest {
    start_date: DateTime<Utc>,
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CloseCycleRequest {
    government_collection_date: DateTime<Utc>,
    notes_for_closed_cycle: Option<String>,
    notes_for_new_cycle: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateCycleRequest {
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadingsQuery {
    cycle_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewTariffRequest {
    config_name: String,
    effective_date: DateTime<Utc>,
    slabs_up_to_500: Vec<SlabTier>,
    slabs_above_500: Vec<SlabTier>,
    #[serde(default)]
    activate: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateSettingsRequest {
    consumption_target: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CloseCycleResponse {
    message: String,
    closed_cycle: wattbill_common::BillingCycle,
    new_active_cycle: wattbill_common::BillingCycle,
}

// ============ HANDLERS ============

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "wattbill-api-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn dashboard_summary(
    State(state): State<AppState>,
) -> Result<Json<DashboardSummary>, ApiError> {
    state
        .engine
        .dashboard_summary()
        .await
        .map(Json)
        .map_err(error_response)
}

async fn list_cycles(State(state): State<AppState>) -> Json<Vec<CycleReport>> {
    Json(state.engine.list_cycle_reports().await)
}

async fn start_cycle(
    State(state): State<AppState>,
    Json(req): Json<StartCycleRequest>,
) -> Result<(StatusCode, Json<wattbill_common::BillingCycle>), ApiError> {
    state
        .engine
        .start_cycle(req.start_date, req.notes)
        .await
        .map(|cycle| (StatusCode::CREATED, Json(cycle)))
        .map_err(error_response)
}

async fn close_current_cycle(
    State(state): State<AppState>,
    Json(req): Json<CloseCycleRequest>,
) -> Result<Json<CloseCycleResponse>, ApiError> {
    state
        .engine
        .close_cycle(
            req.government_collection_date,
            req.notes_for_closed_cycle,
            req.notes_for_new_cycle,
        )
        .await
        .map(|transition| {
            Json(CloseCycleResponse {
                message: "Cycle closed and new one started.".to_string(),
                closed_cycle: transition.closed,
                new_active_cycle: transition.started,
            })
        })
        .map_err(error_response)
}

async fn active_cycle(
    State(state): State<AppState>,
) -> Result<Json<wattbill_common::BillingCycle>, ApiError> {
    state
        .engine
        .active_cycle()
        .await
        .map(Json)
        .map_err(error_response)
}

async fn get_cycle(
    State(state): State<AppState>,
    Path(cycle_id): Path<Uuid>,
) -> Result<Json<wattbill_common::BillingCycle>, ApiError> {
    state.engine.cycle(cycle_id).await.map(Json).map_err(error_response)
}

async fn update_cycle(
    State(state): State<AppState>,
    Path(cycle_id): Path<Uuid>,
    Json(req): Json<UpdateCycleRequest>,
) -> Result<Json<wattbill_common::BillingCycle>, ApiError> {
    state
        .engine
        .update_cycle_notes(cycle_id, req.notes)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn delete_cycle(
    State(state): State<AppState>,
    Path(cycle_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .engine
        .delete_cycle(cycle_id)
        .await
        .map(|_| Json(json!({ "message": "Deleted successfully." })))
        .map_err(error_response)
}

/// Report feed shared by the cycle table and the bill export
async fn cycle_report(
    State(state): State<AppState>,
    Path(cycle_id): Path<Uuid>,
) -> Result<Json<CycleReport>, ApiError> {
    state
        .engine
        .cycle_report(cycle_id)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn record_reading(
    State(state): State<AppState>,
    Json(req): Json<NewReading>,
) -> Result<(StatusCode, Json<wattbill_common::Reading>), ApiError> {
    state
        .engine
        .record_reading(req)
        .await
        .map(|reading| (StatusCode::CREATED, Json(reading)))
        .map_err(error_response)
}

async fn list_readings(
    State(state): State<AppState>,
    Query(query): Query<ReadingsQuery>,
) -> Result<Json<Vec<wattbill_common::Reading>>, ApiError> {
    let cycle_id = match query.cycle_id {
        Some(id) => id,
        None => state.engine.active_cycle().await.map_err(error_response)?.id,
    };
    Ok(Json(state.engine.readings_for_cycle(cycle_id).await))
}

async fn delete_reading(
    State(state): State<AppState>,
    Path(reading_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .engine
        .delete_reading(reading_id)
        .await
        .map(|_| Json(json!({ "message": "Deleted successfully." })))
        .map_err(error_response)
}

async fn analytics_cycle_summary(
    State(state): State<AppState>,
) -> Json<Vec<wattbill_engine::CycleTotalsPoint>> {
    Json(state.engine.cycle_totals_series().await)
}

async fn analytics_meter_breakdown(
    State(state): State<AppState>,
) -> Json<Vec<wattbill_engine::MeterSeriesPoint>> {
    Json(state.engine.meter_breakdown_series().await)
}

async fn list_meters(State(state): State<AppState>) -> Json<Vec<Meter>> {
    Json(state.engine.meters().await)
}

async fn list_tariffs(State(state): State<AppState>) -> Json<Vec<SlabRateConfig>> {
    Json(state.engine.tariff_configs().await)
}

async fn add_tariff(
    State(state): State<AppState>,
    Json(req): Json<NewTariffRequest>,
) -> Result<(StatusCode, Json<SlabRateConfig>), ApiError> {
    let mut config = SlabRateConfig::new(
        req.config_name,
        req.effective_date,
        req.slabs_up_to_500,
        req.slabs_above_500,
    );
    config.is_currently_active = req.activate;

    state
        .engine
        .add_tariff_config(config)
        .await
        .map(|config| (StatusCode::CREATED, Json(config)))
        .map_err(error_response)
}

async fn activate_tariff(
    State(state): State<AppState>,
    Path(config_id): Path<Uuid>,
) -> Result<Json<SlabRateConfig>, ApiError> {
    state
        .engine
        .activate_tariff_config(config_id)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn delete_tariff(
    State(state): State<AppState>,
    Path(config_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .engine
        .delete_tariff_config(config_id)
        .await
        .map(|_| Json(json!({ "message": "Deleted successfully." })))
        .map_err(error_response)
}

async fn get_settings(State(state): State<AppState>) -> Json<UserSettings> {
    Json(state.engine.settings().await)
}

async fn update_settings(
    State(state): State<AppState>,
    Json(req): Json<UpdateSettingsRequest>,
) -> Result<Json<UserSettings>, ApiError> {
    state
        .engine
        .set_consumption_target(req.consumption_target)
        .await
        .map(Json)
        .map_err(error_response)
}

// ============ SEED DATA ============

/// Standard domestic slab rates used until an operator configures their own
fn default_tariff() -> SlabRateConfig {
    let mut config = SlabRateConfig::new(
        "Domestic LT-1",
        Utc::now(),
        vec![
            SlabTier::new(dec!(1), dec!(100), dec!(2.00)),
            SlabTier::new(dec!(101), dec!(300), dec!(3.00)),
            SlabTier::new(dec!(301), dec!(500), dec!(4.50)),
        ],
        vec![
            SlabTier::new(dec!(1), dec!(500), dec!(5.00)),
            SlabTier::open_ended(dec!(501), dec!(7.00)),
        ],
    );
    config.is_currently_active = true;
    config
}

/// Seed meters, a default tariff, and an open cycle so the dashboard has
/// something to show on first launch
async fn seed_demo_data(engine: &BillingEngine) -> anyhow::Result<()> {
    engine
        .set_meters(vec![
            Meter::new("Main House", "domestic").general_purpose(true),
            Meter::new("Borewell", "motor"),
        ])
        .await;

    engine.add_tariff_config(default_tariff()).await?;
    engine.start_cycle(Utc::now(), Some("Seeded on startup.".into())).await?;

    info!("Seeded demo data: 2 meters, default tariff, open cycle");
    Ok(())
}

// ============ MAIN ============

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_gateway=info".parse()?),
        )
        .json()
        .init();

    dotenvy::dotenv().ok();

    let state = AppState {
        engine: Arc::new(BillingEngine::new()),
    };

    // Seed demo data on startup unless disabled
    let seed = std::env::var("WATTBILL_SEED").map(|v| v != "0").unwrap_or(true);
    if seed {
        seed_demo_data(&state.engine).await?;
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    let app = Router::new()
        // Health
        .route("/health", get(health_check))
        // Dashboard
        .route("/dashboard/summary", get(dashboard_summary))
        // Billing cycles
        .route("/cycles", get(list_cycles))
        .route("/cycles/start", post(start_cycle))
        .route("/cycles/close-current", post(close_current_cycle))
        .route("/cycles/active", get(active_cycle))
        .route("/cycles/:id", get(get_cycle).put(update_cycle).delete(delete_cycle))
        .route("/cycles/:id/report", get(cycle_report))
        // Readings
        .route("/readings", get(list_readings).post(record_reading))
        .route("/readings/:id", delete(delete_reading))
        // Analytics
        .route("/analytics/cycle-summary", get(analytics_cycle_summary))
        .route("/analytics/meter-breakdown", get(analytics_meter_breakdown))
        // Configuration
        .route("/meters", get(list_meters))
        .route("/tariffs", get(list_tariffs).post(add_tariff))
        .route("/tariffs/:id/activate", post(activate_tariff))
        .route("/tariffs/:id", delete(delete_tariff))
        .route("/settings", get(get_settings).put(update_settings))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let addr = format!("0.0.0.0:{}", port);
    info!("Wattbill API gateway starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
