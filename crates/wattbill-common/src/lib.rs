//! # Wattbill Common
//!
//! Shared types, errors, and constants for the wattbill billing engine.
//!
//! ## Core Types
//!
//! - [`Meter`]: a physical electricity meter, provided by configuration
//! - [`Reading`]: an absolute meter reading with its derived consumption delta
//! - [`BillingCycle`]: a billing period with an active/closed lifecycle
//! - [`SlabRateConfig`]: a progressive tariff as two ordered tier lists
//! - [`UserSettings`]: the consumption target driving progress displays

pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{BillingError, ConflictError, NotFoundError, Result, ValidationError};
pub use types::{
    cycle::{BillingCycle, CycleStatus},
    meter::Meter,
    reading::{NewReading, Reading},
    settings::UserSettings,
    tariff::{SlabRateConfig, SlabTier},
};

/// Wattbill version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Consumption boundary between the two tariff tier sets (units)
pub const TIER_SET_SPLIT_UNITS: u32 = 500;

/// Default consumption target when no settings record exists (units)
pub const DEFAULT_CONSUMPTION_TARGET_UNITS: u32 = 500;

/// Days-to-limit above which the pace projection reads as safe
pub const SAFE_PACE_DAYS: i64 = 60;

/// Days-to-limit below which the pace projection is flagged as tight
pub const TIGHT_PACE_DAYS: i64 = 10;

/// Decimal places used everywhere cost and consumption are surfaced
pub const MONEY_SCALE: u32 = 2;
