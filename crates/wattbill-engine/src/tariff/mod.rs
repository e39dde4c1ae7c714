//! Progressive tariff calculation

pub mod calculator;

pub use calculator::{TariffCalculator, TierQuote};
