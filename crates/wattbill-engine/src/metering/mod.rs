//! Reading storage and consumption aggregation

pub mod aggregator;
pub mod ledger;

pub use aggregator::{ConsumptionAggregator, CycleTotals};
pub use ledger::ReadingLedger;
