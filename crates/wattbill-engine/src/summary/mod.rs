//! Dashboard summaries and cycle reports

pub mod builder;
pub mod report;

pub use builder::{DashboardSummary, MeterSummary, PaceStatus, SummaryBuilder};
pub use report::{CycleReport, CycleTotalsPoint, MeterBreakdownEntry, MeterSeriesPoint, ReportBuilder};
