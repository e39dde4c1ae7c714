//! Billing cycle lifecycle
//!
//! A cycle is `Active` from the moment it is started until it is closed
//! against a government collection date. `Closed` is terminal: cycles are
//! never reopened. At most one cycle is active at any time; the manager
//! that owns the cycle table enforces that under a single write lock.

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Billing cycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    Active,
    Closed,
}

impl CycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleStatus::Active => "active",
            CycleStatus::Closed => "closed",
        }
    }
}

/// A billing period
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingCycle {
    /// Cycle id
    pub id: Uuid,
    /// When the period began
    pub start_date: DateTime<Utc>,
    /// When the period ended; absent while active
    pub end_date: Option<DateTime<Utc>>,
    /// Lifecycle status
    pub status: CycleStatus,
    /// Date the meter was read for government billing, recorded at close
    pub government_collection_date: Option<DateTime<Utc>>,
    /// Free-text notes
    pub notes: Option<String>,
}

impl BillingCycle {
    /// Create a new cycle in the active state
    pub fn start(start_date: DateTime<Utc>, notes: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            start_date,
            end_date: None,
            status: CycleStatus::Active,
            government_collection_date: None,
            notes,
        }
    }

    /// Whether the cycle is still accepting readings
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == CycleStatus::Active
    }

    /// Close the cycle against a collection date
    ///
    /// The collection date must not precede the cycle's start date.
    pub fn close(
        &mut self,
        collection_date: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<(), ValidationError> {
        if collection_date < self.start_date {
            return Err(ValidationError::CollectionBeforeStart {
                collection_date,
                start_date: self.start_date,
            });
        }

        self.end_date = Some(collection_date);
        self.government_collection_date = Some(collection_date);
        self.status = CycleStatus::Closed;
        if notes.is_some() {
            self.notes = notes;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_close_sets_terminal_state() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        let mut cycle = BillingCycle::start(start, None);
        assert!(cycle.is_active());

        cycle.close(end, Some("collected".into())).unwrap();
        assert_eq!(cycle.status, CycleStatus::Closed);
        assert_eq!(cycle.end_date, Some(end));
        assert_eq!(cycle.government_collection_date, Some(end));
    }

    #[test]
    fn test_close_rejects_collection_before_start() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();

        let mut cycle = BillingCycle::start(start, None);
        let err = cycle.close(before, None).unwrap_err();
        assert!(matches!(err, ValidationError::CollectionBeforeStart { .. }));
        assert!(cycle.is_active());
    }
}
