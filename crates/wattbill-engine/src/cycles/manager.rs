//! Cycle lifecycle state machine
//!
//! States: `Active` → `Closed` (terminal). At most one cycle is active at
//! any time. Every lifecycle mutation runs under a single write-lock
//! acquisition spanning its check and its write, so a reader can never
//! observe zero or two active cycles. In particular, closing a cycle and
//! starting its successor is one guarded step, never a find-then-save pair.

use crate::metering::ReadingLedger;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;
use wattbill_common::{BillingCycle, ConflictError, NotFoundError, Result};

/// Note attached to the successor cycle when the caller supplies none
const AUTO_START_NOTE: &str = "New cycle started automatically.";

/// Result of closing a cycle: the closed period and its active successor
#[derive(Debug, Clone)]
pub struct CycleTransition {
    pub closed: BillingCycle,
    pub started: BillingCycle,
}

/// Owns the cycle table and enforces the single-active-cycle invariant
pub struct CycleManager {
    cycles: RwLock<Vec<BillingCycle>>,
    /// Consulted before deletion: cycles that own readings are protected
    ledger: Arc<ReadingLedger>,
}

impl CycleManager {
    /// Create a manager over an empty cycle table
    pub fn new(ledger: Arc<ReadingLedger>) -> Self {
        Self {
            cycles: RwLock::new(Vec::new()),
            ledger,
        }
    }

    /// Start a new billing cycle
    #[instrument(skip(self, notes))]
    pub async fn start(
        &self,
        start_date: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<BillingCycle> {
        let mut cycles = self.cycles.write().await;

        if let Some(active) = cycles.iter().find(|c| c.is_active()) {
            return Err(ConflictError::ActiveCycleExists {
                started_on: active.start_date,
            }
            .into());
        }

        let cycle = BillingCycle::start(start_date, notes);
        cycles.push(cycle.clone());
        info!(cycle_id = %cycle.id, %start_date, "Started billing cycle");
        Ok(cycle)
    }

    /// Close the active cycle and atomically start its successor
    ///
    /// The successor begins on the collection date. Both mutations happen
    /// under one write guard; after this returns, exactly one cycle is
    /// active.
    #[instrument(skip(self, notes_for_closed, notes_for_new))]
    pub async fn close(
        &self,
        collection_date: DateTime<Utc>,
        notes_for_closed: Option<String>,
        notes_for_new: Option<String>,
    ) -> Result<CycleTransition> {
        let mut cycles = self.cycles.write().await;

        let active = cycles
            .iter_mut()
            .find(|c| c.is_active())
            .ok_or(NotFoundError::NoActiveCycle)?;

        active.close(collection_date, notes_for_closed)?;
        let closed = active.clone();

        let started = BillingCycle::start(
            collection_date,
            Some(notes_for_new.unwrap_or_else(|| AUTO_START_NOTE.to_string())),
        );
        cycles.push(started.clone());

        info!(
            closed_id = %closed.id,
            started_id = %started.id,
            %collection_date,
            "Closed billing cycle and started successor"
        );
        Ok(CycleTransition { closed, started })
    }

    /// Delete a cycle
    ///
    /// Cycles that own readings are protected; an empty cycle is removed
    /// unconditionally, the active one included. Allowing the active cycle
    /// to be deleted is a kept policy choice, not an oversight.
    #[instrument(skip(self))]
    pub async fn delete(&self, cycle_id: Uuid) -> Result<BillingCycle> {
        let mut cycles = self.cycles.write().await;

        let position = cycles
            .iter()
            .position(|c| c.id == cycle_id)
            .ok_or(NotFoundError::CycleNotFound(cycle_id))?;

        let owned = self.ledger.count_for_cycle(cycle_id);
        if owned > 0 {
            return Err(ConflictError::CycleHasReadings { count: owned }.into());
        }

        let removed = cycles.remove(position);
        info!(cycle_id = %removed.id, "Deleted billing cycle");
        Ok(removed)
    }

    /// Replace the notes on a cycle
    pub async fn update_notes(&self, cycle_id: Uuid, notes: Option<String>) -> Result<BillingCycle> {
        let mut cycles = self.cycles.write().await;

        let cycle = cycles
            .iter_mut()
            .find(|c| c.id == cycle_id)
            .ok_or(NotFoundError::CycleNotFound(cycle_id))?;

        cycle.notes = notes;
        Ok(cycle.clone())
    }

    /// The currently active cycle, if any
    pub async fn active(&self) -> Option<BillingCycle> {
        self.cycles
            .read()
            .await
            .iter()
            .find(|c| c.is_active())
            .cloned()
    }

    /// Look up a cycle by id
    pub async fn get(&self, cycle_id: Uuid) -> Option<BillingCycle> {
        self.cycles
            .read()
            .await
            .iter()
            .find(|c| c.id == cycle_id)
            .cloned()
    }

    /// All cycles, newest first
    pub async fn list(&self) -> Vec<BillingCycle> {
        let mut cycles = self.cycles.read().await.clone();
        cycles.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        cycles
    }

    /// The most recently closed cycle that ended on or before a date
    ///
    /// Drives the previous-cycle trend comparison on the dashboard.
    pub async fn previous_closed(
        &self,
        before: DateTime<Utc>,
        excluding: Uuid,
    ) -> Option<BillingCycle> {
        self.cycles
            .read()
            .await
            .iter()
            .filter(|c| {
                !c.is_active() && c.id != excluding && c.end_date.is_some_and(|end| end <= before)
            })
            .max_by_key(|c| c.end_date)
            .cloned()
    }

    /// Number of cycles in the table
    pub async fn len(&self) -> usize {
        self.cycles.read().await.len()
    }

    /// Whether the table is empty
    pub async fn is_empty(&self) -> bool {
        self.cycles.read().await.is_empty()
    }
}
