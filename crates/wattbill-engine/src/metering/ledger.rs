//! Reading ledger with delta maintenance
//!
//! Owns the per-meter chronological reading sequences across all cycles.
//! Each reading carries a derived `units_since_previous` delta; the ledger
//! treats that delta as a cache over the raw sequence and recomputes it for
//! the chronological successor whenever an insert or delete changes which
//! reading precedes it. Deltas are never clamped: a register rollback shows
//! up as a negative delta and is summed as-is downstream.

use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::{debug, instrument};
use uuid::Uuid;
use wattbill_common::{NewReading, NotFoundError, Reading, Result};

/// In-process reading store, sharded by meter
#[derive(Default)]
pub struct ReadingLedger {
    /// Chronologically sorted readings per meter
    by_meter: DashMap<Uuid, Vec<Reading>>,
}

impl ReadingLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reading under a billing cycle
    ///
    /// The delta is computed against the chronologically previous reading
    /// for the same meter, across cycle boundaries; the first reading of a
    /// meter consumes its whole register value. An insert that lands in the
    /// middle of the sequence also refreshes the delta of the reading that
    /// now follows it.
    #[instrument(skip(self, input), fields(meter_id = %input.meter_id))]
    pub fn record(&self, input: NewReading, cycle_id: Uuid) -> Result<Reading> {
        input.validate()?;

        let mut readings = self.by_meter.entry(input.meter_id).or_default();
        let position = readings.partition_point(|r| r.recorded_at <= input.recorded_at);

        let units_since_previous = match position.checked_sub(1).map(|i| &readings[i]) {
            Some(previous) => input.value - previous.value,
            None => input.value,
        };

        let reading = Reading {
            id: Uuid::new_v4(),
            meter_id: input.meter_id,
            cycle_id,
            recorded_at: input.recorded_at,
            value: input.value,
            units_since_previous,
            notes: input.notes,
            is_estimated: input.is_estimated,
        };

        readings.insert(position, reading.clone());
        Self::refresh_delta(&mut readings, position + 1);

        debug!(reading_id = %reading.id, position, "Recorded reading");
        Ok(reading)
    }

    /// Remove a reading and heal the successor's delta
    #[instrument(skip(self))]
    pub fn remove(&self, reading_id: Uuid) -> Result<Reading> {
        for mut entry in self.by_meter.iter_mut() {
            let readings = entry.value_mut();
            if let Some(position) = readings.iter().position(|r| r.id == reading_id) {
                let removed = readings.remove(position);
                // The reading that followed the removed one now has a new
                // chronological predecessor.
                Self::refresh_delta(readings, position);
                debug!(meter_id = %removed.meter_id, position, "Removed reading");
                return Ok(removed);
            }
        }
        Err(NotFoundError::ReadingNotFound(reading_id).into())
    }

    /// Look up a reading by id
    pub fn get(&self, reading_id: Uuid) -> Option<Reading> {
        self.by_meter
            .iter()
            .find_map(|entry| entry.value().iter().find(|r| r.id == reading_id).cloned())
    }

    /// All readings recorded under a cycle, ordered by timestamp
    pub fn readings_for_cycle(&self, cycle_id: Uuid) -> Vec<Reading> {
        let mut readings: Vec<Reading> = self
            .by_meter
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|r| r.cycle_id == cycle_id)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        readings.sort_by_key(|r| r.recorded_at);
        readings
    }

    /// Readings for one meter under one cycle, ordered by timestamp
    pub fn meter_readings_for_cycle(&self, meter_id: Uuid, cycle_id: Uuid) -> Vec<Reading> {
        self.by_meter
            .get(&meter_id)
            .map(|readings| {
                readings
                    .iter()
                    .filter(|r| r.cycle_id == cycle_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of readings a cycle owns, across all meters
    pub fn count_for_cycle(&self, cycle_id: Uuid) -> usize {
        self.by_meter
            .iter()
            .map(|entry| entry.value().iter().filter(|r| r.cycle_id == cycle_id).count())
            .sum()
    }

    /// Sum of deltas for one meter under one cycle
    pub fn consumption_for(&self, meter_id: Uuid, cycle_id: Uuid) -> Decimal {
        self.by_meter
            .get(&meter_id)
            .map(|readings| {
                readings
                    .iter()
                    .filter(|r| r.cycle_id == cycle_id)
                    .map(|r| r.units_since_previous)
                    .sum()
            })
            .unwrap_or(Decimal::ZERO)
    }

    /// Meters that have at least one reading under a cycle
    pub fn meters_with_readings(&self, cycle_id: Uuid) -> Vec<Uuid> {
        self.by_meter
            .iter()
            .filter(|entry| entry.value().iter().any(|r| r.cycle_id == cycle_id))
            .map(|entry| *entry.key())
            .collect()
    }

    /// Total number of stored readings
    pub fn len(&self) -> usize {
        self.by_meter.iter().map(|entry| entry.value().len()).sum()
    }

    /// Whether the ledger holds no readings
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Recompute the cached delta of the reading at `position` against its
    /// current predecessor
    fn refresh_delta(readings: &mut [Reading], position: usize) {
        if position >= readings.len() {
            return;
        }
        let previous_value = position.checked_sub(1).map(|i| readings[i].value);
        let reading = &mut readings[position];
        reading.units_since_previous = match previous_value {
            Some(previous) => reading.value - previous,
            None => reading.value,
        };
    }
}
