//! Per-segment download status, shared between fetchers and the aggregator.
//!
//! The table holds one slot per segment index. Slot `i` is written only by
//! the fetcher that owns segment `i`; the aggregator and the engine read
//! snapshots. Locking is per slot, so N fetchers never contend on a global
//! lock. Terminal states are sticky: once a slot is `Succeeded` or `Failed`
//! further writes are ignored.

use std::sync::{Arc, Mutex};

/// Lifecycle of one segment fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    /// Not yet attempted (or first attempt in flight).
    Pending,
    /// At least one attempt failed; another attempt is pending or in flight.
    Retrying,
    /// Segment file is complete and length-validated.
    Succeeded,
    /// Retry budget exhausted.
    Failed,
}

/// Snapshot of one slot.
#[derive(Debug, Clone)]
pub struct SegmentStatus {
    pub state: SegmentState,
    /// Number of failed attempts so far.
    pub retries: u32,
    /// Message from the most recent failed attempt.
    pub last_error: Option<String>,
}

impl SegmentStatus {
    fn new() -> Self {
        Self {
            state: SegmentState::Pending,
            retries: 0,
            last_error: None,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self.state, SegmentState::Succeeded | SegmentState::Failed)
    }
}

/// Shared status table, one slot per segment index.
#[derive(Debug, Clone)]
pub struct StatusTable {
    slots: Arc<Vec<Mutex<SegmentStatus>>>,
}

impl StatusTable {
    pub fn new(segment_count: usize) -> Self {
        let slots = (0..segment_count)
            .map(|_| Mutex::new(SegmentStatus::new()))
            .collect();
        Self {
            slots: Arc::new(slots),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Record a failed attempt that will be retried.
    pub fn mark_retrying(&self, index: usize, retries: u32, error: String) {
        self.update(index, |slot| {
            slot.state = SegmentState::Retrying;
            slot.retries = retries;
            slot.last_error = Some(error);
        });
    }

    /// Record a completed, length-validated segment.
    pub fn mark_succeeded(&self, index: usize, retries: u32) {
        self.update(index, |slot| {
            slot.state = SegmentState::Succeeded;
            slot.retries = retries;
        });
    }

    /// Record retry-budget exhaustion.
    pub fn mark_failed(&self, index: usize, retries: u32, error: String) {
        self.update(index, |slot| {
            slot.state = SegmentState::Failed;
            slot.retries = retries;
            slot.last_error = Some(error);
        });
    }

    fn update(&self, index: usize, apply: impl FnOnce(&mut SegmentStatus)) {
        let Some(slot) = self.slots.get(index) else {
            return;
        };
        let mut slot = slot.lock().unwrap_or_else(|poison| poison.into_inner());
        if slot.is_terminal() {
            return;
        }
        apply(&mut slot);
    }

    /// Copy of the whole table. Readers tolerate staleness; each slot is
    /// locked only long enough to clone it.
    pub fn snapshot(&self) -> Vec<SegmentStatus> {
        self.slots
            .iter()
            .map(|slot| slot.lock().unwrap_or_else(|poison| poison.into_inner()).clone())
            .collect()
    }

    pub fn all_succeeded(&self) -> bool {
        self.snapshot()
            .iter()
            .all(|s| s.state == SegmentState::Succeeded)
    }

    /// Indices and last errors of all `Failed` slots.
    pub fn failures(&self) -> Vec<(usize, String)> {
        self.snapshot()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.state == SegmentState::Failed)
            .map(|(i, s)| (i, s.last_error.clone().unwrap_or_default()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_start_pending() {
        let table = StatusTable::new(4);
        assert_eq!(table.len(), 4);
        for slot in table.snapshot() {
            assert_eq!(slot.state, SegmentState::Pending);
            assert_eq!(slot.retries, 0);
            assert!(slot.last_error.is_none());
        }
    }

    #[test]
    fn retrying_records_error_and_count() {
        let table = StatusTable::new(2);
        table.mark_retrying(1, 2, "HTTP 503".to_string());
        let snap = table.snapshot();
        assert_eq!(snap[1].state, SegmentState::Retrying);
        assert_eq!(snap[1].retries, 2);
        assert_eq!(snap[1].last_error.as_deref(), Some("HTTP 503"));
        assert_eq!(snap[0].state, SegmentState::Pending);
    }

    #[test]
    fn succeeded_is_sticky() {
        let table = StatusTable::new(1);
        table.mark_succeeded(0, 1);
        table.mark_retrying(0, 2, "late write".to_string());
        table.mark_failed(0, 3, "late write".to_string());
        let snap = table.snapshot();
        assert_eq!(snap[0].state, SegmentState::Succeeded);
        assert_eq!(snap[0].retries, 1);
    }

    #[test]
    fn failed_is_sticky() {
        let table = StatusTable::new(1);
        table.mark_failed(0, 3, "timeout".to_string());
        table.mark_succeeded(0, 0);
        assert_eq!(table.snapshot()[0].state, SegmentState::Failed);
    }

    #[test]
    fn failures_lists_failed_slots_only() {
        let table = StatusTable::new(3);
        table.mark_succeeded(0, 0);
        table.mark_failed(2, 3, "connection reset".to_string());
        let failures = table.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 2);
        assert_eq!(failures[0].1, "connection reset");
        assert!(!table.all_succeeded());
    }

    #[test]
    fn all_succeeded_requires_every_slot() {
        let table = StatusTable::new(2);
        table.mark_succeeded(0, 0);
        assert!(!table.all_succeeded());
        table.mark_succeeded(1, 2);
        assert!(table.all_succeeded());
    }

    #[test]
    fn out_of_range_writes_are_ignored() {
        let table = StatusTable::new(1);
        table.mark_succeeded(5, 0);
        assert_eq!(table.snapshot().len(), 1);
    }
}
