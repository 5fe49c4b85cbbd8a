//! # Aggregator Module
//!
//! Coalesces results that arrive one at a time into batched display
//! updates, at most one per rendering frame.
//!
//! ## Flow
//! 1. `push` appends to the pending buffer and schedules a flush if none is
//!    scheduled yet
//! 2. `on_frame` (next rendering opportunity) moves the whole buffer into
//!    the displayed list as one update
//! 3. `finish` cancels any scheduled flush and flushes immediately, so no
//!    result is held back past the end of a batch

mod clock;

pub use clock::{FrameClock, DEFAULT_FRAME_INTERVAL};

use crate::core::engine::{FileReport, ReportCategory};
use crate::events::{Event, EventSender, ResultsEvent};
use serde::Serialize;

/// Dashboard counts over the displayed rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportStats {
    pub passed: usize,
    pub failed: usize,
    pub special: usize,
}

impl ReportStats {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.special
    }

    pub fn record(&mut self, report: &FileReport) {
        match report.overall.category() {
            ReportCategory::Passed => self.passed += 1,
            ReportCategory::Failed => self.failed += 1,
            ReportCategory::Special => self.special += 1,
        }
    }
}

/// Buffers results and releases them in frame-paced batches
pub struct ResultAggregator {
    pending: Vec<FileReport>,
    flush_scheduled: bool,
    displayed: Vec<FileReport>,
    flushes: usize,
    events: EventSender,
}

impl ResultAggregator {
    pub fn new(events: EventSender) -> Self {
        Self {
            pending: Vec::new(),
            flush_scheduled: false,
            displayed: Vec::new(),
            flushes: 0,
            events,
        }
    }

    /// Accept one result
    pub fn push(&mut self, report: FileReport) {
        self.pending.push(report);
        self.flush_scheduled = true;
    }

    /// A rendering opportunity: run the scheduled flush, if any.
    ///
    /// Returns whether a flush happened.
    pub fn on_frame(&mut self) -> bool {
        if !self.flush_scheduled {
            return false;
        }
        self.flush();
        true
    }

    /// Processing is complete: flush now, synchronously
    pub fn finish(&mut self) {
        self.flush_scheduled = false;
        if !self.pending.is_empty() {
            self.flush();
        }
    }

    fn flush(&mut self) {
        self.flush_scheduled = false;
        if self.pending.is_empty() {
            return;
        }

        let rows = std::mem::take(&mut self.pending);
        tracing::trace!(rows = rows.len(), "Flushing results to display");
        self.displayed.extend(rows.iter().cloned());
        self.flushes += 1;
        self.events.send(Event::Results(ResultsEvent::Flushed { rows }));
    }

    /// Rows the display currently shows
    pub fn displayed(&self) -> &[FileReport] {
        &self.displayed
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn flush_scheduled(&self) -> bool {
        self.flush_scheduled
    }

    /// Number of batched updates delivered so far
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    pub fn stats(&self) -> ReportStats {
        let mut stats = ReportStats::default();
        for report in &self.displayed {
            stats.record(report);
        }
        stats
    }
}
