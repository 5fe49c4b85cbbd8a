//! Batch ingestion driver.

use super::{BatchFile, IngestConfig};
use crate::core::aggregator::{FrameClock, ReportStats, ResultAggregator};
use crate::core::engine::{FileReport, OverallStatus};
use crate::core::hasher::{fingerprint, Fingerprint};
use crate::core::pool::{AnalysisTask, TaskId, TaskResult, WorkerPool};
use crate::core::registry::DuplicateRegistry;
use crate::error::IngestError;
use crate::events::{BatchEvent, BatchProgress, BatchSummary, Event, EventSender};
use chrono::Utc;
use crossbeam_channel::{unbounded, Receiver};
use rayon::prelude::*;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Shortest blocking wait while draining, so a zero frame interval
/// does not turn the drain loop into a spin
const MIN_WAIT: Duration = Duration::from_millis(1);

/// A file after the parallel read + fingerprint step
enum Prepared {
    Loaded {
        name: String,
        bytes: Vec<u8>,
        fingerprint: Fingerprint,
    },
    Unreadable {
        name: String,
        error: IngestError,
    },
}

fn prepare(file: BatchFile) -> Prepared {
    let name = file.name.clone();
    match file.read() {
        Ok((name, bytes)) => {
            let fingerprint = fingerprint(&bytes);
            Prepared::Loaded {
                name,
                bytes,
                fingerprint,
            }
        }
        Err(error) => Prepared::Unreadable { name, error },
    }
}

/// Bookkeeping for the batch in progress
struct BatchRun {
    total: usize,
    completed: usize,
    analyzed: usize,
    duplicates: usize,
    unreadable: usize,
    stats: ReportStats,
    in_flight: HashMap<TaskId, String>,
}

impl BatchRun {
    fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            analyzed: 0,
            duplicates: 0,
            unreadable: 0,
            stats: ReportStats::default(),
            in_flight: HashMap::new(),
        }
    }
}

/// Turns batches of files into submitted tasks and accounted-for rows.
///
/// Task ids keep increasing across batches so a late reply can never be
/// mistaken for a task of the current batch.
pub struct IngestionController {
    config: IngestConfig,
    next_task_id: TaskId,
    events: EventSender,
}

impl IngestionController {
    pub fn new(config: IngestConfig, events: EventSender) -> Self {
        Self {
            config,
            next_task_id: 0,
            events,
        }
    }

    /// Process one batch to completion.
    ///
    /// Every file ends up as exactly one of: a result row (analysis,
    /// task error, or unreadable) or a skipped duplicate. Returns once the
    /// last one is accounted for and the aggregator has been flushed.
    pub fn process_batch(
        &mut self,
        mut files: Vec<BatchFile>,
        registry: &mut DuplicateRegistry,
        pool: &mut WorkerPool,
        aggregator: &mut ResultAggregator,
    ) -> BatchSummary {
        let start = Instant::now();
        let batch_id = Uuid::new_v4();
        let total = files.len();
        info!(%batch_id, total, "Processing batch");
        self.events
            .send(Event::Batch(BatchEvent::Started { batch_id, total }));

        let mut run = BatchRun::new(total);
        let mut clock = FrameClock::new(self.config.frame_interval);
        let (done_tx, done_rx) = unbounded::<TaskResult>();
        let chunk_size = self.config.chunk_size.max(1);

        while !files.is_empty() {
            let rest = files.split_off(chunk_size.min(files.len()));
            let chunk = std::mem::replace(&mut files, rest);

            let prepared: Vec<Prepared> = chunk.into_par_iter().map(prepare).collect();

            for item in prepared {
                match item {
                    Prepared::Unreadable { name, error } => {
                        warn!(file = %name, %error, "Could not read file");
                        run.unreadable += 1;
                        let report =
                            FileReport::failure(name, OverallStatus::Unreadable, error.to_string());
                        self.accept(&mut run, aggregator, report);
                    }
                    Prepared::Loaded {
                        name,
                        bytes,
                        fingerprint,
                    } => {
                        if !registry.register_if_new(&fingerprint) {
                            debug!(file = %name, fingerprint = fingerprint.short(), "Skipping duplicate");
                            run.duplicates += 1;
                            self.events.send(Event::Batch(BatchEvent::Duplicate {
                                filename: name,
                                fingerprint: fingerprint.to_string(),
                            }));
                            self.advance(&mut run);
                            continue;
                        }

                        let task_id = self.next_task_id;
                        self.next_task_id += 1;
                        run.analyzed += 1;
                        run.in_flight.insert(task_id, name.clone());

                        let tx = done_tx.clone();
                        pool.submit_task(
                            AnalysisTask::new(task_id, name, bytes),
                            Box::new(move |result| {
                                let _ = tx.send(result);
                            }),
                        );
                    }
                }
            }

            // Yield: let workers report and the display catch up
            pool.poll();
            self.drain(&mut run, aggregator, &done_rx);
            if clock.tick() {
                aggregator.on_frame();
            }
        }

        while run.completed < run.total {
            pool.wait(clock.remaining().max(MIN_WAIT));
            self.drain(&mut run, aggregator, &done_rx);
            if clock.tick() {
                aggregator.on_frame();
            }
        }

        aggregator.finish();
        self.events
            .send(Event::Batch(BatchEvent::Progress(BatchProgress::finished(total))));

        let summary = BatchSummary {
            batch_id,
            total,
            analyzed: run.analyzed,
            duplicates: run.duplicates,
            unreadable: run.unreadable,
            passed: run.stats.passed,
            failed: run.stats.failed,
            special: run.stats.special,
            duration_ms: start.elapsed().as_millis() as u64,
            finished_at: Utc::now(),
        };
        info!(
            %batch_id,
            total,
            analyzed = summary.analyzed,
            duplicates = summary.duplicates,
            duration_ms = summary.duration_ms,
            "Batch complete"
        );
        self.events.send(Event::Batch(BatchEvent::Completed {
            summary: summary.clone(),
        }));
        summary
    }

    /// Turn every completion delivered so far into a result row
    fn drain(
        &self,
        run: &mut BatchRun,
        aggregator: &mut ResultAggregator,
        done_rx: &Receiver<TaskResult>,
    ) {
        while let Ok(TaskResult { task_id, outcome }) = done_rx.try_recv() {
            let Some(filename) = run.in_flight.remove(&task_id) else {
                warn!(task_id, "Completion for a task this batch did not submit");
                continue;
            };
            let report = match outcome {
                Ok(report) => report,
                Err(error) => {
                    warn!(file = %filename, %error, "Analysis task failed");
                    FileReport::failure(filename, OverallStatus::WorkerError, error.to_string())
                }
            };
            self.accept(run, aggregator, report);
        }
    }

    fn accept(&self, run: &mut BatchRun, aggregator: &mut ResultAggregator, report: FileReport) {
        run.stats.record(&report);
        aggregator.push(report);
        self.advance(run);
    }

    /// One more file accounted for. The terminal 1.0 is emitted once, after
    /// the final flush.
    fn advance(&self, run: &mut BatchRun) {
        run.completed += 1;
        if run.completed < run.total {
            self.events.send(Event::Batch(BatchEvent::Progress(BatchProgress::new(
                run.completed,
                run.total,
            ))));
        }
    }
}
