//! # Pool Module
//!
//! A fixed set of worker threads, each hosting one analysis engine.
//!
//! ## Scheduling
//! - A task goes to the first idle slot, otherwise into a FIFO queue
//! - Whenever a slot becomes idle the oldest queued task is dispatched to it
//! - At most `size()` tasks run at once
//!
//! ## Failure isolation
//! A worker that panics fails only its in-flight task. The slot is then
//! given a fresh worker; until that worker reports ready the slot takes no
//! work. If the replacement cannot load, the slot stays out of service
//! until the pool is destroyed.
//!
//! ## Threading
//! The pool object belongs to the coordinator thread. Workers report on a
//! shared channel which the coordinator drains with [`WorkerPool::poll`] or
//! [`WorkerPool::wait`]; completion callbacks run during those calls, on
//! the coordinator thread.

mod config;
mod protocol;
mod slot;
mod task;
mod worker;

pub use config::{pool_size_for, PoolConfig, MAX_AUTO_POOL_SIZE};
pub use slot::SlotState;
pub use task::{AnalysisTask, ResultCallback, TaskId, TaskResult};

use crate::core::engine::{EngineFactory, FileReport};
use crate::error::{PoolError, TaskError};
use crate::events::{Event, EventSender, PoolEvent};
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use protocol::{Envelope, WorkerCommand, WorkerReply};
use serde::Serialize;
use slot::WorkerSlot;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use worker::WorkerHandle;

/// A task waiting for a free slot
struct QueueEntry {
    task: AnalysisTask,
    on_result: ResultCallback,
}

/// Snapshot of slot states and queue depth
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub size: usize,
    pub starting: usize,
    pub idle: usize,
    pub busy: usize,
    pub replacing: usize,
    pub queued: usize,
}

/// Fixed-size pool of crash-isolated analysis workers
pub struct WorkerPool {
    size: usize,
    slots: Vec<WorkerSlot>,
    queue: VecDeque<QueueEntry>,
    factory: Arc<dyn EngineFactory>,
    replies_tx: Sender<Envelope>,
    replies_rx: Receiver<Envelope>,
    events: EventSender,
    destroyed: bool,
}

impl WorkerPool {
    /// Create a pool. No worker runs until [`initialize`](Self::initialize).
    pub fn new(config: &PoolConfig, factory: Arc<dyn EngineFactory>, events: EventSender) -> Self {
        let (replies_tx, replies_rx) = unbounded();
        Self {
            size: config.resolved_size(),
            slots: Vec::new(),
            queue: VecDeque::new(),
            factory,
            replies_tx,
            replies_rx,
            events,
            destroyed: false,
        }
    }

    /// Number of worker slots
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Spawn every worker, load an engine in each and wait until all are
    /// ready.
    ///
    /// Any load failure destroys the whole pool and is returned. Calling
    /// it again on a started pool does nothing.
    pub fn initialize(&mut self) -> Result<(), PoolError> {
        if self.destroyed {
            return Err(PoolError::Destroyed);
        }
        if !self.slots.is_empty() {
            debug!(workers = self.slots.len(), "Worker pool already started");
            return Ok(());
        }

        for index in 0..self.size {
            let spawned =
                WorkerHandle::spawn(index, 0, Arc::clone(&self.factory), self.replies_tx.clone());
            let worker = match spawned {
                Ok(worker) => worker,
                Err(source) => {
                    self.destroy();
                    return Err(PoolError::Spawn {
                        slot: index,
                        source,
                    });
                }
            };
            if worker.send(WorkerCommand::Init).is_err() {
                self.destroy();
                return Err(PoolError::InitFailed {
                    slot: index,
                    reason: "worker exited before loading".to_string(),
                });
            }
            debug!(slot = index, "Spawned analysis worker");
            self.slots.push(WorkerSlot::new(worker));
        }

        let mut starting = self.size;
        while starting > 0 {
            let Ok(envelope) = self.replies_rx.recv() else {
                self.destroy();
                return Err(PoolError::Destroyed);
            };
            let index = envelope.slot;
            let current = self
                .slots
                .get(index)
                .is_some_and(|slot| slot.generation == envelope.generation);
            if !current {
                continue;
            }

            match envelope.reply {
                WorkerReply::Ready => {
                    if matches!(self.slots[index].state, SlotState::Starting) {
                        self.slots[index].state = SlotState::Idle;
                        starting -= 1;
                    }
                }
                WorkerReply::InitFailed { error: reason } | WorkerReply::Crashed { reason } => {
                    warn!(slot = index, %reason, "Worker failed to load the analysis engine");
                    self.destroy();
                    return Err(PoolError::InitFailed {
                        slot: index,
                        reason,
                    });
                }
                other => trace!(slot = index, ?other, "Ignoring reply during start-up"),
            }
        }

        info!(workers = self.size, "Worker pool ready");
        self.events.send(Event::Pool(PoolEvent::Ready { workers: self.size }));

        // Tasks submitted before start-up waited in the queue
        for index in 0..self.slots.len() {
            self.dequeue(index);
        }
        Ok(())
    }

    /// Run `task` as soon as a slot is free.
    ///
    /// `on_result` is invoked exactly once. On a destroyed pool that
    /// happens immediately, with a pool-destroyed error.
    pub fn submit_task(&mut self, task: AnalysisTask, on_result: ResultCallback) {
        if self.destroyed {
            on_result(TaskResult::err(task.id, TaskError::PoolDestroyed));
            return;
        }

        match self.slots.iter().position(|slot| slot.state.is_idle()) {
            Some(index) => self.dispatch(index, task, on_result),
            None => {
                debug!(task_id = task.id, queued = self.queue.len() + 1, "All workers busy; queueing task");
                self.queue.push_back(QueueEntry { task, on_result });
            }
        }
    }

    /// Submit a task and get its result through a one-shot channel
    pub fn submit(&mut self, task: AnalysisTask) -> Receiver<TaskResult> {
        let (tx, rx) = bounded(1);
        self.submit_task(
            task,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        );
        rx
    }

    fn dispatch(&mut self, index: usize, task: AnalysisTask, on_result: ResultCallback) {
        let slot = &mut self.slots[index];
        if !slot.state.is_idle() {
            // Keep the task at the head of the line for the next idle slot
            self.queue.push_front(QueueEntry { task, on_result });
            return;
        }

        let AnalysisTask {
            id,
            filename,
            bytes,
        } = task;
        debug!(slot = index, task_id = id, %filename, "Dispatching task");
        slot.state = SlotState::Busy {
            task_id: id,
            on_result,
        };

        let command = WorkerCommand::Analyze {
            task_id: id,
            filename,
            bytes,
        };
        let delivered = match &slot.worker {
            Some(worker) => worker.send(command).is_ok(),
            None => false,
        };
        if !delivered {
            self.handle_crash(index, "worker exited before accepting the task".to_string());
        }
    }

    /// Hand the oldest queued task to `index` if that slot is idle
    fn dequeue(&mut self, index: usize) {
        if self.destroyed || !self.slots.get(index).is_some_and(|s| s.state.is_idle()) {
            return;
        }
        if let Some(QueueEntry { task, on_result }) = self.queue.pop_front() {
            self.dispatch(index, task, on_result);
        }
    }

    /// Process every worker reply that has already arrived.
    ///
    /// Returns the number of replies handled.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(envelope) = self.replies_rx.try_recv() {
            self.handle_reply(envelope);
            handled += 1;
        }
        handled
    }

    /// Block up to `timeout` for a worker reply, then drain the rest.
    pub fn wait(&mut self, timeout: Duration) -> usize {
        match self.replies_rx.recv_timeout(timeout) {
            Ok(envelope) => {
                self.handle_reply(envelope);
                1 + self.poll()
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }

    fn handle_reply(&mut self, envelope: Envelope) {
        let Envelope {
            slot: index,
            generation,
            reply,
        } = envelope;

        let current = self
            .slots
            .get(index)
            .is_some_and(|slot| slot.generation == generation);
        if !current {
            trace!(slot = index, generation, "Dropping reply from a retired worker");
            return;
        }

        match reply {
            WorkerReply::Ready => self.on_ready(index),
            WorkerReply::InitFailed { error } => self.on_replacement_failed(index, error),
            WorkerReply::Result { task_id, report } => self.complete(index, task_id, Ok(report)),
            WorkerReply::Error { task_id, error } => {
                self.complete(index, task_id, Err(TaskError::Worker(error)))
            }
            WorkerReply::Crashed { reason } => self.handle_crash(index, reason),
        }
    }

    fn complete(&mut self, index: usize, task_id: TaskId, outcome: Result<FileReport, TaskError>) {
        let slot = &mut self.slots[index];
        match std::mem::replace(&mut slot.state, SlotState::Idle) {
            SlotState::Busy {
                task_id: running,
                on_result,
            } if running == task_id => {
                debug!(slot = index, task_id, "Task finished");
                on_result(TaskResult { task_id, outcome });
                self.dequeue(index);
            }
            other => {
                warn!(slot = index, task_id, state = ?other, "Reply for a task this slot is not running");
                slot.state = other;
            }
        }
    }

    fn on_ready(&mut self, index: usize) {
        let slot = &mut self.slots[index];
        match slot.state {
            SlotState::Replacing => {
                info!(slot = index, "Replacement worker ready");
                slot.state = SlotState::Idle;
                self.events.send(Event::Pool(PoolEvent::WorkerReplaced { slot: index }));
                self.dequeue(index);
            }
            SlotState::Starting => {
                slot.state = SlotState::Idle;
                self.dequeue(index);
            }
            _ => trace!(slot = index, "Ignoring duplicate ready signal"),
        }
    }

    /// A replacement could not load its engine: the slot stays `Replacing`
    fn on_replacement_failed(&mut self, index: usize, reason: String) {
        warn!(slot = index, %reason, "Replacement worker failed to load; slot out of service");
        self.slots[index].terminate_worker();
        self.events.send(Event::Pool(PoolEvent::ReplacementFailed { slot: index, reason }));
    }

    fn handle_crash(&mut self, index: usize, reason: String) {
        let slot = &mut self.slots[index];
        let task_id = match std::mem::replace(&mut slot.state, SlotState::Replacing) {
            SlotState::Busy { task_id, on_result } => {
                on_result(TaskResult::err(
                    task_id,
                    TaskError::WorkerCrashed {
                        slot: index,
                        reason: reason.clone(),
                    },
                ));
                Some(task_id)
            }
            SlotState::Replacing => {
                // The replacement itself died while loading
                self.on_replacement_failed(index, reason);
                return;
            }
            SlotState::Starting | SlotState::Idle => None,
        };

        warn!(slot = index, ?task_id, %reason, "Analysis worker crashed; replacing it");
        self.events.send(Event::Pool(PoolEvent::WorkerCrashed { slot: index, task_id }));
        self.replace_worker(index);
    }

    /// Terminate the slot's worker and start a new one. The slot becomes
    /// idle once the new worker reports ready.
    fn replace_worker(&mut self, index: usize) {
        if self.destroyed {
            return;
        }

        let slot = &mut self.slots[index];
        slot.terminate_worker();
        slot.generation += 1;
        slot.state = SlotState::Replacing;

        let spawned = WorkerHandle::spawn(
            index,
            slot.generation,
            Arc::clone(&self.factory),
            self.replies_tx.clone(),
        );
        match spawned {
            Ok(worker) => {
                if worker.send(WorkerCommand::Init).is_err() {
                    worker.terminate();
                    self.on_replacement_failed(index, "worker exited before loading".to_string());
                    return;
                }
                slot.worker = Some(worker);
            }
            Err(e) => self.on_replacement_failed(index, e.to_string()),
        }
    }

    /// Current slot states and queue depth
    pub fn status(&self) -> PoolStatus {
        let mut status = PoolStatus {
            size: self.size,
            queued: self.queue.len(),
            ..Default::default()
        };
        for slot in &self.slots {
            match slot.state {
                SlotState::Starting => status.starting += 1,
                SlotState::Idle => status.idle += 1,
                SlotState::Busy { .. } => status.busy += 1,
                SlotState::Replacing => status.replacing += 1,
            }
        }
        status
    }

    /// Tear the pool down.
    ///
    /// Terminates every worker, then fails every task still running or
    /// queued with a pool-destroyed error (each callback exactly once).
    /// Later submissions fail immediately. Returns the number of tasks
    /// failed; calling it again does nothing.
    pub fn destroy(&mut self) -> usize {
        if self.destroyed {
            return 0;
        }
        self.destroyed = true;

        for slot in &mut self.slots {
            slot.terminate_worker();
        }

        let mut failed = 0;
        for slot in self.slots.drain(..) {
            if let SlotState::Busy { task_id, on_result } = slot.state {
                on_result(TaskResult::err(task_id, TaskError::PoolDestroyed));
                failed += 1;
            }
        }
        for QueueEntry { task, on_result } in self.queue.drain(..) {
            on_result(TaskResult::err(task.id, TaskError::PoolDestroyed));
            failed += 1;
        }

        info!(failed_tasks = failed, "Worker pool destroyed");
        self.events.send(Event::Pool(PoolEvent::Destroyed { failed_tasks: failed }));
        failed
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::{
        AnalysisEngine, CheckResults, ControllerType, GameSettings, OverallStatus,
    };
    use crate::error::EngineError;
    use crate::events::{null_sender, EventChannel};
    use std::cell::RefCell;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Parses nothing: every file yields a "could not parse" row, which is
    /// enough to see tasks complete. Bytes `b"panic"` crash the worker.
    struct RejectingEngine;

    impl AnalysisEngine for RejectingEngine {
        fn initialize(&mut self) -> Result<(), EngineError> {
            Ok(())
        }

        fn parse_settings(&self, bytes: &[u8]) -> Result<GameSettings, EngineError> {
            if bytes == b"panic" {
                panic!("engine fault");
            }
            Err(EngineError::Parse("no settings block".to_string()))
        }

        fn version_too_old(&self, _bytes: &[u8]) -> Result<bool, EngineError> {
            Ok(false)
        }

        fn special_condition(&self, _bytes: &[u8]) -> Result<bool, EngineError> {
            Ok(false)
        }

        fn controller_type(&self, _bytes: &[u8], _port: u8) -> Result<ControllerType, EngineError> {
            Ok(ControllerType::Digital)
        }

        fn run_all_checks(&self, _bytes: &[u8], _port: u8) -> Result<CheckResults, EngineError> {
            Ok(CheckResults::new())
        }
    }

    struct Unloadable;

    impl AnalysisEngine for Unloadable {
        fn initialize(&mut self) -> Result<(), EngineError> {
            Err(EngineError::Load("bad module".to_string()))
        }
        fn parse_settings(&self, _: &[u8]) -> Result<GameSettings, EngineError> {
            unreachable!()
        }
        fn version_too_old(&self, _: &[u8]) -> Result<bool, EngineError> {
            unreachable!()
        }
        fn special_condition(&self, _: &[u8]) -> Result<bool, EngineError> {
            unreachable!()
        }
        fn controller_type(&self, _: &[u8], _: u8) -> Result<ControllerType, EngineError> {
            unreachable!()
        }
        fn run_all_checks(&self, _: &[u8], _: u8) -> Result<CheckResults, EngineError> {
            unreachable!()
        }
    }

    fn factory() -> Arc<dyn EngineFactory> {
        Arc::new(|| Box::new(RejectingEngine) as Box<dyn AnalysisEngine>)
    }

    fn ready_pool(size: usize) -> WorkerPool {
        let mut pool = WorkerPool::new(&PoolConfig::new().pool_size(size), factory(), null_sender());
        pool.initialize().unwrap();
        pool
    }

    fn drive(pool: &mut WorkerPool, until: impl Fn() -> bool) {
        for _ in 0..500 {
            if until() {
                return;
            }
            pool.wait(Duration::from_millis(10));
        }
        panic!("condition not reached");
    }

    #[test]
    fn initialize_brings_all_slots_idle() {
        let pool = ready_pool(3);

        let status = pool.status();
        assert_eq!(status.size, 3);
        assert_eq!(status.idle, 3);
        assert_eq!(status.busy, 0);
    }

    #[test]
    fn initialize_fails_when_engine_cannot_load() {
        let factory: Arc<dyn EngineFactory> =
            Arc::new(|| Box::new(Unloadable) as Box<dyn AnalysisEngine>);
        let mut pool = WorkerPool::new(&PoolConfig::new().pool_size(2), factory, null_sender());

        let error = pool.initialize().unwrap_err();

        assert!(matches!(error, PoolError::InitFailed { .. }));
        assert!(error.to_string().contains("bad module"));
        assert!(pool.is_destroyed());
    }

    #[test]
    fn second_initialize_keeps_the_same_slots() {
        let mut pool = ready_pool(2);

        pool.initialize().unwrap();

        let status = pool.status();
        assert_eq!(status.size, 2);
        assert_eq!(status.idle, 2);
        assert_eq!(status.starting, 0);

        let results = pool.submit(AnalysisTask::new(1, "a.slp", b"bytes".to_vec()));
        drive(&mut pool, || !results.is_empty());
        assert!(results.recv().unwrap().outcome.is_ok());
    }

    #[test]
    fn submitted_task_completes_exactly_once() {
        let mut pool = ready_pool(1);

        let results = pool.submit(AnalysisTask::new(1, "a.slp", b"bytes".to_vec()));
        drive(&mut pool, || !results.is_empty());

        let result = results.recv().unwrap();
        assert_eq!(result.task_id, 1);
        assert_eq!(result.outcome.unwrap().overall, OverallStatus::CouldNotParse);
        assert!(results.try_recv().is_err());
        assert_eq!(pool.status().idle, 1);
    }

    #[test]
    fn overflow_is_queued_then_drained_in_order() {
        let mut pool = ready_pool(1);
        let order = Arc::new(Mutex::new(Vec::new()));

        for id in 0..4 {
            let order = Arc::clone(&order);
            pool.submit_task(
                AnalysisTask::new(id, format!("{}.slp", id), vec![id as u8]),
                Box::new(move |result| order.lock().unwrap().push(result.task_id)),
            );
        }

        let status = pool.status();
        assert_eq!(status.busy, 1);
        assert_eq!(status.queued, 3);

        drive(&mut pool, || order.lock().unwrap().len() == 4);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn crash_fails_only_the_running_task_and_slot_recovers() {
        let (sender, receiver) = EventChannel::new();
        let mut pool = WorkerPool::new(&PoolConfig::new().pool_size(1), factory(), sender);
        pool.initialize().unwrap();

        let crashed = pool.submit(AnalysisTask::new(1, "boom.slp", b"panic".to_vec()));
        let next = pool.submit(AnalysisTask::new(2, "ok.slp", b"fine".to_vec()));

        drive(&mut pool, || !crashed.is_empty() && !next.is_empty());

        match crashed.recv().unwrap().outcome {
            Err(TaskError::WorkerCrashed { slot, reason }) => {
                assert_eq!(slot, 0);
                assert_eq!(reason, "engine fault");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(next.recv().unwrap().outcome.is_ok());
        assert!(crashed.try_recv().is_err());

        let events = receiver.drain();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::Pool(PoolEvent::WorkerCrashed { slot: 0, task_id: Some(1) }))));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::Pool(PoolEvent::WorkerReplaced { slot: 0 }))));
    }

    #[test]
    fn failed_replacement_keeps_slot_out_of_service() {
        // The two initial engines load; every later one refuses
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let factory: Arc<dyn EngineFactory> = Arc::new(move || {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Box::new(RejectingEngine) as Box<dyn AnalysisEngine>
            } else {
                Box::new(Unloadable) as Box<dyn AnalysisEngine>
            }
        });
        let (sender, receiver) = EventChannel::new();
        let mut pool = WorkerPool::new(&PoolConfig::new().pool_size(2), factory, sender);
        pool.initialize().unwrap();

        let crashed = pool.submit(AnalysisTask::new(1, "boom.slp", b"panic".to_vec()));
        let events = RefCell::new(Vec::new());
        drive(&mut pool, || {
            events.borrow_mut().extend(receiver.drain());
            events.borrow().iter().any(|e| {
                matches!(e, Event::Pool(PoolEvent::ReplacementFailed { slot: 0, .. }))
            })
        });

        assert!(matches!(
            crashed.recv().unwrap().outcome,
            Err(TaskError::WorkerCrashed { slot: 0, .. })
        ));
        assert_eq!(loads.load(Ordering::SeqCst), 3);
        let status = pool.status();
        assert_eq!(status.replacing, 1);
        assert_eq!(status.idle, 1);

        // The healthy slot serves everything, in order
        let results: Vec<_> = (2..7)
            .map(|id| pool.submit(AnalysisTask::new(id, format!("{}.slp", id), vec![id as u8])))
            .collect();
        assert_eq!(pool.status().busy, 1);
        assert_eq!(pool.status().queued, 4);
        drive(&mut pool, || results.iter().all(|r| !r.is_empty()));
        for (id, rx) in (2..7).zip(&results) {
            let result = rx.recv().unwrap();
            assert_eq!(result.task_id, id);
            assert!(result.outcome.is_ok());
        }
        assert_eq!(pool.status().replacing, 1);

        // Teardown fails the outstanding work, never the crashed task again
        let running = pool.submit(AnalysisTask::new(7, "7.slp", vec![7]));
        let queued = pool.submit(AnalysisTask::new(8, "8.slp", vec![8]));
        assert_eq!(pool.destroy(), 2);
        assert_eq!(running.recv().unwrap().outcome, Err(TaskError::PoolDestroyed));
        assert_eq!(queued.recv().unwrap().outcome, Err(TaskError::PoolDestroyed));
        assert!(crashed.try_recv().is_err());
    }

    #[test]
    fn destroy_fails_queued_and_running_tasks_once() {
        let mut pool = ready_pool(1);
        let calls = Arc::new(AtomicUsize::new(0));
        let destroyed = Arc::new(AtomicUsize::new(0));

        for id in 0..5 {
            let calls = Arc::clone(&calls);
            let destroyed = Arc::clone(&destroyed);
            pool.submit_task(
                AnalysisTask::new(id, "x.slp", vec![id as u8]),
                Box::new(move |result| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if result.outcome == Err(TaskError::PoolDestroyed) {
                        destroyed.fetch_add(1, Ordering::SeqCst);
                    }
                }),
            );
        }

        let failed = pool.destroy();
        assert_eq!(pool.destroy(), 0);
        pool.poll();

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(destroyed.load(Ordering::SeqCst), failed);
        assert!(failed >= 4);
    }

    #[test]
    fn submit_after_destroy_fails_synchronously() {
        let mut pool = ready_pool(1);
        pool.destroy();

        let results = pool.submit(AnalysisTask::new(7, "late.slp", Vec::new()));

        let result = results.try_recv().unwrap();
        assert_eq!(result.task_id, 7);
        assert_eq!(result.outcome, Err(TaskError::PoolDestroyed));
    }
}
