//! Worker threads hosting one engine instance each.

use super::protocol::{Envelope, WorkerCommand, WorkerReply};
use crate::core::engine::{run_checks, AnalysisEngine, EngineFactory};
use crate::error::EngineError;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Coordinator-side handle to a running worker thread
pub struct WorkerHandle {
    commands: Sender<WorkerCommand>,
    thread: JoinHandle<()>,
}

impl WorkerHandle {
    /// Spawn a worker thread for `slot`.
    ///
    /// The engine is not created until the worker receives `Init` (or its
    /// first task).
    pub fn spawn(
        slot: usize,
        generation: u64,
        factory: Arc<dyn EngineFactory>,
        replies: Sender<Envelope>,
    ) -> io::Result<Self> {
        let (commands, inbox) = unbounded();

        let thread = thread::Builder::new()
            .name(format!("analysis-worker-{}", slot))
            .spawn(move || worker_main(slot, generation, factory, inbox, replies))?;

        Ok(Self { commands, thread })
    }

    /// Hand a command to the worker.
    ///
    /// Fails, returning the command, when the worker thread has already exited.
    pub fn send(&self, command: WorkerCommand) -> Result<(), WorkerCommand> {
        self.commands.send(command).map_err(|e| e.into_inner())
    }

    /// Stop feeding the worker and let it go.
    ///
    /// Closing the command channel makes an idle worker exit at once. A
    /// worker stuck inside the engine is detached rather than joined; its
    /// eventual replies carry a stale generation and are ignored.
    pub fn terminate(self) {
        let Self { commands, thread } = self;
        drop(commands);
        drop(thread);
    }
}

fn worker_main(
    slot: usize,
    generation: u64,
    factory: Arc<dyn EngineFactory>,
    inbox: Receiver<WorkerCommand>,
    replies: Sender<Envelope>,
) {
    let reply = |reply: WorkerReply| {
        let _ = replies.send(Envelope {
            slot,
            generation,
            reply,
        });
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        serve(factory.as_ref(), &inbox, &reply);
    }));

    if let Err(payload) = outcome {
        let reason = panic_message(payload.as_ref());
        tracing::error!(slot, generation, %reason, "Analysis worker panicked");
        reply(WorkerReply::Crashed { reason });
    }
}

/// Command loop. Returns when the coordinator drops the command channel.
fn serve(factory: &dyn EngineFactory, inbox: &Receiver<WorkerCommand>, reply: &dyn Fn(WorkerReply)) {
    let mut loaded: Option<Box<dyn AnalysisEngine>> = None;

    for command in inbox.iter() {
        match command {
            WorkerCommand::Init => match load(factory, &mut loaded) {
                Ok(_) => reply(WorkerReply::Ready),
                Err(e) => reply(WorkerReply::InitFailed {
                    error: e.to_string(),
                }),
            },
            WorkerCommand::Analyze {
                task_id,
                filename,
                bytes,
            } => {
                let engine = match load(factory, &mut loaded) {
                    Ok(engine) => engine,
                    Err(e) => {
                        reply(WorkerReply::Error {
                            task_id,
                            error: e.to_string(),
                        });
                        continue;
                    }
                };

                let report = run_checks(engine, &filename, &bytes);
                drop(bytes);
                reply(WorkerReply::Result { task_id, report });
            }
        }
    }
}

/// Create and initialize the engine on first use
fn load<'a>(
    factory: &dyn EngineFactory,
    slot: &'a mut Option<Box<dyn AnalysisEngine>>,
) -> Result<&'a dyn AnalysisEngine, EngineError> {
    if slot.is_none() {
        let mut engine = factory.create();
        engine.initialize()?;
        *slot = Some(engine);
    }
    match slot {
        Some(engine) => Ok(&**engine),
        None => Err(EngineError::Load("engine unavailable".to_string())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}
