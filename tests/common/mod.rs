//! Shared fixtures for integration tests.
//!
//! `ScriptedEngine` decides what to do from the replay bytes, so a test
//! scripts a batch just by choosing file contents:
//!
//! | prefix    | behaviour                                             |
//! |-----------|-------------------------------------------------------|
//! | `pass`    | one human on port 1, nothing flagged                  |
//! | `flag`    | one human on port 1, box travel time flagged          |
//! | `bad`     | settings block cannot be parsed                       |
//! | `old`     | replay predates the supported version                 |
//! | `panic`   | the engine panics, taking its worker down             |
//! | `slow`    | like `pass`, after a short sleep                      |

#![allow(dead_code)]

use replay_enforcer::core::engine::{
    AnalysisEngine, CheckKey, CheckOutcome, CheckResults, ControllerType, EngineFactory,
    GameSettings, PlayerKind, PlayerSettings, Violation,
};
use replay_enforcer::core::ingest::BatchFile;
use replay_enforcer::error::EngineError;
use replay_enforcer::events::{BatchEvent, Event};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub const SLOW_TASK: Duration = Duration::from_millis(40);

/// What the engines observed, shared by every engine of a factory
#[derive(Default)]
pub struct Probe {
    active: AtomicUsize,
    peak: AtomicUsize,
    loads: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl Probe {
    /// Most tasks ever running at the same time
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Engines created so far
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// File contents in the order their analysis started
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    fn enter(&self, bytes: &[u8]) {
        self.seen
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(bytes).into_owned());
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct ScriptedEngine {
    probe: Arc<Probe>,
    loadable: bool,
}

fn human_on_port_one() -> GameSettings {
    GameSettings {
        stage_id: Some(32),
        players: vec![PlayerSettings {
            port: 0,
            kind: PlayerKind::Human,
            character_id: Some(20),
            costume: Some(1),
        }],
    }
}

impl AnalysisEngine for ScriptedEngine {
    fn initialize(&mut self) -> Result<(), EngineError> {
        if self.loadable {
            Ok(())
        } else {
            Err(EngineError::Load("analysis module missing".to_string()))
        }
    }

    fn parse_settings(&self, bytes: &[u8]) -> Result<GameSettings, EngineError> {
        self.probe.enter(bytes);
        let result = if bytes.starts_with(b"panic") {
            self.probe.leave();
            panic!("replay decoder exploded");
        } else if bytes.starts_with(b"bad") {
            Err(EngineError::Parse("unexpected end of input".to_string()))
        } else {
            if bytes.starts_with(b"slow") {
                thread::sleep(SLOW_TASK);
            }
            Ok(human_on_port_one())
        };
        self.probe.leave();
        result
    }

    fn version_too_old(&self, bytes: &[u8]) -> Result<bool, EngineError> {
        Ok(bytes.starts_with(b"old"))
    }

    fn special_condition(&self, _bytes: &[u8]) -> Result<bool, EngineError> {
        Ok(false)
    }

    fn controller_type(&self, _bytes: &[u8], _port: u8) -> Result<ControllerType, EngineError> {
        Ok(ControllerType::Digital)
    }

    fn run_all_checks(&self, bytes: &[u8], _port: u8) -> Result<CheckResults, EngineError> {
        let mut results = CheckResults::new();
        for key in CheckKey::ALL {
            results.insert(key, CheckOutcome::default());
        }
        if bytes.starts_with(b"flag") {
            results.insert(
                CheckKey::TravelTime,
                CheckOutcome {
                    flagged: true,
                    violations: vec![Violation {
                        metric: 0.31,
                        reason: "Travel time below human threshold".to_string(),
                        evidence: vec![0.0, 1.0, 0.0],
                    }],
                },
            );
        }
        Ok(results)
    }
}

/// Builds scripted engines; the first `failing_loads` refuse to load
pub struct ScriptedFactory {
    probe: Arc<Probe>,
    failing_loads: usize,
}

impl ScriptedFactory {
    pub fn healthy() -> (Self, Arc<Probe>) {
        Self::failing(0)
    }

    pub fn failing(failing_loads: usize) -> (Self, Arc<Probe>) {
        let probe = Arc::new(Probe::default());
        let factory = Self {
            probe: Arc::clone(&probe),
            failing_loads,
        };
        (factory, probe)
    }
}

impl EngineFactory for ScriptedFactory {
    fn create(&self) -> Box<dyn AnalysisEngine> {
        let attempt = self.probe.loads.fetch_add(1, Ordering::SeqCst);
        Box::new(ScriptedEngine {
            probe: Arc::clone(&self.probe),
            loadable: attempt >= self.failing_loads,
        })
    }
}

pub fn file(name: &str, contents: &str) -> BatchFile {
    BatchFile::from_bytes(name, contents.as_bytes().to_vec())
}

/// Every progress fraction emitted, in order
pub fn progress_fractions(events: &[Event]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Batch(BatchEvent::Progress(p)) => Some(p.fraction),
            _ => None,
        })
        .collect()
}
