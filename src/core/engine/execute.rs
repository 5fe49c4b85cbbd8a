//! Task execution inside a worker.
//!
//! Every engine error is converted into a structured row here, so nothing
//! but a genuine crash can leave a worker without a report to send back.

use super::report::{
    CheckRow, CheckStatus, ControllerKind, FileReport, OverallStatus, PortIdentity, PortStatus,
    ViolationRow, PORT_COUNT,
};
use super::traits::AnalysisEngine;
use super::types::{CheckKey, CheckResults, GameSettings};
use crate::error::EngineError;

/// Analyze one replay and build its display record
pub fn run_checks(engine: &dyn AnalysisEngine, filename: &str, bytes: &[u8]) -> FileReport {
    let settings = match engine.parse_settings(bytes) {
        Ok(settings) => settings,
        Err(e) => {
            return FileReport::failure(
                filename,
                OverallStatus::CouldNotParse,
                format!("Failed to parse replay: {}", reason(&e)),
            )
        }
    };

    let stage = settings.stage_id.unwrap_or(-1);
    let human_ports = settings.human_ports();
    let identities = port_identities(&settings, &human_ports);

    // Shortcut classifiers: a failure here is a parse problem, a positive
    // answer is a verdict of its own.
    let shortcut = |status: OverallStatus| FileReport {
        stage,
        identities,
        ..FileReport::unanalyzed(filename, status)
    };

    match engine.version_too_old(bytes) {
        Ok(true) => return shortcut(OverallStatus::TooOld),
        Ok(false) => {}
        Err(e) => {
            return FileReport {
                error_reason: Some(format!("Version check failed: {}", reason(&e))),
                ..shortcut(OverallStatus::CouldNotParse)
            }
        }
    }

    match engine.special_condition(bytes) {
        Ok(true) => return shortcut(OverallStatus::SpecialCondition),
        Ok(false) => {}
        Err(e) => {
            return FileReport {
                error_reason: Some(format!("Handwarmer check failed: {}", reason(&e))),
                ..shortcut(OverallStatus::CouldNotParse)
            }
        }
    }

    let mut ports = [PortStatus::Passed; PORT_COUNT];
    let mut controllers = [ControllerKind::Unknown; PORT_COUNT];
    let mut details: Vec<CheckRow> = CheckKey::ALL.iter().map(|k| CheckRow::new(*k)).collect();
    let mut notes: Vec<String> = Vec::new();
    let mut failed = false;

    for port in 0..PORT_COUNT {
        let port_id = port as u8;

        if !human_ports.contains(&port_id) {
            ports[port] = PortStatus::Empty;
            for row in &mut details {
                row.statuses[port] = CheckStatus::Empty;
            }
            continue;
        }

        match engine.controller_type(bytes, port_id) {
            Ok(kind) => controllers[port] = kind.into(),
            Err(e) => notes.push(format!(
                "P{} controller detection failed: {}",
                port + 1,
                reason(&e)
            )),
        }

        match engine.run_all_checks(bytes, port_id) {
            Ok(results) => {
                if apply_checks(&mut details, port, &results) {
                    ports[port] = PortStatus::Failed;
                    failed = true;
                }
            }
            Err(e) => {
                ports[port] = PortStatus::NotAnalyzed;
                for row in &mut details {
                    row.statuses[port] = CheckStatus::NotAnalyzed;
                }
                notes.push(format!("P{} analysis failed: {}", port + 1, reason(&e)));
            }
        }
    }

    FileReport {
        filename: filename.to_string(),
        stage,
        overall: if failed {
            OverallStatus::Failed
        } else {
            OverallStatus::Passed
        },
        ports,
        controllers,
        identities,
        details,
        error_reason: if notes.is_empty() {
            None
        } else {
            Some(notes.join("; "))
        },
    }
}

/// Fold one port's check results into the detail rows.
///
/// Returns whether any judged check flagged the player.
fn apply_checks(details: &mut [CheckRow], port: usize, results: &CheckResults) -> bool {
    let mut flagged_any = false;

    for row in details.iter_mut() {
        let check = row.check;
        let Some(outcome) = results.get(&check) else {
            continue;
        };
        let violations = || {
            outcome
                .violations
                .iter()
                .map(|v| ViolationRow::from_violation(check, v))
                .collect::<Vec<_>>()
        };

        if check.is_informational() {
            row.statuses[port] = CheckStatus::Informational;
            row.violations[port] = violations();
        } else if outcome.flagged {
            row.statuses[port] = CheckStatus::Failed;
            row.violations[port] = violations();
            flagged_any = true;
        }
    }

    flagged_any
}

fn port_identities(settings: &GameSettings, human_ports: &[u8]) -> [PortIdentity; PORT_COUNT] {
    let mut identities = [PortIdentity::default(); PORT_COUNT];
    for &port in human_ports {
        if let (Some(player), Some(slot)) = (settings.player(port), identities.get_mut(port as usize))
        {
            *slot = PortIdentity {
                character_id: player.character_id,
                costume: player.costume,
            };
        }
    }
    identities
}

/// Engine message without the variant prefix
fn reason(error: &EngineError) -> String {
    match error {
        EngineError::Load(msg) | EngineError::Parse(msg) => msg.clone(),
        EngineError::Classify { reason, .. } | EngineError::Port { reason, .. } => reason.clone(),
    }
}
