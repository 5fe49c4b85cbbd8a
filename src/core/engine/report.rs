//! Per-file display record.

use super::types::{CheckKey, ControllerType, Violation};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of controller ports on a console
pub const PORT_COUNT: usize = 4;

/// Overall verdict for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverallStatus {
    Passed,
    Failed,
    CouldNotParse,
    TooOld,
    SpecialCondition,
    /// The worker crashed or the pool went away before a report was produced
    WorkerError,
    /// The file bytes could not be read
    Unreadable,
}

/// Coarse bucket used by the results dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportCategory {
    Passed,
    Failed,
    Special,
}

impl OverallStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OverallStatus::Passed => "✅ Passed",
            OverallStatus::Failed => "❌ Failed",
            OverallStatus::CouldNotParse => "💀 Could Not Parse",
            OverallStatus::TooOld => "💀 SLP Too Old (Slippi >=3.15.0)",
            OverallStatus::SpecialCondition => "🔥 Handwarmer",
            OverallStatus::WorkerError => "💀 Could Not Analyze",
            OverallStatus::Unreadable => "💀 Could Not Read",
        }
    }

    pub fn category(&self) -> ReportCategory {
        match self {
            OverallStatus::Passed => ReportCategory::Passed,
            OverallStatus::Failed => ReportCategory::Failed,
            _ => ReportCategory::Special,
        }
    }

    /// Whether the status means the file was never judged
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            OverallStatus::CouldNotParse | OverallStatus::WorkerError | OverallStatus::Unreadable
        )
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Verdict for one port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortStatus {
    Passed,
    Failed,
    NotAnalyzed,
    /// No human player on this port
    Empty,
}

impl PortStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PortStatus::Passed => "✅",
            PortStatus::Failed => "❌",
            PortStatus::NotAnalyzed => "⦻",
            PortStatus::Empty => "",
        }
    }
}

/// Verdict of one check on one port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckStatus {
    Passed,
    Failed,
    Informational,
    NotAnalyzed,
    Empty,
}

impl CheckStatus {
    pub fn label(&self) -> &'static str {
        match self {
            CheckStatus::Passed => "✅ Passed",
            CheckStatus::Failed => "❌",
            CheckStatus::Informational => "✅",
            CheckStatus::NotAnalyzed => "⦻",
            CheckStatus::Empty => "",
        }
    }
}

/// Controller classification as displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerKind {
    Digital,
    Analog,
    Unknown,
}

impl ControllerKind {
    pub fn label(&self) -> &'static str {
        match self {
            ControllerKind::Digital => "digital",
            ControllerKind::Analog => "analog",
            ControllerKind::Unknown => "?",
        }
    }
}

impl From<ControllerType> for ControllerKind {
    fn from(value: ControllerType) -> Self {
        match value {
            ControllerType::Digital => ControllerKind::Digital,
            ControllerType::Analog => ControllerKind::Analog,
        }
    }
}

/// Who was playing on a port
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortIdentity {
    pub character_id: Option<u16>,
    pub costume: Option<u8>,
}

/// A violation flattened for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationRow {
    pub check_name: String,
    pub metric: f64,
    pub reason: String,
    pub evidence: Vec<f64>,
}

impl ViolationRow {
    pub fn from_violation(check: CheckKey, violation: &Violation) -> Self {
        Self {
            check_name: check.display_name().to_string(),
            metric: violation.metric,
            reason: violation.reason.clone(),
            evidence: violation.evidence.clone(),
        }
    }
}

/// One check across all ports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckRow {
    pub check: CheckKey,
    pub name: String,
    pub statuses: [CheckStatus; PORT_COUNT],
    pub violations: [Vec<ViolationRow>; PORT_COUNT],
}

impl CheckRow {
    pub fn new(check: CheckKey) -> Self {
        Self {
            check,
            name: check.display_name().to_string(),
            statuses: [CheckStatus::Passed; PORT_COUNT],
            violations: Default::default(),
        }
    }
}

/// Result record for one analyzed file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReport {
    pub filename: String,
    /// Stage id, -1 when unknown
    pub stage: i32,
    pub overall: OverallStatus,
    pub ports: [PortStatus; PORT_COUNT],
    pub controllers: [ControllerKind; PORT_COUNT],
    pub identities: [PortIdentity; PORT_COUNT],
    pub details: Vec<CheckRow>,
    pub error_reason: Option<String>,
}

impl FileReport {
    /// A row for a file that was never judged: every port not analyzed,
    /// controllers unknown, no details.
    pub fn unanalyzed(filename: impl Into<String>, overall: OverallStatus) -> Self {
        Self {
            filename: filename.into(),
            stage: -1,
            overall,
            ports: [PortStatus::NotAnalyzed; PORT_COUNT],
            controllers: [ControllerKind::Unknown; PORT_COUNT],
            identities: [PortIdentity::default(); PORT_COUNT],
            details: Vec::new(),
            error_reason: None,
        }
    }

    /// An unanalyzed row that carries a readable reason
    pub fn failure(
        filename: impl Into<String>,
        overall: OverallStatus,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            error_reason: Some(reason.into()),
            ..Self::unanalyzed(filename, overall)
        }
    }

    pub fn port_labels(&self) -> [&'static str; PORT_COUNT] {
        self.ports.map(|p| p.label())
    }
}
