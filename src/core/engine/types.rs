//! Data reported by the analysis engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of player occupying a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerKind {
    Human,
    Cpu,
    Demo,
}

/// One player entry from the settings block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSettings {
    /// Zero-based port index (0..4)
    pub port: u8,
    pub kind: PlayerKind,
    pub character_id: Option<u16>,
    pub costume: Option<u8>,
}

/// Game settings block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameSettings {
    pub stage_id: Option<i32>,
    pub players: Vec<PlayerSettings>,
}

impl GameSettings {
    /// Ports occupied by human players, in ascending order
    pub fn human_ports(&self) -> Vec<u8> {
        let mut ports: Vec<u8> = self
            .players
            .iter()
            .filter(|p| p.kind == PlayerKind::Human)
            .map(|p| p.port)
            .collect();
        ports.sort_unstable();
        ports.dedup();
        ports
    }

    /// Settings entry for a port
    pub fn player(&self, port: u8) -> Option<&PlayerSettings> {
        self.players.iter().find(|p| p.port == port)
    }
}

/// Controller classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerType {
    Digital,
    Analog,
}

/// The rule checks, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CheckKey {
    TravelTime,
    DisallowedCStick,
    UptiltRounding,
    CrouchUptilt,
    Sdi,
    GoomWave,
    ControlStickViz,
}

impl CheckKey {
    pub const ALL: [CheckKey; 7] = [
        CheckKey::TravelTime,
        CheckKey::DisallowedCStick,
        CheckKey::UptiltRounding,
        CheckKey::CrouchUptilt,
        CheckKey::Sdi,
        CheckKey::GoomWave,
        CheckKey::ControlStickViz,
    ];

    /// Human-readable check name
    pub fn display_name(&self) -> &'static str {
        match self {
            CheckKey::TravelTime => "Box Travel Time",
            CheckKey::DisallowedCStick => "Disallowed Analog C-Stick Values",
            CheckKey::UptiltRounding => "Uptilt Rounding",
            CheckKey::CrouchUptilt => "Fast Crouch Uptilt",
            CheckKey::Sdi => "Illegal SDI",
            CheckKey::GoomWave => "GoomWave Clamping",
            CheckKey::ControlStickViz => "Control Stick Visualization",
        }
    }

    /// Informational checks carry data for display and never fail a player
    pub fn is_informational(&self) -> bool {
        matches!(self, CheckKey::ControlStickViz)
    }
}

impl fmt::Display for CheckKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A single piece of evidence against a player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub metric: f64,
    pub reason: String,
    pub evidence: Vec<f64>,
}

/// Outcome of one check for one port
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// Whether the check flagged the player
    pub flagged: bool,
    pub violations: Vec<Violation>,
}

/// Results of every check for one port
pub type CheckResults = BTreeMap<CheckKey, CheckOutcome>;
