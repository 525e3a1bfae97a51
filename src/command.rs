//! Structured commands and report events.
//!
//! Commands arrive as JSON objects tagged by `intent`, with free-form slot
//! values (directions, cardinal positions) resolved here through synonym
//! tables. Every accepted command produces exactly one [`ReportEvent`].

use crate::error::{KhojError, Result};
use crate::grid::TurnDirection;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A command from the operator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Command {
    /// Acknowledge readiness
    Launch,

    /// Bounded straight drive
    Move {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        direction: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rotations: Option<f32>,
    },

    /// Bounded point turn
    Turn {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        direction: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        degrees: Option<f32>,
    },

    /// Start the expanding-square search
    StartSearch,

    /// Start the exhaustive perimeter walk
    WalkPerimeter,

    /// Update the grid geometry; any subset of slots may be given
    SetGrid {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        width: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        height: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cardinal: Option<String>,
    },

    Pause,

    #[serde(rename = "killswitch")]
    KillSwitch,

    StopCancel,

    /// The operator session timed out
    Expired,
}

impl Command {
    /// Parse one JSON command.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| KhojError::InvalidCommand(e.to_string()))
    }

    /// Name of the report this command produces.
    pub fn report_name(&self) -> ReportName {
        match self {
            Command::Launch => ReportName::Launch,
            Command::Move { .. } => ReportName::Move,
            Command::Turn { .. } => ReportName::Turn,
            Command::StartSearch => ReportName::StartSearch,
            Command::WalkPerimeter => ReportName::WalkPerimeter,
            Command::SetGrid { .. } => ReportName::SetGrid,
            Command::Pause => ReportName::Pause,
            Command::KillSwitch => ReportName::KillSwitch,
            Command::StopCancel => ReportName::StopCancel,
            Command::Expired => ReportName::Expired,
        }
    }

    /// Commands that must run immediately, even while another command is executing.
    pub fn is_interrupt(&self) -> bool {
        matches!(
            self,
            Command::KillSwitch | Command::StopCancel | Command::Expired
        )
    }

    /// Short kind used in the instruction ledger.
    pub fn kind(&self) -> &'static str {
        match self {
            Command::Launch => "launch",
            Command::Move { .. } => "move",
            Command::Turn { .. } => "turn",
            Command::StartSearch => "start_search",
            Command::WalkPerimeter => "walk_perimeter",
            Command::SetGrid { .. } => "set_grid",
            Command::Pause => "pause",
            Command::KillSwitch => "killswitch",
            Command::StopCancel => "stop_cancel",
            Command::Expired => "expired",
        }
    }
}

/// Report names, one per command.
///
/// Serialized as the name in [`as_str`](Self::as_str).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum ReportName {
    Launch,
    Move,
    Turn,
    StartSearch,
    WalkPerimeter,
    SetGrid,
    Pause,
    KillSwitch,
    StopCancel,
    Expired,
}

impl ReportName {
    pub const ALL: [ReportName; 10] = [
        ReportName::Launch,
        ReportName::Move,
        ReportName::Turn,
        ReportName::StartSearch,
        ReportName::WalkPerimeter,
        ReportName::SetGrid,
        ReportName::Pause,
        ReportName::KillSwitch,
        ReportName::StopCancel,
        ReportName::Expired,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ReportName::Launch => "ResponseAfterLaunch",
            ReportName::Move => "ResponseAfterMove",
            ReportName::Turn => "ResponseAfterTurn",
            ReportName::StartSearch => "ResponseAfterStartSearch",
            ReportName::WalkPerimeter => "ResponseAfterWalkPerimeter",
            ReportName::SetGrid => "ResponseAfterSetGrid",
            ReportName::Pause => "ResponseAfterPause",
            ReportName::KillSwitch => "ResponseAfterKillSwitch",
            ReportName::StopCancel => "ResponseAfterStopCancel",
            ReportName::Expired => "ResponseAfterExpired",
        }
    }
}

impl From<ReportName> for &'static str {
    fn from(name: ReportName) -> Self {
        name.as_str()
    }
}

impl TryFrom<String> for ReportName {
    type Error = KhojError;

    fn try_from(name: String) -> Result<Self> {
        ReportName::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == name)
            .ok_or_else(|| KhojError::InvalidCommand(format!("Unknown report name: {}", name)))
    }
}

impl fmt::Display for ReportName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a command, sent back to the operator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportEvent {
    pub name: ReportName,
    pub report: String,
    pub success: bool,
}

impl ReportEvent {
    pub fn ok(name: ReportName, report: impl Into<String>) -> Self {
        Self {
            name,
            report: report.into(),
            success: true,
        }
    }

    pub fn failed(name: ReportName, report: impl Into<String>) -> Self {
        Self {
            name,
            report: report.into(),
            success: false,
        }
    }
}

/// Straight-line travel direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MoveDirection {
    #[default]
    Forward,
    Backward,
}

impl MoveDirection {
    /// Sign applied to the drive speed.
    pub fn speed_sign(self) -> i32 {
        match self {
            MoveDirection::Forward => 1,
            MoveDirection::Backward => -1,
        }
    }
}

impl fmt::Display for MoveDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveDirection::Forward => f.write_str("forward"),
            MoveDirection::Backward => f.write_str("backward"),
        }
    }
}

const FORWARD_WORDS: &[&str] = &["forwards", "front", "forward", "ahead"];
const BACKWARD_WORDS: &[&str] = &["backwards", "backward", "reverse", "back", "back up", "behind"];
const RIGHT_WORDS: &[&str] = &["right", "starboard", "clockwise"];
const LEFT_WORDS: &[&str] = &[
    "left",
    "port",
    "counterclockwise",
    "counter clockwise",
    "anticlockwise",
    "anti clockwise",
];

const CARDINAL_WORDS: [(&[&str], u8); 9] = [
    (&["northwest", "north west", "top left", "upper left"], 0),
    (&["north", "true north", "top"], 1),
    (&["northeast", "north east", "top right", "upper right"], 2),
    (&["west", "true west", "left"], 3),
    (&["center", "centre", "middle"], 4),
    (&["east", "true east", "right"], 5),
    (&["southwest", "south west", "bottom left", "lower left"], 6),
    (&["south", "true south", "bottom"], 7),
    (&["southeast", "south east", "bottom right", "lower right"], 8),
];

/// Lowercase, trim and collapse separators so "Back-Up" matches "back up".
fn normalize(slot: &str) -> String {
    slot.split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Resolve a move direction slot. `None` or an empty slot means forward.
pub fn parse_move_direction(slot: Option<&str>) -> Result<MoveDirection> {
    let Some(slot) = slot else {
        return Ok(MoveDirection::Forward);
    };
    let word = normalize(slot);
    if word.is_empty() || FORWARD_WORDS.contains(&word.as_str()) {
        Ok(MoveDirection::Forward)
    } else if BACKWARD_WORDS.contains(&word.as_str()) {
        Ok(MoveDirection::Backward)
    } else {
        Err(KhojError::InvalidCommand(format!(
            "Unknown move direction '{}'",
            slot
        )))
    }
}

/// Resolve a turn direction slot, falling back to `default` when absent.
pub fn parse_turn_direction(slot: Option<&str>, default: TurnDirection) -> Result<TurnDirection> {
    let Some(slot) = slot else {
        return Ok(default);
    };
    let word = normalize(slot);
    if word.is_empty() {
        Ok(default)
    } else if RIGHT_WORDS.contains(&word.as_str()) {
        Ok(TurnDirection::Right)
    } else if LEFT_WORDS.contains(&word.as_str()) {
        Ok(TurnDirection::Left)
    } else {
        Err(KhojError::InvalidCommand(format!(
            "Unknown turn direction '{}'",
            slot
        )))
    }
}

/// Resolve a cardinal/positional phrase to a grid position.
pub fn parse_cardinal(slot: &str) -> Option<u8> {
    let word = normalize(slot);
    CARDINAL_WORDS
        .iter()
        .find(|(words, _)| words.contains(&word.as_str()))
        .map(|&(_, position)| position)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_names_display_as_serialized() {
        for name in ReportName::ALL {
            let json = serde_json::to_string(&name).unwrap();
            assert_eq!(json, format!("\"{}\"", name));
            assert_eq!(serde_json::from_str::<ReportName>(&json).unwrap(), name);
        }
        assert_eq!(ReportName::KillSwitch.to_string(), "ResponseAfterKillSwitch");
        assert!(serde_json::from_str::<ReportName>("\"ResponseAfterDance\"").is_err());
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::from_json(r#"{"intent":"launch"}"#).unwrap(),
            Command::Launch
        );
        assert_eq!(
            Command::from_json(r#"{"intent":"killswitch"}"#).unwrap(),
            Command::KillSwitch
        );
        assert_eq!(
            Command::from_json(r#"{"intent":"move","direction":"back up","rotations":4}"#)
                .unwrap(),
            Command::Move {
                direction: Some("back up".into()),
                rotations: Some(4.0),
            }
        );
        assert_eq!(
            Command::from_json(r#"{"intent":"turn"}"#).unwrap(),
            Command::Turn {
                direction: None,
                degrees: None,
            }
        );
        assert_eq!(
            Command::from_json(r#"{"intent":"set_grid","position":2}"#).unwrap(),
            Command::SetGrid {
                width: None,
                height: None,
                position: Some(2),
                cardinal: None,
            }
        );
    }

    #[test]
    fn test_unknown_intent_rejected() {
        assert!(matches!(
            Command::from_json(r#"{"intent":"dance"}"#),
            Err(KhojError::InvalidCommand(_))
        ));
        assert!(Command::from_json("not json").is_err());
    }

    #[test]
    fn test_command_serializes_with_intent_tag() {
        let json = serde_json::to_value(Command::StopCancel).unwrap();
        assert_eq!(json["intent"], "stop_cancel");

        let json = serde_json::to_value(Command::Move {
            direction: None,
            rotations: Some(2.0),
        })
        .unwrap();
        assert_eq!(json["intent"], "move");
        assert!(json.get("direction").is_none());
    }

    #[test]
    fn test_interrupt_commands() {
        assert!(Command::KillSwitch.is_interrupt());
        assert!(Command::Expired.is_interrupt());
        assert!(!Command::Pause.is_interrupt());
        assert!(!Command::WalkPerimeter.is_interrupt());
    }

    #[test]
    fn test_report_names() {
        assert_eq!(Command::Launch.report_name(), ReportName::Launch);
        assert_eq!(ReportName::WalkPerimeter.to_string(), "ResponseAfterWalkPerimeter");

        let event = ReportEvent::ok(ReportName::KillSwitch, "Stopped");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["name"], "ResponseAfterKillSwitch");
        assert_eq!(json["success"], true);
    }

    #[test]
    fn test_move_direction_synonyms() {
        for word in ["forwards", "Front", "forward", "ahead"] {
            assert_eq!(parse_move_direction(Some(word)).unwrap(), MoveDirection::Forward);
        }
        for word in ["backwards", "backward", "reverse", "back", "Back-Up", "behind"] {
            assert_eq!(parse_move_direction(Some(word)).unwrap(), MoveDirection::Backward);
        }
        assert_eq!(parse_move_direction(None).unwrap(), MoveDirection::Forward);
        assert!(parse_move_direction(Some("sideways")).is_err());
        assert_eq!(MoveDirection::Backward.speed_sign(), -1);
    }

    #[test]
    fn test_turn_direction_synonyms() {
        let default = TurnDirection::Right;
        assert_eq!(parse_turn_direction(Some("starboard"), default).unwrap(), TurnDirection::Right);
        assert_eq!(parse_turn_direction(Some("Port"), default).unwrap(), TurnDirection::Left);
        assert_eq!(
            parse_turn_direction(Some("counter-clockwise"), default).unwrap(),
            TurnDirection::Left
        );
        assert_eq!(parse_turn_direction(None, TurnDirection::Left).unwrap(), TurnDirection::Left);
        assert!(parse_turn_direction(Some("up"), default).is_err());
    }

    #[test]
    fn test_cardinal_synonyms() {
        assert_eq!(parse_cardinal("top left"), Some(0));
        assert_eq!(parse_cardinal("Upper Left"), Some(0));
        assert_eq!(parse_cardinal("true north"), Some(1));
        assert_eq!(parse_cardinal("middle"), Some(4));
        assert_eq!(parse_cardinal("right"), Some(5));
        assert_eq!(parse_cardinal("lower right"), Some(8));
        assert_eq!(parse_cardinal("south"), Some(7));
        assert_eq!(parse_cardinal("nowhere"), None);
    }
}
