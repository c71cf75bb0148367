//! Playing positions and their scoring values

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Player position in a fantasy squad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Position {
    Defender,
    Midfielder,
    Forward,
}

impl Position {
    /// All positions in formation order
    pub const ALL: [Position; 3] = [Position::Defender, Position::Midfielder, Position::Forward];

    /// Normalize an untrusted position label.
    ///
    /// Matching is case-insensitive and substring based ("def", "mid",
    /// "for"/"fwd"). Unrecognized labels fall back to `Midfielder`, which
    /// shares the Forward goal value, so an odd label never zeroes a score.
    pub fn from_label(label: &str) -> Self {
        let lower = label.to_lowercase();
        if lower.contains("def") {
            Position::Defender
        } else if lower.contains("mid") {
            Position::Midfielder
        } else if lower.contains("for") || lower.contains("fwd") {
            Position::Forward
        } else {
            Position::Midfielder
        }
    }

    /// Points awarded per goal scored
    pub fn goal_points(self) -> i32 {
        match self {
            Position::Defender => 6,
            Position::Midfielder | Position::Forward => 5,
        }
    }

    /// Index into per-position arrays
    pub(crate) fn index(self) -> usize {
        match self {
            Position::Defender => 0,
            Position::Midfielder => 1,
            Position::Forward => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Position::Defender => "Defender",
            Position::Midfielder => "Midfielder",
            Position::Forward => "Forward",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Position {
    fn from(label: &str) -> Self {
        Position::from_label(label)
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Position::from_label(&label))
    }
}
