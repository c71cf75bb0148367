//! Chips and their cooldown policy

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::RulesError;

/// One-off scoring boost a squad can play for a gameweek
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChipType {
    /// Bench player's points count for the gameweek
    BenchBoost,
    /// Captain's points are tripled instead of doubled
    TripleCaptain,
}

impl ChipType {
    pub const ALL: [ChipType; 2] = [ChipType::BenchBoost, ChipType::TripleCaptain];

    pub fn as_str(self) -> &'static str {
        match self {
            ChipType::BenchBoost => "bench_boost",
            ChipType::TripleCaptain => "triple_captain",
        }
    }
}

impl fmt::Display for ChipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChipType {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "bench_boost" | "benchboost" => Ok(ChipType::BenchBoost),
            "triple_captain" | "triplecaptain" | "3x" => Ok(ChipType::TripleCaptain),
            other => Err(RulesError::UnknownChip(other.to_string())),
        }
    }
}

/// Chips active for one squad in one gameweek
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveChips {
    pub bench_boost: bool,
    pub triple_captain: bool,
}

impl ActiveChips {
    pub fn from_chips(chips: impl IntoIterator<Item = ChipType>) -> Self {
        let mut active = ActiveChips::default();
        for chip in chips {
            match chip {
                ChipType::BenchBoost => active.bench_boost = true,
                ChipType::TripleCaptain => active.triple_captain = true,
            }
        }
        active
    }

    /// Multiplier applied to the captain's points
    pub fn captain_multiplier(&self) -> i32 {
        if self.triple_captain {
            3
        } else {
            2
        }
    }
}

/// Whether a chip last used in `last_used_period` may be played in `target_period`
///
/// Usable when never used, or when at least `cooldown_periods` gameweeks
/// separate the two (`target - last >= cooldown`).
pub fn can_use_chip(last_used_period: Option<i32>, target_period: i32, cooldown_periods: i32) -> bool {
    match last_used_period {
        None => true,
        Some(last) => target_period - last >= cooldown_periods,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_used_is_usable() {
        assert!(can_use_chip(None, 1, 7));
    }

    #[test]
    fn test_cooldown_window() {
        for target in 4..=9 {
            assert!(!can_use_chip(Some(3), target, 7), "period {target} should be blocked");
        }
        assert!(can_use_chip(Some(3), 10, 7));
        assert!(can_use_chip(Some(3), 11, 7));
    }

    #[test]
    fn test_captain_multiplier() {
        assert_eq!(ActiveChips::default().captain_multiplier(), 2);
        let chips = ActiveChips::from_chips([ChipType::TripleCaptain]);
        assert_eq!(chips.captain_multiplier(), 3);
        assert!(!chips.bench_boost);
    }

    #[test]
    fn test_parse_chip_type() {
        assert_eq!("bench-boost".parse::<ChipType>().unwrap(), ChipType::BenchBoost);
        assert_eq!("Triple Captain".parse::<ChipType>().unwrap(), ChipType::TripleCaptain);
        assert!(matches!("wildcard".parse::<ChipType>(), Err(RulesError::UnknownChip(_))));
    }
}
