//! Rule parameters for squads, transfers and chips

use crate::price::Price;
use crate::RulesError;
use serde::{Deserialize, Serialize};

/// Tunable rule parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Budget given to newly created squads
    pub default_budget: Price,

    /// Number of players in a full squad (starters + bench)
    pub squad_size: usize,

    /// Number of bench players in a full squad
    pub bench_size: usize,

    /// Points deducted for each transfer beyond the free allotment
    pub transfer_penalty_points: i32,

    /// Free transfers granted each time a gameweek is activated
    pub free_transfers_per_period: u32,

    /// Upper bound on banked free transfers
    pub max_free_transfers: u32,

    /// Gameweeks that must elapse before a chip can be reused
    pub chip_cooldown_periods: i32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            default_budget: Price::from_millions(50),
            squad_size: 6,
            bench_size: 1,
            transfer_penalty_points: 4,
            free_transfers_per_period: 1,
            max_free_transfers: 2,
            chip_cooldown_periods: 7,
        }
    }
}

impl RulesConfig {
    /// Number of starters in a full squad
    pub fn starters(&self) -> usize {
        self.squad_size - self.bench_size
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), RulesError> {
        if self.squad_size == 0 {
            return Err(RulesError::InvalidConfig("squad_size must be greater than 0".into()));
        }
        if self.bench_size >= self.squad_size {
            return Err(RulesError::InvalidConfig(
                "bench_size must be smaller than squad_size".into(),
            ));
        }
        if self.starters() < crate::Position::ALL.len() {
            return Err(RulesError::InvalidConfig(
                "starters must cover every position at least once".into(),
            ));
        }
        if self.default_budget.is_negative() {
            return Err(RulesError::InvalidConfig("default_budget cannot be negative".into()));
        }
        if self.transfer_penalty_points < 0 {
            return Err(RulesError::InvalidConfig(
                "transfer_penalty_points cannot be negative".into(),
            ));
        }
        if self.chip_cooldown_periods < 0 {
            return Err(RulesError::InvalidConfig(
                "chip_cooldown_periods cannot be negative".into(),
            ));
        }
        Ok(())
    }
}
