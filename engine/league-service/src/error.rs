//! Error types for LeagueService

use crate::models::{GameweekId, LeagueId, SquadId};
use squad_rules::{ChipType, PlayerId, RulesError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LeagueError {
    /// A roster change broke a squad rule. Nothing was written.
    #[error("Rejected: {}", .reasons.join("; "))]
    Rejected { reasons: Vec<String> },

    #[error("Squad not found: {squad_id}")]
    SquadNotFound { squad_id: SquadId },

    #[error("Squad already exists for owner: {owner}")]
    SquadAlreadyExists { owner: String },

    #[error("Player not found: {player_id}")]
    PlayerNotFound { player_id: PlayerId },

    #[error("Gameweek not found: {gameweek_id}")]
    GameweekNotFound { gameweek_id: GameweekId },

    #[error("Gameweek {number} already exists")]
    GameweekAlreadyExists { number: i32 },

    #[error("Gameweek {gameweek_id} is already completed")]
    GameweekCompleted { gameweek_id: GameweekId },

    #[error("League not found: {league_id}")]
    LeagueNotFound { league_id: LeagueId },

    #[error("No active gameweek")]
    NoActiveGameweek,

    #[error("Chip {chip} already used by squad {squad_id} in gameweek {gameweek_id}")]
    DuplicateChipUsage { squad_id: SquadId, chip: ChipType, gameweek_id: GameweekId },

    #[error("Chip {chip} is on cooldown until gameweek {available_from}")]
    ChipOnCooldown { chip: ChipType, available_from: i32 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Rules error: {0}")]
    Rules(#[from] RulesError),

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl LeagueError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        LeagueError::Rejected { reasons: vec![reason.into()] }
    }

    /// True for rule violations that should be shown to the user as a
    /// rejected request rather than a server fault
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            LeagueError::Rejected { .. }
                | LeagueError::ChipOnCooldown { .. }
                | LeagueError::DuplicateChipUsage { .. }
                | LeagueError::NoActiveGameweek
                | LeagueError::GameweekCompleted { .. }
        )
    }
}
