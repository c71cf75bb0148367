//! LeagueService - squads, gameweeks, scoring and leaderboards
//!
//! This crate applies the pure rules from `squad-rules` to stored league
//! state: it saves and transfers squads, runs the gameweek lifecycle,
//! aggregates period scores and ranks squads. Storage sits behind the
//! [`LeagueStore`] trait with an in-memory and a PostgreSQL implementation.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod leaderboard;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod service;
pub mod store;

pub use aggregator::{score_squad, AggregationSummary, ScoreAggregator, SquadScore};
pub use config::{DatabaseConfig, LeagueServiceConfig};
pub use error::LeagueError;
pub use leaderboard::{rank_squads, LeaderboardEntry, LeaderboardScope};
pub use memory::InMemoryStore;
pub use models::{
    ChipUsage, Gameweek, GameweekId, League, LeagueId, NewSquad, PerformanceEntry,
    PerformanceRecord, PeriodScore, Player, Squad, SquadId, SquadMembership, SquadSelection,
    TransferRecord,
};
pub use postgres::PgStore;
pub use service::LeagueService;
pub use store::LeagueStore;

// Result type alias
pub type Result<T> = std::result::Result<T, LeagueError>;
