//! Squad Rules - roster legality, transfers, chips and performance scoring
//!
//! Pure rule functions for the fantasy league engine. Nothing in this crate
//! performs I/O; the league service feeds it roster and performance data and
//! persists what it computes.

pub mod chip;
pub mod config;
pub mod error;
pub mod position;
pub mod price;
pub mod scoring;
pub mod squad;
pub mod transfer;

pub use chip::{can_use_chip, ActiveChips, ChipType};
pub use config::RulesConfig;
pub use error::RulesError;
pub use position::Position;
pub use price::Price;
pub use scoring::{score_label, score_performance, PointsBreakdown, RawStats, ScoreResult};
pub use squad::{
    count_starters, total_spend, validate_positions, validate_squad, PlayerId, PositionCounts,
    RosterEntry, SquadValidation,
};
pub use transfer::{
    replenish_free_transfers, transfer_cost, validate_bench_swap, validate_transfer,
    TransferCheck, TransferCost,
};
