//! League entities as stored and exchanged with the storage layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use squad_rules::{ChipType, PlayerId, Position, Price, RawStats, RosterEntry};
use std::collections::HashMap;

pub type SquadId = i64;
pub type GameweekId = i64;
pub type LeagueId = i64;

/// Catalog player. Price and form are admin adjustable between gameweeks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub position: Position,
    pub price: Price,
    #[serde(default)]
    pub is_in_form: bool,
}

/// A user's team: budget, transfer allotment and running points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Squad {
    pub id: SquadId,
    pub owner: String,
    pub name: String,
    pub budget: Price,
    pub free_transfers: u32,
    pub total_points: i32,
}

/// Fields needed to create a squad
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSquad {
    pub owner: String,
    pub name: String,
    pub budget: Price,
    pub free_transfers: u32,
}

/// Links a squad to one of its six players
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquadMembership {
    pub squad_id: SquadId,
    pub player_id: PlayerId,
    pub is_captain: bool,
    pub is_on_bench: bool,
    pub slot: u8,
}

/// Player choice submitted when saving a squad
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquadSelection {
    pub player_id: PlayerId,
    #[serde(default)]
    pub is_on_bench: bool,
    #[serde(default)]
    pub is_captain: bool,
}

/// A scoring period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gameweek {
    pub id: GameweekId,
    pub number: i32,
    pub is_active: bool,
    pub is_completed: bool,
}

/// Raw stats and derived points for one player in one gameweek
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub player_id: PlayerId,
    pub gameweek_id: GameweekId,
    pub stats: RawStats,
    pub points: i32,
}

/// Admin input for one player's performance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceEntry {
    pub player_id: PlayerId,
    #[serde(flatten)]
    pub stats: RawStats,
}

/// A squad's computed score for one gameweek
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodScore {
    pub squad_id: SquadId,
    pub gameweek_id: GameweekId,
    /// Net points: `gross_points - transfer_cost`
    pub points: i32,
    pub gross_points: i32,
    pub transfer_cost: i32,
    pub bench_boost: bool,
    pub triple_captain: bool,
}

/// One play of a chip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipUsage {
    pub squad_id: SquadId,
    pub chip: ChipType,
    pub gameweek_id: GameweekId,
    pub gameweek_number: i32,
    pub used_at: DateTime<Utc>,
}

/// Executed transfer, append-only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub squad_id: SquadId,
    pub player_out: PlayerId,
    pub player_in: PlayerId,
    pub gameweek_id: GameweekId,
    pub point_cost: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct League {
    pub id: LeagueId,
    pub name: String,
}

/// Build rule-level roster entries from memberships and the player catalog
///
/// Memberships whose player is missing from `players` are skipped.
pub fn roster_entries(
    memberships: &[SquadMembership],
    players: &HashMap<PlayerId, Player>,
) -> Vec<RosterEntry> {
    memberships
        .iter()
        .filter_map(|m| {
            players.get(&m.player_id).map(|p| RosterEntry {
                player_id: p.id,
                position: p.position,
                is_on_bench: m.is_on_bench,
                is_captain: m.is_captain,
                price: p.price,
            })
        })
        .collect()
}
