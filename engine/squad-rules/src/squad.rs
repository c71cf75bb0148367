//! Squad composition rules
//!
//! The core position check counts starters per position, reports every
//! position that has no starter, and marks the sole starter of a position as
//! locked. Composition (size, bench, captain) and budget checks are layered on
//! top by [`validate_squad`].

use crate::config::RulesConfig;
use crate::position::Position;
use crate::price::Price;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Player identifier shared with the storage layer
pub type PlayerId = i64;

/// One player slot in an intended roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub player_id: PlayerId,
    pub position: Position,
    pub is_on_bench: bool,
    #[serde(default)]
    pub is_captain: bool,
    #[serde(default)]
    pub price: Price,
}

impl RosterEntry {
    /// Create a starting-lineup entry
    pub fn starter(player_id: PlayerId, position: Position) -> Self {
        Self { player_id, position, is_on_bench: false, is_captain: false, price: Price::ZERO }
    }

    /// Create a bench entry
    pub fn bench(player_id: PlayerId, position: Position) -> Self {
        Self { player_id, position, is_on_bench: true, is_captain: false, price: Price::ZERO }
    }

    pub fn with_price(mut self, price: Price) -> Self {
        self.price = price;
        self
    }

    pub fn as_captain(mut self) -> Self {
        self.is_captain = true;
        self
    }
}

/// Starter counts per position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionCounts {
    pub defenders: usize,
    pub midfielders: usize,
    pub forwards: usize,
}

impl PositionCounts {
    pub fn get(&self, position: Position) -> usize {
        match position {
            Position::Defender => self.defenders,
            Position::Midfielder => self.midfielders,
            Position::Forward => self.forwards,
        }
    }

    fn slot_mut(&mut self, position: Position) -> &mut usize {
        match position {
            Position::Defender => &mut self.defenders,
            Position::Midfielder => &mut self.midfielders,
            Position::Forward => &mut self.forwards,
        }
    }

    pub fn increment(&mut self, position: Position) {
        *self.slot_mut(position) += 1;
    }

    pub fn decrement(&mut self, position: Position) {
        let slot = self.slot_mut(position);
        *slot = slot.saturating_sub(1);
    }

    /// Positions with no starter, in formation order
    pub fn missing(&self) -> Vec<Position> {
        Position::ALL.into_iter().filter(|p| self.get(*p) == 0).collect()
    }
}

/// Result of validating a roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquadValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub position_counts: PositionCounts,
    pub locked_player_ids: BTreeSet<PlayerId>,
}

impl SquadValidation {
    pub fn is_locked(&self, player_id: PlayerId) -> bool {
        self.locked_player_ids.contains(&player_id)
    }
}

/// Count starters (bench excluded) per position
pub fn count_starters(roster: &[RosterEntry]) -> PositionCounts {
    let mut counts = PositionCounts::default();
    for entry in roster.iter().filter(|e| !e.is_on_bench) {
        counts.increment(entry.position);
    }
    counts
}

/// Sum of the selected players' prices
pub fn total_spend(roster: &[RosterEntry]) -> Price {
    roster.iter().map(|e| e.price).sum()
}

/// Core position check: at least one starter per position, lock sole starters
pub fn validate_positions(roster: &[RosterEntry]) -> SquadValidation {
    let position_counts = count_starters(roster);

    let errors: Vec<String> = position_counts
        .missing()
        .into_iter()
        .map(|p| format!("At least 1 {p} required in starters"))
        .collect();

    let locked_player_ids = roster
        .iter()
        .filter(|e| !e.is_on_bench && position_counts.get(e.position) == 1)
        .map(|e| e.player_id)
        .collect();

    SquadValidation { is_valid: errors.is_empty(), errors, position_counts, locked_player_ids }
}

/// Full roster check used before a squad is saved
///
/// Runs composition checks (size, bench, duplicates, captain), the core
/// position check, and the budget check. All violations are reported.
pub fn validate_squad(roster: &[RosterEntry], budget: Price, rules: &RulesConfig) -> SquadValidation {
    let mut errors = Vec::new();

    if roster.len() != rules.squad_size {
        errors.push(format!(
            "Squad must contain exactly {} players (found {})",
            rules.squad_size,
            roster.len()
        ));
    }

    let bench_count = roster.iter().filter(|e| e.is_on_bench).count();
    if bench_count != rules.bench_size {
        errors.push(format!(
            "Exactly {} bench player required (found {bench_count})",
            rules.bench_size
        ));
    }

    let mut seen = HashSet::new();
    let mut reported = BTreeSet::new();
    for entry in roster {
        if !seen.insert(entry.player_id) && reported.insert(entry.player_id) {
            errors.push(format!("Player {} selected more than once", entry.player_id));
        }
    }

    if roster.iter().filter(|e| e.is_captain).count() > 1 {
        errors.push("Only one captain allowed".to_string());
    }
    if roster.iter().any(|e| e.is_captain && e.is_on_bench) {
        errors.push("Captain cannot be on the bench".to_string());
    }

    let mut validation = validate_positions(roster);
    errors.append(&mut validation.errors);

    let spend = total_spend(roster);
    if spend > budget {
        errors.push(format!("Squad cost {spend} exceeds budget {budget}"));
    }

    validation.is_valid = errors.is_empty();
    validation.errors = errors;
    validation
}
