//! Transfer and bench-swap legality, and transfer point cost

use crate::config::RulesConfig;
use crate::position::Position;
use crate::squad::{count_starters, RosterEntry};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Outcome of a transfer legality check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferCheck {
    pub can_transfer: bool,
    pub reason: Option<String>,
    pub is_position_locked: bool,
}

impl TransferCheck {
    fn allowed() -> Self {
        Self { can_transfer: true, reason: None, is_position_locked: false }
    }

    fn rejected(reason: String, is_position_locked: bool) -> Self {
        Self { can_transfer: false, reason: Some(reason), is_position_locked }
    }
}

/// Check whether replacing a starter of `out_position` with a player of
/// `in_position` keeps at least one starter per position.
///
/// `roster` is the current roster; bench entries are ignored for counting.
/// Like-for-like swaps are always permitted. The check never mutates the
/// roster and says nothing about budget or free transfers.
pub fn validate_transfer(
    out_position: Position,
    in_position: Position,
    roster: &[RosterEntry],
) -> TransferCheck {
    if out_position == in_position {
        return TransferCheck::allowed();
    }

    let mut counts = count_starters(roster);

    if counts.get(out_position) == 1 {
        debug!(%out_position, %in_position, "transfer rejected: position locked");
        return TransferCheck::rejected(
            format!(
                "Cannot transfer out the only {out_position} - squad needs at least 1 {out_position} in starters"
            ),
            true,
        );
    }

    counts.decrement(out_position);
    counts.increment(in_position);

    if !counts.missing().is_empty() {
        debug!(%out_position, %in_position, "transfer rejected: formation violated");
        return TransferCheck::rejected(
            "Transfer would violate squad position requirements".to_string(),
            false,
        );
    }

    TransferCheck::allowed()
}

/// Check whether a starter can swap places with the bench player.
///
/// The starter leaves the lineup and the bench player enters it, so the rule
/// is the same as a transfer from `starter_position` to `bench_position`.
pub fn validate_bench_swap(
    starter_position: Position,
    bench_position: Position,
    roster: &[RosterEntry],
) -> TransferCheck {
    validate_transfer(starter_position, bench_position, roster)
}

/// Point cost of one transfer given the squad's free transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferCost {
    pub point_cost: i32,
    pub remaining_free_transfers: u32,
}

/// Compute the cost of the next transfer
pub fn transfer_cost(free_transfers: u32, rules: &RulesConfig) -> TransferCost {
    if free_transfers > 0 {
        TransferCost { point_cost: 0, remaining_free_transfers: free_transfers - 1 }
    } else {
        TransferCost { point_cost: rules.transfer_penalty_points, remaining_free_transfers: 0 }
    }
}

/// Free transfers after a gameweek is activated
pub fn replenish_free_transfers(current: u32, rules: &RulesConfig) -> u32 {
    current.saturating_add(rules.free_transfers_per_period).min(rules.max_free_transfers)
}
