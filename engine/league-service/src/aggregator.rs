//! Score aggregation
//!
//! Rolls per-player gameweek points into per-squad period scores and
//! all-time totals. A run always recomputes from scratch: period scores are
//! replaced, never incremented, and totals are re-summed from every stored
//! period score, so repeating a run for the same gameweek changes nothing.

use crate::error::LeagueError;
use crate::models::{GameweekId, PeriodScore, SquadId, SquadMembership};
use crate::store::LeagueStore;
use crate::Result;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use squad_rules::{ActiveChips, ChipType, PlayerId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Points a squad earned from its counted players
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquadScore {
    pub gross_points: i32,
    pub counted_players: usize,
    pub captain_points: i32,
}

/// Sum a roster's points for one gameweek
///
/// Starters count; the bench player counts only with bench boost. The
/// captain is counted once at the chip-dependent multiplier. Players without
/// a performance record contribute zero. Sums saturate at the `i32` bounds.
pub fn score_squad(
    roster: &[SquadMembership],
    points_by_player: &HashMap<PlayerId, i32>,
    chips: ActiveChips,
) -> SquadScore {
    let mut score = SquadScore::default();

    for member in roster.iter().filter(|m| chips.bench_boost || !m.is_on_bench) {
        let raw = points_by_player.get(&member.player_id).copied().unwrap_or(0);
        let points =
            if member.is_captain { raw.saturating_mul(chips.captain_multiplier()) } else { raw };
        if member.is_captain {
            score.captain_points = points;
        }
        score.gross_points = score.gross_points.saturating_add(points);
        score.counted_players += 1;
    }

    score
}

/// Outcome of one aggregation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationSummary {
    pub gameweek_id: GameweekId,
    pub squads_scored: usize,
    pub failed_squads: Vec<SquadId>,
}

impl AggregationSummary {
    pub fn is_complete(&self) -> bool {
        self.failed_squads.is_empty()
    }
}

/// Batch recomputation of period scores and totals
#[derive(Clone)]
pub struct ScoreAggregator {
    store: Arc<dyn LeagueStore>,
}

impl ScoreAggregator {
    pub fn new(store: Arc<dyn LeagueStore>) -> Self {
        Self { store }
    }

    /// Recompute every squad's score for a gameweek and refresh totals
    ///
    /// All scores are computed in memory before anything is written. Each
    /// squad is then persisted independently; a failed write is logged and
    /// reported in the summary without affecting other squads.
    pub async fn aggregate_gameweek(&self, gameweek_id: GameweekId) -> Result<AggregationSummary> {
        if self.store.get_gameweek(gameweek_id).await?.is_none() {
            return Err(LeagueError::GameweekNotFound { gameweek_id });
        }

        let squads = self.store.list_squads().await?;

        let points_by_player: HashMap<PlayerId, i32> = self
            .store
            .list_performances(gameweek_id)
            .await?
            .into_iter()
            .map(|r| (r.player_id, r.points))
            .collect();

        let mut played_by_squad: HashMap<SquadId, Vec<ChipType>> = HashMap::new();
        for usage in self.store.list_gameweek_chips(gameweek_id).await? {
            played_by_squad.entry(usage.squad_id).or_default().push(usage.chip);
        }
        let chips_by_squad: HashMap<SquadId, ActiveChips> = played_by_squad
            .into_iter()
            .map(|(squad_id, played)| (squad_id, ActiveChips::from_chips(played)))
            .collect();

        let mut cost_by_squad: HashMap<SquadId, i32> = HashMap::new();
        for transfer in self.store.list_gameweek_transfers(gameweek_id).await? {
            let cost = cost_by_squad.entry(transfer.squad_id).or_default();
            *cost = cost.saturating_add(transfer.point_cost);
        }

        let mut scores = Vec::with_capacity(squads.len());
        for squad in &squads {
            let roster = self.store.list_memberships(squad.id).await?;
            let chips = chips_by_squad.get(&squad.id).copied().unwrap_or_default();
            let squad_score = score_squad(&roster, &points_by_player, chips);
            let transfer_cost = cost_by_squad.get(&squad.id).copied().unwrap_or(0);

            debug!(
                squad_id = squad.id,
                gameweek_id,
                gross = squad_score.gross_points,
                transfer_cost,
                "computed squad score"
            );

            scores.push(PeriodScore {
                squad_id: squad.id,
                gameweek_id,
                points: squad_score.gross_points.saturating_sub(transfer_cost),
                gross_points: squad_score.gross_points,
                transfer_cost,
                bench_boost: chips.bench_boost,
                triple_captain: chips.triple_captain,
            });
        }

        let results = join_all(scores.iter().map(|score| self.persist(score))).await;

        let mut summary = AggregationSummary { gameweek_id, ..Default::default() };
        for (score, result) in scores.iter().zip(results) {
            match result {
                Ok(total) => {
                    debug!(squad_id = score.squad_id, total, "updated squad total");
                    summary.squads_scored += 1;
                }
                Err(e) => {
                    error!(squad_id = score.squad_id, gameweek_id, "failed to persist score: {}", e);
                    summary.failed_squads.push(score.squad_id);
                }
            }
        }

        info!(
            gameweek_id,
            scored = summary.squads_scored,
            failed = summary.failed_squads.len(),
            "gameweek aggregation complete"
        );

        Ok(summary)
    }

    /// Replace one period score and re-sum the squad's all-time total
    ///
    /// The store re-sums in the same write that stores the total, so runs
    /// for different gameweeks cannot overwrite each other's totals.
    async fn persist(&self, score: &PeriodScore) -> Result<i32> {
        self.store.upsert_period_score(score).await?;
        self.store.refresh_total_points(score.squad_id).await
    }
}
