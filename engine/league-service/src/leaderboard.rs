//! Leaderboard ranking

use crate::models::{GameweekId, Squad, SquadId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which points a leaderboard ranks by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardScope {
    /// Running total over every scored gameweek
    AllTime,
    /// Net points of one gameweek
    Gameweek(GameweekId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub squad_id: SquadId,
    pub squad_name: String,
    pub owner: String,
    pub points: i32,
}

/// Rank squads by points
///
/// Ordered by points descending, then squad id ascending. Equal points share
/// a rank and the following rank skips (1, 1, 3). Squads missing from
/// `points` rank with zero.
pub fn rank_squads(squads: &[Squad], points: &HashMap<SquadId, i32>) -> Vec<LeaderboardEntry> {
    let mut rows: Vec<(&Squad, i32)> =
        squads.iter().map(|s| (s, points.get(&s.id).copied().unwrap_or(0))).collect();
    rows.sort_by(|(a, a_points), (b, b_points)| b_points.cmp(a_points).then(a.id.cmp(&b.id)));

    let mut entries: Vec<LeaderboardEntry> = Vec::with_capacity(rows.len());
    for (position, (squad, points)) in rows.into_iter().enumerate() {
        let rank = match entries.last() {
            Some(prev) if prev.points == points => prev.rank,
            _ => position as u32 + 1,
        };
        entries.push(LeaderboardEntry {
            rank,
            squad_id: squad.id,
            squad_name: squad.name.clone(),
            owner: squad.owner.clone(),
            points,
        });
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use squad_rules::Price;

    fn squad(id: SquadId) -> Squad {
        Squad {
            id,
            owner: format!("owner{id}"),
            name: format!("Squad {id}"),
            budget: Price::from_millions(50),
            free_transfers: 1,
            total_points: 0,
        }
    }

    #[test]
    fn test_ties_share_rank_and_next_skips() {
        let squads = vec![squad(1), squad(2), squad(3), squad(4)];
        let points = HashMap::from([(1, 10), (2, 25), (3, 25), (4, 3)]);

        let board = rank_squads(&squads, &points);
        let ranks: Vec<(SquadId, u32)> = board.iter().map(|e| (e.squad_id, e.rank)).collect();
        assert_eq!(ranks, vec![(2, 1), (3, 1), (1, 3), (4, 4)]);
    }

    #[test]
    fn test_missing_points_rank_as_zero() {
        let squads = vec![squad(1), squad(2)];
        let points = HashMap::from([(2, -4)]);

        let board = rank_squads(&squads, &points);
        assert_eq!(board[0].squad_id, 1);
        assert_eq!(board[0].points, 0);
        assert_eq!(board[1].points, -4);
        assert_eq!(board[1].rank, 2);
    }

    #[test]
    fn test_empty() {
        assert!(rank_squads(&[], &HashMap::new()).is_empty());
    }
}
