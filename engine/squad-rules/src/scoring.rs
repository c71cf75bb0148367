//! Performance scoring
//!
//! This is the single rule table used to turn one player's match statistics
//! into fantasy points. Every consumer (aggregation, admin submission, CLI
//! previews) goes through [`score_performance`].
//!
//! | Category | Defender | Midfielder | Forward |
//! |---|---|---|---|
//! | Goal | +6 | +5 | +5 |
//! | Assist | +3 | +3 | +3 |
//! | Yellow card | -1 | -1 | -1 |
//! | Red card (each) | -3 | -3 | -3 |
//! | Straight red | -3 | -3 | -3 |
//! | Man of the match | +3 | +3 | +3 |
//!
//! Days played adds a step bonus: 0 days +0, 1-3 days +1, 4 or more +2.
//! Goals conceded is recorded but never scored.

use crate::position::Position;
use serde::{Deserialize, Serialize};
use tracing::trace;

pub const ASSIST_POINTS: i32 = 3;
pub const YELLOW_CARD_POINTS: i32 = -1;
pub const RED_CARD_POINTS: i32 = -3;
pub const STRAIGHT_RED_POINTS: i32 = -3;
pub const MOTM_POINTS: i32 = 3;

/// Raw match statistics for one player in one gameweek
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawStats {
    pub goals: u32,
    pub assists: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,
    pub straight_red: bool,
    pub is_motm: bool,
    pub days_played: u32,
    /// Collected for defenders, informational only
    pub goals_conceded: u32,
}

/// Scoring category for itemized breakdowns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreCategory {
    Goals,
    Assists,
    YellowCards,
    RedCards,
    StraightRed,
    ManOfTheMatch,
    DaysPlayed,
}

impl ScoreCategory {
    pub fn label(self) -> &'static str {
        match self {
            ScoreCategory::Goals => "Goals",
            ScoreCategory::Assists => "Assists",
            ScoreCategory::YellowCards => "Yellow cards",
            ScoreCategory::RedCards => "Red cards",
            ScoreCategory::StraightRed => "Straight red",
            ScoreCategory::ManOfTheMatch => "Man of the match",
            ScoreCategory::DaysPlayed => "Days played",
        }
    }
}

/// One line of a points breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownLine {
    pub category: ScoreCategory,
    pub count: u32,
    pub points: i32,
}

/// Itemized points, non-zero categories only
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsBreakdown {
    pub lines: Vec<BreakdownLine>,
}

impl PointsBreakdown {
    fn push(&mut self, category: ScoreCategory, count: u32, points: i32) {
        if points != 0 {
            self.lines.push(BreakdownLine { category, count, points });
        }
    }

    /// Sum of every line, saturating at the `i32` bounds
    pub fn total(&self) -> i32 {
        self.lines.iter().fold(0i32, |acc, l| acc.saturating_add(l.points))
    }

    pub fn points_for(&self, category: ScoreCategory) -> i32 {
        self.lines
            .iter()
            .filter(|l| l.category == category)
            .fold(0i32, |acc, l| acc.saturating_add(l.points))
    }
}

/// Points and breakdown for one performance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub points: i32,
    pub breakdown: PointsBreakdown,
}

/// Step bonus for days played
pub fn days_played_bonus(days_played: u32) -> i32 {
    match days_played {
        0 => 0,
        1..=3 => 1,
        _ => 2,
    }
}

fn per_unit(count: u32, points: i32) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX).saturating_mul(points)
}

/// Score one player's performance
pub fn score_performance(position: Position, stats: &RawStats) -> ScoreResult {
    let mut breakdown = PointsBreakdown::default();

    breakdown.push(ScoreCategory::Goals, stats.goals, per_unit(stats.goals, position.goal_points()));
    breakdown.push(ScoreCategory::Assists, stats.assists, per_unit(stats.assists, ASSIST_POINTS));
    breakdown.push(
        ScoreCategory::YellowCards,
        stats.yellow_cards,
        per_unit(stats.yellow_cards, YELLOW_CARD_POINTS),
    );
    breakdown.push(ScoreCategory::RedCards, stats.red_cards, per_unit(stats.red_cards, RED_CARD_POINTS));
    if stats.straight_red {
        breakdown.push(ScoreCategory::StraightRed, 1, STRAIGHT_RED_POINTS);
    }
    if stats.is_motm {
        breakdown.push(ScoreCategory::ManOfTheMatch, 1, MOTM_POINTS);
    }
    breakdown.push(ScoreCategory::DaysPlayed, stats.days_played, days_played_bonus(stats.days_played));

    let points = breakdown.total();
    trace!(%position, points, "scored performance");

    ScoreResult { points, breakdown }
}

/// Score a performance whose position arrives as an untrusted label
pub fn score_label(position_label: &str, stats: &RawStats) -> ScoreResult {
    score_performance(Position::from_label(position_label), stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goals(n: u32) -> RawStats {
        RawStats { goals: n, ..Default::default() }
    }

    #[test]
    fn test_goal_value_by_position() {
        assert_eq!(score_performance(Position::Defender, &goals(1)).points, 6);
        assert_eq!(score_performance(Position::Midfielder, &goals(1)).points, 5);
        assert_eq!(score_performance(Position::Forward, &goals(1)).points, 5);
    }

    #[test]
    fn test_days_played_is_a_step_function() {
        for (days, bonus) in [(0, 0), (1, 1), (3, 1), (4, 2), (10, 2)] {
            let stats = RawStats { days_played: days, ..Default::default() };
            assert_eq!(score_performance(Position::Forward, &stats).points, bonus, "days={days}");
        }
    }

    #[test]
    fn test_motm_alone_is_three_points() {
        let stats = RawStats { is_motm: true, ..Default::default() };
        for position in Position::ALL {
            assert_eq!(score_performance(position, &stats).points, 3);
        }
    }

    #[test]
    fn test_cards() {
        let stats = RawStats { yellow_cards: 1, red_cards: 1, straight_red: true, ..Default::default() };
        let result = score_performance(Position::Midfielder, &stats);
        assert_eq!(result.points, -7);
        assert_eq!(result.breakdown.points_for(ScoreCategory::RedCards), -3);
        assert_eq!(result.breakdown.points_for(ScoreCategory::StraightRed), -3);
    }

    #[test]
    fn test_two_red_cards() {
        let stats = RawStats { red_cards: 2, ..Default::default() };
        let result = score_performance(Position::Defender, &stats);
        assert_eq!(result.points, -6);
        assert_eq!(result.breakdown.points_for(ScoreCategory::RedCards), -6);

        let stats = RawStats { red_cards: 2, straight_red: true, ..Default::default() };
        let result = score_performance(Position::Defender, &stats);
        assert_eq!(result.points, -9);
        assert_eq!(result.breakdown.points_for(ScoreCategory::StraightRed), -3);
    }

    #[test]
    fn test_extreme_counts_saturate() {
        let stats = RawStats { goals: u32::MAX, assists: u32::MAX, ..Default::default() };
        let result = score_performance(Position::Forward, &stats);
        assert_eq!(result.points, i32::MAX);
        assert_eq!(result.breakdown.points_for(ScoreCategory::Goals), i32::MAX);

        let stats = RawStats { yellow_cards: u32::MAX, red_cards: u32::MAX, ..Default::default() };
        let result = score_performance(Position::Forward, &stats);
        assert!(result.points < 0);
    }

    #[test]
    fn test_goals_conceded_not_scored() {
        let stats = RawStats { goals_conceded: 4, ..Default::default() };
        let result = score_performance(Position::Defender, &stats);
        assert_eq!(result.points, 0);
        assert!(result.breakdown.lines.is_empty());
    }

    #[test]
    fn test_full_line_breakdown_matches_total() {
        let stats = RawStats {
            goals: 2,
            assists: 1,
            yellow_cards: 1,
            is_motm: true,
            days_played: 5,
            ..Default::default()
        };
        let result = score_performance(Position::Defender, &stats);
        // 12 + 3 - 1 + 3 + 2
        assert_eq!(result.points, 19);
        assert_eq!(result.breakdown.total(), result.points);
        assert_eq!(result.breakdown.lines.len(), 5);
    }

    #[test]
    fn test_unknown_label_scores_like_midfielder() {
        assert_eq!(score_label("keeper", &goals(2)).points, 10);
        assert_eq!(score_label("DEF", &goals(2)).points, 12);
    }
}
