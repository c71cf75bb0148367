//! Storage interface consumed by the league engine

use crate::models::{
    ChipUsage, Gameweek, GameweekId, League, LeagueId, NewSquad, PerformanceRecord, PeriodScore,
    Player, Squad, SquadId, SquadMembership, TransferRecord,
};
use crate::Result;
use squad_rules::{PlayerId, RulesConfig};

/// Abstract storage for league entities
///
/// Multi-entity writes (`replace_roster`, `apply_transfer`,
/// `activate_gameweek`, `refresh_total_points`) must be atomic. Uniqueness of performance records,
/// period scores and chip usages is enforced here, not by callers.
#[async_trait::async_trait]
pub trait LeagueStore: Send + Sync {
    /// Insert or update a catalog player
    async fn upsert_player(&self, player: &Player) -> Result<()>;

    async fn get_player(&self, player_id: PlayerId) -> Result<Option<Player>>;

    /// Load the given players; unknown ids are omitted
    async fn list_players(&self, player_ids: &[PlayerId]) -> Result<Vec<Player>>;

    /// Create a squad. Owners are unique.
    async fn insert_squad(&self, squad: NewSquad) -> Result<Squad>;

    async fn get_squad(&self, squad_id: SquadId) -> Result<Option<Squad>>;

    async fn list_squads(&self) -> Result<Vec<Squad>>;

    /// Persist budget, free transfers and name
    async fn update_squad(&self, squad: &Squad) -> Result<()>;

    /// Recompute a squad's all-time total from its stored period scores
    /// and persist it, in a single write. Returns the new total.
    async fn refresh_total_points(&self, squad_id: SquadId) -> Result<i32>;

    /// Memberships of a squad ordered by slot
    async fn list_memberships(&self, squad_id: SquadId) -> Result<Vec<SquadMembership>>;

    /// Atomically replace a squad's whole roster
    async fn replace_roster(&self, squad_id: SquadId, memberships: &[SquadMembership])
        -> Result<()>;

    /// Atomically write the new roster, the squad's transfer state and the
    /// transfer log entry
    async fn apply_transfer(
        &self,
        squad: &Squad,
        memberships: &[SquadMembership],
        record: &TransferRecord,
    ) -> Result<()>;

    /// Create a gameweek; numbers are unique
    async fn insert_gameweek(&self, number: i32) -> Result<Gameweek>;

    async fn get_gameweek(&self, gameweek_id: GameweekId) -> Result<Option<Gameweek>>;

    /// All gameweeks ordered by number
    async fn list_gameweeks(&self) -> Result<Vec<Gameweek>>;

    async fn active_gameweek(&self) -> Result<Option<Gameweek>>;

    /// Deactivate every gameweek, activate one and replenish every squad's
    /// free transfers, in a single write
    ///
    /// Returns `false` without writing when the gameweek is already active.
    /// Fails with `GameweekCompleted` for a completed gameweek.
    async fn activate_gameweek(&self, gameweek_id: GameweekId, rules: &RulesConfig)
        -> Result<bool>;

    async fn complete_gameweek(&self, gameweek_id: GameweekId) -> Result<()>;

    async fn list_performances(&self, gameweek_id: GameweekId) -> Result<Vec<PerformanceRecord>>;

    /// Insert or replace the record for (player, gameweek)
    async fn upsert_performance(&self, record: &PerformanceRecord) -> Result<()>;

    /// Insert or replace the score for (squad, gameweek)
    async fn upsert_period_score(&self, score: &PeriodScore) -> Result<()>;

    async fn get_period_score(
        &self,
        squad_id: SquadId,
        gameweek_id: GameweekId,
    ) -> Result<Option<PeriodScore>>;

    async fn list_period_scores(&self, squad_id: SquadId) -> Result<Vec<PeriodScore>>;

    async fn list_gameweek_scores(&self, gameweek_id: GameweekId) -> Result<Vec<PeriodScore>>;

    /// Record a chip play. Fails with `DuplicateChipUsage` when the
    /// (squad, chip, gameweek) triple already exists.
    async fn insert_chip_usage(&self, usage: &ChipUsage) -> Result<()>;

    async fn list_chip_usages(&self, squad_id: SquadId) -> Result<Vec<ChipUsage>>;

    async fn list_gameweek_chips(&self, gameweek_id: GameweekId) -> Result<Vec<ChipUsage>>;

    async fn list_transfers(
        &self,
        squad_id: SquadId,
        gameweek_id: GameweekId,
    ) -> Result<Vec<TransferRecord>>;

    async fn list_gameweek_transfers(&self, gameweek_id: GameweekId)
        -> Result<Vec<TransferRecord>>;

    async fn insert_league(&self, name: &str) -> Result<League>;

    async fn add_league_member(&self, league_id: LeagueId, squad_id: SquadId) -> Result<()>;

    /// Member squads of a league; `LeagueNotFound` for unknown leagues
    async fn list_league_members(&self, league_id: LeagueId) -> Result<Vec<SquadId>>;
}
