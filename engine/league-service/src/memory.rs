//! In-memory league store (tests, demos and the CLI's dry runs)

use crate::error::LeagueError;
use crate::models::{
    ChipUsage, Gameweek, GameweekId, League, LeagueId, NewSquad, PerformanceRecord, PeriodScore,
    Player, Squad, SquadId, SquadMembership, TransferRecord,
};
use crate::store::LeagueStore;
use crate::Result;
use squad_rules::{replenish_free_transfers, PlayerId, RulesConfig};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryState {
    players: HashMap<PlayerId, Player>,
    squads: BTreeMap<SquadId, Squad>,
    memberships: HashMap<SquadId, Vec<SquadMembership>>,
    gameweeks: BTreeMap<GameweekId, Gameweek>,
    performances: HashMap<(PlayerId, GameweekId), PerformanceRecord>,
    period_scores: BTreeMap<(SquadId, GameweekId), PeriodScore>,
    chip_usages: Vec<ChipUsage>,
    transfers: Vec<TransferRecord>,
    leagues: BTreeMap<LeagueId, League>,
    league_members: BTreeMap<LeagueId, BTreeSet<SquadId>>,
    next_id: i64,
}

impl MemoryState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// League store held entirely in memory
///
/// All state sits behind one lock, so every multi-entity write is atomic.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
    failing_score_writes: std::sync::Mutex<HashSet<SquadId>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make period-score writes for `squad_id` fail, to exercise the
    /// aggregator's per-squad failure handling
    pub fn fail_score_writes_for(&self, squad_id: SquadId) {
        if let Ok(mut failing) = self.failing_score_writes.lock() {
            failing.insert(squad_id);
        }
    }

    fn score_write_fails(&self, squad_id: SquadId) -> bool {
        self.failing_score_writes.lock().map(|f| f.contains(&squad_id)).unwrap_or(false)
    }
}

#[async_trait::async_trait]
impl LeagueStore for InMemoryStore {
    async fn upsert_player(&self, player: &Player) -> Result<()> {
        self.state.write().await.players.insert(player.id, player.clone());
        Ok(())
    }

    async fn get_player(&self, player_id: PlayerId) -> Result<Option<Player>> {
        Ok(self.state.read().await.players.get(&player_id).cloned())
    }

    async fn list_players(&self, player_ids: &[PlayerId]) -> Result<Vec<Player>> {
        let state = self.state.read().await;
        Ok(player_ids.iter().filter_map(|id| state.players.get(id).cloned()).collect())
    }

    async fn insert_squad(&self, squad: NewSquad) -> Result<Squad> {
        let mut state = self.state.write().await;
        if state.squads.values().any(|s| s.owner == squad.owner) {
            return Err(LeagueError::SquadAlreadyExists { owner: squad.owner });
        }

        let created = Squad {
            id: state.allocate_id(),
            owner: squad.owner,
            name: squad.name,
            budget: squad.budget,
            free_transfers: squad.free_transfers,
            total_points: 0,
        };
        state.squads.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_squad(&self, squad_id: SquadId) -> Result<Option<Squad>> {
        Ok(self.state.read().await.squads.get(&squad_id).cloned())
    }

    async fn list_squads(&self) -> Result<Vec<Squad>> {
        Ok(self.state.read().await.squads.values().cloned().collect())
    }

    async fn update_squad(&self, squad: &Squad) -> Result<()> {
        let mut state = self.state.write().await;
        let stored = state
            .squads
            .get_mut(&squad.id)
            .ok_or(LeagueError::SquadNotFound { squad_id: squad.id })?;
        stored.name = squad.name.clone();
        stored.budget = squad.budget;
        stored.free_transfers = squad.free_transfers;
        Ok(())
    }

    async fn refresh_total_points(&self, squad_id: SquadId) -> Result<i32> {
        let mut state = self.state.write().await;
        let total = state
            .period_scores
            .range((squad_id, GameweekId::MIN)..=(squad_id, GameweekId::MAX))
            .fold(0i32, |acc, (_, score)| acc.saturating_add(score.points));
        let stored =
            state.squads.get_mut(&squad_id).ok_or(LeagueError::SquadNotFound { squad_id })?;
        stored.total_points = total;
        Ok(total)
    }

    async fn list_memberships(&self, squad_id: SquadId) -> Result<Vec<SquadMembership>> {
        let state = self.state.read().await;
        let mut memberships = state.memberships.get(&squad_id).cloned().unwrap_or_default();
        memberships.sort_by_key(|m| m.slot);
        Ok(memberships)
    }

    async fn replace_roster(
        &self,
        squad_id: SquadId,
        memberships: &[SquadMembership],
    ) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.squads.contains_key(&squad_id) {
            return Err(LeagueError::SquadNotFound { squad_id });
        }
        state.memberships.insert(squad_id, memberships.to_vec());
        Ok(())
    }

    async fn apply_transfer(
        &self,
        squad: &Squad,
        memberships: &[SquadMembership],
        record: &TransferRecord,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let stored = state
            .squads
            .get_mut(&squad.id)
            .ok_or(LeagueError::SquadNotFound { squad_id: squad.id })?;
        stored.budget = squad.budget;
        stored.free_transfers = squad.free_transfers;
        state.memberships.insert(squad.id, memberships.to_vec());
        state.transfers.push(record.clone());
        Ok(())
    }

    async fn insert_gameweek(&self, number: i32) -> Result<Gameweek> {
        let mut state = self.state.write().await;
        if state.gameweeks.values().any(|g| g.number == number) {
            return Err(LeagueError::GameweekAlreadyExists { number });
        }
        let gameweek =
            Gameweek { id: state.allocate_id(), number, is_active: false, is_completed: false };
        state.gameweeks.insert(gameweek.id, gameweek.clone());
        Ok(gameweek)
    }

    async fn get_gameweek(&self, gameweek_id: GameweekId) -> Result<Option<Gameweek>> {
        Ok(self.state.read().await.gameweeks.get(&gameweek_id).cloned())
    }

    async fn list_gameweeks(&self) -> Result<Vec<Gameweek>> {
        let mut gameweeks: Vec<Gameweek> =
            self.state.read().await.gameweeks.values().cloned().collect();
        gameweeks.sort_by_key(|g| g.number);
        Ok(gameweeks)
    }

    async fn active_gameweek(&self) -> Result<Option<Gameweek>> {
        Ok(self.state.read().await.gameweeks.values().find(|g| g.is_active).cloned())
    }

    async fn activate_gameweek(
        &self,
        gameweek_id: GameweekId,
        rules: &RulesConfig,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        let target =
            state.gameweeks.get(&gameweek_id).ok_or(LeagueError::GameweekNotFound { gameweek_id })?;
        if target.is_completed {
            return Err(LeagueError::GameweekCompleted { gameweek_id });
        }
        if target.is_active {
            return Ok(false);
        }

        for gameweek in state.gameweeks.values_mut() {
            gameweek.is_active = gameweek.id == gameweek_id;
        }
        for squad in state.squads.values_mut() {
            squad.free_transfers = replenish_free_transfers(squad.free_transfers, rules);
        }
        Ok(true)
    }

    async fn complete_gameweek(&self, gameweek_id: GameweekId) -> Result<()> {
        let mut state = self.state.write().await;
        let gameweek = state
            .gameweeks
            .get_mut(&gameweek_id)
            .ok_or(LeagueError::GameweekNotFound { gameweek_id })?;
        gameweek.is_completed = true;
        Ok(())
    }

    async fn list_performances(&self, gameweek_id: GameweekId) -> Result<Vec<PerformanceRecord>> {
        let state = self.state.read().await;
        Ok(state
            .performances
            .values()
            .filter(|r| r.gameweek_id == gameweek_id)
            .cloned()
            .collect())
    }

    async fn upsert_performance(&self, record: &PerformanceRecord) -> Result<()> {
        self.state
            .write()
            .await
            .performances
            .insert((record.player_id, record.gameweek_id), record.clone());
        Ok(())
    }

    async fn upsert_period_score(&self, score: &PeriodScore) -> Result<()> {
        if self.score_write_fails(score.squad_id) {
            return Err(LeagueError::Internal {
                message: format!("score write failed for squad {}", score.squad_id),
            });
        }
        self.state
            .write()
            .await
            .period_scores
            .insert((score.squad_id, score.gameweek_id), score.clone());
        Ok(())
    }

    async fn get_period_score(
        &self,
        squad_id: SquadId,
        gameweek_id: GameweekId,
    ) -> Result<Option<PeriodScore>> {
        Ok(self.state.read().await.period_scores.get(&(squad_id, gameweek_id)).cloned())
    }

    async fn list_period_scores(&self, squad_id: SquadId) -> Result<Vec<PeriodScore>> {
        let state = self.state.read().await;
        Ok(state.period_scores.values().filter(|s| s.squad_id == squad_id).cloned().collect())
    }

    async fn list_gameweek_scores(&self, gameweek_id: GameweekId) -> Result<Vec<PeriodScore>> {
        let state = self.state.read().await;
        Ok(state
            .period_scores
            .values()
            .filter(|s| s.gameweek_id == gameweek_id)
            .cloned()
            .collect())
    }

    async fn insert_chip_usage(&self, usage: &ChipUsage) -> Result<()> {
        let mut state = self.state.write().await;
        let exists = state.chip_usages.iter().any(|u| {
            u.squad_id == usage.squad_id && u.chip == usage.chip && u.gameweek_id == usage.gameweek_id
        });
        if exists {
            return Err(LeagueError::DuplicateChipUsage {
                squad_id: usage.squad_id,
                chip: usage.chip,
                gameweek_id: usage.gameweek_id,
            });
        }
        state.chip_usages.push(usage.clone());
        Ok(())
    }

    async fn list_chip_usages(&self, squad_id: SquadId) -> Result<Vec<ChipUsage>> {
        let state = self.state.read().await;
        Ok(state.chip_usages.iter().filter(|u| u.squad_id == squad_id).cloned().collect())
    }

    async fn list_gameweek_chips(&self, gameweek_id: GameweekId) -> Result<Vec<ChipUsage>> {
        let state = self.state.read().await;
        Ok(state.chip_usages.iter().filter(|u| u.gameweek_id == gameweek_id).cloned().collect())
    }

    async fn list_transfers(
        &self,
        squad_id: SquadId,
        gameweek_id: GameweekId,
    ) -> Result<Vec<TransferRecord>> {
        let state = self.state.read().await;
        Ok(state
            .transfers
            .iter()
            .filter(|t| t.squad_id == squad_id && t.gameweek_id == gameweek_id)
            .cloned()
            .collect())
    }

    async fn list_gameweek_transfers(
        &self,
        gameweek_id: GameweekId,
    ) -> Result<Vec<TransferRecord>> {
        let state = self.state.read().await;
        Ok(state.transfers.iter().filter(|t| t.gameweek_id == gameweek_id).cloned().collect())
    }

    async fn insert_league(&self, name: &str) -> Result<League> {
        let mut state = self.state.write().await;
        let league = League { id: state.allocate_id(), name: name.to_string() };
        state.leagues.insert(league.id, league.clone());
        state.league_members.insert(league.id, BTreeSet::new());
        Ok(league)
    }

    async fn add_league_member(&self, league_id: LeagueId, squad_id: SquadId) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.squads.contains_key(&squad_id) {
            return Err(LeagueError::SquadNotFound { squad_id });
        }
        state
            .league_members
            .get_mut(&league_id)
            .ok_or(LeagueError::LeagueNotFound { league_id })?
            .insert(squad_id);
        Ok(())
    }

    async fn list_league_members(&self, league_id: LeagueId) -> Result<Vec<SquadId>> {
        let state = self.state.read().await;
        state
            .league_members
            .get(&league_id)
            .map(|members| members.iter().copied().collect())
            .ok_or(LeagueError::LeagueNotFound { league_id })
    }
}
