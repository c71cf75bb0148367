//! LeagueService - squad management, gameweek lifecycle and scoring
//!
//! Every roster mutation runs the pure rules first and writes only when they
//! pass. Mutations of one squad are serialized through a per-squad mutex;
//! cross-process safety comes from the store's transactions.

use crate::aggregator::{AggregationSummary, ScoreAggregator};
use crate::config::LeagueServiceConfig;
use crate::error::LeagueError;
use crate::leaderboard::{rank_squads, LeaderboardEntry, LeaderboardScope};
use crate::models::{
    roster_entries, ChipUsage, Gameweek, GameweekId, League, LeagueId, NewSquad, PerformanceEntry,
    PerformanceRecord, Player, Squad, SquadId, SquadMembership, SquadSelection, TransferRecord,
};
use crate::postgres::PgStore;
use crate::store::LeagueStore;
use crate::Result;
use chrono::Utc;
use dashmap::DashMap;
use squad_rules::{
    can_use_chip, score_performance, total_spend, transfer_cost,
    validate_bench_swap, validate_squad, validate_transfer, ChipType, PlayerId, Position, Price,
    RawStats, RosterEntry, RulesConfig, ScoreResult, SquadValidation, TransferCheck,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Orchestrates the league rules over a [`LeagueStore`]
pub struct LeagueService {
    store: Arc<dyn LeagueStore>,
    rules: RulesConfig,
    aggregator: ScoreAggregator,
    squad_locks: DashMap<SquadId, Arc<Mutex<()>>>,
    /// Held for writing while a gameweek activates, for reading by transfers
    gameweek_lock: RwLock<()>,
}

impl LeagueService {
    pub fn new(store: Arc<dyn LeagueStore>, rules: RulesConfig) -> Self {
        Self {
            aggregator: ScoreAggregator::new(store.clone()),
            store,
            rules,
            squad_locks: DashMap::new(),
            gameweek_lock: RwLock::new(()),
        }
    }

    /// Connect to PostgreSQL, run migrations and build the service
    pub async fn connect(config: &LeagueServiceConfig) -> Result<Self> {
        config.validate()?;
        let store = PgStore::connect(&config.database).await?;
        Ok(Self::new(Arc::new(store), config.rules.clone()))
    }

    pub fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    pub fn store(&self) -> &Arc<dyn LeagueStore> {
        &self.store
    }

    fn squad_lock(&self, squad_id: SquadId) -> Arc<Mutex<()>> {
        self.squad_locks.entry(squad_id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    pub fn validate_squad(&self, roster: &[RosterEntry], budget: Price) -> SquadValidation {
        validate_squad(roster, budget, &self.rules)
    }

    pub fn validate_transfer(
        &self,
        out_position: Position,
        in_position: Position,
        roster: &[RosterEntry],
    ) -> TransferCheck {
        validate_transfer(out_position, in_position, roster)
    }

    pub fn score_performance(&self, position: Position, stats: &RawStats) -> ScoreResult {
        score_performance(position, stats)
    }

    /// Add or update a catalog player
    pub async fn upsert_player(&self, player: &Player) -> Result<()> {
        if player.price.is_negative() {
            return Err(LeagueError::rejected(format!(
                "Player {} price cannot be negative",
                player.id
            )));
        }
        self.store.upsert_player(player).await
    }

    /// Create an empty squad with the default budget and transfer allotment
    pub async fn create_squad(&self, owner: &str, name: &str) -> Result<Squad> {
        let squad = self
            .store
            .insert_squad(NewSquad {
                owner: owner.to_string(),
                name: name.to_string(),
                budget: self.rules.default_budget,
                free_transfers: self.rules.free_transfers_per_period,
            })
            .await?;
        info!(squad_id = squad.id, owner, "created squad");
        Ok(squad)
    }

    async fn load_squad(&self, squad_id: SquadId) -> Result<Squad> {
        self.store.get_squad(squad_id).await?.ok_or(LeagueError::SquadNotFound { squad_id })
    }

    /// Load players by id, failing on the first unknown one
    async fn load_players(&self, player_ids: &[PlayerId]) -> Result<HashMap<PlayerId, Player>> {
        let players: HashMap<PlayerId, Player> = self
            .store
            .list_players(player_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        match player_ids.iter().find(|id| !players.contains_key(id)) {
            Some(&player_id) => Err(LeagueError::PlayerNotFound { player_id }),
            None => Ok(players),
        }
    }

    async fn load_roster(
        &self,
        squad_id: SquadId,
    ) -> Result<(Vec<SquadMembership>, HashMap<PlayerId, Player>)> {
        let memberships = self.store.list_memberships(squad_id).await?;
        let ids: Vec<PlayerId> = memberships.iter().map(|m| m.player_id).collect();
        let players = self.load_players(&ids).await?;
        Ok((memberships, players))
    }

    /// Current roster of a squad with positions and prices
    pub async fn squad_roster(&self, squad_id: SquadId) -> Result<Vec<RosterEntry>> {
        self.load_squad(squad_id).await?;
        let (memberships, players) = self.load_roster(squad_id).await?;
        Ok(roster_entries(&memberships, &players))
    }

    /// Validate and store a full roster
    ///
    /// Any rule violation returns `Rejected` with every reason and leaves
    /// the stored roster untouched.
    pub async fn save_squad(
        &self,
        squad_id: SquadId,
        selections: &[SquadSelection],
    ) -> Result<SquadValidation> {
        let lock = self.squad_lock(squad_id);
        let _guard = lock.lock().await;

        let squad = self.load_squad(squad_id).await?;
        let ids: Vec<PlayerId> = selections.iter().map(|s| s.player_id).collect();
        let players = self.load_players(&ids).await?;

        let memberships: Vec<SquadMembership> = selections
            .iter()
            .enumerate()
            .map(|(slot, s)| SquadMembership {
                squad_id,
                player_id: s.player_id,
                is_captain: s.is_captain,
                is_on_bench: s.is_on_bench,
                slot: slot as u8,
            })
            .collect();

        let roster = roster_entries(&memberships, &players);
        let validation = validate_squad(&roster, squad.budget, &self.rules);
        if !validation.is_valid {
            warn!(squad_id, errors = ?validation.errors, "squad save rejected");
            return Err(LeagueError::Rejected { reasons: validation.errors });
        }

        self.store.replace_roster(squad_id, &memberships).await?;
        info!(squad_id, spend = %total_spend(&roster), "saved squad");
        Ok(validation)
    }

    /// Replace one player during the active gameweek
    ///
    /// The incoming player takes the outgoing player's slot, including its
    /// bench and captain flags. Transfers beyond the free allotment cost
    /// `transfer_penalty_points`, charged against this gameweek's score.
    pub async fn execute_transfer(
        &self,
        squad_id: SquadId,
        player_out: PlayerId,
        player_in: PlayerId,
    ) -> Result<TransferRecord> {
        let _activation = self.gameweek_lock.read().await;
        let lock = self.squad_lock(squad_id);
        let _guard = lock.lock().await;

        let gameweek = self.store.active_gameweek().await?.ok_or(LeagueError::NoActiveGameweek)?;
        if gameweek.is_completed {
            return Err(LeagueError::GameweekCompleted { gameweek_id: gameweek.id });
        }

        let mut squad = self.load_squad(squad_id).await?;
        let (mut memberships, players) = self.load_roster(squad_id).await?;

        let slot = memberships
            .iter()
            .position(|m| m.player_id == player_out)
            .ok_or_else(|| LeagueError::rejected(format!("Player {player_out} is not in the squad")))?;
        if memberships.iter().any(|m| m.player_id == player_in) {
            return Err(LeagueError::rejected(format!("Player {player_in} is already in the squad")));
        }

        let incoming = self
            .store
            .get_player(player_in)
            .await?
            .ok_or(LeagueError::PlayerNotFound { player_id: player_in })?;
        let outgoing =
            players.get(&player_out).ok_or(LeagueError::PlayerNotFound { player_id: player_out })?;

        let roster = roster_entries(&memberships, &players);

        // The bench slot does not count toward the starting formation
        if !memberships[slot].is_on_bench {
            let check = validate_transfer(outgoing.position, incoming.position, &roster);
            if !check.can_transfer {
                let reason = check.reason.unwrap_or_else(|| "Transfer not allowed".to_string());
                warn!(squad_id, player_out, player_in, %reason, "transfer rejected");
                return Err(LeagueError::rejected(reason));
            }
        }

        let spend = total_spend(&roster) - outgoing.price + incoming.price;
        if spend > squad.budget {
            warn!(squad_id, player_out, player_in, %spend, "transfer over budget");
            return Err(LeagueError::rejected(format!(
                "Squad cost {spend} exceeds budget {}",
                squad.budget
            )));
        }

        let cost = transfer_cost(squad.free_transfers, &self.rules);
        squad.free_transfers = cost.remaining_free_transfers;
        memberships[slot].player_id = player_in;

        let record = TransferRecord {
            squad_id,
            player_out,
            player_in,
            gameweek_id: gameweek.id,
            point_cost: cost.point_cost,
            created_at: Utc::now(),
        };
        self.store.apply_transfer(&squad, &memberships, &record).await?;

        info!(
            squad_id,
            player_out,
            player_in,
            gameweek = gameweek.number,
            point_cost = cost.point_cost,
            free_transfers = squad.free_transfers,
            "executed transfer"
        );
        Ok(record)
    }

    /// Swap a starter with the bench player
    pub async fn swap_bench(&self, squad_id: SquadId, starter: PlayerId) -> Result<()> {
        let lock = self.squad_lock(squad_id);
        let _guard = lock.lock().await;

        self.load_squad(squad_id).await?;
        let (mut memberships, players) = self.load_roster(squad_id).await?;

        let starter_idx = memberships
            .iter()
            .position(|m| m.player_id == starter && !m.is_on_bench)
            .ok_or_else(|| LeagueError::rejected(format!("Player {starter} is not a starter")))?;
        if memberships[starter_idx].is_captain {
            return Err(LeagueError::rejected("Captain cannot be moved to the bench"));
        }
        let bench_idx = memberships
            .iter()
            .position(|m| m.is_on_bench)
            .ok_or_else(|| LeagueError::rejected("Squad has no bench player"))?;

        let position_of = |idx: usize| {
            let player_id = memberships[idx].player_id;
            players
                .get(&player_id)
                .map(|p| p.position)
                .ok_or(LeagueError::PlayerNotFound { player_id })
        };
        let starter_position = position_of(starter_idx)?;
        let bench_position = position_of(bench_idx)?;

        let roster = roster_entries(&memberships, &players);
        let check = validate_bench_swap(starter_position, bench_position, &roster);
        if !check.can_transfer {
            let reason = check.reason.unwrap_or_else(|| "Bench swap not allowed".to_string());
            warn!(squad_id, starter, %reason, "bench swap rejected");
            return Err(LeagueError::rejected(reason));
        }

        memberships[starter_idx].is_on_bench = true;
        memberships[bench_idx].is_on_bench = false;
        self.store.replace_roster(squad_id, &memberships).await?;

        debug!(squad_id, starter, "swapped bench");
        Ok(())
    }

    /// Make a starter the captain
    pub async fn set_captain(&self, squad_id: SquadId, player_id: PlayerId) -> Result<()> {
        let lock = self.squad_lock(squad_id);
        let _guard = lock.lock().await;

        self.load_squad(squad_id).await?;
        let mut memberships = self.store.list_memberships(squad_id).await?;

        match memberships.iter().find(|m| m.player_id == player_id) {
            None => {
                return Err(LeagueError::rejected(format!("Player {player_id} is not in the squad")))
            }
            Some(m) if m.is_on_bench => {
                return Err(LeagueError::rejected("Captain cannot be on the bench"))
            }
            Some(_) => {}
        }

        for member in memberships.iter_mut() {
            member.is_captain = member.player_id == player_id;
        }
        self.store.replace_roster(squad_id, &memberships).await?;

        debug!(squad_id, player_id, "set captain");
        Ok(())
    }

    /// Most recent gameweek number in which the squad played `chip`,
    /// ignoring `exclude`
    async fn last_chip_use(
        &self,
        squad_id: SquadId,
        chip: ChipType,
        exclude: Option<GameweekId>,
    ) -> Result<Option<i32>> {
        Ok(self
            .store
            .list_chip_usages(squad_id)
            .await?
            .iter()
            .filter(|u| u.chip == chip && Some(u.gameweek_id) != exclude)
            .map(|u| u.gameweek_number)
            .max())
    }

    /// Play a chip in the active gameweek
    pub async fn activate_chip(&self, squad_id: SquadId, chip: ChipType) -> Result<ChipUsage> {
        let lock = self.squad_lock(squad_id);
        let _guard = lock.lock().await;

        let gameweek = self.store.active_gameweek().await?.ok_or(LeagueError::NoActiveGameweek)?;
        if gameweek.is_completed {
            return Err(LeagueError::GameweekCompleted { gameweek_id: gameweek.id });
        }
        self.load_squad(squad_id).await?;

        // A repeat in the same gameweek is left to storage to reject as a duplicate
        let last = self.last_chip_use(squad_id, chip, Some(gameweek.id)).await?;
        let cooldown = self.rules.chip_cooldown_periods;
        if let Some(last) = last {
            if !can_use_chip(Some(last), gameweek.number, cooldown) {
                warn!(squad_id, %chip, last, gameweek = gameweek.number, "chip on cooldown");
                return Err(LeagueError::ChipOnCooldown { chip, available_from: last + cooldown });
            }
        }

        let usage = ChipUsage {
            squad_id,
            chip,
            gameweek_id: gameweek.id,
            gameweek_number: gameweek.number,
            used_at: Utc::now(),
        };
        self.store.insert_chip_usage(&usage).await?;

        info!(squad_id, %chip, gameweek = gameweek.number, "activated chip");
        Ok(usage)
    }

    /// Whether the squad may play `chip` in gameweek number `target_number`
    pub async fn can_use_chip(
        &self,
        squad_id: SquadId,
        chip: ChipType,
        target_number: i32,
    ) -> Result<bool> {
        self.load_squad(squad_id).await?;
        let last = self.last_chip_use(squad_id, chip, None).await?;
        Ok(can_use_chip(last, target_number, self.rules.chip_cooldown_periods))
    }

    pub async fn create_gameweek(&self, number: i32) -> Result<Gameweek> {
        let gameweek = self.store.insert_gameweek(number).await?;
        info!(gameweek_id = gameweek.id, number, "created gameweek");
        Ok(gameweek)
    }

    async fn load_gameweek(&self, gameweek_id: GameweekId) -> Result<Gameweek> {
        self.store
            .get_gameweek(gameweek_id)
            .await?
            .ok_or(LeagueError::GameweekNotFound { gameweek_id })
    }

    /// Make `gameweek_id` the only active gameweek and replenish free
    /// transfers for every squad
    ///
    /// The store applies both in one atomic write. Re-activating the
    /// gameweek that is already active changes nothing.
    pub async fn set_active_period(&self, gameweek_id: GameweekId) -> Result<Gameweek> {
        let _activation = self.gameweek_lock.write().await;

        let gameweek = self.load_gameweek(gameweek_id).await?;
        if gameweek.is_completed {
            return Err(LeagueError::GameweekCompleted { gameweek_id });
        }

        if self.store.activate_gameweek(gameweek_id, &self.rules).await? {
            info!(gameweek_id, number = gameweek.number, "activated gameweek");
        } else {
            debug!(gameweek_id, "gameweek already active");
        }
        Ok(Gameweek { is_active: true, ..gameweek })
    }

    /// Score and store a batch of performances, then aggregate the gameweek
    ///
    /// Every player must exist before anything is written.
    pub async fn submit_performances(
        &self,
        gameweek_id: GameweekId,
        entries: &[PerformanceEntry],
    ) -> Result<AggregationSummary> {
        let gameweek = self.load_gameweek(gameweek_id).await?;
        if gameweek.is_completed {
            return Err(LeagueError::GameweekCompleted { gameweek_id });
        }

        let ids: Vec<PlayerId> = entries.iter().map(|e| e.player_id).collect();
        let players = self.load_players(&ids).await?;

        for entry in entries {
            let position = players
                .get(&entry.player_id)
                .map(|p| p.position)
                .ok_or(LeagueError::PlayerNotFound { player_id: entry.player_id })?;
            let scored = score_performance(position, &entry.stats);
            self.store
                .upsert_performance(&PerformanceRecord {
                    player_id: entry.player_id,
                    gameweek_id,
                    stats: entry.stats.clone(),
                    points: scored.points,
                })
                .await?;
        }

        info!(gameweek_id, performances = entries.len(), "stored performances");
        self.aggregator.aggregate_gameweek(gameweek_id).await
    }

    /// Recompute period scores and totals for a gameweek
    pub async fn aggregate_gameweek(&self, gameweek_id: GameweekId) -> Result<AggregationSummary> {
        self.aggregator.aggregate_gameweek(gameweek_id).await
    }

    /// Final aggregation, then mark the gameweek completed
    pub async fn complete_gameweek(&self, gameweek_id: GameweekId) -> Result<AggregationSummary> {
        self.load_gameweek(gameweek_id).await?;
        let summary = self.aggregator.aggregate_gameweek(gameweek_id).await?;
        self.store.complete_gameweek(gameweek_id).await?;
        info!(gameweek_id, "completed gameweek");
        Ok(summary)
    }

    pub async fn create_league(&self, name: &str) -> Result<League> {
        let league = self.store.insert_league(name).await?;
        info!(league_id = league.id, name, "created league");
        Ok(league)
    }

    pub async fn join_league(&self, league_id: LeagueId, squad_id: SquadId) -> Result<()> {
        self.store.add_league_member(league_id, squad_id).await
    }

    /// Rank every squad
    pub async fn leaderboard(&self, scope: LeaderboardScope) -> Result<Vec<LeaderboardEntry>> {
        let squads = self.store.list_squads().await?;
        self.rank(squads, scope).await
    }

    /// Rank the members of one league
    pub async fn league_leaderboard(
        &self,
        league_id: LeagueId,
        scope: LeaderboardScope,
    ) -> Result<Vec<LeaderboardEntry>> {
        let members: HashSet<SquadId> =
            self.store.list_league_members(league_id).await?.into_iter().collect();
        let squads: Vec<Squad> = self
            .store
            .list_squads()
            .await?
            .into_iter()
            .filter(|s| members.contains(&s.id))
            .collect();
        self.rank(squads, scope).await
    }

    async fn rank(&self, squads: Vec<Squad>, scope: LeaderboardScope) -> Result<Vec<LeaderboardEntry>> {
        let points: HashMap<SquadId, i32> = match scope {
            LeaderboardScope::AllTime => squads.iter().map(|s| (s.id, s.total_points)).collect(),
            LeaderboardScope::Gameweek(gameweek_id) => {
                self.load_gameweek(gameweek_id).await?;
                self.store
                    .list_gameweek_scores(gameweek_id)
                    .await?
                    .into_iter()
                    .map(|s| (s.squad_id, s.points))
                    .collect()
            }
        };
        Ok(rank_squads(&squads, &points))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;

    const A: PlayerId = 1;
    const B: PlayerId = 2;
    const C: PlayerId = 3;
    const D: PlayerId = 4;
    const E: PlayerId = 5;
    const F: PlayerId = 6;
    const G: PlayerId = 7;
    const H: PlayerId = 8;
    const I: PlayerId = 9;

    fn player(id: PlayerId, position: Position, tenths: i64) -> Player {
        Player {
            id,
            name: format!("Player {id}"),
            position,
            price: Price::from_tenths(tenths),
            is_in_form: false,
        }
    }

    async fn service_with(store: Arc<InMemoryStore>) -> LeagueService {
        let service = LeagueService::new(store, RulesConfig::default());
        let catalog = [
            player(A, Position::Defender, 50),
            player(B, Position::Midfielder, 50),
            player(C, Position::Midfielder, 50),
            player(D, Position::Forward, 50),
            player(E, Position::Forward, 50),
            player(F, Position::Midfielder, 50),
            player(G, Position::Defender, 50),
            player(H, Position::Forward, 300),
            player(I, Position::Midfielder, 50),
        ];
        for p in &catalog {
            service.upsert_player(p).await.unwrap();
        }
        service
    }

    async fn service() -> LeagueService {
        service_with(Arc::new(InMemoryStore::new())).await
    }

    fn select(player_id: PlayerId) -> SquadSelection {
        SquadSelection { player_id, is_on_bench: false, is_captain: false }
    }

    /// D A (captain), M B, M C, F D, F E | bench M F
    fn reference_selections() -> Vec<SquadSelection> {
        vec![
            SquadSelection { is_captain: true, ..select(A) },
            select(B),
            select(C),
            select(D),
            select(E),
            SquadSelection { is_on_bench: true, ..select(F) },
        ]
    }

    async fn saved_squad(service: &LeagueService, owner: &str) -> Squad {
        let squad = service.create_squad(owner, &format!("{owner} FC")).await.unwrap();
        service.save_squad(squad.id, &reference_selections()).await.unwrap();
        squad
    }

    async fn active_gameweek(service: &LeagueService, number: i32) -> Gameweek {
        let gameweek = service.create_gameweek(number).await.unwrap();
        service.set_active_period(gameweek.id).await.unwrap()
    }

    fn entry(player_id: PlayerId, stats: RawStats) -> PerformanceEntry {
        PerformanceEntry { player_id, stats }
    }

    /// Defender A: goal 6 + assist 3 + one day played 1 = 10
    fn captain_ten() -> PerformanceEntry {
        entry(A, RawStats { goals: 1, assists: 1, days_played: 1, ..Default::default() })
    }

    #[tokio::test]
    async fn test_reference_squad_saves() {
        let service = service().await;
        let squad = service.create_squad("ana", "Ana FC").await.unwrap();
        assert_eq!(squad.budget, Price::from_millions(50));

        let validation = service.save_squad(squad.id, &reference_selections()).await.unwrap();
        assert!(validation.is_valid);
        assert!(validation.is_locked(A));
        assert!(!validation.is_locked(B));

        let roster = service.squad_roster(squad.id).await.unwrap();
        assert_eq!(roster.len(), 6);
        assert_eq!(total_spend(&roster), Price::from_millions(30));
    }

    #[tokio::test]
    async fn test_rejected_save_writes_nothing() {
        let service = service().await;
        let squad = saved_squad(&service, "ana").await;

        let mut selections = reference_selections();
        selections[0] = select(G);
        selections[1].is_on_bench = true;

        let err = service.save_squad(squad.id, &selections).await.unwrap_err();
        match err {
            LeagueError::Rejected { reasons } => {
                assert!(reasons.iter().any(|r| r.contains("bench player required")));
            }
            other => panic!("expected rejection, got {other:?}"),
        }

        let stored = service.store().list_memberships(squad.id).await.unwrap();
        assert_eq!(stored.iter().map(|m| m.player_id).collect::<Vec<_>>(), vec![A, B, C, D, E, F]);
    }

    #[tokio::test]
    async fn test_save_with_unknown_player() {
        let service = service().await;
        let squad = service.create_squad("ana", "Ana FC").await.unwrap();
        let mut selections = reference_selections();
        selections[2] = select(99);

        let err = service.save_squad(squad.id, &selections).await.unwrap_err();
        assert!(matches!(err, LeagueError::PlayerNotFound { player_id: 99 }));
    }

    #[tokio::test]
    async fn test_transfer_requires_active_gameweek() {
        let service = service().await;
        let squad = saved_squad(&service, "ana").await;

        let err = service.execute_transfer(squad.id, B, I).await.unwrap_err();
        assert!(matches!(err, LeagueError::NoActiveGameweek));
    }

    #[tokio::test]
    async fn test_transfer_keeps_slot_flags() {
        let service = service().await;
        let squad = saved_squad(&service, "ana").await;
        active_gameweek(&service, 1).await;

        service.execute_transfer(squad.id, A, G).await.unwrap();

        let roster = service.squad_roster(squad.id).await.unwrap();
        assert_eq!(roster[0].player_id, G);
        assert!(roster[0].is_captain);
        assert!(!roster.iter().any(|e| e.player_id == A));
    }

    #[tokio::test]
    async fn test_transfer_of_locked_position_rejected() {
        let service = service().await;
        let squad = saved_squad(&service, "ana").await;
        let gameweek = active_gameweek(&service, 1).await;

        let err = service.execute_transfer(squad.id, A, I).await.unwrap_err();
        match err {
            LeagueError::Rejected { reasons } => assert!(reasons[0].contains("only Defender")),
            other => panic!("expected rejection, got {other:?}"),
        }
        assert!(service.store().list_transfers(squad.id, gameweek.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bench_transfer_skips_formation_check() {
        let service = service().await;
        let squad = service.create_squad("ana", "Ana FC").await.unwrap();
        // D A (captain, the only starting Defender) ... | bench D G
        let mut selections = reference_selections();
        selections[5] = SquadSelection { is_on_bench: true, ..select(G) };
        let validation = service.save_squad(squad.id, &selections).await.unwrap();
        assert!(validation.is_locked(A));
        let gameweek = active_gameweek(&service, 1).await;

        let before = service.squad_roster(squad.id).await.unwrap();
        assert!(
            !service.validate_transfer(Position::Defender, Position::Midfielder, &before).can_transfer
        );

        let record = service.execute_transfer(squad.id, G, I).await.unwrap();
        assert_eq!(record.point_cost, 0);
        assert_eq!(record.gameweek_id, gameweek.id);

        let after = service.squad_roster(squad.id).await.unwrap();
        assert_eq!(after[5].player_id, I);
        assert!(after[5].is_on_bench);
        assert_eq!(&after[..5], &before[..5]);
    }

    #[tokio::test]
    async fn test_transfer_over_budget_rejected() {
        let service = service().await;
        let squad = saved_squad(&service, "ana").await;
        active_gameweek(&service, 1).await;

        let err = service.execute_transfer(squad.id, D, H).await.unwrap_err();
        assert!(err.is_rejection());
        assert!(err.to_string().contains("exceeds budget"));
    }

    #[tokio::test]
    async fn test_transfer_rejects_players_already_in_squad() {
        let service = service().await;
        let squad = saved_squad(&service, "ana").await;
        active_gameweek(&service, 1).await;

        assert!(service.execute_transfer(squad.id, B, C).await.unwrap_err().is_rejection());
        assert!(service.execute_transfer(squad.id, I, B).await.unwrap_err().is_rejection());
    }

    #[tokio::test]
    async fn test_transfer_penalty_reduces_net_points() {
        let service = service().await;
        let squad = saved_squad(&service, "ana").await;
        let gameweek = active_gameweek(&service, 1).await;

        // Activation tops the allotment up to the cap of two
        assert_eq!(service.store().get_squad(squad.id).await.unwrap().unwrap().free_transfers, 2);

        assert_eq!(service.execute_transfer(squad.id, B, I).await.unwrap().point_cost, 0);
        assert_eq!(service.execute_transfer(squad.id, I, B).await.unwrap().point_cost, 0);
        let third = service.execute_transfer(squad.id, B, I).await.unwrap();
        assert_eq!(third.point_cost, 4);

        service.submit_performances(gameweek.id, &[captain_ten()]).await.unwrap();

        let score = service.store().get_period_score(squad.id, gameweek.id).await.unwrap().unwrap();
        assert_eq!(score.gross_points, 20);
        assert_eq!(score.transfer_cost, 4);
        assert_eq!(score.points, 16);
        assert_eq!(service.store().get_squad(squad.id).await.unwrap().unwrap().total_points, 16);
    }

    #[tokio::test]
    async fn test_free_transfers_capped_on_activation() {
        let service = service().await;
        let squad = saved_squad(&service, "ana").await;

        for number in 1..=3 {
            active_gameweek(&service, number).await;
        }
        let stored = service.store().get_squad(squad.id).await.unwrap().unwrap();
        assert_eq!(stored.free_transfers, 2);
    }

    #[tokio::test]
    async fn test_concurrent_activation_replenishes_once() {
        let service = service().await;
        let squad = saved_squad(&service, "ana").await;
        active_gameweek(&service, 1).await;
        service.execute_transfer(squad.id, B, I).await.unwrap();
        service.execute_transfer(squad.id, I, B).await.unwrap();
        assert_eq!(service.store().get_squad(squad.id).await.unwrap().unwrap().free_transfers, 0);

        let gw2 = service.create_gameweek(2).await.unwrap();
        let (first, second) =
            tokio::join!(service.set_active_period(gw2.id), service.set_active_period(gw2.id));
        assert!(first.unwrap().is_active);
        assert!(second.unwrap().is_active);

        let stored = service.store().get_squad(squad.id).await.unwrap().unwrap();
        assert_eq!(stored.free_transfers, 1);
    }

    #[tokio::test]
    async fn test_swap_bench() {
        let service = service().await;
        let squad = saved_squad(&service, "ana").await;

        service.swap_bench(squad.id, B).await.unwrap();
        let roster = service.squad_roster(squad.id).await.unwrap();
        assert!(roster.iter().find(|e| e.player_id == B).unwrap().is_on_bench);
        assert!(!roster.iter().find(|e| e.player_id == F).unwrap().is_on_bench);

        let captain = service.swap_bench(squad.id, A).await.unwrap_err();
        assert!(captain.to_string().contains("Captain"));
    }

    #[tokio::test]
    async fn test_swap_bench_keeps_formation() {
        let service = service().await;
        let squad = saved_squad(&service, "ana").await;
        service.set_captain(squad.id, B).await.unwrap();

        let err = service.swap_bench(squad.id, A).await.unwrap_err();
        assert!(err.to_string().contains("only Defender"));
    }

    #[tokio::test]
    async fn test_set_captain() {
        let service = service().await;
        let squad = saved_squad(&service, "ana").await;

        service.set_captain(squad.id, D).await.unwrap();
        let roster = service.squad_roster(squad.id).await.unwrap();
        let captains: Vec<PlayerId> =
            roster.iter().filter(|e| e.is_captain).map(|e| e.player_id).collect();
        assert_eq!(captains, vec![D]);

        assert!(service.set_captain(squad.id, F).await.unwrap_err().is_rejection());
        assert!(service.set_captain(squad.id, H).await.unwrap_err().is_rejection());
    }

    #[tokio::test]
    async fn test_captain_doubled() {
        let service = service().await;
        let squad = saved_squad(&service, "ana").await;
        let gameweek = active_gameweek(&service, 1).await;

        service.submit_performances(gameweek.id, &[captain_ten()]).await.unwrap();
        let score = service.store().get_period_score(squad.id, gameweek.id).await.unwrap().unwrap();
        assert_eq!(score.points, 20);
    }

    #[tokio::test]
    async fn test_triple_captain() {
        let service = service().await;
        let squad = saved_squad(&service, "ana").await;
        let gameweek = active_gameweek(&service, 1).await;

        service.activate_chip(squad.id, ChipType::TripleCaptain).await.unwrap();
        service.submit_performances(gameweek.id, &[captain_ten()]).await.unwrap();

        let score = service.store().get_period_score(squad.id, gameweek.id).await.unwrap().unwrap();
        assert_eq!(score.points, 30);
        assert!(score.triple_captain);
    }

    #[tokio::test]
    async fn test_bench_boost_counts_bench_player() {
        let service = service().await;
        let boosted = saved_squad(&service, "ana").await;
        let plain = saved_squad(&service, "bo").await;
        let gameweek = active_gameweek(&service, 1).await;

        service.activate_chip(boosted.id, ChipType::BenchBoost).await.unwrap();
        let motm = entry(F, RawStats { is_motm: true, ..Default::default() });
        service.submit_performances(gameweek.id, &[motm]).await.unwrap();

        let boosted_score =
            service.store().get_period_score(boosted.id, gameweek.id).await.unwrap().unwrap();
        let plain_score =
            service.store().get_period_score(plain.id, gameweek.id).await.unwrap().unwrap();
        assert_eq!(boosted_score.points, 3);
        assert_eq!(plain_score.points, 0);
    }

    #[tokio::test]
    async fn test_chip_cooldown() {
        let service = service().await;
        let squad = saved_squad(&service, "ana").await;

        let mut gameweeks = Vec::new();
        for number in 1..=10 {
            gameweeks.push(service.create_gameweek(number).await.unwrap());
        }

        service.set_active_period(gameweeks[2].id).await.unwrap();
        service.activate_chip(squad.id, ChipType::BenchBoost).await.unwrap();

        let dup = service.activate_chip(squad.id, ChipType::BenchBoost).await.unwrap_err();
        assert!(matches!(dup, LeagueError::DuplicateChipUsage { .. }));

        service.set_active_period(gameweeks[3].id).await.unwrap();
        let err = service.activate_chip(squad.id, ChipType::BenchBoost).await.unwrap_err();
        assert!(matches!(err, LeagueError::ChipOnCooldown { available_from: 10, .. }));

        // Other chips are tracked separately
        service.activate_chip(squad.id, ChipType::TripleCaptain).await.unwrap();

        assert!(!service.can_use_chip(squad.id, ChipType::BenchBoost, 9).await.unwrap());
        assert!(service.can_use_chip(squad.id, ChipType::BenchBoost, 10).await.unwrap());

        service.set_active_period(gameweeks[9].id).await.unwrap();
        service.activate_chip(squad.id, ChipType::BenchBoost).await.unwrap();
    }

    #[tokio::test]
    async fn test_chip_requires_active_gameweek() {
        let service = service().await;
        let squad = saved_squad(&service, "ana").await;
        let err = service.activate_chip(squad.id, ChipType::BenchBoost).await.unwrap_err();
        assert!(matches!(err, LeagueError::NoActiveGameweek));
    }

    #[tokio::test]
    async fn test_aggregation_is_idempotent() {
        let service = service().await;
        let squad = saved_squad(&service, "ana").await;
        let gameweek = active_gameweek(&service, 1).await;

        service.submit_performances(gameweek.id, &[captain_ten()]).await.unwrap();
        let first = service.store().get_period_score(squad.id, gameweek.id).await.unwrap();

        service.aggregate_gameweek(gameweek.id).await.unwrap();
        service.aggregate_gameweek(gameweek.id).await.unwrap();

        let again = service.store().get_period_score(squad.id, gameweek.id).await.unwrap();
        assert_eq!(first, again);
        assert_eq!(service.store().get_squad(squad.id).await.unwrap().unwrap().total_points, 20);
    }

    #[tokio::test]
    async fn test_totals_sum_across_gameweeks() {
        let service = service().await;
        let squad = saved_squad(&service, "ana").await;

        let gw1 = active_gameweek(&service, 1).await;
        service.submit_performances(gw1.id, &[captain_ten()]).await.unwrap();
        service.complete_gameweek(gw1.id).await.unwrap();

        let gw2 = active_gameweek(&service, 2).await;
        let goal = entry(D, RawStats { goals: 1, ..Default::default() });
        service.submit_performances(gw2.id, &[goal]).await.unwrap();

        assert_eq!(service.store().get_squad(squad.id).await.unwrap().unwrap().total_points, 25);
    }

    #[tokio::test]
    async fn test_concurrent_gameweek_aggregations_keep_total() {
        let service = service().await;
        let squad = saved_squad(&service, "ana").await;

        let gw1 = active_gameweek(&service, 1).await;
        service.submit_performances(gw1.id, &[captain_ten()]).await.unwrap();
        let gw2 = active_gameweek(&service, 2).await;
        let goal = entry(D, RawStats { goals: 1, ..Default::default() });
        service.submit_performances(gw2.id, &[goal]).await.unwrap();

        for _ in 0..3 {
            let (a, b) = tokio::join!(
                service.aggregate_gameweek(gw1.id),
                service.aggregate_gameweek(gw2.id)
            );
            assert!(a.unwrap().is_complete());
            assert!(b.unwrap().is_complete());
            let stored = service.store().get_squad(squad.id).await.unwrap().unwrap();
            assert_eq!(stored.total_points, 25);
        }
    }

    #[tokio::test]
    async fn test_submit_unknown_player_writes_nothing() {
        let service = service().await;
        let gameweek = active_gameweek(&service, 1).await;

        let err = service
            .submit_performances(gameweek.id, &[captain_ten(), entry(99, RawStats::default())])
            .await
            .unwrap_err();
        assert!(matches!(err, LeagueError::PlayerNotFound { player_id: 99 }));
        assert!(service.store().list_performances(gameweek.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_single_active_gameweek() {
        let service = service().await;
        let gw1 = active_gameweek(&service, 1).await;
        let gw2 = active_gameweek(&service, 2).await;

        let active: Vec<GameweekId> = service
            .store()
            .list_gameweeks()
            .await
            .unwrap()
            .into_iter()
            .filter(|g| g.is_active)
            .map(|g| g.id)
            .collect();
        assert_eq!(active, vec![gw2.id]);
        assert_ne!(gw1.id, gw2.id);
    }

    #[tokio::test]
    async fn test_completed_gameweek_cannot_be_activated() {
        let service = service().await;
        let gw1 = active_gameweek(&service, 1).await;
        service.complete_gameweek(gw1.id).await.unwrap();

        let err = service.set_active_period(gw1.id).await.unwrap_err();
        assert!(matches!(err, LeagueError::GameweekCompleted { .. }));

        let err = service.submit_performances(gw1.id, &[captain_ten()]).await.unwrap_err();
        assert!(matches!(err, LeagueError::GameweekCompleted { .. }));
    }

    #[tokio::test]
    async fn test_leaderboard_ties_share_rank() {
        let service = service().await;
        let ana = saved_squad(&service, "ana").await;
        let bo = saved_squad(&service, "bo").await;
        let cy = service.create_squad("cy", "Cy FC").await.unwrap();
        let gameweek = active_gameweek(&service, 1).await;

        service.submit_performances(gameweek.id, &[captain_ten()]).await.unwrap();

        let board = service.leaderboard(LeaderboardScope::AllTime).await.unwrap();
        let ranks: Vec<(SquadId, u32, i32)> =
            board.iter().map(|e| (e.squad_id, e.rank, e.points)).collect();
        assert_eq!(ranks, vec![(ana.id, 1, 20), (bo.id, 1, 20), (cy.id, 3, 0)]);

        let weekly = service.leaderboard(LeaderboardScope::Gameweek(gameweek.id)).await.unwrap();
        assert_eq!(weekly[2].rank, 3);

        let league = service.create_league("Friends").await.unwrap();
        service.join_league(league.id, bo.id).await.unwrap();
        service.join_league(league.id, cy.id).await.unwrap();
        let members =
            service.league_leaderboard(league.id, LeaderboardScope::AllTime).await.unwrap();
        let ranks: Vec<(SquadId, u32)> = members.iter().map(|e| (e.squad_id, e.rank)).collect();
        assert_eq!(ranks, vec![(bo.id, 1), (cy.id, 2)]);
    }

    #[tokio::test]
    async fn test_failed_squad_does_not_block_others() {
        let store = Arc::new(InMemoryStore::new());
        let service = service_with(store.clone()).await;
        let ana = saved_squad(&service, "ana").await;
        let bo = saved_squad(&service, "bo").await;
        let gameweek = active_gameweek(&service, 1).await;

        store.fail_score_writes_for(ana.id);
        let summary = service.submit_performances(gameweek.id, &[captain_ten()]).await.unwrap();

        assert!(!summary.is_complete());
        assert_eq!(summary.failed_squads, vec![ana.id]);
        assert_eq!(summary.squads_scored, 1);
        assert_eq!(service.store().get_squad(bo.id).await.unwrap().unwrap().total_points, 20);
        assert_eq!(service.store().get_squad(ana.id).await.unwrap().unwrap().total_points, 0);
    }

    #[test]
    fn test_negative_price_rejected() {
        tokio_test::block_on(async {
            let service = LeagueService::new(Arc::new(InMemoryStore::new()), RulesConfig::default());
            let err = service.upsert_player(&player(1, Position::Forward, -5)).await.unwrap_err();
            assert!(err.is_rejection());
        });
    }
}
