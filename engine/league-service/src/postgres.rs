//! PostgreSQL league store

use crate::config::DatabaseConfig;
use crate::error::LeagueError;
use crate::models::{
    ChipUsage, Gameweek, GameweekId, League, LeagueId, NewSquad, PerformanceRecord, PeriodScore,
    Player, Squad, SquadId, SquadMembership, TransferRecord,
};
use crate::store::LeagueStore;
use crate::Result;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use squad_rules::{ChipType, PlayerId, Position, Price, RawStats, RulesConfig};
use tracing::info;

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn to_u32(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

#[derive(Debug, FromRow)]
struct PlayerRow {
    id: i64,
    name: String,
    position: String,
    price_tenths: i64,
    is_in_form: bool,
}

impl From<PlayerRow> for Player {
    fn from(row: PlayerRow) -> Self {
        Player {
            id: row.id,
            name: row.name,
            position: Position::from_label(&row.position),
            price: Price::from_tenths(row.price_tenths),
            is_in_form: row.is_in_form,
        }
    }
}

#[derive(Debug, FromRow)]
struct SquadRow {
    id: i64,
    owner: String,
    name: String,
    budget_tenths: i64,
    free_transfers: i32,
    total_points: i32,
}

impl From<SquadRow> for Squad {
    fn from(row: SquadRow) -> Self {
        Squad {
            id: row.id,
            owner: row.owner,
            name: row.name,
            budget: Price::from_tenths(row.budget_tenths),
            free_transfers: to_u32(row.free_transfers),
            total_points: row.total_points,
        }
    }
}

#[derive(Debug, FromRow)]
struct MembershipRow {
    squad_id: i64,
    player_id: i64,
    is_captain: bool,
    is_on_bench: bool,
    slot: i16,
}

impl From<MembershipRow> for SquadMembership {
    fn from(row: MembershipRow) -> Self {
        SquadMembership {
            squad_id: row.squad_id,
            player_id: row.player_id,
            is_captain: row.is_captain,
            is_on_bench: row.is_on_bench,
            slot: u8::try_from(row.slot).unwrap_or(u8::MAX),
        }
    }
}

#[derive(Debug, FromRow)]
struct GameweekRow {
    id: i64,
    number: i32,
    is_active: bool,
    is_completed: bool,
}

impl From<GameweekRow> for Gameweek {
    fn from(row: GameweekRow) -> Self {
        Gameweek {
            id: row.id,
            number: row.number,
            is_active: row.is_active,
            is_completed: row.is_completed,
        }
    }
}

#[derive(Debug, FromRow)]
struct PerformanceRow {
    player_id: i64,
    gameweek_id: i64,
    goals: i32,
    assists: i32,
    yellow_cards: i32,
    red_cards: i32,
    straight_red: bool,
    is_motm: bool,
    days_played: i32,
    goals_conceded: i32,
    points: i32,
}

impl From<PerformanceRow> for PerformanceRecord {
    fn from(row: PerformanceRow) -> Self {
        PerformanceRecord {
            player_id: row.player_id,
            gameweek_id: row.gameweek_id,
            stats: RawStats {
                goals: to_u32(row.goals),
                assists: to_u32(row.assists),
                yellow_cards: to_u32(row.yellow_cards),
                red_cards: to_u32(row.red_cards),
                straight_red: row.straight_red,
                is_motm: row.is_motm,
                days_played: to_u32(row.days_played),
                goals_conceded: to_u32(row.goals_conceded),
            },
            points: row.points,
        }
    }
}

#[derive(Debug, FromRow)]
struct PeriodScoreRow {
    squad_id: i64,
    gameweek_id: i64,
    points: i32,
    gross_points: i32,
    transfer_cost: i32,
    bench_boost: bool,
    triple_captain: bool,
}

impl From<PeriodScoreRow> for PeriodScore {
    fn from(row: PeriodScoreRow) -> Self {
        PeriodScore {
            squad_id: row.squad_id,
            gameweek_id: row.gameweek_id,
            points: row.points,
            gross_points: row.gross_points,
            transfer_cost: row.transfer_cost,
            bench_boost: row.bench_boost,
            triple_captain: row.triple_captain,
        }
    }
}

#[derive(Debug, FromRow)]
struct ChipUsageRow {
    squad_id: i64,
    chip: String,
    gameweek_id: i64,
    gameweek_number: i32,
    used_at: DateTime<Utc>,
}

impl TryFrom<ChipUsageRow> for ChipUsage {
    type Error = LeagueError;

    fn try_from(row: ChipUsageRow) -> Result<Self> {
        Ok(ChipUsage {
            squad_id: row.squad_id,
            chip: row.chip.parse::<ChipType>()?,
            gameweek_id: row.gameweek_id,
            gameweek_number: row.gameweek_number,
            used_at: row.used_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TransferRow {
    squad_id: i64,
    player_out: i64,
    player_in: i64,
    gameweek_id: i64,
    point_cost: i32,
    created_at: DateTime<Utc>,
}

impl From<TransferRow> for TransferRecord {
    fn from(row: TransferRow) -> Self {
        TransferRecord {
            squad_id: row.squad_id,
            player_out: row.player_out,
            player_in: row.player_in,
            gameweek_id: row.gameweek_id,
            point_cost: row.point_cost,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct LeagueRow {
    id: i64,
    name: String,
}

const SQUAD_COLUMNS: &str = "id, owner, name, budget_tenths, free_transfers, total_points";
const PERFORMANCE_COLUMNS: &str = "player_id, gameweek_id, goals, assists, yellow_cards, red_cards, \
     straight_red, is_motm, days_played, goals_conceded, points";
const SCORE_COLUMNS: &str =
    "squad_id, gameweek_id, points, gross_points, transfer_cost, bench_boost, triple_captain";
const CHIP_COLUMNS: &str = "squad_id, chip, gameweek_id, gameweek_number, used_at";
const TRANSFER_COLUMNS: &str =
    "squad_id, player_out, player_in, gameweek_id, point_cost, created_at";

/// League store backed by PostgreSQL
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Open a pool and apply pending migrations
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&config.url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!(max_connections = config.max_connections, "connected league store");

        Ok(Self { pool })
    }

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Lock the squad row, failing when it does not exist
    async fn lock_squad(tx: &mut Transaction<'_, Postgres>, squad_id: SquadId) -> Result<()> {
        sqlx::query("SELECT id FROM squads WHERE id = $1 FOR UPDATE")
            .bind(squad_id)
            .fetch_optional(&mut **tx)
            .await?
            .map(|_| ())
            .ok_or(LeagueError::SquadNotFound { squad_id })
    }

    async fn write_roster(
        tx: &mut Transaction<'_, Postgres>,
        squad_id: SquadId,
        memberships: &[SquadMembership],
    ) -> Result<()> {
        sqlx::query("DELETE FROM squad_members WHERE squad_id = $1")
            .bind(squad_id)
            .execute(&mut **tx)
            .await?;

        for member in memberships {
            sqlx::query(
                "INSERT INTO squad_members (squad_id, player_id, is_captain, is_on_bench, slot) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(squad_id)
            .bind(member.player_id)
            .bind(member.is_captain)
            .bind(member.is_on_bench)
            .bind(i16::from(member.slot))
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl LeagueStore for PgStore {
    async fn upsert_player(&self, player: &Player) -> Result<()> {
        sqlx::query(
            "INSERT INTO players (id, name, position, price_tenths, is_in_form) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, position = EXCLUDED.position, \
             price_tenths = EXCLUDED.price_tenths, is_in_form = EXCLUDED.is_in_form",
        )
        .bind(player.id)
        .bind(&player.name)
        .bind(player.position.as_str())
        .bind(player.price.to_tenths())
        .bind(player.is_in_form)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_player(&self, player_id: PlayerId) -> Result<Option<Player>> {
        let row = sqlx::query_as::<_, PlayerRow>(
            "SELECT id, name, position, price_tenths, is_in_form FROM players WHERE id = $1",
        )
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Player::from))
    }

    async fn list_players(&self, player_ids: &[PlayerId]) -> Result<Vec<Player>> {
        let rows = sqlx::query_as::<_, PlayerRow>(
            "SELECT id, name, position, price_tenths, is_in_form FROM players WHERE id = ANY($1)",
        )
        .bind(player_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Player::from).collect())
    }

    async fn insert_squad(&self, squad: NewSquad) -> Result<Squad> {
        let result = sqlx::query_as::<_, SquadRow>(&format!(
            "INSERT INTO squads (owner, name, budget_tenths, free_transfers, total_points) \
             VALUES ($1, $2, $3, $4, 0) RETURNING {SQUAD_COLUMNS}"
        ))
        .bind(&squad.owner)
        .bind(&squad.name)
        .bind(squad.budget.to_tenths())
        .bind(to_i32(squad.free_transfers))
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row.into()),
            Err(e) if is_unique_violation(&e) => {
                Err(LeagueError::SquadAlreadyExists { owner: squad.owner })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_squad(&self, squad_id: SquadId) -> Result<Option<Squad>> {
        let row = sqlx::query_as::<_, SquadRow>(&format!(
            "SELECT {SQUAD_COLUMNS} FROM squads WHERE id = $1"
        ))
        .bind(squad_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Squad::from))
    }

    async fn list_squads(&self) -> Result<Vec<Squad>> {
        let rows =
            sqlx::query_as::<_, SquadRow>(&format!("SELECT {SQUAD_COLUMNS} FROM squads ORDER BY id"))
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Squad::from).collect())
    }

    async fn update_squad(&self, squad: &Squad) -> Result<()> {
        let result = sqlx::query(
            "UPDATE squads SET name = $2, budget_tenths = $3, free_transfers = $4 WHERE id = $1",
        )
        .bind(squad.id)
        .bind(&squad.name)
        .bind(squad.budget.to_tenths())
        .bind(to_i32(squad.free_transfers))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LeagueError::SquadNotFound { squad_id: squad.id });
        }
        Ok(())
    }

    async fn refresh_total_points(&self, squad_id: SquadId) -> Result<i32> {
        let total = sqlx::query_scalar::<_, i32>(
            "UPDATE squads SET total_points = ( \
                 SELECT LEAST(GREATEST(COALESCE(SUM(points), 0), -2147483648), 2147483647)::INTEGER \
                 FROM period_scores WHERE squad_id = $1) \
             WHERE id = $1 RETURNING total_points",
        )
        .bind(squad_id)
        .fetch_optional(&self.pool)
        .await?;

        total.ok_or(LeagueError::SquadNotFound { squad_id })
    }

    async fn list_memberships(&self, squad_id: SquadId) -> Result<Vec<SquadMembership>> {
        let rows = sqlx::query_as::<_, MembershipRow>(
            "SELECT squad_id, player_id, is_captain, is_on_bench, slot FROM squad_members \
             WHERE squad_id = $1 ORDER BY slot",
        )
        .bind(squad_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(SquadMembership::from).collect())
    }

    async fn replace_roster(
        &self,
        squad_id: SquadId,
        memberships: &[SquadMembership],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::lock_squad(&mut tx, squad_id).await?;
        Self::write_roster(&mut tx, squad_id, memberships).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn apply_transfer(
        &self,
        squad: &Squad,
        memberships: &[SquadMembership],
        record: &TransferRecord,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::lock_squad(&mut tx, squad.id).await?;

        sqlx::query("UPDATE squads SET budget_tenths = $2, free_transfers = $3 WHERE id = $1")
            .bind(squad.id)
            .bind(squad.budget.to_tenths())
            .bind(to_i32(squad.free_transfers))
            .execute(&mut *tx)
            .await?;

        Self::write_roster(&mut tx, squad.id, memberships).await?;

        sqlx::query(&format!(
            "INSERT INTO transfers ({TRANSFER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)"
        ))
        .bind(record.squad_id)
        .bind(record.player_out)
        .bind(record.player_in)
        .bind(record.gameweek_id)
        .bind(record.point_cost)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn insert_gameweek(&self, number: i32) -> Result<Gameweek> {
        let result = sqlx::query_as::<_, GameweekRow>(
            "INSERT INTO gameweeks (number, is_active, is_completed) VALUES ($1, FALSE, FALSE) \
             RETURNING id, number, is_active, is_completed",
        )
        .bind(number)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row.into()),
            Err(e) if is_unique_violation(&e) => Err(LeagueError::GameweekAlreadyExists { number }),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_gameweek(&self, gameweek_id: GameweekId) -> Result<Option<Gameweek>> {
        let row = sqlx::query_as::<_, GameweekRow>(
            "SELECT id, number, is_active, is_completed FROM gameweeks WHERE id = $1",
        )
        .bind(gameweek_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Gameweek::from))
    }

    async fn list_gameweeks(&self) -> Result<Vec<Gameweek>> {
        let rows = sqlx::query_as::<_, GameweekRow>(
            "SELECT id, number, is_active, is_completed FROM gameweeks ORDER BY number",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Gameweek::from).collect())
    }

    async fn active_gameweek(&self) -> Result<Option<Gameweek>> {
        let row = sqlx::query_as::<_, GameweekRow>(
            "SELECT id, number, is_active, is_completed FROM gameweeks WHERE is_active",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Gameweek::from))
    }

    async fn activate_gameweek(
        &self,
        gameweek_id: GameweekId,
        rules: &RulesConfig,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent activations of the same gameweek
        let state = sqlx::query_as::<_, (bool, bool)>(
            "SELECT is_active, is_completed FROM gameweeks WHERE id = $1 FOR UPDATE",
        )
        .bind(gameweek_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (is_active, is_completed) = match state {
            Some(state) => state,
            None => {
                tx.rollback().await?;
                return Err(LeagueError::GameweekNotFound { gameweek_id });
            }
        };
        if is_completed {
            tx.rollback().await?;
            return Err(LeagueError::GameweekCompleted { gameweek_id });
        }
        if is_active {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE gameweeks SET is_active = FALSE WHERE is_active AND id <> $1")
            .bind(gameweek_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE gameweeks SET is_active = TRUE WHERE id = $1")
            .bind(gameweek_id)
            .execute(&mut *tx)
            .await?;

        let replenished = sqlx::query(
            "UPDATE squads SET free_transfers = LEAST(free_transfers::BIGINT + $1, $2)::INTEGER",
        )
        .bind(to_i32(rules.free_transfers_per_period))
        .bind(to_i32(rules.max_free_transfers))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(gameweek_id, squads = replenished.rows_affected(), "replenished free transfers");
        Ok(true)
    }

    async fn complete_gameweek(&self, gameweek_id: GameweekId) -> Result<()> {
        let result = sqlx::query("UPDATE gameweeks SET is_completed = TRUE WHERE id = $1")
            .bind(gameweek_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LeagueError::GameweekNotFound { gameweek_id });
        }
        Ok(())
    }

    async fn list_performances(&self, gameweek_id: GameweekId) -> Result<Vec<PerformanceRecord>> {
        let rows = sqlx::query_as::<_, PerformanceRow>(&format!(
            "SELECT {PERFORMANCE_COLUMNS} FROM performances WHERE gameweek_id = $1"
        ))
        .bind(gameweek_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(PerformanceRecord::from).collect())
    }

    async fn upsert_performance(&self, record: &PerformanceRecord) -> Result<()> {
        let stats = &record.stats;
        sqlx::query(&format!(
            "INSERT INTO performances ({PERFORMANCE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (player_id, gameweek_id) DO UPDATE SET \
             goals = EXCLUDED.goals, assists = EXCLUDED.assists, \
             yellow_cards = EXCLUDED.yellow_cards, red_cards = EXCLUDED.red_cards, \
             straight_red = EXCLUDED.straight_red, is_motm = EXCLUDED.is_motm, \
             days_played = EXCLUDED.days_played, goals_conceded = EXCLUDED.goals_conceded, \
             points = EXCLUDED.points"
        ))
        .bind(record.player_id)
        .bind(record.gameweek_id)
        .bind(to_i32(stats.goals))
        .bind(to_i32(stats.assists))
        .bind(to_i32(stats.yellow_cards))
        .bind(to_i32(stats.red_cards))
        .bind(stats.straight_red)
        .bind(stats.is_motm)
        .bind(to_i32(stats.days_played))
        .bind(to_i32(stats.goals_conceded))
        .bind(record.points)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_period_score(&self, score: &PeriodScore) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO period_scores ({SCORE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (squad_id, gameweek_id) DO UPDATE SET points = EXCLUDED.points, \
             gross_points = EXCLUDED.gross_points, transfer_cost = EXCLUDED.transfer_cost, \
             bench_boost = EXCLUDED.bench_boost, triple_captain = EXCLUDED.triple_captain"
        ))
        .bind(score.squad_id)
        .bind(score.gameweek_id)
        .bind(score.points)
        .bind(score.gross_points)
        .bind(score.transfer_cost)
        .bind(score.bench_boost)
        .bind(score.triple_captain)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_period_score(
        &self,
        squad_id: SquadId,
        gameweek_id: GameweekId,
    ) -> Result<Option<PeriodScore>> {
        let row = sqlx::query_as::<_, PeriodScoreRow>(&format!(
            "SELECT {SCORE_COLUMNS} FROM period_scores WHERE squad_id = $1 AND gameweek_id = $2"
        ))
        .bind(squad_id)
        .bind(gameweek_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(PeriodScore::from))
    }

    async fn list_period_scores(&self, squad_id: SquadId) -> Result<Vec<PeriodScore>> {
        let rows = sqlx::query_as::<_, PeriodScoreRow>(&format!(
            "SELECT {SCORE_COLUMNS} FROM period_scores WHERE squad_id = $1 ORDER BY gameweek_id"
        ))
        .bind(squad_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(PeriodScore::from).collect())
    }

    async fn list_gameweek_scores(&self, gameweek_id: GameweekId) -> Result<Vec<PeriodScore>> {
        let rows = sqlx::query_as::<_, PeriodScoreRow>(&format!(
            "SELECT {SCORE_COLUMNS} FROM period_scores WHERE gameweek_id = $1 ORDER BY squad_id"
        ))
        .bind(gameweek_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(PeriodScore::from).collect())
    }

    async fn insert_chip_usage(&self, usage: &ChipUsage) -> Result<()> {
        let result = sqlx::query(&format!(
            "INSERT INTO chip_usages ({CHIP_COLUMNS}) VALUES ($1, $2, $3, $4, $5)"
        ))
        .bind(usage.squad_id)
        .bind(usage.chip.as_str())
        .bind(usage.gameweek_id)
        .bind(usage.gameweek_number)
        .bind(usage.used_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(LeagueError::DuplicateChipUsage {
                squad_id: usage.squad_id,
                chip: usage.chip,
                gameweek_id: usage.gameweek_id,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_chip_usages(&self, squad_id: SquadId) -> Result<Vec<ChipUsage>> {
        sqlx::query_as::<_, ChipUsageRow>(&format!(
            "SELECT {CHIP_COLUMNS} FROM chip_usages WHERE squad_id = $1 ORDER BY gameweek_number"
        ))
        .bind(squad_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(ChipUsage::try_from)
        .collect()
    }

    async fn list_gameweek_chips(&self, gameweek_id: GameweekId) -> Result<Vec<ChipUsage>> {
        sqlx::query_as::<_, ChipUsageRow>(&format!(
            "SELECT {CHIP_COLUMNS} FROM chip_usages WHERE gameweek_id = $1"
        ))
        .bind(gameweek_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(ChipUsage::try_from)
        .collect()
    }

    async fn list_transfers(
        &self,
        squad_id: SquadId,
        gameweek_id: GameweekId,
    ) -> Result<Vec<TransferRecord>> {
        let rows = sqlx::query_as::<_, TransferRow>(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM transfers WHERE squad_id = $1 AND gameweek_id = $2 \
             ORDER BY id"
        ))
        .bind(squad_id)
        .bind(gameweek_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(TransferRecord::from).collect())
    }

    async fn list_gameweek_transfers(
        &self,
        gameweek_id: GameweekId,
    ) -> Result<Vec<TransferRecord>> {
        let rows = sqlx::query_as::<_, TransferRow>(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM transfers WHERE gameweek_id = $1 ORDER BY id"
        ))
        .bind(gameweek_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(TransferRecord::from).collect())
    }

    async fn insert_league(&self, name: &str) -> Result<League> {
        let row = sqlx::query_as::<_, LeagueRow>(
            "INSERT INTO leagues (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(League { id: row.id, name: row.name })
    }

    async fn add_league_member(&self, league_id: LeagueId, squad_id: SquadId) -> Result<()> {
        if self.get_squad(squad_id).await?.is_none() {
            return Err(LeagueError::SquadNotFound { squad_id });
        }
        let league = sqlx::query("SELECT id FROM leagues WHERE id = $1")
            .bind(league_id)
            .fetch_optional(&self.pool)
            .await?;
        if league.is_none() {
            return Err(LeagueError::LeagueNotFound { league_id });
        }

        sqlx::query(
            "INSERT INTO league_members (league_id, squad_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(league_id)
        .bind(squad_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_league_members(&self, league_id: LeagueId) -> Result<Vec<SquadId>> {
        let league = sqlx::query("SELECT id FROM leagues WHERE id = $1")
            .bind(league_id)
            .fetch_optional(&self.pool)
            .await?;
        if league.is_none() {
            return Err(LeagueError::LeagueNotFound { league_id });
        }

        let members: Vec<(i64,)> = sqlx::query_as(
            "SELECT squad_id FROM league_members WHERE league_id = $1 ORDER BY squad_id",
        )
        .bind(league_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(members.into_iter().map(|(id,)| id).collect())
    }
}
