//! Fantasy League Admin CLI
//!
//! Offline rule checks (`score`, `validate`), gameweek administration
//! against the league database, and an in-memory `demo` walkthrough.

mod logging;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use league_service::{
    AggregationSummary, InMemoryStore, LeaderboardEntry, LeaderboardScope, LeagueService,
    LeagueServiceConfig, PerformanceEntry, Player, SquadSelection,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use squad_rules::{
    score_label, total_spend, ChipType, Position, Price, RawStats, RosterEntry, RulesConfig,
    ScoreResult, SquadValidation,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "league-admin")]
#[command(about = "Admin CLI for the fantasy league - scoring, validation and gameweek lifecycle")]
#[command(version = "0.1.0")]
struct Cli {
    /// TOML configuration file (defaults to environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level filter
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log format: default, pretty or json
    #[arg(long, global = true, default_value = "default")]
    log_format: String,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one stat line
    Score {
        /// Position label (Defender, Midfielder, Forward)
        #[arg(short, long)]
        position: String,
        #[arg(long, default_value = "0")]
        goals: u32,
        #[arg(long, default_value = "0")]
        assists: u32,
        #[arg(long, default_value = "0")]
        yellow_cards: u32,
        #[arg(long, default_value = "0")]
        red_cards: u32,
        #[arg(long)]
        straight_red: bool,
        #[arg(long)]
        motm: bool,
        #[arg(long, default_value = "0")]
        days_played: u32,
    },

    /// Validate a roster JSON file
    Validate {
        /// JSON array of roster entries
        roster: PathBuf,
        /// Budget in millions (defaults to the configured budget)
        #[arg(short, long)]
        budget: Option<Price>,
    },

    /// Create a gameweek
    CreateGameweek {
        #[arg(short, long)]
        number: i32,
    },

    /// Make a gameweek the active one
    Activate {
        #[arg(short, long)]
        gameweek: i64,
    },

    /// Submit performances from a JSON file and aggregate
    Submit {
        #[arg(short, long)]
        gameweek: i64,
        /// JSON array of performance entries
        file: PathBuf,
    },

    /// Recompute squad scores for a gameweek
    Aggregate {
        #[arg(short, long)]
        gameweek: i64,
    },

    /// Final aggregation and completion of a gameweek
    Complete {
        #[arg(short, long)]
        gameweek: i64,
    },

    /// Print a leaderboard
    Leaderboard {
        /// Rank by one gameweek instead of all-time points
        #[arg(short, long)]
        gameweek: Option<i64>,
        /// Restrict to one league's members
        #[arg(short, long)]
        league: Option<i64>,
    },

    /// Run a full gameweek against an in-memory store
    Demo,
}

fn load_config(path: Option<&Path>) -> Result<LeagueServiceConfig> {
    match path {
        Some(path) => LeagueServiceConfig::from_toml_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => LeagueServiceConfig::from_env().context("loading config from environment"),
    }
}

/// Rules from the config file when given, defaults otherwise
fn load_rules(path: Option<&Path>) -> Result<RulesConfig> {
    match path {
        Some(_) => Ok(load_config(path)?.rules),
        None => Ok(RulesConfig::default()),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn connect(path: Option<&Path>) -> Result<LeagueService> {
    let config = load_config(path)?;
    LeagueService::connect(&config).await.context("connecting to league database")
}

fn print_score(position: Position, result: &ScoreResult) {
    println!("{} {}", "Position:".bold(), position);
    for line in &result.breakdown.lines {
        println!("  {:<16} x{:<3} {:>+4}", line.category.label(), line.count, line.points);
    }
    println!("{} {}", "Total:".bold(), result.points.to_string().green().bold());
}

fn print_validation(validation: &SquadValidation, spend: Price, budget: Price) {
    if validation.is_valid {
        println!("{}", "Squad is valid".green().bold());
    } else {
        println!("{}", "Squad is invalid".red().bold());
        for error in &validation.errors {
            println!("  - {}", error.red());
        }
    }
    let counts = &validation.position_counts;
    println!(
        "Starters: {} DEF, {} MID, {} FWD",
        counts.defenders, counts.midfielders, counts.forwards
    );
    println!("Spend: {spend} of {budget}");
    if !validation.locked_player_ids.is_empty() {
        let locked: Vec<String> =
            validation.locked_player_ids.iter().map(|id| id.to_string()).collect();
        println!("Locked players: {}", locked.join(", "));
    }
}

fn print_summary(summary: &AggregationSummary) {
    println!(
        "Gameweek {}: {} squads scored",
        summary.gameweek_id,
        summary.squads_scored.to_string().green()
    );
    if !summary.is_complete() {
        println!("{} {:?}", "Failed squads:".red().bold(), summary.failed_squads);
    }
}

fn print_leaderboard(entries: &[LeaderboardEntry]) {
    println!("{}", format!("{:<5} {:<24} {:<16} {:>6}", "Rank", "Squad", "Owner", "Points").bold());
    for entry in entries {
        println!(
            "{:<5} {:<24} {:<16} {:>6}",
            entry.rank, entry.squad_name, entry.owner, entry.points
        );
    }
}

fn demo_player(id: i64, name: &str, position: Position) -> Player {
    Player {
        id,
        name: name.to_string(),
        position,
        price: Price::from_millions(5),
        is_in_form: false,
    }
}

async fn run_demo(json: bool) -> Result<()> {
    let service = LeagueService::new(Arc::new(InMemoryStore::new()), RulesConfig::default());

    let catalog = [
        demo_player(1, "A", Position::Defender),
        demo_player(2, "B", Position::Midfielder),
        demo_player(3, "C", Position::Midfielder),
        demo_player(4, "D", Position::Forward),
        demo_player(5, "E", Position::Forward),
        demo_player(6, "F", Position::Midfielder),
        demo_player(7, "G", Position::Defender),
    ];
    for player in &catalog {
        service.upsert_player(player).await?;
    }

    let selection = |player_id: i64, is_on_bench: bool, is_captain: bool| SquadSelection {
        player_id,
        is_on_bench,
        is_captain,
    };
    let roster = [
        selection(1, false, true),
        selection(2, false, false),
        selection(3, false, false),
        selection(4, false, false),
        selection(5, false, false),
        selection(6, true, false),
    ];

    let home = service.create_squad("home", "Home United").await?;
    let away = service.create_squad("away", "Away Rovers").await?;
    service.save_squad(home.id, &roster).await?;
    service.save_squad(away.id, &roster).await?;

    let gameweek = service.create_gameweek(1).await?;
    service.set_active_period(gameweek.id).await?;

    service.activate_chip(home.id, ChipType::BenchBoost).await?;
    service.execute_transfer(away.id, 1, 7).await?;

    let performances = [
        PerformanceEntry {
            player_id: 1,
            stats: RawStats { goals: 1, assists: 1, days_played: 1, ..Default::default() },
        },
        PerformanceEntry {
            player_id: 4,
            stats: RawStats { goals: 2, is_motm: true, days_played: 4, ..Default::default() },
        },
        PerformanceEntry {
            player_id: 6,
            stats: RawStats { assists: 1, yellow_cards: 1, days_played: 2, ..Default::default() },
        },
        PerformanceEntry {
            player_id: 7,
            stats: RawStats { red_cards: 1, straight_red: true, ..Default::default() },
        },
    ];
    let summary = service.submit_performances(gameweek.id, &performances).await?;
    service.complete_gameweek(gameweek.id).await?;

    let board = service.leaderboard(LeaderboardScope::AllTime).await?;
    info!(squads = board.len(), "demo complete");

    if json {
        print_json(&board)
    } else {
        print_summary(&summary);
        print_leaderboard(&board);
        Ok(())
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Score {
            position,
            goals,
            assists,
            yellow_cards,
            red_cards,
            straight_red,
            motm,
            days_played,
        } => {
            let stats = RawStats {
                goals,
                assists,
                yellow_cards,
                red_cards,
                straight_red,
                is_motm: motm,
                days_played,
                goals_conceded: 0,
            };
            let result = score_label(&position, &stats);
            if cli.json {
                print_json(&result)?;
            } else {
                print_score(Position::from_label(&position), &result);
            }
        }

        Commands::Validate { roster, budget } => {
            let rules = load_rules(config_path)?;
            let entries: Vec<RosterEntry> = read_json(&roster)?;
            let budget = budget.unwrap_or(rules.default_budget);
            let validation = squad_rules::validate_squad(&entries, budget, &rules);
            if cli.json {
                print_json(&validation)?;
            } else {
                print_validation(&validation, total_spend(&entries), budget);
            }
        }

        Commands::CreateGameweek { number } => {
            let service = connect(config_path).await?;
            let gameweek = service.create_gameweek(number).await?;
            println!("Created gameweek {} (id {})", gameweek.number, gameweek.id);
        }

        Commands::Activate { gameweek } => {
            let service = connect(config_path).await?;
            let active = service.set_active_period(gameweek).await?;
            println!("Gameweek {} is now active", active.number.to_string().green());
        }

        Commands::Submit { gameweek, file } => {
            let service = connect(config_path).await?;
            let entries: Vec<PerformanceEntry> = read_json(&file)?;
            let summary = service.submit_performances(gameweek, &entries).await?;
            if cli.json {
                print_json(&summary)?;
            } else {
                println!("Stored {} performances", entries.len());
                print_summary(&summary);
            }
        }

        Commands::Aggregate { gameweek } => {
            let service = connect(config_path).await?;
            let summary = service.aggregate_gameweek(gameweek).await?;
            if cli.json {
                print_json(&summary)?;
            } else {
                print_summary(&summary);
            }
        }

        Commands::Complete { gameweek } => {
            let service = connect(config_path).await?;
            let summary = service.complete_gameweek(gameweek).await?;
            if cli.json {
                print_json(&summary)?;
            } else {
                print_summary(&summary);
                println!("Gameweek {} completed", gameweek);
            }
        }

        Commands::Leaderboard { gameweek, league } => {
            let service = connect(config_path).await?;
            let scope = gameweek.map_or(LeaderboardScope::AllTime, LeaderboardScope::Gameweek);
            let board = match league {
                Some(league_id) => service.league_leaderboard(league_id, scope).await?,
                None => service.leaderboard(scope).await?,
            };
            if cli.json {
                print_json(&board)?;
            } else {
                print_leaderboard(&board);
            }
        }

        Commands::Demo => run_demo(cli.json).await?,
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    logging::initialize_logging_with_config(&cli.log_level, &cli.log_format)?;

    run(cli).await
}
