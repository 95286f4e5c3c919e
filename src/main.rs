mod bracket;
mod guard;
mod model;
mod scoring;
mod service;
mod state;
mod store;

use crate::model::{BracketEntry, Game};
use crate::scoring::{Basis, Scenario};
use crate::service::PoolService;
use crate::state::app_settings::AppSettings;
use crate::state::refresher::{POLL_INTERVAL, PeriodicRefresher, RefreshCoordinator, RefreshOutcome, RefreshRequest};
use crate::store::JsonStore;
use anyhow::{Context, anyhow};
use cfb_api::client::CfbApi;
use chrono::Utc;
use log::{debug, info};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

type Service = PoolService<JsonStore, CfbApi>;

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Help,
    Version,
    Leaderboard { pool_id: String },
    Simulate { pool_id: String, winners: HashMap<String, String>, basis: Basis },
    Propagate { season_id: String },
    Refresh { season_id: String },
    Watch { season_id: String },
    Record { path: PathBuf },
    Submit { path: PathBuf, admin: bool },
    Entries { pool_id: String, viewer: Option<String>, admin: bool },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let command = match parse_args(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{message}\n\n{}", usage_text());
            std::process::exit(2);
        }
    };

    match command {
        Command::Help => {
            println!("{}", usage_text());
            return Ok(());
        }
        Command::Version => {
            println!("bowlpool {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    better_panic::install();

    let settings = AppSettings::load();
    env_logger::Builder::new()
        .filter_level(settings.log_level)
        .format_timestamp_secs()
        .init();
    debug!("settings: {settings:?}");

    let service = PoolService::new(
        JsonStore::new(&settings.data_dir),
        CfbApi::with_base_url(&settings.feed_url),
        RefreshCoordinator::new(settings.refresh_interval),
    );
    run(command, &service).await
}

async fn run(command: Command, service: &Service) -> anyhow::Result<()> {
    match command {
        Command::Help | Command::Version => Ok(()),
        Command::Leaderboard { pool_id } => print_json(&service.leaderboard(&pool_id).await?),
        Command::Simulate { pool_id, winners, basis } => {
            let scenario = Scenario { winners, basis };
            print_json(&service.simulate(&pool_id, &scenario).await?)
        }
        Command::Propagate { season_id } => {
            let batch = service.force_propagate_all(&season_id).await?;
            print_json(&batch.games())
        }
        Command::Refresh { season_id } => report_refresh(service.refresh_scores(&season_id).await),
        Command::Watch { season_id } => watch(service, season_id).await,
        Command::Record { path } => {
            let game: Game = read_json_file(&path)?;
            let batch = service.record_result(game).await?;
            print_json(&batch.games())
        }
        Command::Submit { path, admin } => {
            let entry: BracketEntry = read_json_file(&path)?;
            print_json(&service.submit_entry(entry, admin, Utc::now()).await?)
        }
        Command::Entries { pool_id, viewer, admin } => {
            let entries = service
                .entries_for(&pool_id, viewer.as_deref(), admin, Utc::now())
                .await?;
            print_json(&entries)
        }
    }
}

/// Refresh on startup, then whenever the periodic refresher asks, until Ctrl-C.
async fn watch(service: &Service, season_id: String) -> anyhow::Result<()> {
    let (refresh_tx, mut refresh_rx) = mpsc::channel::<RefreshRequest>(8);
    let refresher = PeriodicRefresher::new(season_id.clone(), POLL_INTERVAL, refresh_tx);
    let refresher_task = tokio::spawn(refresher.run());

    log_refresh(&season_id, service.refresh_scores(&season_id).await);
    loop {
        tokio::select! {
            Some(request) = refresh_rx.recv() => {
                log_refresh(&request.season_id, service.refresh_scores(&request.season_id).await);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, stopping watch");
                break;
            }
        }
    }

    refresher_task.abort();
    Ok(())
}

fn log_refresh(season_id: &str, outcome: RefreshOutcome<bracket::PendingBatch>) {
    match outcome {
        RefreshOutcome::Throttled => debug!("season {season_id}: refresh not due yet"),
        RefreshOutcome::Refreshed(batch) => info!("season {season_id}: {} games updated", batch.len()),
        // Already logged by the coordinator; the next tick retries.
        RefreshOutcome::Failed(_) => {}
    }
}

fn report_refresh(outcome: RefreshOutcome<bracket::PendingBatch>) -> anyhow::Result<()> {
    match outcome {
        RefreshOutcome::Throttled => print_json(&json!({ "status": "throttled" })),
        RefreshOutcome::Refreshed(batch) => {
            print_json(&json!({ "status": "refreshed", "updated": batch.games() }))
        }
        RefreshOutcome::Failed(message) => Err(anyhow!("score refresh failed: {message}")),
    }
}

fn read_json_file<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path).with_context(|| format!("read {} failed", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parse {} failed", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Command, String> {
    let mut args = args.into_iter();
    let Some(command) = args.next() else {
        return Ok(Command::Help);
    };
    let rest: Vec<String> = args.collect();

    let single = |what: &str| -> Result<String, String> {
        match rest.as_slice() {
            [value] if !value.starts_with('-') => Ok(value.clone()),
            [] => Err(format!("{command}: missing <{what}>")),
            _ => Err(format!("{command}: expected exactly one <{what}>")),
        }
    };

    match command.as_str() {
        "-h" | "--help" | "help" => Ok(Command::Help),
        "-V" | "--version" => Ok(Command::Version),
        "leaderboard" => Ok(Command::Leaderboard { pool_id: single("pool")? }),
        "propagate" => Ok(Command::Propagate { season_id: single("season")? }),
        "refresh" => Ok(Command::Refresh { season_id: single("season")? }),
        "watch" => Ok(Command::Watch { season_id: single("season")? }),
        "record" => Ok(Command::Record { path: single("game.json")?.into() }),
        "simulate" => parse_simulate(&rest),
        "submit" => parse_submit(&rest),
        "entries" => parse_entries(&rest),
        other => Err(format!("Unknown argument: {other}")),
    }
}

fn parse_simulate(args: &[String]) -> Result<Command, String> {
    let mut pool_id = None;
    let mut basis = Basis::Overlay;
    let mut winners = HashMap::new();
    for arg in args {
        if arg == "--replace" {
            basis = Basis::Replace;
        } else if let Some((game, team)) = arg.split_once('=') {
            if game.is_empty() || team.is_empty() {
                return Err(format!("simulate: bad pick {arg:?}, expected <game>=<team>"));
            }
            winners.insert(game.to_owned(), team.to_owned());
        } else if pool_id.is_none() && !arg.starts_with('-') {
            pool_id = Some(arg.clone());
        } else {
            return Err(format!("simulate: unexpected argument {arg:?}"));
        }
    }
    let pool_id = pool_id.ok_or("simulate: missing <pool>")?;
    Ok(Command::Simulate { pool_id, winners, basis })
}

fn parse_submit(args: &[String]) -> Result<Command, String> {
    let mut path = None;
    let mut admin = false;
    for arg in args {
        match arg.as_str() {
            "--admin" => admin = true,
            _ if path.is_none() && !arg.starts_with('-') => path = Some(PathBuf::from(arg)),
            _ => return Err(format!("submit: unexpected argument {arg:?}")),
        }
    }
    let path = path.ok_or("submit: missing <entry.json>")?;
    Ok(Command::Submit { path, admin })
}

fn parse_entries(args: &[String]) -> Result<Command, String> {
    let mut pool_id = None;
    let mut viewer = None;
    let mut admin = false;
    let mut args = args.iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--admin" => admin = true,
            "--as" => viewer = Some(args.next().ok_or("entries: --as needs a user id")?.clone()),
            _ if pool_id.is_none() && !arg.starts_with('-') => pool_id = Some(arg.clone()),
            _ => return Err(format!("entries: unexpected argument {arg:?}")),
        }
    }
    let pool_id = pool_id.ok_or("entries: missing <pool>")?;
    Ok(Command::Entries { pool_id, viewer, admin })
}

fn usage_text() -> &'static str {
    "bowlpool - bowl season bracket pool

Usage:
  bowlpool leaderboard <pool>
  bowlpool simulate <pool> [--replace] <game>=<team>...
  bowlpool propagate <season>
  bowlpool refresh <season>
  bowlpool watch <season>
  bowlpool record <game.json>
  bowlpool submit <entry.json> [--admin]
  bowlpool entries <pool> [--as <user>] [--admin]
  bowlpool --help
  bowlpool --version

Environment:
  BOWLPOOL_DATA_DIR       Directory holding seasons/ and pools/ (default ./data)
  BOWLPOOL_FEED_URL       Scoreboard API base URL (default ESPN college football)
  BOWLPOOL_LOG            Log level: error, warn, info, debug, trace (default warn)
  BOWLPOOL_REFRESH_SECS   Minimum seconds between score refreshes (default 120)"
}
