use crate::bracket::merge_batch;
use crate::model::{BracketEntry, Game, Pool};
use anyhow::{Context, Result};
use cfb_api::ExternalGame;
use cfb_api::client::CfbApi;
use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::path::{Path, PathBuf};

pub trait GameStore: Send + Sync {
    fn get_games(&self, season_id: &str) -> impl Future<Output = Result<Vec<Game>>> + Send;

    /// Commit every game of `games` at once, replacing stored games with the
    /// same id. Either all of them land or none do.
    fn save_batch(&self, games: &[Game], season_id: &str) -> impl Future<Output = Result<()>> + Send;
}

pub trait EntryStore: Send + Sync {
    fn get_entries(&self, pool_id: &str) -> impl Future<Output = Result<Vec<BracketEntry>>> + Send;
    fn save_entry(&self, entry: &BracketEntry) -> impl Future<Output = Result<()>> + Send;
}

pub trait PoolStore: Send + Sync {
    fn get_pool(&self, pool_id: &str) -> impl Future<Output = Result<Option<Pool>>> + Send;
}

pub trait ScoreFeed: Send + Sync {
    fn get_scoreboard(&self) -> impl Future<Output = Result<Vec<ExternalGame>>> + Send;
}

impl ScoreFeed for CfbApi {
    async fn get_scoreboard(&self) -> Result<Vec<ExternalGame>> {
        Ok(self.fetch_scoreboard().await?)
    }
}

/// Stores seasons, pools and entries as pretty-printed JSON under one directory:
///
/// ```text
/// {root}/seasons/{season}/games.json
/// {root}/pools/{pool}.json
/// {root}/pools/{pool}/entries.json
/// ```
#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn games_path(&self, season_id: &str) -> PathBuf {
        self.root.join("seasons").join(season_id).join("games.json")
    }

    fn pool_path(&self, pool_id: &str) -> PathBuf {
        self.root.join("pools").join(format!("{pool_id}.json"))
    }

    fn entries_path(&self, pool_id: &str) -> PathBuf {
        self.root.join("pools").join(pool_id).join("entries.json")
    }

    pub async fn save_pool(&self, pool: &Pool) -> Result<()> {
        write_json(&self.pool_path(&pool.id), pool).await
    }
}

impl GameStore for JsonStore {
    async fn get_games(&self, season_id: &str) -> Result<Vec<Game>> {
        Ok(read_json(&self.games_path(season_id)).await?.unwrap_or_default())
    }

    async fn save_batch(&self, games: &[Game], season_id: &str) -> Result<()> {
        let path = self.games_path(season_id);
        let mut stored: Vec<Game> = read_json(&path).await?.unwrap_or_default();
        merge_batch(&mut stored, games);
        write_json(&path, &stored).await?;
        debug!("saved {} games to season {season_id}", games.len());
        Ok(())
    }
}

impl EntryStore for JsonStore {
    async fn get_entries(&self, pool_id: &str) -> Result<Vec<BracketEntry>> {
        Ok(read_json(&self.entries_path(pool_id)).await?.unwrap_or_default())
    }

    async fn save_entry(&self, entry: &BracketEntry) -> Result<()> {
        let path = self.entries_path(&entry.pool_id);
        let mut stored: Vec<BracketEntry> = read_json(&path).await?.unwrap_or_default();
        match stored.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry.clone(),
            None => stored.push(entry.clone()),
        }
        write_json(&path, &stored).await
    }
}

impl PoolStore for JsonStore {
    async fn get_pool(&self, pool_id: &str) -> Result<Option<Pool>> {
        read_json(&self.pool_path(pool_id)).await
    }
}

/// `None` when the file does not exist yet.
async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("read {} failed", path.display())),
    };
    let value = serde_json::from_str(&content).with_context(|| format!("parse {} failed", path.display()))?;
    Ok(Some(value))
}

/// Write through a sibling temp file and rename it over the target, so readers
/// see either the old file or the new one.
async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("create dir {} failed", parent.display()))?;
    }
    let payload = serde_json::to_string_pretty(value).context("serialize failed")?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, payload)
        .await
        .with_context(|| format!("write {} failed", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("replace {} failed", path.display()))?;
    Ok(())
}
