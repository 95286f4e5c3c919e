use crate::bracket::{self, PendingBatch, propagate};
use crate::guard::{check_display_name, check_edit, existing_entry, redact_for_viewer};
use crate::model::{BracketEntry, Game, LeaderboardRow, Pool};
use crate::scoring::{self, Scenario};
use crate::state::refresher::{RefreshCoordinator, RefreshOutcome};
use crate::state::scoreboard::apply_scoreboard;
use crate::store::{EntryStore, GameStore, PoolStore, ScoreFeed};
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use futures_util::future::try_join;
use log::{debug, info};

/// Ties the stores, the score feed and one refresh coordinator together.
/// Everything the CLI does goes through here.
pub struct PoolService<S, F> {
    store: S,
    feed: F,
    refresh: RefreshCoordinator,
}

impl<S, F> PoolService<S, F>
where
    S: GameStore + EntryStore + PoolStore,
    F: ScoreFeed,
{
    pub fn new(store: S, feed: F, refresh: RefreshCoordinator) -> Self {
        Self { store, feed, refresh }
    }

    async fn pool(&self, pool_id: &str) -> Result<Pool> {
        self.store
            .get_pool(pool_id)
            .await?
            .ok_or_else(|| anyhow!("unknown pool {pool_id}"))
    }

    async fn pool_snapshot(&self, pool_id: &str) -> Result<(Pool, Vec<Game>, Vec<BracketEntry>)> {
        let pool = self.pool(pool_id).await?;
        let (games, entries) =
            try_join(self.store.get_games(&pool.season_id), self.store.get_entries(pool_id)).await?;
        Ok((pool, games, entries))
    }

    pub async fn leaderboard(&self, pool_id: &str) -> Result<Vec<LeaderboardRow>> {
        let (pool, games, entries) = self.pool_snapshot(pool_id).await?;
        Ok(scoring::score(&games, &entries, &pool))
    }

    pub async fn simulate(&self, pool_id: &str, scenario: &Scenario) -> Result<Vec<LeaderboardRow>> {
        let (pool, games, entries) = self.pool_snapshot(pool_id).await?;
        Ok(scoring::simulate(&games, &entries, &pool, scenario))
    }

    /// Re-run propagation for every Final game of a season and save whatever
    /// it changed.
    pub async fn force_propagate_all(&self, season_id: &str) -> Result<PendingBatch> {
        let games = self.store.get_games(season_id).await?;
        let batch = bracket::force_propagate_all(&games);
        self.commit(&batch, season_id).await?;
        Ok(batch)
    }

    /// Pull the external scoreboard into a season, at most once per refresh
    /// interval.
    pub async fn refresh_scores(&self, season_id: &str) -> RefreshOutcome<PendingBatch> {
        self.refresh
            .run_if_due(move || async move {
                let (external, games) =
                    try_join(self.feed.get_scoreboard(), self.store.get_games(season_id)).await?;
                let batch = apply_scoreboard(&games, &external, Utc::now());
                self.commit(&batch, season_id).await?;
                Ok::<_, anyhow::Error>(batch)
            })
            .await
    }

    /// Store an admin's update of one game, including corrections, together
    /// with everything it changes downstream.
    pub async fn record_result(&self, game: Game) -> Result<PendingBatch> {
        let games = self.store.get_games(&game.season_id).await?;
        if !games.iter().any(|g| g.id == game.id) {
            return Err(anyhow!("unknown game {} in season {}", game.id, game.season_id));
        }

        let mut batch = PendingBatch::new();
        batch.upsert(game.clone());
        propagate(&game, &games, &mut batch);
        self.commit(&batch, &game.season_id).await?;
        Ok(batch)
    }

    pub async fn submit_entry(&self, proposed: BracketEntry, is_admin: bool, now: DateTime<Utc>) -> Result<BracketEntry> {
        let (pool, entries) =
            try_join(self.pool(&proposed.pool_id), self.store.get_entries(&proposed.pool_id)).await?;
        let existing = existing_entry(&entries, &proposed)?;

        check_edit(&pool, existing, &proposed, is_admin, now)?;
        check_display_name(&entries, &proposed)?;

        self.store
            .save_entry(&proposed)
            .await
            .with_context(|| format!("saving entry {}", proposed.id))?;
        info!("entry {} saved to pool {}", proposed.id, pool.id);
        Ok(proposed)
    }

    pub async fn entries_for(
        &self,
        pool_id: &str,
        viewer: Option<&str>,
        is_admin: bool,
        now: DateTime<Utc>,
    ) -> Result<Vec<BracketEntry>> {
        let (pool, entries) = try_join(self.pool(pool_id), self.store.get_entries(pool_id)).await?;
        Ok(redact_for_viewer(entries, &pool, viewer, is_admin, now))
    }

    async fn commit(&self, batch: &PendingBatch, season_id: &str) -> Result<()> {
        if batch.is_empty() {
            debug!("nothing to save for season {season_id}");
            return Ok(());
        }
        self.store
            .save_batch(batch.games(), season_id)
            .await
            .with_context(|| format!("saving {} games to season {season_id}", batch.len()))?;
        info!("saved {} games to season {season_id}", batch.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::EditRejection;
    use crate::model::GameStatus;
    use crate::model::fixtures::*;
    use cfb_api::ExternalGame;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MemoryStore {
        games: Mutex<Vec<Game>>,
        entries: Mutex<Vec<BracketEntry>>,
        pools: Vec<Pool>,
        batches: AtomicUsize,
    }

    impl GameStore for MemoryStore {
        async fn get_games(&self, season_id: &str) -> Result<Vec<Game>> {
            let games = self.games.lock().unwrap();
            Ok(games.iter().filter(|g| g.season_id == season_id).cloned().collect())
        }

        async fn save_batch(&self, batch: &[Game], _season_id: &str) -> Result<()> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            bracket::merge_batch(&mut self.games.lock().unwrap(), batch);
            Ok(())
        }
    }

    impl EntryStore for MemoryStore {
        async fn get_entries(&self, pool_id: &str) -> Result<Vec<BracketEntry>> {
            let entries = self.entries.lock().unwrap();
            Ok(entries.iter().filter(|e| e.pool_id == pool_id).cloned().collect())
        }

        async fn save_entry(&self, entry: &BracketEntry) -> Result<()> {
            let mut entries = self.entries.lock().unwrap();
            entries.retain(|e| e.id != entry.id);
            entries.push(entry.clone());
            Ok(())
        }
    }

    impl PoolStore for MemoryStore {
        async fn get_pool(&self, pool_id: &str) -> Result<Option<Pool>> {
            Ok(self.pools.iter().find(|p| p.id == pool_id).cloned())
        }
    }

    struct FixedFeed(Vec<ExternalGame>);

    impl ScoreFeed for FixedFeed {
        async fn get_scoreboard(&self) -> Result<Vec<ExternalGame>> {
            Ok(self.0.clone())
        }
    }

    struct DownFeed;

    impl ScoreFeed for DownFeed {
        async fn get_scoreboard(&self) -> Result<Vec<ExternalGame>> {
            Err(anyhow!("connection refused"))
        }
    }

    fn season() -> Vec<Game> {
        let mut g1 = game("g1", "Home", "Away", 10);
        g1.next_game_id = Some("g3".into());
        g1.external_id = Some("ext-g1".into());
        let mut g2 = game("g2", "C", "D", 10);
        g2.next_game_id = Some("g3".into());
        g2.start_time = kickoff(21, 12);
        let g3 = game("g3", "Winner of g1 Bowl", "Winner of g2 Bowl", 20);
        vec![g1, g2, g3]
    }

    fn service<F: ScoreFeed>(feed: F) -> PoolService<MemoryStore, F> {
        let store = MemoryStore {
            games: Mutex::new(season()),
            entries: Mutex::new(vec![entry("a", &[("g1", "Home")], Some(30)), entry("b", &[("g1", "Away")], None)]),
            pools: vec![pool()],
            ..Default::default()
        };
        PoolService::new(store, feed, RefreshCoordinator::default())
    }

    fn stored(service: &PoolService<MemoryStore, impl ScoreFeed>, id: &str) -> Game {
        let games = service.store.games.lock().unwrap();
        games.iter().find(|g| g.id == id).cloned().unwrap()
    }

    #[tokio::test]
    async fn record_result_saves_the_game_and_its_cascade() {
        let service = service(FixedFeed(vec![]));
        let mut g1 = stored(&service, "g1");
        g1.status = GameStatus::Final;
        g1.home_score = Some(28);
        g1.away_score = Some(14);

        let batch = service.record_result(g1.clone()).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(stored(&service, "g3").home_team, "Home");

        let rows = service.leaderboard("pool").await.unwrap();
        assert_eq!(rows[0].entry_id, "a");
        assert_eq!(rows[0].score, 10);

        // Correcting the score reverts the downstream slot.
        g1.status = GameStatus::InProgress;
        service.record_result(g1).await.unwrap();
        assert_eq!(stored(&service, "g3").home_team, "Winner of g1 Bowl");
    }

    #[tokio::test]
    async fn unknown_pool_and_game_are_errors() {
        let service = service(FixedFeed(vec![]));
        assert!(service.leaderboard("nope").await.is_err());
        assert!(service.record_result(game("ghost", "A", "B", 1)).await.is_err());
    }

    #[tokio::test]
    async fn refresh_applies_feed_and_is_throttled() {
        let feed = FixedFeed(vec![ExternalGame {
            id: "ext-g1".into(),
            home_team: "Home".into(),
            away_team: "Away".into(),
            home_points: Some(3),
            away_points: Some(17),
            completed: true,
            status_raw: "STATUS_FINAL".into(),
            period: Some(4),
            ..Default::default()
        }]);
        let service = service(feed);

        let RefreshOutcome::Refreshed(batch) = service.refresh_scores("2024").await else {
            panic!("first refresh should run");
        };
        assert!(batch.contains("g1") && batch.contains("g3"));
        assert_eq!(stored(&service, "g1").status_detail.as_deref(), Some("Final"));
        assert_eq!(stored(&service, "g3").home_team, "Away");

        assert!(matches!(service.refresh_scores("2024").await, RefreshOutcome::Throttled));
        assert_eq!(service.store.batches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_refresh_saves_nothing() {
        let service = service(DownFeed);
        let outcome = service.refresh_scores("2024").await;
        assert!(matches!(outcome, RefreshOutcome::Failed(msg) if msg.contains("connection refused")));
        assert_eq!(service.store.batches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn force_propagate_all_is_idempotent() {
        let service = service(FixedFeed(vec![]));
        {
            let mut games = service.store.games.lock().unwrap();
            games[1].status = GameStatus::Final;
            games[1].home_score = Some(1);
            games[1].away_score = Some(2);
        }
        let first = service.force_propagate_all("2024").await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(stored(&service, "g3").away_team, "D");

        let second = service.force_propagate_all("2024").await.unwrap();
        assert!(second.is_empty());
        assert_eq!(service.store.batches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn submit_entry_runs_the_guard() {
        let service = service(FixedFeed(vec![]));
        let before_lock = kickoff(10, 0);
        let after_lock = kickoff(15, 0);

        let fresh = entry("c", &[("g1", "Home")], None);
        service.submit_entry(fresh.clone(), false, before_lock).await.unwrap();

        let late = entry("d", &[], None);
        let err = service.submit_entry(late.clone(), false, after_lock).await.unwrap_err();
        assert_eq!(err.downcast_ref::<EditRejection>(), Some(&EditRejection::NewEntryAfterLock));
        service.submit_entry(late, true, after_lock).await.unwrap();

        let mut clash = entry("e", &[], None);
        clash.display_name = "A".into();
        let err = service.submit_entry(clash, false, before_lock).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<EditRejection>(), Some(EditRejection::DisplayNameTaken(_))));
    }

    #[tokio::test]
    async fn another_user_cannot_take_over_an_entry() {
        let service = service(FixedFeed(vec![]));
        let original = service.store.entries.lock().unwrap().iter().find(|e| e.id == "a").cloned().unwrap();

        let mut takeover = original.clone();
        takeover.user_id = "user-b".into();
        takeover.display_name = "Mallory".into();
        for (admin, at) in [(false, kickoff(10, 0)), (false, kickoff(15, 0)), (true, kickoff(15, 0))] {
            let err = service.submit_entry(takeover.clone(), admin, at).await.unwrap_err();
            assert_eq!(err.downcast_ref::<EditRejection>(), Some(&EditRejection::NotYourEntry));
        }

        let stored = service.store.entries.lock().unwrap().iter().find(|e| e.id == "a").cloned().unwrap();
        assert_eq!(stored, original);
    }

    #[tokio::test]
    async fn entries_are_redacted_for_other_viewers_before_lock() {
        let service = service(FixedFeed(vec![]));
        let view = service.entries_for("pool", Some("user-a"), false, kickoff(10, 0)).await.unwrap();
        let hidden: HashMap<&str, bool> = view.iter().map(|e| (e.id.as_str(), e.picks.is_redacted())).collect();
        assert_eq!(hidden, HashMap::from([("a", false), ("b", true)]));
    }

    #[tokio::test]
    async fn simulate_uses_the_stored_snapshot() {
        let service = service(FixedFeed(vec![]));
        let scenario = Scenario::overlay(HashMap::from([("g1".to_string(), "Away".to_string())]));
        let rows = service.simulate("pool", &scenario).await.unwrap();
        assert_eq!(rows[0].entry_id, "b");
        assert_eq!(rows[0].score, 10);
    }
}
