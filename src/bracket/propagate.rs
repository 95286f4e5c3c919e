use crate::bracket::slots::resolve_slot;
use crate::model::Game;
use log::{debug, warn};
use std::collections::HashMap;

/// Games touched by one propagation pass, in first-touched order, each at most
/// once. Later writes to a game replace its entry in place.
#[derive(Debug, Default, Clone)]
pub struct PendingBatch {
    games: Vec<Game>,
    index: HashMap<String, usize>,
}

impl PendingBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, game_id: &str) -> Option<&Game> {
        self.index.get(game_id).map(|&i| &self.games[i])
    }

    pub fn contains(&self, game_id: &str) -> bool {
        self.index.contains_key(game_id)
    }

    /// Insert or replace by id. Returns true when the game was not yet queued.
    pub fn upsert(&mut self, game: Game) -> bool {
        match self.index.get(&game.id) {
            Some(&i) => {
                self.games[i] = game;
                false
            }
            None => {
                self.index.insert(game.id.clone(), self.games.len());
                self.games.push(game);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn games(&self) -> &[Game] {
        &self.games
    }
}

/// Push the result (or the un-result) of `game` into the game it feeds, and
/// onwards for as long as something actually changes.
///
/// `context` is the full season snapshot; copies already in `batch` win over
/// it so a cascade sees its own earlier writes.
pub fn propagate(game: &Game, context: &[Game], batch: &mut PendingBatch) {
    propagate_at_depth(game, context, batch, 0);
}

fn propagate_at_depth(game: &Game, context: &[Game], batch: &mut PendingBatch, depth: usize) {
    let Some(next_id) = game.next_game_id.as_deref() else {
        return;
    };

    // A forest cannot be deeper than it has games.
    if depth > context.len() {
        warn!("propagation from {} exceeded bracket depth; feeds-into cycle?", game.id);
        return;
    }

    let Some(mut target) = batch
        .get(next_id)
        .or_else(|| context.iter().find(|g| g.id == next_id))
        .cloned()
    else {
        warn!("game {} feeds into unknown game {next_id}; skipping", game.id);
        return;
    };

    let feeders: Vec<&Game> = context.iter().filter(|g| g.feeds_into(next_id)).collect();
    let slot = resolve_slot(&target, game, &feeders);

    let changed = match game.winning_slot() {
        Some(won) => target.set_team(slot, game.team(won), game.seed(won)),
        None => target.set_team(slot, &game.placeholder_label(), None),
    };

    if !changed {
        return;
    }

    debug!(
        "{} -> {} {:?} slot now {:?}",
        game.id,
        target.id,
        slot,
        target.team(slot)
    );
    batch.upsert(target.clone());
    propagate_at_depth(&target, context, batch, depth + 1);
}

/// Re-run propagation for every Final game of a season, earliest kickoff first
/// so feeders settle before the games they feed. Running it over an already
/// consistent bracket yields an empty batch.
pub fn force_propagate_all(games: &[Game]) -> PendingBatch {
    let mut finals: Vec<&Game> = games.iter().filter(|g| g.is_final()).collect();
    finals.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));

    let mut batch = PendingBatch::new();
    for game in finals {
        // Earlier passes may have seated new teams in this game.
        let current = batch.get(&game.id).cloned().unwrap_or_else(|| game.clone());
        propagate(&current, games, &mut batch);
    }
    batch
}

/// Fold updated games back into a snapshot. Unknown ids are appended.
pub fn merge_batch(games: &mut Vec<Game>, updates: &[Game]) {
    for update in updates {
        match games.iter_mut().find(|g| g.id == update.id) {
            Some(game) => *game = update.clone(),
            None => games.push(update.clone()),
        }
    }
}
