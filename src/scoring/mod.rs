//! Leaderboard scoring. Both the live leaderboard and the what-if view reduce
//! a set of games to per-game [`Outcome`]s plus an elimination set, then tally
//! every entry against them the same way.

pub mod leaderboard;
pub mod rank;
pub mod what_if;

use crate::model::{BracketEntry, Game, LeaderboardRow, Pool, is_placeholder, team_key};
use std::collections::{BTreeMap, HashMap, HashSet};

pub use leaderboard::score;
pub use what_if::{Basis, Scenario, simulate};

/// How a game stands for scoring purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Decided, with this winner.
    Won(String),
    /// Final but without a winner (tied score); pays nobody, counts for nobody.
    Void,
    /// Not decided yet.
    Open,
}

/// Per-game outcomes and the teams that can no longer win anything.
#[derive(Debug, Default)]
pub struct Outcomes {
    by_game: HashMap<String, Outcome>,
    eliminated: HashSet<String>,
}

impl Outcomes {
    /// Real results only.
    pub fn actual(games: &[Game]) -> Self {
        let mut outcomes = Self::default();
        for game in games {
            let outcome = if game.is_final() {
                game.winner().map_or(Outcome::Void, |w| Outcome::Won(w.to_owned()))
            } else {
                Outcome::Open
            };
            if let Some(loser) = game.loser() {
                outcomes.eliminate(loser);
            }
            outcomes.by_game.insert(game.id.clone(), outcome);
        }
        outcomes
    }

    pub fn outcome(&self, game_id: &str) -> &Outcome {
        self.by_game.get(game_id).unwrap_or(&Outcome::Open)
    }

    pub fn is_eliminated(&self, team: &str) -> bool {
        self.eliminated.contains(&team_key(team))
    }

    pub(crate) fn set(&mut self, game_id: &str, outcome: Outcome) {
        self.by_game.insert(game_id.to_owned(), outcome);
    }

    fn eliminate(&mut self, team: &str) {
        if !is_placeholder(team) {
            self.eliminated.insert(team_key(team));
        }
    }
}

/// Running totals for one entry.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Tally {
    pub score: u32,
    pub max_possible: u32,
    pub correct_picks: u32,
    pub round_scores: BTreeMap<crate::model::Round, u32>,
}

/// Score one set of picks against `outcomes` over the games in scope.
/// Banked points count toward the ceiling; open games count unless the
/// picked team is already out.
pub fn tally(picks: &HashMap<String, String>, games: &[&Game], outcomes: &Outcomes) -> Tally {
    let mut tally = Tally::default();
    for game in games {
        let Some(pick) = picks.get(&game.id) else {
            continue;
        };
        match outcomes.outcome(&game.id) {
            Outcome::Won(winner) => {
                if pick.trim().eq_ignore_ascii_case(winner.trim()) {
                    tally.score = tally.score.saturating_add(game.points);
                    tally.max_possible = tally.max_possible.saturating_add(game.points);
                    tally.correct_picks += 1;
                    let round = tally.round_scores.entry(game.round).or_default();
                    *round = round.saturating_add(game.points);
                }
            }
            Outcome::Void => {}
            Outcome::Open => {
                if !outcomes.is_eliminated(pick) {
                    tally.max_possible = tally.max_possible.saturating_add(game.points);
                }
            }
        }
    }
    tally
}

/// Games the pool counts, in snapshot order.
pub(crate) fn games_in_scope<'a>(games: &'a [Game], pool: &Pool) -> Vec<&'a Game> {
    games.iter().filter(|g| pool.includes(&g.id)).collect()
}

/// Combined final score of the pool's tiebreaker game, once it is Final.
pub(crate) fn tiebreaker_reference(games: &[Game], pool: &Pool) -> Option<u32> {
    let id = pool.tiebreaker_game_id.as_deref()?;
    games
        .iter()
        .find(|g| g.id == id)
        .filter(|g| g.is_final())
        .and_then(Game::combined_score)
}

pub(crate) fn row(entry: &BracketEntry, tally: Tally, reference: Option<u32>) -> LeaderboardRow {
    LeaderboardRow {
        rank: 0,
        entry_id: entry.id.clone(),
        display_name: entry.display_name.clone(),
        score: tally.score,
        max_possible: tally.max_possible,
        correct_picks: tally.correct_picks,
        round_scores: tally.round_scores,
        tiebreaker_delta: reference
            .zip(entry.tiebreaker)
            .map(|(actual, predicted)| actual.abs_diff(predicted)),
    }
}
