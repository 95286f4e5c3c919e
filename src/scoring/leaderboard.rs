use crate::model::{BracketEntry, Game, LeaderboardRow, Picks, Pool};
use crate::scoring::rank::rank_rows;
use crate::scoring::{Outcomes, Tally, games_in_scope, row, tally, tiebreaker_reference};
use log::debug;

/// Score and rank every entry of a pool against the real results.
///
/// `games` should be the whole season: eliminations count from any Final
/// game, even ones outside the pool's own scope. Redacted entries come back as
/// zero rows with no tiebreaker delta.
pub fn score(games: &[Game], entries: &[BracketEntry], pool: &Pool) -> Vec<LeaderboardRow> {
    let outcomes = Outcomes::actual(games);
    let reference = tiebreaker_reference(games, pool);
    let scope = games_in_scope(games, pool);

    let mut rows: Vec<LeaderboardRow> = entries
        .iter()
        .map(|entry| match &entry.picks {
            Picks::Present(picks) => row(entry, tally(picks, &scope, &outcomes), reference),
            Picks::Redacted => row(entry, Tally::default(), None),
        })
        .collect();

    rank_rows(&mut rows, pool.tiebreak);
    debug!(
        "scored {} entries over {} games for pool {} (tiebreaker reference {:?})",
        rows.len(),
        scope.len(),
        pool.id,
        reference
    );
    rows
}
