use crate::model::{BracketEntry, Game, LeaderboardRow, Pool, Slot, is_placeholder, team_key};
use crate::scoring::rank::rank_rows;
use crate::scoring::{Outcome, Outcomes, games_in_scope, row, tally, tiebreaker_reference};
use std::collections::HashMap;

/// What the hypothetical winners are laid over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Basis {
    /// Real results stand wherever no hypothetical winner is given.
    #[default]
    Overlay,
    /// Only the hypothetical winners count; every other game is undecided.
    Replace,
}

#[derive(Debug, Clone, Default)]
pub struct Scenario {
    /// game id -> hypothetical winner
    pub winners: HashMap<String, String>,
    pub basis: Basis,
}

impl Scenario {
    pub fn overlay(winners: HashMap<String, String>) -> Self {
        Self { winners, basis: Basis::Overlay }
    }
}

fn effective_outcomes(games: &[Game], scenario: &Scenario) -> Outcomes {
    let mut outcomes = Outcomes::default();
    for game in games {
        let outcome = match scenario.winners.get(&game.id) {
            Some(winner) => Outcome::Won(winner.clone()),
            None if scenario.basis == Basis::Overlay && game.is_final() => {
                game.winner().map_or(Outcome::Void, |w| Outcome::Won(w.to_owned()))
            }
            None => Outcome::Open,
        };
        outcomes.set(&game.id, outcome);
    }

    // Eliminations need every outcome first: a slot still showing a
    // placeholder is filled by whoever its feeder game is assumed to send.
    let mut losers = Vec::new();
    for game in games {
        let Outcome::Won(winner) = outcomes.outcome(&game.id) else {
            continue;
        };
        let mut others = [Slot::Home, Slot::Away]
            .into_iter()
            .filter_map(|slot| seated_team(games, &outcomes, game, slot))
            .filter(|team| team_key(team) != team_key(winner));
        if let (Some(loser), None) = (others.next(), others.next()) {
            losers.push(loser);
        }
    }
    for loser in losers {
        outcomes.eliminate(&loser);
    }
    outcomes
}

/// The team a slot holds under the scenario, if it is known. A slot fed by
/// another game takes that game's assumed winner, which may differ from the
/// team the real result already wrote there.
fn seated_team(games: &[Game], outcomes: &Outcomes, game: &Game, slot: Slot) -> Option<String> {
    let shown = game.team(slot);
    let feeder = games.iter().find(|f| {
        f.feeds_into(&game.id)
            && (f.placeholder_label().eq_ignore_ascii_case(shown.trim())
                || [f.home_team.as_str(), f.away_team.as_str()]
                    .iter()
                    .any(|t| !is_placeholder(t) && team_key(t) == team_key(shown)))
    });
    match feeder {
        Some(feeder) => match outcomes.outcome(&feeder.id) {
            Outcome::Won(winner) if !is_placeholder(winner) => Some(winner.clone()),
            _ => None,
        },
        None if is_placeholder(shown) => None,
        None => Some(shown.to_owned()),
    }
}

/// Leaderboard under hypothetical results. Nothing passed in is modified.
///
/// Redacted entries are left out entirely. The tiebreaker reference is only
/// used when the real result of the tiebreaker game still stands.
pub fn simulate(
    games: &[Game],
    entries: &[BracketEntry],
    pool: &Pool,
    scenario: &Scenario,
) -> Vec<LeaderboardRow> {
    let outcomes = effective_outcomes(games, scenario);
    let scope = games_in_scope(games, pool);
    let reference = match (scenario.basis, pool.tiebreaker_game_id.as_deref()) {
        (Basis::Overlay, Some(id)) if !scenario.winners.contains_key(id) => {
            tiebreaker_reference(games, pool)
        }
        _ => None,
    };

    let mut rows: Vec<LeaderboardRow> = entries
        .iter()
        .filter_map(|entry| {
            let picks = entry.picks.as_map()?;
            Some(row(entry, tally(picks, &scope, &outcomes), reference))
        })
        .collect();

    rank_rows(&mut rows, pool.tiebreak);
    rows
}
