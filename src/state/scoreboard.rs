use crate::bracket::{PendingBatch, propagate};
use crate::model::{Game, GameStatus};
use cfb_api::{ExternalGame, FeedSide};
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use std::collections::HashMap;

/// A game counts as started this long before its scheduled kickoff.
pub const KICKOFF_WINDOW_MINUTES: i64 = 15;

/// Fold an external scoreboard into the local games of a season.
///
/// Only games that are not yet Final and carry an `external_id` are touched.
/// Every game whose score, status or status detail changes is queued together
/// with everything its new state propagates into.
pub fn apply_scoreboard(games: &[Game], external: &[ExternalGame], now: DateTime<Utc>) -> PendingBatch {
    let by_id: HashMap<&str, &ExternalGame> = external.iter().map(|e| (e.id.as_str(), e)).collect();

    let mut tracked: Vec<&Game> = games
        .iter()
        .filter(|g| !g.is_final() && g.external_id.is_some())
        .collect();
    tracked.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));

    let mut batch = PendingBatch::new();
    for game in tracked {
        let Some(ext) = game.external_id.as_deref().and_then(|id| by_id.get(id)) else {
            debug!("game {} not on the scoreboard", game.id);
            continue;
        };

        // An earlier update may already have seated teams in this game.
        let current = batch.get(&game.id).cloned().unwrap_or_else(|| game.clone());
        let Some(updated) = reconcile(&current, ext, now) else {
            continue;
        };
        if !scoreline_changed(&current, &updated) {
            continue;
        }

        debug!(
            "game {} now {:?} {:?}-{:?} ({})",
            updated.id,
            updated.status,
            updated.home_score,
            updated.away_score,
            updated.status_detail.as_deref().unwrap_or("-")
        );
        batch.upsert(updated.clone());
        propagate(&updated, games, &mut batch);
    }
    batch
}

/// The local game with the feed's view applied, or `None` when the feed's
/// teams cannot be lined up with the local ones.
fn reconcile(game: &Game, ext: &ExternalGame, now: DateTime<Utc>) -> Option<Game> {
    let home_side = local_home_side(game, ext)?;

    let mut updated = game.clone();
    updated.home_score = ext.points(home_side).or(game.home_score);
    updated.away_score = ext.points(home_side.other()).or(game.away_score);

    let kickoff_window = game.start_time - Duration::minutes(KICKOFF_WINDOW_MINUTES);
    updated.status = if ext.completed {
        GameStatus::Final
    } else if ext.reports_in_progress() || now >= kickoff_window {
        GameStatus::InProgress
    } else {
        game.status
    };

    if let Some(detail) = status_detail(ext) {
        updated.status_detail = Some(detail);
    }
    Some(updated)
}

/// Which feed side holds the local home team. Team order is not guaranteed to
/// agree between the two systems, so the recorded feed names decide; without
/// any recorded name the feed's order is taken as-is.
fn local_home_side(game: &Game, ext: &ExternalGame) -> Option<FeedSide> {
    let side = match (&game.external_home_team, &game.external_away_team) {
        (Some(home), _) => ext.side_of(home),
        (None, Some(away)) => ext.side_of(away).map(FeedSide::other),
        (None, None) => Some(FeedSide::Home),
    };
    if side.is_none() {
        warn!(
            "game {}: recorded feed teams {:?}/{:?} match neither side of {} ({} vs {})",
            game.id,
            game.external_home_team,
            game.external_away_team,
            ext.id,
            ext.home_team,
            ext.away_team
        );
    }
    side
}

fn scoreline_changed(before: &Game, after: &Game) -> bool {
    before.home_score != after.home_score
        || before.away_score != after.away_score
        || before.status != after.status
        || before.status_detail != after.status_detail
}

/// "Q3 4:12", "Halftime", "OT 0:45", "Final/OT" and so on.
fn status_detail(ext: &ExternalGame) -> Option<String> {
    if ext.completed {
        let overtime = ext.period.is_some_and(|p| p > 4);
        return Some(if overtime { "Final/OT" } else { "Final" }.to_owned());
    }
    if ext.is_halftime() {
        return Some("Halftime".to_owned());
    }
    let period = ext.period.filter(|&p| p > 0).map(period_label)?;
    match ext.clock.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(clock) => Some(format!("{period} {clock}")),
        None => Some(period),
    }
}

fn period_label(period: u8) -> String {
    match period {
        1..=4 => format!("Q{period}"),
        5 => "OT".to_owned(),
        n => format!("{}OT", n - 4),
    }
}
