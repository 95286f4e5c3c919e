use crate::model::{LeaderboardRow, TiebreakMetric, TiebreakOrder};
use std::cmp::Ordering;

/// Sort rows best-first and assign standard competition ranks (1, 1, 3, ...).
///
/// Order: score, the pool's primary metric, its secondary metric, then display
/// name. Rows equal on everything but the name share a rank, and a missing
/// tiebreaker delta never separates a row from the one above it.
pub fn rank_rows(rows: &mut [LeaderboardRow], order: TiebreakOrder) {
    rows.sort_by(|a, b| {
        compare_standing(a, b, order)
            .then_with(|| a.display_name.to_lowercase().cmp(&b.display_name.to_lowercase()))
            .then_with(|| a.display_name.cmp(&b.display_name))
            .then_with(|| a.entry_id.cmp(&b.entry_id))
    });

    for i in 0..rows.len() {
        rows[i].rank = if i > 0 && shares_rank(&rows[i - 1], &rows[i], order) {
            rows[i - 1].rank
        } else {
            i + 1
        };
    }
}

/// `Less` means `a` places ahead of `b`.
fn compare_standing(a: &LeaderboardRow, b: &LeaderboardRow, order: TiebreakOrder) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| compare_metric(a, b, order.primary))
        .then_with(|| compare_metric(a, b, order.secondary))
}

fn shares_rank(a: &LeaderboardRow, b: &LeaderboardRow, order: TiebreakOrder) -> bool {
    let missing_delta = a.tiebreaker_delta.is_none() || b.tiebreaker_delta.is_none();
    let tied = |metric: TiebreakMetric| match metric {
        TiebreakMetric::TiebreakerDelta if missing_delta => true,
        metric => compare_metric(a, b, metric).is_eq(),
    };
    a.score == b.score && tied(order.primary) && tied(order.secondary)
}

fn compare_metric(a: &LeaderboardRow, b: &LeaderboardRow, metric: TiebreakMetric) -> Ordering {
    match metric {
        TiebreakMetric::CorrectPicks => b.correct_picks.cmp(&a.correct_picks),
        // Once the reference is known a row with a delta is listed ahead of
        // a row without one; `shares_rank` still gives them the same rank.
        TiebreakMetric::TiebreakerDelta => match (a.tiebreaker_delta, b.tiebreaker_delta) {
            (Some(x), Some(y)) => x.cmp(&y),
            (None, None) => Ordering::Equal,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
        },
    }
}
