use crate::model::{Game, Slot, is_placeholder};
use log::warn;

/// Decide which slot of `target` the result of `source` belongs in.
///
/// `feeders` are the games whose `next_game_id` is `target.id`. With two
/// feeders the earlier kickoff takes the home slot and the later one the away
/// slot. With a single feeder the answer is read off the target's current
/// slots, so repeated calls over the same state always agree.
pub fn resolve_slot(target: &Game, source: &Game, feeders: &[&Game]) -> Slot {
    let mut ordered: Vec<&Game> = feeders.to_vec();
    ordered.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));

    if ordered.len() > 2 {
        warn!(
            "game {} is fed by {} games; only the first two kickoffs get fixed slots",
            target.id,
            ordered.len()
        );
    }

    if ordered.len() >= 2 {
        match ordered.iter().take(2).position(|g| g.id == source.id) {
            Some(0) => return Slot::Home,
            Some(_) => return Slot::Away,
            None => {}
        }
    }

    single_feeder_slot(target, source)
}

/// (a) a slot already holding something this feeder put there, (b) the open
/// slot beside a seated team, (c) home.
///
/// "Something this feeder put there" is its placeholder label or either of its
/// real participants, so a corrected result finds the team it advanced earlier.
fn single_feeder_slot(target: &Game, source: &Game) -> Slot {
    let label = source.placeholder_label();
    let mut claims: Vec<&str> = vec![label.as_str()];
    claims.extend(
        [Slot::Home, Slot::Away]
            .into_iter()
            .map(|slot| source.team(slot))
            .filter(|team| !is_placeholder(team)),
    );
    let occupied_by_source = |slot: Slot| {
        let current = target.team(slot);
        claims.iter().any(|claim| current.eq_ignore_ascii_case(claim))
    };

    if occupied_by_source(Slot::Home) {
        return Slot::Home;
    }
    if occupied_by_source(Slot::Away) {
        return Slot::Away;
    }

    match (
        is_placeholder(target.team(Slot::Home)),
        is_placeholder(target.team(Slot::Away)),
    ) {
        // Exactly one real team already seated: take the open slot.
        (false, true) => Slot::Away,
        (true, false) => Slot::Home,
        _ => Slot::Home,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::*;

    #[test]
    fn two_feeders_ordered_by_kickoff() {
        let target = game("final", "TBD", "TBD", 20);
        let mut early = final_game("semi1", "A", "B", 10, (21, 3));
        let mut late = final_game("semi2", "C", "D", 10, (7, 14));
        early.start_time = kickoff(28, 12);
        late.start_time = kickoff(28, 20);

        // Argument order must not matter.
        let feeders = [&late, &early];
        assert_eq!(resolve_slot(&target, &early, &feeders), Slot::Home);
        assert_eq!(resolve_slot(&target, &late, &feeders), Slot::Away);
    }

    #[test]
    fn same_kickoff_falls_back_to_id_order() {
        let target = game("final", "TBD", "TBD", 20);
        let a = game("a", "A", "B", 10);
        let b = game("b", "C", "D", 10);
        assert_eq!(resolve_slot(&target, &b, &[&b, &a]), Slot::Away);
        assert_eq!(resolve_slot(&target, &a, &[&b, &a]), Slot::Home);
    }

    #[test]
    fn single_feeder_keeps_slot_already_holding_its_winner() {
        let source = final_game("r1", "Oregon", "Idaho", 10, (35, 7));
        let target = game("qf", "Georgia", "oregon", 20);
        assert_eq!(resolve_slot(&target, &source, &[&source]), Slot::Away);
    }

    #[test]
    fn single_feeder_keeps_slot_holding_its_placeholder() {
        let source = game("r1", "Oregon", "Idaho", 10);
        let target = game("qf", "Georgia", "Winner of r1 Bowl", 20);
        assert_eq!(resolve_slot(&target, &source, &[&source]), Slot::Away);
    }

    #[test]
    fn single_feeder_takes_the_open_slot_next_to_a_bye() {
        let source = final_game("r1", "Oregon", "Idaho", 10, (35, 7));
        let bye_home = game("qf", "Georgia", "TBD", 20);
        assert_eq!(resolve_slot(&bye_home, &source, &[&source]), Slot::Away);

        let bye_away = game("qf", "Winner of Somewhere", "Georgia", 20);
        assert_eq!(resolve_slot(&bye_away, &source, &[&source]), Slot::Home);
    }

    #[test]
    fn single_feeder_defaults_to_home() {
        let source = final_game("r1", "Oregon", "Idaho", 10, (35, 7));
        let open = game("qf", "TBD", "TBD", 20);
        assert_eq!(resolve_slot(&open, &source, &[&source]), Slot::Home);

        let full = game("qf", "Georgia", "Texas", 20);
        assert_eq!(resolve_slot(&full, &source, &[&source]), Slot::Home);
    }

    #[test]
    fn corrected_feeder_finds_the_team_it_advanced() {
        let mut source = final_game("r1", "Oregon", "Idaho", 10, (35, 7));
        source.status = crate::model::GameStatus::InProgress;
        let target = game("qf", "Oregon", "TBD", 20);
        assert_eq!(resolve_slot(&target, &source, &[&source]), Slot::Home);
    }

    #[test]
    fn resolution_is_stable_across_calls() {
        let source = final_game("r1", "Oregon", "Idaho", 10, (35, 7));
        let mut target = game("qf", "Georgia", "TBD", 20);
        let first = resolve_slot(&target, &source, &[&source]);
        target.set_team(first, "Oregon", None);
        assert_eq!(resolve_slot(&target, &source, &[&source]), first);
    }
}
