use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const TBD: &str = "TBD";
const WINNER_OF: &str = "winner of ";

// ---------------------------------------------------------------------------
// Games
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    #[default]
    Scheduled,
    InProgress,
    Final,
}

/// Round tag used for display subtotals. Ordered from earliest to latest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Round {
    #[default]
    Standard, // non-playoff bowls
    Round1,
    QuarterFinal,
    SemiFinal,
    Championship,
}

/// The two team slots of a game. `Home` is the first slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Home,
    Away,
}

impl Slot {
    pub fn other(self) -> Self {
        match self {
            Slot::Home => Slot::Away,
            Slot::Away => Slot::Home,
        }
    }
}

/// One bracket node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub season_id: String,
    pub bowl_name: String,
    pub home_team: String, // real name, "Winner of {bowl}" or "TBD"
    pub away_team: String,
    pub home_seed: Option<u8>,
    pub away_seed: Option<u8>,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    #[serde(default)]
    pub status: GameStatus,
    pub status_detail: Option<String>,
    pub points: u32,
    #[serde(default)]
    pub round: Round,
    pub start_time: DateTime<Utc>,
    pub next_game_id: Option<String>,
    pub external_id: Option<String>,
    pub external_home_team: Option<String>,
    pub external_away_team: Option<String>,
}

impl Game {
    pub fn is_final(&self) -> bool {
        self.status == GameStatus::Final
    }

    /// Slot holding the winner. Only Final games with two scores have one,
    /// and equal scores decide nothing.
    pub fn winning_slot(&self) -> Option<Slot> {
        if !self.is_final() {
            return None;
        }
        let (home, away) = (self.home_score?, self.away_score?);
        match home.cmp(&away) {
            std::cmp::Ordering::Greater => Some(Slot::Home),
            std::cmp::Ordering::Less => Some(Slot::Away),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn winner(&self) -> Option<&str> {
        self.winning_slot().map(|slot| self.team(slot))
    }

    pub fn loser(&self) -> Option<&str> {
        self.winning_slot().map(|slot| self.team(slot.other()))
    }

    pub fn team(&self, slot: Slot) -> &str {
        match slot {
            Slot::Home => &self.home_team,
            Slot::Away => &self.away_team,
        }
    }

    pub fn seed(&self, slot: Slot) -> Option<u8> {
        match slot {
            Slot::Home => self.home_seed,
            Slot::Away => self.away_seed,
        }
    }

    /// Write a team (and its seed) into a slot. Returns true if anything changed.
    pub fn set_team(&mut self, slot: Slot, name: &str, seed: Option<u8>) -> bool {
        let (team, team_seed) = match slot {
            Slot::Home => (&mut self.home_team, &mut self.home_seed),
            Slot::Away => (&mut self.away_team, &mut self.away_seed),
        };
        if team == name && *team_seed == seed {
            return false;
        }
        *team = name.to_owned();
        *team_seed = seed;
        true
    }

    /// What a downstream slot shows while this game is undecided.
    pub fn placeholder_label(&self) -> String {
        format!("Winner of {}", self.bowl_name)
    }

    pub fn combined_score(&self) -> Option<u32> {
        self.home_score?.checked_add(self.away_score?)
    }

    pub fn feeds_into(&self, game_id: &str) -> bool {
        self.next_game_id.as_deref() == Some(game_id)
    }
}

/// True for "TBD", "Winner of ..." and empty slot values.
pub fn is_placeholder(name: &str) -> bool {
    let name = name.trim();
    name.is_empty()
        || name.eq_ignore_ascii_case(TBD)
        || name
            .get(..WINNER_OF.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(WINNER_OF))
}

/// Case-insensitive comparison key for team names.
pub fn team_key(name: &str) -> String {
    name.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// A participant's picks. `Redacted` (serialized as `null`) is a hidden entry,
/// which is not the same thing as an entry with no picks made yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<HashMap<String, String>>", into = "Option<HashMap<String, String>>")]
pub enum Picks {
    Present(HashMap<String, String>),
    #[default]
    Redacted,
}

impl From<Option<HashMap<String, String>>> for Picks {
    fn from(map: Option<HashMap<String, String>>) -> Self {
        map.map_or(Picks::Redacted, Picks::Present)
    }
}

impl From<Picks> for Option<HashMap<String, String>> {
    fn from(picks: Picks) -> Self {
        match picks {
            Picks::Present(map) => Some(map),
            Picks::Redacted => None,
        }
    }
}

impl Picks {
    pub fn as_map(&self) -> Option<&HashMap<String, String>> {
        match self {
            Picks::Present(map) => Some(map),
            Picks::Redacted => None,
        }
    }

    pub fn is_redacted(&self) -> bool {
        matches!(self, Picks::Redacted)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketEntry {
    pub id: String,
    pub pool_id: String,
    pub season_id: String,
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub picks: Picks,
    pub tiebreaker: Option<u32>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Pools
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TiebreakMetric {
    CorrectPicks,
    TiebreakerDelta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TiebreakOrder {
    pub primary: TiebreakMetric,
    pub secondary: TiebreakMetric,
}

impl Default for TiebreakOrder {
    fn default() -> Self {
        Self {
            primary: TiebreakMetric::CorrectPicks,
            secondary: TiebreakMetric::TiebreakerDelta,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub id: String,
    pub season_id: String,
    #[serde(default)]
    pub name: String,
    pub lock_date: DateTime<Utc>,
    #[serde(default)]
    pub concluded: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub tiebreak: TiebreakOrder,
    pub tiebreaker_game_id: Option<String>,
    /// Games counted by this pool. `None` means every game in the season.
    pub game_ids: Option<Vec<String>>,
}

impl Pool {
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        now >= self.lock_date
    }

    pub fn is_closed(&self) -> bool {
        self.concluded || self.archived
    }

    pub fn includes(&self, game_id: &str) -> bool {
        self.game_ids
            .as_ref()
            .is_none_or(|ids| ids.iter().any(|id| id == game_id))
    }
}

// ---------------------------------------------------------------------------
// Leaderboard
// ---------------------------------------------------------------------------

/// One ranked line of a leaderboard. Recomputed on every query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub entry_id: String,
    pub display_name: String,
    pub score: u32,
    pub max_possible: u32,
    pub correct_picks: u32,
    pub round_scores: BTreeMap<Round, u32>,
    pub tiebreaker_delta: Option<u32>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    pub fn kickoff(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, day, hour, 0, 0).unwrap()
    }

    pub fn game(id: &str, home: &str, away: &str, points: u32) -> Game {
        Game {
            id: id.into(),
            season_id: "2024".into(),
            bowl_name: format!("{id} Bowl"),
            home_team: home.into(),
            away_team: away.into(),
            home_seed: None,
            away_seed: None,
            home_score: None,
            away_score: None,
            status: GameStatus::Scheduled,
            status_detail: None,
            points,
            round: Round::Standard,
            start_time: kickoff(20, 12),
            next_game_id: None,
            external_id: None,
            external_home_team: None,
            external_away_team: None,
        }
    }

    pub fn final_game(id: &str, home: &str, away: &str, points: u32, score: (u32, u32)) -> Game {
        Game {
            home_score: Some(score.0),
            away_score: Some(score.1),
            status: GameStatus::Final,
            ..game(id, home, away, points)
        }
    }

    pub fn entry(id: &str, picks: &[(&str, &str)], tiebreaker: Option<u32>) -> BracketEntry {
        BracketEntry {
            id: id.into(),
            pool_id: "pool".into(),
            season_id: "2024".into(),
            user_id: format!("user-{id}"),
            display_name: id.into(),
            picks: Picks::Present(
                picks
                    .iter()
                    .map(|(g, t)| (g.to_string(), t.to_string()))
                    .collect(),
            ),
            tiebreaker,
            created_at: kickoff(1, 0),
        }
    }

    pub fn pool() -> Pool {
        Pool {
            id: "pool".into(),
            season_id: "2024".into(),
            name: "Office Pool".into(),
            lock_date: kickoff(14, 0),
            concluded: false,
            archived: false,
            tiebreak: TiebreakOrder::default(),
            tiebreaker_game_id: None,
            game_ids: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn winner_requires_final_and_distinct_scores() {
        let mut g = final_game("g1", "Home", "Away", 10, (10, 5));
        assert_eq!(g.winner(), Some("Home"));
        assert_eq!(g.loser(), Some("Away"));

        g.away_score = Some(10);
        assert_eq!(g.winner(), None, "a tie has no winner");

        g.away_score = Some(14);
        g.status = GameStatus::InProgress;
        assert_eq!(g.winner(), None, "only Final games have a winner");
    }

    #[test]
    fn placeholders_are_recognised() {
        assert!(is_placeholder("TBD"));
        assert!(is_placeholder("tbd"));
        assert!(is_placeholder("Winner of Rose Bowl"));
        assert!(is_placeholder("winner of Sugar Bowl"));
        assert!(is_placeholder("  "));
        assert!(!is_placeholder("Winnipeg"));
        assert!(!is_placeholder("Georgia"));
    }

    #[test]
    fn combined_score_needs_both_scores_and_never_overflows() {
        let mut g = final_game("g1", "Home", "Away", 10, (21, 14));
        assert_eq!(g.combined_score(), Some(35));
        g.away_score = None;
        assert_eq!(g.combined_score(), None);
        g.away_score = Some(u32::MAX);
        assert_eq!(g.combined_score(), None);
    }

    #[test]
    fn set_team_reports_changes_only() {
        let mut g = game("g1", "TBD", "TBD", 10);
        assert!(g.set_team(Slot::Away, "Georgia", Some(2)));
        assert!(!g.set_team(Slot::Away, "Georgia", Some(2)));
        assert!(g.set_team(Slot::Away, "Georgia", None));
        assert_eq!(g.team(Slot::Away), "Georgia");
        assert_eq!(g.team(Slot::Home), "TBD");
    }

    #[test]
    fn picks_serialize_as_object_or_null() {
        let e = entry("a", &[("g1", "Home")], Some(30));
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["picks"]["g1"], "Home");

        let mut hidden = e.clone();
        hidden.picks = Picks::Redacted;
        let json = serde_json::to_value(&hidden).unwrap();
        assert!(json["picks"].is_null());

        let back: BracketEntry = serde_json::from_value(json).unwrap();
        assert!(back.picks.is_redacted());
    }

    #[test]
    fn empty_picks_are_not_redacted() {
        let e = entry("a", &[], None);
        assert!(!e.picks.is_redacted());
        assert_eq!(e.picks.as_map().map(|m| m.len()), Some(0));
    }

    #[test]
    fn pool_scope_defaults_to_every_game() {
        let mut p = pool();
        assert!(p.includes("anything"));
        p.game_ids = Some(vec!["g1".into()]);
        assert!(p.includes("g1"));
        assert!(!p.includes("g2"));
    }
}
