pub mod client;
pub mod espn;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Domain types, independent of the ESPN wire format
// ---------------------------------------------------------------------------

/// One game as reported by the external scoreboard.
///
/// Home/away here is the feed's ordering, which does not necessarily agree
/// with the local bracket's home/away slots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalGame {
    pub id: String,
    pub home_team: String,
    pub away_team: String,
    pub home_points: Option<u32>,
    pub away_points: Option<u32>,
    pub completed: bool,
    pub status_raw: String, // "STATUS_SCHEDULED", "STATUS_IN_PROGRESS", "STATUS_FINAL", ...
    pub period: Option<u8>,
    pub clock: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
}

impl ExternalGame {
    /// True when the feed says the game is being played right now.
    pub fn reports_in_progress(&self) -> bool {
        !self.completed
            && matches!(
                self.status_raw.as_str(),
                "STATUS_IN_PROGRESS" | "STATUS_HALFTIME" | "STATUS_END_PERIOD"
            )
    }

    pub fn is_halftime(&self) -> bool {
        self.status_raw == "STATUS_HALFTIME"
    }

    /// Which side of this record `team` is on, compared case-insensitively.
    pub fn side_of(&self, team: &str) -> Option<FeedSide> {
        let team = team.trim();
        if self.home_team.trim().eq_ignore_ascii_case(team) {
            Some(FeedSide::Home)
        } else if self.away_team.trim().eq_ignore_ascii_case(team) {
            Some(FeedSide::Away)
        } else {
            None
        }
    }

    pub fn points(&self, side: FeedSide) -> Option<u32> {
        match side {
            FeedSide::Home => self.home_points,
            FeedSide::Away => self.away_points,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSide {
    Home,
    Away,
}

impl FeedSide {
    pub fn other(self) -> Self {
        match self {
            FeedSide::Home => FeedSide::Away,
            FeedSide::Away => FeedSide::Home,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game() -> ExternalGame {
        ExternalGame {
            id: "401".into(),
            home_team: "Georgia Bulldogs".into(),
            away_team: "Texas Longhorns".into(),
            home_points: Some(21),
            away_points: Some(17),
            status_raw: "STATUS_IN_PROGRESS".into(),
            ..Default::default()
        }
    }

    #[test]
    fn side_of_matches_either_side_ignoring_case() {
        let g = game();
        assert_eq!(g.side_of("texas longhorns"), Some(FeedSide::Away));
        assert_eq!(g.side_of("GEORGIA BULLDOGS "), Some(FeedSide::Home));
        assert_eq!(g.side_of("Alabama"), None);
        assert_eq!(g.points(FeedSide::Away), Some(17));
        assert_eq!(FeedSide::Away.other(), FeedSide::Home);
    }

    #[test]
    fn completed_game_is_not_in_progress() {
        let mut g = game();
        assert!(g.reports_in_progress());
        g.completed = true;
        assert!(!g.reports_in_progress());
    }
}
