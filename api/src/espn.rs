//! ESPN scoreboard wire types. Mapped to `ExternalGame` in client.rs.
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Scoreboard  (site v2 API)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ScoreboardResponse {
    pub events: Option<Vec<EspnEvent>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnEvent {
    pub id: Option<String>,
    pub name: Option<String>,
    pub status: Option<EspnStatus>,
    pub competitions: Option<Vec<EspnCompetition>>,
    pub date: Option<String>, // ISO 8601, often without seconds ("2025-01-01T17:00Z")
}

#[derive(Debug, Deserialize, Clone)]
pub struct EspnStatus {
    #[serde(rename = "type")]
    pub status_type: Option<EspnStatusType>,
    pub period: Option<u8>,
    #[serde(rename = "displayClock")]
    pub display_clock: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EspnStatusType {
    pub name: Option<String>, // "STATUS_SCHEDULED", "STATUS_IN_PROGRESS", "STATUS_FINAL"
    pub completed: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EspnCompetition {
    pub competitors: Option<Vec<EspnCompetitor>>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EspnCompetitor {
    pub id: Option<String>,
    #[serde(rename = "homeAway")]
    pub home_away: Option<String>, // "home" | "away"
    pub team: Option<EspnTeam>,
    pub score: Option<String>, // ESPN sends scores as strings
    pub winner: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EspnTeam {
    pub id: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(rename = "shortDisplayName")]
    pub short_display_name: Option<String>,
    pub abbreviation: Option<String>,
}
