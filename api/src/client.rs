use crate::ExternalGame;
use crate::espn::{EspnCompetitor, EspnEvent, ScoreboardResponse};
use chrono::{DateTime, NaiveDateTime, Utc};
use log::debug;
use reqwest::Client;
use std::fmt;
use std::time::Duration;

pub type ApiResult<T> = Result<T, ApiError>;

pub const ESPN_CFB_SITE_V2: &str =
    "https://site.api.espn.com/apis/site/v2/sports/football/college-football";

/// Scoreboard client backed by ESPN's public college-football endpoints.
#[derive(Debug, Clone)]
pub struct CfbApi {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl Default for CfbApi {
    fn default() -> Self {
        Self::with_base_url(ESPN_CFB_SITE_V2)
    }
}

#[derive(Debug)]
pub enum ApiError {
    Network(reqwest::Error, String),
    Api(reqwest::Error, String),
    Parsing(reqwest::Error, String),
    Other(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(e, url) => write!(f, "Network error for {url}: {e}"),
            ApiError::Api(e, url) => write!(f, "API error for {url}: {e}"),
            ApiError::Parsing(e, url) => write!(f, "Parse error for {url}: {e}"),
            ApiError::Other(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl CfbApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the client at another host serving the same API shape.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .user_agent("bowlpool/0.1 (bracket pool scorer)")
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Fetch the postseason (bowl) scoreboard.
    /// groups=80 filters to FBS, seasontype=3 to the postseason.
    pub async fn fetch_scoreboard(&self) -> ApiResult<Vec<ExternalGame>> {
        let url = format!(
            "{}/scoreboard?groups=80&seasontype=3&limit=300",
            self.base_url
        );
        let raw: ScoreboardResponse = self.get(&url).await?;
        let games: Vec<ExternalGame> = raw
            .events
            .unwrap_or_default()
            .iter()
            .filter_map(map_event)
            .collect();
        debug!("scoreboard returned {} games", games.len());
        Ok(games)
    }

    async fn get<T: Default + serde::de::DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.to_owned()))?;

        match response.error_for_status() {
            Ok(res) => res
                .json::<T>()
                .await
                .map_err(|e| ApiError::Parsing(e, url.to_owned())),
            Err(e) => {
                if e.status().map(|s| s.is_client_error()).unwrap_or(false) {
                    Ok(T::default())
                } else {
                    Err(ApiError::Api(e, url.to_owned()))
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Mapping: ESPN wire types → clean domain types
// ---------------------------------------------------------------------------

/// Events without an id or without both competitors are skipped; there is
/// nothing to reconcile them against.
fn map_event(event: &EspnEvent) -> Option<ExternalGame> {
    let id = event.id.clone().filter(|id| !id.is_empty())?;

    let competitors: Vec<&EspnCompetitor> = event
        .competitions
        .as_deref()
        .unwrap_or_default()
        .iter()
        .flat_map(|c| c.competitors.iter().flatten())
        .collect();

    let home = competitors
        .iter()
        .find(|c| c.home_away.as_deref() == Some("home"))
        .or_else(|| competitors.first())?;
    let away = competitors
        .iter()
        .find(|c| c.home_away.as_deref() == Some("away"))
        .or_else(|| competitors.get(1))?;

    let status_type = event.status.as_ref().and_then(|s| s.status_type.as_ref());
    let status_raw = status_type
        .and_then(|t| t.name.clone())
        .unwrap_or_else(|| "STATUS_SCHEDULED".into());
    let completed = status_type
        .and_then(|t| t.completed)
        .unwrap_or_else(|| status_raw.starts_with("STATUS_FINAL"));

    Some(ExternalGame {
        id,
        home_team: team_name(home),
        away_team: team_name(away),
        home_points: parse_score(home),
        away_points: parse_score(away),
        completed,
        status_raw,
        period: event.status.as_ref().and_then(|s| s.period),
        clock: event
            .status
            .as_ref()
            .and_then(|s| s.display_clock.clone()),
        start_time: event.date.as_deref().and_then(parse_event_date),
    })
}

fn team_name(c: &EspnCompetitor) -> String {
    c.team
        .as_ref()
        .and_then(|t| {
            t.display_name
                .clone()
                .or_else(|| t.location.clone())
                .or_else(|| t.short_display_name.clone())
        })
        .unwrap_or_default()
}

fn parse_score(c: &EspnCompetitor) -> Option<u32> {
    c.score.as_deref().and_then(|s| s.trim().parse::<u32>().ok())
}

/// ESPN dates usually omit seconds ("2025-01-01T17:00Z"), which RFC 3339
/// parsing rejects.
fn parse_event_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%MZ")
        .ok()
        .map(|naive| naive.and_utc())
}
