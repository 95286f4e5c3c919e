use crate::state::refresher::REFRESH_INTERVAL;
use cfb_api::client::ESPN_CFB_SITE_V2;
use log::LevelFilter;
use std::path::PathBuf;
use std::time::Duration;

pub const DATA_DIR_VAR: &str = "BOWLPOOL_DATA_DIR";
pub const FEED_URL_VAR: &str = "BOWLPOOL_FEED_URL";
pub const LOG_VAR: &str = "BOWLPOOL_LOG";
pub const REFRESH_SECS_VAR: &str = "BOWLPOOL_REFRESH_SECS";

#[derive(Debug, Clone, PartialEq)]
pub struct AppSettings {
    pub data_dir: PathBuf,
    pub feed_url: String,
    pub log_level: LevelFilter,
    pub refresh_interval: Duration,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            feed_url: ESPN_CFB_SITE_V2.to_owned(),
            log_level: LevelFilter::Warn,
            refresh_interval: REFRESH_INTERVAL,
        }
    }
}

impl AppSettings {
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unset, empty and unparseable values all fall back to the default.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            data_dir: var(DATA_DIR_VAR).map(PathBuf::from).unwrap_or(defaults.data_dir),
            feed_url: var(FEED_URL_VAR).unwrap_or(defaults.feed_url),
            log_level: var(LOG_VAR)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.log_level),
            refresh_interval: var(REFRESH_SECS_VAR)
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.refresh_interval),
        }
    }
}
