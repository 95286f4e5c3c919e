pub mod app_settings;
pub mod refresher;
pub mod scoreboard;
