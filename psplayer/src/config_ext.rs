//! Extension pour intégrer le lecteur dans psconfig
//!
//! Clés `player.*` :
//!
//! - `progress_interval_ms` : période des événements `progress` (1000)
//! - `video_surfaces` : une surface de rendu par session (false)

use crate::registry::DEFAULT_PROGRESS_INTERVAL;
use anyhow::Result;
use psconfig::Config;
use serde_yaml::Value;
use std::time::Duration;

pub trait PlayerConfigExt {
    /// Période des événements `progress` ; 0 ramène la valeur par défaut
    fn get_player_progress_interval(&self) -> Result<Duration>;

    fn set_player_progress_interval_ms(&self, interval_ms: u64) -> Result<()>;

    fn get_player_video_surfaces(&self) -> Result<bool>;

    fn set_player_video_surfaces(&self, enabled: bool) -> Result<()>;
}

impl PlayerConfigExt for Config {
    fn get_player_progress_interval(&self) -> Result<Duration> {
        let default_ms = DEFAULT_PROGRESS_INTERVAL.as_millis() as u64;
        match self.get_u64_or(&["player", "progress_interval_ms"], default_ms) {
            0 => Ok(DEFAULT_PROGRESS_INTERVAL),
            ms => Ok(Duration::from_millis(ms)),
        }
    }

    fn set_player_progress_interval_ms(&self, interval_ms: u64) -> Result<()> {
        self.set_value(
            &["player", "progress_interval_ms"],
            Value::Number(interval_ms.into()),
        )
    }

    fn get_player_video_surfaces(&self) -> Result<bool> {
        Ok(self.get_bool_or(&["player", "video_surfaces"], false))
    }

    fn set_player_video_surfaces(&self, enabled: bool) -> Result<()> {
        self.set_value(&["player", "video_surfaces"], Value::Bool(enabled))
    }
}
