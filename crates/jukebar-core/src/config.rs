//! Controller configuration.
//!
//! A JSON document with every field optional. `from_value_or_default`
//! is the forgiving entry point used at boot: an invalid document is
//! logged and replaced by defaults rather than failing playback.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::error::{PlayerError, PlayerResult};
use crate::links::ThumbnailQuality;

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "JUKEBAR_CONFIG";

pub const DEFAULT_HOST_ELEMENT_ID: &str = "jukebar-player-host";

const POLL_INTERVAL_RANGE: std::ops::RangeInclusive<u64> = 100..=5000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Position poll period while playing.
    pub poll_interval_ms: u64,
    /// Delay between native ready and the first `playVideo`. Zero plays
    /// immediately. Heuristic; see the runtime's autoplay negotiation.
    pub autoplay_grace_ms: u64,
    pub host_element_id: String,
    pub default_volume: u8,
    pub thumbnail_quality: ThumbnailQuality,
    /// Passed through verbatim to the player constructor.
    pub player_vars: Value,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            autoplay_grace_ms: 250,
            host_element_id: DEFAULT_HOST_ELEMENT_ID.to_string(),
            default_volume: 100,
            thumbnail_quality: ThumbnailQuality::HqDefault,
            player_vars: serde_json::json!({
                "autoplay": 0,
                "controls": 0,
                "disablekb": 1,
                "playsinline": 1,
                "rel": 0,
                "modestbranding": 1,
            }),
        }
    }
}

impl PlayerConfig {
    pub fn from_value(value: &Value) -> PlayerResult<Self> {
        let config: PlayerConfig = serde_json::from_value(value.clone())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_value_or_default(value: &Value) -> Self {
        match Self::from_value(value) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("jukebar: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Keep `self` if it validates, else log and fall back to defaults.
    pub fn validated_or_default(self) -> Self {
        match self.validate() {
            Ok(()) => self,
            Err(e) => {
                log::warn!("jukebar: {}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn load(path: &Path) -> PlayerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&text)?;
        Self::from_value(&value)
    }

    /// Load the file named by `JUKEBAR_CONFIG`, or defaults when unset.
    pub fn from_env() -> PlayerResult<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> PlayerResult<()> {
        if !POLL_INTERVAL_RANGE.contains(&self.poll_interval_ms) {
            return Err(PlayerError::Config(format!(
                "poll_interval_ms {} outside {}..={}",
                self.poll_interval_ms,
                POLL_INTERVAL_RANGE.start(),
                POLL_INTERVAL_RANGE.end()
            )));
        }
        if self.default_volume > 100 {
            return Err(PlayerError::Config(format!(
                "default_volume {} above 100",
                self.default_volume
            )));
        }
        if self.host_element_id.trim().is_empty() {
            return Err(PlayerError::Config("host_element_id is empty".into()));
        }
        if !self.player_vars.is_object() {
            return Err(PlayerError::Config("player_vars must be an object".into()));
        }
        Ok(())
    }
}
