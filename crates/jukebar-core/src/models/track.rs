//! Track, intent and volume value types.

use serde::{Deserialize, Serialize};

use crate::links::{self, ThumbnailQuality};

/// A playable unit: an externally hosted video plus display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub media_id: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    /// Opaque reference back to the review/song record that owns this track.
    #[serde(default)]
    pub track_ref: String,
}

impl Track {
    pub fn new(
        media_id: impl Into<String>,
        title: impl Into<String>,
        subtitle: impl Into<String>,
        track_ref: impl Into<String>,
    ) -> Self {
        Self {
            media_id: media_id.into(),
            title: title.into(),
            subtitle: subtitle.into(),
            track_ref: track_ref.into(),
        }
    }

    pub fn thumbnail_url(&self, quality: ThumbnailQuality) -> String {
        links::thumbnail_url(&self.media_id, quality)
    }
}

/// What should be playing, and whether it should be audible right now.
///
/// `revision` increments on every effective change so observers can tell
/// two snapshots apart without comparing fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PlaybackIntent {
    pub track: Option<Track>,
    pub is_playing: bool,
    pub revision: u64,
}

impl PlaybackIntent {
    pub fn media_id(&self) -> Option<&str> {
        self.track.as_ref().map(|t| t.media_id.as_str())
    }

    pub fn is_current(&self, media_id: &str) -> bool {
        self.media_id() == Some(media_id)
    }
}

/// User volume preference. Survives track changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeState {
    /// 0..=100
    pub level: u8,
    pub muted: bool,
}

impl VolumeState {
    pub const MAX: u8 = 100;

    pub fn new(level: u8) -> Self {
        Self {
            level: level.min(Self::MAX),
            muted: false,
        }
    }
}

impl Default for VolumeState {
    fn default() -> Self {
        Self::new(Self::MAX)
    }
}
