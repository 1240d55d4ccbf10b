//! Lifecycle phases, native player states, clock and scrub state.

use serde::{Deserialize, Serialize};

/// Where the single external player instance is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    #[default]
    Idle,
    ApiLoading,
    Initializing,
    Ready,
    Playing,
    Paused,
    Buffering,
    Ended,
    Destroyed,
}

/// State reported by the runtime's native state-change callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NativeState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

impl NativeState {
    /// Map the runtime's numeric state code.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(NativeState::Unstarted),
            0 => Some(NativeState::Ended),
            1 => Some(NativeState::Playing),
            2 => Some(NativeState::Paused),
            3 => Some(NativeState::Buffering),
            5 => Some(NativeState::Cued),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            NativeState::Unstarted => -1,
            NativeState::Ended => 0,
            NativeState::Playing => 1,
            NativeState::Paused => 2,
            NativeState::Buffering => 3,
            NativeState::Cued => 5,
        }
    }
}

/// Derived playback position. Rebuilt from polling; zeroed on teardown.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ClockState {
    /// Seconds.
    pub current_position: f64,
    /// Seconds. Zero until the instance reports it.
    pub duration: f64,
    pub is_buffering: bool,
}

impl ClockState {
    /// Fraction of the track played, 0.0 when the duration is unknown.
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 {
            (self.current_position / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Transient drag state over the seek bar.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScrubState {
    pub is_scrubbing: bool,
    pub pending_position: f64,
}
