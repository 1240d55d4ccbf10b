//! Playback clock: position derived by polling the instance.
//!
//! The runtime has no push-based progress event, so the engine reads the
//! playhead on a fixed interval while playing. The clock itself never
//! touches the instance; the engine hands it whatever the read produced.

use crate::models::ClockState;

pub struct PlaybackClock {
    state: ClockState,
    interval_ms: u64,
    /// Scheduler time of the next poll tick. `None` while stopped.
    next_due_ms: Option<u64>,
}

impl PlaybackClock {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            state: ClockState::default(),
            interval_ms: interval_ms.max(1),
            next_due_ms: None,
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    /// Begin ticking one interval from `now_ms`. No-op if already running.
    pub fn start_polling(&mut self, now_ms: u64) {
        if self.next_due_ms.is_none() {
            self.next_due_ms = Some(now_ms + self.interval_ms);
        }
    }

    pub fn stop_polling(&mut self) {
        self.next_due_ms = None;
    }

    pub fn is_polling(&self) -> bool {
        self.next_due_ms.is_some()
    }

    pub fn next_due(&self) -> Option<u64> {
        self.next_due_ms
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        self.next_due_ms.is_some_and(|due| due <= now_ms)
    }

    /// Record one poll tick and schedule the next.
    ///
    /// A failed read (`None`) keeps the previous position.
    pub fn sample(&mut self, now_ms: u64, reading: Option<f64>) -> f64 {
        if self.next_due_ms.is_some() {
            self.next_due_ms = Some(now_ms + self.interval_ms);
        }
        if let Some(position) = reading.filter(|p| p.is_finite() && *p >= 0.0) {
            self.state.current_position = position;
        }
        self.state.current_position
    }

    pub fn set_position(&mut self, seconds: f64) {
        self.state.current_position = self.clamp(seconds);
    }

    pub fn set_duration(&mut self, seconds: f64) {
        if seconds.is_finite() && seconds > 0.0 {
            self.state.duration = seconds;
        }
    }

    pub fn set_buffering(&mut self, buffering: bool) {
        self.state.is_buffering = buffering;
    }

    /// Zero everything and stop. Called whenever the handle goes away.
    pub fn reset(&mut self) {
        self.state = ClockState::default();
        self.next_due_ms = None;
    }

    fn clamp(&self, seconds: f64) -> f64 {
        let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        if self.state.duration > 0.0 {
            seconds.min(self.state.duration)
        } else {
            seconds
        }
    }
}
