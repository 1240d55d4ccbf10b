//! Scrub controller: drag feedback decoupled from poll and runtime.
//!
//! While a drag is in flight only `pending_position` moves. The seek is
//! issued once, on commit. The controller also remembers whether the clock
//! was polling when the drag began so the engine can resume it afterwards.

use crate::models::ScrubState;

#[derive(Default)]
pub struct ScrubController {
    state: ScrubState,
    resume_polling: bool,
}

/// What the engine must do when a drag is released.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrubCommit {
    pub position: f64,
    pub resume_polling: bool,
}

impl ScrubController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ScrubState {
        self.state
    }

    pub fn is_scrubbing(&self) -> bool {
        self.state.is_scrubbing
    }

    /// Intermediate drag frame. Returns true when this frame began the drag,
    /// i.e. the caller should suspend polling now.
    pub fn change(&mut self, position: f64, was_polling: bool) -> bool {
        let began = !self.state.is_scrubbing;
        if began {
            self.resume_polling = was_polling;
        }
        self.state = ScrubState {
            is_scrubbing: true,
            pending_position: sanitize(position),
        };
        began
    }

    /// Release. Clears the drag and reports what to resume.
    pub fn commit(&mut self, position: f64) -> ScrubCommit {
        let commit = ScrubCommit {
            position: sanitize(position),
            resume_polling: self.resume_polling,
        };
        self.state = ScrubState::default();
        self.resume_polling = false;
        commit
    }

    /// A playing-state change arrived mid-drag: resume polling on commit.
    pub fn request_resume(&mut self) {
        if self.state.is_scrubbing {
            self.resume_polling = true;
        }
    }

    /// Playback left `Playing` mid-drag: do not resume polling on commit.
    pub fn request_suspend(&mut self) {
        self.resume_polling = false;
    }

    /// Drop the drag without seeking (teardown).
    pub fn cancel(&mut self) {
        self.state = ScrubState::default();
        self.resume_polling = false;
    }

    /// Position a surface should show: the pending one wins while dragging.
    pub fn displayed(&self, clock_position: f64) -> f64 {
        if self.state.is_scrubbing {
            self.state.pending_position
        } else {
            clock_position
        }
    }
}

fn sanitize(position: f64) -> f64 {
    if position.is_finite() {
        position.max(0.0)
    } else {
        0.0
    }
}
