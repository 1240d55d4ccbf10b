//! Shared stores: the playback intent and the volume preference.
//!
//! These are the only values shared across surfaces. Both are cheap
//! cloneable handles over one mutex-guarded record; every mutation goes
//! through a named operation so all holders observe the same sequence of
//! snapshots. Neither store talks to the external player; the engine
//! observes them and reacts.

use parking_lot::Mutex;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

use crate::models::{PlaybackIntent, Track, VolumeState};

// ---------------------------------------------------------------------------
// Playback intent
// ---------------------------------------------------------------------------

/// Single authoritative record of what is logically playing.
#[derive(Clone, Default)]
pub struct PlaybackIntentStore {
    inner: Arc<Mutex<IntentInner>>,
}

#[derive(Default)]
struct IntentInner {
    intent: PlaybackIntent,
    watchers: Vec<Sender<PlaybackIntent>>,
}

impl PlaybackIntentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> PlaybackIntent {
        self.inner.lock().intent.clone()
    }

    pub fn current_media_id(&self) -> Option<String> {
        self.inner.lock().intent.media_id().map(String::from)
    }

    pub fn is_playing(&self) -> bool {
        self.inner.lock().intent.is_playing
    }

    /// Replace the current track. Play state is left as is.
    pub fn set_track(&self, track: Option<Track>) {
        self.update(|intent| intent.track = track);
    }

    /// Set play intent without touching the track.
    pub fn set_playing(&self, playing: bool) {
        self.update(|intent| intent.is_playing = playing);
    }

    /// Tap-to-toggle contract shared by every surface.
    ///
    /// Same media id as the current track: flip `is_playing`. Anything else:
    /// switch to `track` and force `is_playing = true`.
    pub fn play_pause(&self, track: Track) {
        self.update(|intent| {
            if intent.is_current(&track.media_id) {
                intent.is_playing = !intent.is_playing;
            } else {
                intent.track = Some(track);
                intent.is_playing = true;
            }
        });
    }

    /// Receive a snapshot after every effective change.
    pub fn subscribe(&self) -> Receiver<PlaybackIntent> {
        let (tx, rx) = channel();
        self.inner.lock().watchers.push(tx);
        rx
    }

    fn update(&self, f: impl FnOnce(&mut PlaybackIntent)) {
        let mut guard = self.inner.lock();
        let (track_before, playing_before) = (guard.intent.track.clone(), guard.intent.is_playing);
        f(&mut guard.intent);
        if guard.intent.track == track_before && guard.intent.is_playing == playing_before {
            return;
        }
        guard.intent.revision += 1;
        let snapshot = guard.intent.clone();
        guard
            .watchers
            .retain(|tx| tx.send(snapshot.clone()).is_ok());
    }
}

// ---------------------------------------------------------------------------
// Volume
// ---------------------------------------------------------------------------

/// User volume preference, re-applied to every new player instance.
#[derive(Clone)]
pub struct VolumeStore {
    inner: Arc<Mutex<(VolumeState, u64)>>,
}

impl VolumeStore {
    pub fn new(initial: VolumeState) -> Self {
        Self {
            inner: Arc::new(Mutex::new((initial, 0))),
        }
    }

    pub fn snapshot(&self) -> VolumeState {
        self.inner.lock().0
    }

    /// Bumped on every effective change.
    pub fn revision(&self) -> u64 {
        self.inner.lock().1
    }

    pub fn set_level(&self, level: u8) {
        self.update(|v| v.level = level.min(VolumeState::MAX));
    }

    pub fn set_muted(&self, muted: bool) {
        self.update(|v| v.muted = muted);
    }

    pub fn toggle_mute(&self) {
        self.update(|v| v.muted = !v.muted);
    }

    fn update(&self, f: impl FnOnce(&mut VolumeState)) {
        let mut guard = self.inner.lock();
        let before = guard.0;
        f(&mut guard.0);
        if guard.0 != before {
            guard.1 += 1;
        }
    }
}

impl Default for VolumeStore {
    fn default() -> Self {
        Self::new(VolumeState::default())
    }
}
