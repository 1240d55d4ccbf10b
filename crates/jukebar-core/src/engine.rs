//! Jukebar engine: the single playback controller behind every surface.
//!
//! Owns the lifecycle, clock and scrub controller, and observes the shared
//! intent and volume stores. Single-threaded and cooperative: nothing runs
//! unless the host calls in. `pump()` reconciles stores with the lifecycle
//! and drains native callbacks in arrival order; `advance()` moves the
//! scheduler clock and fires poll ticks and the autoplay grace timer.
//!
//! Ordering rules:
//! - track changes are not queued; the latest intent wins
//! - an old instance is destroyed before a new one is constructed
//! - every callback that mutates shared state is checked against the live
//!   instance tag and the current intent first

use std::collections::BTreeSet;
use std::sync::mpsc::{channel, Receiver};

use crate::clock::PlaybackClock;
use crate::config::PlayerConfig;
use crate::effects::{InstanceTag, MediaRuntime, RuntimeEvent};
use crate::lifecycle::{ExternalPlayerLifecycle, Initialization};
use crate::models::{
    ClockState, LifecyclePhase, NativeState, PlaybackIntent, ScrubState, Track, VolumeState,
};
use crate::scrub::ScrubController;
use crate::store::{PlaybackIntentStore, VolumeStore};
use crate::surface::SurfaceId;

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

struct GraceTimer {
    due_ms: u64,
    tag: InstanceTag,
}

pub struct Engine {
    config: PlayerConfig,
    store: PlaybackIntentStore,
    volume: VolumeStore,
    lifecycle: ExternalPlayerLifecycle,
    clock: PlaybackClock,
    scrub: ScrubController,
    events: Receiver<RuntimeEvent>,
    /// Deferred first `playVideo` after ready.
    grace: Option<GraceTimer>,
    /// Last play/pause we asked the instance for (or it reported).
    commanded_playing: Option<bool>,
    /// Volume revision already pushed to the live instance.
    applied_volume: Option<u64>,
    surfaces: BTreeSet<SurfaceId>,
    next_surface: u64,
    now_ms: u64,
}

impl Engine {
    pub fn new(runtime: Box<dyn MediaRuntime>) -> Self {
        Self::with_config(runtime, PlayerConfig::default())
    }

    pub fn with_config(runtime: Box<dyn MediaRuntime>, config: PlayerConfig) -> Self {
        let volume = VolumeStore::new(VolumeState::new(config.default_volume));
        Self::with_stores(runtime, config, PlaybackIntentStore::new(), volume)
    }

    /// Boot over stores the rest of the application already holds.
    /// An invalid config is logged and replaced by defaults.
    pub fn with_stores(
        runtime: Box<dyn MediaRuntime>,
        config: PlayerConfig,
        store: PlaybackIntentStore,
        volume: VolumeStore,
    ) -> Self {
        let config = config.validated_or_default();
        let (sink, events) = channel();
        let lifecycle = ExternalPlayerLifecycle::new(runtime, sink, &config);
        let clock = PlaybackClock::new(config.poll_interval_ms);
        Self {
            config,
            store,
            volume,
            lifecycle,
            clock,
            scrub: ScrubController::new(),
            events,
            grace: None,
            commanded_playing: None,
            applied_volume: None,
            surfaces: BTreeSet::new(),
            next_surface: 0,
            now_ms: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Read side
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn store(&self) -> &PlaybackIntentStore {
        &self.store
    }

    pub fn volume(&self) -> &VolumeStore {
        &self.volume
    }

    pub fn intent(&self) -> PlaybackIntent {
        self.store.snapshot()
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.lifecycle.phase()
    }

    pub fn phase_history(&self) -> &[LifecyclePhase] {
        self.lifecycle.phase_history()
    }

    pub fn is_loading(&self) -> bool {
        self.lifecycle.is_loading()
    }

    pub fn clock_state(&self) -> ClockState {
        self.clock.state()
    }

    pub fn scrub_state(&self) -> ScrubState {
        self.scrub.state()
    }

    /// What a seek bar should show: the drag position wins while scrubbing.
    pub fn displayed_position(&self) -> f64 {
        self.scrub.displayed(self.clock.state().current_position)
    }

    pub fn is_polling(&self) -> bool {
        self.clock.is_polling()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn mounted_surfaces(&self) -> usize {
        self.surfaces.len()
    }

    // -----------------------------------------------------------------------
    // User operations
    // -----------------------------------------------------------------------

    /// Tap-to-toggle / tap-to-switch. The entry point every surface uses.
    pub fn play_pause(&mut self, track: Track) {
        self.store.play_pause(track);
        self.pump();
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.store.set_playing(playing);
        self.pump();
    }

    pub fn set_volume(&mut self, level: u8) {
        self.volume.set_level(level);
        self.pump();
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.volume.set_muted(muted);
        self.pump();
    }

    pub fn toggle_mute(&mut self) {
        self.volume.toggle_mute();
        self.pump();
    }

    /// Intermediate drag frame: local state only, no seek, no poll.
    pub fn scrub_change(&mut self, position: f64) {
        if self.scrub.change(position, self.clock.is_polling()) {
            self.clock.stop_polling();
        }
    }

    /// Drag released: one seek, adopt the position, and resume polling
    /// only if the instance is still playing.
    pub fn scrub_commit(&mut self, position: f64) {
        let commit = self.scrub.commit(position);
        self.lifecycle
            .with_player_instance("seekTo", |p| p.seek_to(commit.position, true));
        self.clock.set_position(commit.position);
        if commit.resume_polling && self.lifecycle.phase() == LifecyclePhase::Playing {
            self.clock.start_polling(self.now_ms);
        }
        self.pump();
    }

    /// Stop, destroy and clear the intent so no surface keeps showing it.
    pub fn close(&mut self) {
        self.lifecycle
            .with_player_instance("stopVideo", |p| p.stop_video());
        self.release_instance();
        self.store.set_playing(false);
        self.store.set_track(None);
        self.pump();
    }

    pub fn mount_surface(&mut self) -> SurfaceId {
        self.next_surface += 1;
        let id = SurfaceId(self.next_surface);
        self.surfaces.insert(id);
        self.pump();
        id
    }

    /// Unmounting the last surface destroys the instance; the intent stays.
    pub fn unmount_surface(&mut self, id: SurfaceId) {
        if self.surfaces.remove(&id) && self.surfaces.is_empty() {
            self.release_instance();
        }
        self.pump();
    }

    /// Unmount everything. Idempotent.
    pub fn shutdown(&mut self) {
        self.surfaces.clear();
        self.release_instance();
    }

    // -----------------------------------------------------------------------
    // Event loop
    // -----------------------------------------------------------------------

    /// Reconcile stores with the lifecycle, then drain native callbacks.
    pub fn pump(&mut self) {
        self.sync_intent();
        self.sync_volume();
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
            self.sync_intent();
            self.sync_volume();
        }
    }

    /// Move the scheduler clock forward, firing timers in due order.
    pub fn advance(&mut self, elapsed_ms: u64) {
        let target = self.now_ms.saturating_add(elapsed_ms);
        self.pump();
        while let Some(due) = self.next_deadline().filter(|due| *due <= target) {
            self.set_now(due.max(self.now_ms));
            self.fire_due();
            self.pump();
        }
        self.set_now(target);
        self.pump();
    }

    fn set_now(&mut self, now_ms: u64) {
        self.now_ms = now_ms;
        self.lifecycle.advance_runtime(now_ms);
    }

    fn next_deadline(&self) -> Option<u64> {
        [self.clock.next_due(), self.grace.as_ref().map(|g| g.due_ms)]
            .into_iter()
            .flatten()
            .min()
    }

    fn fire_due(&mut self) {
        if self.grace.as_ref().is_some_and(|g| g.due_ms <= self.now_ms) {
            self.fire_grace();
        }
        if self.clock.is_due(self.now_ms) {
            self.poll_tick();
        }
    }

    // -----------------------------------------------------------------------
    // Reconciliation
    // -----------------------------------------------------------------------

    fn sync_intent(&mut self) {
        let intent = self.store.snapshot();
        let wanted = intent.media_id();

        if wanted != self.lifecycle.bound_media_id() {
            if self.lifecycle.bound_media_id().is_some() || self.lifecycle.has_instance() {
                self.release_instance();
            }
            if let Some(media_id) = wanted {
                if intent.is_playing && !self.surfaces.is_empty() {
                    self.initialize(media_id);
                }
            }
            return;
        }

        self.apply_play_intent(intent.is_playing);
    }

    fn initialize(&mut self, media_id: &str) {
        if self.lifecycle.bind(media_id) == Initialization::Failed {
            // Left unplayed; the user has to ask again.
            self.store.set_playing(false);
        }
    }

    fn apply_play_intent(&mut self, playing: bool) {
        if !self.lifecycle.is_ready() || self.commanded_playing == Some(playing) {
            return;
        }
        self.commanded_playing = Some(playing);
        if playing {
            self.lifecycle
                .with_player_instance("playVideo", |p| p.play_video());
        } else {
            self.grace = None;
            self.lifecycle
                .with_player_instance("pauseVideo", |p| p.pause_video());
        }
    }

    fn sync_volume(&mut self) {
        if !self.lifecycle.is_ready() {
            return;
        }
        let revision = self.volume.revision();
        if self.applied_volume != Some(revision) {
            self.applied_volume = Some(revision);
            self.apply_volume();
        }
    }

    fn apply_volume(&mut self) {
        let volume = self.volume.snapshot();
        self.lifecycle
            .with_player_instance("setVolume", |p| p.set_volume(volume.level));
        if volume.muted {
            self.lifecycle.with_player_instance("mute", |p| p.mute());
        } else {
            self.lifecycle.with_player_instance("unMute", |p| p.un_mute());
        }
    }

    /// Structured teardown shared by rebind, close, unmount and error.
    /// Timers stop before the handle goes away.
    fn release_instance(&mut self) {
        self.clock.stop_polling();
        self.grace = None;
        self.lifecycle.teardown();
        self.clock.reset();
        self.scrub.cancel();
        self.commanded_playing = None;
        self.applied_volume = None;
    }

    /// Left `Playing`: stop now and do not restart on a pending commit.
    fn suspend_polling(&mut self) {
        self.clock.stop_polling();
        self.scrub.request_suspend();
    }

    fn resume_polling(&mut self) {
        if self.scrub.is_scrubbing() {
            self.scrub.request_resume();
        } else {
            self.clock.start_polling(self.now_ms);
        }
    }

    // -----------------------------------------------------------------------
    // Native callbacks
    // -----------------------------------------------------------------------

    fn is_current(&self, tag: &InstanceTag) -> bool {
        self.store.current_media_id().as_deref() == Some(tag.media_id.as_str())
    }

    fn handle_event(&mut self, event: RuntimeEvent) {
        match event {
            RuntimeEvent::ApiReady => {
                let current = self
                    .store
                    .current_media_id()
                    .filter(|_| !self.surfaces.is_empty());
                if self.lifecycle.on_api_ready(current.as_deref()) == Initialization::Failed {
                    self.store.set_playing(false);
                }
            }
            RuntimeEvent::Ready { tag } => self.on_ready(tag),
            RuntimeEvent::StateChange { tag, state } => self.on_state_change(tag, state),
            RuntimeEvent::Error { tag, code } => self.on_error(tag, code),
        }
    }

    fn on_ready(&mut self, tag: InstanceTag) {
        if !self.is_current(&tag) || !self.lifecycle.on_ready(&tag) {
            log::debug!("jukebar: dropping stale ready for {} (gen {})", tag.media_id, tag.generation);
            return;
        }

        if let Some(duration) = self.lifecycle.read_player("getDuration", |p| p.duration()) {
            self.clock.set_duration(duration);
        }
        self.applied_volume = Some(self.volume.revision());
        self.apply_volume();

        if !self.store.is_playing() {
            self.commanded_playing = Some(false);
            return;
        }
        self.commanded_playing = Some(true);
        if self.config.autoplay_grace_ms == 0 {
            self.lifecycle
                .with_player_instance("playVideo", |p| p.play_video());
        } else {
            self.grace = Some(GraceTimer {
                due_ms: self.now_ms + self.config.autoplay_grace_ms,
                tag,
            });
        }
    }

    fn fire_grace(&mut self) {
        let Some(timer) = self.grace.take() else {
            return;
        };
        if self.lifecycle.live_tag() != Some(&timer.tag) || !self.store.is_playing() {
            log::debug!("jukebar: grace play for {} dropped", timer.tag.media_id);
            return;
        }
        self.lifecycle
            .with_player_instance("playVideo", |p| p.play_video());
    }

    fn on_state_change(&mut self, tag: InstanceTag, state: NativeState) {
        let accepted = self.is_current(&tag)
            && self.lifecycle.on_state_change(&tag, state).is_some();
        if !accepted {
            log::debug!("jukebar: dropping stale {:?} for {} (gen {})", state, tag.media_id, tag.generation);
            return;
        }

        match state {
            NativeState::Playing => {
                self.clock.set_buffering(false);
                self.commanded_playing = Some(true);
                self.store.set_playing(true);
                self.resume_polling();
            }
            NativeState::Paused => {
                if !self.scrub.is_scrubbing() {
                    let reading = self.lifecycle.read_player("getCurrentTime", |p| p.current_time());
                    self.clock.sample(self.now_ms, reading);
                }
                self.suspend_polling();
                self.clock.set_buffering(false);
                self.commanded_playing = Some(false);
                self.store.set_playing(false);
            }
            NativeState::Buffering => {
                self.suspend_polling();
                self.clock.set_buffering(true);
            }
            NativeState::Ended => {
                self.suspend_polling();
                self.clock.set_buffering(false);
                self.clock.set_position(0.0);
                self.commanded_playing = Some(false);
                self.store.set_playing(false);
            }
            NativeState::Unstarted | NativeState::Cued => {}
        }
    }

    fn on_error(&mut self, tag: InstanceTag, code: i32) {
        if !self.is_current(&tag) || !self.lifecycle.on_error(&tag, code) {
            log::debug!("jukebar: dropping stale error {} for {}", code, tag.media_id);
            return;
        }
        self.release_instance();
        self.store.set_playing(false);
    }

    fn poll_tick(&mut self) {
        if self.scrub.is_scrubbing() {
            self.clock.stop_polling();
            return;
        }
        let reading = self.lifecycle.read_player("getCurrentTime", |p| p.current_time());
        self.clock.sample(self.now_ms, reading);
        if self.clock.state().duration <= 0.0 {
            if let Some(duration) = self.lifecycle.read_player("getDuration", |p| p.duration()) {
                self.clock.set_duration(duration);
            }
        }
    }
}
