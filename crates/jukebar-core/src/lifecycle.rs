//! External player lifecycle.
//!
//! Keeps at most one runtime instance alive, bound to one media id, and
//! owns the runtime loader. The instance lives in a `PlayerSlot`: acquired
//! on bind, released on every exit path (rebind, close, unmount, error,
//! drop). Every native call goes through the slot's guarded scope, which
//! skips calls on an instance that is not ready and logs-and-swallows
//! anything the runtime throws.
//!
//! ```text
//! Idle -> ApiLoading -> Initializing -> Ready -> Playing <-> Paused
//!                                                  |-> Buffering
//!                                                  '-> Ended
//! any -> Destroyed
//! ```

use serde_json::Value;

use crate::config::PlayerConfig;
use crate::effects::{EventSink, InstanceTag, MediaRuntime, PlayerInstance, PlayerSpec};
use crate::error::PlayerResult;
use crate::models::{LifecyclePhase, NativeState};

const HISTORY_LIMIT: usize = 256;

// ---------------------------------------------------------------------------
// Player slot
// ---------------------------------------------------------------------------

struct LiveInstance {
    tag: InstanceTag,
    handle: Box<dyn PlayerInstance>,
    ready: bool,
}

/// Owned home of the single live instance.
pub struct PlayerSlot {
    live: Option<LiveInstance>,
}

impl PlayerSlot {
    fn new() -> Self {
        Self { live: None }
    }

    pub fn tag(&self) -> Option<&InstanceTag> {
        self.live.as_ref().map(|l| &l.tag)
    }

    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.live.as_ref().is_some_and(|l| l.ready)
    }

    fn install(&mut self, tag: InstanceTag, handle: Box<dyn PlayerInstance>) {
        debug_assert!(self.live.is_none(), "slot must be released before install");
        self.live = Some(LiveInstance {
            tag,
            handle,
            ready: false,
        });
    }

    fn mark_ready(&mut self, tag: &InstanceTag) -> bool {
        match self.live.as_mut() {
            Some(live) if &live.tag == tag => {
                live.ready = true;
                true
            }
            _ => false,
        }
    }

    /// Run `f` against the ready instance. Skipped when there is none;
    /// runtime errors are logged and become `None`.
    fn call<T>(
        &mut self,
        method: &'static str,
        f: impl FnOnce(&mut dyn PlayerInstance) -> PlayerResult<T>,
    ) -> Option<T> {
        let live = self.live.as_mut()?;
        if !live.ready {
            log::debug!("jukebar: {} skipped, {} not ready", method, live.tag.media_id);
            return None;
        }
        match f(live.handle.as_mut()) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("jukebar: {} on {} failed: {}", method, live.tag.media_id, e);
                None
            }
        }
    }

    fn read<T>(
        &self,
        method: &'static str,
        f: impl FnOnce(&dyn PlayerInstance) -> PlayerResult<T>,
    ) -> Option<T> {
        let live = self.live.as_ref().filter(|l| l.ready)?;
        match f(live.handle.as_ref()) {
            Ok(value) => Some(value),
            Err(e) => {
                log::debug!("jukebar: {} on {} failed: {}", method, live.tag.media_id, e);
                None
            }
        }
    }

    /// Destroy and forget the instance. Safe to call any number of times.
    fn release(&mut self) -> Option<InstanceTag> {
        let mut live = self.live.take()?;
        if let Err(e) = live.handle.destroy() {
            // The runtime may have disposed it already.
            log::debug!("jukebar: destroy {} ignored: {}", live.tag.media_id, e);
        }
        Some(live.tag)
    }
}

impl Drop for PlayerSlot {
    fn drop(&mut self) {
        self.release();
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiState {
    NotLoaded,
    Loading,
    Loaded,
}

/// Outcome of asking the lifecycle to bring up an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initialization {
    Constructed,
    /// Queued until the runtime signals readiness.
    Pending,
    /// Nothing to do (no current track, or already bound).
    Skipped,
    /// Loader or constructor threw. Not retried.
    Failed,
}

/// A request made while the runtime was still loading.
#[derive(Debug, Clone)]
pub struct PendingInit {
    pub requested_media_id: String,
}

pub struct ExternalPlayerLifecycle {
    runtime: Box<dyn MediaRuntime>,
    sink: EventSink,
    host_element_id: String,
    player_vars: Value,
    api: ApiState,
    pending: Vec<PendingInit>,
    slot: PlayerSlot,
    phase: LifecyclePhase,
    bound: Option<String>,
    generation: u64,
    is_loading: bool,
    history: Vec<LifecyclePhase>,
}

impl ExternalPlayerLifecycle {
    pub fn new(runtime: Box<dyn MediaRuntime>, sink: EventSink, config: &PlayerConfig) -> Self {
        let api = if runtime.is_api_loaded() {
            ApiState::Loaded
        } else {
            ApiState::NotLoaded
        };
        Self {
            runtime,
            sink,
            host_element_id: config.host_element_id.clone(),
            player_vars: config.player_vars.clone(),
            api,
            pending: Vec::new(),
            slot: PlayerSlot::new(),
            phase: LifecyclePhase::Idle,
            bound: None,
            generation: 0,
            is_loading: false,
            history: vec![LifecyclePhase::Idle],
        }
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub fn phase_history(&self) -> &[LifecyclePhase] {
        &self.history
    }

    pub fn api_state(&self) -> ApiState {
        self.api
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Media id this lifecycle is working towards, live or pending.
    pub fn bound_media_id(&self) -> Option<&str> {
        self.bound.as_deref()
    }

    pub fn live_tag(&self) -> Option<&InstanceTag> {
        self.slot.tag()
    }

    pub fn has_instance(&self) -> bool {
        self.slot.is_live()
    }

    pub fn is_ready(&self) -> bool {
        self.slot.is_ready()
    }

    // -----------------------------------------------------------------------
    // Scoped instance access
    // -----------------------------------------------------------------------

    /// The only way to reach the native instance. Skipped when nothing is
    /// ready; failures are logged and turned into `None`.
    pub fn with_player_instance<T>(
        &mut self,
        method: &'static str,
        f: impl FnOnce(&mut dyn PlayerInstance) -> PlayerResult<T>,
    ) -> Option<T> {
        self.slot.call(method, f)
    }

    /// Read-only variant used by the poll; failures log at debug level.
    pub fn read_player<T>(
        &self,
        method: &'static str,
        f: impl FnOnce(&dyn PlayerInstance) -> PlayerResult<T>,
    ) -> Option<T> {
        self.slot.read(method, f)
    }

    pub fn advance_runtime(&mut self, now_ms: u64) {
        self.runtime.advance_to(now_ms);
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Bind to `media_id`. Whatever existed is destroyed first.
    pub fn bind(&mut self, media_id: &str) -> Initialization {
        self.teardown();
        self.bound = Some(media_id.to_string());
        self.is_loading = true;

        if self.api == ApiState::NotLoaded && self.runtime.is_api_loaded() {
            self.api = ApiState::Loaded;
        }

        match self.api {
            ApiState::Loaded => self.construct(media_id),
            ApiState::Loading => {
                self.pending.push(PendingInit {
                    requested_media_id: media_id.to_string(),
                });
                self.set_phase(LifecyclePhase::ApiLoading);
                Initialization::Pending
            }
            ApiState::NotLoaded => {
                self.pending.push(PendingInit {
                    requested_media_id: media_id.to_string(),
                });
                self.load_api()
            }
        }
    }

    /// Global readiness. Drains every pending initializer and resolves them
    /// against `current`, the track that is current now, not the one that
    /// was current when loading started.
    pub fn on_api_ready(&mut self, current: Option<&str>) -> Initialization {
        self.api = ApiState::Loaded;
        let drained = std::mem::take(&mut self.pending);
        if drained.is_empty() {
            return Initialization::Skipped;
        }
        for superseded in drained
            .iter()
            .filter(|p| Some(p.requested_media_id.as_str()) != current)
        {
            log::debug!(
                "jukebar: pending init for {} superseded",
                superseded.requested_media_id
            );
        }

        let Some(media_id) = current else {
            self.is_loading = false;
            self.set_phase(LifecyclePhase::Idle);
            return Initialization::Skipped;
        };
        if self.slot.tag().is_some_and(|t| t.media_id == media_id) {
            return Initialization::Skipped;
        }
        self.bound = Some(media_id.to_string());
        self.is_loading = true;
        self.construct(media_id)
    }

    /// Native ready for `tag`. False when the tag is not the live instance.
    pub fn on_ready(&mut self, tag: &InstanceTag) -> bool {
        if !self.slot.mark_ready(tag) {
            return false;
        }
        self.is_loading = false;
        self.set_phase(LifecyclePhase::Ready);
        true
    }

    /// Native state change for `tag`. `None` when stale.
    pub fn on_state_change(&mut self, tag: &InstanceTag, state: NativeState) -> Option<NativeState> {
        if self.slot.tag() != Some(tag) {
            return None;
        }
        let phase = match state {
            NativeState::Playing => LifecyclePhase::Playing,
            NativeState::Paused => LifecyclePhase::Paused,
            NativeState::Buffering => LifecyclePhase::Buffering,
            NativeState::Ended => LifecyclePhase::Ended,
            NativeState::Unstarted | NativeState::Cued => return Some(state),
        };
        if state == NativeState::Playing {
            self.is_loading = false;
        }
        self.set_phase(phase);
        Some(state)
    }

    /// Native error for `tag`. True when it belongs to the live instance;
    /// the caller tears down.
    pub fn on_error(&mut self, tag: &InstanceTag, code: i32) -> bool {
        if self.slot.tag() != Some(tag) {
            return false;
        }
        log::error!(
            "jukebar: player error {} ({}) on {}",
            code,
            describe_error_code(code),
            tag.media_id
        );
        self.is_loading = false;
        true
    }

    /// Destroy the instance and unbind. Callable from any phase, any
    /// number of times. Pending initializers stay queued; they resolve
    /// against whatever is current when the runtime becomes ready.
    pub fn teardown(&mut self) -> Option<InstanceTag> {
        let released = self.slot.release();
        if let Some(tag) = &released {
            log::debug!("jukebar: destroyed {} (gen {})", tag.media_id, tag.generation);
        }
        let was_active = released.is_some() || self.bound.is_some();
        self.bound = None;
        self.is_loading = false;
        if was_active {
            self.set_phase(LifecyclePhase::Destroyed);
        }
        released
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn load_api(&mut self) -> Initialization {
        self.api = ApiState::Loading;
        self.set_phase(LifecyclePhase::ApiLoading);
        match self.runtime.inject_loader(self.sink.clone()) {
            Ok(()) => Initialization::Pending,
            Err(e) => {
                log::error!("jukebar: {}", e);
                self.api = ApiState::NotLoaded;
                self.pending.clear();
                self.fail();
                Initialization::Failed
            }
        }
    }

    fn construct(&mut self, media_id: &str) -> Initialization {
        // A new instance never coexists with an old one.
        if let Some(old) = self.slot.release() {
            log::debug!("jukebar: destroyed {} (gen {})", old.media_id, old.generation);
        }
        self.set_phase(LifecyclePhase::Initializing);
        self.generation += 1;
        let tag = InstanceTag {
            generation: self.generation,
            media_id: media_id.to_string(),
        };

        if let Err(e) = self.runtime.ensure_host_element(&self.host_element_id) {
            log::error!("jukebar: host element #{}: {}", self.host_element_id, e);
            self.fail();
            return Initialization::Failed;
        }

        let spec = PlayerSpec {
            host_element_id: self.host_element_id.clone(),
            tag: tag.clone(),
            player_vars: self.player_vars.clone(),
        };
        match self.runtime.construct(&spec, self.sink.clone()) {
            Ok(handle) => {
                log::debug!("jukebar: constructed {} (gen {})", tag.media_id, tag.generation);
                self.slot.install(tag, handle);
                Initialization::Constructed
            }
            Err(e) => {
                log::error!("jukebar: {}", e);
                self.fail();
                Initialization::Failed
            }
        }
    }

    fn fail(&mut self) {
        self.bound = None;
        self.is_loading = false;
        self.set_phase(LifecyclePhase::Idle);
    }

    fn set_phase(&mut self, phase: LifecyclePhase) {
        if self.phase == phase {
            return;
        }
        log::debug!("jukebar: lifecycle {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
        self.history.push(phase);
        if self.history.len() > HISTORY_LIMIT {
            let overflow = self.history.len() - HISTORY_LIMIT;
            self.history.drain(..overflow);
        }
    }
}

/// Human-readable name for the runtime's numeric error codes.
pub fn describe_error_code(code: i32) -> &'static str {
    match code {
        2 => "invalid parameter",
        5 => "html5 player error",
        100 => "video not found",
        101 | 150 => "embedding not allowed",
        _ => "unknown error",
    }
}
