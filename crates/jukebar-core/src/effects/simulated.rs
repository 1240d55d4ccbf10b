//! Deterministic in-process media runtime.
//!
//! Stands in for the browser player in tests and in the CLI. Every mutating
//! call lands in an ordered call log, each instance keeps a simulated
//! playhead that moves with `advance_to`, and native callbacks are either
//! fired by hand (manual mode) or echoed automatically (responsive mode).
//! Clones share one runtime, so a test can keep a handle while the engine
//! owns another.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use super::{EventSink, InstanceTag, MediaRuntime, PlayerInstance, PlayerSpec, RuntimeEvent};
use crate::error::{PlayerError, PlayerResult};
use crate::models::NativeState;

/// One observable side effect against the runtime, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeCall {
    InjectLoader,
    EnsureHost { element_id: String },
    Construct { media_id: String, generation: u64 },
    Destroy { media_id: String, generation: u64 },
    PlayVideo { media_id: String },
    PauseVideo { media_id: String },
    StopVideo { media_id: String },
    SeekTo { media_id: String, seconds: f64 },
    SetVolume { media_id: String, level: u8 },
    Mute { media_id: String },
    UnMute { media_id: String },
}

impl fmt::Display for RuntimeCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeCall::InjectLoader => write!(f, "inject-loader"),
            RuntimeCall::EnsureHost { element_id } => write!(f, "ensure-host #{}", element_id),
            RuntimeCall::Construct { media_id, generation } => {
                write!(f, "construct {} (gen {})", media_id, generation)
            }
            RuntimeCall::Destroy { media_id, generation } => {
                write!(f, "destroy {} (gen {})", media_id, generation)
            }
            RuntimeCall::PlayVideo { media_id } => write!(f, "playVideo {}", media_id),
            RuntimeCall::PauseVideo { media_id } => write!(f, "pauseVideo {}", media_id),
            RuntimeCall::StopVideo { media_id } => write!(f, "stopVideo {}", media_id),
            RuntimeCall::SeekTo { media_id, seconds } => {
                write!(f, "seekTo {} {:.1}s", media_id, seconds)
            }
            RuntimeCall::SetVolume { media_id, level } => {
                write!(f, "setVolume {} {}", media_id, level)
            }
            RuntimeCall::Mute { media_id } => write!(f, "mute {}", media_id),
            RuntimeCall::UnMute { media_id } => write!(f, "unMute {}", media_id),
        }
    }
}

struct SimPlayer {
    tag: InstanceTag,
    sink: EventSink,
    duration: f64,
    position: f64,
    playing: bool,
    ready: bool,
    destroyed: bool,
}

impl SimPlayer {
    fn emit(&self, event: RuntimeEvent) {
        // The engine may be gone already; a closed channel is fine.
        let _ = self.sink.send(event);
    }
}

struct SimState {
    responsive: bool,
    api_loaded: bool,
    loader_sink: Option<EventSink>,
    hosts: Vec<String>,
    players: Vec<SimPlayer>,
    calls: Vec<RuntimeCall>,
    durations: HashMap<String, f64>,
    failing_constructs: HashSet<String>,
    failing_methods: HashSet<&'static str>,
    now_ms: u64,
}

impl SimState {
    fn latest_mut(&mut self, media_id: &str) -> Option<&mut SimPlayer> {
        self.players
            .iter_mut()
            .rev()
            .find(|p| p.tag.media_id == media_id)
    }
}

/// Cloneable handle to one simulated runtime.
#[derive(Clone)]
pub struct SimulatedRuntime {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedRuntime {
    pub const DEFAULT_DURATION: f64 = 180.0;

    /// Manual mode: nothing happens until the caller fires it.
    pub fn new() -> Self {
        Self::build(false)
    }

    /// Loader completes at once, ready fires on construction, play/pause
    /// echo their state changes and the end of media emits `Ended`.
    pub fn responsive() -> Self {
        Self::build(true)
    }

    fn build(responsive: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                responsive,
                api_loaded: false,
                loader_sink: None,
                hosts: Vec::new(),
                players: Vec::new(),
                calls: Vec::new(),
                durations: HashMap::new(),
                failing_constructs: HashSet::new(),
                failing_methods: HashSet::new(),
                now_ms: 0,
            })),
        }
    }

    // -----------------------------------------------------------------------
    // Setup and failure injection
    // -----------------------------------------------------------------------

    pub fn set_duration(&self, media_id: &str, seconds: f64) {
        self.state.lock().durations.insert(media_id.to_string(), seconds);
    }

    /// Constructing a player for `media_id` throws until cleared.
    pub fn fail_construct(&self, media_id: &str) {
        self.state.lock().failing_constructs.insert(media_id.to_string());
    }

    /// Calls to the named native method throw until cleared.
    pub fn fail_method(&self, method: &'static str) {
        self.state.lock().failing_methods.insert(method);
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock();
        state.failing_constructs.clear();
        state.failing_methods.clear();
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Constructed and not yet destroyed.
    pub fn live_instances(&self) -> usize {
        self.state.lock().players.iter().filter(|p| !p.destroyed).count()
    }

    pub fn host_elements(&self) -> Vec<String> {
        self.state.lock().hosts.clone()
    }

    /// Playhead of the newest live instance bound to `media_id`.
    pub fn playhead(&self, media_id: &str) -> Option<f64> {
        self.state
            .lock()
            .players
            .iter()
            .rev()
            .find(|p| p.tag.media_id == media_id && !p.destroyed)
            .map(|p| p.position)
    }

    pub fn set_playhead(&self, media_id: &str, seconds: f64) {
        if let Some(p) = self.state.lock().latest_mut(media_id) {
            p.position = seconds.clamp(0.0, p.duration);
        }
    }

    // -----------------------------------------------------------------------
    // Manual event drivers
    // -----------------------------------------------------------------------

    /// Signal global readiness. False if no loader was injected.
    pub fn finish_loading(&self) -> bool {
        let mut state = self.state.lock();
        let Some(sink) = state.loader_sink.clone() else {
            return false;
        };
        state.api_loaded = true;
        let _ = sink.send(RuntimeEvent::ApiReady);
        true
    }

    /// Fire `onReady` for the newest instance bound to `media_id`, destroyed
    /// or not, which is how late callbacks are reproduced.
    pub fn fire_ready(&self, media_id: &str) -> bool {
        let mut state = self.state.lock();
        let Some(player) = state.latest_mut(media_id) else {
            return false;
        };
        player.ready = true;
        player.emit(RuntimeEvent::Ready { tag: player.tag.clone() });
        true
    }

    pub fn fire_state(&self, media_id: &str, native: NativeState) -> bool {
        let mut state = self.state.lock();
        let Some(player) = state.latest_mut(media_id) else {
            return false;
        };
        match native {
            NativeState::Playing => player.playing = true,
            NativeState::Paused | NativeState::Buffering => player.playing = false,
            NativeState::Ended => {
                player.playing = false;
                player.position = player.duration;
            }
            NativeState::Unstarted | NativeState::Cued => {}
        }
        player.emit(RuntimeEvent::StateChange {
            tag: player.tag.clone(),
            state: native,
        });
        true
    }

    pub fn fire_error(&self, media_id: &str, code: i32) -> bool {
        let mut state = self.state.lock();
        let Some(player) = state.latest_mut(media_id) else {
            return false;
        };
        player.playing = false;
        player.emit(RuntimeEvent::Error {
            tag: player.tag.clone(),
            code,
        });
        true
    }
}

impl Default for SimulatedRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaRuntime for SimulatedRuntime {
    fn is_api_loaded(&self) -> bool {
        self.state.lock().api_loaded
    }

    fn inject_loader(&mut self, sink: EventSink) -> PlayerResult<()> {
        let mut state = self.state.lock();
        state.calls.push(RuntimeCall::InjectLoader);
        if state.responsive {
            state.api_loaded = true;
            let _ = sink.send(RuntimeEvent::ApiReady);
        }
        state.loader_sink = Some(sink);
        Ok(())
    }

    fn ensure_host_element(&mut self, element_id: &str) -> PlayerResult<()> {
        let mut state = self.state.lock();
        if !state.hosts.iter().any(|h| h == element_id) {
            state.hosts.push(element_id.to_string());
            state.calls.push(RuntimeCall::EnsureHost {
                element_id: element_id.to_string(),
            });
        }
        Ok(())
    }

    fn construct(
        &mut self,
        spec: &PlayerSpec,
        sink: EventSink,
    ) -> PlayerResult<Box<dyn PlayerInstance>> {
        let mut state = self.state.lock();
        let media_id = spec.tag.media_id.clone();
        if !state.api_loaded {
            return Err(PlayerError::Construction {
                media_id,
                reason: "runtime not loaded".into(),
            });
        }
        if state.failing_constructs.contains(&media_id) {
            return Err(PlayerError::Construction {
                media_id,
                reason: "injected failure".into(),
            });
        }

        let duration = state
            .durations
            .get(&media_id)
            .copied()
            .unwrap_or(Self::DEFAULT_DURATION);
        let responsive = state.responsive;
        state.calls.push(RuntimeCall::Construct {
            media_id,
            generation: spec.tag.generation,
        });
        let player = SimPlayer {
            tag: spec.tag.clone(),
            sink,
            duration,
            position: 0.0,
            playing: false,
            ready: responsive,
            destroyed: false,
        };
        if responsive {
            player.emit(RuntimeEvent::Ready { tag: spec.tag.clone() });
        }
        state.players.push(player);

        Ok(Box::new(SimInstance {
            state: Arc::clone(&self.state),
            generation: spec.tag.generation,
        }))
    }

    fn advance_to(&mut self, now_ms: u64) {
        let mut state = self.state.lock();
        let elapsed = now_ms.saturating_sub(state.now_ms) as f64 / 1000.0;
        state.now_ms = now_ms;
        let responsive = state.responsive;
        for player in state.players.iter_mut().filter(|p| p.playing && !p.destroyed) {
            player.position += elapsed;
            if player.position >= player.duration {
                player.position = player.duration;
                player.playing = false;
                if responsive {
                    player.emit(RuntimeEvent::StateChange {
                        tag: player.tag.clone(),
                        state: NativeState::Ended,
                    });
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Instance
// ---------------------------------------------------------------------------

struct SimInstance {
    state: Arc<Mutex<SimState>>,
    generation: u64,
}

impl SimInstance {
    fn mutate<T>(
        &self,
        method: &'static str,
        f: impl FnOnce(&mut SimPlayer, bool) -> (Option<RuntimeCall>, T),
    ) -> PlayerResult<T> {
        let mut state = self.state.lock();
        if state.failing_methods.contains(method) {
            return Err(PlayerError::Call {
                method,
                reason: "injected failure".into(),
            });
        }
        let responsive = state.responsive;
        let generation = self.generation;
        let player = state
            .players
            .iter_mut()
            .find(|p| p.tag.generation == generation)
            .ok_or(PlayerError::Destroyed)?;
        if player.destroyed {
            return Err(PlayerError::Destroyed);
        }
        if !player.ready && method != "destroy" {
            return Err(PlayerError::NotReady);
        }
        let (call, out) = f(player, responsive);
        if let Some(call) = call {
            state.calls.push(call);
        }
        Ok(out)
    }

    fn read(&self, method: &'static str, f: impl FnOnce(&SimPlayer) -> f64) -> PlayerResult<f64> {
        self.mutate(method, |player, _| (None, f(player)))
    }
}

impl PlayerInstance for SimInstance {
    fn play_video(&mut self) -> PlayerResult<()> {
        self.mutate("playVideo", |p, responsive| {
            if p.position >= p.duration {
                p.position = 0.0;
            }
            p.playing = true;
            if responsive {
                p.emit(RuntimeEvent::StateChange {
                    tag: p.tag.clone(),
                    state: NativeState::Playing,
                });
            }
            (Some(RuntimeCall::PlayVideo { media_id: p.tag.media_id.clone() }), ())
        })
    }

    fn pause_video(&mut self) -> PlayerResult<()> {
        self.mutate("pauseVideo", |p, responsive| {
            p.playing = false;
            if responsive {
                p.emit(RuntimeEvent::StateChange {
                    tag: p.tag.clone(),
                    state: NativeState::Paused,
                });
            }
            (Some(RuntimeCall::PauseVideo { media_id: p.tag.media_id.clone() }), ())
        })
    }

    fn stop_video(&mut self) -> PlayerResult<()> {
        self.mutate("stopVideo", |p, _| {
            p.playing = false;
            p.position = 0.0;
            (Some(RuntimeCall::StopVideo { media_id: p.tag.media_id.clone() }), ())
        })
    }

    fn seek_to(&mut self, seconds: f64, _allow_seek_ahead: bool) -> PlayerResult<()> {
        self.mutate("seekTo", |p, _| {
            p.position = seconds.clamp(0.0, p.duration);
            (
                Some(RuntimeCall::SeekTo {
                    media_id: p.tag.media_id.clone(),
                    seconds,
                }),
                (),
            )
        })
    }

    fn set_volume(&mut self, level: u8) -> PlayerResult<()> {
        self.mutate("setVolume", |p, _| {
            (
                Some(RuntimeCall::SetVolume {
                    media_id: p.tag.media_id.clone(),
                    level,
                }),
                (),
            )
        })
    }

    fn mute(&mut self) -> PlayerResult<()> {
        self.mutate("mute", |p, _| {
            (Some(RuntimeCall::Mute { media_id: p.tag.media_id.clone() }), ())
        })
    }

    fn un_mute(&mut self) -> PlayerResult<()> {
        self.mutate("unMute", |p, _| {
            (Some(RuntimeCall::UnMute { media_id: p.tag.media_id.clone() }), ())
        })
    }

    fn current_time(&self) -> PlayerResult<f64> {
        self.read("getCurrentTime", |p| p.position)
    }

    fn duration(&self) -> PlayerResult<f64> {
        self.read("getDuration", |p| p.duration)
    }

    fn destroy(&mut self) -> PlayerResult<()> {
        self.mutate("destroy", |p, _| {
            p.destroyed = true;
            p.playing = false;
            (
                Some(RuntimeCall::Destroy {
                    media_id: p.tag.media_id.clone(),
                    generation: p.tag.generation,
                }),
                (),
            )
        })
    }
}
