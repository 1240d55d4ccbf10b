//! The external media runtime seam.
//!
//! The engine never touches the third-party player directly; it talks to a
//! `MediaRuntime` that can load itself and construct `PlayerInstance`s.
//! Native callbacks come back asynchronously as `RuntimeEvent`s over a
//! channel, so a callback can always arrive after the request that caused
//! it has been superseded.

use std::sync::mpsc::Sender;

use crate::error::PlayerResult;
use crate::models::NativeState;

pub mod simulated;

pub use simulated::{RuntimeCall, SimulatedRuntime};

// ---------------------------------------------------------------------------
// Identity and events
// ---------------------------------------------------------------------------

/// Identity of one constructed instance.
///
/// `generation` increments on every construction, so a late callback from a
/// destroyed instance never matches the live one even when both were bound
/// to the same media id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceTag {
    pub generation: u64,
    pub media_id: String,
}

/// Native callbacks, delivered in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeEvent {
    /// The runtime library finished loading (global readiness).
    ApiReady,
    Ready { tag: InstanceTag },
    StateChange { tag: InstanceTag, state: NativeState },
    Error { tag: InstanceTag, code: i32 },
}

pub type EventSink = Sender<RuntimeEvent>;

/// Options handed to the runtime's player constructor.
#[derive(Debug, Clone)]
pub struct PlayerSpec {
    pub host_element_id: String,
    pub tag: InstanceTag,
    pub player_vars: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// The loadable third-party runtime.
pub trait MediaRuntime {
    fn is_api_loaded(&self) -> bool;

    /// Insert the runtime loader. Readiness arrives later as
    /// `RuntimeEvent::ApiReady` through `sink`.
    fn inject_loader(&mut self, sink: EventSink) -> PlayerResult<()>;

    /// Create the hidden host element if it does not exist yet.
    fn ensure_host_element(&mut self, element_id: &str) -> PlayerResult<()>;

    fn construct(
        &mut self,
        spec: &PlayerSpec,
        sink: EventSink,
    ) -> PlayerResult<Box<dyn PlayerInstance>>;

    /// Scheduler clock hook for runtimes that follow the engine's time.
    /// Browser runtimes keep their own clock and ignore it.
    fn advance_to(&mut self, _now_ms: u64) {}
}

/// A live external player bound to one media id.
pub trait PlayerInstance {
    fn play_video(&mut self) -> PlayerResult<()>;
    fn pause_video(&mut self) -> PlayerResult<()>;
    fn stop_video(&mut self) -> PlayerResult<()>;
    fn seek_to(&mut self, seconds: f64, allow_seek_ahead: bool) -> PlayerResult<()>;
    fn set_volume(&mut self, level: u8) -> PlayerResult<()>;
    fn mute(&mut self) -> PlayerResult<()>;
    fn un_mute(&mut self) -> PlayerResult<()>;
    fn current_time(&self) -> PlayerResult<f64>;
    fn duration(&self) -> PlayerResult<f64>;
    fn destroy(&mut self) -> PlayerResult<()>;
}

// ---------------------------------------------------------------------------
// Noop runtime
// ---------------------------------------------------------------------------

/// Headless runtime: always loaded, constructs silent instances, never
/// emits events. Instances therefore never leave `Initializing`.
pub struct NoopRuntime;

impl MediaRuntime for NoopRuntime {
    fn is_api_loaded(&self) -> bool { true }
    fn inject_loader(&mut self, _: EventSink) -> PlayerResult<()> { Ok(()) }
    fn ensure_host_element(&mut self, _: &str) -> PlayerResult<()> { Ok(()) }
    fn construct(&mut self, _: &PlayerSpec, _: EventSink) -> PlayerResult<Box<dyn PlayerInstance>> {
        Ok(Box::new(NoopInstance))
    }
}

struct NoopInstance;

impl PlayerInstance for NoopInstance {
    fn play_video(&mut self) -> PlayerResult<()> { Ok(()) }
    fn pause_video(&mut self) -> PlayerResult<()> { Ok(()) }
    fn stop_video(&mut self) -> PlayerResult<()> { Ok(()) }
    fn seek_to(&mut self, _: f64, _: bool) -> PlayerResult<()> { Ok(()) }
    fn set_volume(&mut self, _: u8) -> PlayerResult<()> { Ok(()) }
    fn mute(&mut self) -> PlayerResult<()> { Ok(()) }
    fn un_mute(&mut self) -> PlayerResult<()> { Ok(()) }
    fn current_time(&self) -> PlayerResult<f64> { Ok(0.0) }
    fn duration(&self) -> PlayerResult<f64> { Ok(0.0) }
    fn destroy(&mut self) -> PlayerResult<()> { Ok(()) }
}
