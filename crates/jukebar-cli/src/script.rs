//! JSON scenarios for `jukebar run`.
//!
//! ```json
//! { "mode": "manual",
//!   "steps": [ { "op": "play", "media_id": "yt123" },
//!              { "op": "api_ready" },
//!              { "op": "ready", "media_id": "yt123" },
//!              { "op": "advance", "ms": 1000 } ] }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use jukebar_core::{
    Engine, LifecyclePhase, NativeState, PlaybackIntent, PlayerConfig, PlayerResult,
    PlayerSurface, SimulatedRuntime, SurfaceGesture, SurfaceKind, SurfaceView, Track,
};

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Manual,
    #[default]
    Responsive,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Play {
        media_id: String,
        #[serde(default)]
        title: String,
        #[serde(default)]
        subtitle: String,
    },
    Toggle,
    Advance { ms: u64 },
    Scrub { position: f64 },
    Commit { position: f64 },
    Volume { level: u8 },
    Mute,
    Close,
    Mount,
    Unmount,
    ApiReady,
    Ready { media_id: String },
    /// Native state code (-1, 0, 1, 2, 3, 5).
    State { media_id: String, code: i32 },
    Error { media_id: String, code: i32 },
    Duration { media_id: String, seconds: f64 },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub mode: Mode,
    pub steps: Vec<Step>,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub calls: Vec<String>,
    pub phases: Vec<LifecyclePhase>,
    pub intent: PlaybackIntent,
    pub view: Option<SurfaceView>,
    pub now_ms: u64,
}

impl Scenario {
    pub fn load(path: &Path) -> PlayerResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Play every step against a fresh simulated runtime with one bar mounted.
    pub fn run(&self, config: PlayerConfig) -> Report {
        let sim = match self.mode {
            Mode::Manual => SimulatedRuntime::new(),
            Mode::Responsive => SimulatedRuntime::responsive(),
        };
        let mut engine = Engine::with_config(Box::new(sim.clone()), config);
        let mut bars = vec![PlayerSurface::mount(&mut engine, SurfaceKind::BottomBar)];

        for step in &self.steps {
            log::debug!("jukebar: step {:?}", step);
            match step {
                Step::Play { media_id, title, subtitle } => {
                    let title = if title.is_empty() { media_id.clone() } else { title.clone() };
                    engine.play_pause(Track::new(media_id.as_str(), title, subtitle.as_str(), media_id.as_str()));
                }
                Step::Toggle => match bars.last_mut() {
                    Some(bar) => bar.handle(&mut engine, SurfaceGesture::TogglePlayback),
                    None => eprintln!("toggle: no surface mounted"),
                },
                Step::Advance { ms } => engine.advance(*ms),
                Step::Scrub { position } => engine.scrub_change(*position),
                Step::Commit { position } => engine.scrub_commit(*position),
                Step::Volume { level } => engine.set_volume(*level),
                Step::Mute => engine.toggle_mute(),
                Step::Close => engine.close(),
                Step::Mount => bars.push(PlayerSurface::mount(&mut engine, SurfaceKind::BottomBar)),
                Step::Unmount => match bars.pop() {
                    Some(bar) => bar.unmount(&mut engine),
                    None => eprintln!("unmount: no surface mounted"),
                },
                Step::ApiReady => {
                    if !sim.finish_loading() {
                        eprintln!("api_ready: loader was never injected");
                    }
                    engine.pump();
                }
                Step::Ready { media_id } => {
                    if !sim.fire_ready(media_id) {
                        eprintln!("ready: no instance for {}", media_id);
                    }
                    engine.pump();
                }
                Step::State { media_id, code } => {
                    match NativeState::from_code(*code) {
                        Some(state) => {
                            sim.fire_state(media_id, state);
                        }
                        None => eprintln!("state: unknown code {}", code),
                    }
                    engine.pump();
                }
                Step::Error { media_id, code } => {
                    sim.fire_error(media_id, *code);
                    engine.pump();
                }
                Step::Duration { media_id, seconds } => sim.set_duration(media_id, *seconds),
            }
        }

        let view = bars.last().map(|bar| bar.render(&engine));
        let report = Report {
            calls: sim.calls().iter().map(|c| c.to_string()).collect(),
            phases: engine.phase_history().to_vec(),
            intent: engine.intent(),
            view,
            now_ms: engine.now_ms(),
        };
        engine.shutdown();
        report
    }
}
