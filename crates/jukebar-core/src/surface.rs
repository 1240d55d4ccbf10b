//! Player surfaces: bottom bar, floating widget, inline card.
//!
//! Surfaces hold no playback state of their own. They render a
//! `SurfaceView` from the engine's snapshots and turn gestures into engine
//! operations. Only layout (position, minimized, drag offset) lives here.

use serde::Serialize;

use crate::engine::Engine;
use crate::models::{ClockState, Track};

pub const WIDGET_WIDTH: f32 = 320.0;
pub const WIDGET_HEIGHT: f32 = 180.0;
/// Gap between the widget and the viewport edge when first shown.
pub const WIDGET_MARGIN: f32 = 16.0;

/// Handle the engine uses to count mounted surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SurfaceId(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SurfaceLayout {
    pub x: f32,
    pub y: f32,
    pub minimized: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceKind {
    /// Persistent bar following the current track.
    BottomBar,
    /// Draggable, minimizable overlay following the current track.
    FloatingWidget { viewport: Viewport },
    /// Card bound to one track; a tap plays or toggles that track.
    InlineCard { track: Track },
}

impl SurfaceKind {
    pub fn name(&self) -> &'static str {
        match self {
            SurfaceKind::BottomBar => "bottom-bar",
            SurfaceKind::FloatingWidget { .. } => "floating-widget",
            SurfaceKind::InlineCard { .. } => "inline-card",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceGesture {
    TogglePlayback,
    ScrubChange(f64),
    ScrubCommit(f64),
    SetVolume(u8),
    ToggleMute,
    DragStart { x: f32, y: f32 },
    DragMove { x: f32, y: f32 },
    DragEnd,
    Minimize,
    Maximize,
    Close,
}

/// Everything a surface needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfaceView {
    pub surface: &'static str,
    pub visible: bool,
    /// The shown track is the one the intent points at.
    pub is_current: bool,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub thumbnail_url: Option<String>,
    pub is_playing: bool,
    pub is_loading: bool,
    pub is_buffering: bool,
    pub is_scrubbing: bool,
    pub position: f64,
    pub duration: f64,
    pub progress: f64,
    pub volume: u8,
    pub muted: bool,
    pub layout: SurfaceLayout,
}

pub struct PlayerSurface {
    id: SurfaceId,
    kind: SurfaceKind,
    layout: SurfaceLayout,
    drag_offset: Option<(f32, f32)>,
}

impl PlayerSurface {
    pub fn mount(engine: &mut Engine, kind: SurfaceKind) -> Self {
        let layout = match &kind {
            SurfaceKind::FloatingWidget { viewport } => SurfaceLayout {
                x: (viewport.width - WIDGET_WIDTH - WIDGET_MARGIN).max(0.0),
                y: (viewport.height - WIDGET_HEIGHT - WIDGET_MARGIN).max(0.0),
                minimized: false,
            },
            _ => SurfaceLayout::default(),
        };
        let id = engine.mount_surface();
        log::debug!("jukebar: mounted {} ({:?})", kind.name(), id);
        Self {
            id,
            kind,
            layout,
            drag_offset: None,
        }
    }

    pub fn unmount(self, engine: &mut Engine) {
        log::debug!("jukebar: unmounted {} ({:?})", self.kind.name(), self.id);
        engine.unmount_surface(self.id);
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn kind(&self) -> &SurfaceKind {
        &self.kind
    }

    pub fn layout(&self) -> SurfaceLayout {
        self.layout
    }

    fn own_track(&self) -> Option<&Track> {
        match &self.kind {
            SurfaceKind::InlineCard { track } => Some(track),
            _ => None,
        }
    }

    /// Inline cards only control playback while their track is current.
    fn controls_current(&self, engine: &Engine) -> bool {
        let intent = engine.intent();
        match self.own_track() {
            Some(track) => intent.is_current(&track.media_id),
            None => intent.track.is_some(),
        }
    }

    pub fn render(&self, engine: &Engine) -> SurfaceView {
        let intent = engine.intent();
        let shown = match self.own_track() {
            Some(track) => Some(track.clone()),
            None => intent.track.clone(),
        };
        let is_current = self.controls_current(engine);
        let visible = shown.is_some();

        let clock = engine.clock_state();
        let scrub = engine.scrub_state();
        let (position, duration) = if is_current {
            (engine.displayed_position(), clock.duration)
        } else {
            (0.0, 0.0)
        };
        let progress = ClockState {
            current_position: position,
            duration,
            is_buffering: clock.is_buffering,
        }
        .progress();
        let volume = engine.volume().snapshot();
        let quality = engine.config().thumbnail_quality;

        SurfaceView {
            surface: self.kind.name(),
            visible,
            is_current,
            title: shown.as_ref().map(|t| t.title.clone()),
            subtitle: shown.as_ref().map(|t| t.subtitle.clone()),
            thumbnail_url: shown.as_ref().map(|t| t.thumbnail_url(quality)),
            is_playing: is_current && intent.is_playing,
            is_loading: is_current && engine.is_loading(),
            is_buffering: is_current && clock.is_buffering,
            is_scrubbing: is_current && scrub.is_scrubbing,
            position,
            duration,
            progress,
            volume: volume.level,
            muted: volume.muted,
            layout: self.layout,
        }
    }

    pub fn handle(&mut self, engine: &mut Engine, gesture: SurfaceGesture) {
        match gesture {
            SurfaceGesture::TogglePlayback => {
                let track = match self.own_track() {
                    Some(track) => Some(track.clone()),
                    None => engine.intent().track,
                };
                match track {
                    Some(track) => engine.play_pause(track),
                    None => log::debug!("jukebar: {} toggle with no track", self.kind.name()),
                }
            }
            SurfaceGesture::ScrubChange(position) => {
                if self.controls_current(engine) {
                    engine.scrub_change(position);
                }
            }
            SurfaceGesture::ScrubCommit(position) => {
                if self.controls_current(engine) {
                    engine.scrub_commit(position);
                }
            }
            SurfaceGesture::SetVolume(level) => engine.set_volume(level),
            SurfaceGesture::ToggleMute => engine.toggle_mute(),
            SurfaceGesture::DragStart { x, y } => {
                if matches!(self.kind, SurfaceKind::FloatingWidget { .. }) {
                    self.drag_offset = Some((x - self.layout.x, y - self.layout.y));
                }
            }
            SurfaceGesture::DragMove { x, y } => {
                if let (Some((dx, dy)), SurfaceKind::FloatingWidget { viewport }) =
                    (self.drag_offset, &self.kind)
                {
                    let max_x = (viewport.width - WIDGET_WIDTH).max(0.0);
                    let max_y = (viewport.height - WIDGET_HEIGHT).max(0.0);
                    self.layout.x = (x - dx).clamp(0.0, max_x);
                    self.layout.y = (y - dy).clamp(0.0, max_y);
                }
            }
            SurfaceGesture::DragEnd => self.drag_offset = None,
            SurfaceGesture::Minimize => self.set_minimized(true),
            SurfaceGesture::Maximize => self.set_minimized(false),
            SurfaceGesture::Close => {
                self.drag_offset = None;
                engine.close();
            }
        }
    }

    fn set_minimized(&mut self, minimized: bool) {
        if self.own_track().is_none() {
            self.layout.minimized = minimized;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::SimulatedRuntime;

    fn track(id: &str) -> Track {
        Track::new(id, format!("Title {}", id), "Artist", format!("ref-{}", id))
    }

    fn engine() -> Engine {
        Engine::new(Box::new(SimulatedRuntime::responsive()))
    }

    #[test]
    fn bar_is_hidden_until_a_track_is_current() {
        let mut engine = engine();
        let bar = PlayerSurface::mount(&mut engine, SurfaceKind::BottomBar);
        assert!(!bar.render(&engine).visible);

        engine.play_pause(track("aaaaaaaaaaa"));
        let view = bar.render(&engine);
        assert!(view.visible);
        assert!(view.is_playing);
        assert_eq!(view.title.as_deref(), Some("Title aaaaaaaaaaa"));
        assert_eq!(
            view.thumbnail_url.as_deref(),
            Some("https://img.youtube.com/vi/aaaaaaaaaaa/hqdefault.jpg")
        );
    }

    #[test]
    fn inline_card_toggles_its_own_track() {
        let mut engine = engine();
        let mut a = PlayerSurface::mount(&mut engine, SurfaceKind::InlineCard { track: track("aaaaaaaaaaa") });
        let mut b = PlayerSurface::mount(&mut engine, SurfaceKind::InlineCard { track: track("bbbbbbbbbbb") });

        a.handle(&mut engine, SurfaceGesture::TogglePlayback);
        assert!(a.render(&engine).is_playing);
        assert!(!b.render(&engine).is_current);

        b.handle(&mut engine, SurfaceGesture::TogglePlayback);
        assert!(!a.render(&engine).is_playing);
        assert!(b.render(&engine).is_playing);

        // A card that is not current ignores scrubbing.
        a.handle(&mut engine, SurfaceGesture::ScrubChange(30.0));
        assert!(!engine.scrub_state().is_scrubbing);
    }

    #[test]
    fn widget_drags_within_the_viewport() {
        let mut engine = engine();
        let viewport = Viewport { width: 1000.0, height: 800.0 };
        let mut widget = PlayerSurface::mount(&mut engine, SurfaceKind::FloatingWidget { viewport });
        assert_eq!(widget.layout().x, 1000.0 - WIDGET_WIDTH - WIDGET_MARGIN);

        widget.handle(&mut engine, SurfaceGesture::DragStart { x: 700.0, y: 620.0 });
        widget.handle(&mut engine, SurfaceGesture::DragMove { x: -500.0, y: 10_000.0 });
        widget.handle(&mut engine, SurfaceGesture::DragEnd);
        assert_eq!(widget.layout().x, 0.0);
        assert_eq!(widget.layout().y, 800.0 - WIDGET_HEIGHT);

        // Moves after release are ignored.
        widget.handle(&mut engine, SurfaceGesture::DragMove { x: 100.0, y: 100.0 });
        assert_eq!(widget.layout().x, 0.0);

        widget.handle(&mut engine, SurfaceGesture::Minimize);
        assert!(widget.render(&engine).layout.minimized);
    }

    #[test]
    fn close_hides_every_surface() {
        let mut engine = engine();
        let mut bar = PlayerSurface::mount(&mut engine, SurfaceKind::BottomBar);
        let widget = PlayerSurface::mount(
            &mut engine,
            SurfaceKind::FloatingWidget { viewport: Viewport { width: 800.0, height: 600.0 } },
        );
        engine.play_pause(track("aaaaaaaaaaa"));
        bar.handle(&mut engine, SurfaceGesture::Close);

        assert!(!bar.render(&engine).visible);
        assert!(!widget.render(&engine).visible);
        assert!(engine.intent().track.is_none());
    }

    #[test]
    fn volume_gestures_are_shared() {
        let mut engine = engine();
        let mut bar = PlayerSurface::mount(&mut engine, SurfaceKind::BottomBar);
        let card = PlayerSurface::mount(&mut engine, SurfaceKind::InlineCard { track: track("aaaaaaaaaaa") });
        bar.handle(&mut engine, SurfaceGesture::SetVolume(40));
        bar.handle(&mut engine, SurfaceGesture::ToggleMute);
        let view = card.render(&engine);
        assert_eq!(view.volume, 40);
        assert!(view.muted);
    }
}
