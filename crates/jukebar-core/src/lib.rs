//! jukebar-core — embedded playback controller for an externally hosted
//! video player.
//!
//! One shared intent store drives one external player instance. Surfaces
//! only read snapshots and send gestures; the engine is the single writer
//! of everything native.
//!
//! # Architecture
//!
//! ```text
//! Surfaces (bar, widget, inline card)  : render SurfaceView, send gestures
//!        │
//! Engine (event loop)                  : pump / advance
//!        │
//! Stores (intent, volume) · Clock · Scrub · Lifecycle
//!        │
//! Effects (MediaRuntime / PlayerInstance)
//! ```

pub mod clock;
pub mod config;
pub mod effects;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod links;
pub mod models;
pub mod scrub;
pub mod store;
pub mod surface;

pub use config::PlayerConfig;
pub use effects::{MediaRuntime, NoopRuntime, PlayerInstance, RuntimeCall, SimulatedRuntime};
pub use engine::Engine;
pub use error::{PlayerError, PlayerResult};
pub use models::*;
pub use store::{PlaybackIntentStore, VolumeStore};
pub use surface::{PlayerSurface, SurfaceGesture, SurfaceKind, SurfaceView, Viewport};

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str, media_id: &str) -> Track {
        Track::new(media_id, format!("song {}", id), "artist", id)
    }

    fn session(sim: &SimulatedRuntime) -> (Engine, PlayerSurface) {
        let mut engine = Engine::new(Box::new(sim.clone()));
        let bar = PlayerSurface::mount(&mut engine, SurfaceKind::BottomBar);
        (engine, bar)
    }

    fn position_of(calls: &[RuntimeCall], wanted: &RuntimeCall) -> usize {
        calls
            .iter()
            .position(|c| c == wanted)
            .unwrap_or_else(|| panic!("{} not in {:?}", wanted, calls))
    }

    fn seeks(calls: &[RuntimeCall]) -> Vec<f64> {
        calls
            .iter()
            .filter_map(|c| match c {
                RuntimeCall::SeekTo { seconds, .. } => Some(*seconds),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn play_pause_toggles_then_switches() {
        let sim = SimulatedRuntime::responsive();
        let (mut engine, _bar) = session(&sim);
        let a = track("s1", "yt123");
        let b = track("s2", "yt456");

        engine.play_pause(a.clone());
        assert!(engine.intent().is_playing);

        engine.play_pause(a.clone());
        let intent = engine.intent();
        assert_eq!(intent.track.as_ref(), Some(&a));
        assert!(!intent.is_playing);

        engine.play_pause(b.clone());
        let intent = engine.intent();
        assert_eq!(intent.track.as_ref(), Some(&b));
        assert!(intent.is_playing);
    }

    #[test]
    fn first_play_walks_the_lifecycle() {
        let sim = SimulatedRuntime::responsive();
        sim.set_duration("yt123", 215.0);
        let (mut engine, _bar) = session(&sim);

        engine.play_pause(track("s1", "yt123"));
        assert_eq!(engine.phase(), LifecyclePhase::Ready);
        assert_eq!(engine.clock_state().duration, 215.0);

        engine.advance(engine.config().autoplay_grace_ms);
        assert_eq!(engine.phase(), LifecyclePhase::Playing);
        assert_eq!(
            engine.phase_history(),
            &[
                LifecyclePhase::Idle,
                LifecyclePhase::ApiLoading,
                LifecyclePhase::Initializing,
                LifecyclePhase::Ready,
                LifecyclePhase::Playing,
            ]
        );
        assert!(engine.intent().is_playing);
        assert!(engine.is_polling());
        assert!(!engine.is_loading());
    }

    #[test]
    fn switching_before_ready_discards_the_pending_init() {
        let sim = SimulatedRuntime::new();
        let (mut engine, _bar) = session(&sim);

        engine.play_pause(track("s1", "yt123"));
        assert_eq!(engine.phase(), LifecyclePhase::ApiLoading);
        engine.play_pause(track("s2", "yt456"));

        assert!(sim.finish_loading());
        engine.pump();
        assert!(sim.fire_ready("yt456"));
        assert!(!sim.fire_ready("yt123"));
        engine.pump();

        let constructed: Vec<_> = sim
            .calls()
            .into_iter()
            .filter(|c| matches!(c, RuntimeCall::Construct { .. }))
            .collect();
        assert_eq!(
            constructed,
            vec![RuntimeCall::Construct { media_id: "yt456".into(), generation: 1 }]
        );
        assert_eq!(engine.phase(), LifecyclePhase::Ready);
        assert_eq!(engine.intent().media_id(), Some("yt456"));
        assert_eq!(sim.live_instances(), 1);
    }

    #[test]
    fn old_instance_is_destroyed_before_the_next_is_built() {
        let sim = SimulatedRuntime::responsive();
        let (mut engine, _bar) = session(&sim);

        engine.play_pause(track("s1", "yt123"));
        engine.advance(1000);
        engine.play_pause(track("s2", "yt456"));
        engine.play_pause(track("s3", "yt789"));

        let calls = sim.calls();
        let destroy_1 = position_of(&calls, &RuntimeCall::Destroy { media_id: "yt123".into(), generation: 1 });
        let build_2 = position_of(&calls, &RuntimeCall::Construct { media_id: "yt456".into(), generation: 2 });
        let destroy_2 = position_of(&calls, &RuntimeCall::Destroy { media_id: "yt456".into(), generation: 2 });
        let build_3 = position_of(&calls, &RuntimeCall::Construct { media_id: "yt789".into(), generation: 3 });
        assert!(destroy_1 < build_2);
        assert!(destroy_2 < build_3);
        assert_eq!(sim.live_instances(), 1);
    }

    #[test]
    fn close_twice_is_the_same_as_once() {
        let sim = SimulatedRuntime::responsive();
        let (mut engine, bar) = session(&sim);
        engine.play_pause(track("s1", "yt123"));
        engine.advance(1000);

        engine.close();
        let intent = engine.intent();
        let phase = engine.phase();
        let calls = sim.calls();
        assert!(calls.contains(&RuntimeCall::StopVideo { media_id: "yt123".into() }));
        assert_eq!(sim.live_instances(), 0);

        engine.close();
        assert_eq!(engine.intent(), intent);
        assert_eq!(engine.phase(), phase);
        assert_eq!(sim.calls(), calls);
        assert_eq!(engine.clock_state(), ClockState::default());
        assert!(!bar.render(&engine).visible);
    }

    #[test]
    fn scrubbing_suspends_polls_and_commits_one_seek() {
        let sim = SimulatedRuntime::responsive();
        let (mut engine, _bar) = session(&sim);
        engine.play_pause(track("s1", "yt123"));
        engine.advance(250);
        sim.set_playhead("yt123", 10.0);
        engine.advance(500);
        let before = engine.clock_state().current_position;
        assert!(before >= 10.0);

        for pos in [10.0, 25.0, 40.0] {
            engine.scrub_change(pos);
            assert_eq!(engine.displayed_position(), pos);
        }
        assert!(!engine.is_polling());
        engine.advance(2000);
        assert_eq!(engine.clock_state().current_position, before);
        assert_eq!(engine.displayed_position(), 40.0);
        assert!(seeks(&sim.calls()).is_empty());

        engine.scrub_commit(40.0);
        assert_eq!(seeks(&sim.calls()), vec![40.0]);
        assert_eq!(engine.clock_state().current_position, 40.0);
        assert!(engine.is_polling());

        engine.advance(engine.config().poll_interval_ms);
        assert!(engine.clock_state().current_position >= 40.0);
        engine.advance(1500);
        assert!(engine.clock_state().current_position >= 40.0);
        assert_eq!(seeks(&sim.calls()).len(), 1);
    }

    #[test]
    fn stale_ready_does_not_touch_the_current_track() {
        let sim = SimulatedRuntime::new();
        sim.set_duration("yt123", 100.0);
        sim.set_duration("yt456", 200.0);
        let (mut engine, _bar) = session(&sim);

        engine.play_pause(track("s1", "yt123"));
        sim.finish_loading();
        engine.pump();
        engine.play_pause(track("s2", "yt456"));
        assert_eq!(sim.live_instances(), 1);

        // Late ready from the destroyed yt123 instance.
        sim.fire_ready("yt123");
        engine.pump();
        assert_eq!(engine.phase(), LifecyclePhase::Initializing);
        assert_eq!(engine.clock_state().duration, 0.0);

        sim.fire_ready("yt456");
        engine.pump();
        engine.set_volume(30);
        sim.clear_calls();

        sim.fire_ready("yt123");
        sim.fire_state("yt123", NativeState::Ended);
        engine.pump();
        assert!(sim.calls().is_empty());
        assert_eq!(engine.clock_state().duration, 200.0);
        assert_eq!(engine.phase(), LifecyclePhase::Ready);
        assert_eq!(engine.volume().snapshot().level, 30);
        assert!(engine.intent().is_playing);
    }

    #[test]
    fn ended_resets_position_and_stops() {
        let sim = SimulatedRuntime::responsive();
        sim.set_duration("yt123", 2.0);
        let (mut engine, _bar) = session(&sim);
        engine.play_pause(track("s1", "yt123"));
        engine.advance(1250);
        assert!(engine.clock_state().current_position > 0.0);

        engine.advance(3000);
        assert!(!engine.intent().is_playing);
        assert_eq!(engine.clock_state().current_position, 0.0);
        assert_eq!(engine.phase(), LifecyclePhase::Ended);
        assert!(!engine.is_polling());
        assert_eq!(engine.intent().media_id(), Some("yt123"));
    }

    #[test]
    fn construction_failure_waits_for_the_user() {
        let sim = SimulatedRuntime::responsive();
        sim.fail_construct("yt123");
        let (mut engine, _bar) = session(&sim);

        engine.play_pause(track("s1", "yt123"));
        assert!(!engine.intent().is_playing);
        assert_eq!(engine.phase(), LifecyclePhase::Idle);
        assert!(!engine.is_loading());

        engine.advance(5000);
        assert_eq!(sim.live_instances(), 0);

        sim.clear_failures();
        engine.play_pause(track("s1", "yt123"));
        assert!(engine.intent().is_playing);
        assert_eq!(sim.live_instances(), 1);
        assert_eq!(engine.phase(), LifecyclePhase::Ready);
    }

    #[test]
    fn native_error_degrades_to_nothing_playing() {
        let sim = SimulatedRuntime::responsive();
        let (mut engine, _bar) = session(&sim);
        engine.play_pause(track("s1", "yt123"));
        engine.advance(1000);

        sim.fire_error("yt123", 150);
        engine.pump();
        assert!(!engine.intent().is_playing);
        assert_eq!(sim.live_instances(), 0);
        assert!(!engine.is_polling());
        assert_eq!(engine.phase(), LifecyclePhase::Destroyed);
    }

    #[test]
    fn buffering_keeps_the_intent() {
        let sim = SimulatedRuntime::responsive();
        let (mut engine, _bar) = session(&sim);
        engine.play_pause(track("s1", "yt123"));
        engine.advance(1000);

        sim.fire_state("yt123", NativeState::Buffering);
        engine.pump();
        assert!(engine.clock_state().is_buffering);
        assert!(engine.intent().is_playing);
        assert!(!engine.is_polling());

        sim.fire_state("yt123", NativeState::Playing);
        engine.pump();
        assert!(!engine.clock_state().is_buffering);
        assert!(engine.is_polling());
    }

    #[test]
    fn pause_during_grace_cancels_autoplay() {
        let sim = SimulatedRuntime::responsive();
        let (mut engine, _bar) = session(&sim);
        engine.play_pause(track("s1", "yt123"));
        engine.set_playing(false);
        engine.advance(1000);

        let calls = sim.calls();
        assert!(!calls.contains(&RuntimeCall::PlayVideo { media_id: "yt123".into() }));
        assert!(calls.contains(&RuntimeCall::PauseVideo { media_id: "yt123".into() }));
        assert_eq!(engine.phase(), LifecyclePhase::Paused);
    }

    #[test]
    fn close_while_loading_constructs_nothing() {
        let sim = SimulatedRuntime::new();
        let (mut engine, bar) = session(&sim);
        engine.play_pause(track("s1", "yt123"));
        engine.close();

        sim.finish_loading();
        engine.pump();
        assert_eq!(sim.live_instances(), 0);
        assert_eq!(engine.phase(), LifecyclePhase::Idle);
        assert!(!bar.render(&engine).visible);
    }

    #[test]
    fn last_unmount_destroys_and_remount_restores() {
        let sim = SimulatedRuntime::responsive();
        let (mut engine, bar) = session(&sim);
        engine.play_pause(track("s1", "yt123"));
        engine.advance(1000);

        bar.unmount(&mut engine);
        assert_eq!(sim.live_instances(), 0);
        assert_eq!(engine.intent().media_id(), Some("yt123"));

        let _widget = PlayerSurface::mount(
            &mut engine,
            SurfaceKind::FloatingWidget { viewport: Viewport { width: 800.0, height: 600.0 } },
        );
        assert_eq!(sim.live_instances(), 1);
        assert!(sim
            .calls()
            .contains(&RuntimeCall::Construct { media_id: "yt123".into(), generation: 2 }));
    }

    #[test]
    fn volume_follows_every_new_instance() {
        let sim = SimulatedRuntime::responsive();
        let (mut engine, _bar) = session(&sim);
        engine.set_volume(30);
        engine.toggle_mute();

        engine.play_pause(track("s1", "yt123"));
        engine.play_pause(track("s2", "yt456"));
        let calls = sim.calls();
        for media_id in ["yt123", "yt456"] {
            assert!(calls.contains(&RuntimeCall::SetVolume { media_id: media_id.into(), level: 30 }));
            assert!(calls.contains(&RuntimeCall::Mute { media_id: media_id.into() }));
        }

        sim.clear_calls();
        engine.set_muted(false);
        assert_eq!(
            sim.calls(),
            vec![
                RuntimeCall::SetVolume { media_id: "yt456".into(), level: 30 },
                RuntimeCall::UnMute { media_id: "yt456".into() },
            ]
        );
    }

    #[test]
    fn noop_runtime_never_leaves_initializing() {
        let mut engine = Engine::new(Box::new(NoopRuntime));
        let _bar = PlayerSurface::mount(&mut engine, SurfaceKind::BottomBar);
        engine.play_pause(track("s1", "yt123"));
        engine.advance(10_000);
        assert_eq!(engine.phase(), LifecyclePhase::Initializing);
        assert!(engine.is_loading());
        assert!(!engine.is_polling());
    }

    #[test]
    fn nothing_is_built_without_a_surface() {
        let sim = SimulatedRuntime::responsive();
        let mut engine = Engine::new(Box::new(sim.clone()));
        engine.play_pause(track("s1", "yt123"));
        assert!(sim.calls().is_empty());
        assert!(engine.intent().is_playing);
    }

    #[test]
    fn commit_after_pause_mid_drag_leaves_polling_off() {
        let sim = SimulatedRuntime::responsive();
        let (mut engine, _bar) = session(&sim);
        engine.play_pause(track("s1", "yt123"));
        engine.advance(1000);
        assert!(engine.is_polling());

        engine.scrub_change(20.0);
        engine.set_playing(false);
        engine.scrub_commit(40.0);

        assert_eq!(engine.phase(), LifecyclePhase::Paused);
        assert!(!engine.intent().is_playing);
        assert!(!engine.is_polling());
        engine.advance(2000);
        assert_eq!(engine.clock_state().current_position, 40.0);
    }

    #[test]
    fn commit_after_end_mid_drag_leaves_polling_off() {
        let sim = SimulatedRuntime::responsive();
        let (mut engine, _bar) = session(&sim);
        engine.play_pause(track("s1", "yt123"));
        engine.advance(1000);

        engine.scrub_change(20.0);
        sim.fire_state("yt123", NativeState::Ended);
        engine.pump();
        engine.scrub_commit(40.0);

        assert_eq!(engine.phase(), LifecyclePhase::Ended);
        assert!(!engine.is_polling());
    }

    #[test]
    fn buffering_mid_drag_waits_for_playing_again() {
        let sim = SimulatedRuntime::responsive();
        let (mut engine, _bar) = session(&sim);
        engine.play_pause(track("s1", "yt123"));
        engine.advance(1000);

        engine.scrub_change(20.0);
        sim.fire_state("yt123", NativeState::Buffering);
        engine.pump();
        engine.scrub_commit(40.0);
        assert!(!engine.is_polling());

        sim.fire_state("yt123", NativeState::Playing);
        engine.pump();
        assert!(engine.is_polling());
    }

    #[test]
    fn failed_seek_still_ends_the_drag() {
        let sim = SimulatedRuntime::responsive();
        let (mut engine, _bar) = session(&sim);
        engine.play_pause(track("s1", "yt123"));
        engine.advance(1000);
        sim.fail_method("seekTo");

        engine.scrub_change(20.0);
        engine.scrub_commit(40.0);
        assert!(!engine.scrub_state().is_scrubbing);
        assert!(seeks(&sim.calls()).is_empty());
        assert_eq!(engine.clock_state().current_position, 40.0);
        assert!(engine.is_polling());
    }

    #[test]
    fn failed_destroy_still_closes() {
        let sim = SimulatedRuntime::responsive();
        let (mut engine, bar) = session(&sim);
        engine.play_pause(track("s1", "yt123"));
        engine.advance(1000);
        sim.fail_method("destroy");

        engine.close();
        let intent = engine.intent();
        assert!(intent.track.is_none());
        assert!(!intent.is_playing);
        assert_eq!(engine.phase(), LifecyclePhase::Destroyed);

        engine.close();
        assert_eq!(engine.intent(), intent);
        assert!(!bar.render(&engine).visible);

        sim.clear_failures();
        engine.play_pause(track("s2", "yt456"));
        assert_eq!(engine.phase(), LifecyclePhase::Ready);
    }

    #[test]
    fn failed_volume_call_does_not_block_playback() {
        let sim = SimulatedRuntime::responsive();
        sim.fail_method("setVolume");
        let (mut engine, _bar) = session(&sim);
        engine.play_pause(track("s1", "yt123"));
        assert_eq!(engine.phase(), LifecyclePhase::Ready);

        engine.advance(1000);
        engine.set_volume(50);
        let calls = sim.calls();
        assert!(!calls.iter().any(|c| matches!(c, RuntimeCall::SetVolume { .. })));
        assert!(calls.contains(&RuntimeCall::UnMute { media_id: "yt123".into() }));
        assert_eq!(engine.phase(), LifecyclePhase::Playing);
        assert!(engine.intent().is_playing);
    }

    #[test]
    fn out_of_range_config_falls_back_to_defaults() {
        let config = PlayerConfig {
            poll_interval_ms: 0,
            ..PlayerConfig::default()
        };
        let sim = SimulatedRuntime::responsive();
        let mut engine = Engine::with_config(Box::new(sim.clone()), config);
        assert_eq!(engine.config(), &PlayerConfig::default());

        let _bar = PlayerSurface::mount(&mut engine, SurfaceKind::BottomBar);
        engine.play_pause(track("s1", "yt123"));
        engine.advance(250);
        engine.advance(499);
        assert_eq!(engine.clock_state().current_position, 0.0);
        engine.advance(1);
        assert!(engine.clock_state().current_position > 0.0);
    }
}
