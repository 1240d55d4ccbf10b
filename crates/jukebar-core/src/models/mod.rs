//! Jukebar data models.
//!
//! Plain value types. The stores and controllers own the mutable copies;
//! everything handed to surfaces is a snapshot.

pub mod playback;
pub mod track;

pub use playback::{ClockState, LifecyclePhase, NativeState, ScrubState};
pub use track::{PlaybackIntent, Track, VolumeState};
