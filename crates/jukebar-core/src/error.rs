//! Error taxonomy for the playback controller.
//!
//! Only configuration loading surfaces these to callers. Runtime call
//! failures are caught at the call site, logged, and turned into no-ops.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlayerError {
    /// The runtime could not construct a player for this media id.
    #[error("player construction failed for {media_id}: {reason}")]
    Construction { media_id: String, reason: String },

    /// A native player method threw.
    #[error("{method} failed: {reason}")]
    Call { method: &'static str, reason: String },

    /// A control was invoked before the instance reached ready.
    #[error("player not ready")]
    NotReady,

    /// The handle was already disposed by the runtime.
    #[error("player already destroyed")]
    Destroyed,

    /// The runtime loader could not be injected.
    #[error("runtime loader failed: {0}")]
    Loader(String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type PlayerResult<T> = Result<T, PlayerError>;
