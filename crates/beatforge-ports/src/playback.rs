use crate::types::Millis;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    Idle,
    Scanning,
    Stopped,
}

#[derive(thiserror::Error, Debug)]
pub enum PlaybackError {
    #[error("no chart loaded")]
    NoChart,
    #[error("invalid tempo scale: {0}")]
    InvalidTempoScale(f64),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Editor-facing transport control. Implementations synchronize internally.
pub trait PlaybackPort: Send + Sync {
    fn start(&self, offset_ms: Millis) -> Result<(), PlaybackError>;
    fn stop(&self) -> Result<(), PlaybackError>;
    fn set_tempo_scale(&self, factor: f64) -> Result<(), PlaybackError>;
    fn state(&self) -> PlaybackState;
}
