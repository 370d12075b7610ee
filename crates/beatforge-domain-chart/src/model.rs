use beatforge_ports::types::{Beat, Lane};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Two beat positions closer than this are the same position.
pub const BEAT_EPSILON: f64 = 1e-4;
pub const DEFAULT_GRID_DIVISION: i32 = 4;

pub fn beats_approx_eq(a: Beat, b: Beat) -> bool {
    (a - b).abs() < BEAT_EPSILON
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ChartError {
    #[error("bpm must be finite and positive, got {0}")]
    InvalidBpm(f64),
    #[error("beat position must be finite and non-negative, got {0}")]
    InvalidBeat(f64),
    #[error("grid division must be at least 1, got {0}")]
    InvalidGridDivision(i32),
    #[error("song duration must be finite and non-negative, got {0}")]
    InvalidDuration(f64),
    #[error("lane count must be at least 1, got {0}")]
    InvalidLaneCount(i32),
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub beat: Beat,
    pub lane: Lane,
}

impl Note {
    pub fn new(beat: Beat, lane: Lane) -> Self {
        Self { beat, lane }
    }

    /// Beat first (epsilon-tolerant), then lane.
    pub fn cmp_approx(&self, other: &Note) -> Ordering {
        if beats_approx_eq(self.beat, other.beat) {
            self.lane.cmp(&other.lane)
        } else {
            self.beat.total_cmp(&other.beat)
        }
    }

    pub fn is_duplicate_of(&self, other: &Note) -> bool {
        self.cmp_approx(other) == Ordering::Equal
    }
}

/// Tempo in effect from `beat` onward. Only constructible with a positive bpm.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTempoChange")]
pub struct BeatTempoChange {
    beat: Beat,
    bpm: f64,
    grid_division: i32,
}

#[derive(Deserialize)]
struct RawTempoChange {
    beat: Beat,
    bpm: f64,
    #[serde(default = "default_grid_division")]
    grid_division: i32,
}

fn default_grid_division() -> i32 {
    DEFAULT_GRID_DIVISION
}

impl BeatTempoChange {
    pub fn new(beat: Beat, bpm: f64, grid_division: i32) -> Result<Self, ChartError> {
        if !beat.is_finite() || beat < 0.0 {
            return Err(ChartError::InvalidBeat(beat));
        }
        validate_bpm(bpm)?;
        if grid_division < 1 {
            return Err(ChartError::InvalidGridDivision(grid_division));
        }
        Ok(Self {
            beat,
            bpm,
            grid_division,
        })
    }

    pub fn beat(&self) -> Beat {
        self.beat
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn grid_division(&self) -> i32 {
        self.grid_division
    }
}

impl TryFrom<RawTempoChange> for BeatTempoChange {
    type Error = ChartError;

    fn try_from(raw: RawTempoChange) -> Result<Self, Self::Error> {
        Self::new(raw.beat, raw.bpm, raw.grid_division)
    }
}

pub(crate) fn validate_bpm(bpm: f64) -> Result<f64, ChartError> {
    if bpm.is_finite() && bpm > 0.0 {
        Ok(bpm)
    } else {
        Err(ChartError::InvalidBpm(bpm))
    }
}
