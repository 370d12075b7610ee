use crate::model::ChartError;
use crate::notes::NoteSet;
use crate::tempo::{TempoContext, TempoMap};
use beatforge_ports::types::{Beat, Lane, Millis};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LANE_COUNT: Lane = 4;

fn default_lane_count() -> Lane {
    DEFAULT_LANE_COUNT
}

/// Read-only view of one difficulty, as handed over by the editor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChartSnapshot {
    pub tempo: TempoContext,
    #[serde(default)]
    pub notes: NoteSet,
    pub song_duration_ms: Millis,
    #[serde(default = "default_lane_count")]
    pub lane_count: Lane,
}

impl ChartSnapshot {
    pub fn validate(&self) -> Result<(), ChartError> {
        if !self.song_duration_ms.is_finite() || self.song_duration_ms < 0.0 {
            return Err(ChartError::InvalidDuration(self.song_duration_ms));
        }
        if self.lane_count < 1 {
            return Err(ChartError::InvalidLaneCount(self.lane_count));
        }
        Ok(())
    }

    pub fn tempo_map(&self) -> TempoMap {
        TempoMap::new(self.tempo.clone())
    }

    pub fn total_beats(&self) -> Beat {
        self.tempo_map().total_beats(self.song_duration_ms)
    }
}
