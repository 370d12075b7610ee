use crate::metronome::MetronomeTick;
use crate::note_scanner::StruckNote;
use beatforge_domain_chart::ChartSnapshot;
use beatforge_ports::playback::PlaybackState;
use beatforge_ports::types::{Beat, Millis};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Command {
    LoadChart { chart: ChartSnapshot },
    StartPlayback { offset_ms: Millis },
    StopPlayback,
    SetTempoScale { factor: f64 },
    SetNoteVolume { level: f32 },
    SetMetronomeVolume { level: f32 },
    SetMetronomeEnabled { enabled: bool },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    PlaybackStateChanged {
        state: PlaybackState,
        offset_ms: Option<Millis>,
    },
    NotesStruck {
        notes: Vec<StruckNote>,
        any_late: bool,
    },
    MetronomeTicked {
        beat: Beat,
        late: bool,
        played: bool,
    },
}

impl From<MetronomeTick> for Event {
    fn from(tick: MetronomeTick) -> Self {
        Event::MetronomeTicked {
            beat: tick.beat,
            late: tick.late,
            played: tick.played,
        }
    }
}
