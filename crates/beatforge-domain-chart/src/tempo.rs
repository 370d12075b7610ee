use crate::model::{validate_bpm, BeatTempoChange, ChartError};
use beatforge_ports::types::{Beat, Millis};
use serde::{Deserialize, Serialize};

/// Base tempo plus the ordered tempo changes of one chart (or one clipboard).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTempoContext")]
pub struct TempoContext {
    global_bpm: f64,
    changes: Vec<BeatTempoChange>,
}

#[derive(Deserialize)]
struct RawTempoContext {
    global_bpm: f64,
    #[serde(default)]
    changes: Vec<BeatTempoChange>,
}

impl TryFrom<RawTempoContext> for TempoContext {
    type Error = ChartError;

    fn try_from(raw: RawTempoContext) -> Result<Self, Self::Error> {
        Self::new(raw.global_bpm, raw.changes)
    }
}

impl TempoContext {
    /// Changes are ordered by beat; changes sharing a beat keep insertion order.
    pub fn new(global_bpm: f64, mut changes: Vec<BeatTempoChange>) -> Result<Self, ChartError> {
        validate_bpm(global_bpm)?;
        changes.sort_by(|a, b| a.beat().total_cmp(&b.beat()));
        Ok(Self {
            global_bpm,
            changes,
        })
    }

    pub fn constant(bpm: f64) -> Result<Self, ChartError> {
        Self::new(bpm, Vec::new())
    }

    pub fn global_bpm(&self) -> f64 {
        self.global_bpm
    }

    pub fn changes(&self) -> &[BeatTempoChange] {
        &self.changes
    }

    pub fn bpm_at(&self, beat: Beat) -> f64 {
        last_change_at_or_before(beat, &self.changes)
            .map(|change| change.bpm())
            .unwrap_or(self.global_bpm)
    }

    /// Changes strictly after `beat`, in order.
    pub fn changes_after(&self, beat: Beat) -> &[BeatTempoChange] {
        let idx = self.changes.partition_point(|change| change.beat() <= beat);
        &self.changes[idx..]
    }
}

/// Last change whose beat is at or before `position`. `list` must be sorted by beat;
/// among equal positions the later entry wins.
pub fn last_change_at_or_before(position: Beat, list: &[BeatTempoChange]) -> Option<&BeatTempoChange> {
    let idx = list.partition_point(|change| change.beat() <= position);
    idx.checked_sub(1).map(|i| &list[i])
}

pub fn beats_to_ms(beats: Beat, bpm: f64) -> Millis {
    60_000.0 * beats / bpm
}

pub fn ms_to_beats(ms: Millis, bpm: f64) -> Beat {
    ms * bpm / 60_000.0
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TempoSegment {
    pub start_beat: Beat,
    pub start_ms: Millis,
    pub bpm: f64,
}

/// Song time <-> beat conversion with the segment start times precomputed.
#[derive(Clone, Debug)]
pub struct TempoMap {
    context: TempoContext,
    segments: Vec<TempoSegment>,
}

impl TempoMap {
    pub fn new(context: TempoContext) -> Self {
        let mut segments: Vec<TempoSegment> = Vec::with_capacity(context.changes.len() + 1);
        segments.push(TempoSegment {
            start_beat: 0.0,
            start_ms: 0.0,
            bpm: context.global_bpm,
        });

        for change in &context.changes {
            let Some(last) = segments.last_mut() else {
                break;
            };
            if change.beat() <= last.start_beat {
                last.bpm = change.bpm();
                continue;
            }
            let start_ms = last.start_ms + beats_to_ms(change.beat() - last.start_beat, last.bpm);
            segments.push(TempoSegment {
                start_beat: change.beat(),
                start_ms,
                bpm: change.bpm(),
            });
        }

        Self { context, segments }
    }

    pub fn context(&self) -> &TempoContext {
        &self.context
    }

    pub fn segments(&self) -> &[TempoSegment] {
        &self.segments
    }

    pub fn beat_to_time(&self, beat: Beat) -> Millis {
        let seg = self.segment_for_beat(beat);
        seg.start_ms + beats_to_ms(beat - seg.start_beat, seg.bpm)
    }

    pub fn time_to_beat(&self, ms: Millis) -> Beat {
        let seg = self.segment_for_ms(ms);
        seg.start_beat + ms_to_beats(ms - seg.start_ms, seg.bpm)
    }

    pub fn bpm_at(&self, beat: Beat) -> f64 {
        self.segment_for_beat(beat).bpm
    }

    /// Beat length of a song lasting `song_duration_ms`.
    pub fn total_beats(&self, song_duration_ms: Millis) -> Beat {
        self.time_to_beat(song_duration_ms.max(0.0))
    }

    fn segment_for_beat(&self, beat: Beat) -> TempoSegment {
        let idx = self.segments.partition_point(|seg| seg.start_beat <= beat);
        self.segments[idx.saturating_sub(1)]
    }

    fn segment_for_ms(&self, ms: Millis) -> TempoSegment {
        let idx = self.segments.partition_point(|seg| seg.start_ms <= ms);
        self.segments[idx.saturating_sub(1)]
    }
}

impl From<TempoContext> for TempoMap {
    fn from(context: TempoContext) -> Self {
        Self::new(context)
    }
}
