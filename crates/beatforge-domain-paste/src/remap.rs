use beatforge_domain_chart::{BeatTempoChange, Note, NoteSet, TempoContext};
use beatforge_ports::types::{Beat, Lane};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PastePolicy {
    /// Constant beat offset, tempo ignored.
    GlobalBeat,
    /// One scale factor taken from the tempo at the first note and at the paste point.
    FirstNoteBpm,
    /// Follows every tempo change on both sides.
    #[default]
    NoteBpm,
}

/// Copied notes together with the tempo they were authored under.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Clipboard {
    notes: NoteSet,
    tempo: TempoContext,
}

impl Clipboard {
    pub fn new(notes: impl IntoIterator<Item = Note>, tempo: TempoContext) -> Self {
        Self {
            notes: notes.into_iter().collect(),
            tempo,
        }
    }

    pub fn notes(&self) -> &[Note] {
        self.notes.as_slice()
    }

    pub fn tempo(&self) -> &TempoContext {
        &self.tempo
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct PasteDestination<'a> {
    pub tempo: &'a TempoContext,
    pub offset: Beat,
    /// Lane the first copied note lands in; `None` keeps the copied lanes.
    pub lane: Option<Lane>,
    pub total_beats: Beat,
    pub lane_count: Lane,
}

/// Notes to insert, in nondecreasing beat order. Notes past the end of the song or
/// outside the lane range are dropped.
pub fn paste<'a>(
    clipboard: &'a Clipboard,
    dest: PasteDestination<'a>,
    policy: PastePolicy,
) -> Paste<'a> {
    let notes = clipboard.notes();
    let Some(first) = notes.first().copied() else {
        return Paste {
            notes: notes.iter(),
            lane_delta: 0,
            total_beats: dest.total_beats,
            lane_count: dest.lane_count,
            placement: Placement::Translate { delta: 0.0 },
        };
    };

    let source = clipboard.tempo();
    let placement = match policy {
        PastePolicy::GlobalBeat => Placement::Translate {
            delta: dest.offset - first.beat,
        },
        PastePolicy::FirstNoteBpm => {
            let factor = (source.global_bpm() / source.bpm_at(first.beat))
                * (dest.tempo.bpm_at(dest.offset) / dest.tempo.global_bpm());
            Placement::Scale {
                source_origin: first.beat,
                dest_origin: dest.offset,
                factor,
            }
        }
        PastePolicy::NoteBpm => Placement::March(Marcher::new(
            source,
            first.beat,
            dest.tempo,
            dest.offset,
        )),
    };

    Paste {
        notes: notes.iter(),
        lane_delta: dest.lane.map(|lane| lane - first.lane).unwrap_or(0),
        total_beats: dest.total_beats,
        lane_count: dest.lane_count,
        placement,
    }
}

pub struct Paste<'a> {
    notes: std::slice::Iter<'a, Note>,
    lane_delta: Lane,
    total_beats: Beat,
    lane_count: Lane,
    placement: Placement<'a>,
}

enum Placement<'a> {
    Translate {
        delta: Beat,
    },
    Scale {
        source_origin: Beat,
        dest_origin: Beat,
        factor: f64,
    },
    March(Marcher<'a>),
}

impl Iterator for Paste<'_> {
    type Item = Note;

    fn next(&mut self) -> Option<Note> {
        loop {
            let note = *self.notes.next()?;
            let beat = match &mut self.placement {
                Placement::Translate { delta } => note.beat + *delta,
                Placement::Scale {
                    source_origin,
                    dest_origin,
                    factor,
                } => *dest_origin + (note.beat - *source_origin) * *factor,
                Placement::March(marcher) => marcher.advance_to(note.beat),
            };

            // Output is ordered, so nothing after this point fits either.
            if beat > self.total_beats {
                self.notes = <&[Note]>::default().iter();
                return None;
            }

            let lane = note.lane + self.lane_delta;
            if beat < 0.0 || lane < 0 || lane >= self.lane_count {
                continue;
            }
            return Some(Note::new(beat, lane));
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Boundary {
    Note,
    Source,
    Destination,
}

/// Walks the source and destination timelines together. Distances are measured in
/// global beats of each side (`beats * global_bpm / local_bpm`), so a gap keeps its
/// length relative to the song's base pulse.
struct Marcher<'a> {
    source_changes: &'a [BeatTempoChange],
    dest_changes: &'a [BeatTempoChange],
    source_pos: Beat,
    dest_pos: Beat,
    source_bpm: f64,
    dest_bpm: f64,
    source_global: f64,
    dest_global: f64,
}

impl<'a> Marcher<'a> {
    fn new(source: &'a TempoContext, first: Beat, dest: &'a TempoContext, offset: Beat) -> Self {
        Self {
            source_changes: source.changes_after(first),
            dest_changes: dest.changes_after(offset),
            source_pos: first,
            dest_pos: offset,
            source_bpm: source.bpm_at(first),
            dest_bpm: dest.bpm_at(offset),
            source_global: source.global_bpm(),
            dest_global: dest.global_bpm(),
        }
    }

    fn advance_to(&mut self, target: Beat) -> Beat {
        loop {
            let mut nearest = (Boundary::Note, self.source_span(target - self.source_pos));
            if let Some(change) = self.source_changes.first() {
                let span = self.source_span(change.beat() - self.source_pos);
                if span < nearest.1 {
                    nearest = (Boundary::Source, span);
                }
            }
            if let Some(change) = self.dest_changes.first() {
                let span = self.dest_span(change.beat() - self.dest_pos);
                if span < nearest.1 {
                    nearest = (Boundary::Destination, span);
                }
            }

            let (boundary, span) = nearest;
            match boundary {
                Boundary::Note => {
                    self.dest_pos += self.dest_beats(span);
                    self.source_pos = target;
                    return self.dest_pos;
                }
                Boundary::Source => {
                    let change = self.source_changes[0];
                    self.dest_pos += self.dest_beats(span);
                    self.source_pos = change.beat();
                    self.source_bpm = change.bpm();
                    self.source_changes = &self.source_changes[1..];
                }
                Boundary::Destination => {
                    let change = self.dest_changes[0];
                    self.source_pos += self.source_beats(span);
                    self.dest_pos = change.beat();
                    self.dest_bpm = change.bpm();
                    self.dest_changes = &self.dest_changes[1..];
                }
            }
        }
    }

    fn source_span(&self, beats: Beat) -> f64 {
        beats * self.source_global / self.source_bpm
    }

    fn dest_span(&self, beats: Beat) -> f64 {
        beats * self.dest_global / self.dest_bpm
    }

    fn source_beats(&self, span: f64) -> Beat {
        span * self.source_bpm / self.source_global
    }

    fn dest_beats(&self, span: f64) -> Beat {
        span * self.dest_bpm / self.dest_global
    }
}
