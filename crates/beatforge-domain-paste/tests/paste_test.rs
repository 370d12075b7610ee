use beatforge_domain_chart::{BeatTempoChange, Note, TempoContext};
use beatforge_domain_paste::{paste, Clipboard, PasteDestination, PastePolicy};
use pretty_assertions::assert_eq;

fn change(beat: f64, bpm: f64) -> BeatTempoChange {
    BeatTempoChange::new(beat, bpm, 4).expect("valid tempo change")
}

fn notes(list: &[(f64, i32)]) -> Vec<Note> {
    list.iter().map(|&(beat, lane)| Note::new(beat, lane)).collect()
}

fn dest(tempo: &TempoContext, offset: f64) -> PasteDestination<'_> {
    PasteDestination {
        tempo,
        offset,
        lane: None,
        total_beats: 1_000.0,
        lane_count: 4,
    }
}

fn assert_notes(actual: Vec<Note>, expected: &[(f64, i32)]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?}");
    for (note, &(beat, lane)) in actual.iter().zip(expected) {
        assert!((note.beat - beat).abs() < 1e-9, "{actual:?}");
        assert_eq!(note.lane, lane);
    }
}

#[test]
fn note_bpm_follows_source_tempo_change() {
    let source = TempoContext::new(140.0, vec![change(10.0, 70.0)]).expect("valid");
    let clipboard = Clipboard::new(
        notes(&[(10.25, 0), (10.5, 1), (10.75, 2), (11.0, 3)]),
        source,
    );
    let target = TempoContext::constant(120.0).expect("valid");

    let pasted: Vec<Note> = paste(&clipboard, dest(&target, 51.5), PastePolicy::NoteBpm).collect();

    assert_notes(pasted, &[(51.5, 0), (52.0, 1), (52.5, 2), (53.0, 3)]);
}

#[test]
fn note_bpm_splits_gap_at_destination_change() {
    let clipboard = Clipboard::new(
        notes(&[(0.0, 0), (1.0, 1), (2.0, 2), (3.0, 3)]),
        TempoContext::constant(120.0).expect("valid"),
    );
    let target = TempoContext::new(120.0, vec![change(11.0, 60.0)]).expect("valid");

    let pasted: Vec<Note> = paste(&clipboard, dest(&target, 10.0), PastePolicy::NoteBpm).collect();

    assert_notes(pasted, &[(10.0, 0), (11.0, 1), (11.5, 2), (12.0, 3)]);
}

#[test]
fn note_bpm_splits_gap_at_source_change() {
    let source = TempoContext::new(120.0, vec![change(1.5, 60.0)]).expect("valid");
    let clipboard = Clipboard::new(notes(&[(1.0, 0), (2.0, 1), (2.5, 1)]), source);
    let target = TempoContext::constant(120.0).expect("valid");

    let pasted: Vec<Note> = paste(&clipboard, dest(&target, 4.0), PastePolicy::NoteBpm).collect();

    assert_notes(pasted, &[(4.0, 0), (5.5, 1), (6.5, 1)]);
}

#[test]
fn global_beat_translates_and_shifts_lanes() {
    let source = TempoContext::new(140.0, vec![change(10.0, 70.0)]).expect("valid");
    let clipboard = Clipboard::new(notes(&[(10.25, 0), (10.5, 1), (11.0, 2)]), source);
    let target = TempoContext::constant(90.0).expect("valid");
    let mut destination = dest(&target, 20.0);
    destination.lane = Some(1);

    let pasted: Vec<Note> = paste(&clipboard, destination, PastePolicy::GlobalBeat).collect();

    assert_notes(pasted, &[(20.0, 1), (20.25, 2), (20.75, 3)]);
}

#[test]
fn first_note_bpm_uses_one_factor() {
    let source = TempoContext::new(140.0, vec![change(10.0, 70.0), change(10.5, 140.0)])
        .expect("valid");
    let clipboard = Clipboard::new(notes(&[(10.25, 0), (10.5, 1), (11.0, 2)]), source);
    let target = TempoContext::constant(120.0).expect("valid");

    let pasted: Vec<Note> =
        paste(&clipboard, dest(&target, 0.0), PastePolicy::FirstNoteBpm).collect();

    assert_notes(pasted, &[(0.0, 0), (0.5, 1), (1.5, 2)]);
}

#[test]
fn drops_notes_past_song_end_and_outside_lanes() {
    let clipboard = Clipboard::new(
        notes(&[(0.0, 0), (0.0, 3), (1.0, 1), (2.0, 2), (3.0, 0)]),
        TempoContext::constant(120.0).expect("valid"),
    );
    let target = TempoContext::constant(120.0).expect("valid");
    let destination = PasteDestination {
        tempo: &target,
        offset: 8.0,
        lane: Some(1),
        total_beats: 10.0,
        lane_count: 4,
    };

    let pasted: Vec<Note> = paste(&clipboard, destination, PastePolicy::NoteBpm).collect();

    assert_notes(pasted, &[(8.0, 1), (9.0, 2), (10.0, 3)]);
}

#[test]
fn output_is_lazy_and_ordered() {
    let clipboard = Clipboard::new(
        (0..64).map(|i| Note::new(i as f64 * 0.25, i % 4)),
        TempoContext::new(150.0, vec![change(3.0, 75.0), change(9.0, 200.0)]).expect("valid"),
    );
    let target = TempoContext::new(100.0, vec![change(5.0, 50.0), change(6.0, 300.0)])
        .expect("valid");

    let mut iter = paste(&clipboard, dest(&target, 2.0), PastePolicy::NoteBpm);
    let first = iter.next().expect("first note");
    assert!((first.beat - 2.0).abs() < 1e-9);

    let rest: Vec<Note> = iter.collect();
    assert_eq!(rest.len(), 63);
    assert!(rest.windows(2).all(|pair| pair[0].beat <= pair[1].beat));
}

#[test]
fn empty_clipboard_pastes_nothing() {
    let clipboard = Clipboard::new(Vec::new(), TempoContext::constant(120.0).expect("valid"));
    let target = TempoContext::constant(120.0).expect("valid");

    assert_eq!(paste(&clipboard, dest(&target, 4.0), PastePolicy::default()).count(), 0);
}
