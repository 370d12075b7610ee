use beatforge_domain_chart::{ChartSnapshot, Note, NoteSet};
use pretty_assertions::assert_eq;

#[test]
fn insert_keeps_order_and_rejects_duplicates() {
    let mut set = NoteSet::new();
    assert!(set.insert(Note::new(2.0, 1)));
    assert!(set.insert(Note::new(1.0, 3)));
    assert!(set.insert(Note::new(1.0, 0)));
    assert!(!set.insert(Note::new(1.00001, 0)));

    assert_eq!(
        set.snapshot(),
        vec![Note::new(1.0, 0), Note::new(1.0, 3), Note::new(2.0, 1)]
    );
}

#[test]
fn remove_and_contains_are_epsilon_tolerant() {
    let mut set: NoteSet = vec![Note::new(0.5, 2), Note::new(1.5, 2)].into();

    assert!(set.contains(&Note::new(0.50002, 2)));
    assert!(!set.contains(&Note::new(0.5, 1)));
    assert!(set.remove(&Note::new(1.49999, 2)));
    assert!(!set.remove(&Note::new(1.5, 2)));
    assert_eq!(set.len(), 1);
}

#[test]
fn range_is_half_open() {
    let set: NoteSet = (0..8).map(|i| Note::new(i as f64 * 0.5, i % 4)).collect();

    let beats: Vec<f64> = set.range(1.0, 2.5).iter().map(|n| n.beat).collect();
    assert_eq!(beats, vec![1.0, 1.5, 2.0]);
    assert!(set.range(10.0, 12.0).is_empty());
}

#[test]
fn snapshot_deserializes_and_dedupes_notes() {
    let chart: ChartSnapshot = serde_json::from_str(
        r#"{
            "tempo": {"global_bpm": 120.0},
            "notes": [{"beat": 1.0, "lane": 0}, {"beat": 0.0, "lane": 1}, {"beat": 1.0, "lane": 0}],
            "song_duration_ms": 60000.0
        }"#,
    )
    .expect("valid chart");

    chart.validate().expect("chart is valid");
    assert_eq!(chart.lane_count, 4);
    assert_eq!(
        chart.notes.snapshot(),
        vec![Note::new(0.0, 1), Note::new(1.0, 0)]
    );
    assert!((chart.total_beats() - 120.0).abs() < 1e-9);
}
