mod support;

use beatforge_core::{
    owner_channel, ManualClock, NoteScanner, ScanSession, ScannerConfig, StrikeBatch,
    StrikeCollector, StruckNote,
};
use beatforge_domain_chart::{Note, TempoContext, TempoMap};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use support::{wait_until, RecordingTrigger};

fn tempo_120() -> Arc<TempoMap> {
    Arc::new(TempoMap::new(TempoContext::constant(120.0).unwrap()))
}

#[test]
fn one_batch_per_tick_with_struck_notes() {
    let config = ScannerConfig::default();
    let trigger = RecordingTrigger::new(true);
    let batches = Arc::new(Mutex::new(Vec::<StrikeBatch>::new()));
    let sink = batches.clone();
    let mut collector = StrikeCollector::new(move |batch: StrikeBatch| sink.lock().push(batch));
    let notes = [Note::new(0.0, 0), Note::new(0.0, 1), Note::new(1.0, 2)];
    let mut scan = ScanSession::new(Arc::from(&notes[..]), tempo_120(), 0.0, Duration::ZERO, 1.0);

    scan.poll(0.0, &config, &trigger, &mut collector);
    scan.poll(250.0, &config, &trigger, &mut collector);
    scan.poll(1000.0, &config, &trigger, &mut collector);

    let batches = batches.lock();
    assert_eq!(batches.len(), 2);
    assert_eq!(
        batches[0].notes,
        vec![
            StruckNote { note: Note::new(0.0, 0), late: false, played: true },
            StruckNote { note: Note::new(0.0, 1), late: false, played: true },
        ]
    );
    assert!(!batches[0].any_late());
    assert_eq!(
        batches[1].notes,
        vec![StruckNote { note: Note::new(1.0, 2), late: true, played: true }]
    );
    assert!(batches[1].any_late());
    assert_eq!(*trigger.lanes.lock(), vec![Some(0), Some(1), Some(2)]);
}

#[test]
fn struck_notes_reach_the_owner_inbox() {
    let clock = Arc::new(ManualClock::new());
    let trigger = Arc::new(RecordingTrigger::new(true));
    let (dispatch, mut inbox) = owner_channel::<StrikeBatch>(16);
    let mut scanner =
        NoteScanner::new(ScannerConfig::default(), clock, trigger.clone(), dispatch).unwrap();

    let notes = [Note::new(8.0, 3), Note::new(0.0, 1)];
    scanner.start(0.0, &notes, tempo_120()).unwrap();

    assert!(wait_until(|| !inbox.is_empty()));
    let batches = inbox.drain();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].notes[0].note, Note::new(0.0, 1));
    scanner.stop();
    assert_eq!(trigger.count(), 1);
}
