mod support;

use beatforge_core::{Command, EngineConfig, EngineError, Event, ManualClock, PlaybackEngine};
use beatforge_domain_chart::{ChartSnapshot, Note};
use beatforge_ports::playback::{PlaybackError, PlaybackPort, PlaybackState};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use support::{wait_until, FakeAudioPort};

fn port() -> FakeAudioPort {
    FakeAudioPort::new(Duration::from_millis(50))
        .with_variants("drum", 2)
        .with_variants("metronome", 1)
}

fn chart() -> ChartSnapshot {
    serde_json::from_str(
        r#"{
            "tempo": { "global_bpm": 120.0 },
            "notes": [ { "beat": 0.0, "lane": 0 }, { "beat": 0.0, "lane": 1 }, { "beat": 16.0, "lane": 2 } ],
            "song_duration_ms": 10000.0
        }"#,
    )
    .unwrap()
}

fn engine(config: &EngineConfig) -> PlaybackEngine {
    PlaybackEngine::new(&port(), Arc::new(ManualClock::new()), config).unwrap()
}

/// Drains events until `done` sees what it needs.
fn collect_until(engine: &PlaybackEngine, done: impl Fn(&[Event]) -> bool) -> Vec<Event> {
    let mut events = Vec::new();
    wait_until(|| {
        events.extend(engine.drain_events());
        done(&events)
    });
    events
}

fn has_notes(events: &[Event]) -> bool {
    events
        .iter()
        .any(|event| matches!(event, Event::NotesStruck { .. }))
}

fn has_tick(events: &[Event]) -> bool {
    events
        .iter()
        .any(|event| matches!(event, Event::MetronomeTicked { .. }))
}

#[test]
fn start_without_chart_fails() {
    let engine = engine(&EngineConfig::default());

    let err = engine
        .handle_command(Command::StartPlayback { offset_ms: 0.0 })
        .unwrap_err();

    assert!(matches!(err, EngineError::Playback(PlaybackError::NoChart)));
    assert_eq!(engine.state(), PlaybackState::Idle);
}

#[test]
fn playback_reports_notes_and_clicks_then_stops() {
    let engine = engine(&EngineConfig::default());
    engine.handle_command(Command::LoadChart { chart: chart() }).unwrap();
    engine.handle_command(Command::StartPlayback { offset_ms: 0.0 }).unwrap();

    let events = collect_until(&engine, |events| has_notes(events) && has_tick(events));

    assert_eq!(
        events[0],
        Event::PlaybackStateChanged {
            state: PlaybackState::Scanning,
            offset_ms: Some(0.0),
        }
    );
    let struck: Vec<Note> = events
        .iter()
        .filter_map(|event| match event {
            Event::NotesStruck { notes, any_late } => {
                assert!(!any_late);
                Some(notes.iter().map(|struck| struck.note).collect::<Vec<_>>())
            }
            _ => None,
        })
        .flatten()
        .collect();
    assert_eq!(struck, vec![Note::new(0.0, 0), Note::new(0.0, 1)]);
    assert!(events.contains(&Event::MetronomeTicked {
        beat: 0.0,
        late: false,
        played: true,
    }));
    assert_eq!(engine.state(), PlaybackState::Scanning);

    engine.handle_command(Command::StopPlayback).unwrap();
    assert_eq!(engine.state(), PlaybackState::Stopped);
    assert_eq!(
        engine.drain_events(),
        vec![Event::PlaybackStateChanged {
            state: PlaybackState::Stopped,
            offset_ms: None,
        }]
    );
}

#[test]
fn disabled_metronome_stays_quiet() {
    let engine = engine(&EngineConfig::default());
    engine.load_chart(chart()).unwrap();
    engine
        .handle_command(Command::SetMetronomeEnabled { enabled: false })
        .unwrap();
    engine.start(0.0).unwrap();

    let events = collect_until(&engine, has_notes);

    assert!(has_notes(&events));
    assert!(!has_tick(&events));
    engine.stop().unwrap();
}

#[test]
fn loading_a_chart_stops_the_running_scan() {
    let engine = engine(&EngineConfig::default());
    engine.load_chart(chart()).unwrap();
    engine.start(0.0).unwrap();

    engine.load_chart(chart()).unwrap();

    assert_eq!(engine.state(), PlaybackState::Stopped);
}

#[test]
fn invalid_chart_is_rejected() {
    let engine = engine(&EngineConfig::default());
    let mut bad = chart();
    bad.song_duration_ms = -5.0;

    let err = engine.load_chart(bad).unwrap_err();

    assert!(matches!(err, EngineError::Chart(_)));
}

#[test]
fn tempo_scale_must_be_positive() {
    let engine = engine(&EngineConfig::default());

    assert!(engine.set_tempo_scale(1.5).is_ok());
    let err = engine
        .handle_command(Command::SetTempoScale { factor: 0.0 })
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Playback(PlaybackError::InvalidTempoScale(_))
    ));
}

#[test]
fn volume_commands_reach_the_pools() {
    let engine = engine(&EngineConfig::default());

    engine.handle_command(Command::SetNoteVolume { level: -0.25 }).unwrap();
    engine
        .handle_command(Command::SetMetronomeVolume { level: 4.0 })
        .unwrap();

    assert_eq!(engine.note_pool().volume().get(), 0.25);
    assert_eq!(engine.metronome().volume().get(), 1.0);
}

#[test]
fn missing_note_samples_fail_construction() {
    let port = FakeAudioPort::new(Duration::from_millis(50)).with_variants("metronome", 1);

    let result = PlaybackEngine::new(&port, Arc::new(ManualClock::new()), &EngineConfig::default());

    assert!(matches!(result, Err(EngineError::Pool(_))));
}

#[test]
fn commands_use_tagged_json() {
    let cmd: Command =
        serde_json::from_str(r#"{ "type": "SetTempoScale", "payload": { "factor": 0.5 } }"#)
            .unwrap();
    assert!(matches!(cmd, Command::SetTempoScale { factor } if factor == 0.5));

    let cmd: Command = serde_json::from_str(r#"{ "type": "StopPlayback" }"#).unwrap();
    assert!(matches!(cmd, Command::StopPlayback));

    let json = serde_json::to_value(Event::MetronomeTicked {
        beat: 2.0,
        late: true,
        played: false,
    })
    .unwrap();
    assert_eq!(json["type"], "MetronomeTicked");
    assert_eq!(json["payload"]["beat"], 2.0);
}

fn chart_with_notes(notes: &str) -> ChartSnapshot {
    serde_json::from_str(&format!(
        r#"{{ "tempo": {{ "global_bpm": 120.0 }}, "notes": [{notes}], "song_duration_ms": 2000.0 }}"#
    ))
    .unwrap()
}

#[test]
fn metronome_keeps_playback_running_after_the_last_note() {
    let clock = Arc::new(ManualClock::new());
    let engine = PlaybackEngine::new(&port(), clock.clone(), &EngineConfig::default()).unwrap();
    engine
        .load_chart(chart_with_notes(r#"{ "beat": 0.0, "lane": 0 }"#))
        .unwrap();
    engine.start(0.0).unwrap();

    collect_until(&engine, |events| has_notes(events) && has_tick(events));
    // the note scanner exits right after its only note
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(engine.state(), PlaybackState::Scanning);

    clock.set_ms(500);
    let events = collect_until(&engine, has_tick);
    assert!(events.contains(&Event::MetronomeTicked {
        beat: 1.0,
        late: false,
        played: true,
    }));
    assert_eq!(engine.state(), PlaybackState::Scanning);

    engine.stop().unwrap();
    assert_eq!(engine.state(), PlaybackState::Stopped);
}

#[test]
fn chart_without_notes_still_scans_the_metronome() {
    let engine = engine(&EngineConfig::default());
    engine.load_chart(chart_with_notes("")).unwrap();
    engine.start(0.0).unwrap();

    collect_until(&engine, has_tick);
    std::thread::sleep(Duration::from_millis(50));

    assert_eq!(engine.state(), PlaybackState::Scanning);
    engine.stop().unwrap();
}

#[test]
fn playback_goes_idle_once_everything_has_played() {
    let engine = engine(&EngineConfig::default());
    engine.set_metronome_enabled(false);
    engine
        .load_chart(chart_with_notes(r#"{ "beat": 0.0, "lane": 0 }"#))
        .unwrap();
    engine.start(0.0).unwrap();

    assert!(wait_until(|| engine.state() == PlaybackState::Idle));
}
