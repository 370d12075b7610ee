use beatforge_core::{Command, EngineConfig, Event, PlaybackEngine, SystemClock};
use beatforge_domain_chart::ChartSnapshot;
use beatforge_infra_audio_cpal::CpalAudioOutputPort;
use beatforge_ports::playback::{PlaybackPort, PlaybackState};
use beatforge_ports::types::Millis;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const EVENT_POLL: Duration = Duration::from_millis(20);

#[derive(Clone, Debug)]
pub struct PlayOptions {
    pub samples: PathBuf,
    pub device: Option<String>,
    pub from_ms: Millis,
    pub tempo_scale: f64,
    pub metronome: bool,
    pub json: bool,
}

/// Plays `chart` in real time until the last note has been struck.
pub fn play(chart: ChartSnapshot, mut config: EngineConfig, options: &PlayOptions) -> anyhow::Result<()> {
    // no metronome samples are needed when it stays off
    config.metronome.enabled &= options.metronome;

    let mut port = CpalAudioOutputPort::new(&options.samples);
    if let Some(device) = &options.device {
        port = port.with_device(device.clone());
    }
    let engine = PlaybackEngine::new(&port, Arc::new(SystemClock::new()), &config)?;

    engine.handle_command(Command::LoadChart { chart })?;
    engine.handle_command(Command::SetTempoScale {
        factor: options.tempo_scale,
    })?;
    engine.handle_command(Command::StartPlayback {
        offset_ms: options.from_ms,
    })?;
    tracing::info!(from_ms = options.from_ms, scale = options.tempo_scale, "playback started");

    loop {
        thread::sleep(EVENT_POLL);
        let finished = engine.state() != PlaybackState::Scanning;
        for event in engine.drain_events() {
            print_event(&event, options.json)?;
        }
        if finished {
            break;
        }
    }

    engine.handle_command(Command::StopPlayback)?;
    for event in engine.drain_events() {
        print_event(&event, options.json)?;
    }
    Ok(())
}

fn print_event(event: &Event, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }
    match event {
        Event::PlaybackStateChanged { state, offset_ms } => match offset_ms {
            Some(offset) => println!("{state:?} at {offset:.0} ms"),
            None => println!("{state:?}"),
        },
        Event::NotesStruck { notes, .. } => {
            for struck in notes {
                let mut flags = String::new();
                if struck.late {
                    flags.push_str(" late");
                }
                if !struck.played {
                    flags.push_str(" dropped");
                }
                println!(
                    "note beat {:>8.3} lane {}{flags}",
                    struck.note.beat, struck.note.lane
                );
            }
        }
        Event::MetronomeTicked { beat, late, .. } => {
            println!("tick beat {beat:>8.3}{}", if *late { " late" } else { "" });
        }
    }
    Ok(())
}
