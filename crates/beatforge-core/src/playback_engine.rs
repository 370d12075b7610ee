use crate::config::{ConfigError, EngineConfig};
use crate::dispatch::{owner_channel, OwnerInbox};
use crate::ipc::{Command, Event};
use crate::metronome::{metronome_beats, Metronome, MetronomeTick, TickForwarder};
use crate::note_scanner::{NoteScanner, StrikeBatch};
use crate::params::PlaybackParams;
use crate::scanner::{BeatScanner, ScanError};
use crate::voice_pool::{PoolError, VoicePool};
use beatforge_domain_chart::{ChartError, ChartSnapshot, Note, TempoMap};
use beatforge_ports::audio::AudioOutputPort;
use beatforge_ports::clock::Clock;
use beatforge_ports::playback::{PlaybackError, PlaybackPort, PlaybackState};
use beatforge_ports::types::{Beat, Millis};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

const INBOX_CAPACITY: usize = 1024;

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("voice pool error: {0}")]
    Pool(#[from] PoolError),
    #[error("chart error: {0}")]
    Chart(#[from] ChartError),
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("playback error: {0}")]
    Playback(#[from] PlaybackError),
}

struct LoadedChart {
    tempo: Arc<TempoMap>,
    notes: Vec<Note>,
    beats: Vec<Beat>,
}

struct EngineState {
    chart: Option<LoadedChart>,
    note_scanner: NoteScanner,
    metronome_scanner: BeatScanner<Beat>,
    note_inbox: OwnerInbox<StrikeBatch>,
    metronome_inbox: OwnerInbox<MetronomeTick>,
    events: VecDeque<Event>,
}

/// Editor-facing playback: owns the voice pools and both scanners, and turns scan
/// results into [`Event`]s on the owner's side.
pub struct PlaybackEngine {
    notes: Arc<VoicePool>,
    metronome: Arc<Metronome>,
    params: Arc<PlaybackParams>,
    state: Mutex<EngineState>,
}

impl PlaybackEngine {
    pub fn new(
        port: &dyn AudioOutputPort,
        clock: Arc<dyn Clock>,
        config: &EngineConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let notes = Arc::new(VoicePool::new(port, clock.clone(), &config.notes)?);
        let metronome = Arc::new(Metronome::new(port, clock.clone(), &config.metronome)?);
        let params = Arc::new(PlaybackParams::new(config.metronome.enabled));

        let (note_tx, note_inbox) = owner_channel(INBOX_CAPACITY);
        let note_scanner = NoteScanner::new(config.scanner, clock.clone(), notes.clone(), note_tx)?
            .with_params(params.clone());

        let (tick_tx, metronome_inbox) = owner_channel(INBOX_CAPACITY);
        let metronome_scanner = BeatScanner::new(
            config.scanner,
            clock,
            metronome.clone(),
            Box::new(TickForwarder::new(tick_tx)),
        )?
        .with_params(params.clone());

        Ok(Self {
            notes,
            metronome,
            params,
            state: Mutex::new(EngineState {
                chart: None,
                note_scanner,
                metronome_scanner,
                note_inbox,
                metronome_inbox,
                events: VecDeque::new(),
            }),
        })
    }

    pub fn handle_command(&self, cmd: Command) -> Result<(), EngineError> {
        match cmd {
            Command::LoadChart { chart } => self.load_chart(chart)?,
            Command::StartPlayback { offset_ms } => self.start(offset_ms)?,
            Command::StopPlayback => self.stop()?,
            Command::SetTempoScale { factor } => self.set_tempo_scale(factor)?,
            Command::SetNoteVolume { level } => self.notes.change_volume(level),
            Command::SetMetronomeVolume { level } => self.metronome.change_volume(level),
            Command::SetMetronomeEnabled { enabled } => self.set_metronome_enabled(enabled),
        }
        Ok(())
    }

    /// Replaces the chart snapshot. A running scan is stopped first.
    pub fn load_chart(&self, chart: ChartSnapshot) -> Result<(), EngineError> {
        chart.validate()?;
        let tempo = Arc::new(chart.tempo_map());
        let beats = metronome_beats(tempo.total_beats(chart.song_duration_ms));

        let mut state = self.state.lock();
        Self::stop_scanners(&mut state);
        state.chart = Some(LoadedChart {
            tempo,
            notes: chart.notes.snapshot(),
            beats,
        });
        Ok(())
    }

    /// Takes effect immediately when disabling; enabling applies from the next start.
    pub fn set_metronome_enabled(&self, enabled: bool) {
        self.params.set_metronome_enabled(enabled);
        if !enabled {
            self.state.lock().metronome_scanner.stop();
        }
    }

    /// Moves scan results posted since the last call into the event queue.
    pub fn pump(&self) {
        let mut state = self.state.lock();
        let EngineState {
            note_inbox,
            metronome_inbox,
            events,
            ..
        } = &mut *state;
        note_inbox.drain_into(|batch| {
            let any_late = batch.any_late();
            events.push_back(Event::NotesStruck {
                notes: batch.notes,
                any_late,
            });
        });
        metronome_inbox.drain_into(|tick| events.push_back(tick.into()));
    }

    pub fn drain_events(&self) -> Vec<Event> {
        self.pump();
        self.state.lock().events.drain(..).collect()
    }

    pub fn note_pool(&self) -> &VoicePool {
        &self.notes
    }

    pub fn metronome(&self) -> &Metronome {
        &self.metronome
    }

    fn stop_scanners(state: &mut EngineState) {
        state.note_scanner.stop();
        state.metronome_scanner.stop();
    }
}

impl PlaybackPort for PlaybackEngine {
    fn start(&self, offset_ms: Millis) -> Result<(), PlaybackError> {
        let mut state = self.state.lock();
        let EngineState {
            chart,
            note_scanner,
            metronome_scanner,
            events,
            ..
        } = &mut *state;
        let chart = chart.as_ref().ok_or(PlaybackError::NoChart)?;

        note_scanner
            .start(offset_ms, &chart.notes, chart.tempo.clone())
            .map_err(|e| PlaybackError::Backend(e.to_string()))?;
        if self.params.metronome_enabled() && self.metronome.is_enabled() {
            metronome_scanner
                .start(offset_ms, &chart.beats, chart.tempo.clone())
                .map_err(|e| PlaybackError::Backend(e.to_string()))?;
        } else {
            metronome_scanner.stop();
        }

        events.push_back(Event::PlaybackStateChanged {
            state: PlaybackState::Scanning,
            offset_ms: Some(offset_ms),
        });
        Ok(())
    }

    fn stop(&self) -> Result<(), PlaybackError> {
        let mut state = self.state.lock();
        Self::stop_scanners(&mut state);
        state.events.push_back(Event::PlaybackStateChanged {
            state: PlaybackState::Stopped,
            offset_ms: None,
        });
        Ok(())
    }

    fn set_tempo_scale(&self, factor: f64) -> Result<(), PlaybackError> {
        if self.params.set_tempo_scale(factor) {
            Ok(())
        } else {
            Err(PlaybackError::InvalidTempoScale(factor))
        }
    }

    /// Scanning while either the notes or the metronome still have events left.
    fn state(&self) -> PlaybackState {
        let state = self.state.lock();
        match state.metronome_scanner.state() {
            PlaybackState::Scanning => PlaybackState::Scanning,
            _ => state.note_scanner.state(),
        }
    }
}
