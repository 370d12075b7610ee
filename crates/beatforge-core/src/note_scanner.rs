use crate::config::{ConfigError, ScannerConfig};
use crate::dispatch::OwnerDispatch;
use crate::params::PlaybackParams;
use crate::scanner::{BeatScanner, ScanError, ScanHooks, Trigger};
use beatforge_domain_chart::{Note, TempoMap};
use beatforge_ports::clock::Clock;
use beatforge_ports::playback::PlaybackState;
use beatforge_ports::types::Millis;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StruckNote {
    pub note: Note,
    pub late: bool,
    /// False when the voice pool had no free voice.
    pub played: bool,
}

/// Notes struck during one poll tick, in beat order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StrikeBatch {
    pub notes: Vec<StruckNote>,
}

impl StrikeBatch {
    pub fn any_late(&self) -> bool {
        self.notes.iter().any(|struck| struck.late)
    }
}

/// Collects struck notes per tick and posts them to the owner once the tick ends.
pub struct StrikeCollector<D> {
    buffer: Vec<StruckNote>,
    dispatch: D,
}

impl<D> StrikeCollector<D> {
    pub fn new(dispatch: D) -> Self {
        Self {
            buffer: Vec::new(),
            dispatch,
        }
    }
}

impl<D: OwnerDispatch<StrikeBatch>> ScanHooks<Note> for StrikeCollector<D> {
    fn scan_begin(&mut self) {
        self.buffer.clear();
    }

    fn on_late_hit(&mut self, note: &Note, played: bool) {
        self.buffer.push(StruckNote {
            note: *note,
            late: true,
            played,
        });
    }

    fn on_hit(&mut self, note: &Note, played: bool) {
        self.buffer.push(StruckNote {
            note: *note,
            late: false,
            played,
        });
    }

    fn scan_finish(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let notes = std::mem::take(&mut self.buffer);
        self.dispatch.post(StrikeBatch { notes });
    }
}

/// Beat scanner over chart notes that reports struck notes to the owner.
pub struct NoteScanner {
    inner: BeatScanner<Note>,
}

impl NoteScanner {
    pub fn new<D>(
        config: ScannerConfig,
        clock: Arc<dyn Clock>,
        trigger: Arc<dyn Trigger>,
        dispatch: D,
    ) -> Result<Self, ConfigError>
    where
        D: OwnerDispatch<StrikeBatch> + 'static,
    {
        let hooks = Box::new(StrikeCollector::new(dispatch));
        Ok(Self {
            inner: BeatScanner::new(config, clock, trigger, hooks)?,
        })
    }

    pub fn with_params(self, params: Arc<PlaybackParams>) -> Self {
        Self {
            inner: self.inner.with_params(params),
        }
    }

    pub fn start(
        &mut self,
        offset_ms: Millis,
        notes: &[Note],
        tempo: Arc<TempoMap>,
    ) -> Result<(), ScanError> {
        self.inner.start(offset_ms, notes, tempo)
    }

    pub fn stop(&mut self) {
        self.inner.stop();
    }

    pub fn set_tempo_scale(&self, factor: f64) -> bool {
        self.inner.set_tempo_scale(factor)
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.state()
    }
}
