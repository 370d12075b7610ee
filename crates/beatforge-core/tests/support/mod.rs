#![allow(dead_code)]

use beatforge_core::Trigger;
use beatforge_ports::audio::{AudioError, AudioOutputPort, SampleVariant, VoiceOutput, VoiceSettings};
use beatforge_ports::types::{Lane, Pan, Volume01};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone, Debug, PartialEq)]
pub struct OpenedVoice {
    pub variant: usize,
    pub pan: Option<Pan>,
}

/// In-memory output: every voice logs its restarts and volume changes.
#[derive(Default)]
pub struct FakeAudioPort {
    variants: HashMap<String, usize>,
    sample_duration: Duration,
    pub discover_calls: AtomicUsize,
    pub opened: Mutex<Vec<OpenedVoice>>,
    /// Variant id of every restarted voice, in order.
    pub restarts: Arc<Mutex<Vec<usize>>>,
    pub volumes: Arc<Mutex<Vec<f32>>>,
}

impl FakeAudioPort {
    pub fn new(sample_duration: Duration) -> Self {
        Self {
            sample_duration,
            ..Self::default()
        }
    }

    pub fn with_variants(mut self, base_name: &str, count: usize) -> Self {
        self.variants.insert(base_name.to_string(), count);
        self
    }

    pub fn restarts(&self) -> Vec<usize> {
        self.restarts.lock().clone()
    }
}

impl AudioOutputPort for FakeAudioPort {
    fn discover_variants(&self, base_name: &str) -> Result<Vec<SampleVariant>, AudioError> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        let count = self.variants.get(base_name).copied().unwrap_or(0);
        Ok((0..count)
            .map(|id| SampleVariant {
                id,
                name: format!("{base_name}{id}"),
                path: PathBuf::from(format!("{base_name}{id}.wav")),
            })
            .collect())
    }

    fn open_voice(
        &self,
        variant: &SampleVariant,
        settings: VoiceSettings,
    ) -> Result<Box<dyn VoiceOutput>, AudioError> {
        self.opened.lock().push(OpenedVoice {
            variant: variant.id,
            pan: settings.pan,
        });
        Ok(Box::new(FakeVoice {
            variant: variant.id,
            duration: self.sample_duration,
            restarts: self.restarts.clone(),
            volumes: self.volumes.clone(),
        }))
    }
}

struct FakeVoice {
    variant: usize,
    duration: Duration,
    restarts: Arc<Mutex<Vec<usize>>>,
    volumes: Arc<Mutex<Vec<f32>>>,
}

impl VoiceOutput for FakeVoice {
    fn restart(&self) {
        self.restarts.lock().push(self.variant);
    }

    fn set_volume(&self, volume: Volume01) {
        self.volumes.lock().push(volume.get());
    }

    fn sample_duration(&self) -> Duration {
        self.duration
    }
}

/// Records every trigger and answers with a fixed result.
pub struct RecordingTrigger {
    pub lanes: Mutex<Vec<Option<Lane>>>,
    result: bool,
}

impl RecordingTrigger {
    pub fn new(result: bool) -> Self {
        Self {
            lanes: Mutex::new(Vec::new()),
            result,
        }
    }

    pub fn count(&self) -> usize {
        self.lanes.lock().len()
    }
}

impl Trigger for RecordingTrigger {
    fn trigger(&self, lane: Option<Lane>) -> bool {
        self.lanes.lock().push(lane);
        self.result
    }
}

/// Polls `check` until it holds or two seconds pass.
pub fn wait_until(mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    check()
}
