use crate::config::{ConfigError, VoicePoolConfig};
use crate::scanner::Trigger;
use beatforge_ports::audio::{AudioError, AudioOutputPort, VoiceOutput, VoiceSettings};
use beatforge_ports::clock::Clock;
use beatforge_ports::types::{Lane, Pan, Volume01};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum PoolError {
    #[error("no sample variants found for '{0}'")]
    NoSampleVariants(String),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("audio error: {0}")]
    Audio(#[from] AudioError),
}

/// How long a voice stays busy after it is triggered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gate {
    SampleEnd,
    MinGap(Duration),
}

struct Voice {
    output: Box<dyn VoiceOutput>,
    sample: usize,
    group: usize,
    hold: Duration,
    busy_until: Duration,
}

struct PoolState {
    voices: Vec<Voice>,
    last_voice: Option<usize>,
}

/// Fixed bank of voices. A voice is reused only after its gate has elapsed. Among free
/// voices, one holding a different sample than the last hit is preferred.
pub struct VoicePool {
    name: String,
    clock: Arc<dyn Clock>,
    enabled: bool,
    lane_grouping: bool,
    /// One group per lane with lane grouping, otherwise a single group.
    lane_groups: usize,
    volume: AtomicU32,
    state: Mutex<PoolState>,
}

impl VoicePool {
    pub fn new(
        port: &dyn AudioOutputPort,
        clock: Arc<dyn Clock>,
        config: &VoicePoolConfig,
    ) -> Result<Self, PoolError> {
        Self::build(port, clock, config, Gate::SampleEnd, None)
    }

    pub(crate) fn build(
        port: &dyn AudioOutputPort,
        clock: Arc<dyn Clock>,
        config: &VoicePoolConfig,
        gate: Gate,
        variant_limit: Option<usize>,
    ) -> Result<Self, PoolError> {
        config.validate()?;

        let mut pool = Self {
            name: config.base_name.clone(),
            clock,
            enabled: config.enabled,
            lane_grouping: config.lane_panning,
            lane_groups: 0,
            volume: AtomicU32::new(config.default_volume.get().to_bits()),
            state: Mutex::new(PoolState {
                voices: Vec::new(),
                last_voice: None,
            }),
        };
        if !config.enabled {
            tracing::info!(pool = %pool.name, "voice pool disabled");
            return Ok(pool);
        }

        let mut variants = port.discover_variants(&config.base_name)?;
        if let Some(limit) = variant_limit {
            variants.truncate(limit);
        }
        if variants.is_empty() {
            return Err(PoolError::NoSampleVariants(config.base_name.clone()));
        }

        let groups = if config.lane_panning { config.lane_count } else { 1 };
        let mut voices = Vec::with_capacity(config.voice_count);
        for index in 0..config.voice_count {
            let group = index % groups;
            let sample = (index / groups) % variants.len();
            let settings = VoiceSettings {
                latency_ms: config.desired_latency_ms,
                pan: config.lane_panning.then(|| Pan::spread(group, groups)),
                volume: config.default_volume,
            };
            let output = port.open_voice(&variants[sample], settings)?;
            let hold = match gate {
                Gate::SampleEnd => output.sample_duration(),
                Gate::MinGap(gap) => gap,
            };
            voices.push(Voice {
                output,
                sample,
                group,
                hold,
                busy_until: Duration::ZERO,
            });
        }

        pool.lane_groups = groups;

        tracing::info!(
            pool = %pool.name,
            voices = voices.len(),
            variants = variants.len(),
            lane_panning = config.lane_panning,
            "voice pool ready"
        );
        pool.state.get_mut().voices = voices;
        Ok(pool)
    }

    /// Starts a free voice, confined to `lane` when lane panning is on.
    /// Returns false when no voice is eligible; the hit is dropped.
    pub fn try_play(&self, lane: Option<Lane>) -> bool {
        if !self.enabled {
            return false;
        }

        let group = match (self.lane_grouping, lane) {
            (true, Some(lane)) => match usize::try_from(lane) {
                Ok(group) if group < self.lane_groups => Some(group),
                _ => {
                    tracing::debug!(pool = %self.name, lane, "lane has no voices");
                    return false;
                }
            },
            _ => None,
        };

        let now = self.clock.now();
        let mut state = self.state.lock();
        let PoolState { voices, last_voice } = &mut *state;
        let count = voices.len();
        if count == 0 {
            return false;
        }

        let last_sample = last_voice.map(|idx| voices[idx].sample);
        let start = last_voice.map(|idx| idx + 1).unwrap_or(0);
        let mut eligible = (0..count).map(|offset| (start + offset) % count).filter(|&idx| {
            let voice = &voices[idx];
            voice.busy_until <= now && group.map_or(true, |group| voice.group == group)
        });
        // The last-played sample only loses ties among free voices.
        let first = eligible.next();
        let chosen = first
            .into_iter()
            .chain(eligible)
            .find(|&idx| Some(voices[idx].sample) != last_sample)
            .or(first);

        let Some(idx) = chosen else {
            tracing::warn!(pool = %self.name, ?lane, "no free voice, dropping hit");
            return false;
        };

        let voice = &mut voices[idx];
        voice.output.restart();
        voice.busy_until = now + voice.hold;
        *last_voice = Some(idx);
        true
    }

    /// Applies `clamp(|level|, 0, 1)` to every voice.
    pub fn change_volume(&self, level: f32) {
        let volume = Volume01::from_level(level);
        self.volume.store(volume.get().to_bits(), Ordering::Relaxed);
        let state = self.state.lock();
        for voice in &state.voices {
            voice.output.set_volume(volume);
        }
    }

    pub fn volume(&self) -> Volume01 {
        Volume01(f32::from_bits(self.volume.load(Ordering::Relaxed)))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn voice_count(&self) -> usize {
        self.state.lock().voices.len()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Trigger for VoicePool {
    fn trigger(&self, lane: Option<Lane>) -> bool {
        self.try_play(lane)
    }
}
