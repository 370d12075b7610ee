use crate::config::MetronomeConfig;
use crate::dispatch::OwnerDispatch;
use crate::scanner::{ScanHooks, Trigger};
use crate::voice_pool::{Gate, PoolError, VoicePool};
use beatforge_ports::audio::AudioOutputPort;
use beatforge_ports::clock::Clock;
use beatforge_ports::types::{Beat, Lane, Volume01};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Click player: one sample, and clicks closer than the minimum gap are refused.
pub struct Metronome {
    pool: VoicePool,
    clock: Arc<dyn Clock>,
    min_gap: Duration,
    last_click: Mutex<Option<Duration>>,
}

impl Metronome {
    pub fn new(
        port: &dyn AudioOutputPort,
        clock: Arc<dyn Clock>,
        config: &MetronomeConfig,
    ) -> Result<Self, PoolError> {
        config.validate()?;
        let pool = VoicePool::build(
            port,
            clock.clone(),
            &config.pool_config(),
            Gate::MinGap(config.min_gap()),
            Some(1),
        )?;
        Ok(Self {
            pool,
            clock,
            min_gap: config.min_gap(),
            last_click: Mutex::new(None),
        })
    }

    pub fn click(&self) -> bool {
        let now = self.clock.now();
        let mut last_click = self.last_click.lock();
        if let Some(last) = *last_click {
            if now.saturating_sub(last) < self.min_gap {
                return false;
            }
        }
        if !self.pool.try_play(None) {
            return false;
        }
        *last_click = Some(now);
        true
    }

    pub fn change_volume(&self, level: f32) {
        self.pool.change_volume(level);
    }

    pub fn volume(&self) -> Volume01 {
        self.pool.volume()
    }

    pub fn is_enabled(&self) -> bool {
        self.pool.is_enabled()
    }
}

impl Trigger for Metronome {
    fn trigger(&self, _lane: Option<Lane>) -> bool {
        self.click()
    }
}

/// Whole beats from 0 through `total_beats`.
pub fn metronome_beats(total_beats: Beat) -> Vec<Beat> {
    if !total_beats.is_finite() || total_beats < 0.0 {
        return Vec::new();
    }
    (0..=total_beats.floor() as u64).map(|beat| beat as Beat).collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetronomeTick {
    pub beat: Beat,
    pub late: bool,
    pub played: bool,
}

/// Forwards every click to the owner.
pub struct TickForwarder<D> {
    dispatch: D,
}

impl<D> TickForwarder<D> {
    pub fn new(dispatch: D) -> Self {
        Self { dispatch }
    }
}

impl<D: OwnerDispatch<MetronomeTick>> ScanHooks<Beat> for TickForwarder<D> {
    fn on_late_hit(&mut self, beat: &Beat, played: bool) {
        self.dispatch.post(MetronomeTick {
            beat: *beat,
            late: true,
            played,
        });
    }

    fn on_hit(&mut self, beat: &Beat, played: bool) {
        self.dispatch.post(MetronomeTick {
            beat: *beat,
            late: false,
            played,
        });
    }
}
