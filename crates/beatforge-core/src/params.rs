use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Values the owner may change while a scan thread is reading them.
#[derive(Debug)]
pub struct PlaybackParams {
    tempo_scale: AtomicU64,
    metronome_enabled: AtomicBool,
}

impl PlaybackParams {
    pub fn new(metronome_enabled: bool) -> Self {
        Self {
            tempo_scale: AtomicU64::new(1.0_f64.to_bits()),
            metronome_enabled: AtomicBool::new(metronome_enabled),
        }
    }

    /// Returns false and keeps the old value unless `factor` is finite and positive.
    pub fn set_tempo_scale(&self, factor: f64) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            return false;
        }
        self.tempo_scale.store(factor.to_bits(), Ordering::Relaxed);
        true
    }

    pub fn tempo_scale(&self) -> f64 {
        f64::from_bits(self.tempo_scale.load(Ordering::Relaxed))
    }

    pub fn set_metronome_enabled(&self, enabled: bool) {
        self.metronome_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn metronome_enabled(&self) -> bool {
        self.metronome_enabled.load(Ordering::Relaxed)
    }
}

impl Default for PlaybackParams {
    fn default() -> Self {
        Self::new(false)
    }
}
