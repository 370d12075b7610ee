use beatforge_ports::types::Volume01;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

fn default_poll_interval_ms() -> u64 {
    10
}

fn default_detection_delta_ms() -> f64 {
    15.0
}

fn default_late_threshold_ms() -> f64 {
    15.0
}

fn default_note_base_name() -> String {
    "drum".to_string()
}

fn default_note_voice_count() -> usize {
    16
}

fn default_latency_ms() -> u32 {
    50
}

fn default_enabled() -> bool {
    true
}

fn default_lane_count() -> usize {
    4
}

fn default_note_volume() -> Volume01 {
    Volume01::new(0.8)
}

fn default_metronome_base_name() -> String {
    "metronome".to_string()
}

fn default_metronome_voice_count() -> usize {
    2
}

fn default_min_gap_ms() -> u64 {
    200
}

fn default_metronome_volume() -> Volume01 {
    Volume01::new(0.6)
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("invalid {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Poll frequency vs. hit tolerance vs. lateness cutoff.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// An event fires on time while `|now - due| < detection_delta_ms`.
    #[serde(default = "default_detection_delta_ms")]
    pub detection_delta_ms: f64,
    /// An event at least this far behind is fired as a late hit.
    #[serde(default = "default_late_threshold_ms")]
    pub late_threshold_ms: f64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            detection_delta_ms: default_detection_delta_ms(),
            late_threshold_ms: default_late_threshold_ms(),
        }
    }
}

impl ScannerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(invalid("poll_interval_ms", "must be positive"));
        }
        if !(self.detection_delta_ms.is_finite() && self.detection_delta_ms > 0.0) {
            return Err(invalid(
                "detection_delta_ms",
                format!("must be positive, got {}", self.detection_delta_ms),
            ));
        }
        if !(self.late_threshold_ms.is_finite() && self.late_threshold_ms > 0.0) {
            return Err(invalid(
                "late_threshold_ms",
                format!("must be positive, got {}", self.late_threshold_ms),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoicePoolConfig {
    #[serde(default = "default_note_base_name")]
    pub base_name: String,
    #[serde(default = "default_note_voice_count")]
    pub voice_count: usize,
    #[serde(default = "default_latency_ms")]
    pub desired_latency_ms: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Confine voices to lanes and spread the lanes across the stereo field.
    #[serde(default)]
    pub lane_panning: bool,
    #[serde(default = "default_lane_count")]
    pub lane_count: usize,
    #[serde(default = "default_note_volume")]
    pub default_volume: Volume01,
}

impl Default for VoicePoolConfig {
    fn default() -> Self {
        Self {
            base_name: default_note_base_name(),
            voice_count: default_note_voice_count(),
            desired_latency_ms: default_latency_ms(),
            enabled: true,
            lane_panning: false,
            lane_count: default_lane_count(),
            default_volume: default_note_volume(),
        }
    }
}

impl VoicePoolConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_name.trim().is_empty() {
            return Err(invalid("base_name", "must not be empty"));
        }
        if self.voice_count == 0 {
            return Err(invalid("voice_count", "must be at least 1"));
        }
        if self.lane_count == 0 {
            return Err(invalid("lane_count", "must be at least 1"));
        }
        if self.lane_panning && self.voice_count < self.lane_count {
            return Err(invalid(
                "voice_count",
                format!(
                    "lane panning needs a voice per lane ({} voices, {} lanes)",
                    self.voice_count, self.lane_count
                ),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetronomeConfig {
    #[serde(default = "default_metronome_base_name")]
    pub base_name: String,
    #[serde(default = "default_metronome_voice_count")]
    pub voice_count: usize,
    /// Clicks closer together than this are refused.
    #[serde(default = "default_min_gap_ms")]
    pub min_gap_ms: u64,
    #[serde(default = "default_latency_ms")]
    pub desired_latency_ms: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metronome_volume")]
    pub default_volume: Volume01,
}

impl Default for MetronomeConfig {
    fn default() -> Self {
        Self {
            base_name: default_metronome_base_name(),
            voice_count: default_metronome_voice_count(),
            min_gap_ms: default_min_gap_ms(),
            desired_latency_ms: default_latency_ms(),
            enabled: true,
            default_volume: default_metronome_volume(),
        }
    }
}

impl MetronomeConfig {
    pub fn min_gap(&self) -> Duration {
        Duration::from_millis(self.min_gap_ms)
    }

    pub fn pool_config(&self) -> VoicePoolConfig {
        VoicePoolConfig {
            base_name: self.base_name.clone(),
            voice_count: self.voice_count,
            desired_latency_ms: self.desired_latency_ms,
            enabled: self.enabled,
            lane_panning: false,
            lane_count: 1,
            default_volume: self.default_volume,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_gap_ms == 0 {
            return Err(invalid("min_gap_ms", "must be positive"));
        }
        self.pool_config().validate()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scanner: ScannerConfig,
    pub notes: VoicePoolConfig,
    pub metronome: MetronomeConfig,
}

impl EngineConfig {
    pub fn from_json_str(data: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(data).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_json_str(&data)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scanner.validate()?;
        self.notes.validate()?;
        self.metronome.validate()
    }
}
