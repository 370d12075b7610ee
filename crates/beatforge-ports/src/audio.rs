use crate::types::*;
use std::path::PathBuf;
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum AudioError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("unsupported config: {0}")]
    UnsupportedConfig(String),
    #[error("sample decode failed: {0}")]
    Decode(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// One interchangeable recording of a sound, e.g. `drum2.wav` for base name `drum`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleVariant {
    pub id: usize,
    pub name: String,
    pub path: PathBuf,
}

#[derive(Clone, Copy, Debug)]
pub struct VoiceSettings {
    pub latency_ms: u32,
    /// When set, the sample is downmixed to mono and placed at this position.
    pub pan: Option<Pan>,
    pub volume: Volume01,
}

/// A single playback slot owning its sample and output handle.
/// Calls come from the scanner thread and must not block.
pub trait VoiceOutput: Send {
    /// Rewind to the first frame and start playing.
    fn restart(&self);
    fn set_volume(&self, volume: Volume01);
    fn sample_duration(&self) -> Duration;
}

pub trait AudioOutputPort: Send + Sync {
    fn discover_variants(&self, base_name: &str) -> Result<Vec<SampleVariant>, AudioError>;

    fn open_voice(
        &self,
        variant: &SampleVariant,
        settings: VoiceSettings,
    ) -> Result<Box<dyn VoiceOutput>, AudioError>;
}
