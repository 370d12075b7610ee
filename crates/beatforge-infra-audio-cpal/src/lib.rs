mod samples;
mod stream;

pub use samples::{decode_wav, discover_variants, resample_linear, DecodedSample, StereoSample};
pub use stream::{latency_frames, write_frame, CpalVoice};

use beatforge_ports::audio::{AudioError, AudioOutputPort, SampleVariant, VoiceOutput, VoiceSettings};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Plays WAV samples from one directory, one cpal output stream per voice.
pub struct CpalAudioOutputPort {
    sample_dir: PathBuf,
    device_name: Option<String>,
    decoded: Mutex<HashMap<PathBuf, Arc<DecodedSample>>>,
}

impl CpalAudioOutputPort {
    pub fn new(sample_dir: impl Into<PathBuf>) -> Self {
        Self {
            sample_dir: sample_dir.into(),
            device_name: None,
            decoded: Mutex::new(HashMap::new()),
        }
    }

    /// Output on the named device instead of the host default.
    pub fn with_device(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    pub fn sample_dir(&self) -> &Path {
        &self.sample_dir
    }

    /// Each file is decoded once and shared by every voice that plays it.
    fn decode_cached(&self, path: &Path) -> Result<Arc<DecodedSample>, AudioError> {
        if let Some(decoded) = self.decoded.lock().get(path) {
            return Ok(decoded.clone());
        }
        let decoded = Arc::new(decode_wav(path)?);
        tracing::debug!(
            path = %path.display(),
            frames = decoded.frames(),
            channels = decoded.channels,
            sample_rate = decoded.sample_rate,
            "sample decoded"
        );
        self.decoded
            .lock()
            .insert(path.to_path_buf(), decoded.clone());
        Ok(decoded)
    }
}

impl AudioOutputPort for CpalAudioOutputPort {
    fn discover_variants(&self, base_name: &str) -> Result<Vec<SampleVariant>, AudioError> {
        discover_variants(&self.sample_dir, base_name)
    }

    fn open_voice(
        &self,
        variant: &SampleVariant,
        settings: VoiceSettings,
    ) -> Result<Box<dyn VoiceOutput>, AudioError> {
        let decoded = self.decode_cached(&variant.path)?;
        let voice =
            stream::open_voice_stream(self.device_name.clone(), &variant.name, decoded, settings)?;
        Ok(Box::new(voice))
    }
}
