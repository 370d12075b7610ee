use crate::samples::{DecodedSample, StereoSample};
use beatforge_ports::audio::{AudioError, VoiceOutput, VoiceSettings};
use beatforge_ports::types::Volume01;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BufferSize, FromSample, SampleFormat, SizedSample, StreamConfig,
    SupportedBufferSize, SupportedStreamConfigRange,
};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Frames needed to cover `latency_ms` at `sample_rate`, at least one.
pub fn latency_frames(latency_ms: u32, sample_rate: u32) -> u32 {
    let frames = u64::from(sample_rate) * u64::from(latency_ms) / 1000;
    u32::try_from(frames.max(1)).unwrap_or(u32::MAX)
}

struct PlayState {
    /// Next frame to render; at or past the end means silent.
    position: AtomicUsize,
    volume: AtomicU32,
}

/// One voice: a sample bound to its own output stream, owned by a dedicated thread.
pub struct CpalVoice {
    state: Arc<PlayState>,
    duration: Duration,
    stop_tx: mpsc::Sender<()>,
    join_handle: Option<thread::JoinHandle<()>>,
}

impl VoiceOutput for CpalVoice {
    fn restart(&self) {
        self.state.position.store(0, Ordering::Release);
    }

    fn set_volume(&self, volume: Volume01) {
        self.state
            .volume
            .store(volume.get().to_bits(), Ordering::Relaxed);
    }

    fn sample_duration(&self) -> Duration {
        self.duration
    }
}

impl Drop for CpalVoice {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

struct SelectedStreamConfig {
    config: StreamConfig,
    sample_format: SampleFormat,
}

pub(crate) fn open_voice_stream(
    device_name: Option<String>,
    name: &str,
    decoded: Arc<DecodedSample>,
    settings: VoiceSettings,
) -> Result<CpalVoice, AudioError> {
    let state = Arc::new(PlayState {
        position: AtomicUsize::new(usize::MAX),
        volume: AtomicU32::new(settings.volume.get().to_bits()),
    });
    let duration = decoded.duration();
    let (ready_tx, ready_rx) = mpsc::sync_channel(1);
    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    let thread_state = state.clone();

    let join_handle = thread::Builder::new()
        .name(format!("voice-{name}"))
        .spawn(move || {
            let stream = match build_stream(device_name.as_deref(), &decoded, settings, thread_state)
            {
                Ok(stream) => stream,
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                    return;
                }
            };
            if let Err(err) = stream.play() {
                let _ = ready_tx.send(Err(AudioError::Backend(err.to_string())));
                return;
            }
            let _ = ready_tx.send(Ok(()));
            let _ = stop_rx.recv();
            drop(stream);
        })
        .map_err(|e| AudioError::Backend(e.to_string()))?;

    ready_rx
        .recv()
        .map_err(|e| AudioError::Backend(e.to_string()))??;

    Ok(CpalVoice {
        state,
        duration,
        stop_tx,
        join_handle: Some(join_handle),
    })
}

fn find_device(host: &cpal::Host, device_name: Option<&str>) -> Result<cpal::Device, AudioError> {
    let Some(wanted) = device_name else {
        return host
            .default_output_device()
            .ok_or_else(|| AudioError::DeviceUnavailable("no default output device".to_string()));
    };
    let mut devices = host
        .output_devices()
        .map_err(|e| AudioError::Backend(e.to_string()))?;
    devices
        .find(|device| device.name().map(|name| name == wanted).unwrap_or(false))
        .ok_or_else(|| AudioError::DeviceNotFound(wanted.to_string()))
}

fn build_stream(
    device_name: Option<&str>,
    decoded: &DecodedSample,
    settings: VoiceSettings,
    state: Arc<PlayState>,
) -> Result<cpal::Stream, AudioError> {
    let host = cpal::default_host();
    let device = find_device(&host, device_name)?;
    let selected = select_stream_config(&device, settings.latency_ms)?;
    let sample = StereoSample::prepare(decoded, selected.config.sample_rate.0, settings.pan);

    let stream = match selected.sample_format {
        SampleFormat::F32 => render_stream::<f32>(&device, &selected.config, sample, state),
        SampleFormat::I16 => render_stream::<i16>(&device, &selected.config, sample, state),
        SampleFormat::U16 => render_stream::<u16>(&device, &selected.config, sample, state),
        _ => Err(cpal::BuildStreamError::StreamConfigNotSupported),
    };
    stream.map_err(|e| AudioError::Backend(e.to_string()))
}

fn render_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    sample: StereoSample,
    state: Arc<PlayState>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = usize::from(config.channels);
    device.build_output_stream(
        config,
        move |data: &mut [T], _info: &cpal::OutputCallbackInfo| {
            let start = state.position.load(Ordering::Acquire);
            let volume = f32::from_bits(state.volume.load(Ordering::Relaxed));
            let len = sample.len();
            let mut rendered = 0;
            for (offset, frame) in data.chunks_exact_mut(channels.max(1)).enumerate() {
                let idx = start.saturating_add(offset);
                let (l, r) = match (sample.left.get(idx), sample.right.get(idx)) {
                    (Some(l), Some(r)) => (l * volume, r * volume),
                    _ => (0.0, 0.0),
                };
                write_frame(frame, l, r);
                rendered = offset + 1;
            }
            if start < len {
                let end = start.saturating_add(rendered).min(len);
                // a restart during this callback wins
                let _ = state.position.compare_exchange(
                    start,
                    end,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
            }
        },
        |err| tracing::error!(%err, "voice stream error"),
        None,
    )
}

/// Writes one interleaved frame: mono gets the average, extra channels stay silent.
pub fn write_frame<T>(frame: &mut [T], left: f32, right: f32)
where
    T: SizedSample + FromSample<f32>,
{
    match frame {
        [] => {}
        [mono] => *mono = T::from_sample(((left + right) * 0.5).clamp(-1.0, 1.0)),
        [l, r, rest @ ..] => {
            *l = T::from_sample(left.clamp(-1.0, 1.0));
            *r = T::from_sample(right.clamp(-1.0, 1.0));
            for ch in rest {
                *ch = T::EQUILIBRIUM;
            }
        }
    }
}

fn select_stream_config(
    device: &cpal::Device,
    latency_ms: u32,
) -> Result<SelectedStreamConfig, AudioError> {
    let default = device
        .default_output_config()
        .map_err(|e| AudioError::UnsupportedConfig(e.to_string()))?;
    let mut supported = device
        .supported_output_configs()
        .map_err(|e| AudioError::Backend(e.to_string()))?;

    let chosen = select_supported_config(&mut supported, default.channels(), default.sample_rate())
        .unwrap_or(default);
    let sample_format = chosen.sample_format();
    let buffer_size = match *chosen.buffer_size() {
        SupportedBufferSize::Range { min, max } if min <= max => {
            BufferSize::Fixed(latency_frames(latency_ms, chosen.sample_rate().0).clamp(min, max))
        }
        _ => BufferSize::Default,
    };
    let mut config = chosen.config();
    config.buffer_size = buffer_size;

    Ok(SelectedStreamConfig {
        config,
        sample_format,
    })
}

/// Best sample format at the device's default layout: f32, then i16, then u16.
fn select_supported_config(
    supported: &mut dyn Iterator<Item = SupportedStreamConfigRange>,
    channels: u16,
    sample_rate: cpal::SampleRate,
) -> Option<cpal::SupportedStreamConfig> {
    let mut best: Option<(i32, cpal::SupportedStreamConfig)> = None;

    for config_range in supported {
        if config_range.channels() != channels
            || sample_rate < config_range.min_sample_rate()
            || sample_rate > config_range.max_sample_rate()
        {
            continue;
        }
        let score = match config_range.sample_format() {
            SampleFormat::F32 => 3,
            SampleFormat::I16 => 2,
            SampleFormat::U16 => 1,
            _ => continue,
        };
        if best.as_ref().map_or(true, |(best_score, _)| score > *best_score) {
            best = Some((score, config_range.with_sample_rate(sample_rate)));
        }
    }

    best.map(|(_, config)| config)
}
