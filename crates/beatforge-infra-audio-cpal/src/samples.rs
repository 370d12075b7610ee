use beatforge_ports::audio::{AudioError, SampleVariant};
use beatforge_ports::types::Pan;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Finds `<base>.wav` and `<base><n>.wav` in `dir`. The bare name comes first,
/// numbered variants follow in order of `n`.
pub fn discover_variants(dir: &Path, base_name: &str) -> Result<Vec<SampleVariant>, AudioError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| AudioError::Backend(format!("cannot read {}: {e}", dir.display())))?;

    let mut found = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| AudioError::Backend(e.to_string()))?.path();
        let is_wav = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
        if !is_wav {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        let Some(suffix) = stem.strip_prefix(base_name) else {
            continue;
        };
        let order = if suffix.is_empty() {
            None
        } else if suffix.bytes().all(|b| b.is_ascii_digit()) {
            match suffix.parse::<u64>() {
                Ok(n) => Some(n),
                Err(_) => continue,
            }
        } else {
            continue;
        };
        found.push((order, stem.to_string(), path));
    }

    found.sort();
    Ok(found
        .into_iter()
        .enumerate()
        .map(|(id, (_, name, path))| SampleVariant { id, name, path })
        .collect())
}

/// Interleaved PCM as stored in the file, scaled to -1..1.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedSample {
    pub sample_rate: u32,
    pub channels: usize,
    pub samples: Vec<f32>,
}

impl DecodedSample {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.sample_rate))
    }

    fn channel(&self, index: usize) -> Vec<f32> {
        self.samples
            .iter()
            .skip(index)
            .step_by(self.channels)
            .copied()
            .collect()
    }

    fn mono(&self) -> Vec<f32> {
        let scale = 1.0 / self.channels as f32;
        self.samples
            .chunks_exact(self.channels)
            .map(|frame| frame.iter().sum::<f32>() * scale)
            .collect()
    }
}

pub fn decode_wav(path: &Path) -> Result<DecodedSample, AudioError> {
    let decode_error = |e: hound::Error| AudioError::Decode(format!("{}: {e}", path.display()));
    let reader = hound::WavReader::open(path).map_err(decode_error)?;
    let spec = reader.spec();
    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(AudioError::Decode(format!(
            "{}: empty channel layout or sample rate",
            path.display()
        )));
    }

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(decode_error)?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1_i64 << spec.bits_per_sample.saturating_sub(1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|sample| sample.map(|value| value as f32 * scale))
                .collect::<Result<Vec<_>, _>>()
                .map_err(decode_error)?
        }
    };

    Ok(DecodedSample {
        sample_rate: spec.sample_rate,
        channels: usize::from(spec.channels),
        samples,
    })
}

/// A sample ready for one output stream: device rate, split into left and right.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StereoSample {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl StereoSample {
    /// With a pan the source is downmixed to mono and placed with constant power;
    /// without one, mono plays on both sides and extra channels are ignored.
    pub fn prepare(decoded: &DecodedSample, device_rate: u32, pan: Option<Pan>) -> Self {
        if decoded.channels == 0 {
            return Self::default();
        }
        let from = decoded.sample_rate;
        match pan {
            Some(pan) => {
                let mono = resample_linear(&decoded.mono(), from, device_rate);
                let (gain_l, gain_r) = pan.gains();
                Self {
                    left: mono.iter().map(|s| s * gain_l).collect(),
                    right: mono.iter().map(|s| s * gain_r).collect(),
                }
            }
            None if decoded.channels == 1 => {
                let mono = resample_linear(&decoded.samples, from, device_rate);
                Self {
                    left: mono.clone(),
                    right: mono,
                }
            }
            None => Self {
                left: resample_linear(&decoded.channel(0), from, device_rate),
                right: resample_linear(&decoded.channel(1), from, device_rate),
            },
        }
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }
}

pub fn resample_linear(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || from_rate == 0 || to_rate == 0 || input.is_empty() {
        return input.to_vec();
    }
    let step = f64::from(from_rate) / f64::from(to_rate);
    let out_len = (input.len() as f64 / step).ceil() as usize;
    (0..out_len)
        .map(|i| {
            let pos = i as f64 * step;
            let idx = pos.floor() as usize;
            let frac = (pos - idx as f64) as f32;
            let a = input.get(idx).copied().unwrap_or(0.0);
            let b = input.get(idx + 1).copied().unwrap_or(a);
            a + (b - a) * frac
        })
        .collect()
}
