use serde::{Deserialize, Serialize};

pub type Beat = f64; // musical position, independent of tempo
pub type Millis = f64; // song time since song start
pub type Lane = i32;

/// Gain in 0..=1. Deserialized values are clamped like [`Volume01::new`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(from = "f32")]
pub struct Volume01(pub f32);

impl From<f32> for Volume01 {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

impl Volume01 {
    pub fn new(value: f32) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    /// Negative levels are treated as their magnitude.
    pub fn from_level(level: f32) -> Self {
        if level.is_nan() {
            return Self(0.0);
        }
        Self::new(level.abs())
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

/// Stereo position, -1.0 is hard left and 1.0 hard right.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct Pan(pub f32);

impl Pan {
    pub const CENTER: Pan = Pan(0.0);

    pub fn new(value: f32) -> Self {
        Self(value.clamp(-1.0, 1.0))
    }

    /// Even spread of `count` positions across the stereo field.
    pub fn spread(index: usize, count: usize) -> Self {
        if count <= 1 {
            return Self::CENTER;
        }
        let t = index.min(count - 1) as f32 / (count - 1) as f32;
        Self::new(t * 2.0 - 1.0)
    }

    /// Constant-power gains for (left, right).
    pub fn gains(self) -> (f32, f32) {
        let angle = (self.0 + 1.0) * std::f32::consts::FRAC_PI_4;
        (angle.cos(), angle.sin())
    }

    pub fn get(self) -> f32 {
        self.0
    }
}
