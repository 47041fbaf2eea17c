const ATTACK_RATE: f32 = 0.001;
const LEVEL_FLOOR: f32 = 0.001;
const MIN_GAIN: f32 = 0.1;

/// Threshold, ratio and release rate for a comp control value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorCurve {
    pub threshold: f32,
    pub ratio: f32,
    pub release_rate: f32,
}

impl CompressorCurve {
    pub fn from_amount(comp: f32) -> Self {
        Self {
            threshold: comp.mul_add(-0.85, 1.0),
            ratio: comp.mul_add(8.0, 1.0),
            release_rate: (1.0 - comp).mul_add(0.05, 0.0001),
        }
    }

    /// Gain that maps `level` onto the compressed curve.
    #[inline]
    pub fn target_gain(&self, level: f32) -> f32 {
        (self.threshold + (level - self.threshold) / self.ratio) / level.max(LEVEL_FLOOR)
    }
}

/// Per-channel gain rider for the saturation output.
///
/// Above the threshold the gain creeps toward the curve at a fixed slow
/// rate; below it the gain recovers toward unity at the release rate.
/// The gain never leaves `[0.1, 1]`.
#[derive(Clone)]
pub struct SoftCompressor {
    gain: f32,
}

impl Default for SoftCompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftCompressor {
    pub const fn new() -> Self {
        Self { gain: 1.0 }
    }

    pub const fn gain(&self) -> f32 {
        self.gain
    }

    #[inline]
    pub fn process(&mut self, input: f32, curve: &CompressorCurve) -> f32 {
        let level = input.abs();
        if level > curve.threshold {
            self.gain += (curve.target_gain(level) - self.gain) * ATTACK_RATE;
        } else {
            self.gain += (1.0 - self.gain) * curve.release_rate;
        }
        self.gain = self.gain.clamp(MIN_GAIN, 1.0);
        input * self.gain
    }
}
