//! Dattorro-style plate reverb.
//!
//! A mono sum runs through four input diffusers into a cross-coupled
//! figure-eight tank. Each tank side is an allpass, a long delay, a damping
//! low pass and a second allpass and delay; the stereo output is a weighted
//! sum of taps on all four long delays.

use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::dsp::common::{DcBlocker, OnePole, one_pole_alpha, one_pole_alpha_linear, soft_limit};
use crate::dsp::ring_buffer::{RingBuffer, scaled_capacity};
use crate::dsp::{AllpassDiffuser, LinearSmoother};
use crate::fx::Effect;
use crate::fx::shimmer::{self, Shimmer};
use crate::params::ReverbParams;
use crate::settings::{ReverbRamps, ReverbSettings};

/// Sample rate the delay lengths below were tuned at.
const REFERENCE_RATE: f64 = 29_761.0;
const DIFFUSER_LENGTHS: [usize; 4] = [142, 107, 379, 277];

const LEFT_TANK: TankLengths = TankLengths {
    input_tap: 672,
    first: 4453,
    output_tap: 1800,
    second: 3720,
};
const RIGHT_TANK: TankLengths = TankLengths {
    input_tap: 908,
    first: 4217,
    output_tap: 2656,
    second: 3163,
};

const INPUT_TAP_GAIN: f32 = 0.7;
const OUTPUT_TAP_GAIN: f32 = 0.5;

// Output tap positions as fractions of each long delay.
const NEAR_FIRST_TAP: f32 = 0.31;
const NEAR_SECOND_TAP: f32 = 0.18;
const FAR_FIRST_TAP: f32 = 0.38;
const FAR_SECOND_TAP: f32 = 0.27;

const DC_COEFF: f32 = 0.995;
const TONE_LOW_HZ: f32 = 400.0;
const TONE_HIGH_HZ: f32 = 3_200.0;

const TAIL_SECONDS: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlateVariant {
    /// Gentler diffusion with shimmer, DC blocking and soft limiting.
    #[default]
    Shimmer,
    /// Brighter plate with a longer maximum decay and no protection stages.
    Classic,
}

impl fmt::Display for PlateVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shimmer => write!(f, "Shimmer"),
            Self::Classic => write!(f, "Classic"),
        }
    }
}

/// Constants that distinguish the plate variants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlateTuning {
    pub diffusion_gains: [f32; 4],
    /// Near first, near second, far first, far second.
    pub tap_weights: [f32; 4],
    pub decay_slope: f32,
    pub decay_max: f32,
    /// Damping coefficient at `damp = 0` and `damp = 1`.
    pub damp_range: (f32, f32),
    pub bright_boost: f32,
    /// Tone filters use `1 - e^(-2πf/sr)` rather than `2πf/sr`.
    pub exact_tone_alpha: bool,
    /// Soft limiting, DC blocking and the shimmer path.
    pub protected: bool,
}

impl PlateVariant {
    pub const fn tuning(self) -> PlateTuning {
        match self {
            Self::Shimmer => PlateTuning {
                diffusion_gains: [0.70, 0.70, 0.625, 0.625],
                tap_weights: [0.432, 0.180, -0.108, -0.072],
                decay_slope: 0.43,
                decay_max: 0.93,
                damp_range: (0.0579, 0.9312),
                bright_boost: 0.25,
                exact_tone_alpha: true,
                protected: true,
            },
            Self::Classic => PlateTuning {
                diffusion_gains: [0.75, 0.75, 0.625, 0.625],
                tap_weights: [0.6, 0.25, -0.15, -0.1],
                decay_slope: 0.45,
                decay_max: 0.95,
                damp_range: (1.0, 0.3),
                bright_boost: 0.6,
                exact_tone_alpha: false,
                protected: false,
            },
        }
    }
}

impl PlateTuning {
    /// Tank feedback gain for a size control value.
    #[inline]
    pub fn decay(&self, size: f32) -> f32 {
        size.mul_add(self.decay_slope, 0.5).min(self.decay_max)
    }

    /// Low-pass coefficient applied inside the tank.
    #[inline]
    pub fn damp_coef(&self, damp: f32) -> f32 {
        let (start, end) = self.damp_range;
        damp.mul_add(end - start, start)
    }
}

struct TankLengths {
    input_tap: usize,
    first: usize,
    output_tap: usize,
    second: usize,
}

/// Convert a tap position into a `RingBuffer::read` delay.
///
/// A position of `k` is the value pushed `k` pushes ago, counting the most
/// recent push as one; position zero wraps to the oldest slot.
/// Length of a network delay at `sample_rate`.
///
/// The tank reads its long lines two slots behind the cursor, so those need
/// at least two samples; every other delay needs one. A rate too low for
/// that is a configuration bug.
fn network_capacity(base: usize, sample_rate: f64, min: usize) -> usize {
    let capacity = scaled_capacity(base, sample_rate, REFERENCE_RATE);
    assert!(
        capacity >= min,
        "{base}-sample delay scales to {capacity} at {sample_rate} Hz, need {min}"
    );
    capacity
}

fn tap_delay(capacity: usize, fraction: f32) -> usize {
    let position = (capacity as f32 * fraction) as usize;
    (position + capacity - 1) % capacity
}

struct TankSide {
    input_tap: AllpassDiffuser,
    first: RingBuffer<f32>,
    damping: OnePole,
    output_tap: AllpassDiffuser,
    second: RingBuffer<f32>,
    near: [usize; 2],
    far: [usize; 2],
}

impl TankSide {
    fn new() -> Self {
        Self {
            input_tap: AllpassDiffuser::new(1),
            first: RingBuffer::new(4),
            damping: OnePole::new(),
            output_tap: AllpassDiffuser::new(1),
            second: RingBuffer::new(4),
            near: [0; 2],
            far: [0; 2],
        }
    }

    fn prepare(&mut self, lengths: &TankLengths, sample_rate: f64) {
        self.input_tap
            .resize(network_capacity(lengths.input_tap, sample_rate, 1));
        self.first.resize(network_capacity(lengths.first, sample_rate, 2));
        self.output_tap
            .resize(network_capacity(lengths.output_tap, sample_rate, 1));
        self.second.resize(network_capacity(lengths.second, sample_rate, 2));
        self.damping.reset();

        let first = self.first.capacity();
        let second = self.second.capacity();
        self.near = [
            tap_delay(first, NEAR_FIRST_TAP),
            tap_delay(second, NEAR_SECOND_TAP),
        ];
        self.far = [
            tap_delay(first, FAR_FIRST_TAP),
            tap_delay(second, FAR_SECOND_TAP),
        ];
    }

    /// Signal leaving the second delay, fed to the opposite side.
    #[inline]
    fn tail(&self) -> f32 {
        self.second.read(self.second.capacity() - 2)
    }

    #[inline]
    fn process(&mut self, node: f32, decay: f32, damp_coef: f32) {
        let node = self.input_tap.process(node, INPUT_TAP_GAIN);
        self.first.push(node);
        let damped = self
            .damping
            .process(self.first.read(self.first.capacity() - 2), damp_coef);
        let tank = self.output_tap.process(decay * damped, OUTPUT_TAP_GAIN);
        self.second.push(tank);
    }

    #[inline]
    fn near_taps(&self) -> (f32, f32) {
        (self.first.read(self.near[0]), self.second.read(self.near[1]))
    }

    #[inline]
    fn far_taps(&self) -> (f32, f32) {
        (self.first.read(self.far[0]), self.second.read(self.far[1]))
    }

    fn lengths(&self) -> [usize; 4] {
        [
            self.input_tap.delay(),
            self.first.capacity(),
            self.output_tap.delay(),
            self.second.capacity(),
        ]
    }
}

/// DC blocker and tilt EQ for one output channel.
struct WetChannel {
    dc: DcBlocker,
    tone_low: OnePole,
    tone_high: OnePole,
}

impl WetChannel {
    const fn new() -> Self {
        Self {
            dc: DcBlocker::new(DC_COEFF),
            tone_low: OnePole::new(),
            tone_high: OnePole::new(),
        }
    }

    const fn reset(&mut self) {
        self.dc.reset();
        self.tone_low.reset();
        self.tone_high.reset();
    }

    // Flat at 0.5; darker below, brighter above.
    #[inline]
    fn tilt(&mut self, x: f32, tone: f32, alphas: (f32, f32), bright_boost: f32) -> f32 {
        let low = self.tone_low.process(x, alphas.0);
        let high = self.tone_high.process(x, alphas.1);
        if tone <= 0.5 {
            let t = tone * 2.0;
            t.mul_add(x - low, low)
        } else {
            let t = (tone - 0.5) * 2.0;
            (t * bright_boost).mul_add(x - high, x)
        }
    }
}

pub struct PlateReverb {
    variant: PlateVariant,
    tuning: PlateTuning,
    sample_rate: f64,
    max_block_size: usize,

    diffusers: [AllpassDiffuser; 4],
    left: TankSide,
    right: TankSide,
    wet: [WetChannel; 2],
    shimmer: Option<Shimmer>,
    shimmer_buffer_len: usize,
    tone_alphas: (f32, f32),

    ramps: ReverbRamps,
    mix: LinearSmoother,
    size: LinearSmoother,
    damp: LinearSmoother,
    tone: LinearSmoother,
    shimmer_amount: LinearSmoother,
}

impl PlateReverb {
    pub fn new(sample_rate: f64, max_block_size: usize) -> Self {
        Self::with_settings(&ReverbSettings::default(), sample_rate, max_block_size)
    }

    pub fn with_settings(
        settings: &ReverbSettings,
        sample_rate: f64,
        max_block_size: usize,
    ) -> Self {
        let variant = settings.variant;
        let tuning = variant.tuning();
        let shimmer = tuning
            .protected
            .then(|| Shimmer::new(settings.shimmer_buffer_len, sample_rate as f32));
        let defaults = ReverbParams::default();

        let mut reverb = Self {
            variant,
            tuning,
            sample_rate,
            max_block_size,
            diffusers: std::array::from_fn(|_| AllpassDiffuser::new(1)),
            left: TankSide::new(),
            right: TankSide::new(),
            wet: [WetChannel::new(), WetChannel::new()],
            shimmer,
            shimmer_buffer_len: settings.shimmer_buffer_len,
            tone_alphas: (0.0, 0.0),
            ramps: settings.ramps(),
            mix: LinearSmoother::new(defaults.mix),
            size: LinearSmoother::new(defaults.size),
            damp: LinearSmoother::new(defaults.damp),
            tone: LinearSmoother::new(defaults.tone),
            shimmer_amount: LinearSmoother::new(defaults.shimmer),
        };
        reverb.prepare(sample_rate, max_block_size);
        reverb
    }

    pub const fn variant(&self) -> PlateVariant {
        self.variant
    }

    /// Lengths of every delay in the network: four diffusers, then the
    /// left and right tank sides (input allpass, first delay, output
    /// allpass, second delay).
    pub fn buffer_lengths(&self) -> Vec<usize> {
        let mut lengths: Vec<usize> =
            self.diffusers.iter().map(AllpassDiffuser::delay).collect();
        lengths.extend(self.left.lengths());
        lengths.extend(self.right.lengths());
        lengths
    }

    #[inline]
    fn process_sample(
        &mut self,
        dry_l: f32,
        dry_r: f32,
        size: f32,
        damp: f32,
        tone: f32,
        shimmer_amount: f32,
    ) -> (f32, f32) {
        let tuning = self.tuning;
        let gains = tuning.diffusion_gains;

        let mut diffused = (dry_l + dry_r) * 0.5;
        for (diffuser, &gain) in self.diffusers.iter_mut().zip(gains.iter()) {
            diffused = diffuser.process(diffused, gain);
        }

        if tuning.protected {
            let (shim_l, shim_r) = match self.shimmer.as_mut() {
                Some(shimmer) if shimmer_amount > shimmer::ACTIVE_THRESHOLD => shimmer.read(),
                _ => (0.0, 0.0),
            };
            diffused = soft_limit(diffused + shimmer::feed(shim_l, shim_r, shimmer_amount));
        }

        let decay = tuning.decay(size);
        let damp_coef = tuning.damp_coef(damp);
        let limit = |x: f32| if tuning.protected { soft_limit(x) } else { x };

        let node = limit(decay.mul_add(self.right.tail(), diffused));
        self.left.process(node, decay, damp_coef);
        let node = limit(decay.mul_add(self.left.tail(), diffused));
        self.right.process(node, decay, damp_coef);

        let [w_near_first, w_near_second, w_far_first, w_far_second] = tuning.tap_weights;
        let (l_near_first, l_near_second) = self.left.near_taps();
        let (l_far_first, l_far_second) = self.left.far_taps();
        let (r_near_first, r_near_second) = self.right.near_taps();
        let (r_far_first, r_far_second) = self.right.far_taps();

        let mut out_l = w_near_first * l_near_first
            + w_near_second * l_near_second
            + w_far_first * r_far_first
            + w_far_second * r_far_second;
        let mut out_r = w_near_first * r_near_first
            + w_near_second * r_near_second
            + w_far_first * l_far_first
            + w_far_second * l_far_second;

        if tuning.protected {
            out_l = self.wet[0].dc.process(out_l);
            out_r = self.wet[1].dc.process(out_r);
        }

        // The grain buffer keeps filling while the shimmer is idle.
        if let Some(shimmer) = self.shimmer.as_mut() {
            shimmer.write(out_l, out_r);
        }

        let wet_l = self.wet[0].tilt(out_l, tone, self.tone_alphas, tuning.bright_boost);
        let wet_r = self.wet[1].tilt(out_r, tone, self.tone_alphas, tuning.bright_boost);
        (limit(wet_l), limit(wet_r))
    }
}

impl Effect for PlateReverb {
    type Params = ReverbParams;

    fn prepare(&mut self, sample_rate: f64, max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;

        for (diffuser, &base) in self.diffusers.iter_mut().zip(DIFFUSER_LENGTHS.iter()) {
            diffuser.resize(network_capacity(base, sample_rate, 1));
        }
        self.left.prepare(&LEFT_TANK, sample_rate);
        self.right.prepare(&RIGHT_TANK, sample_rate);
        self.wet.iter_mut().for_each(WetChannel::reset);

        if let Some(shimmer) = self.shimmer.as_mut() {
            shimmer.prepare(self.shimmer_buffer_len, sample_rate as f32);
        }

        let sr = sample_rate as f32;
        self.tone_alphas = if self.tuning.exact_tone_alpha {
            (one_pole_alpha(TONE_LOW_HZ, sr), one_pole_alpha(TONE_HIGH_HZ, sr))
        } else {
            (
                one_pole_alpha_linear(TONE_LOW_HZ, sr),
                one_pole_alpha_linear(TONE_HIGH_HZ, sr),
            )
        };

        let defaults = ReverbParams::default();
        for (smoother, ramp, value) in [
            (&mut self.mix, self.ramps.mix, defaults.mix),
            (&mut self.size, self.ramps.size, defaults.size),
            (&mut self.damp, self.ramps.damp, defaults.damp),
            (&mut self.tone, self.ramps.tone, defaults.tone),
            (&mut self.shimmer_amount, self.ramps.shimmer, defaults.shimmer),
        ] {
            smoother.snap(value);
            smoother.reset(sample_rate, ramp);
        }

        debug!(
            "{} plate prepared at {sample_rate} Hz, delay lengths {:?}",
            self.variant,
            self.buffer_lengths()
        );
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32], params: &ReverbParams) {
        debug_assert_eq!(left.len(), right.len(), "channel lengths differ");
        debug_assert!(
            left.len() <= self.max_block_size,
            "block of {} exceeds prepared size {}",
            left.len(),
            self.max_block_size
        );

        self.mix.set_target(params.mix);
        self.size.set_target(params.size);
        self.damp.set_target(params.damp);
        self.tone.set_target(params.tone);
        self.shimmer_amount.set_target(params.shimmer);

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let mix = self.mix.next_value();
            let size = self.size.next_value();
            let damp = self.damp.next_value();
            let tone = self.tone.next_value();
            let shimmer_amount = self.shimmer_amount.next_value();

            let (dry_l, dry_r) = (*l, *r);
            let (wet_l, wet_r) =
                self.process_sample(dry_l, dry_r, size, damp, tone, shimmer_amount);

            let out_l = (1.0 - mix).mul_add(dry_l, mix * wet_l);
            let out_r = (1.0 - mix).mul_add(dry_r, mix * wet_r);
            if self.tuning.protected {
                *l = soft_limit(out_l);
                *r = soft_limit(out_r);
            } else {
                *l = out_l;
                *r = out_r;
            }
        }
    }

    fn snap_parameters(&mut self, params: &ReverbParams) {
        self.mix.snap(params.mix);
        self.size.snap(params.size);
        self.damp.snap(params.damp);
        self.tone.snap(params.tone);
        self.shimmer_amount.snap(params.shimmer);
    }

    fn tail_seconds(&self) -> f64 {
        TAIL_SECONDS
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}
