use log::debug;
use std::f32::consts::TAU;
use std::fmt;

use crate::dsp::common::{OnePole, one_pole_alpha};
use crate::dsp::{LinearSmoother, RingBuffer};
use crate::fx::Effect;
use crate::params::DelayParams;
use crate::settings::{DelayRamps, DelaySettings};

const MIN_DELAY_MS: f32 = 20.0;
/// `MIN_DELAY_MS * TIME_RANGE` is the longest first tap.
const TIME_RANGE: f32 = 80.0;
const MAX_FEEDBACK: f32 = 0.88;
const FEEDBACK_CLAMP: f32 = 0.9;
const SECOND_TAP_GAIN: f32 = 0.7;
const MOD_DEPTH_SAMPLES: f32 = 12.0;

const DARK_BASE_HZ: f32 = 800.0;
const DARK_RANGE_HZ: f32 = 14_000.0;
const BRIGHT_RANGE_HZ: f32 = 400.0;
const BRIGHT_MIN_HZ: f32 = 20.0;

const TAIL_SECONDS: f64 = 4.0;

/// Ratio of the second delay to the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subdivision {
    Triplet,
    Eighth,
    DottedEighth,
    DottedQuarter,
    Golden,
}

impl Subdivision {
    pub fn from_control(sub: f32) -> Self {
        if sub < 0.2 {
            Self::Triplet
        } else if sub < 0.4 {
            Self::Eighth
        } else if sub < 0.6 {
            Self::DottedEighth
        } else if sub < 0.8 {
            Self::DottedQuarter
        } else {
            Self::Golden
        }
    }

    pub const fn ratio(self) -> f32 {
        match self {
            Self::Triplet => 0.667,
            Self::Eighth => 0.5,
            Self::DottedEighth => 0.75,
            Self::DottedQuarter => 1.5,
            Self::Golden => 1.618,
        }
    }
}

impl fmt::Display for Subdivision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Triplet => write!(f, "Triplet"),
            Self::Eighth => write!(f, "Eighth"),
            Self::DottedEighth => write!(f, "Dotted Eighth"),
            Self::DottedQuarter => write!(f, "Dotted Quarter"),
            Self::Golden => write!(f, "Golden"),
        }
    }
}

/// First delay time for a `time` control value, 20 ms to 1.6 s.
#[inline]
pub fn delay_ms(time: f32) -> f32 {
    MIN_DELAY_MS * TIME_RANGE.powf(time)
}

#[inline]
pub fn effective_feedback(feedback: f32) -> f32 {
    feedback.min(MAX_FEEDBACK)
}

struct DelayChannel {
    first: RingBuffer<f32>,
    second: RingBuffer<f32>,
    dark: OnePole,
    bright: OnePole,
}

impl DelayChannel {
    fn new() -> Self {
        Self {
            first: RingBuffer::new(4),
            second: RingBuffer::new(4),
            dark: OnePole::new(),
            bright: OnePole::new(),
        }
    }

    fn prepare(&mut self, capacity: usize) {
        self.first.resize(capacity);
        self.second.resize(capacity);
        self.dark.reset();
        self.bright.reset();
    }

    /// Modulated taps on both lines, clamped to ±1.
    #[inline]
    fn taps(&self, first_delay: f32, second_delay: f32) -> (f32, f32) {
        let w1 = self.first.read_cubic(first_delay.max(1.0)).clamp(-1.0, 1.0);
        let w2 = self.second.read_cubic(second_delay.max(1.0)).clamp(-1.0, 1.0);
        (w1, w2)
    }

    // Dark side low-passes the repeats, bright side removes their lows.
    #[inline]
    fn tone(&mut self, wet: f32, tone: f32, alphas: (f32, f32)) -> f32 {
        if tone < 0.5 {
            self.dark.process(wet, alphas.0)
        } else {
            wet - self.bright.process(wet, alphas.1)
        }
    }

    #[inline]
    fn write(&mut self, first: f32, second: f32) {
        self.first.push(first);
        self.second.push(second);
    }
}

/// Two modulated delay lines in series with musical time ratios.
///
/// The first line holds input plus feedback, the second a scaled copy of
/// the first line's output. Feedback crosses between channels as the
/// ping-pong control rises. Coefficients for the tone filters are taken
/// once per block from the smoothed tone value.
pub struct DualDelay {
    sample_rate: f64,
    max_block_size: usize,
    buffer_seconds: f64,
    lfo_rate_hz: f32,
    lfo_phase_offset: f32,

    channels: [DelayChannel; 2],
    lfo_phases: [f32; 2],
    lfo_increment: f32,

    // Cached mapping of the last smoothed time value
    last_time: f32,
    first_delay: f32,

    ramps: DelayRamps,
    mix: LinearSmoother,
    time: LinearSmoother,
    feedback: LinearSmoother,
    tone: LinearSmoother,
    sub: LinearSmoother,
    pingpong: LinearSmoother,
    modulation: LinearSmoother,
}

impl DualDelay {
    pub fn new(sample_rate: f64, max_block_size: usize) -> Self {
        Self::with_settings(&DelaySettings::default(), sample_rate, max_block_size)
    }

    pub fn with_settings(
        settings: &DelaySettings,
        sample_rate: f64,
        max_block_size: usize,
    ) -> Self {
        let defaults = DelayParams::default();
        let mut delay = Self {
            sample_rate,
            max_block_size,
            buffer_seconds: settings.buffer_seconds,
            lfo_rate_hz: settings.lfo_rate_hz,
            lfo_phase_offset: settings.lfo_phase_offset,
            channels: [DelayChannel::new(), DelayChannel::new()],
            lfo_phases: [0.0; 2],
            lfo_increment: 0.0,
            last_time: f32::NAN,
            first_delay: 1.0,
            ramps: settings.ramps.clone(),
            mix: LinearSmoother::new(defaults.mix),
            time: LinearSmoother::new(defaults.time),
            feedback: LinearSmoother::new(defaults.feedback),
            tone: LinearSmoother::new(defaults.tone),
            sub: LinearSmoother::new(defaults.sub),
            pingpong: LinearSmoother::new(defaults.pingpong),
            modulation: LinearSmoother::new(defaults.modulation),
        };
        delay.prepare(sample_rate, max_block_size);
        delay
    }

    /// Length of each delay line in samples.
    pub fn buffer_len(&self) -> usize {
        self.channels[0].first.capacity()
    }

    /// First delay in samples for a time control value.
    pub fn first_delay_samples(&self, time: f32) -> f32 {
        (delay_ms(time) * 0.001 * self.sample_rate as f32).max(1.0)
    }

    fn tone_alphas(&self, tone: f32) -> (f32, f32) {
        let sr = self.sample_rate as f32;
        let dark_cutoff = (tone.min(0.5) * 2.0).mul_add(DARK_RANGE_HZ, DARK_BASE_HZ);
        let bright_cutoff =
            ((tone - 0.5).max(0.0) * 2.0 * BRIGHT_RANGE_HZ).max(BRIGHT_MIN_HZ);
        (one_pole_alpha(dark_cutoff, sr), one_pole_alpha(bright_cutoff, sr))
    }

    #[inline]
    fn advance_lfos(&mut self) -> (f32, f32) {
        let a = (TAU * self.lfo_phases[0]).sin();
        let b = (TAU * self.lfo_phases[1]).sin();
        for phase in &mut self.lfo_phases {
            *phase = (*phase + self.lfo_increment) % 1.0;
        }
        (a, b)
    }
}

impl Effect for DualDelay {
    type Params = DelayParams;

    fn prepare(&mut self, sample_rate: f64, max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;

        let capacity = (self.buffer_seconds * sample_rate).round() as usize;
        assert!(
            capacity > 0,
            "delay buffer of {} s is empty at {sample_rate} Hz",
            self.buffer_seconds
        );
        for channel in &mut self.channels {
            channel.prepare(capacity);
        }
        self.lfo_phases = [0.0, self.lfo_phase_offset];
        self.lfo_increment = self.lfo_rate_hz / sample_rate as f32;
        self.last_time = f32::NAN;

        let defaults = DelayParams::default();
        for (smoother, ramp, value) in [
            (&mut self.mix, self.ramps.mix, defaults.mix),
            (&mut self.time, self.ramps.time, defaults.time),
            (&mut self.feedback, self.ramps.feedback, defaults.feedback),
            (&mut self.tone, self.ramps.tone, defaults.tone),
            (&mut self.sub, self.ramps.sub, defaults.sub),
            (&mut self.pingpong, self.ramps.pingpong, defaults.pingpong),
            (&mut self.modulation, self.ramps.modulation, defaults.modulation),
        ] {
            smoother.snap(value);
            smoother.reset(sample_rate, ramp);
        }

        debug!(
            "Dual delay prepared at {sample_rate} Hz, {capacity} samples per line, LFO {} Hz",
            self.lfo_rate_hz
        );
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32], params: &DelayParams) {
        debug_assert_eq!(left.len(), right.len(), "channel lengths differ");
        debug_assert!(
            left.len() <= self.max_block_size,
            "block of {} exceeds prepared size {}",
            left.len(),
            self.max_block_size
        );

        self.mix.set_target(params.mix);
        self.time.set_target(params.time);
        self.feedback.set_target(params.feedback);
        self.tone.set_target(params.tone);
        self.sub.set_target(params.sub);
        self.pingpong.set_target(params.pingpong);
        self.modulation.set_target(params.modulation);

        let alphas = self.tone_alphas(self.tone.current());

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let mix = self.mix.next_value();
            let time = self.time.next_value();
            let feedback = effective_feedback(self.feedback.next_value());
            let tone = self.tone.next_value();
            let sub = self.sub.next_value();
            let ping = self.pingpong.next_value();
            let modulation = self.modulation.next_value();

            if time != self.last_time {
                self.last_time = time;
                self.first_delay = self.first_delay_samples(time);
            }
            let d1 = self.first_delay;
            let d2 = (d1 * Subdivision::from_control(sub).ratio()).max(1.0);

            let depth = modulation * modulation * MOD_DEPTH_SAMPLES;
            let (lfo_a, lfo_b) = self.advance_lfos();
            let (lfo_a, lfo_b) = (lfo_a * depth, lfo_b * depth);

            let dry = [*l, *r];
            let mut first_taps = [0.0; 2];
            let mut wet = [0.0; 2];
            let mut fb = [0.0; 2];
            for (ch, sign) in [1.0f32, -1.0].into_iter().enumerate() {
                let channel = &mut self.channels[ch];
                let (w1, w2) = channel.taps(sign.mul_add(lfo_a, d1), sign.mul_add(lfo_b, d2));
                first_taps[ch] = w1;
                wet[ch] = channel.tone(w2.mul_add(SECOND_TAP_GAIN, w1), tone, alphas);
                fb[ch] = (wet[ch] * feedback).clamp(-FEEDBACK_CLAMP, FEEDBACK_CLAMP);
            }

            let feed = [
                ping.mul_add(fb[1] - fb[0], fb[0]),
                ping.mul_add(fb[0] - fb[1], fb[1]),
            ];
            for (ch, channel) in self.channels.iter_mut().enumerate() {
                channel.write(dry[ch] + feed[ch], first_taps[ch] * SECOND_TAP_GAIN);
            }

            *l = (1.0 - mix).mul_add(dry[0], mix * wet[0]).clamp(-1.0, 1.0);
            *r = (1.0 - mix).mul_add(dry[1], mix * wet[1]).clamp(-1.0, 1.0);
        }
    }

    fn snap_parameters(&mut self, params: &DelayParams) {
        self.mix.snap(params.mix);
        self.time.snap(params.time);
        self.feedback.snap(params.feedback);
        self.tone.snap(params.tone);
        self.sub.snap(params.sub);
        self.pingpong.snap(params.pingpong);
        self.modulation.snap(params.modulation);
    }

    fn tail_seconds(&self) -> f64 {
        TAIL_SECONDS
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}
