//! Multi-mode saturation with envelope-adaptive drive.
//!
//! Each channel runs: envelope follower, blended waveshaper, DC blocker,
//! warmth boost, tilt EQ, optional soft compressor, output gain and a
//! dry/wet mix with a final hard clamp.

use log::debug;

use crate::dsp::LinearSmoother;
use crate::dsp::common::{DcBlocker, EnvelopeFollower, OnePole, db_to_lin, one_pole_alpha};
use crate::fx::Effect;
use crate::fx::compressor::{CompressorCurve, SoftCompressor};
use crate::fx::shapers;
use crate::params::SaturationParams;
use crate::settings::{SaturationRamps, SaturationSettings};

const ENVELOPE_RISE_RATE: f32 = 0.002;
const ENVELOPE_FALL_BASE: f32 = 0.001;
const ENVELOPE_FALL_RANGE: f32 = 0.12;
/// Largest share of the drive removed on transients.
const TRANSIENT_DUCKING: f32 = 0.85;

const DC_CUTOFF_HZ: f32 = 20.0;
const WARMTH_HZ: f32 = 300.0;
const WARMTH_BOOST: f32 = 1.5;
const TONE_BASE_HZ: f32 = 500.0;
const TONE_RANGE_HZ: f32 = 14_000.0;
const BRIGHT_BOOST: f32 = 2.5;
/// Output control span in dB around unity.
const OUTPUT_RANGE_DB: f32 = 24.0;

/// Drive left after transient ducking for an envelope level.
#[inline]
pub fn effective_drive(drive: f32, attack: f32, envelope: f32) -> f32 {
    let duck = (1.0 - attack) * TRANSIENT_DUCKING * (envelope * 3.0).min(1.0);
    drive * (1.0 - duck)
}

#[inline]
pub fn output_gain(output: f32) -> f32 {
    db_to_lin((output - 0.5) * OUTPUT_RANGE_DB)
}

/// Per-sample control values shared by both channels.
#[derive(Clone, Copy)]
struct Controls {
    drive: f32,
    grit: f32,
    tone: f32,
    warmth: f32,
    attack: f32,
    kind: f32,
    comp: f32,
}

struct SaturationChannel {
    envelope: EnvelopeFollower,
    dc: DcBlocker,
    warmth: OnePole,
    tone: OnePole,
    compressor: SoftCompressor,
}

impl SaturationChannel {
    fn new(sample_rate: f32) -> Self {
        Self {
            envelope: EnvelopeFollower::from_rates(ENVELOPE_RISE_RATE, ENVELOPE_FALL_BASE),
            dc: DcBlocker::from_cutoff(DC_CUTOFF_HZ, sample_rate),
            warmth: OnePole::new(),
            tone: OnePole::new(),
            compressor: SoftCompressor::new(),
        }
    }

    /// Wet path for one sample, before mix and output gain.
    #[inline]
    fn process(
        &mut self,
        dry: f32,
        c: &Controls,
        curve: &CompressorCurve,
        alphas: (f32, f32),
    ) -> f32 {
        self.envelope
            .set_release_rate(c.attack.mul_add(ENVELOPE_FALL_RANGE, ENVELOPE_FALL_BASE));
        let env = self.envelope.process(dry);
        let drive = effective_drive(c.drive, c.attack, env);

        let mut wet = shapers::blend(dry, drive, c.grit, c.kind);
        wet = self.dc.process(wet);

        let warm = self.warmth.process(wet, alphas.0);
        wet = (c.warmth * WARMTH_BOOST).mul_add(warm, wet);

        let low = self.tone.process(wet, alphas.1);
        wet = if c.tone < 0.5 {
            (c.tone * 2.0).mul_add(wet - low, low)
        } else {
            ((c.tone - 0.5) * BRIGHT_BOOST).mul_add(wet - low, wet)
        };

        if c.comp > 0.0 {
            wet = self.compressor.process(wet, curve);
        }
        wet
    }
}

pub struct Saturation {
    sample_rate: f64,
    max_block_size: usize,
    channels: [SaturationChannel; 2],
    warmth_alpha: f32,

    // Output gain for the last smoothed output value
    last_output: f32,
    gain: f32,

    ramps: SaturationRamps,
    drive: LinearSmoother,
    grit: LinearSmoother,
    tone: LinearSmoother,
    warmth: LinearSmoother,
    attack: LinearSmoother,
    output: LinearSmoother,
    mix: LinearSmoother,
    kind: LinearSmoother,
    comp: LinearSmoother,
}

impl Saturation {
    pub fn new(sample_rate: f64, max_block_size: usize) -> Self {
        Self::with_settings(&SaturationSettings::default(), sample_rate, max_block_size)
    }

    pub fn with_settings(
        settings: &SaturationSettings,
        sample_rate: f64,
        max_block_size: usize,
    ) -> Self {
        let defaults = SaturationParams::default();
        let sr = sample_rate as f32;
        let mut saturation = Self {
            sample_rate,
            max_block_size,
            channels: [SaturationChannel::new(sr), SaturationChannel::new(sr)],
            warmth_alpha: 0.0,
            last_output: f32::NAN,
            gain: 1.0,
            ramps: settings.ramps.clone(),
            drive: LinearSmoother::new(defaults.drive),
            grit: LinearSmoother::new(defaults.grit),
            tone: LinearSmoother::new(defaults.tone),
            warmth: LinearSmoother::new(defaults.warmth),
            attack: LinearSmoother::new(defaults.attack),
            output: LinearSmoother::new(defaults.output),
            mix: LinearSmoother::new(defaults.mix),
            kind: LinearSmoother::new(defaults.kind),
            comp: LinearSmoother::new(defaults.comp),
        };
        saturation.prepare(sample_rate, max_block_size);
        saturation
    }

    fn tone_alpha(&self, tone: f32) -> f32 {
        let cutoff = tone.mul_add(TONE_RANGE_HZ, TONE_BASE_HZ);
        one_pole_alpha(cutoff, self.sample_rate as f32)
    }
}

impl Effect for Saturation {
    type Params = SaturationParams;

    fn prepare(&mut self, sample_rate: f64, max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;

        let sr = sample_rate as f32;
        self.channels = [SaturationChannel::new(sr), SaturationChannel::new(sr)];
        self.warmth_alpha = one_pole_alpha(WARMTH_HZ, sr);
        self.last_output = f32::NAN;

        let defaults = SaturationParams::default();
        for (smoother, ramp, value) in [
            (&mut self.drive, self.ramps.drive, defaults.drive),
            (&mut self.grit, self.ramps.grit, defaults.grit),
            (&mut self.tone, self.ramps.tone, defaults.tone),
            (&mut self.warmth, self.ramps.warmth, defaults.warmth),
            (&mut self.attack, self.ramps.attack, defaults.attack),
            (&mut self.output, self.ramps.output, defaults.output),
            (&mut self.mix, self.ramps.mix, defaults.mix),
            (&mut self.kind, self.ramps.kind, defaults.kind),
            (&mut self.comp, self.ramps.comp, defaults.comp),
        ] {
            smoother.snap(value);
            smoother.reset(sample_rate, ramp);
        }

        debug!("Saturation prepared at {sample_rate} Hz");
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32], params: &SaturationParams) {
        debug_assert_eq!(left.len(), right.len(), "channel lengths differ");
        debug_assert!(
            left.len() <= self.max_block_size,
            "block of {} exceeds prepared size {}",
            left.len(),
            self.max_block_size
        );

        self.drive.set_target(params.drive);
        self.grit.set_target(params.grit);
        self.tone.set_target(params.tone);
        self.warmth.set_target(params.warmth);
        self.attack.set_target(params.attack);
        self.output.set_target(params.output);
        self.mix.set_target(params.mix);
        self.kind.set_target(params.kind);
        self.comp.set_target(params.comp);

        let alphas = (self.warmth_alpha, self.tone_alpha(self.tone.current()));

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let controls = Controls {
                drive: self.drive.next_value(),
                grit: self.grit.next_value(),
                tone: self.tone.next_value(),
                warmth: self.warmth.next_value(),
                attack: self.attack.next_value(),
                kind: self.kind.next_value(),
                comp: self.comp.next_value(),
            };
            let output = self.output.next_value();
            let mix = self.mix.next_value();

            if output != self.last_output {
                self.last_output = output;
                self.gain = output_gain(output);
            }
            let curve = CompressorCurve::from_amount(controls.comp);

            for (sample, channel) in [l, r].into_iter().zip(self.channels.iter_mut()) {
                let dry = *sample;
                let wet = channel.process(dry, &controls, &curve, alphas);
                *sample = ((1.0 - mix).mul_add(dry, mix * wet) * self.gain).clamp(-1.0, 1.0);
            }
        }
    }

    fn snap_parameters(&mut self, params: &SaturationParams) {
        self.drive.snap(params.drive);
        self.grit.snap(params.grit);
        self.tone.snap(params.tone);
        self.warmth.snap(params.warmth);
        self.attack.snap(params.attack);
        self.output.snap(params.output);
        self.mix.snap(params.mix);
        self.kind.snap(params.kind);
        self.comp.snap(params.comp);
    }

    fn tail_seconds(&self) -> f64 {
        0.0
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}
