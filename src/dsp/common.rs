use std::f32::consts::TAU;

/// Convert decibels to linear amplitude.
#[inline]
pub fn db_to_lin(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Smoothing factor of a one-pole low pass with the given cutoff.
///
/// Returns `1 - exp(-2π·fc/fs)`, which stays inside (0, 1) for every
/// positive cutoff, so the filter cannot go unstable near Nyquist.
#[inline]
pub fn one_pole_alpha(cutoff_hz: f32, sample_rate: f32) -> f32 {
    1.0 - (-TAU * cutoff_hz / sample_rate).exp()
}

/// First-order approximation `2π·fc/fs` of [`one_pole_alpha`].
///
/// Only valid well below Nyquist; callers keep the cutoff low enough that
/// the result stays below 1.
#[inline]
pub fn one_pole_alpha_linear(cutoff_hz: f32, sample_rate: f32) -> f32 {
    TAU * cutoff_hz / sample_rate
}

#[inline]
pub fn zap_denormal(x: f32) -> f32 {
    if x.abs() < 1.0e-30 { 0.0 } else { x }
}

/// Safety limiter: identity up to 0.95, soft knee above.
#[inline]
pub fn soft_limit(x: f32) -> f32 {
    const THRESHOLD: f32 = 0.95;
    let ax = x.abs();
    if ax <= THRESHOLD {
        return x;
    }
    let over = ax - THRESHOLD;
    (THRESHOLD + over / over.mul_add(10.0, 1.0)).copysign(x)
}

/// One-pole low pass, `y += α·(x - y)`.
///
/// The coefficient is passed per call so that engines can cache it per
/// block instead of storing it in every filter.
#[derive(Clone, Default)]
pub struct OnePole {
    state: f32,
}

impl OnePole {
    pub const fn new() -> Self {
        Self { state: 0.0 }
    }

    #[inline]
    pub fn process(&mut self, input: f32, alpha: f32) -> f32 {
        self.state = zap_denormal(alpha.mul_add(input - self.state, self.state));
        self.state
    }

    pub const fn value(&self) -> f32 {
        self.state
    }

    pub const fn reset(&mut self) {
        self.state = 0.0;
    }
}

/// DC blocker using a first-order high-pass filter.
///
/// `y[n] = x[n] - x[n-1] + R * y[n-1]`
///
/// Reference: <https://ccrma.stanford.edu/~jos/fp/DC_Blocker.html>
#[derive(Clone)]
pub struct DcBlocker {
    x_prev: f32,
    y_prev: f32,
    coeff: f32,
}

impl DcBlocker {
    pub const fn new(coeff: f32) -> Self {
        Self {
            x_prev: 0.0,
            y_prev: 0.0,
            coeff,
        }
    }

    /// Pole placed with the linear approximation `R = 1 - 2π·fc/fs`.
    pub fn from_cutoff(cutoff_hz: f32, sample_rate: f32) -> Self {
        Self::new(1.0 - one_pole_alpha_linear(cutoff_hz, sample_rate))
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = zap_denormal(self.coeff.mul_add(self.y_prev, input - self.x_prev));
        self.x_prev = input;
        self.y_prev = output;
        output
    }

    pub const fn reset(&mut self) {
        self.x_prev = 0.0;
        self.y_prev = 0.0;
    }
}

/// One-pole envelope follower with configurable attack and release coefficients.
///
/// A coefficient `c` moves the envelope by `(1 - c)` of the distance to the
/// rectified input each sample.
#[derive(Clone)]
pub struct EnvelopeFollower {
    envelope: f32,
    attack_coeff: f32,
    release_coeff: f32,
}

impl EnvelopeFollower {
    pub const fn new(attack_coeff: f32, release_coeff: f32) -> Self {
        Self {
            envelope: 0.0,
            attack_coeff,
            release_coeff,
        }
    }

    /// Create from the fraction of the distance covered per sample.
    pub fn from_rates(attack_rate: f32, release_rate: f32) -> Self {
        Self::new(1.0 - attack_rate, 1.0 - release_rate)
    }

    pub fn set_release_rate(&mut self, rate: f32) {
        self.release_coeff = 1.0 - rate;
    }

    pub const fn value(&self) -> f32 {
        self.envelope
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let abs_input = input.abs();
        let coeff = if abs_input > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = zap_denormal(coeff.mul_add(self.envelope, (1.0 - coeff) * abs_input));
        self.envelope
    }
}
