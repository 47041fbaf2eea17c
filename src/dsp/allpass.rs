use crate::dsp::ring_buffer::RingBuffer;

/// Schroeder allpass with the delay equal to the buffer length.
///
/// `w = x + g·d`, `y = d - g·w`, where `d` is the oldest stored sample.
/// Unity magnitude response for `|g| < 1`.
#[derive(Clone)]
pub struct AllpassDiffuser {
    line: RingBuffer<f32>,
}

impl AllpassDiffuser {
    pub fn new(delay: usize) -> Self {
        Self {
            line: RingBuffer::new(delay),
        }
    }

    /// Change the delay length; clears the stored signal.
    pub fn resize(&mut self, delay: usize) {
        self.line.resize(delay);
    }

    pub const fn delay(&self) -> usize {
        self.line.capacity()
    }

    #[inline]
    pub fn process(&mut self, input: f32, gain: f32) -> f32 {
        let delayed = self.line.oldest();
        let written = gain.mul_add(delayed, input);
        self.line.push(written);
        gain.mul_add(-written, delayed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // xorshift32, mapped to [-1, 1)
    fn noise(state: &mut u32) -> f32 {
        *state ^= *state << 13;
        *state ^= *state >> 17;
        *state ^= *state << 5;
        (*state as f32 / u32::MAX as f32).mul_add(2.0, -1.0)
    }

    #[test]
    fn impulse_appears_after_delay() {
        let mut ap = AllpassDiffuser::new(5);
        let gain = 0.5;
        let first = ap.process(1.0, gain);
        assert!((first + gain).abs() < 1e-6, "direct path is -g");

        let mut out = Vec::new();
        for _ in 0..10 {
            out.push(ap.process(0.0, gain));
        }
        // Nothing until the buffer wraps, then (1 - g²) arrives.
        assert!(out[..4].iter().all(|&s| s == 0.0));
        assert!((out[4] - (1.0 - gain * gain)).abs() < 1e-6);
    }

    #[test]
    fn impulse_response_energy_is_unity() {
        let mut ap = AllpassDiffuser::new(37);
        let mut energy = 0.0f64;
        energy += f64::from(ap.process(1.0, 0.7)).powi(2);
        for _ in 0..50_000 {
            energy += f64::from(ap.process(0.0, 0.7)).powi(2);
        }
        assert!((energy - 1.0).abs() < 1e-3, "energy {energy}");
    }

    #[test]
    fn stays_bounded_on_white_noise() {
        let mut seed = 0x1234_5678;
        for &gain in &[0.625, 0.75, 0.95, -0.9] {
            let mut ap = AllpassDiffuser::new(142);
            let mut peak = 0.0f32;
            for _ in 0..1_000_000 {
                let out = ap.process(noise(&mut seed), gain);
                assert!(out.is_finite());
                peak = peak.max(out.abs());
            }
            // |y| <= |x|·(1 + |g|) / (1 - |g|) is a loose bound for a unit input.
            let bound = (1.0 + gain.abs()) / (1.0 - gain.abs());
            assert!(peak <= bound, "gain {gain}: peak {peak} > {bound}");
        }
    }
}
