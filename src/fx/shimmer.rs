//! Octave-up shimmer for the plate reverb.
//!
//! Two read heads sweep a shared grain window half a window apart. Their
//! raised-cosine gains are complementary, so one head always covers the
//! other's wrap point and the crossfade never dips in level.

use std::f32::consts::TAU;

use crate::dsp::common::{OnePole, one_pole_alpha};
use crate::dsp::ring_buffer::RingBuffer;

const PITCH_RATIO: f32 = 2.0;
const SOURCE_CUTOFF_HZ: f32 = 6_000.0;
const POST_CUTOFF_HZ: f32 = 8_000.0;
const FEED_GAIN: f32 = 0.35;
const FEED_LIMIT: f32 = 0.8;
/// Below this the heads are idle and the feed is silent.
pub const ACTIVE_THRESHOLD: f32 = 0.001;

/// Gains of heads A and B at `phase`; they always sum to one.
#[inline]
pub fn window_gains(phase: f32) -> (f32, f32) {
    let a = 0.5 * (1.0 - (TAU * phase).cos());
    (a, 1.0 - a)
}

pub struct Shimmer {
    left: RingBuffer<f32>,
    right: RingBuffer<f32>,
    window: f32,
    phase: f32,
    source: [OnePole; 2],
    post: [OnePole; 2],
    source_alpha: f32,
    post_alpha: f32,
}

impl Shimmer {
    pub fn new(buffer_len: usize, sample_rate: f32) -> Self {
        let mut shimmer = Self {
            left: RingBuffer::with_power_of_two(buffer_len),
            right: RingBuffer::with_power_of_two(buffer_len),
            window: 0.0,
            phase: 0.0,
            source: [OnePole::new(), OnePole::new()],
            post: [OnePole::new(), OnePole::new()],
            source_alpha: 0.0,
            post_alpha: 0.0,
        };
        shimmer.prepare(buffer_len, sample_rate);
        shimmer
    }

    pub fn prepare(&mut self, buffer_len: usize, sample_rate: f32) {
        assert!(
            buffer_len >= 4 && buffer_len.is_power_of_two(),
            "shimmer buffer length {buffer_len} must be a power of two of at least 4"
        );
        if self.left.capacity() == buffer_len {
            self.left.clear();
            self.right.clear();
        } else {
            self.left.resize(buffer_len);
            self.right.resize(buffer_len);
        }
        self.window = (buffer_len * 3 / 4) as f32;
        self.phase = 0.0;
        self.source.iter_mut().for_each(OnePole::reset);
        self.post.iter_mut().for_each(OnePole::reset);
        self.source_alpha = one_pole_alpha(SOURCE_CUTOFF_HZ, sample_rate);
        self.post_alpha = one_pole_alpha(POST_CUTOFF_HZ, sample_rate);
    }

    pub const fn phase(&self) -> f32 {
        self.phase
    }

    /// Read both heads, post-filter, and advance the phase one sample.
    pub fn read(&mut self) -> (f32, f32) {
        let base = self.left.write_pos() as f32;
        let sweep = self.phase * self.window;
        let pos_a = self.window.mul_add(-1.25, base) + sweep;
        let pos_b = self.window.mul_add(-1.75, base) + sweep;
        let (win_a, win_b) = window_gains(self.phase);

        let l = win_a * self.left.read_at_linear(pos_a) + win_b * self.left.read_at_linear(pos_b);
        let r =
            win_a * self.right.read_at_linear(pos_a) + win_b * self.right.read_at_linear(pos_b);

        let l = self.post[0].process(l, self.post_alpha);
        let r = self.post[1].process(r, self.post_alpha);

        self.phase += PITCH_RATIO / self.window;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        (l, r)
    }

    /// Low-pass the wet reverb output and store it for the heads.
    pub fn write(&mut self, left: f32, right: f32) {
        let l = self.source[0].process(left, self.source_alpha);
        let r = self.source[1].process(right, self.source_alpha);
        self.left.push(l);
        self.right.push(r);
    }
}

/// Mono feed into the diffuser output for a shimmer head pair.
#[inline]
pub fn feed(left: f32, right: f32, amount: f32) -> f32 {
    ((left + right) * 0.5 * FEED_GAIN * amount).clamp(-FEED_LIMIT, FEED_LIMIT)
}
