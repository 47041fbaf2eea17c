//! Fixed-capacity circular buffer with integer and fractional delay reads.
//!
//! Delay convention: `read(0)` returns the most recent push, `read(n)` the
//! value pushed `n` pushes before it. Buffers are sized once in `prepare`
//! and never reallocate while processing.

/// Buffer length for a tap tuned at `reference_rate`, rescaled to `sample_rate`.
pub fn scaled_capacity(base_samples: usize, sample_rate: f64, reference_rate: f64) -> usize {
    (base_samples as f64 * sample_rate / reference_rate).round() as usize
}

#[derive(Clone)]
pub struct RingBuffer<T> {
    data: Vec<T>,
    write_pos: usize,
    // Some(capacity - 1) when the capacity is a power of two
    mask: Option<usize>,
}

impl<T: Copy + Default> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let mut buffer = Self {
            data: Vec::new(),
            write_pos: 0,
            mask: None,
        };
        buffer.resize(capacity);
        buffer
    }

    /// Buffer whose index wrap is a bitmask instead of a modulo.
    pub fn with_power_of_two(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two(),
            "capacity {capacity} is not a power of two"
        );
        Self::new(capacity)
    }

    /// Resize to `capacity`, zero-fill and rewind the cursor.
    pub fn resize(&mut self, capacity: usize) {
        assert!(capacity > 0, "ring buffer capacity must be non-zero");
        self.data.clear();
        self.data.resize(capacity, T::default());
        self.mask = capacity.is_power_of_two().then(|| capacity - 1);
        self.write_pos = 0;
    }

    pub fn clear(&mut self) {
        self.data.fill(T::default());
        self.write_pos = 0;
    }

    pub const fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Slot the next push writes to.
    pub const fn write_pos(&self) -> usize {
        self.write_pos
    }

    #[inline]
    fn wrap(&self, index: usize) -> usize {
        match self.mask {
            Some(mask) => index & mask,
            None => index % self.data.len(),
        }
    }

    #[inline]
    pub fn push(&mut self, value: T) {
        self.data[self.write_pos] = value;
        self.write_pos = self.wrap(self.write_pos + 1);
    }

    /// Value pushed `delay` pushes before the most recent one.
    #[inline]
    pub fn read(&self, delay: usize) -> T {
        let len = self.data.len();
        let back = self.wrap(delay) + 1;
        self.data[self.wrap(self.write_pos + len - back)]
    }

    /// The value the next push overwrites.
    #[inline]
    pub fn oldest(&self) -> T {
        self.data[self.write_pos]
    }

    /// Value at an absolute index, wrapped into the buffer.
    #[inline]
    pub fn at(&self, index: usize) -> T {
        self.data[self.wrap(index)]
    }
}

impl RingBuffer<f32> {
    /// Linear interpolation between `read(⌊delay⌋)` and the next older sample.
    #[inline]
    pub fn read_linear(&self, delay: f32) -> f32 {
        let max_delay = self.capacity().saturating_sub(2) as f32;
        let delay = delay.clamp(0.0, max_delay);
        let idx = delay as usize;
        let frac = delay - idx as f32;

        let y1 = self.read(idx);
        let y2 = self.read(idx + 1);
        frac.mul_add(y2 - y1, y1)
    }

    /// 4-point Catmull-Rom interpolation around `delay`.
    ///
    /// Falls back to linear interpolation on buffers too short for four
    /// points. The newer neighbour of delay 0 is taken as the sample itself.
    #[inline]
    pub fn read_cubic(&self, delay: f32) -> f32 {
        if self.capacity() < 4 {
            return self.read_linear(delay);
        }

        let max_delay = (self.capacity() - 3) as f32;
        let delay = delay.clamp(0.0, max_delay);
        let idx = delay as usize;
        let frac = delay - idx as f32;

        let y0 = self.read(idx.saturating_sub(1));
        let y1 = self.read(idx);
        let y2 = self.read(idx + 1);
        let y3 = self.read(idx + 2);

        let c0 = y1;
        let c1 = 0.5 * (y2 - y0);
        let c2 = y0 - 2.5 * y1 + 2.0 * y2 - 0.5 * y3;
        let c3 = 0.5 * (y3 - y0) + 1.5 * (y1 - y2);
        ((c3 * frac + c2) * frac + c1) * frac + c0
    }

    /// Linear interpolation at an absolute fractional position.
    ///
    /// Any finite position is accepted and wrapped into `[0, capacity)`.
    #[inline]
    pub fn read_at_linear(&self, position: f32) -> f32 {
        let len = self.capacity() as f32;
        let wrapped = position.rem_euclid(len);
        let i0 = wrapped as usize;
        let frac = wrapped - i0 as f32;

        let a = self.at(i0);
        let b = self.at(i0 + 1);
        frac.mul_add(b - a, a)
    }
}
