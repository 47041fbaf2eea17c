/// Linear ramp toward a target over a fixed number of samples.
///
/// Every new target restarts the ramp from the current value, so a control
/// moved mid-ramp never jumps. A ramp of zero samples applies targets
/// immediately.
#[derive(Clone, Debug)]
pub struct LinearSmoother {
    current: f32,
    target: f32,
    step: f32,
    countdown: u32,
    steps_to_target: u32,
}

impl LinearSmoother {
    pub const fn new(value: f32) -> Self {
        Self {
            current: value,
            target: value,
            step: 0.0,
            countdown: 0,
            steps_to_target: 0,
        }
    }

    /// Set the ramp length and jump to the current target.
    pub fn reset(&mut self, sample_rate: f64, ramp_seconds: f64) {
        self.steps_to_target = (ramp_seconds * sample_rate).floor().max(0.0) as u32;
        self.snap(self.target);
    }

    /// Jump to `value` without ramping.
    pub const fn snap(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.countdown = 0;
    }

    pub fn set_target(&mut self, value: f32) {
        if value == self.target {
            return;
        }
        if self.steps_to_target == 0 {
            self.snap(value);
            return;
        }
        self.target = value;
        self.countdown = self.steps_to_target;
        self.step = (self.target - self.current) / self.countdown as f32;
    }

    /// Advance one sample and return the new value.
    #[inline]
    pub fn next_value(&mut self) -> f32 {
        if self.countdown == 0 {
            return self.target;
        }
        self.countdown -= 1;
        if self.countdown > 0 {
            self.current += self.step;
        } else {
            self.current = self.target;
        }
        self.current
    }

    pub const fn current(&self) -> f32 {
        self.current
    }

    pub const fn target(&self) -> f32 {
        self.target
    }

    pub const fn is_smoothing(&self) -> bool {
        self.countdown > 0
    }
}
