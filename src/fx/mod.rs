pub mod compressor;
pub mod delay;
pub mod reverb;
pub mod saturation;
pub mod shapers;
pub mod shimmer;

pub use delay::DualDelay;
pub use reverb::PlateReverb;
pub use saturation::Saturation;

use crate::params::ParamSet;

// The trait every stereo effect engine implements
pub trait Effect: Send + 'static {
    type Params: ParamSet;

    // Size buffers for the sample rate and reset all state
    fn prepare(&mut self, sample_rate: f64, max_block_size: usize);

    // Process one block in place; both channels must have the same length
    fn process(&mut self, left: &mut [f32], right: &mut [f32], params: &Self::Params);

    // Jump every smoother to `params` without ramping
    fn snap_parameters(&mut self, params: &Self::Params);

    // How long the host should keep processing after the input goes silent
    fn tail_seconds(&self) -> f64;

    fn sample_rate(&self) -> f64;
}
