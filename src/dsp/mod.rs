//! Building blocks shared by the effect engines.

pub mod allpass;
pub mod common;
pub mod ring_buffer;
pub mod smoother;

pub use allpass::AllpassDiffuser;
pub use ring_buffer::RingBuffer;
pub use smoother::LinearSmoother;
