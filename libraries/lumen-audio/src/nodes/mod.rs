///! Processing stages
///!
///! Every stage in the graph implements `AudioNode`. All stages operate on
///! interleaved stereo f32 samples and are driven one render quantum at a time.
///!
///! Available stages:
///! - **BiquadNode**: high-pass, low/high shelf and peaking filters
///! - **GainNode**: automated linear gain
///! - **DynamicsNode**: compressor and safety limiter

mod biquad;
mod dynamics;
mod gain;

pub use biquad::{BiquadNode, FilterKind};
pub use dynamics::DynamicsNode;
pub use gain::GainNode;

/// Timing of the quantum being rendered
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderContext {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Context time of the first frame in the quantum (seconds)
    pub time: f64,
}

impl RenderContext {
    /// Context time of a frame within the quantum
    #[inline]
    pub fn frame_time(&self, frame: usize) -> f64 {
        self.time + frame as f64 / f64::from(self.sample_rate.max(1))
    }
}

/// A stage in the processing graph
///
/// # Real-Time Constraints
/// - No allocations in `process()`
/// - No blocking operations
pub trait AudioNode: Send {
    /// Process one quantum of interleaved stereo samples in place
    fn process(&mut self, buffer: &mut [f32], ctx: &RenderContext);

    /// Clear filter/detector state (seek, track change)
    fn reset(&mut self);

    /// Stage name (for debugging and graph inspection)
    fn name(&self) -> &str;
}
