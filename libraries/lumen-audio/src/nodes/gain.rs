/// Automated linear gain stage
use super::{AudioNode, RenderContext};
use crate::param::AudioParam;

/// Linear gain with sample-accurate automation
///
/// While the parameter is automating inside the quantum the gain is evaluated
/// per frame; otherwise one value is applied to the whole quantum.
#[derive(Debug, Clone)]
pub struct GainNode {
    name: &'static str,
    gain: AudioParam,
}

impl GainNode {
    /// Create a gain stage with a starting value and accepted maximum
    pub fn new(name: &'static str, initial: f32, max: f32) -> Self {
        Self {
            name,
            gain: AudioParam::new(name, initial, 0.0, max),
        }
    }

    pub fn gain(&self) -> &AudioParam {
        &self.gain
    }

    pub fn gain_mut(&mut self) -> &mut AudioParam {
        &mut self.gain
    }
}

impl AudioNode for GainNode {
    fn process(&mut self, buffer: &mut [f32], ctx: &RenderContext) {
        self.gain.prune(ctx.time);

        if self.gain.is_automating(ctx.time) {
            for (i, frame) in buffer.chunks_exact_mut(2).enumerate() {
                let g = self.gain.value_at(ctx.frame_time(i));
                frame[0] *= g;
                frame[1] *= g;
            }
        } else {
            let g = self.gain.value_at(ctx.time);
            if g != 1.0 {
                for sample in buffer.iter_mut() {
                    *sample *= g;
                }
            }
        }
    }

    fn reset(&mut self) {}

    fn name(&self) -> &str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 48000;

    #[test]
    fn constant_gain_scales_every_sample() {
        let mut node = GainNode::new("pre_gain", 0.5, 1.0);
        let mut buffer = vec![1.0f32; 64];
        node.process(&mut buffer, &RenderContext { sample_rate: SR, time: 0.0 });
        assert!(buffer.iter().all(|s| *s == 0.5));
    }

    #[test]
    fn ramp_is_applied_per_frame() {
        let mut node = GainNode::new("master", 0.0, 1.0);
        let window = 128.0 / f64::from(SR);
        node.gain_mut().ramp_to(1.0, 0.0, window);

        let mut buffer = vec![1.0f32; 256];
        node.process(&mut buffer, &RenderContext { sample_rate: SR, time: 0.0 });

        // Strictly increasing across the quantum: no step
        assert_eq!(buffer[0], 0.0);
        for pair in buffer.chunks_exact(2).collect::<Vec<_>>().windows(2) {
            assert!(pair[1][0] > pair[0][0]);
        }
        assert!(buffer[254] > 0.99);
    }

    #[test]
    fn zero_gain_silences() {
        let mut node = GainNode::new("master", 0.0, 1.0);
        let mut buffer = vec![0.8f32; 32];
        node.process(&mut buffer, &RenderContext { sample_rate: SR, time: 3.0 });
        assert!(buffer.iter().all(|s| *s == 0.0));
    }
}
