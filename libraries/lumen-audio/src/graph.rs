//! The processing chain
//!
//! Fixed order:
//!
//! ```text
//! high-pass -> pre-gain -> bass shelf -> bass punch -> treble shelf
//!   -> treble sparkle -> 10 bands -> bass compensation -> compressor
//!   -> limiter -> master
//! ```
//!
//! The graph itself is plain data plus DSP; it knows nothing about devices or
//! settings. `AudioGraphManager` decides what to ramp and when.

use lumen_core::{EqBand, Tone, BAND_COUNT};

use crate::config::GraphConfig;
use crate::gain_staging::{GainStaging, BASE_PRE_GAIN, MAX_BASS_COMPENSATION, MAX_PRE_GAIN};
use crate::nodes::{AudioNode, BiquadNode, DynamicsNode, GainNode, RenderContext};
use crate::param::AudioParam;

/// Bass tone shelf corner (Hz)
pub const BASS_SHELF_HZ: f32 = 120.0;

/// Bass punch peak centre (Hz)
pub const BASS_PUNCH_HZ: f32 = 90.0;

/// Treble tone shelf corner (Hz)
pub const TREBLE_SHELF_HZ: f32 = 6000.0;

/// Treble sparkle peak centre (Hz)
pub const TREBLE_SPARKLE_HZ: f32 = 10000.0;

/// Punch gain as a share of the bass tone gain
pub const PUNCH_RATIO: f32 = 0.6;

/// Sparkle gain as a share of the treble tone gain
pub const SPARKLE_RATIO: f32 = 0.45;

/// Q of the eight middle bands
const BAND_Q: f32 = 1.0;

/// Q of the tone companion peaks
const COMPANION_Q: f32 = 0.9;

/// Parameters the manager can ramp directly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphParam {
    PreGain,
    BassCompensation,
    Master,
    Band(EqBand),
}

/// Parameter values across the chain at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphSnapshot {
    pub pre_gain: f32,
    pub bass_compensation: f32,
    pub master: f32,
    pub bands: [f32; BAND_COUNT],
    pub bass_tone: f32,
    pub bass_punch: f32,
    pub treble_tone: f32,
    pub treble_sparkle: f32,
}

impl GraphSnapshot {
    /// Staging factors in this snapshot
    pub fn staging(&self) -> GainStaging {
        GainStaging {
            pre_gain: self.pre_gain,
            bass_compensation: self.bass_compensation,
        }
    }
}

/// One output's processing chain
pub struct AudioGraph {
    sample_rate: u32,
    render_quantum: usize,

    highpass: BiquadNode,
    pre_gain: GainNode,
    bass_tone: BiquadNode,
    bass_punch: BiquadNode,
    treble_tone: BiquadNode,
    treble_sparkle: BiquadNode,
    bands: [BiquadNode; BAND_COUNT],
    bass_compensation: GainNode,
    compressor: DynamicsNode,
    limiter: DynamicsNode,
    master: GainNode,
}

impl AudioGraph {
    /// Build the chain with every control flat and master gain at 0
    ///
    /// Master starts silent; the first fade-in brings it up.
    pub fn new(sample_rate: u32, config: &GraphConfig) -> Self {
        let config = config.clone().validated();
        let bands = EqBand::ALL.map(|band| {
            let freq = band.frequency();
            match band {
                EqBand::SubBass => BiquadNode::low_shelf(band.name(), freq),
                EqBand::Air => BiquadNode::high_shelf(band.name(), freq),
                _ => BiquadNode::peaking(band.name(), freq, BAND_Q),
            }
        });

        Self {
            sample_rate,
            render_quantum: config.render_quantum,
            highpass: BiquadNode::highpass("highpass", config.highpass_hz),
            pre_gain: GainNode::new("pre_gain", BASE_PRE_GAIN, MAX_PRE_GAIN),
            bass_tone: BiquadNode::low_shelf("bass_tone", BASS_SHELF_HZ),
            bass_punch: BiquadNode::peaking("bass_punch", BASS_PUNCH_HZ, COMPANION_Q),
            treble_tone: BiquadNode::high_shelf("treble_tone", TREBLE_SHELF_HZ),
            treble_sparkle: BiquadNode::peaking("treble_sparkle", TREBLE_SPARKLE_HZ, COMPANION_Q),
            bands,
            bass_compensation: GainNode::new("bass_compensation", 1.0, MAX_BASS_COMPENSATION),
            compressor: DynamicsNode::new("compressor", config.compressor),
            limiter: DynamicsNode::new("limiter", config.limiter),
            master: GainNode::new("master", 0.0, 1.0),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of stages in the chain
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.visit(|_| count += 1);
        count
    }

    /// Stage names in processing order
    pub fn stage_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(20);
        self.visit(|node| names.push(node.name().to_string()));
        names
    }

    /// A directly rampable parameter
    pub fn param(&self, param: GraphParam) -> &AudioParam {
        match param {
            GraphParam::PreGain => self.pre_gain.gain(),
            GraphParam::BassCompensation => self.bass_compensation.gain(),
            GraphParam::Master => self.master.gain(),
            GraphParam::Band(band) => self.bands[band.index()].gain(),
        }
    }

    /// A directly rampable parameter, for scheduling
    pub fn param_mut(&mut self, param: GraphParam) -> &mut AudioParam {
        match param {
            GraphParam::PreGain => self.pre_gain.gain_mut(),
            GraphParam::BassCompensation => self.bass_compensation.gain_mut(),
            GraphParam::Master => self.master.gain_mut(),
            GraphParam::Band(band) => self.bands[band.index()].gain_mut(),
        }
    }

    /// Ramp a tone control: the shelf to `gain_db`, its companion peak to its share
    pub fn ramp_tone(&mut self, tone: Tone, gain_db: f32, now: f64, window: f64) {
        let (shelf, companion, ratio) = match tone {
            Tone::Bass => (&mut self.bass_tone, &mut self.bass_punch, PUNCH_RATIO),
            Tone::Treble => (&mut self.treble_tone, &mut self.treble_sparkle, SPARKLE_RATIO),
        };
        shelf.gain_mut().ramp_to(gain_db, now, window);
        companion.gain_mut().ramp_to(gain_db * ratio, now, window);
    }

    /// Parameter values at `time`
    pub fn snapshot_at(&self, time: f64) -> GraphSnapshot {
        self.snapshot_with(|param| param.value_at(time))
    }

    /// Parameter values once every scheduled ramp has finished
    pub fn targets(&self) -> GraphSnapshot {
        self.snapshot_with(AudioParam::target)
    }

    /// Latest automation end across every parameter
    pub fn automation_end(&self) -> Option<f64> {
        let mut end: Option<f64> = None;
        self.visit_params(|param| {
            if let Some(t) = param.automation_end() {
                end = Some(end.map_or(t, |e| e.max(t)));
            }
        });
        end
    }

    /// Run interleaved stereo samples through the chain
    ///
    /// `start_time` is the context time of the first frame. Automation is
    /// evaluated at the start of each render quantum (gain stages evaluate
    /// per frame while ramping).
    pub fn process(&mut self, buffer: &mut [f32], start_time: f64) {
        let quantum = self.render_quantum.max(1) * 2;
        let sample_rate = self.sample_rate;
        let mut time = start_time;

        for chunk in buffer.chunks_mut(quantum) {
            let ctx = RenderContext { sample_rate, time };
            self.visit_mut(|node| node.process(&mut *chunk, &ctx));
            time += (chunk.len() / 2) as f64 / f64::from(sample_rate.max(1));
        }
    }

    /// Clear all filter and detector state
    pub fn reset(&mut self) {
        self.visit_mut(|node| node.reset());
    }

    fn snapshot_with(&self, read: impl Fn(&AudioParam) -> f32) -> GraphSnapshot {
        GraphSnapshot {
            pre_gain: read(self.pre_gain.gain()),
            bass_compensation: read(self.bass_compensation.gain()),
            master: read(self.master.gain()),
            bands: std::array::from_fn(|i| read(self.bands[i].gain())),
            bass_tone: read(self.bass_tone.gain()),
            bass_punch: read(self.bass_punch.gain()),
            treble_tone: read(self.treble_tone.gain()),
            treble_sparkle: read(self.treble_sparkle.gain()),
        }
    }

    fn visit_params(&self, mut f: impl FnMut(&AudioParam)) {
        f(self.pre_gain.gain());
        f(self.bass_tone.gain());
        f(self.bass_punch.gain());
        f(self.treble_tone.gain());
        f(self.treble_sparkle.gain());
        for band in &self.bands {
            f(band.gain());
        }
        f(self.bass_compensation.gain());
        f(self.master.gain());
    }

    fn visit(&self, mut f: impl FnMut(&dyn AudioNode)) {
        f(&self.highpass);
        f(&self.pre_gain);
        f(&self.bass_tone);
        f(&self.bass_punch);
        f(&self.treble_tone);
        f(&self.treble_sparkle);
        for band in &self.bands {
            f(band);
        }
        f(&self.bass_compensation);
        f(&self.compressor);
        f(&self.limiter);
        f(&self.master);
    }

    fn visit_mut(&mut self, mut f: impl FnMut(&mut dyn AudioNode)) {
        f(&mut self.highpass);
        f(&mut self.pre_gain);
        f(&mut self.bass_tone);
        f(&mut self.bass_punch);
        f(&mut self.treble_tone);
        f(&mut self.treble_sparkle);
        for band in &mut self.bands {
            f(band);
        }
        f(&mut self.bass_compensation);
        f(&mut self.compressor);
        f(&mut self.limiter);
        f(&mut self.master);
    }
}
