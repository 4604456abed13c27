//! Offline rendering through the processing graph
//!
//! Reads a WAV file, runs it through the same chain playback uses and writes
//! 32-bit float stereo. The master gain fades in exactly as it would on play.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use lumen_audio::{AudioGraph, GainStaging, GraphConfig, GraphParam};
use lumen_core::{EqBand, EqualizerSettings, Tone};
use tracing::{debug, info};

use crate::error::{CliError, Result};

/// Rendering options beyond the equalizer settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// Master gain (0.0 to 1.0)
    pub gain: f32,
    /// Fade-in length in ms (0 = start at full gain)
    pub fade_in_ms: u64,
}

/// What a render did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderReport {
    pub frames: usize,
    pub sample_rate: u32,
    pub input_peak: f32,
    pub output_peak: f32,
    pub staging: GainStaging,
}

/// Schedule `settings` on a fresh graph so they hold from time 0
pub fn apply_settings(graph: &mut AudioGraph, settings: &EqualizerSettings) {
    for band in EqBand::ALL {
        graph
            .param_mut(GraphParam::Band(band))
            .ramp_to(settings.effective_band(band), 0.0, 0.0);
    }
    for tone in [Tone::Bass, Tone::Treble] {
        graph.ramp_tone(tone, settings.effective_tone(tone), 0.0, 0.0);
    }
    let staging = GainStaging::for_settings(settings);
    graph
        .param_mut(GraphParam::PreGain)
        .ramp_to(staging.pre_gain, 0.0, 0.0);
    graph
        .param_mut(GraphParam::BassCompensation)
        .ramp_to(staging.bass_compensation, 0.0, 0.0);
}

/// Run interleaved stereo `samples` through a graph configured with `settings`
pub fn render_buffer(
    samples: &mut [f32],
    sample_rate: u32,
    settings: &EqualizerSettings,
    config: &GraphConfig,
    options: RenderOptions,
) {
    let mut graph = AudioGraph::new(sample_rate, config);
    apply_settings(&mut graph, settings);

    let gain = options.gain.clamp(0.0, 1.0);
    let master = graph.param_mut(GraphParam::Master);
    master.set_value(0.0);
    master.ramp_to(gain, 0.0, options.fade_in_ms as f64 / 1000.0);

    graph.process(samples, 0.0);
}

/// Render `input` to `output`
pub fn render_file(
    input: &Path,
    output: &Path,
    settings: &EqualizerSettings,
    config: &GraphConfig,
    options: RenderOptions,
) -> Result<RenderReport> {
    let (mut samples, sample_rate) = read_stereo(input)?;
    let frames = samples.len() / 2;
    debug!(input = %input.display(), frames, sample_rate, "Read input");

    let input_peak = peak(&samples);
    render_buffer(&mut samples, sample_rate, settings, config, options);
    let output_peak = peak(&samples);

    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(output, spec)?;
    for sample in &samples {
        writer.write_sample(*sample)?;
    }
    writer.finalize()?;

    info!(output = %output.display(), frames, "Rendered");
    Ok(RenderReport {
        frames,
        sample_rate,
        input_peak,
        output_peak,
        staging: GainStaging::for_settings(settings),
    })
}

/// Read a WAV file as interleaved stereo f32; mono is duplicated
fn read_stereo(path: &Path) -> Result<(Vec<f32>, u32)> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_val))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    let samples: Vec<f32> = match spec.channels {
        1 => samples.iter().flat_map(|s| [*s, *s]).collect(),
        2 => samples,
        n => {
            return Err(CliError::Unsupported(format!(
                "{n} channels (only mono and stereo are rendered)"
            )))
        }
    };

    Ok((samples, spec.sample_rate))
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
}
