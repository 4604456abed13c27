/// Biquad filter stage
///
/// One second-order section per stage, RBJ cookbook coefficients. The gain
/// is an automated parameter in dB; coefficients are recomputed at the start
/// of every quantum whose gain differs from the last one computed, so a ramp
/// sweeps the response smoothly instead of stepping it.
use super::{AudioNode, RenderContext};
use crate::param::AudioParam;

/// Widest gain any filter stage accepts (dB)
pub const FILTER_GAIN_RANGE_DB: f32 = 24.0;

/// Filter response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Second-order high-pass (gain ignored)
    Highpass,
    /// Boosts/cuts below the corner
    LowShelf,
    /// Boosts/cuts above the corner
    HighShelf,
    /// Boosts/cuts around the centre
    Peaking,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Coefficients {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl Coefficients {
    const IDENTITY: Coefficients = Coefficients {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    fn design(kind: FilterKind, sample_rate: f32, frequency: f32, q: f32, gain_db: f32) -> Self {
        if sample_rate < 1.0 {
            return Self::IDENTITY;
        }

        // Keep the corner well clear of Nyquist
        let freq = frequency.clamp(1.0, sample_rate * 0.45);
        let omega = 2.0 * std::f32::consts::PI * freq / sample_rate;
        let (sin_w, cos_w) = omega.sin_cos();
        let a = 10.0_f32.powf(gain_db / 40.0);

        let (b0, b1, b2, a0, a1, a2) = match kind {
            FilterKind::Highpass => {
                let alpha = sin_w / (2.0 * q);
                (
                    (1.0 + cos_w) / 2.0,
                    -(1.0 + cos_w),
                    (1.0 + cos_w) / 2.0,
                    1.0 + alpha,
                    -2.0 * cos_w,
                    1.0 - alpha,
                )
            }
            FilterKind::Peaking => {
                let alpha = sin_w / (2.0 * q);
                (
                    1.0 + alpha * a,
                    -2.0 * cos_w,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_w,
                    1.0 - alpha / a,
                )
            }
            FilterKind::LowShelf => {
                let alpha = sin_w / 2.0 * ((a + 1.0 / a) * (1.0 / q - 1.0) + 2.0).sqrt();
                let beta = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_w + beta),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w),
                    a * ((a + 1.0) - (a - 1.0) * cos_w - beta),
                    (a + 1.0) + (a - 1.0) * cos_w + beta,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w),
                    (a + 1.0) + (a - 1.0) * cos_w - beta,
                )
            }
            FilterKind::HighShelf => {
                let alpha = sin_w / 2.0 * ((a + 1.0 / a) * (1.0 / q - 1.0) + 2.0).sqrt();
                let beta = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_w + beta),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w),
                    a * ((a + 1.0) + (a - 1.0) * cos_w - beta),
                    (a + 1.0) - (a - 1.0) * cos_w + beta,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w),
                    (a + 1.0) - (a - 1.0) * cos_w - beta,
                )
            }
        };

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// Direct form I history for one channel
#[derive(Debug, Clone, Copy, Default)]
struct History {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl History {
    #[inline]
    fn tick(&mut self, c: &Coefficients, input: f32) -> f32 {
        let mut out = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

        // Flush denormals
        if out.abs() < 1e-15 {
            out = 0.0;
        }

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = out;
        out
    }
}

/// Automated biquad stage
#[derive(Debug, Clone)]
pub struct BiquadNode {
    name: &'static str,
    kind: FilterKind,
    frequency: f32,
    q: f32,
    gain: AudioParam,

    coefficients: Coefficients,
    /// (sample rate, gain) the coefficients were designed for
    designed_for: Option<(u32, f32)>,

    left: History,
    right: History,
}

impl BiquadNode {
    /// Create a stage with a fixed corner/centre and Q, gain starting at 0 dB
    pub fn new(name: &'static str, kind: FilterKind, frequency: f32, q: f32) -> Self {
        Self {
            name,
            kind,
            frequency,
            q: q.clamp(0.1, 10.0),
            gain: AudioParam::new(name, 0.0, -FILTER_GAIN_RANGE_DB, FILTER_GAIN_RANGE_DB),
            coefficients: Coefficients::IDENTITY,
            designed_for: None,
            left: History::default(),
            right: History::default(),
        }
    }

    /// Second-order high-pass at `frequency` (Butterworth Q)
    pub fn highpass(name: &'static str, frequency: f32) -> Self {
        Self::new(name, FilterKind::Highpass, frequency, std::f32::consts::FRAC_1_SQRT_2)
    }

    /// Low shelf with a gentle slope
    pub fn low_shelf(name: &'static str, frequency: f32) -> Self {
        Self::new(name, FilterKind::LowShelf, frequency, std::f32::consts::FRAC_1_SQRT_2)
    }

    /// High shelf with a gentle slope
    pub fn high_shelf(name: &'static str, frequency: f32) -> Self {
        Self::new(name, FilterKind::HighShelf, frequency, std::f32::consts::FRAC_1_SQRT_2)
    }

    /// Peaking stage
    pub fn peaking(name: &'static str, frequency: f32, q: f32) -> Self {
        Self::new(name, FilterKind::Peaking, frequency, q)
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn q(&self) -> f32 {
        self.q
    }

    /// Gain automation (dB)
    pub fn gain(&self) -> &AudioParam {
        &self.gain
    }

    /// Gain automation (dB), for scheduling
    pub fn gain_mut(&mut self) -> &mut AudioParam {
        &mut self.gain
    }

    fn update_coefficients(&mut self, sample_rate: u32, gain_db: f32) {
        if self.designed_for == Some((sample_rate, gain_db)) {
            return;
        }
        self.coefficients = Coefficients::design(
            self.kind,
            sample_rate as f32,
            self.frequency,
            self.q,
            gain_db,
        );
        self.designed_for = Some((sample_rate, gain_db));
    }
}

impl AudioNode for BiquadNode {
    fn process(&mut self, buffer: &mut [f32], ctx: &RenderContext) {
        self.gain.prune(ctx.time);
        let gain_db = match self.kind {
            FilterKind::Highpass => 0.0,
            _ => self.gain.value_at(ctx.time),
        };
        self.update_coefficients(ctx.sample_rate, gain_db);

        let c = self.coefficients;
        for frame in buffer.chunks_exact_mut(2) {
            frame[0] = self.left.tick(&c, frame[0]);
            frame[1] = self.right.tick(&c, frame[1]);
        }
    }

    fn reset(&mut self) {
        self.left = History::default();
        self.right = History::default();
    }

    fn name(&self) -> &str {
        self.name
    }
}
