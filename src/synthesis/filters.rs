//! Small fixed-topology filter stages of the tube model
//!
//! Each stage keeps one or two samples of state and is advanced one sample at
//! a time with `process`. `reset` clears the state and keeps the coefficients.

use std::f32::consts::PI;

/// First-order high-pass at an open end of the tube
#[derive(Debug, Clone, Default)]
pub struct RadiationFilter {
    a20: f32,
    a21: f32,
    b21: f32,
    x: f32,
    y: f32,
}

impl RadiationFilter {
    /// Creates the filter for an aperture coefficient `(nyquist - cutoff) / nyquist`
    pub fn new(aperture_coef: f32) -> Self {
        Self {
            a20: aperture_coef,
            a21: -aperture_coef,
            b21: -aperture_coef,
            x: 0.0,
            y: 0.0,
        }
    }

    /// Filters one sample
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.a20 * input + self.a21 * self.x - self.b21 * self.y;
        self.x = input;
        self.y = output;
        output
    }

    /// Clears the filter state
    pub fn reset(&mut self) {
        self.x = 0.0;
        self.y = 0.0;
    }
}

/// First-order low-pass applied to the wave reflected at an open end
#[derive(Debug, Clone, Default)]
pub struct ReflectionFilter {
    a10: f32,
    b11: f32,
    y: f32,
}

impl ReflectionFilter {
    /// Creates the filter for the same aperture coefficient as the paired [`RadiationFilter`]
    pub fn new(aperture_coef: f32) -> Self {
        Self {
            a10: 1.0 - aperture_coef.abs(),
            b11: -aperture_coef,
            y: 0.0,
        }
    }

    /// Filters one sample
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.a10 * input - self.b11 * self.y;
        self.y = output;
        output
    }

    /// Clears the filter state
    pub fn reset(&mut self) {
        self.y = 0.0;
    }
}

/// Low-pass path carrying the glottal pulse through the throat wall
#[derive(Debug, Clone, Default)]
pub struct Throat {
    ta0: f32,
    tb1: f32,
    gain: f32,
    y: f32,
}

impl Throat {
    /// Creates the throat filter
    ///
    /// # Arguments
    ///
    /// * `sample_rate` - Internal tube sample rate in Hz
    /// * `cutoff` - Cutoff frequency in Hz
    /// * `gain` - Linear output gain
    pub fn new(sample_rate: f32, cutoff: f32, gain: f32) -> Self {
        let ta0 = if sample_rate > 0.0 {
            2.0 * cutoff / sample_rate
        } else {
            0.0
        };
        Self {
            ta0,
            tb1: 1.0 - ta0,
            gain,
            y: 0.0,
        }
    }

    /// Filters one sample
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.ta0 * input + self.tb1 * self.y;
        self.y = output;
        output * self.gain
    }

    /// Clears the filter state
    pub fn reset(&mut self) {
        self.y = 0.0;
    }
}

/// Two-pole band-pass shaping the frication noise
///
/// Coefficients follow the frication centre frequency and bandwidth and are
/// refreshed every sample with [`BandpassFilter::update`].
#[derive(Debug, Clone, Default)]
pub struct BandpassFilter {
    alpha: f32,
    beta: f32,
    gamma: f32,
    xn1: f32,
    xn2: f32,
    yn1: f32,
    yn2: f32,
}

impl BandpassFilter {
    /// Creates a filter with zero coefficients
    pub fn new() -> Self {
        Self::default()
    }

    /// Recomputes the coefficients
    pub fn update(&mut self, sample_rate: f32, bandwidth: f32, center_freq: f32) {
        let tan_value = (PI * bandwidth / sample_rate).tan();
        let cos_value = (2.0 * PI * center_freq / sample_rate).cos();
        self.beta = (1.0 - tan_value) / (2.0 * (1.0 + tan_value));
        self.gamma = (0.5 + self.beta) * cos_value;
        self.alpha = (0.5 - self.beta) / 2.0;
    }

    /// Filters one sample
    pub fn process(&mut self, input: f32) -> f32 {
        let output =
            2.0 * (self.alpha * (input - self.xn2) + self.gamma * self.yn1 - self.beta * self.yn2);
        self.xn2 = self.xn1;
        self.xn1 = input;
        self.yn2 = self.yn1;
        self.yn1 = output;
        output
    }

    /// Clears the filter state
    pub fn reset(&mut self) {
        self.xn1 = 0.0;
        self.xn2 = 0.0;
        self.yn1 = 0.0;
        self.yn2 = 0.0;
    }
}

/// Two-tap averaging low-pass for the noise source
#[derive(Debug, Clone, Default)]
pub struct NoiseFilter {
    x: f32,
}

impl NoiseFilter {
    /// Creates the filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters one sample
    pub fn process(&mut self, input: f32) -> f32 {
        let output = input + self.x;
        self.x = input;
        output
    }

    /// Clears the filter state
    pub fn reset(&mut self) {
        self.x = 0.0;
    }
}

const NOISE_FACTOR: f64 = 377.0;
const NOISE_INITIAL_SEED: f64 = 0.789_234_7;

/// Deterministic white noise in [-0.5, 0.5)
#[derive(Debug, Clone)]
pub struct NoiseSource {
    seed: f64,
}

impl Default for NoiseSource {
    fn default() -> Self {
        Self {
            seed: NOISE_INITIAL_SEED,
        }
    }
}

impl NoiseSource {
    /// Creates the generator at its initial seed
    pub fn new() -> Self {
        Self::default()
    }

    /// Next noise sample
    pub fn next_sample(&mut self) -> f32 {
        let product = self.seed * NOISE_FACTOR;
        self.seed = product - product.trunc();
        (self.seed - 0.5) as f32
    }

    /// Restarts the sequence
    pub fn reset(&mut self) {
        self.seed = NOISE_INITIAL_SEED;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radiation_blocks_dc() {
        let mut f = RadiationFilter::new(0.5);
        let mut last = 0.0;
        for _ in 0..200 {
            last = f.process(1.0);
        }
        assert!(last.abs() < 1e-3, "DC should decay, got {}", last);
    }

    #[test]
    fn test_reflection_passes_dc() {
        let coef = 0.5;
        let mut f = ReflectionFilter::new(coef);
        let mut last = 0.0;
        for _ in 0..200 {
            last = f.process(1.0);
        }
        // DC gain is (1 - |c|) / (1 - c)
        assert!((last - 1.0).abs() < 1e-3, "got {}", last);
    }

    #[test]
    fn test_throat_gain() {
        let mut f = Throat::new(20000.0, 1500.0, 2.0);
        let mut last = 0.0;
        for _ in 0..500 {
            last = f.process(1.0);
        }
        assert!((last - 2.0).abs() < 1e-3, "got {}", last);
    }

    #[test]
    fn test_bandpass_rejects_dc() {
        let mut f = BandpassFilter::new();
        f.update(22050.0, 2000.0, 2500.0);
        let mut last = 1.0;
        for _ in 0..2000 {
            last = f.process(1.0);
        }
        assert!(last.abs() < 1e-3, "got {}", last);
    }

    #[test]
    fn test_noise_is_deterministic_and_bounded() {
        let mut a = NoiseSource::new();
        let mut b = NoiseSource::new();
        let first: Vec<f32> = (0..1000).map(|_| a.next_sample()).collect();
        for &s in &first {
            assert_eq!(s, b.next_sample());
            assert!((-0.5..0.5).contains(&s));
        }
        a.reset();
        assert_eq!(a.next_sample(), first[0]);
        let mean = first.iter().sum::<f32>() / first.len() as f32;
        assert!(mean.abs() < 0.05, "noise mean {}", mean);
    }

    #[test]
    fn test_noise_filter_sums_pairs() {
        let mut f = NoiseFilter::new();
        assert_eq!(f.process(1.0), 1.0);
        assert_eq!(f.process(2.0), 3.0);
        f.reset();
        assert_eq!(f.process(0.5), 0.5);
    }
}
