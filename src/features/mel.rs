//! Mel filter-bank over power spectrum bins
//!
//! `n_filters + 2` points are laid out evenly on the mel scale between the
//! configured Hz bounds and mapped to FFT bins. Filter `i` is a triangle
//! rising from 0 at point `i` to 1 at point `i + 1` and falling back to 0 at
//! point `i + 2`.
//!
//! # Example
//!
//! ```no_run
//! use vocalis_dsp::config::MelConfig;
//! use vocalis_dsp::features::mel::MelFilterBank;
//!
//! let bank = MelFilterBank::new(&MelConfig::default(), 201, 16000)?;
//! let power = vec![0.0f32; 201];
//! let mut mel = vec![0.0f32; bank.n_filters()];
//! bank.apply(&power, &mut mel)?;
//! # Ok::<(), vocalis_dsp::DspError>(())
//! ```

use crate::config::MelConfig;
use crate::error::DspError;

/// Converts frequency in Hz to mels
pub fn freq_to_mel(freq: f32) -> f32 {
    1127.0 * (1.0 + freq / 700.0).ln()
}

/// Converts mels to frequency in Hz
pub fn mel_to_freq(mel: f32) -> f32 {
    700.0 * ((mel / 1127.0).exp() - 1.0)
}

/// FFT bin holding `freq`, given the number of bins in use
pub fn freq_to_bin(freq: f32, n_fft: f32, sample_rate: f32) -> usize {
    (((n_fft + 1.0) * freq) / sample_rate).floor().max(0.0) as usize
}

/// One triangular filter
#[derive(Debug, Clone, PartialEq)]
pub struct MelFilter {
    /// Bin where the weight is 0 on the rising side
    pub min_bin: usize,
    /// Bin where the weight is 1
    pub peak_bin: usize,
    /// Bin where the weight is 0 on the falling side
    pub max_bin: usize,
    /// Weights for bins `min_bin..=max_bin`
    pub weights: Vec<f32>,
}

/// Immutable set of triangular mel filters
#[derive(Debug, Clone)]
pub struct MelFilterBank {
    config: MelConfig,
    dft_use: usize,
    points_mel: Vec<f32>,
    points_hz: Vec<f32>,
    points_bin: Vec<usize>,
    filters: Vec<MelFilter>,
}

impl MelFilterBank {
    /// Builds the filters
    ///
    /// # Arguments
    ///
    /// * `config` - Filter count, Hz bounds and log/renormalization settings
    /// * `dft_use` - Number of power spectrum bins (window / 2 + 1)
    /// * `sample_rate` - Sample rate in Hz
    ///
    /// # Errors
    ///
    /// Returns `DspError::Configuration` when a filter has a zero-width side
    /// (two adjacent scale points fall in the same bin) or reaches past the
    /// last spectrum bin.
    pub fn new(config: &MelConfig, dft_use: usize, sample_rate: u32) -> Result<Self, DspError> {
        let n = config.n_filters;
        if n == 0 || dft_use == 0 || sample_rate == 0 {
            return Err(DspError::Configuration(format!(
                "Mel filter-bank needs filters, bins and a sample rate (filters={}, bins={}, rate={})",
                n, dft_use, sample_rate
            )));
        }
        let lo_mel = freq_to_mel(config.lo_hz);
        let hi_mel = freq_to_mel(config.hi_hz);
        let incr = (hi_mel - lo_mel) / (n + 1) as f32;

        let n_eff = n + 2;
        let mut points_mel = Vec::with_capacity(n_eff);
        let mut points_hz = Vec::with_capacity(n_eff);
        let mut points_bin = Vec::with_capacity(n_eff);
        for idx in 0..n_eff {
            let mel = lo_mel + idx as f32 * incr;
            let hz = mel_to_freq(mel);
            points_mel.push(mel);
            points_hz.push(hz);
            points_bin.push(freq_to_bin(hz, dft_use as f32, sample_rate as f32));
        }

        let last = points_bin[n_eff - 1];
        if last > dft_use {
            return Err(DspError::Configuration(format!(
                "Mel filter-bank reaches bin {} but only {} bins exist (hi_hz={}, rate={})",
                last, dft_use, config.hi_hz, sample_rate
            )));
        }

        let mut filters = Vec::with_capacity(n);
        for f in 0..n {
            let min_bin = points_bin[f];
            let peak_bin = points_bin[f + 1];
            let max_bin = points_bin[f + 2];
            if peak_bin <= min_bin || max_bin <= peak_bin {
                return Err(DspError::Configuration(format!(
                    "Degenerate mel filter {}: bins {}/{}/{} (use fewer filters, a larger window or a wider Hz range)",
                    f, min_bin, peak_bin, max_bin
                )));
            }
            let rise = (peak_bin - min_bin) as f32;
            let fall = (max_bin - peak_bin) as f32;
            let weights = (min_bin..=max_bin)
                .map(|bin| {
                    if bin <= peak_bin {
                        (bin - min_bin) as f32 / rise
                    } else {
                        (max_bin - bin) as f32 / fall
                    }
                })
                .collect();
            filters.push(MelFilter {
                min_bin,
                peak_bin,
                max_bin,
                weights,
            });
        }

        log::debug!(
            "Mel filter-bank: {} filters over bins {}..{} ({:.1}-{:.1} Hz)",
            n,
            points_bin[0],
            last,
            config.lo_hz,
            config.hi_hz
        );

        Ok(Self {
            config: config.clone(),
            dft_use,
            points_mel,
            points_hz,
            points_bin,
            filters,
        })
    }

    /// Number of filters
    pub fn n_filters(&self) -> usize {
        self.filters.len()
    }

    /// Number of spectrum bins the filters were built for
    pub fn dft_use(&self) -> usize {
        self.dft_use
    }

    /// The filters, in increasing frequency
    pub fn filters(&self) -> &[MelFilter] {
        &self.filters
    }

    /// Scale points in mels, Hz and bins (`n_filters + 2` each)
    pub fn points(&self) -> (&[f32], &[f32], &[usize]) {
        (&self.points_mel, &self.points_hz, &self.points_bin)
    }

    /// Projects a power spectrum onto the filters
    ///
    /// Each filter sum gets `log_off` added and its natural log taken; an
    /// exactly zero sum yields `log_min` instead. With renormalization on, the
    /// log value is mapped through `(x - min) / (max - min)` and clamped to [0, 1].
    ///
    /// # Errors
    ///
    /// Returns `DspError::InvalidInput` on slice length mismatch.
    pub fn apply(&self, power: &[f32], out: &mut [f32]) -> Result<(), DspError> {
        if power.len() != self.dft_use || out.len() != self.filters.len() {
            return Err(DspError::InvalidInput(format!(
                "Mel filter-bank expects {} bins and {} outputs, got {} and {}",
                self.dft_use,
                self.filters.len(),
                power.len(),
                out.len()
            )));
        }
        let renorm = &self.config.renorm;
        let scale = renorm.scale();
        for (filter, o) in self.filters.iter().zip(out.iter_mut()) {
            // max_bin carries a zero weight
            let mut sum: f32 = filter
                .weights
                .iter()
                .zip(&power[filter.min_bin..filter.max_bin])
                .map(|(w, p)| w * p)
                .sum();
            sum += self.config.log_off;
            let mut val = if sum <= 0.0 {
                self.config.log_min
            } else {
                sum.ln()
            };
            if renorm.on {
                val = ((val - renorm.min) * scale).clamp(0.0, 1.0);
            }
            *o = val;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mel_roundtrip() {
        let mut f = 1.0f32;
        while f <= 20000.0 {
            let back = mel_to_freq(freq_to_mel(f));
            assert!(
                (back - f).abs() <= f * 1e-5,
                "roundtrip of {} Hz gave {}",
                f,
                back
            );
            f *= 1.37;
        }
    }

    #[test]
    fn test_default_bank_shape() {
        let bank = MelFilterBank::new(&MelConfig::default(), 201, 16000).unwrap();
        assert_eq!(bank.n_filters(), 32);

        let mut prev = (0, 0, 0);
        for (i, filter) in bank.filters().iter().enumerate() {
            assert!(filter.min_bin >= prev.0 && filter.peak_bin >= prev.1 && filter.max_bin >= prev.2);
            assert_eq!(filter.weights.len(), filter.max_bin - filter.min_bin + 1);
            assert_eq!(filter.weights[0], 0.0, "filter {} min weight", i);
            assert_eq!(filter.weights[filter.peak_bin - filter.min_bin], 1.0, "filter {} peak", i);
            assert_eq!(*filter.weights.last().unwrap(), 0.0, "filter {} max weight", i);
            prev = (filter.min_bin, filter.peak_bin, filter.max_bin);
        }
    }

    #[test]
    fn test_degenerate_filter_rejected() {
        let config = MelConfig {
            n_filters: 64,
            hi_hz: 3800.0,
            ..MelConfig::default()
        };
        let result = MelFilterBank::new(&config, 33, 8000);
        assert!(matches!(result, Err(DspError::Configuration(_))));
    }

    #[test]
    fn test_silence_floors_then_clamps() {
        let bank = MelFilterBank::new(&MelConfig::default(), 201, 16000).unwrap();
        let mut out = vec![1.0; 32];
        bank.apply(&vec![0.0; 201], &mut out).unwrap();
        // log_min -10 is below renorm min -5
        assert!(out.iter().all(|&v| v == 0.0));

        let config = MelConfig {
            renorm: crate::config::RenormConfig {
                on: false,
                ..Default::default()
            },
            ..MelConfig::default()
        };
        let bank = MelFilterBank::new(&config, 201, 16000).unwrap();
        bank.apply(&vec![0.0; 201], &mut out).unwrap();
        assert!(out.iter().all(|&v| v == -10.0));
    }

    #[test]
    fn test_flat_spectrum_renorm() {
        let bank = MelFilterBank::new(&MelConfig::default(), 201, 16000).unwrap();
        let mut out = vec![0.0; 32];
        bank.apply(&vec![100.0; 201], &mut out).unwrap();
        for &v in &out {
            assert!((0.0..=1.0).contains(&v));
        }
        // Wider filters sum more bins
        assert!(out[31] > out[0]);
    }
}
