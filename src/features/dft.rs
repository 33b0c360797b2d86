//! Short-time power spectrum
//!
//! Each analysis step takes one raw (unwindowed) window of samples through a
//! forward FFT and keeps the power of the first `win_samples / 2 + 1` bins.
//! Optionally the power is smoothed against the previous step of the same
//! channel and a floored log power is produced alongside it.
//!
//! # Example
//!
//! ```no_run
//! use vocalis_dsp::config::DftConfig;
//! use vocalis_dsp::features::dft::PowerSpectrum;
//!
//! let mut dft = PowerSpectrum::new(400, 1, DftConfig::default())?;
//! let window = vec![0.0f32; 400];
//! let mut power = vec![0.0f32; dft.dft_use()];
//! let mut log_power = vec![0.0f32; dft.dft_use()];
//! dft.compute(&window, 0, true, &mut power, Some(&mut log_power))?;
//! # Ok::<(), vocalis_dsp::DspError>(())
//! ```

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::config::DftConfig;
use crate::error::DspError;

/// Forward FFT plan plus the per-channel smoothing state
pub struct PowerSpectrum {
    config: DftConfig,
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    dft_size: usize,
    dft_use: usize,
    /// Power of the previous step, one row per channel
    prev_power: Vec<Vec<f32>>,
}

impl std::fmt::Debug for PowerSpectrum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PowerSpectrum")
            .field("dft_size", &self.dft_size)
            .field("dft_use", &self.dft_use)
            .field("channels", &self.prev_power.len())
            .finish()
    }
}

impl PowerSpectrum {
    /// Plans an FFT of `win_samples` points
    ///
    /// # Errors
    ///
    /// Returns `DspError::Configuration` if `win_samples` or `channels` is zero.
    pub fn new(win_samples: usize, channels: usize, config: DftConfig) -> Result<Self, DspError> {
        if win_samples == 0 || channels == 0 {
            return Err(DspError::Configuration(format!(
                "DFT needs a non-empty window and at least one channel (win={}, channels={})",
                win_samples, channels
            )));
        }
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(win_samples);
        let dft_use = win_samples / 2 + 1;
        log::debug!("Planned {}-point DFT, using {} bins", win_samples, dft_use);
        Ok(Self {
            config,
            fft,
            buffer: vec![Complex::new(0.0, 0.0); win_samples],
            dft_size: win_samples,
            dft_use,
            prev_power: vec![vec![0.0; dft_use]; channels],
        })
    }

    /// Full FFT size (the window length)
    pub fn dft_size(&self) -> usize {
        self.dft_size
    }

    /// Number of bins kept, up to Nyquist
    pub fn dft_use(&self) -> usize {
        self.dft_use
    }

    /// Computes the (smoothed) power of one window
    ///
    /// # Arguments
    ///
    /// * `window` - `dft_size` raw samples
    /// * `channel` - Channel whose smoothing state is used
    /// * `first_step` - First step of a sound; disables smoothing
    /// * `power` - Receives `dft_use` power values
    /// * `log_power` - Receives `dft_use` log power values when given
    ///
    /// # Errors
    ///
    /// Returns `DspError::InvalidInput` on slice length mismatch or an unknown channel.
    pub fn compute(
        &mut self,
        window: &[f32],
        channel: usize,
        first_step: bool,
        power: &mut [f32],
        log_power: Option<&mut [f32]>,
    ) -> Result<(), DspError> {
        if window.len() != self.dft_size || power.len() != self.dft_use {
            return Err(DspError::InvalidInput(format!(
                "DFT expects a {}-sample window and {} outputs, got {} and {}",
                self.dft_size,
                self.dft_use,
                window.len(),
                power.len()
            )));
        }
        let prev = self.prev_power.get_mut(channel).ok_or_else(|| {
            DspError::InvalidInput(format!("Channel {} out of range", channel))
        })?;

        for (c, &x) in self.buffer.iter_mut().zip(window) {
            *c = Complex::new(x, 0.0);
        }
        self.fft.process(&mut self.buffer);

        let smooth = !first_step && self.config.previous_smooth != 0.0;
        for k in 0..self.dft_use {
            let bin = self.buffer[k];
            let mut pow = bin.re * bin.re + bin.im * bin.im;
            if smooth {
                pow = self.config.previous_smooth * prev[k] + self.config.current_smooth * pow;
            }
            power[k] = pow;
            prev[k] = pow;
        }

        if let Some(log_power) = log_power {
            if log_power.len() != self.dft_use {
                return Err(DspError::InvalidInput(format!(
                    "Log power expects {} outputs, got {}",
                    self.dft_use,
                    log_power.len()
                )));
            }
            for (lp, &p) in log_power.iter_mut().zip(power.iter()) {
                *lp = log_floor(p + self.config.log_off, self.config.log_min);
            }
        }
        Ok(())
    }
}

/// Natural log floored at `min`; non-positive arguments give `min`
pub fn log_floor(x: f32, min: f32) -> f32 {
    if x <= 0.0 {
        min
    } else {
        x.ln().max(min)
    }
}
