//! Oriented gabor filters over the time × mel plane
//!
//! Each scale renders `n_horiz + 3` kernels of `size_time × size_freq`:
//! `n_horiz` narrow-band horizontal kernels spaced evenly along frequency,
//! followed by two diagonals and a vertical. A kernel is a sine carrier under
//! a 2-D gaussian, optionally cut to the inscribed ellipse, then rescaled so
//! its positive lobe sums to +1 and its negative lobe to -1.
//!
//! The convolution strides the kernels over a trial's mel output and splits
//! every response into a rectified (positive, negative) pair.
//!
//! # Example
//!
//! ```no_run
//! use vocalis_dsp::config::GaborConfig;
//! use vocalis_dsp::features::gabor::GaborKernels;
//!
//! let kernels = GaborKernels::render(&GaborConfig::scale(1))?;
//! let geom = kernels.geometry(12, 20, 32);
//! println!("{} time taps x {} freq taps", geom.time_taps, geom.freq_taps);
//! # Ok::<(), vocalis_dsp::DspError>(())
//! ```

use std::f32::consts::PI;

use crate::analysis::tensor::{GaborTensor, TrialTensor};
use crate::config::GaborConfig;
use crate::error::DspError;

/// Where a scale's kernels are placed inside a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GaborGeometry {
    /// `size_time / 2 - border_steps`; a tap at step `s` reads mel steps from `s - t_off`
    pub t_off: isize,
    /// First tap step (inclusive)
    pub t_min: usize,
    /// Last tap step (exclusive)
    pub t_max: usize,
    /// Number of time taps
    pub time_taps: usize,
    /// Number of frequency taps
    pub freq_taps: usize,
}

/// Number of strided positions in `lo..hi`
fn tap_count(lo: usize, hi: usize, space: usize) -> usize {
    if hi > lo {
        (hi - lo - 1) / space + 1
    } else {
        0
    }
}

/// Rendered kernels of one scale, `[time][freq][filter]`
#[derive(Debug, Clone)]
pub struct GaborKernels {
    config: GaborConfig,
    n_filters: usize,
    data: Vec<f32>,
}

impl GaborKernels {
    /// Renders the kernels for one scale
    ///
    /// # Errors
    ///
    /// Returns `DspError::Configuration` if the scale parameters are invalid.
    pub fn render(config: &GaborConfig) -> Result<Self, DspError> {
        config.validate()?;
        let st = config.size_time;
        let sf = config.size_freq;
        let n_filters = config.n_filters();
        let mut kernels = Self {
            config: config.clone(),
            n_filters,
            data: vec![0.0; st * sf * n_filters],
        };

        let ctr_t = (st as f32 - 1.0) / 2.0;
        let ctr_f = (sf as f32 - 1.0) / 2.0;
        let ang_inc = PI / 4.0;
        let h_ctr_inc = (sf as f32 - 1.0) / (config.n_horiz as f32 + 1.0);

        let mut fi = 0;
        for h in 0..config.n_horiz {
            let ctr = h_ctr_inc * (h as f32 + 1.0);
            kernels.render_one(
                fi,
                -2.0 * ang_inc,
                ctr_t,
                ctr,
                config.sigma_len_horiz,
                config.sigma_width_horiz,
            );
            fi += 1;
        }
        for ang in 1..4 {
            kernels.render_one(
                fi,
                -(ang as f32) * ang_inc,
                ctr_t,
                ctr_f,
                config.sigma_len,
                config.sigma_width,
            );
            fi += 1;
        }
        kernels.normalize_lobes();

        log::debug!(
            "Rendered {} gabor kernels of {}x{} (time x freq)",
            n_filters,
            st,
            sf
        );
        Ok(kernels)
    }

    fn render_one(
        &mut self,
        fi: usize,
        angle: f32,
        ctr_t: f32,
        ctr_f: f32,
        sigma_len: f32,
        sigma_width: f32,
    ) {
        let st = self.config.size_time;
        let sf = self.config.size_freq;
        let radius_t = st as f32 / 2.0;
        let radius_f = sf as f32 / 2.0;
        let len_norm = 1.0 / (2.0 * sigma_len * sigma_len);
        let wd_norm = 1.0 / (2.0 * sigma_width * sigma_width);
        let two_pi_norm = 2.0 * PI / self.config.wave_len;
        let (sin_a, cos_a) = angle.sin_cos();

        for y in 0..sf {
            for x in 0..st {
                let xfn = (x as f32 - ctr_t) / radius_t;
                let yfn = (y as f32 - ctr_f) / radius_f;
                let mut val = 0.0;
                if !(self.config.circle_edge && xfn.hypot(yfn) > 1.0) {
                    let nx = xfn * cos_a - yfn * sin_a;
                    let ny = yfn * cos_a + xfn * sin_a;
                    let gauss = (-(wd_norm * nx * nx + len_norm * ny * ny)).exp();
                    val = gauss * (two_pi_norm * ny + self.config.phase_offset).sin();
                }
                let idx = self.index(x, y, fi);
                self.data[idx] = val;
            }
        }
    }

    fn normalize_lobes(&mut self) {
        for fi in 0..self.n_filters {
            let mut pos_sum = 0.0f32;
            let mut neg_sum = 0.0f32;
            for t in 0..self.config.size_time {
                for f in 0..self.config.size_freq {
                    let v = self.get(t, f, fi);
                    if v > 0.0 {
                        pos_sum += v;
                    } else {
                        neg_sum += v;
                    }
                }
            }
            let pos_norm = if pos_sum > 0.0 { 1.0 / pos_sum } else { 0.0 };
            let neg_norm = if neg_sum < 0.0 { -1.0 / neg_sum } else { 0.0 };
            for t in 0..self.config.size_time {
                for f in 0..self.config.size_freq {
                    let idx = self.index(t, f, fi);
                    let v = self.data[idx];
                    if v > 0.0 {
                        self.data[idx] = v * pos_norm;
                    } else if v < 0.0 {
                        self.data[idx] = v * neg_norm;
                    }
                }
            }
        }
    }

    #[inline]
    fn index(&self, time: usize, freq: usize, filter: usize) -> usize {
        (time * self.config.size_freq + freq) * self.n_filters + filter
    }

    /// Kernel value at `(time, freq, filter)`
    #[inline]
    pub fn get(&self, time: usize, freq: usize, filter: usize) -> f32 {
        self.data[self.index(time, freq, filter)]
    }

    /// Number of kernels
    pub fn n_filters(&self) -> usize {
        self.n_filters
    }

    /// Scale parameters the kernels were rendered from
    pub fn config(&self) -> &GaborConfig {
        &self.config
    }

    /// Tap placement for a trial of `trial_steps` with `border_steps` on each side
    pub fn geometry(&self, border_steps: usize, trial_steps: usize, n_mel: usize) -> GaborGeometry {
        let t_off = (self.config.size_time / 2) as isize - border_steps as isize;
        let t_min = t_off.max(0) as usize;
        let t_max = trial_steps.saturating_sub(t_min);
        let f_max = n_mel.saturating_sub(self.config.size_freq);
        GaborGeometry {
            t_off,
            t_min,
            t_max,
            time_taps: tap_count(t_min, t_max, self.config.space_time),
            freq_taps: tap_count(0, f_max, self.config.space_freq),
        }
    }

    /// Checks that every time tap of `geom` reads inside `total_steps`
    ///
    /// # Errors
    ///
    /// Returns `DspError::ShapeOverflow` if the last tap reads past the trial.
    pub fn check_fit(&self, geom: &GaborGeometry, total_steps: usize) -> Result<(), DspError> {
        if geom.time_taps == 0 {
            return Ok(());
        }
        let s_last = geom.t_min + (geom.time_taps - 1) * self.config.space_time;
        let in_st = (s_last as isize - geom.t_off) as usize;
        if in_st + self.config.size_time > total_steps {
            return Err(DspError::ShapeOverflow(format!(
                "Gabor taps read steps up to {} of a {}-step trial",
                in_st + self.config.size_time,
                total_steps
            )));
        }
        Ok(())
    }

    /// Convolves the kernels over one channel of a mel trial
    ///
    /// Writes `(gain·sum, 0)` for a non-negative response and `(0, gain·|sum|)`
    /// otherwise into `raw`.
    ///
    /// # Errors
    ///
    /// Returns `DspError::ShapeOverflow` if a tap falls outside `raw` or reads
    /// past the trial's steps.
    pub fn convolve(
        &self,
        mel: &TrialTensor,
        channel: usize,
        geom: &GaborGeometry,
        raw: &mut GaborTensor,
    ) -> Result<(), DspError> {
        let cfg = &self.config;
        let f_max = mel.features().saturating_sub(cfg.size_freq);
        for (t_idx, s) in (geom.t_min..geom.t_max).step_by(cfg.space_time).enumerate() {
            // s >= t_min >= t_off
            let in_st = (s as isize - geom.t_off) as usize;
            if in_st + cfg.size_time > mel.steps() {
                return Err(DspError::ShapeOverflow(format!(
                    "Gabor time tap {} reads steps {}..{} of {}",
                    t_idx,
                    in_st,
                    in_st + cfg.size_time,
                    mel.steps()
                )));
            }
            for (f_idx, flt) in (0..f_max).step_by(cfg.space_freq).enumerate() {
                for fi in 0..self.n_filters {
                    let mut sum = 0.0f32;
                    for ff in 0..cfg.size_freq {
                        for ft in 0..cfg.size_time {
                            sum += self.get(ft, ff, fi) * mel.get(flt + ff, in_st + ft, channel);
                        }
                    }
                    let act = cfg.gain * sum.abs();
                    if sum >= 0.0 {
                        raw.set_pair(channel, fi, f_idx, t_idx, act, 0.0)?;
                    } else {
                        raw.set_pair(channel, fi, f_idx, t_idx, 0.0, act)?;
                    }
                }
            }
        }
        Ok(())
    }
}
