//! Feed-forward / feed-back inhibition with a noisy x/(x+1) activation
//!
//! The raw gabor responses of one channel act as excitatory conductances.
//! A single pooled inhibitory conductance is driven by the average and
//! maximum excitation (feed-forward) and by the average activation
//! (feed-back). Every unit then settles toward the activation its
//! excitation produces above the inhibition-adjusted threshold.
//! The loop runs a fixed number of iterations.

use crate::config::{KwtaConfig, Xx1Config};

/// Noisy x/(x+1) activation function with its derived constants
#[derive(Debug, Clone)]
pub struct NoisyXx1 {
    params: Xx1Config,
    sig_gain_nvar: f32,
    sig_mult_eff: f32,
    sig_val_at_0: f32,
    interp_val: f32,
}

impl NoisyXx1 {
    /// Derives the sigmoid and interpolation constants
    pub fn new(params: &Xx1Config) -> Self {
        let mut f = Self {
            params: params.clone(),
            sig_gain_nvar: params.sig_gain / params.nvar,
            sig_mult_eff: params.sig_mult * (params.gain * params.nvar).powf(params.sig_mult_pow),
            sig_val_at_0: 0.0,
            interp_val: 0.0,
        };
        f.sig_val_at_0 = 0.5 * f.sig_mult_eff;
        f.interp_val = f.xx1_gain_cor(params.interp_range) - f.sig_val_at_0;
        f
    }

    /// Threshold on the membrane potential
    pub fn thr(&self) -> f32 {
        self.params.thr
    }

    /// `x / (x + 1)`
    pub fn xx1(x: f32) -> f32 {
        x / (x + 1.0)
    }

    /// x/(x+1) with reduced gain just above threshold
    pub fn xx1_gain_cor(&self, x: f32) -> f32 {
        let p = &self.params;
        let gain_cor_fact = (p.gain_cor_range - x / p.nvar) / p.gain_cor_range;
        if gain_cor_fact < 0.0 {
            return Self::xx1(p.gain * x);
        }
        let new_gain = p.gain * (1.0 - p.gain_cor * gain_cor_fact);
        Self::xx1(new_gain * x)
    }

    /// Activation for a potential `x` relative to threshold
    pub fn activate(&self, x: f32) -> f32 {
        let p = &self.params;
        if x < 0.0 {
            self.sig_mult_eff / (1.0 + (-(x * self.sig_gain_nvar)).exp())
        } else if x < p.interp_range {
            let interp = 1.0 - (p.interp_range - x) / p.interp_range;
            self.sig_val_at_0 + interp * self.interp_val
        } else {
            self.xx1_gain_cor(x)
        }
    }
}

/// Pooled inhibition over one channel's gabor responses
#[derive(Debug, Clone)]
pub struct Inhibition {
    config: KwtaConfig,
    act_fn: NoisyXx1,
}

impl Inhibition {
    /// Creates the inhibition stage
    pub fn new(config: &KwtaConfig) -> Self {
        Self {
            config: config.clone(),
            act_fn: NoisyXx1::new(&config.xx1),
        }
    }

    /// Excitatory conductance that puts a unit exactly at threshold under `gi`
    fn ge_thr(&self, gi: f32) -> f32 {
        let c = &self.config;
        let thr = self.act_fn.thr();
        (c.gbar_i * gi * (c.erev_i - thr) + c.gbar_l * (c.erev_l - thr)) / (thr - c.erev_e)
    }

    /// Settles `out` from the excitatory conductances in `raw`
    ///
    /// With inhibition turned off, `raw` is copied unchanged. Returns the
    /// final pooled inhibitory conductance.
    pub fn compute(&self, raw: &[f32], out: &mut [f32]) -> f32 {
        if !self.config.on || raw.is_empty() {
            out.copy_from_slice(raw);
            return 0.0;
        }
        let c = &self.config;
        let n = raw.len() as f32;
        let avg_ge = raw.iter().sum::<f32>() / n;
        let max_ge = raw.iter().copied().fold(f32::MIN, f32::max);
        let ffi = c.ff * (avg_ge + c.max_vs_avg * (max_ge - avg_ge) - c.ff0).max(0.0);

        out.fill(0.0);
        let mut fbi = 0.0f32;
        let mut gi = 0.0f32;
        for _ in 0..c.iters {
            let avg_act = out.iter().sum::<f32>() / n;
            fbi += (1.0 / c.fb_tau) * (c.fb * avg_act - fbi);
            gi = c.gi * (ffi + fbi);
            let ge_thr = self.ge_thr(gi);
            for (act, &ge) in out.iter_mut().zip(raw) {
                let nw = self.act_fn.activate(ge * c.gbar_e - ge_thr);
                *act += (1.0 / c.act_tau) * (nw - *act);
            }
        }
        gi
    }
}
