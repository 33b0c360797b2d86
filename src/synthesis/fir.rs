//! Maximally flat linear-phase low-pass FIR filter
//!
//! Used to decimate the 2× oversampled glottal wavetable. Coefficients are
//! designed from the centre (`beta`) and width (`gamma`) of the transition
//! band, both as fractions of the sample rate, then trimmed where they fall
//! below `cutoff` and mirrored into a symmetric tap set.
//!
//! # Example
//!
//! ```no_run
//! use vocalis_dsp::synthesis::fir::FirFilter;
//!
//! let mut fir = FirFilter::new(0.2, 0.1, 1e-8)?;
//! fir.filter(0.3, false);
//! let y = fir.filter(0.5, true);
//! # Ok::<(), vocalis_dsp::DspError>(())
//! ```

use crate::error::DspError;

const LIMIT: usize = 200;
const MAX_TRANSITION_ORDER: usize = 160;

/// FIR filter with a circular delay line
#[derive(Debug, Clone)]
pub struct FirFilter {
    coef: Vec<f32>,
    data: Vec<f32>,
    ptr: usize,
}

impl FirFilter {
    /// Designs the filter
    ///
    /// # Errors
    ///
    /// Returns `DspError::Configuration` when `beta` is outside (0, 0.5),
    /// `gamma` does not fit beside the stop band, or `gamma` is so small the
    /// transition order exceeds 160.
    pub fn new(beta: f32, gamma: f32, cutoff: f32) -> Result<Self, DspError> {
        let half = maximally_flat(beta, gamma)?;
        let n_coef = trim(&half, cutoff);
        let n_taps = 2 * n_coef - 1;

        // c[n], c[n-1], .., c[1], c[2], .., c[n]
        let mut coef = Vec::with_capacity(n_taps);
        coef.extend((1..=n_coef).rev().map(|i| half[i]));
        coef.extend((2..=n_coef).map(|i| half[i]));

        log::debug!(
            "FIR filter: beta={}, gamma={}, {} taps",
            beta,
            gamma,
            n_taps
        );
        Ok(Self {
            data: vec![0.0; n_taps],
            coef,
            ptr: 0,
        })
    }

    /// Number of taps
    pub fn taps(&self) -> usize {
        self.coef.len()
    }

    /// Tap coefficients
    pub fn coefficients(&self) -> &[f32] {
        &self.coef
    }

    /// Pushes one sample; computes the output only when `need_output`
    ///
    /// Returns 0.0 when no output is requested.
    pub fn filter(&mut self, input: f32, need_output: bool) -> f32 {
        let n = self.coef.len();
        self.data[self.ptr] = input;
        let mut output = 0.0;
        if need_output {
            let mut p = self.ptr;
            for &c in &self.coef {
                output += self.data[p] * c;
                p = if p + 1 >= n { 0 } else { p + 1 };
            }
        }
        self.ptr = if self.ptr == 0 { n - 1 } else { self.ptr - 1 };
        output
    }

    /// Clears the delay line
    pub fn reset(&mut self) {
        self.data.fill(0.0);
        self.ptr = 0;
    }
}

/// Half of the symmetric impulse response, 1-based (`[0]` unused)
fn maximally_flat(beta: f32, gamma: f32) -> Result<Vec<f32>, DspError> {
    if beta <= 0.0 || beta >= 0.5 {
        return Err(DspError::Configuration(format!(
            "FIR beta {} out of range (0, 0.5)",
            beta
        )));
    }
    let beta_min = (2.0 * beta).min(1.0 - 2.0 * beta);
    if gamma <= 0.0 || gamma >= beta_min {
        return Err(DspError::Configuration(format!(
            "FIR gamma {} out of range (0, {})",
            gamma, beta_min
        )));
    }
    let nt = (1.0 / (4.0 * gamma * gamma)) as usize;
    if nt > MAX_TRANSITION_ORDER {
        return Err(DspError::Configuration(format!(
            "FIR gamma {} too small (transition order {})",
            gamma, nt
        )));
    }

    let beta = beta as f64;
    let ac = (1.0 + (2.0 * std::f64::consts::PI * beta).cos()) / 2.0;
    let approx = rational_approximation(ac, nt);
    let np = approx.denominator;
    let nt = approx.order;
    let numerator = approx.numerator.max(1);
    if np == 0 {
        return Err(DspError::Configuration(format!(
            "FIR design failed for beta={}, gamma={}",
            beta, gamma
        )));
    }

    let n = 2 * np - 1;
    let mut a = vec![0.0f64; LIMIT + 2];
    let mut c = vec![0.0f64; LIMIT + 2];
    a[1] = 1.0;
    c[1] = 1.0;
    let ll = nt.saturating_sub(numerator);

    for i in 2..=np {
        c[i] = (2.0 * std::f64::consts::PI * (i - 1) as f64 / n as f64).cos();
        let x = (1.0 - c[i]) / 2.0;
        if numerator == nt {
            continue;
        }
        let mut y = x;
        let mut sum = 1.0;
        for j in 1..=ll {
            let mut z = y;
            for jj in 1..numerator {
                z *= 1.0 + j as f64 / jj as f64;
            }
            y *= x;
            sum += z;
        }
        a[i] = sum * (1.0 - x).powi(numerator as i32);
    }

    // n-point inverse DFT
    let mut half = vec![0.0f32; np + 1];
    for (i, h) in half.iter_mut().enumerate().skip(1) {
        let mut acc = a[1] / 2.0;
        for j in 2..=np {
            let mut m = ((i - 1) * (j - 1)) % n;
            if m > nt {
                m = n - m;
            }
            acc += c[m + 1] * a[j];
        }
        *h = (acc * 2.0 / n as f64) as f32;
    }
    Ok(half)
}

/// Highest 1-based index whose coefficient reaches `cutoff`
fn trim(half: &[f32], cutoff: f32) -> usize {
    (1..half.len())
        .rev()
        .find(|&i| half[i].abs() >= cutoff.abs())
        .unwrap_or(1)
}

struct Rational {
    numerator: usize,
    denominator: usize,
    order: usize,
}

/// Best rational approximation of `number` with a denominator in `order..=2*order`
fn rational_approximation(number: f64, order: usize) -> Rational {
    if order == 0 {
        return Rational {
            numerator: 0,
            denominator: 0,
            order: 0,
        };
    }
    let fractional = (number - number.trunc()).abs();
    let order_max = (2 * order).min(LIMIT);

    let mut minimum_error = 1.0;
    let mut modulus = 0;
    let mut denominator = order;
    for i in order..=order_max {
        let ps = i as f64 * fractional;
        let ip = (ps + 0.5) as usize;
        let error = ((ps - ip as f64) / i as f64).abs();
        if error < minimum_error {
            minimum_error = error;
            modulus = ip;
            denominator = i;
        }
    }
    let numerator = number.abs().trunc() as usize * denominator + modulus;
    if numerator == denominator {
        return Rational {
            numerator: order_max - 1,
            denominator: order_max,
            order: order_max - 1,
        };
    }
    Rational {
        numerator,
        denominator,
        order: denominator - 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(matches!(
            FirFilter::new(0.0, 0.1, 1e-8),
            Err(DspError::Configuration(_))
        ));
        assert!(FirFilter::new(0.5, 0.1, 1e-8).is_err());
        assert!(FirFilter::new(0.2, 0.4, 1e-8).is_err());
        assert!(FirFilter::new(0.2, 0.01, 1e-8).is_err());
    }

    #[test]
    fn test_symmetric_taps() {
        let fir = FirFilter::new(0.2, 0.1, 1e-8).unwrap();
        let c = fir.coefficients();
        assert_eq!(c.len() % 2, 1);
        for i in 0..c.len() / 2 {
            assert!((c[i] - c[c.len() - 1 - i]).abs() < 1e-7);
        }
    }

    #[test]
    fn test_unity_dc_gain() {
        let fir = FirFilter::new(0.2, 0.1, 1e-8).unwrap();
        let dc: f32 = fir.coefficients().iter().sum();
        assert!((dc - 1.0).abs() < 1e-3, "DC gain {}", dc);
    }

    #[test]
    fn test_filter_settles_on_step() {
        let mut fir = FirFilter::new(0.2, 0.1, 1e-8).unwrap();
        let taps = fir.taps();
        let mut last = 0.0;
        for _ in 0..(2 * taps) {
            last = fir.filter(1.0, true);
        }
        assert!((last - 1.0).abs() < 1e-3, "step response {}", last);
        fir.reset();
        assert_eq!(fir.filter(0.0, true), 0.0);
    }
}
