//! Mel-frequency cepstral coefficients
//!
//! A type-I discrete cosine transform of the log-mel energies of one step:
//!
//! ```text
//! c[k] = x[0] + (-1)^k x[n-1] + 2 Σ_{j=1}^{n-2} x[j] cos(π j k / (n-1))
//! ```
//!
//! after which the DC term is replaced by the log energy `ln(1 + c[0]²)`.
//! All `n` coefficients are produced; how many are exported is up to the caller.

use std::f64::consts::PI;

use crate::error::DspError;

/// Precomputed cosine table for one input length
#[derive(Debug, Clone)]
pub struct MelCepstrum {
    n: usize,
    /// `cos(π j k / (n - 1))`, row-major `[k][j]`
    cos_table: Vec<f64>,
}

impl MelCepstrum {
    /// Prepares a transform of `n` points
    ///
    /// # Errors
    ///
    /// Returns `DspError::Configuration` if `n < 2`.
    pub fn new(n: usize) -> Result<Self, DspError> {
        if n < 2 {
            return Err(DspError::Configuration(format!(
                "Cepstrum needs at least 2 mel filters, got {}",
                n
            )));
        }
        let denom = (n - 1) as f64;
        let mut cos_table = Vec::with_capacity(n * n);
        for k in 0..n {
            for j in 0..n {
                cos_table.push((PI * (j * k) as f64 / denom).cos());
            }
        }
        Ok(Self { n, cos_table })
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.n
    }

    /// Always false; a transform has at least two points
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Computes the cepstrum of `mel` into `out`
    ///
    /// # Errors
    ///
    /// Returns `DspError::InvalidInput` on slice length mismatch.
    pub fn transform(&self, mel: &[f32], out: &mut [f32]) -> Result<(), DspError> {
        let n = self.n;
        if mel.len() != n || out.len() != n {
            return Err(DspError::InvalidInput(format!(
                "Cepstrum expects {} values, got {} in and {} out",
                n,
                mel.len(),
                out.len()
            )));
        }
        let first = mel[0] as f64;
        let last = mel[n - 1] as f64;
        for (k, o) in out.iter_mut().enumerate() {
            let row = &self.cos_table[k * n..(k + 1) * n];
            let inner: f64 = (1..n - 1).map(|j| mel[j] as f64 * row[j]).sum();
            let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
            *o = (first + sign * last + 2.0 * inner) as f32;
        }
        let c0 = out[0] as f64;
        out[0] = (1.0 + c0 * c0).ln() as f32;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_input() {
        // DCT-I of a constant c over n points: c[0] = 2(n-1)c, others 0
        let dct = MelCepstrum::new(8).unwrap();
        let mut out = vec![0.0; 8];
        dct.transform(&[0.5; 8], &mut out).unwrap();

        let c0 = 2.0 * 7.0 * 0.5f64;
        assert!((out[0] as f64 - (1.0 + c0 * c0).ln()).abs() < 1e-5);
        for (k, &v) in out.iter().enumerate().skip(1) {
            assert!(v.abs() < 1e-5, "coefficient {} should vanish, got {}", k, v);
        }
    }

    #[test]
    fn test_silence_is_zero() {
        let dct = MelCepstrum::new(32).unwrap();
        let mut out = vec![1.0; 32];
        dct.transform(&[0.0; 32], &mut out).unwrap();
        assert!(out.iter().all(|&v| v == 0.0), "ln(1 + 0) is 0");
    }

    #[test]
    fn test_alternating_input() {
        // x[j] = (-1)^j puts all energy in the last coefficient
        let n = 5;
        let dct = MelCepstrum::new(n).unwrap();
        let x: Vec<f32> = (0..n).map(|j| if j % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let mut out = vec![0.0; n];
        dct.transform(&x, &mut out).unwrap();
        assert!((out[n - 1] - 8.0).abs() < 1e-5);
        assert!(out[1].abs() < 1e-5);
    }

    #[test]
    fn test_too_short() {
        assert!(MelCepstrum::new(1).is_err());
    }
}
