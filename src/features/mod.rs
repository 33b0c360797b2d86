//! Per-step and per-trial feature stages
//!
//! - Power spectrum (FFT, smoothing, log power)
//! - Mel filter-bank
//! - Mel cepstrum
//! - Gabor filtering over the time × mel plane
//! - Pooled inhibition of gabor responses

pub mod dft;
pub mod gabor;
pub mod kwta;
pub mod mel;
pub mod mfcc;
