//! Articulatory speech synthesis
//!
//! - Control frames and their per-sample interpolation
//! - Glottal source, noise and the fixed filters around the tube
//! - The waveguide vocal tract with its output rate converter
//! - Phone and word sequencing over lookup stores

pub mod control;
pub mod filters;
pub mod fir;
pub mod glottal;
pub mod resample;
pub mod sequencer;
pub mod tract;
pub mod voice;
