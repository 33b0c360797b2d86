//! # Vocalis DSP
//!
//! Auditory feature extraction and articulatory speech synthesis.
//!
//! ## Features
//!
//! - **Auditory analysis**: windowed power spectrum, mel filter-bank, mel
//!   cepstrum and multi-scale gabor filtering with pooled inhibition, computed
//!   trial by trial with temporal borders
//! - **Articulatory synthesis**: a ten-section waveguide vocal tract with a
//!   nasal branch, glottal wavetable source, aspiration and frication noise,
//!   and band-limited conversion to the output rate
//! - **Sequencing**: phone strings and dictionary words mapped to control
//!   frames through pluggable lookup stores
//!
//! ## Quick Start
//!
//! ```no_run
//! use vocalis_dsp::{extract_features, AudioSource, AuditoryConfig};
//!
//! // One second of mono audio at 16 kHz
//! let source = AudioSource::mono(vec![0.0f32; 16000], 16000);
//!
//! let table = extract_features(&source, AuditoryConfig::default())?;
//! println!("{} trials", table.rows());
//! # Ok::<(), vocalis_dsp::DspError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! AudioSource → windows → power spectrum → mel → { mfcc, gabor → inhibition } → FeatureSink
//! ControlFrame → interpolation → glottis/noise → vocal tract → rate converter → samples
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod synthesis;

// Re-export main types
pub use analysis::processor::AuditoryProcessor;
pub use config::{AuditoryConfig, SynthConfig, VoicePreset};
pub use error::DspError;
pub use io::feature_table::{FeatureSink, FeatureTable};
pub use io::sample_buffer::AudioSource;
pub use synthesis::control::ControlFrame;
pub use synthesis::sequencer::ControlSequencer;
pub use synthesis::tract::VocalTract;

/// Analyzes a whole sound into a feature table
///
/// Runs trials until less than one step of input remains; every trial adds
/// one row.
///
/// # Arguments
///
/// * `source` - Decoded audio; its sample rate overrides the configured one
/// * `config` - Analysis configuration
///
/// # Returns
///
/// `FeatureTable` with one row per trial
///
/// # Errors
///
/// Returns `DspError::Configuration` for an invalid configuration,
/// `DspError::InvalidInput` for an empty sound or missing channels, and
/// `DspError::ShapeOverflow` if a gabor output falls outside its tensor.
///
/// # Example
///
/// ```no_run
/// use vocalis_dsp::{extract_features, AudioSource, AuditoryConfig};
///
/// let source = AudioSource::mono(vec![0.0f32; 16000 * 3], 16000);
/// let table = extract_features(&source, AuditoryConfig::default())?;
/// # Ok::<(), vocalis_dsp::DspError>(())
/// ```
pub fn extract_features(
    source: &AudioSource,
    config: AuditoryConfig,
) -> Result<FeatureTable, DspError> {
    use std::time::Instant;
    let start_time = Instant::now();

    log::debug!(
        "Starting feature extraction: {} frames at {} Hz",
        source.frames(),
        source.sample_rate
    );

    if source.samples.is_empty() {
        return Err(DspError::InvalidInput("Empty audio samples".to_string()));
    }
    if source.sample_rate == 0 {
        return Err(DspError::InvalidInput("Invalid sample rate".to_string()));
    }

    let mut processor = AuditoryProcessor::new(config)?;
    processor.load_sound(source)?;

    let mut table = FeatureTable::new();
    while processor.input_steps_left() > 0 {
        processor.process_trial(&mut table)?;
    }

    log::debug!(
        "Extracted {} trials in {:.1} ms",
        table.rows(),
        start_time.elapsed().as_secs_f32() * 1000.0
    );
    Ok(table)
}
