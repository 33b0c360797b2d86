//! Configuration parameters for auditory analysis and articulatory synthesis
//!
//! Every record derives `Serialize`/`Deserialize` so a caller can keep the
//! configuration in JSON; `Default` gives the reference values.

use serde::{Deserialize, Serialize};

use crate::error::DspError;

/// Converts milliseconds to samples at the given rate
pub fn ms_to_samples(ms: f32, rate: u32) -> usize {
    (ms as f64 * 0.001 * rate as f64).round() as usize
}

/// Converts samples to milliseconds at the given rate
pub fn samples_to_ms(samples: usize, rate: u32) -> f32 {
    1000.0 * samples as f32 / rate as f32
}

/// Raw sound input parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Window duration in ms (default: 25.0)
    pub win_ms: f32,

    /// Step between successive windows in ms (default: 5.0)
    pub step_ms: f32,

    /// Length of a full trial in ms, should be a multiple of `step_ms` (default: 100.0)
    pub trial_ms: f32,

    /// Steps preserved before and after the trial window, giving temporal
    /// filters context at the trial edges (default: 12)
    pub border_steps: usize,

    /// Sample rate the pipeline is configured for (default: 16000)
    /// A sound with a different rate forces re-initialization on load.
    pub sample_rate: u32,

    /// Number of channels to process (default: 1)
    pub channels: usize,

    /// Channel to process when `channels == 1` (default: 0)
    pub channel: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            win_ms: 25.0,
            step_ms: 5.0,
            trial_ms: 100.0,
            border_steps: 12,
            sample_rate: 16000,
            channels: 1,
            channel: 0,
        }
    }
}

/// Sample counts derived from [`InputConfig`] at its sample rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputGeometry {
    /// Samples per window
    pub win_samples: usize,
    /// Samples the input advances per step
    pub step_samples: usize,
    /// Samples per trial
    pub trial_samples: usize,
    /// Steps per trial
    pub trial_steps: usize,
    /// `2 * border_steps + trial_steps`
    pub total_steps: usize,
}

impl InputConfig {
    /// Computes the sample geometry for the current sample rate
    pub fn geometry(&self) -> InputGeometry {
        let trial_steps = (self.trial_ms / self.step_ms).round() as usize;
        InputGeometry {
            win_samples: ms_to_samples(self.win_ms, self.sample_rate),
            step_samples: ms_to_samples(self.step_ms, self.sample_rate),
            trial_samples: ms_to_samples(self.trial_ms, self.sample_rate),
            trial_steps,
            total_steps: 2 * self.border_steps + trial_steps,
        }
    }

    /// Checks durations and channel selection
    pub fn validate(&self) -> Result<(), DspError> {
        if self.win_ms <= 0.0 || self.step_ms <= 0.0 || self.trial_ms <= 0.0 {
            return Err(DspError::Configuration(format!(
                "Durations must be > 0: win={}ms, step={}ms, trial={}ms",
                self.win_ms, self.step_ms, self.trial_ms
            )));
        }
        if self.sample_rate == 0 {
            return Err(DspError::Configuration("Sample rate must be > 0".to_string()));
        }
        if self.channels == 0 {
            return Err(DspError::Configuration("Channel count must be > 0".to_string()));
        }
        let geom = self.geometry();
        if geom.win_samples < 2 || geom.step_samples == 0 || geom.trial_steps == 0 {
            return Err(DspError::Configuration(format!(
                "Degenerate input geometry at {} Hz: {:?}",
                self.sample_rate, geom
            )));
        }
        Ok(())
    }
}

/// Discrete fourier transform settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DftConfig {
    /// Also keep the log of the power spectrum (default: true)
    pub log_pow: bool,

    /// Added to the power before taking the log (default: 0.0)
    pub log_off: f32,

    /// Floor for the log power (default: -100.0)
    pub log_min: f32,

    /// Weight of the previous step's power in the smoothed power (default: 0.0)
    pub previous_smooth: f32,

    /// Weight of the current step's power (default: 1.0)
    /// The two weights are independent and need not sum to 1.
    pub current_smooth: f32,
}

impl Default for DftConfig {
    fn default() -> Self {
        Self {
            log_pow: true,
            log_off: 0.0,
            log_min: -100.0,
            previous_smooth: 0.0,
            current_smooth: 1.0,
        }
    }
}

/// Renormalization of log mel energies into [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenormConfig {
    /// Perform renormalization (default: true)
    pub on: bool,
    /// Value mapped to 0 (default: -5.0)
    pub min: f32,
    /// Value mapped to 1 (default: 9.0)
    pub max: f32,
}

impl Default for RenormConfig {
    fn default() -> Self {
        Self {
            on: true,
            min: -5.0,
            max: 9.0,
        }
    }
}

impl RenormConfig {
    /// `1 / (max - min)`
    pub fn scale(&self) -> f32 {
        1.0 / (self.max - self.min)
    }
}

/// Mel filter-bank parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MelConfig {
    /// Perform mel filtering of the power spectrum (default: true)
    pub on: bool,

    /// Number of triangular filters (default: 32)
    pub n_filters: usize,

    /// Low end of the filter-bank in Hz (default: 120.0)
    pub lo_hz: f32,

    /// High end of the filter-bank in Hz (default: 10000.0)
    pub hi_hz: f32,

    /// Added to each filter sum before the log (default: 0.0)
    pub log_off: f32,

    /// Log output used when the filter sum is exactly zero (default: -10.0)
    pub log_min: f32,

    /// Renormalization of the log energies
    pub renorm: RenormConfig,
}

impl Default for MelConfig {
    fn default() -> Self {
        Self {
            on: true,
            n_filters: 32,
            lo_hz: 120.0,
            hi_hz: 10000.0,
            log_off: 0.0,
            log_min: -10.0,
            renorm: RenormConfig::default(),
        }
    }
}

/// Mel cepstrum (DCT of the mel energies)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MfccConfig {
    /// Compute cepstral coefficients (default: false)
    pub on: bool,
    /// Number of coefficients written to the feature sink (default: 13)
    pub n_coeff: usize,
}

impl Default for MfccConfig {
    fn default() -> Self {
        Self { on: false, n_coeff: 13 }
    }
}

/// One scale of time/frequency gabor filters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaborConfig {
    /// Use this scale
    pub on: bool,
    /// Kernel extent along time, in steps
    pub size_time: usize,
    /// Kernel extent along frequency, in mel filters
    pub size_freq: usize,
    /// Stride along time, in steps
    pub space_time: usize,
    /// Stride along frequency, in mel filters
    pub space_freq: usize,
    /// Gain applied to the absolute filter response (default: 2.0)
    pub gain: f32,
    /// Sine wavelength in normalized units (default: 1.5)
    pub wave_len: f32,
    /// Gaussian sigma along the elongated axis (default: 0.6)
    pub sigma_len: f32,
    /// Gaussian sigma across the elongated axis (default: 0.3)
    pub sigma_width: f32,
    /// Length sigma of the horizontal narrow-band kernels (default: 0.3)
    pub sigma_len_horiz: f32,
    /// Width sigma of the horizontal narrow-band kernels (default: 0.1)
    pub sigma_width_horiz: f32,
    /// Number of horizontal narrow-band kernels (default: 4)
    pub n_horiz: usize,
    /// Sine phase offset; PI/2 gives a symmetric cosine gabor (default: 0.0)
    pub phase_offset: f32,
    /// Zero the kernel outside the inscribed ellipse (default: true)
    pub circle_edge: bool,
}

impl GaborConfig {
    /// Defaults for scale 1, 2 or 3; only scale 1 is on by default
    pub fn scale(scale: usize) -> Self {
        let (on, size, space) = match scale {
            1 => (true, 6, 2),
            2 => (false, 12, 4),
            _ => (false, 18, 6),
        };
        Self {
            on,
            size_time: size,
            size_freq: size,
            space_time: space,
            space_freq: space,
            gain: 2.0,
            wave_len: 1.5,
            sigma_len: 0.6,
            sigma_width: 0.3,
            sigma_len_horiz: 0.3,
            sigma_width_horiz: 0.1,
            n_horiz: 4,
            phase_offset: 0.0,
            circle_edge: true,
        }
    }

    /// Total kernels: vertical + two diagonals + `n_horiz` horizontals
    pub fn n_filters(&self) -> usize {
        3 + self.n_horiz
    }

    /// Checks sizes and strides
    pub fn validate(&self) -> Result<(), DspError> {
        if !self.on {
            return Ok(());
        }
        if self.size_time == 0 || self.size_freq == 0 {
            return Err(DspError::Configuration("Gabor size must be > 0".to_string()));
        }
        if self.space_time == 0 || self.space_freq == 0 {
            return Err(DspError::Configuration("Gabor spacing must be > 0".to_string()));
        }
        if self.wave_len <= 0.0 || self.sigma_len <= 0.0 || self.sigma_width <= 0.0 {
            return Err(DspError::Configuration(
                "Gabor wavelength and sigmas must be > 0".to_string(),
            ));
        }
        if self.n_horiz > 0 && (self.sigma_len_horiz <= 0.0 || self.sigma_width_horiz <= 0.0) {
            return Err(DspError::Configuration(
                "Horizontal gabor sigmas must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Noisy x/(x+1) activation function parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Xx1Config {
    /// Threshold on the membrane potential (default: 0.5)
    pub thr: f32,
    /// Gain of the x/(x+1) function (default: 100.0)
    pub gain: f32,
    /// Variance of the gaussian noise convolved with the function (default: 0.005)
    pub nvar: f32,
    /// Multiplier on the sigmoid used below threshold (default: 0.33)
    pub sig_mult: f32,
    /// Power for the sigmoid multiplier (default: 0.8)
    pub sig_mult_pow: f32,
    /// Gain of the sigmoid below threshold (default: 3.0)
    pub sig_gain: f32,
    /// Interpolation range above zero (default: 0.01)
    pub interp_range: f32,
    /// Range over which gain correction is applied, in units of nvar (default: 10.0)
    pub gain_cor_range: f32,
    /// Gain correction factor (default: 0.1)
    pub gain_cor: f32,
}

impl Default for Xx1Config {
    fn default() -> Self {
        Self {
            thr: 0.5,
            gain: 100.0,
            nvar: 0.005,
            sig_mult: 0.33,
            sig_mult_pow: 0.8,
            sig_gain: 3.0,
            interp_range: 0.01,
            gain_cor_range: 10.0,
            gain_cor: 0.1,
        }
    }
}

/// k-winner-take-all style inhibition of the gabor outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KwtaConfig {
    /// Apply inhibition; when off the raw activations are copied (default: true)
    pub on: bool,
    /// Settling iterations (default: 20)
    pub iters: usize,
    /// Overall inhibition gain (default: 1.5)
    pub gi: f32,
    /// Feed-forward inhibition multiplier (default: 1.0)
    pub ff: f32,
    /// Feed-back inhibition multiplier (default: 1.0)
    pub fb: f32,
    /// Time constant of the feed-back integration (default: 1.4)
    pub fb_tau: f32,
    /// Mix of max vs average excitation driving feed-forward inhibition (default: 0.0)
    pub max_vs_avg: f32,
    /// Excitation offset below which there is no feed-forward inhibition (default: 0.1)
    pub ff0: f32,
    /// Activation integration time constant (default: 3.0)
    pub act_tau: f32,
    /// Excitatory maximal conductance (default: 0.5)
    pub gbar_e: f32,
    /// Leak maximal conductance (default: 0.2)
    pub gbar_l: f32,
    /// Inhibitory maximal conductance (default: 1.0)
    pub gbar_i: f32,
    /// Excitatory reversal potential (default: 1.0)
    pub erev_e: f32,
    /// Leak reversal potential (default: 0.3)
    pub erev_l: f32,
    /// Inhibitory reversal potential (default: 0.3)
    pub erev_i: f32,
    /// Activation function
    pub xx1: Xx1Config,
}

impl Default for KwtaConfig {
    fn default() -> Self {
        Self {
            on: true,
            iters: 20,
            gi: 1.5,
            ff: 1.0,
            fb: 1.0,
            fb_tau: 1.4,
            max_vs_avg: 0.0,
            ff0: 0.1,
            act_tau: 3.0,
            gbar_e: 0.5,
            gbar_l: 0.2,
            gbar_i: 1.0,
            erev_e: 1.0,
            erev_l: 0.3,
            erev_i: 0.3,
            xx1: Xx1Config::default(),
        }
    }
}

/// Complete auditory analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditoryConfig {
    /// Raw input geometry
    pub input: InputConfig,
    /// Power spectrum
    pub dft: DftConfig,
    /// Mel filter-bank
    pub mel: MelConfig,
    /// Mel cepstrum
    pub mfcc: MfccConfig,
    /// Three gabor scales
    pub gabor: [GaborConfig; 3],
    /// Inhibition applied to every gabor scale
    pub kwta: KwtaConfig,
    /// Prefix of every feature-table column name (default: "AudProc")
    pub column_prefix: String,
}

impl Default for AuditoryConfig {
    fn default() -> Self {
        Self {
            input: InputConfig::default(),
            dft: DftConfig::default(),
            mel: MelConfig::default(),
            mfcc: MfccConfig::default(),
            gabor: [
                GaborConfig::scale(1),
                GaborConfig::scale(2),
                GaborConfig::scale(3),
            ],
            kwta: KwtaConfig::default(),
            column_prefix: "AudProc".to_string(),
        }
    }
}

impl AuditoryConfig {
    /// Validates every section
    pub fn validate(&self) -> Result<(), DspError> {
        self.input.validate()?;
        if self.mel.on {
            if self.mel.n_filters == 0 {
                return Err(DspError::Configuration(
                    "Mel filter count must be > 0".to_string(),
                ));
            }
            if self.mel.lo_hz < 0.0 || self.mel.hi_hz <= self.mel.lo_hz {
                return Err(DspError::Configuration(format!(
                    "Invalid mel range: lo={} Hz, hi={} Hz",
                    self.mel.lo_hz, self.mel.hi_hz
                )));
            }
            if self.mel.renorm.on && self.mel.renorm.max <= self.mel.renorm.min {
                return Err(DspError::Configuration(format!(
                    "Invalid renormalization range: min={}, max={}",
                    self.mel.renorm.min, self.mel.renorm.max
                )));
            }
        }
        if self.mfcc.on && self.mfcc.n_coeff > self.mel.n_filters {
            return Err(DspError::Configuration(format!(
                "MFCC coefficient count {} exceeds mel filter count {}",
                self.mfcc.n_coeff, self.mel.n_filters
            )));
        }
        for gabor in &self.gabor {
            gabor.validate()?;
            if gabor.on && gabor.size_freq > self.mel.n_filters {
                return Err(DspError::Configuration(format!(
                    "Gabor frequency size {} exceeds mel filter count {}",
                    gabor.size_freq, self.mel.n_filters
                )));
            }
        }
        if self.kwta.on && (self.kwta.fb_tau <= 0.0 || self.kwta.act_tau <= 0.0) {
            return Err(DspError::Configuration(
                "Inhibition time constants must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Glottal source waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Waveform {
    /// Rosenberg-style glottal pulse
    Pulse,
    /// Pure sine tone
    Sine,
}

/// Static physical constants of the tube model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TractConfig {
    /// Air temperature in degrees Celsius (default: 32.0)
    pub temp: f32,
    /// Junction loss in percent (default: 0.8)
    pub loss: f32,
    /// Mouth aperture filter coefficient in Hz (default: 5000.0)
    pub mouth_coef: f32,
    /// Nose aperture filter coefficient in Hz (default: 5000.0)
    pub nose_coef: f32,
    /// Throat low-pass cutoff in Hz (default: 1500.0)
    pub throat_cutoff: f32,
    /// Throat volume in dB (default: 6.0)
    pub throat_vol: f32,
    /// Vocal tract length offset in cm (default: 0.0)
    pub vtl_off: f32,
    /// Glottal source waveform (default: Pulse)
    pub waveform: Waveform,
    /// Modulate noise with the glottal pulse (default: true)
    pub noise_mod: bool,
    /// Crossmix offset in dB (default: 48.0)
    pub mix_off: f32,
}

impl Default for TractConfig {
    fn default() -> Self {
        Self {
            temp: 32.0,
            loss: 0.8,
            mouth_coef: 5000.0,
            nose_coef: 5000.0,
            throat_cutoff: 1500.0,
            throat_vol: 6.0,
            vtl_off: 0.0,
            waveform: Waveform::Pulse,
            noise_mod: true,
            mix_off: 48.0,
        }
    }
}

/// Voice presets, each expanding to a fixed set of voice parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoicePreset {
    /// Adult male
    Male,
    /// Adult female
    Female,
    /// Large child
    ChildLarge,
    /// Small child
    ChildSmall,
    /// Baby
    Baby,
}

/// Articulatory synthesizer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthConfig {
    /// Master volume in dB, 0..60 (default: 60.0)
    pub volume: f32,
    /// Stereo balance, -1..1 (default: 0.0)
    pub balance: f32,
    /// Duration of one control frame in ms (default: 25.0)
    pub frame_ms: f32,
    /// Rate of the converted output buffer in Hz (default: 44100)
    pub output_rate: u32,
    /// Physical tube constants
    pub tract: TractConfig,
    /// Voice preset (default: Female)
    pub voice: VoicePreset,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            volume: 60.0,
            balance: 0.0,
            frame_ms: 25.0,
            output_rate: 44100,
            tract: TractConfig::default(),
            voice: VoicePreset::Female,
        }
    }
}

impl SynthConfig {
    /// Checks frame duration and output rate
    pub fn validate(&self) -> Result<(), DspError> {
        if self.frame_ms <= 0.0 {
            return Err(DspError::Configuration(format!(
                "Frame duration must be > 0, got {} ms",
                self.frame_ms
            )));
        }
        if self.output_rate == 0 {
            return Err(DspError::Configuration("Output rate must be > 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_geometry() {
        let geom = InputConfig::default().geometry();
        assert_eq!(geom.win_samples, 400);
        assert_eq!(geom.step_samples, 80);
        assert_eq!(geom.trial_samples, 1600);
        assert_eq!(geom.trial_steps, 20);
        assert_eq!(geom.total_steps, 44);
    }

    #[test]
    fn test_defaults_validate() {
        assert!(AuditoryConfig::default().validate().is_ok());
        assert!(SynthConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_mel_range() {
        let mut config = AuditoryConfig::default();
        config.mel.lo_hz = 5000.0;
        config.mel.hi_hz = 100.0;
        assert!(matches!(config.validate(), Err(DspError::Configuration(_))));
    }

    #[test]
    fn test_zero_gabor_spacing() {
        let mut config = AuditoryConfig::default();
        config.gabor[0].space_time = 0;
        assert!(config.validate().is_err());

        // Disabled scales are not checked
        config.gabor[0].on = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = AuditoryConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: AuditoryConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn test_ms_conversions() {
        assert_eq!(ms_to_samples(25.0, 16000), 400);
        assert_eq!(ms_to_samples(12.5, 44100), 551);
        assert!((samples_to_ms(80, 16000) - 5.0).abs() < 1e-6);
    }
}
