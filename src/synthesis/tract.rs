//! Waveguide vocal tract
//!
//! The oropharynx is ten tube sections grouped in eight radius regions; the
//! nasal cavity is six sections branching off the middle of region 4 at the
//! velum. Each section carries a top (rightward) and bottom (leftward)
//! pressure wave, double-buffered between the previous and the current
//! sample. Scattering coefficients follow the interpolated control radii
//! every sample.
//!
//! Synthesis proceeds one control frame at a time: the target frame set with
//! [`VocalTract::set_control`] is reached by a linear walk of
//! `control_period` samples from where the previous frame actually ended.
//!
//! # Example
//!
//! ```no_run
//! use vocalis_dsp::config::SynthConfig;
//! use vocalis_dsp::synthesis::control::ControlFrame;
//! use vocalis_dsp::synthesis::tract::VocalTract;
//!
//! let mut tract = VocalTract::new(SynthConfig::default())?;
//! tract.set_control(ControlFrame {
//!     glot_vol: 60.0,
//!     ..ControlFrame::default()
//! });
//! for _ in 0..20 {
//!     tract.synthesize(false)?;
//! }
//! tract.flush();
//! let scale = tract.mono_scale();
//! let samples: Vec<f32> = tract.take_output().iter().map(|s| s * scale).collect();
//! # Ok::<(), vocalis_dsp::DspError>(())
//! ```

use crate::config::{SynthConfig, VoicePreset, Waveform};
use crate::error::DspError;
use crate::synthesis::control::{ControlFrame, N_PARAMS};
use crate::synthesis::filters::{
    BandpassFilter, NoiseFilter, NoiseSource, RadiationFilter, ReflectionFilter, Throat,
};
use crate::synthesis::glottal::GlottalSource;
use crate::synthesis::resample::SampleRateConverter;
use crate::synthesis::voice::{amplitude, frequency, speed_of_sound, VoiceParams};

const TOTAL_SECTIONS: f32 = 10.0;
const ORO_SECTIONS: usize = 10;
const NASAL_SECTIONS: usize = 6;
const ORO_COEFS: usize = 8;
const NASAL_COEFS: usize = 6;
const FRIC_TAPS: usize = 8;
const VT_SCALE: f32 = 0.125;
const OUTPUT_SCALE: f32 = 0.95;
const MIN_RADIUS: f32 = 0.001;

const TOP: usize = 0;
const BOTTOM: usize = 1;

const ALPHA_LEFT: usize = 0;
const ALPHA_RIGHT: usize = 1;
const ALPHA_UPPER: usize = 2;

/// Which of the two pressure buffers holds the current sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PingPong {
    Even,
    Odd,
}

impl PingPong {
    fn index(self) -> usize {
        match self {
            PingPong::Even => 0,
            PingPong::Odd => 1,
        }
    }

    fn toggled(self) -> Self {
        match self {
            PingPong::Even => PingPong::Odd,
            PingPong::Odd => PingPong::Even,
        }
    }
}

type Sections<const N: usize> = [[f32; 2]; N];

/// Pressure state, junction coefficients and end filters of the tube
#[derive(Debug, Clone)]
struct Waveguide {
    oro: [Sections<ORO_SECTIONS>; 2],
    nasal: [Sections<NASAL_SECTIONS>; 2],
    current: PingPong,
    oro_coefs: [f32; ORO_COEFS],
    nasal_coefs: [f32; NASAL_COEFS],
    alpha: [f32; 3],
    fric_taps: [f32; FRIC_TAPS],
    damping: f32,
    mouth_radiation: RadiationFilter,
    mouth_reflection: ReflectionFilter,
    nasal_radiation: RadiationFilter,
    nasal_reflection: ReflectionFilter,
}

fn junction(ra: f32, rb: f32) -> f32 {
    let a2 = ra * ra;
    let b2 = rb * rb;
    let sum = a2 + b2;
    if sum > 0.0 {
        (a2 - b2) / sum
    } else {
        0.0
    }
}

impl Waveguide {
    fn new(voice: &VoiceParams, damping: f32, mouth_aperture: f32, nose_aperture: f32) -> Self {
        let mut nasal_coefs = [0.0; NASAL_COEFS];
        // Fixed sections; the first coefficient follows the velum
        for i in 1..NASAL_SECTIONS - 1 {
            nasal_coefs[i] = junction(voice.nose_radii[i - 1], voice.nose_radii[i]);
        }
        nasal_coefs[NASAL_COEFS - 1] = junction(voice.nose_radii[4], voice.aperture_radius);
        Self {
            oro: [[[0.0; 2]; ORO_SECTIONS]; 2],
            nasal: [[[0.0; 2]; NASAL_SECTIONS]; 2],
            current: PingPong::Odd,
            oro_coefs: [0.0; ORO_COEFS],
            nasal_coefs,
            alpha: [0.0; 3],
            fric_taps: [0.0; FRIC_TAPS],
            damping,
            mouth_radiation: RadiationFilter::new(mouth_aperture),
            mouth_reflection: ReflectionFilter::new(mouth_aperture),
            nasal_radiation: RadiationFilter::new(nose_aperture),
            nasal_reflection: ReflectionFilter::new(nose_aperture),
        }
    }

    /// Scattering coefficients for the current radii
    fn set_radii(&mut self, ctrl: &ControlFrame, voice: &VoiceParams) {
        let mut regions = [0.0f32; ORO_COEFS];
        regions[0] = voice.radius1;
        regions[1..].copy_from_slice(&ctrl.radii());
        for r in regions.iter_mut() {
            *r = r.max(MIN_RADIUS);
        }
        for i in 0..ORO_COEFS - 1 {
            self.oro_coefs[i] = junction(regions[i], regions[i + 1]);
        }
        self.oro_coefs[ORO_COEFS - 1] = junction(regions[7], voice.aperture_radius);

        // The velum junction sits in the middle of region 4
        let r0 = regions[3] * regions[3];
        let r2 = ctrl.velum * ctrl.velum;
        let sum = 2.0 / (2.0 * r0 + r2);
        self.alpha[ALPHA_LEFT] = sum * r0;
        self.alpha[ALPHA_RIGHT] = sum * r0;
        self.alpha[ALPHA_UPPER] = sum * r2;

        self.nasal_coefs[0] = junction(ctrl.velum, voice.nose_radii[0]);
    }

    /// Splits the frication amplitude between the two taps around `fric_pos`
    ///
    /// Negative positions put the whole amplitude on tap 0. Positions at or
    /// past the last tap inject no frication, and between 7 and 8 only tap 7
    /// gets its share.
    fn set_frication(&mut self, ctrl: &ControlFrame) {
        let amp = amplitude(ctrl.fric_vol);
        let pos = ctrl.fric_pos.max(0.0);
        let int_part = pos.trunc() as usize;
        let complement = pos - pos.trunc();
        let remainder = 1.0 - complement;
        self.fric_taps = [0.0; FRIC_TAPS];
        if int_part < FRIC_TAPS {
            self.fric_taps[int_part] = remainder * amp;
            if int_part + 1 < FRIC_TAPS {
                self.fric_taps[int_part + 1] = complement * amp;
            }
        }
    }

    /// Advances every section by one sample and returns mouth + nose output
    fn step(&mut self, input: f32, frication: f32) -> f32 {
        self.current = self.current.toggled();
        let cur = self.current.index();
        let prv = self.current.toggled().index();
        let d = self.damping;
        let k = &self.oro_coefs;
        let tap = &self.fric_taps;
        let p = self.oro[prv];
        let pn = self.nasal[prv];
        let c = &mut self.oro[cur];
        let n = &mut self.nasal[cur];

        c[0][TOP] = p[0][BOTTOM] * d + input;

        let delta = k[0] * (p[0][TOP] - p[1][BOTTOM]);
        c[1][TOP] = (p[0][TOP] + delta) * d;
        c[0][BOTTOM] = (p[1][BOTTOM] + delta) * d;

        for i in 1..3 {
            let delta = k[i] * (p[i][TOP] - p[i + 1][BOTTOM]);
            c[i + 1][TOP] = (p[i][TOP] + delta) * d + tap[i - 1] * frication;
            c[i][BOTTOM] = (p[i + 1][BOTTOM] + delta) * d;
        }

        // Three-way junction: sections 4/5 and the velum
        let jp = self.alpha[ALPHA_LEFT] * p[3][TOP]
            + self.alpha[ALPHA_RIGHT] * p[4][BOTTOM]
            + self.alpha[ALPHA_UPPER] * pn[0][BOTTOM];
        c[3][BOTTOM] = (jp - p[3][TOP]) * d;
        c[4][TOP] = (jp - p[4][BOTTOM]) * d + tap[2] * frication;
        n[0][TOP] = (jp - pn[0][BOTTOM]) * d;

        let delta = k[3] * (p[4][TOP] - p[5][BOTTOM]);
        c[5][TOP] = (p[4][TOP] + delta) * d + tap[3] * frication;
        c[4][BOTTOM] = (p[5][BOTTOM] + delta) * d;

        // Inside region 5: pure delay
        c[6][TOP] = p[5][TOP] * d + tap[4] * frication;
        c[5][BOTTOM] = p[6][BOTTOM] * d;

        for i in 6..9 {
            let delta = k[i - 2] * (p[i][TOP] - p[i + 1][BOTTOM]);
            c[i + 1][TOP] = (p[i][TOP] + delta) * d + tap[i - 1] * frication;
            c[i][BOTTOM] = (p[i + 1][BOTTOM] + delta) * d;
        }

        let mouth = k[ORO_COEFS - 1];
        c[9][BOTTOM] = d * self.mouth_reflection.process(mouth * p[9][TOP]);
        let mut output = self.mouth_radiation.process((1.0 + mouth) * p[9][TOP]);

        let nk = &self.nasal_coefs;
        for i in 0..NASAL_SECTIONS - 1 {
            let delta = nk[i] * (pn[i][TOP] - pn[i + 1][BOTTOM]);
            n[i + 1][TOP] = (pn[i][TOP] + delta) * d;
            n[i][BOTTOM] = (pn[i + 1][BOTTOM] + delta) * d;
        }
        let nose = nk[NASAL_COEFS - 1];
        n[5][BOTTOM] = d * self.nasal_reflection.process(nose * pn[5][TOP]);
        output += self.nasal_radiation.process((1.0 + nose) * pn[5][TOP]);

        output
    }

    /// Sum of squared pressures in the current buffer
    fn energy(&self) -> f32 {
        let cur = self.current.index();
        let oro: f32 = self.oro[cur].iter().flatten().map(|v| v * v).sum();
        let nasal: f32 = self.nasal[cur].iter().flatten().map(|v| v * v).sum();
        oro + nasal
    }
}

/// Articulatory synthesizer over the waveguide tube
#[derive(Debug, Clone)]
pub struct VocalTract {
    config: SynthConfig,
    voice: VoiceParams,

    target: ControlFrame,
    previous: ControlFrame,
    current: ControlFrame,
    delta: ControlFrame,

    control_rate: f32,
    control_period: usize,
    sample_rate: f32,
    actual_tube_length: f32,
    initialized_rate: Option<f32>,

    breathiness_factor: f32,
    crossmix_factor: f32,
    prev_glot_amplitude: f32,

    tube: Waveguide,
    glottal: GlottalSource,
    throat: Throat,
    bandpass: BandpassFilter,
    noise_filter: NoiseFilter,
    noise: NoiseSource,
    converter: SampleRateConverter,
}

impl VocalTract {
    /// Creates and initializes a synthesizer
    ///
    /// # Errors
    ///
    /// Returns `DspError::Configuration` for an invalid configuration or a
    /// non-positive tract length.
    pub fn new(config: SynthConfig) -> Result<Self, DspError> {
        config.validate()?;
        let voice = VoiceParams::from_preset(config.voice);
        let parts = Derived::compute(&config, &voice)?;
        let frame = ControlFrame::default();
        let mut tract = Self {
            voice,
            target: frame,
            previous: frame,
            current: frame,
            delta: ControlFrame::from_array([0.0; N_PARAMS]),
            control_rate: parts.control_rate,
            control_period: parts.control_period,
            sample_rate: parts.sample_rate,
            actual_tube_length: parts.actual_tube_length,
            initialized_rate: Some(parts.control_rate),
            breathiness_factor: parts.breathiness_factor,
            crossmix_factor: parts.crossmix_factor,
            prev_glot_amplitude: -1.0,
            tube: parts.tube,
            glottal: parts.glottal,
            throat: parts.throat,
            bandpass: BandpassFilter::new(),
            noise_filter: NoiseFilter::new(),
            noise: NoiseSource::new(),
            converter: parts.converter,
            config,
        };
        tract.log_init();
        Ok(tract)
    }

    /// Resets all state and recomputes the rates for the current frame duration
    ///
    /// The previous frame is set to the target so the next frame starts
    /// without interpolation.
    ///
    /// # Errors
    ///
    /// Returns `DspError::Configuration` for a non-positive tract length or
    /// frame duration.
    pub fn init_synth(&mut self) -> Result<(), DspError> {
        self.config.validate()?;
        let parts = Derived::compute(&self.config, &self.voice)?;
        self.control_rate = parts.control_rate;
        self.control_period = parts.control_period;
        self.sample_rate = parts.sample_rate;
        self.actual_tube_length = parts.actual_tube_length;
        self.breathiness_factor = parts.breathiness_factor;
        self.crossmix_factor = parts.crossmix_factor;
        self.tube = parts.tube;
        self.glottal = parts.glottal;
        self.throat = parts.throat;
        self.converter = parts.converter;
        self.bandpass.reset();
        self.noise_filter.reset();
        self.noise.reset();
        self.prev_glot_amplitude = -1.0;
        self.initialized_rate = Some(self.control_rate);

        self.previous = self.target;
        self.current = self.target;
        self.log_init();
        Ok(())
    }

    fn log_init(&self) {
        log::debug!(
            "Vocal tract: control rate {:.1} Hz, period {} samples, tube rate {} Hz, length {:.2} cm",
            self.control_rate,
            self.control_period,
            self.sample_rate,
            self.actual_tube_length
        );
    }

    /// Selects a voice preset and re-initializes
    ///
    /// # Errors
    ///
    /// See [`VocalTract::init_synth`].
    pub fn set_voice(&mut self, preset: VoicePreset) -> Result<(), DspError> {
        self.config.voice = preset;
        self.voice = VoiceParams::from_preset(preset);
        self.init_synth()
    }

    /// Replaces the configuration and re-initializes
    ///
    /// # Errors
    ///
    /// See [`VocalTract::init_synth`].
    pub fn set_config(&mut self, config: SynthConfig) -> Result<(), DspError> {
        self.voice = VoiceParams::from_preset(config.voice);
        self.config = config;
        self.init_synth()
    }

    /// Changes the control frame duration; applied at the next frame
    pub fn set_frame_ms(&mut self, frame_ms: f32) {
        self.config.frame_ms = frame_ms;
    }

    /// Sets the target of the next frame
    pub fn set_control(&mut self, frame: ControlFrame) {
        self.target = frame;
    }

    /// Sets the target from floats in frame order
    ///
    /// # Errors
    ///
    /// Returns `DspError::InvalidInput` if fewer than 15 values are given.
    pub fn set_control_from_floats(&mut self, vals: &[f32], normalized: bool) -> Result<(), DspError> {
        self.target.set_from_floats(vals, normalized)
    }

    /// Target of the next frame
    pub fn control(&self) -> &ControlFrame {
        &self.target
    }

    /// Interpolated parameters of the next sample
    pub fn current(&self) -> &ControlFrame {
        &self.current
    }

    /// Parameters the last frame ended at
    pub fn previous(&self) -> &ControlFrame {
        &self.previous
    }

    /// Configuration in use
    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Voice constants in use
    pub fn voice(&self) -> &VoiceParams {
        &self.voice
    }

    /// Control frames per second
    pub fn control_rate(&self) -> f32 {
        self.control_rate
    }

    /// Tube samples per control frame
    pub fn control_period(&self) -> usize {
        self.control_period
    }

    /// Tube sample rate in Hz
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Tube length implied by the rounded control period, in cm
    pub fn actual_tube_length(&self) -> f32 {
        self.actual_tube_length
    }

    fn needs_init(&self) -> bool {
        let rate = 1000.0 / self.config.frame_ms;
        self.initialized_rate != Some(rate) || self.control_period == 0
    }

    /// Synthesizes one control frame
    ///
    /// A changed frame duration re-initializes first. With `reset_first` the
    /// tube is reset before the frame.
    ///
    /// # Errors
    ///
    /// Returns `DspError::Configuration` if re-initialization fails.
    pub fn synthesize(&mut self, reset_first: bool) -> Result<(), DspError> {
        if self.needs_init() {
            log::warn!(
                "Control rate changed to {:.1} Hz; re-initializing tract",
                1000.0 / self.config.frame_ms
            );
            self.init_synth()?;
        } else if reset_first {
            self.init_synth()?;
        }
        self.begin_frame();
        for _ in 0..self.control_period {
            self.tick();
        }
        self.end_frame();
        Ok(())
    }

    /// Computes the per-sample deltas toward the target
    pub fn begin_frame(&mut self) {
        self.delta = ControlFrame::deltas(&self.target, &self.previous, self.control_period);
    }

    /// Synthesizes one tube sample, then advances the interpolation
    ///
    /// Returns the sample pushed into the rate converter.
    pub fn tick(&mut self) -> f32 {
        let ctrl = self.current;
        let f0 = frequency(ctrl.glot_pitch);
        let ax = amplitude(ctrl.glot_vol);
        let ah1 = amplitude(ctrl.asp_vol);
        self.tube.set_radii(&ctrl, &self.voice);
        self.tube.set_frication(&ctrl);
        self.bandpass.update(self.sample_rate, ctrl.fric_bw, ctrl.fric_cf);

        let lp_noise = self.noise_filter.process(self.noise.next_sample());

        if self.config.tract.waveform == Waveform::Pulse && ax != self.prev_glot_amplitude {
            self.glottal.update_wavetable(ax);
        }
        let pulse = self.glottal.next_sample(f0);
        let pulsed_noise = lp_noise * pulse;
        let pulse = ax
            * (pulse * (1.0 - self.breathiness_factor) + pulsed_noise * self.breathiness_factor);

        let noise = if self.config.tract.noise_mod {
            let crossmix = (ax * self.crossmix_factor).min(1.0);
            pulsed_noise * crossmix + lp_noise * (1.0 - crossmix)
        } else {
            lp_noise
        };

        let frication = self.bandpass.process(noise);
        let mut signal = self.tube.step((pulse + ah1 * noise) * VT_SCALE, frication);
        signal += self.throat.process(pulse * VT_SCALE);

        self.converter.push(signal);
        self.prev_glot_amplitude = ax;
        self.current.step(&self.delta);
        signal
    }

    /// Ends the frame at the parameters actually reached
    pub fn end_frame(&mut self) {
        self.previous = self.current;
    }

    /// Converts everything still buffered in the rate converter
    pub fn flush(&mut self) {
        self.converter.flush();
    }

    /// Unscaled output at the configured output rate
    pub fn output(&self) -> &[f32] {
        self.converter.output()
    }

    /// Takes the unscaled output; the peak used for scaling is kept
    pub fn take_output(&mut self) -> Vec<f32> {
        self.converter.take_output()
    }

    /// Gain bringing the output peak to 0.95 at full volume
    ///
    /// Returns 0.0 while the output is silent.
    pub fn mono_scale(&self) -> f32 {
        let max = self.converter.max_sample();
        if max <= 0.0 {
            return 0.0;
        }
        OUTPUT_SCALE / max * amplitude(self.config.volume)
    }

    /// Left and right gains for the configured balance
    pub fn stereo_scale(&self) -> (f32, f32) {
        let balance = self.config.balance;
        let left = -(balance / 2.0 - 0.5);
        let right = balance / 2.0 + 0.5;
        let new_max = self.converter.max_sample() * if balance > 0.0 { right } else { left };
        if new_max <= 0.0 {
            return (0.0, 0.0);
        }
        let scale = OUTPUT_SCALE / new_max * amplitude(self.config.volume);
        (left * scale, right * scale)
    }

    /// Output multiplied by [`VocalTract::mono_scale`]
    pub fn scaled_output(&self) -> Vec<f32> {
        let scale = self.mono_scale();
        self.output().iter().map(|s| s * scale).collect()
    }

    /// Sum of squared pressures in the tube
    pub fn tube_energy(&self) -> f32 {
        self.tube.energy()
    }
}

/// Rates and components derived from the configuration and voice
struct Derived {
    control_rate: f32,
    control_period: usize,
    sample_rate: f32,
    actual_tube_length: f32,
    breathiness_factor: f32,
    crossmix_factor: f32,
    tube: Waveguide,
    glottal: GlottalSource,
    throat: Throat,
    converter: SampleRateConverter,
}

impl Derived {
    fn compute(config: &SynthConfig, voice: &VoiceParams) -> Result<Self, DspError> {
        let tract = &config.tract;
        let length = voice.tract_length + tract.vtl_off;
        if length <= 0.0 {
            return Err(DspError::Configuration(format!(
                "Illegal tube length {} cm",
                length
            )));
        }
        let control_rate = 1000.0 / config.frame_ms;
        let c = speed_of_sound(tract.temp);
        let control_period = (c * TOTAL_SECTIONS * 100.0 / (length * control_rate)).round();
        if control_period.is_nan() || control_period < 1.0 {
            return Err(DspError::Configuration(format!(
                "Control period {} samples (length {} cm, rate {} Hz)",
                control_period, length, control_rate
            )));
        }
        let control_period = control_period as usize;
        let sample_rate = control_rate * control_period as f32;
        let actual_tube_length = c * TOTAL_SECTIONS * 100.0 / sample_rate;
        let nyquist = sample_rate / 2.0;

        let mix = amplitude(tract.mix_off);
        if mix <= 0.0 {
            return Err(DspError::Configuration(format!(
                "Crossmix offset {} dB gives zero amplitude",
                tract.mix_off
            )));
        }

        let glottal = GlottalSource::new(
            tract.waveform,
            sample_rate,
            voice.glot_pulse_rise,
            voice.glot_pulse_fall_min,
            voice.glot_pulse_fall_max,
        )?;

        Ok(Self {
            control_rate,
            control_period,
            sample_rate,
            actual_tube_length,
            breathiness_factor: voice.breathiness / 100.0,
            crossmix_factor: 1.0 / mix,
            tube: Waveguide::new(
                voice,
                1.0 - tract.loss / 100.0,
                (nyquist - tract.mouth_coef) / nyquist,
                (nyquist - tract.nose_coef) / nyquist,
            ),
            glottal,
            throat: Throat::new(sample_rate, tract.throat_cutoff, amplitude(tract.throat_vol)),
            converter: SampleRateConverter::new(sample_rate, config.output_rate as f32),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voiced() -> ControlFrame {
        ControlFrame {
            glot_vol: 60.0,
            ..ControlFrame::default()
        }
    }

    #[test]
    fn test_female_rates() {
        let tract = VocalTract::new(SynthConfig::default()).unwrap();
        // 350.6 m/s * 1000 / (15 cm * 40 Hz) = 584.3
        assert_eq!(tract.control_period(), 584);
        assert_eq!(tract.sample_rate(), 23360.0);
        assert!((tract.actual_tube_length() - 15.0).abs() < 0.05);
    }

    #[test]
    fn test_voice_changes_rate() {
        let mut tract = VocalTract::new(SynthConfig::default()).unwrap();
        tract.set_voice(VoicePreset::Male).unwrap();
        assert_eq!(tract.control_period(), 501);
        tract.set_voice(VoicePreset::Baby).unwrap();
        assert_eq!(tract.control_period(), 1169);
    }

    #[test]
    fn test_illegal_tube_length() {
        let mut config = SynthConfig::default();
        config.tract.vtl_off = -20.0;
        assert!(matches!(
            VocalTract::new(config),
            Err(DspError::Configuration(_))
        ));
    }

    #[test]
    fn test_silence_stays_silent() {
        let mut tract = VocalTract::new(SynthConfig::default()).unwrap();
        for _ in 0..3 {
            tract.synthesize(false).unwrap();
            assert_eq!(tract.tube_energy(), 0.0);
        }
        tract.flush();
        assert!(tract.output().iter().all(|&s| s == 0.0));
        assert_eq!(tract.mono_scale(), 0.0);
    }

    #[test]
    fn test_impulse_decays() {
        let voice = VoiceParams::from_preset(VoicePreset::Female);
        let mut tube = Waveguide::new(&voice, 0.992, 0.57, 0.57);
        tube.set_radii(&ControlFrame::default(), &voice);
        tube.step(1.0, 0.0);
        let mut peak = 0.0f32;
        for _ in 0..50 {
            tube.step(0.0, 0.0);
            peak = peak.max(tube.energy());
        }
        for _ in 0..1000 {
            let out = tube.step(0.0, 0.0);
            assert!(out.is_finite());
        }
        let end = tube.energy();
        assert!(end < 0.01 * peak, "energy {} after decay, peak {}", end, peak);
    }

    #[test]
    fn test_frication_taps_split() {
        let voice = VoiceParams::from_preset(VoicePreset::Female);
        let mut tube = Waveguide::new(&voice, 0.992, 0.57, 0.57);
        let ctrl = ControlFrame {
            fric_vol: 60.0,
            fric_pos: 4.25,
            ..ControlFrame::default()
        };
        tube.set_frication(&ctrl);
        assert!((tube.fric_taps[4] - 0.75).abs() < 1e-6);
        assert!((tube.fric_taps[5] - 0.25).abs() < 1e-6);
        assert_eq!(tube.fric_taps.iter().filter(|&&t| t != 0.0).count(), 2);
    }

    #[test]
    fn test_frication_position_out_of_range() {
        let voice = VoiceParams::from_preset(VoicePreset::Female);
        let mut tube = Waveguide::new(&voice, 0.992, 0.57, 0.57);
        let mut ctrl = ControlFrame {
            fric_vol: 60.0,
            fric_pos: -1.5,
            ..ControlFrame::default()
        };
        tube.set_frication(&ctrl);
        assert!((tube.fric_taps[0] - 1.0).abs() < 1e-6);
        assert!(tube.fric_taps[1..].iter().all(|&t| t == 0.0));

        ctrl.fric_pos = 7.5;
        tube.set_frication(&ctrl);
        assert!((tube.fric_taps[7] - 0.5).abs() < 1e-6);
        assert_eq!(tube.fric_taps.iter().filter(|&&t| t != 0.0).count(), 1);

        ctrl.fric_pos = 9.0;
        tube.set_frication(&ctrl);
        assert!(tube.fric_taps.iter().all(|&t| t == 0.0));
    }

    #[test]
    fn test_alpha_weights() {
        let voice = VoiceParams::from_preset(VoicePreset::Female);
        let mut tube = Waveguide::new(&voice, 0.992, 0.57, 0.57);
        tube.set_radii(&ControlFrame::default(), &voice);
        let sum: f32 = tube.alpha.iter().sum();
        assert!((sum - 2.0).abs() < 1e-6);
        // Equal radii on both sides: no reflection
        assert_eq!(tube.oro_coefs[2], 0.0);
    }

    #[test]
    fn test_interpolation_lags_target() {
        let mut tract = VocalTract::new(SynthConfig::default()).unwrap();
        let q = tract.control_period();
        tract.set_control(ControlFrame {
            glot_pitch: 10.0,
            ..ControlFrame::default()
        });
        tract.begin_frame();
        let mut last = 0.0;
        for k in 0..q {
            let pitch = tract.current().glot_pitch;
            assert!((pitch - 10.0 * k as f32 / q as f32).abs() < 1e-3);
            last = pitch;
            tract.tick();
        }
        tract.end_frame();
        assert!((last - 10.0 * (q - 1) as f32 / q as f32).abs() < 1e-3);
        assert!((tract.previous().glot_pitch - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_frame_duration_resync() {
        let mut tract = VocalTract::new(SynthConfig::default()).unwrap();
        tract.set_frame_ms(20.0);
        tract.synthesize(false).unwrap();
        assert_eq!(tract.control_period(), 467);
        assert_eq!(tract.control_rate(), 50.0);
    }

    #[test]
    fn test_voiced_output_scales() {
        let mut tract = VocalTract::new(SynthConfig::default()).unwrap();
        tract.set_control(voiced());
        for _ in 0..10 {
            tract.synthesize(false).unwrap();
        }
        tract.flush();
        assert!(!tract.output().is_empty());
        let peak = tract
            .scaled_output()
            .iter()
            .fold(0.0f32, |m, s| m.max(s.abs()));
        assert!((peak - 0.95).abs() < 1e-3, "scaled peak {}", peak);
        let (l, r) = tract.stereo_scale();
        assert_eq!(l, r);
        // Centered balance: each side alone reaches full scale
        let mono = tract.mono_scale();
        assert!((l - mono).abs() < 1e-5 * mono);
    }
}
