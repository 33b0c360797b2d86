//! Trial driver for auditory analysis
//!
//! An [`AuditoryProcessor`] owns every derived buffer of the pipeline. A sound
//! is loaded once and consumed trial by trial: each trial spans
//! `2 * border_steps + trial_steps` analysis steps. The first trial of a
//! sound computes every step; later trials copy the trailing
//! `2 * border_steps` steps of the previous trial to the front and only compute
//! the rest, so the window positions analyzed are exactly those of one
//! continuous pass.
//!
//! # Example
//!
//! ```no_run
//! use vocalis_dsp::analysis::processor::AuditoryProcessor;
//! use vocalis_dsp::config::AuditoryConfig;
//! use vocalis_dsp::io::feature_table::FeatureTable;
//! use vocalis_dsp::io::sample_buffer::AudioSource;
//!
//! let mut proc = AuditoryProcessor::new(AuditoryConfig::default())?;
//! proc.load_sound(&AudioSource::mono(vec![0.0; 16000], 16000))?;
//!
//! let mut table = FeatureTable::new();
//! while proc.input_steps_left() > 0 {
//!     proc.process_trial(&mut table)?;
//! }
//! # Ok::<(), vocalis_dsp::DspError>(())
//! ```

use crate::analysis::output::{column_name, write_gabor, write_steps};
use crate::analysis::tensor::{GaborTensor, TrialTensor};
use crate::config::{AuditoryConfig, InputGeometry};
use crate::error::DspError;
use crate::features::dft::PowerSpectrum;
use crate::features::gabor::{GaborGeometry, GaborKernels};
use crate::features::kwta::Inhibition;
use crate::features::mel::MelFilterBank;
use crate::features::mfcc::MelCepstrum;
use crate::io::feature_table::FeatureSink;
use crate::io::sample_buffer::{AudioSource, SampleBuffer};

/// One enabled gabor scale with its trial buffers
#[derive(Debug)]
struct GaborScale {
    kernels: GaborKernels,
    geom: GaborGeometry,
    raw: GaborTensor,
    out: GaborTensor,
}

/// Derived state; rebuilt whenever the input geometry changes
#[derive(Debug)]
struct Pipeline {
    geom: InputGeometry,
    channels: usize,
    dft: PowerSpectrum,
    mel: Option<MelFilterBank>,
    mfcc: Option<MelCepstrum>,
    gabors: [Option<GaborScale>; 3],
    inhibition: Inhibition,

    window: Vec<f32>,
    power_step: Vec<f32>,
    log_power_step: Vec<f32>,
    mel_step: Vec<f32>,
    mfcc_step: Vec<f32>,

    dft_power_trial: TrialTensor,
    dft_log_power_trial: Option<TrialTensor>,
    mel_trial: Option<TrialTensor>,
    mfcc_trial: Option<TrialTensor>,
}

impl Pipeline {
    fn build(config: &AuditoryConfig) -> Result<Self, DspError> {
        config.validate()?;
        let geom = config.input.geometry();
        let channels = processed_channels(config);
        let total = geom.total_steps;

        let dft = PowerSpectrum::new(geom.win_samples, channels, config.dft.clone())?;
        let dft_use = dft.dft_use();

        let mel = if config.mel.on {
            Some(MelFilterBank::new(
                &config.mel,
                dft_use,
                config.input.sample_rate,
            )?)
        } else {
            None
        };
        let n_mel = config.mel.n_filters;
        let mfcc = match (&mel, config.mfcc.on) {
            (Some(_), true) => Some(MelCepstrum::new(n_mel)?),
            _ => None,
        };

        let mut gabors: [Option<GaborScale>; 3] = [None, None, None];
        if mel.is_some() {
            for (slot, gcfg) in gabors.iter_mut().zip(config.gabor.iter()) {
                if !gcfg.on {
                    continue;
                }
                let kernels = GaborKernels::render(gcfg)?;
                let g = kernels.geometry(config.input.border_steps, geom.trial_steps, n_mel);
                kernels.check_fit(&g, total)?;
                let nf = kernels.n_filters();
                *slot = Some(GaborScale {
                    raw: GaborTensor::new(channels, nf, g.freq_taps, g.time_taps),
                    out: GaborTensor::new(channels, nf, g.freq_taps, g.time_taps),
                    kernels,
                    geom: g,
                });
            }
        }

        log::debug!(
            "Auditory pipeline: win={} step={} trial={} steps ({} total), {} channel(s), {} DFT bins",
            geom.win_samples,
            geom.step_samples,
            geom.trial_steps,
            total,
            channels,
            dft_use
        );

        Ok(Self {
            geom,
            channels,
            window: vec![0.0; geom.win_samples],
            power_step: vec![0.0; dft_use],
            log_power_step: vec![0.0; dft_use],
            mel_step: vec![0.0; n_mel],
            mfcc_step: vec![0.0; n_mel],
            dft_power_trial: TrialTensor::new(dft_use, total, channels),
            dft_log_power_trial: config
                .dft
                .log_pow
                .then(|| TrialTensor::new(dft_use, total, channels)),
            mel_trial: mel.as_ref().map(|_| TrialTensor::new(n_mel, total, channels)),
            mfcc_trial: mfcc.as_ref().map(|_| TrialTensor::new(n_mel, total, channels)),
            dft,
            mel,
            mfcc,
            gabors,
            inhibition: Inhibition::new(&config.kwta),
        })
    }
}

fn processed_channels(config: &AuditoryConfig) -> usize {
    if config.input.channels > 1 {
        config.input.channels
    } else {
        1
    }
}

/// Auditory analysis state machine over one loaded sound at a time
#[derive(Debug)]
pub struct AuditoryProcessor {
    config: AuditoryConfig,
    pipeline: Option<Pipeline>,
    sound: Vec<SampleBuffer>,
    input_pos: usize,
    trial_start_pos: usize,
    trial_end_pos: usize,
}

impl AuditoryProcessor {
    /// Creates a processor and derives all filters and buffers
    ///
    /// # Errors
    ///
    /// Returns `DspError::Configuration` for an invalid configuration,
    /// including degenerate mel filters.
    pub fn new(config: AuditoryConfig) -> Result<Self, DspError> {
        let mut proc = Self {
            config,
            pipeline: None,
            sound: Vec::new(),
            input_pos: 0,
            trial_start_pos: 0,
            trial_end_pos: 0,
        };
        proc.init()?;
        Ok(proc)
    }

    /// Current configuration
    pub fn config(&self) -> &AuditoryConfig {
        &self.config
    }

    /// Replaces the configuration; buffers are rebuilt lazily if the geometry changed
    ///
    /// # Errors
    ///
    /// Returns `DspError::Configuration` if the new configuration is invalid.
    pub fn set_config(&mut self, config: AuditoryConfig) -> Result<(), DspError> {
        config.validate()?;
        let rebuild = config != self.config;
        self.config = config;
        if rebuild {
            self.pipeline = None;
        }
        Ok(())
    }

    /// True when the derived buffers do not match the configured geometry
    pub fn needs_init(&self) -> bool {
        match &self.pipeline {
            None => true,
            Some(p) => {
                let n_mel = p.mel.as_ref().map(|m| m.n_filters()).unwrap_or(0);
                let want_mel = if self.config.mel.on {
                    self.config.mel.n_filters
                } else {
                    0
                };
                p.geom != self.config.input.geometry()
                    || n_mel != want_mel
                    || p.channels != processed_channels(&self.config)
            }
        }
    }

    /// Rebuilds filters and trial buffers and rewinds the loaded sound
    ///
    /// # Errors
    ///
    /// Returns `DspError::Configuration` for an invalid configuration.
    pub fn init(&mut self) -> Result<(), DspError> {
        self.pipeline = Some(Pipeline::build(&self.config)?);
        self.start_new_sound();
        Ok(())
    }

    fn start_new_sound(&mut self) {
        self.input_pos = 0;
        self.trial_start_pos = 0;
        self.trial_end_pos = self.config.input.geometry().trial_samples;
    }

    /// Loads a decoded sound and rewinds to its start
    ///
    /// A sample rate different from the configured one is adopted and the
    /// pipeline re-initialized. If no pipeline can be built at that rate the
    /// processor keeps its previous configuration and sound.
    ///
    /// # Errors
    ///
    /// Returns `DspError::InvalidInput` if the sound lacks the configured
    /// channels, or `DspError::Configuration` if re-initialization fails.
    pub fn load_sound(&mut self, source: &AudioSource) -> Result<(), DspError> {
        let buffers = source.deinterleave()?;
        let input = &self.config.input;
        let selected: Vec<SampleBuffer> = if input.channels > 1 {
            if buffers.len() < input.channels {
                return Err(DspError::InvalidInput(format!(
                    "Sound has {} channels, {} configured",
                    buffers.len(),
                    input.channels
                )));
            }
            buffers.into_iter().take(input.channels).collect()
        } else {
            let ch = input.channel;
            let count = buffers.len();
            let buffer = buffers.into_iter().nth(ch).ok_or_else(|| {
                DspError::InvalidInput(format!("Channel {} requested, sound has {}", ch, count))
            })?;
            vec![buffer]
        };

        if source.sample_rate != self.config.input.sample_rate {
            log::warn!(
                "Sound sample rate {} Hz does not match {} Hz; re-initializing",
                source.sample_rate,
                self.config.input.sample_rate
            );
            // Keep the current config and pipeline if the new rate is unusable
            let mut config = self.config.clone();
            config.input.sample_rate = source.sample_rate;
            let pipeline = Pipeline::build(&config)?;
            self.config = config;
            self.pipeline = Some(pipeline);
        } else if self.needs_init() {
            self.init()?;
        }

        log::debug!(
            "Loaded sound: {} frames x {} channel(s) at {} Hz",
            source.frames(),
            selected.len(),
            source.sample_rate
        );
        self.sound = selected;
        self.start_new_sound();
        Ok(())
    }

    /// Whole steps of unconsumed input remaining
    pub fn input_steps_left(&self) -> usize {
        let frames = self.sound.first().map(SampleBuffer::len).unwrap_or(0);
        let step = self.config.input.geometry().step_samples;
        if step == 0 {
            return 0;
        }
        frames.saturating_sub(self.input_pos) / step
    }

    /// Processes one trial and writes it as a new sink row
    ///
    /// # Returns
    ///
    /// Index of the row written
    ///
    /// # Errors
    ///
    /// Returns `DspError::InsufficientInput` (recoverable, nothing modified)
    /// when less than one step of input remains, and `DspError::ShapeOverflow`
    /// if a gabor tap falls outside its tensor.
    pub fn process_trial(&mut self, sink: &mut dyn FeatureSink) -> Result<usize, DspError> {
        if self.needs_init() {
            self.init()?;
        }
        if self.input_steps_left() < 1 {
            return Err(DspError::InsufficientInput(format!(
                "no full step of input left at sample {}; load a new sound",
                self.input_pos
            )));
        }
        let pipeline = self
            .pipeline
            .as_mut()
            .ok_or_else(|| DspError::Configuration("Pipeline not initialized".to_string()))?;
        let geom = pipeline.geom;
        let border = 2 * self.config.input.border_steps;
        let start_pos = self.input_pos;
        let first_trial = start_pos == 0;
        let first_step = if first_trial { 0 } else { border };

        // Sample position of step 0 of this trial
        let base = start_pos.saturating_sub(first_step * geom.step_samples);
        let trial_start = base + self.config.input.border_steps * geom.step_samples;

        let mut end_pos = start_pos;
        for ch in 0..pipeline.channels {
            let mut pos = start_pos;
            if !first_trial {
                pipeline.wrap_border(ch, border);
            }
            for s in first_step..geom.total_steps {
                pipeline.process_step(&self.sound[ch], ch, s, pos)?;
                pos += geom.step_samples;
            }
            pipeline.filter_trial(ch)?;
            end_pos = pos;
        }
        self.input_pos = end_pos;
        self.trial_start_pos = trial_start;
        self.trial_end_pos = trial_start + geom.trial_samples;

        log::debug!(
            "Processed trial: samples {}..{}, next input at {}",
            self.trial_start_pos,
            self.trial_end_pos,
            self.input_pos
        );

        let row = sink.add_row();
        for ch in 0..pipeline.channels {
            pipeline.output(&self.config, sink, row, ch)?;
        }
        Ok(row)
    }

    /// Next unconsumed sample position
    pub fn input_pos(&self) -> usize {
        self.input_pos
    }

    /// First sample of the current trial (excluding the leading border)
    pub fn trial_start_pos(&self) -> usize {
        self.trial_start_pos
    }

    /// One past the last sample of the current trial (excluding the trailing border)
    pub fn trial_end_pos(&self) -> usize {
        self.trial_end_pos
    }

    /// Sample geometry in use
    pub fn geometry(&self) -> InputGeometry {
        self.config.input.geometry()
    }

    /// `[dft_use][total_steps][channel]` power
    pub fn dft_power_trial(&self) -> Option<&TrialTensor> {
        self.pipeline.as_ref().map(|p| &p.dft_power_trial)
    }

    /// `[dft_use][total_steps][channel]` log power, when enabled
    pub fn dft_log_power_trial(&self) -> Option<&TrialTensor> {
        self.pipeline.as_ref().and_then(|p| p.dft_log_power_trial.as_ref())
    }

    /// `[n_filters][total_steps][channel]` mel filter-bank output
    pub fn mel_fbank_trial(&self) -> Option<&TrialTensor> {
        self.pipeline.as_ref().and_then(|p| p.mel_trial.as_ref())
    }

    /// `[n_filters][total_steps][channel]` cepstral coefficients
    pub fn mfcc_trial(&self) -> Option<&TrialTensor> {
        self.pipeline.as_ref().and_then(|p| p.mfcc_trial.as_ref())
    }

    fn gabor(&self, scale: usize) -> Option<&GaborScale> {
        self.pipeline
            .as_ref()
            .and_then(|p| p.gabors.get(scale.checked_sub(1)?))
            .and_then(Option::as_ref)
    }

    /// Raw gabor responses of scale 1, 2 or 3
    pub fn gabor_raw(&self, scale: usize) -> Option<&GaborTensor> {
        self.gabor(scale).map(|g| &g.raw)
    }

    /// Inhibited gabor output of scale 1, 2 or 3
    pub fn gabor_out(&self, scale: usize) -> Option<&GaborTensor> {
        self.gabor(scale).map(|g| &g.out)
    }

    /// Tap placement of scale 1, 2 or 3
    pub fn gabor_geometry(&self, scale: usize) -> Option<GaborGeometry> {
        self.gabor(scale).map(|g| g.geom)
    }
}

impl Pipeline {
    fn process_step(
        &mut self,
        sound: &SampleBuffer,
        ch: usize,
        step: usize,
        pos: usize,
    ) -> Result<(), DspError> {
        sound.copy_window(pos, &mut self.window);
        let log_out = if self.dft_log_power_trial.is_some() {
            Some(self.log_power_step.as_mut_slice())
        } else {
            None
        };
        self.dft
            .compute(&self.window, ch, pos == 0, &mut self.power_step, log_out)?;
        self.dft_power_trial.set_step(step, ch, &self.power_step);
        if let Some(t) = self.dft_log_power_trial.as_mut() {
            t.set_step(step, ch, &self.log_power_step);
        }

        if let (Some(mel), Some(mel_trial)) = (self.mel.as_ref(), self.mel_trial.as_mut()) {
            mel.apply(&self.power_step, &mut self.mel_step)?;
            mel_trial.set_step(step, ch, &self.mel_step);
            if let (Some(mfcc), Some(mfcc_trial)) = (self.mfcc.as_ref(), self.mfcc_trial.as_mut()) {
                mfcc.transform(&self.mel_step, &mut self.mfcc_step)?;
                mfcc_trial.set_step(step, ch, &self.mfcc_step);
            }
        }
        Ok(())
    }

    /// Copies the trailing `border` steps of the previous trial to the front
    fn wrap_border(&mut self, ch: usize, border: usize) {
        if border == 0 {
            return;
        }
        let src = self.geom.total_steps - border;
        for step in 0..border {
            self.dft_power_trial.copy_step(step, src + step, ch);
            for t in [
                self.dft_log_power_trial.as_mut(),
                self.mel_trial.as_mut(),
                self.mfcc_trial.as_mut(),
            ]
            .into_iter()
            .flatten()
            {
                t.copy_step(step, src + step, ch);
            }
        }
    }

    fn filter_trial(&mut self, ch: usize) -> Result<(), DspError> {
        let Some(mel_trial) = self.mel_trial.as_ref() else {
            return Ok(());
        };
        for scale in self.gabors.iter_mut().flatten() {
            scale
                .kernels
                .convolve(mel_trial, ch, &scale.geom, &mut scale.raw)?;
            self.inhibition
                .compute(scale.raw.channel_frame(ch), scale.out.channel_frame_mut(ch));
        }
        Ok(())
    }

    fn output(
        &self,
        config: &AuditoryConfig,
        sink: &mut dyn FeatureSink,
        row: usize,
        ch: usize,
    ) -> Result<(), DspError> {
        let prefix = config.column_prefix.as_str();
        let multi = self.channels > 1;

        let pow = self
            .dft_log_power_trial
            .as_ref()
            .unwrap_or(&self.dft_power_trial);
        let name = column_name(prefix, "dft_pow", ch, multi);
        write_steps(sink, &name, row, pow, ch, pow.features())?;

        if let Some(mel) = self.mel_trial.as_ref() {
            let name = column_name(prefix, "mel_fbank", ch, multi);
            write_steps(sink, &name, row, mel, ch, mel.features())?;
        }
        for (i, scale) in self.gabors.iter().enumerate() {
            if let Some(scale) = scale {
                let raw = format!("mel_gabor{}_raw", i + 1);
                write_gabor(sink, &column_name(prefix, &raw, ch, multi), row, &scale.raw, ch)?;
                let out = format!("mel_gabor{}", i + 1);
                write_gabor(sink, &column_name(prefix, &out, ch, multi), row, &scale.out, ch)?;
            }
        }
        if let Some(mfcc) = self.mfcc_trial.as_ref() {
            let name = column_name(prefix, "mel_mfcc", ch, multi);
            write_steps(sink, &name, row, mfcc, ch, config.mfcc.n_coeff)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::feature_table::FeatureTable;

    fn small_config() -> AuditoryConfig {
        let mut config = AuditoryConfig::default();
        config.input.sample_rate = 8000;
        config.mel.hi_hz = 3800.0;
        config.mel.n_filters = 16;
        config
    }

    fn tone(frames: usize, rate: u32) -> Vec<f32> {
        (0..frames)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_silence_gives_nine_zero_trials() {
        let mut proc = AuditoryProcessor::new(AuditoryConfig::default()).unwrap();
        proc.load_sound(&AudioSource::mono(vec![0.0; 16000], 16000))
            .unwrap();
        let mut table = FeatureTable::new();
        let mut trials = 0;
        while proc.input_steps_left() > 0 {
            proc.process_trial(&mut table).unwrap();
            trials += 1;
        }
        assert_eq!(trials, 9);
        assert_eq!(table.rows(), 9);
        let mel = table.column("AudProc_mel_fbank").unwrap();
        assert_eq!(mel.shape(), &[44, 32]);
        for row in 0..9 {
            let values = table.row_values("AudProc_mel_fbank", row).unwrap();
            assert!(values.iter().all(|&v| v == 0.0), "row {} not silent", row);
        }
    }

    #[test]
    fn test_insufficient_input_is_idempotent() {
        let mut proc = AuditoryProcessor::new(small_config()).unwrap();
        proc.load_sound(&AudioSource::mono(vec![0.0; 40], 8000)).unwrap();
        let mut table = FeatureTable::new();
        let pos = proc.input_pos();
        for _ in 0..2 {
            let err = proc.process_trial(&mut table).unwrap_err();
            assert!(err.is_recoverable());
            assert!(matches!(err, DspError::InsufficientInput(_)));
        }
        assert_eq!(proc.input_pos(), pos);
        assert_eq!(table.rows(), 0);
    }

    #[test]
    fn test_exhausted_input_keeps_last_trial() {
        let mut proc = AuditoryProcessor::new(small_config()).unwrap();
        proc.load_sound(&AudioSource::mono(tone(2000, 8000), 8000))
            .unwrap();
        let mut table = FeatureTable::new();
        while proc.input_steps_left() > 0 {
            proc.process_trial(&mut table).unwrap();
        }
        assert!(table.rows() > 0);

        let rows = table.rows();
        let pos = proc.input_pos();
        let start = proc.trial_start_pos();
        let end = proc.trial_end_pos();
        let power = proc.dft_power_trial().cloned();
        let mel = proc.mel_fbank_trial().cloned();
        let raw = proc.gabor_raw(1).cloned();
        let out = proc.gabor_out(1).cloned();
        assert!(mel.is_some() && raw.is_some() && out.is_some());

        for _ in 0..2 {
            let err = proc.process_trial(&mut table).unwrap_err();
            assert!(matches!(err, DspError::InsufficientInput(_)));
        }
        assert_eq!(table.rows(), rows);
        assert_eq!(proc.input_pos(), pos);
        assert_eq!(proc.trial_start_pos(), start);
        assert_eq!(proc.trial_end_pos(), end);
        assert_eq!(proc.dft_power_trial().cloned(), power);
        assert_eq!(proc.mel_fbank_trial().cloned(), mel);
        assert_eq!(proc.gabor_raw(1).cloned(), raw);
        assert_eq!(proc.gabor_out(1).cloned(), out);
    }

    #[test]
    fn test_border_steps_carry_over() {
        let config = small_config();
        let border = 2 * config.input.border_steps;
        let mut proc = AuditoryProcessor::new(config).unwrap();
        proc.load_sound(&AudioSource::mono(tone(8000, 8000), 8000))
            .unwrap();
        let mut table = FeatureTable::new();
        proc.process_trial(&mut table).unwrap();
        let total = proc.geometry().total_steps;
        let tail: Vec<Vec<f32>> = (total - border..total)
            .map(|s| {
                let t = proc.mel_fbank_trial().unwrap();
                (0..t.features()).map(|i| t.get(i, s, 0)).collect()
            })
            .collect();
        proc.process_trial(&mut table).unwrap();
        let t = proc.mel_fbank_trial().unwrap();
        for (s, expected) in tail.iter().enumerate() {
            let got: Vec<f32> = (0..t.features()).map(|i| t.get(i, s, 0)).collect();
            assert_eq!(&got, expected, "step {} not carried over", s);
        }
    }

    #[test]
    fn test_trial_positions() {
        let config = small_config();
        let geom = config.input.geometry();
        let border = config.input.border_steps;
        let mut proc = AuditoryProcessor::new(config).unwrap();
        proc.load_sound(&AudioSource::mono(tone(8000, 8000), 8000))
            .unwrap();
        let mut table = FeatureTable::new();
        proc.process_trial(&mut table).unwrap();
        assert_eq!(proc.trial_start_pos(), border * geom.step_samples);
        assert_eq!(proc.input_pos(), geom.total_steps * geom.step_samples);
        proc.process_trial(&mut table).unwrap();
        assert_eq!(
            proc.trial_start_pos(),
            border * geom.step_samples + geom.trial_steps * geom.step_samples
        );
        assert_eq!(
            proc.trial_end_pos() - proc.trial_start_pos(),
            geom.trial_samples
        );
    }

    #[test]
    fn test_sample_rate_mismatch_reinitializes() {
        let mut proc = AuditoryProcessor::new(small_config()).unwrap();
        let before = proc.geometry();
        proc.load_sound(&AudioSource::mono(vec![0.0; 16000], 16000))
            .unwrap();
        assert_eq!(proc.config().input.sample_rate, 16000);
        assert_eq!(proc.geometry().win_samples, 2 * before.win_samples);
        assert!(!proc.needs_init());
    }

    #[test]
    fn test_unusable_sample_rate_keeps_pipeline() {
        // 10 kHz upper mel edge cannot fit below the 4 kHz Nyquist of 8 kHz input
        let mut proc = AuditoryProcessor::new(AuditoryConfig::default()).unwrap();
        proc.init().unwrap();
        let before = proc.geometry();
        assert!(matches!(
            proc.load_sound(&AudioSource::mono(tone(8000, 8000), 8000)),
            Err(DspError::Configuration(_))
        ));
        assert_eq!(proc.config().input.sample_rate, 16000);
        assert!(!proc.needs_init());
        assert_eq!(proc.geometry(), before);

        proc.load_sound(&AudioSource::mono(tone(16000, 16000), 16000))
            .unwrap();
        let mut table = FeatureTable::new();
        assert!(proc.process_trial(&mut table).is_ok());
    }

    #[test]
    fn test_gabor_columns_and_shapes() {
        let mut proc = AuditoryProcessor::new(AuditoryConfig::default()).unwrap();
        proc.load_sound(&AudioSource::mono(tone(16000, 16000), 16000))
            .unwrap();
        let mut table = FeatureTable::new();
        proc.process_trial(&mut table).unwrap();
        let geom = proc.gabor_geometry(1).unwrap();
        let raw = table.column("AudProc_mel_gabor1_raw").unwrap();
        let nf = proc.config().gabor[0].n_filters();
        assert_eq!(raw.shape(), &[nf, 2, geom.time_taps, geom.freq_taps]);
        assert!(table.column("AudProc_mel_gabor1").is_some());
        assert!(proc.gabor_raw(4).is_none());
        assert!(proc.gabor_raw(0).is_none());
        let raw = proc.gabor_raw(1).unwrap().channel_frame(0);
        assert!(raw.iter().all(|&v| v >= 0.0));
        assert!(raw.iter().any(|&v| v > 0.0));
        let out = proc.gabor_out(1).unwrap().channel_frame(0);
        assert!(out.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_multi_channel_columns() {
        let mut config = small_config();
        config.input.channels = 2;
        let mut proc = AuditoryProcessor::new(config).unwrap();
        let mono = tone(4000, 8000);
        let stereo: Vec<f32> = mono.iter().flat_map(|&s| [s, 0.0]).collect();
        proc.load_sound(&AudioSource {
            sample_rate: 8000,
            channels: 2,
            samples: stereo,
        })
        .unwrap();
        let mut table = FeatureTable::new();
        proc.process_trial(&mut table).unwrap();
        assert!(table.column("AudProc_mel_fbank_ch0").is_some());
        assert!(table.column("AudProc_mel_fbank_ch1").is_some());
        let quiet = table.row_values("AudProc_mel_fbank_ch1", 0).unwrap();
        assert!(quiet.iter().all(|&v| v == 0.0));

        let err = proc
            .load_sound(&AudioSource::mono(vec![0.0; 4000], 8000))
            .unwrap_err();
        assert!(matches!(err, DspError::InvalidInput(_)));
    }
}
