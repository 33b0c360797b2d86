//! Wavetable glottal source
//!
//! One period of the glottal waveform is stored in a 512-entry table and read
//! with linear interpolation at twice the tube sample rate. The oversampled
//! stream is decimated through a [`FirFilter`].
//!
//! The pulse rises as `3x² - 2x³` over `rise%` of the period and falls as
//! `1 - x²` over at most `fall_max%`. Louder glottal amplitudes shorten the
//! fall toward `fall_min%`.

use crate::config::Waveform;
use crate::error::DspError;
use crate::synthesis::fir::FirFilter;

const TABLE_LENGTH: usize = 512;
const FIR_BETA: f32 = 0.2;
const FIR_GAMMA: f32 = 0.1;
const FIR_CUTOFF: f32 = 0.000_000_01;

/// Glottal pulse or sine oscillator
#[derive(Debug, Clone)]
pub struct GlottalSource {
    waveform: Waveform,
    table: Vec<f32>,
    table_div1: usize,
    table_div2: usize,
    tn_delta: f32,
    basic_increment: f64,
    position: f64,
    fir: FirFilter,
}

impl GlottalSource {
    /// Builds the wavetable
    ///
    /// # Arguments
    ///
    /// * `waveform` - Pulse or sine
    /// * `sample_rate` - Tube sample rate in Hz
    /// * `rise` - Pulse rise time, percent of the period
    /// * `fall_min` - Shortest fall time, percent of the period
    /// * `fall_max` - Longest fall time, percent of the period
    ///
    /// # Errors
    ///
    /// Returns `DspError::Configuration` for a non-positive sample rate or
    /// pulse timings that do not fit in one period.
    pub fn new(
        waveform: Waveform,
        sample_rate: f32,
        rise: f32,
        fall_min: f32,
        fall_max: f32,
    ) -> Result<Self, DspError> {
        if sample_rate <= 0.0 {
            return Err(DspError::Configuration(format!(
                "Glottal source needs a positive sample rate, got {}",
                sample_rate
            )));
        }
        if rise < 0.0 || fall_max < fall_min || fall_min < 0.0 || rise + fall_max > 100.0 {
            return Err(DspError::Configuration(format!(
                "Invalid glottal pulse timing: rise={}%, fall={}..{}%",
                rise, fall_min, fall_max
            )));
        }
        let len = TABLE_LENGTH as f32;
        let table_div1 = (len * rise / 100.0).round() as usize;
        let table_div2 = (len * (rise + fall_max) / 100.0).round() as usize;
        let tn_delta = (len * (fall_max - fall_min) / 100.0).round();

        let mut table = vec![0.0f32; TABLE_LENGTH];
        match waveform {
            Waveform::Pulse => {
                for (i, v) in table.iter_mut().enumerate().take(table_div1) {
                    let x = i as f32 / table_div1 as f32;
                    *v = 3.0 * x * x - 2.0 * x * x * x;
                }
                let tn_length = (table_div2 - table_div1) as f32;
                for (j, v) in table[table_div1..table_div2].iter_mut().enumerate() {
                    let x = j as f32 / tn_length;
                    *v = 1.0 - x * x;
                }
            }
            Waveform::Sine => {
                for (i, v) in table.iter_mut().enumerate() {
                    *v = (i as f32 / len * 2.0 * std::f32::consts::PI).sin();
                }
            }
        }

        Ok(Self {
            waveform,
            table,
            table_div1,
            table_div2,
            tn_delta,
            basic_increment: TABLE_LENGTH as f64 / sample_rate as f64,
            position: 0.0,
            fir: FirFilter::new(FIR_BETA, FIR_GAMMA, FIR_CUTOFF)?,
        })
    }

    /// Reshapes the falling edge for a glottal amplitude in [0, 1]
    ///
    /// No-op for the sine waveform.
    pub fn update_wavetable(&mut self, amplitude: f32) {
        if self.waveform != Waveform::Pulse {
            return;
        }
        let shorten = (amplitude * self.tn_delta).round().max(0.0) as usize;
        let new_div2 = self
            .table_div2
            .saturating_sub(shorten)
            .max(self.table_div1);
        let new_length = new_div2 - self.table_div1;
        if new_length > 0 {
            let inv = 1.0 / new_length as f32;
            for (j, v) in self.table[self.table_div1..new_div2].iter_mut().enumerate() {
                let x = j as f32 * inv;
                *v = 1.0 - x * x;
            }
        }
        self.table[new_div2..self.table_div2].fill(0.0);
    }

    /// Next output sample at fundamental `frequency` in Hz
    pub fn next_sample(&mut self, frequency: f32) -> f32 {
        let mut output = 0.0;
        for i in 0..2 {
            self.advance(frequency as f64 / 2.0);
            let lower = self.position as usize;
            let upper = (lower + 1) % TABLE_LENGTH;
            let frac = (self.position - lower as f64) as f32;
            let value = self.table[lower] + frac * (self.table[upper] - self.table[lower]);
            output = self.fir.filter(value, i == 1);
        }
        output
    }

    fn advance(&mut self, frequency: f64) {
        self.position += frequency * self.basic_increment;
        let len = TABLE_LENGTH as f64;
        self.position = self.position.rem_euclid(len);
        if self.position >= len {
            self.position = 0.0;
        }
    }

    /// Current wavetable
    pub fn table(&self) -> &[f32] {
        &self.table
    }

    /// Rewinds the oscillator and clears the decimation filter
    pub fn reset(&mut self) {
        self.position = 0.0;
        self.fir.reset();
    }
}
