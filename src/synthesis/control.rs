//! Control-rate parameters of the vocal tract
//!
//! A [`ControlFrame`] is the full articulatory target for one control period.
//! The synthesizer keeps the previous and current frames and walks linearly
//! from one to the other, one delta per sample.

use serde::{Deserialize, Serialize};

use crate::error::DspError;

/// Number of control parameters in a frame
pub const N_PARAMS: usize = 15;

/// Parameter names, in frame order
pub const PARAM_NAMES: [&str; N_PARAMS] = [
    "glot_pitch",
    "glot_vol",
    "asp_vol",
    "fric_vol",
    "fric_pos",
    "fric_cf",
    "fric_bw",
    "radius2",
    "radius3",
    "radius4",
    "radius5",
    "radius6",
    "radius7",
    "radius8",
    "velum",
];

/// (min, max) of each parameter, used for normalized values
pub const PARAM_RANGES: [(f32, f32); N_PARAMS] = [
    (-10.0, 0.0),
    (0.0, 60.0),
    (0.0, 10.0),
    (0.0, 24.0),
    (0.0, 7.0),
    (0.0, 3000.0),
    (0.0, 4000.0),
    (0.0, 3.0),
    (0.0, 3.0),
    (0.0, 3.0),
    (0.0, 3.0),
    (0.0, 3.0),
    (0.0, 3.0),
    (0.0, 3.0),
    (0.0, 1.5),
];

/// One set of articulatory control parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlFrame {
    /// Glottal pitch in semitones relative to middle C offset (default: 0.0)
    pub glot_pitch: f32,
    /// Glottal source volume in dB (default: 0.0)
    pub glot_vol: f32,
    /// Aspiration volume in dB (default: 0.0)
    pub asp_vol: f32,
    /// Frication volume in dB (default: 0.0)
    pub fric_vol: f32,
    /// Frication position along the tract, 0..7 (default: 4.0)
    pub fric_pos: f32,
    /// Frication center frequency in Hz (default: 2500.0)
    pub fric_cf: f32,
    /// Frication bandwidth in Hz (default: 2000.0)
    pub fric_bw: f32,
    /// Tract radius of section 2 in cm (default: 1.0)
    pub radius2: f32,
    /// Section 3 radius
    pub radius3: f32,
    /// Section 4 radius, also the pharynx side of the velum junction
    pub radius4: f32,
    /// Section 5 radius
    pub radius5: f32,
    /// Section 6 radius
    pub radius6: f32,
    /// Section 7 radius
    pub radius7: f32,
    /// Section 8 radius
    pub radius8: f32,
    /// Velum aperture radius in cm (default: 0.1)
    pub velum: f32,
}

impl Default for ControlFrame {
    fn default() -> Self {
        Self {
            glot_pitch: 0.0,
            glot_vol: 0.0,
            asp_vol: 0.0,
            fric_vol: 0.0,
            fric_pos: 4.0,
            fric_cf: 2500.0,
            fric_bw: 2000.0,
            radius2: 1.0,
            radius3: 1.0,
            radius4: 1.0,
            radius5: 1.0,
            radius6: 1.0,
            radius7: 1.0,
            radius8: 1.0,
            velum: 0.1,
        }
    }
}

impl ControlFrame {
    /// Values in frame order
    pub fn to_array(&self) -> [f32; N_PARAMS] {
        [
            self.glot_pitch,
            self.glot_vol,
            self.asp_vol,
            self.fric_vol,
            self.fric_pos,
            self.fric_cf,
            self.fric_bw,
            self.radius2,
            self.radius3,
            self.radius4,
            self.radius5,
            self.radius6,
            self.radius7,
            self.radius8,
            self.velum,
        ]
    }

    /// Builds a frame from values in frame order
    pub fn from_array(v: [f32; N_PARAMS]) -> Self {
        Self {
            glot_pitch: v[0],
            glot_vol: v[1],
            asp_vol: v[2],
            fric_vol: v[3],
            fric_pos: v[4],
            fric_cf: v[5],
            fric_bw: v[6],
            radius2: v[7],
            radius3: v[8],
            radius4: v[9],
            radius5: v[10],
            radius6: v[11],
            radius7: v[12],
            radius8: v[13],
            velum: v[14],
        }
    }

    /// Tract radii of sections 2..8
    pub fn radii(&self) -> [f32; 7] {
        [
            self.radius2,
            self.radius3,
            self.radius4,
            self.radius5,
            self.radius6,
            self.radius7,
            self.radius8,
        ]
    }

    /// Sets the frame from a slice of at least [`N_PARAMS`] floats
    ///
    /// # Arguments
    ///
    /// * `vals` - Values in frame order
    /// * `normalized` - Values are in [0, 1] and mapped through [`PARAM_RANGES`]
    ///
    /// # Errors
    ///
    /// Returns `DspError::InvalidInput` if fewer than [`N_PARAMS`] values are given.
    pub fn set_from_floats(&mut self, vals: &[f32], normalized: bool) -> Result<(), DspError> {
        if vals.len() < N_PARAMS {
            return Err(DspError::InvalidInput(format!(
                "Need at least {} control values, got {}",
                N_PARAMS,
                vals.len()
            )));
        }
        let mut out = [0.0f32; N_PARAMS];
        for (i, o) in out.iter_mut().enumerate() {
            *o = if normalized {
                let (min, max) = PARAM_RANGES[i];
                min + vals[i] * (max - min)
            } else {
                vals[i]
            };
        }
        *self = Self::from_array(out);
        Ok(())
    }

    /// Values mapped into [0, 1] through [`PARAM_RANGES`]
    pub fn normalized(&self) -> [f32; N_PARAMS] {
        let mut out = self.to_array();
        for (v, &(min, max)) in out.iter_mut().zip(PARAM_RANGES.iter()) {
            *v = (*v - min) / (max - min);
        }
        out
    }

    /// Per-sample increments walking from `prev` to `cur` over `period` samples
    pub fn deltas(cur: &ControlFrame, prev: &ControlFrame, period: usize) -> ControlFrame {
        let rate = if period > 0 { 1.0 / period as f32 } else { 0.0 };
        let c = cur.to_array();
        let p = prev.to_array();
        let mut d = [0.0f32; N_PARAMS];
        for i in 0..N_PARAMS {
            d[i] = (c[i] - p[i]) * rate;
        }
        Self::from_array(d)
    }

    /// Adds `delta` to every parameter
    pub fn step(&mut self, delta: &ControlFrame) {
        let mut v = self.to_array();
        for (x, d) in v.iter_mut().zip(delta.to_array()) {
            *x += d;
        }
        *self = Self::from_array(v);
    }
}
