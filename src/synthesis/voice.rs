//! Voice presets and unit conversions

use crate::config::VoicePreset;

/// Volume ceiling in dB
pub const VOL_MAX: f32 = 60.0;
const PITCH_BASE: f32 = 220.0;
const PITCH_OFFSET: f32 = 3.0;

/// Physical constants of one voice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceParams {
    /// Nominal tract length in cm
    pub tract_length: f32,
    /// Shortest glottal pulse fall, percent of the period
    pub glot_pulse_fall_min: f32,
    /// Longest glottal pulse fall, percent of the period
    pub glot_pulse_fall_max: f32,
    /// Pitch reference in semitones
    pub glot_pitch_ref: f32,
    /// Breathiness in percent
    pub breathiness: f32,
    /// Glottal pulse rise, percent of the period
    pub glot_pulse_rise: f32,
    /// Mouth and nose aperture radius in cm
    pub aperture_radius: f32,
    /// Fixed radii of nasal sections 2..6 in cm
    pub nose_radii: [f32; 5],
    /// Radius of the first (glottal) tract section in cm
    pub radius1: f32,
}

impl VoiceParams {
    /// Expands a preset
    pub fn from_preset(preset: VoicePreset) -> Self {
        let (tract_length, fall, pitch_ref, breathiness) = match preset {
            VoicePreset::Male => (17.5, 24.0, -12.0, 0.5),
            VoicePreset::Female => (15.0, 32.0, 0.0, 1.5),
            VoicePreset::ChildLarge => (12.5, 24.0, 2.5, 1.5),
            VoicePreset::ChildSmall => (10.0, 24.0, 5.0, 1.5),
            VoicePreset::Baby => (7.5, 24.0, 7.5, 1.5),
        };
        Self {
            tract_length,
            glot_pulse_fall_min: fall,
            glot_pulse_fall_max: fall,
            glot_pitch_ref: pitch_ref,
            breathiness,
            glot_pulse_rise: 40.0,
            aperture_radius: 3.05,
            nose_radii: [1.35, 1.96, 1.91, 1.3, 0.73],
            radius1: 0.8,
        }
    }
}

impl From<VoicePreset> for VoiceParams {
    fn from(preset: VoicePreset) -> Self {
        Self::from_preset(preset)
    }
}

/// Converts a 0..60 dB level to a linear amplitude in [0, 1]
pub fn amplitude(db: f32) -> f32 {
    let db = db - VOL_MAX;
    if db <= -VOL_MAX {
        0.0
    } else if db >= 0.0 {
        1.0
    } else {
        10f32.powf(db / 20.0)
    }
}

/// Converts a pitch in semitones (0 = middle C) to Hz
pub fn frequency(pitch: f32) -> f32 {
    PITCH_BASE * 2f32.powf((pitch + PITCH_OFFSET) / 12.0)
}

/// Speed of sound in m/s at `temp` degrees Celsius
pub fn speed_of_sound(temp: f32) -> f32 {
    331.4 + 0.6 * temp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amplitude_range() {
        assert_eq!(amplitude(0.0), 0.0);
        assert_eq!(amplitude(-5.0), 0.0);
        assert_eq!(amplitude(60.0), 1.0);
        assert_eq!(amplitude(75.0), 1.0);
        assert!((amplitude(40.0) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_middle_c() {
        // 220 * 2^(3/12) = 261.63 Hz
        assert!((frequency(0.0) - 261.6256).abs() < 1e-2);
        assert!((frequency(9.0) - 440.0).abs() < 1e-3);
    }

    #[test]
    fn test_presets() {
        let male = VoiceParams::from(VoicePreset::Male);
        assert_eq!(male.tract_length, 17.5);
        assert_eq!(male.glot_pitch_ref, -12.0);
        let baby = VoiceParams::from_preset(VoicePreset::Baby);
        assert_eq!(baby.tract_length, 7.5);
        assert_eq!(baby.nose_radii, male.nose_radii);
        assert!((speed_of_sound(32.0) - 350.6).abs() < 1e-4);
    }
}
