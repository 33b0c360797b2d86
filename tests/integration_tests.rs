//! Integration tests for the analysis and synthesis engines

use vocalis_dsp::io::phone_table::{Dictionary, PhoneTable};
use vocalis_dsp::{
    extract_features, AudioSource, AuditoryConfig, AuditoryProcessor, ControlFrame,
    ControlSequencer, DspError, FeatureTable, SynthConfig, VocalTract,
};

fn small_config() -> AuditoryConfig {
    let mut config = AuditoryConfig::default();
    config.input.sample_rate = 8000;
    config.mel.n_filters = 16;
    config.mel.hi_hz = 3800.0;
    config
}

fn chirp(frames: usize, rate: u32) -> Vec<f32> {
    (0..frames)
        .map(|i| {
            let t = i as f32 / rate as f32;
            0.5 * (2.0 * std::f32::consts::PI * (300.0 + 400.0 * t) * t).sin()
        })
        .collect()
}

/// Synthesizes `frames` control frames of a sustained vowel
fn synthesize_vowel(frames: usize) -> VocalTract {
    let mut tract = VocalTract::new(SynthConfig::default()).expect("default synth config");
    tract.set_control(ControlFrame {
        glot_vol: 60.0,
        radius4: 0.6,
        radius5: 0.6,
        radius7: 1.5,
        radius8: 1.5,
        ..ControlFrame::default()
    });
    for _ in 0..frames {
        tract.synthesize(false).expect("synthesis");
    }
    tract.flush();
    tract
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_second_of_silence() {
        let source = AudioSource::mono(vec![0.0; 16000], 16000);
        let table = extract_features(&source, AuditoryConfig::default())
            .expect("Analysis should succeed");

        // One 44-step trial, then 20 new steps per trial: 200 steps in 1 s
        assert_eq!(table.rows(), 9);
        let names: Vec<&str> = table.column_names().collect();
        assert!(names.contains(&"AudProc_dft_pow"));
        assert!(names.contains(&"AudProc_mel_fbank"));
        assert!(names.contains(&"AudProc_mel_gabor1_raw"));
        assert!(names.contains(&"AudProc_mel_gabor1"));
        assert!(!names.iter().any(|n| n.contains("mfcc")), "mfcc is off by default");

        for row in 0..table.rows() {
            let mel = table.row_values("AudProc_mel_fbank", row).unwrap();
            assert!(mel.iter().all(|&v| v == 0.0), "row {} has mel energy", row);
        }
    }

    #[test]
    fn test_empty_sound_rejected() {
        let source = AudioSource::mono(Vec::new(), 16000);
        assert!(matches!(
            extract_features(&source, AuditoryConfig::default()),
            Err(DspError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_exhausted_input_is_recoverable() {
        let mut proc = AuditoryProcessor::new(small_config()).unwrap();
        proc.load_sound(&AudioSource::mono(chirp(2000, 8000), 8000))
            .unwrap();
        let mut table = FeatureTable::new();
        while proc.input_steps_left() > 0 {
            proc.process_trial(&mut table).unwrap();
        }
        let rows = table.rows();
        let pos = proc.input_pos();
        let trial = (proc.trial_start_pos(), proc.trial_end_pos());
        let mel = proc.mel_fbank_trial().cloned();
        let gabor = (proc.gabor_raw(1).cloned(), proc.gabor_out(1).cloned());
        assert!(mel.is_some());
        for _ in 0..3 {
            let err = proc.process_trial(&mut table).unwrap_err();
            assert!(err.is_recoverable(), "unexpected error {}", err);
        }
        assert_eq!(table.rows(), rows);
        assert_eq!(proc.input_pos(), pos);
        assert_eq!((proc.trial_start_pos(), proc.trial_end_pos()), trial);
        assert_eq!(proc.mel_fbank_trial().cloned(), mel, "mel trial changed");
        assert_eq!(
            (proc.gabor_raw(1).cloned(), proc.gabor_out(1).cloned()),
            gabor,
            "gabor tensors changed"
        );

        // A new sound restarts from its first sample
        proc.load_sound(&AudioSource::mono(chirp(2000, 8000), 8000))
            .unwrap();
        assert_eq!(proc.input_pos(), 0);
        assert!(proc.process_trial(&mut table).is_ok());
    }

    #[test]
    fn test_borders_repeat_across_trials() {
        let config = small_config();
        let border = 2 * config.input.border_steps;
        let total = config.input.geometry().total_steps;
        let source = AudioSource::mono(chirp(16000, 8000), 8000);
        let table = extract_features(&source, config).unwrap();
        assert!(table.rows() >= 3);

        let n = table.column("AudProc_mel_fbank").unwrap().shape()[1];
        for row in 0..2 {
            let cur = table.row_values("AudProc_mel_fbank", row).unwrap();
            let next = table.row_values("AudProc_mel_fbank", row + 1).unwrap();
            assert_eq!(
                &cur[(total - border) * n..],
                &next[..border * n],
                "trial {} tail differs from trial {} head",
                row,
                row + 1
            );
        }
    }

    #[test]
    fn test_stereo_channels_analyzed_separately() {
        let mut config = small_config();
        config.input.channels = 2;
        let left = chirp(4000, 8000);
        let samples: Vec<f32> = left.iter().flat_map(|&l| [l, 0.0]).collect();
        let source = AudioSource {
            sample_rate: 8000,
            channels: 2,
            samples,
        };
        let table = extract_features(&source, config).unwrap();
        let quiet = table.row_values("AudProc_mel_fbank_ch1", 0).unwrap();
        assert!(quiet.iter().all(|&v| v == 0.0));
        let loud = table.row_values("AudProc_mel_fbank_ch0", 0).unwrap();
        assert!(loud.iter().any(|&v| v > 0.0));
    }

    #[test]
    fn test_tract_decays_after_voicing() {
        let mut tract = VocalTract::new(SynthConfig::default()).unwrap();
        tract.set_control(ControlFrame {
            glot_vol: 60.0,
            ..ControlFrame::default()
        });
        let mut voiced_peak = 0.0f32;
        for _ in 0..4 {
            tract.begin_frame();
            for _ in 0..tract.control_period() {
                tract.tick();
                voiced_peak = voiced_peak.max(tract.tube_energy());
            }
            tract.end_frame();
        }
        assert!(voiced_peak > 0.0);

        tract.set_control(ControlFrame::default());
        let mut silent_peak = 0.0f32;
        for frame in 0..3 {
            tract.begin_frame();
            for _ in 0..tract.control_period() {
                let out = tract.tick();
                assert!(out.is_finite());
                if frame == 2 {
                    silent_peak = silent_peak.max(tract.tube_energy());
                }
            }
            tract.end_frame();
        }
        assert!(
            silent_peak < 0.01 * voiced_peak,
            "tube energy {} after silence, {} while voiced",
            silent_peak,
            voiced_peak
        );
    }

    #[test]
    fn test_frame_interpolation() {
        let mut tract = VocalTract::new(SynthConfig::default()).unwrap();
        let q = tract.control_period();
        tract.set_control(ControlFrame {
            glot_pitch: -10.0,
            radius2: 2.0,
            ..ControlFrame::default()
        });
        tract.begin_frame();
        for k in 0..q {
            let cur = tract.current();
            let frac = k as f32 / q as f32;
            assert!((cur.glot_pitch + 10.0 * frac).abs() < 1e-3);
            assert!((cur.radius2 - (1.0 + frac)).abs() < 5e-4);
            tract.tick();
        }
        tract.end_frame();
        assert!((tract.previous().glot_pitch + 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_synthesized_wav_roundtrip() {
        let tract = synthesize_vowel(8);
        let samples = tract.scaled_output();
        assert!(!samples.is_empty());

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: tract.config().output_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let path = std::env::temp_dir().join(format!("vocalis_roundtrip_{}.wav", std::process::id()));
        {
            let mut writer = hound::WavWriter::create(&path, spec).unwrap();
            for &s in &samples {
                writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
            }
            writer.finalize().unwrap();
        }

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 44100);
        let back: Vec<f32> = reader
            .samples::<i16>()
            .map(|s| s.unwrap() as f32 / i16::MAX as f32)
            .collect();
        std::fs::remove_file(&path).ok();

        assert_eq!(back.len(), samples.len());
        for (a, b) in samples.iter().zip(&back) {
            assert!((a - b).abs() < 1e-3);
        }
        let peak = back.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!((peak - 0.95).abs() < 1e-3, "peak {}", peak);
    }

    #[test]
    fn test_synthesized_speech_analyzes() {
        let tract = synthesize_vowel(20);
        let source = AudioSource::mono(tract.scaled_output(), tract.config().output_rate);
        let table = extract_features(&source, AuditoryConfig::default()).unwrap();
        assert!(table.rows() > 0);
        let pow = table.row_values("AudProc_dft_pow", 0).unwrap();
        assert!(pow.iter().all(|v| v.is_finite()));
        assert!(pow.iter().any(|&v| v > -100.0));
    }

    #[test]
    fn test_phrase_synthesis() {
        let phones = PhoneTable::from_json(
            r##"{
                "#": {"duration_ms": 40.0, "transition_ms": 20.0, "frame": {
                    "glot_pitch": 0.0, "glot_vol": 0.0, "asp_vol": 0.0, "fric_vol": 0.0,
                    "fric_pos": 4.0, "fric_cf": 2500.0, "fric_bw": 2000.0,
                    "radius2": 1.0, "radius3": 1.0, "radius4": 1.0, "radius5": 1.0,
                    "radius6": 1.0, "radius7": 1.0, "radius8": 1.0, "velum": 0.1}},
                "s": {"duration_ms": 80.0, "transition_ms": 30.0, "frame": {
                    "glot_pitch": 0.0, "glot_vol": 0.0, "asp_vol": 0.0, "fric_vol": 24.0,
                    "fric_pos": 6.5, "fric_cf": 2800.0, "fric_bw": 3000.0,
                    "radius2": 0.8, "radius3": 0.8, "radius4": 1.1, "radius5": 1.2,
                    "radius6": 1.2, "radius7": 0.4, "radius8": 0.05, "velum": 0.1}},
                "aa": {"duration_ms": 100.0, "transition_ms": 40.0, "frame": {
                    "glot_pitch": -2.0, "glot_vol": 54.0, "asp_vol": 0.0, "fric_vol": 0.0,
                    "fric_pos": 4.0, "fric_cf": 2500.0, "fric_bw": 2000.0,
                    "radius2": 0.7, "radius3": 0.5, "radius4": 0.4, "radius5": 0.4,
                    "radius6": 1.3, "radius7": 1.7, "radius8": 1.7, "velum": 0.1}},
                "aa'": {"duration_ms": 140.0, "transition_ms": 40.0, "frame": {
                    "glot_pitch": 0.0, "glot_vol": 60.0, "asp_vol": 0.0, "fric_vol": 0.0,
                    "fric_pos": 4.0, "fric_cf": 2500.0, "fric_bw": 2000.0,
                    "radius2": 0.7, "radius3": 0.5, "radius4": 0.4, "radius5": 0.4,
                    "radius6": 1.3, "radius7": 1.7, "radius8": 1.7, "velum": 0.1}}
            }"##,
        )
        .unwrap();
        let dict = Dictionary::from_json(r#"{"saa": "s_'aa", "aas": "aa_s"}"#).unwrap();

        let mut tract = VocalTract::new(SynthConfig::default()).unwrap();
        let sequencer = ControlSequencer::new(&phones, &dict);
        let n = sequencer.synth_words(&mut tract, "saa aas", true).unwrap();
        assert_eq!(n, 5);
        tract.flush();

        let out = tract.scaled_output();
        // 1.5*(110)/25 -> 7, stressed 1.5*(180)/25 -> 11, pause 4, 1.5*140/25 -> 9, 7
        let frames = 7 + 11 + 4 + 9 + 7;
        let expected = frames as f32 * 0.025 * 44100.0;
        assert!(
            (out.len() as f32 - expected).abs() < 0.02 * expected,
            "{} samples for {} frames",
            out.len(),
            frames
        );
        assert!(out.iter().all(|s| s.is_finite()));
        let peak = out.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!((peak - 0.95).abs() < 1e-3);
    }
}
