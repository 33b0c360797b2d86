//! Example: Synthesize a phone string to a WAV file
//!
//! Usage: `cargo run --example synthesize_phrase -- [phones] [out.wav]`
//!
//! Phones come from a small built-in table; the default phrase is
//! `"#_m_'aa_m_aa_#"`.

use vocalis_dsp::io::phone_table::{Dictionary, PhoneEntry, PhoneTable};
use vocalis_dsp::{ControlFrame, ControlSequencer, SynthConfig, VocalTract};

fn phone(duration_ms: f32, transition_ms: f32, frame: ControlFrame) -> PhoneEntry {
    PhoneEntry {
        duration_ms,
        transition_ms,
        frame,
    }
}

fn builtin_phones() -> PhoneTable {
    let rest = ControlFrame::default();
    let open = ControlFrame {
        glot_pitch: -2.0,
        glot_vol: 54.0,
        radius2: 0.7,
        radius3: 0.5,
        radius4: 0.4,
        radius5: 0.4,
        radius6: 1.3,
        radius7: 1.7,
        radius8: 1.7,
        ..rest
    };
    let nasal = ControlFrame {
        glot_vol: 48.0,
        radius7: 0.6,
        radius8: 0.0,
        velum: 1.2,
        ..open
    };
    let sibilant = ControlFrame {
        glot_vol: 0.0,
        fric_vol: 24.0,
        fric_pos: 6.5,
        fric_cf: 2800.0,
        fric_bw: 3000.0,
        radius7: 0.4,
        radius8: 0.05,
        ..rest
    };

    let mut table = PhoneTable::new();
    table.insert("#", phone(60.0, 20.0, rest));
    table.insert("aa", phone(100.0, 40.0, open));
    table.insert("aa'", phone(140.0, 40.0, ControlFrame { glot_pitch: 1.0, glot_vol: 60.0, ..open }));
    table.insert("m", phone(60.0, 30.0, nasal));
    table.insert("s", phone(90.0, 30.0, sibilant));
    table
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let phrase = args.get(1).map(String::as_str).unwrap_or("#_m_'aa_m_aa_#");
    let out = args.get(2).map(String::as_str).unwrap_or("phrase.wav");

    let phones = builtin_phones();
    let dictionary = Dictionary::new();
    let mut tract = VocalTract::new(SynthConfig::default())?;
    let sequencer = ControlSequencer::new(&phones, &dictionary);

    let n = sequencer.synth_phones(&mut tract, phrase, true)?;
    tract.flush();
    let samples = tract.scaled_output();
    println!(
        "Synthesized {} phones: {} samples at {} Hz (tube rate {} Hz)",
        n,
        samples.len(),
        tract.config().output_rate,
        tract.sample_rate()
    );

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: tract.config().output_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(out, spec)?;
    for s in samples {
        writer.write_sample((s * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    println!("Wrote {}", out);

    Ok(())
}
