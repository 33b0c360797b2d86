//! Example: Extract auditory features from an audio file
//!
//! Usage: `cargo run --example analyze_file -- <audio file> [features.json]`
//!
//! Prints a per-column summary and optionally dumps the whole feature table
//! as JSON.

use std::fs::File;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::get_probe;

use vocalis_dsp::{extract_features, AudioSource, AuditoryConfig};

/// Decodes a file into interleaved f32 samples
fn decode_audio_file(path: &str) -> Result<AudioSource, Box<dyn std::error::Error>> {
    let src = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = std::path::Path::new(path).extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or("No supported audio tracks found")?;
    let track_id = track.id;
    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
    let mut channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);
    let mut samples: Vec<f32> = Vec::new();

    while let Ok(packet) = format.next_packet() {
        if packet.track_id() != track_id {
            continue;
        }
        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count();
                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => return Err(Box::new(e)),
        }
    }

    Ok(AudioSource {
        sample_rate,
        channels,
        samples,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <audio file> [features.json]", args[0]);
        std::process::exit(1);
    }

    let source = decode_audio_file(&args[1])?;
    println!(
        "Decoded {}: {} frames x {} channel(s) at {} Hz",
        args[1],
        source.frames(),
        source.channels,
        source.sample_rate
    );

    let mut config = AuditoryConfig::default();
    config.input.sample_rate = source.sample_rate;
    config.mel.hi_hz = config.mel.hi_hz.min(source.sample_rate as f32 / 2.0 - 1.0);

    let table = extract_features(&source, config)?;

    println!("Feature table: {} trials", table.rows());
    for name in table.column_names() {
        let Some(column) = table.column(name) else {
            continue;
        };
        let (mut min, mut max) = (f32::INFINITY, f32::NEG_INFINITY);
        for row in 0..table.rows() {
            for &v in table.row_values(name, row).unwrap_or(&[]) {
                min = min.min(v);
                max = max.max(v);
            }
        }
        println!("  {:<28} shape {:?}  range [{:.3}, {:.3}]", name, column.shape(), min, max);
    }

    if let Some(out) = args.get(2) {
        std::fs::write(out, serde_json::to_string(&table)?)?;
        println!("Wrote {}", out);
    }

    Ok(())
}
