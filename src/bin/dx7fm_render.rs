//! Render a DX7 patch bank and a scripted MIDI sequence to a `.wav` file.
//!
//! Exercises the `dx7fm` library end-to-end without any platform
//! audio/MIDI bindings: load a sysex bank, feed it a MIDI script, and
//! write the rendered PCM straight to disk.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use dx7fm::{Engine, BLOCK_SIZE};
use log::info;

/// Render DX7 FM synthesis output to a WAV file from a sysex bank and a
/// scripted MIDI sequence.
#[derive(Parser)]
#[command(name = "dx7fm-render")]
#[command(about = "Render a DX7 patch bank and MIDI script to a WAV file")]
#[command(version)]
struct Args {
    /// Path to a 4104-byte 32-voice bulk-dump sysex bank.
    sysex_bank: PathBuf,

    /// Path to a MIDI script (see below). Each non-empty, non-comment
    /// line is `<offset_ms> <hex bytes...>`, offsets non-decreasing.
    midi_script: PathBuf,

    /// Total render duration in seconds.
    #[arg(long, default_value_t = 2.0)]
    duration: f64,

    /// Output WAV path.
    #[arg(long, default_value = "out.wav")]
    output: PathBuf,

    /// Sample rate in Hz.
    #[arg(long, default_value_t = 48000)]
    sample_rate: u32,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

struct ScriptEvent {
    offset_samples: u64,
    bytes: Vec<u8>,
}

fn parse_script(text: &str, sample_rate: u32) -> Result<Vec<ScriptEvent>> {
    let mut events = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let offset_ms: f64 = fields
            .next()
            .with_context(|| format!("line {}: missing offset", lineno + 1))?
            .parse()
            .with_context(|| format!("line {}: bad offset", lineno + 1))?;
        let bytes: Result<Vec<u8>> = fields
            .map(|tok| u8::from_str_radix(tok, 16).with_context(|| format!("line {}: bad hex byte {tok}", lineno + 1)))
            .collect();
        let bytes = bytes?;
        if bytes.is_empty() {
            bail!("line {}: no MIDI bytes", lineno + 1);
        }
        let offset_samples = (offset_ms * sample_rate as f64 / 1000.0) as u64;
        events.push(ScriptEvent { offset_samples, bytes });
    }
    Ok(events)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let sysex = fs::read(&args.sysex_bank)
        .with_context(|| format!("reading sysex bank {}", args.sysex_bank.display()))?;
    let script_text = fs::read_to_string(&args.midi_script)
        .with_context(|| format!("reading MIDI script {}", args.midi_script.display()))?;
    let events = parse_script(&script_text, args.sample_rate)?;

    let mut engine = Engine::new(args.sample_rate as f64)?;
    engine.load_sysex_bank(&sysex).context("loading sysex bank")?;

    let total_samples = (args.duration * args.sample_rate as f64) as usize;
    let total_samples = total_samples - total_samples % BLOCK_SIZE + BLOCK_SIZE;
    info!("rendering {total_samples} samples at {} Hz", args.sample_rate);

    let mut pcm = vec![0i16; total_samples];
    let mut event_idx = 0;
    let mut rendered = 0usize;

    while rendered < total_samples {
        while event_idx < events.len() && events[event_idx].offset_samples <= rendered as u64 {
            let accepted = engine.send_midi(&events[event_idx].bytes);
            info!("sent {} MIDI bytes at sample {rendered} ({accepted} accepted)", events[event_idx].bytes.len());
            event_idx += 1;
        }

        let end = (rendered + BLOCK_SIZE).min(total_samples);
        engine.get_samples(&mut pcm[rendered..end]);
        rendered = end;
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: args.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&args.output, spec)
        .with_context(|| format!("creating {}", args.output.display()))?;
    for sample in &pcm {
        writer.write_sample(*sample)?;
    }
    writer.finalize()?;

    info!("wrote {} samples to {}", pcm.len(), args.output.display());
    Ok(())
}
