//! Offline rendering to a WAV file.
//!
//! Runs the same scheduler the audio callback runs, so a render matches what
//! `play` or `effect` would have produced sample for sample.

use super::common::{ComplexVector, EngineArgs, MatrixArgs, build_engine, load_config, parse_vector};
use super::play::linear_to_db;
use clap::Args;
use eigensound_config::EngineMode;
use eigensound_io::{WavSpec, read_wav, render_offline, write_wav};
use eigensound_synth::block::{peak, rms};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    #[command(flatten)]
    matrix: MatrixArgs,

    #[command(flatten)]
    engine: EngineArgs,

    /// Input WAV to run through the modal filter (switches to effect mode)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Excitation vector for synthesizer mode
    #[arg(long, value_parser = parse_vector, conflicts_with = "input")]
    excite: Option<ComplexVector>,

    /// Wet ratio in effect mode
    #[arg(long)]
    dry_wet: Option<f32>,

    /// Length in seconds (defaults to the input length, or 4s)
    #[arg(short, long)]
    seconds: Option<f32>,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value = "32")]
    bit_depth: u16,
}

pub fn run(config_path: Option<&Path>, args: RenderArgs) -> anyhow::Result<()> {
    let mut config = load_config(config_path, &args.matrix, Some(&args.engine))?;

    let input = match &args.input {
        Some(path) => {
            println!("Reading {}...", path.display());
            let (samples, spec) = read_wav(path)?;
            if spec.sample_rate != config.audio.sample_rate {
                tracing::warn!(
                    file = spec.sample_rate,
                    engine = config.audio.sample_rate,
                    "input sample rate differs; rendering at the input rate"
                );
                config.audio.sample_rate = spec.sample_rate;
            }
            config.mode = EngineMode::Effect;
            Some(samples)
        }
        None => {
            config.mode = EngineMode::Synthesizer;
            None
        }
    };
    if let Some(dry_wet) = args.dry_wet {
        config.filter.dry_wet = dry_wet.clamp(0.0, 1.0);
    }
    config.validate()?;

    let sample_rate = config.audio.sample_rate;
    let seconds = args
        .seconds
        .or_else(|| {
            input
                .as_ref()
                .map(|s| s.len() as f32 / sample_rate as f32)
        })
        .unwrap_or(4.0);
    if !(seconds > 0.0 && seconds.is_finite()) {
        anyhow::bail!("--seconds must be positive");
    }
    let frames = (seconds * sample_rate as f32).round() as usize;

    let (mut engine, mut scheduler) = build_engine(&config, &args.matrix)?;
    if config.mode == EngineMode::Synthesizer {
        let voices = engine.excite(args.excite.as_deref())?;
        println!("Excited {voices} voice(s)");
    }

    println!(
        "Rendering {:.2}s in {} mode at {} Hz...",
        seconds,
        config.mode.name(),
        sample_rate
    );
    let pb = ProgressBar::new(frames as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );
    let output = render_offline(&mut scheduler, input.as_deref(), frames, |done| {
        pb.set_position(done as u64);
        engine.poll();
    });
    pb.finish_with_message("done");

    println!("\nStats:");
    println!(
        "  Output: RMS {:.1} dB, Peak {:.1} dB",
        linear_to_db(rms(&output)),
        linear_to_db(peak(&output))
    );

    let spec = WavSpec {
        channels: config.audio.channels,
        sample_rate,
        bits_per_sample: args.bit_depth,
    };
    println!("\nWriting {}...", args.output.display());
    write_wav(&args.output, &output, spec)?;
    println!("Done!");

    Ok(())
}
