//! Filter live input through the eigenmode resonator bank.

use super::common::{
    EngineArgs, MatrixArgs, build_engine, load_config, open_session, run_until_stopped,
};
use super::play::linear_to_db;
use clap::Args;
use eigensound_config::EngineMode;
use std::path::Path;

#[derive(Args, Debug)]
pub struct EffectArgs {
    #[command(flatten)]
    matrix: MatrixArgs,

    #[command(flatten)]
    engine: EngineArgs,

    /// Wet ratio (0 = dry input, 1 = resonators only)
    #[arg(long)]
    dry_wet: Option<f32>,

    /// Seconds to run (0 = until Ctrl+C)
    #[arg(short, long, default_value = "0")]
    seconds: f32,
}

pub fn run(config_path: Option<&Path>, args: EffectArgs) -> anyhow::Result<()> {
    let mut config = load_config(config_path, &args.matrix, Some(&args.engine))?;
    config.mode = EngineMode::Effect;
    if let Some(dry_wet) = args.dry_wet {
        config.filter.dry_wet = dry_wet.clamp(0.0, 1.0);
    }

    let (mut engine, scheduler) = build_engine(&config, &args.matrix)?;
    let session = open_session(&config, scheduler)?;

    let modes = engine.eigensystem().map_or(0, |s| s.len());
    println!("Modal filter with {modes} resonator(s) on '{}'", session.backend_name());
    println!(
        "  Input:  {}",
        config.audio.input_device.as_deref().unwrap_or("default")
    );
    println!(
        "  Output: {}",
        config.audio.output_device.as_deref().unwrap_or("default")
    );
    println!("  Dry/wet: {:.2}", engine.dry_wet());
    if !session.has_input() {
        println!("  [!] No input stream; the filter will only hear silence");
    }
    println!("\nPress Ctrl+C to stop...\n");

    let mut peak = 0.0f32;
    run_until_stopped(&mut engine, args.seconds, |engine, _| {
        if let Some(frame) = engine.latest_frame() {
            peak = peak.max(frame.peak);
        }
        Ok(())
    })?;

    println!("Peak level: {:.1} dB", linear_to_db(peak));
    println!("Done!");
    Ok(())
}
