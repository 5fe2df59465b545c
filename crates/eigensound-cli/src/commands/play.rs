//! Excite the eigenmodes and play the chord through the audio device.

use super::common::{
    ComplexVector, EngineArgs, MatrixArgs, build_engine, load_config, open_session, parse_vector,
    run_until_stopped,
};
use clap::{Args, ValueEnum};
use eigensound_config::{EngineConfig, EngineMode, PolicySetting};
use std::path::Path;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct PlayArgs {
    #[command(flatten)]
    matrix: MatrixArgs,

    #[command(flatten)]
    engine: EngineArgs,

    /// Excitation vector (defaults to equal weight on every mode)
    #[arg(long, value_parser = parse_vector)]
    excite: Option<ComplexVector>,

    /// Seconds to play (0 = until Ctrl+C)
    #[arg(short, long, default_value = "4")]
    seconds: f32,

    /// Re-excite every N milliseconds
    #[arg(long)]
    repeat_ms: Option<u64>,

    /// What happens to ringing voices on a new excitation
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PolicyArg {
    Layer,
    Retrigger,
}

impl From<PolicyArg> for PolicySetting {
    fn from(p: PolicyArg) -> Self {
        match p {
            PolicyArg::Layer => PolicySetting::Layer,
            PolicyArg::Retrigger => PolicySetting::Retrigger,
        }
    }
}

pub fn run(config_path: Option<&Path>, args: PlayArgs) -> anyhow::Result<()> {
    let mut config = load_config(config_path, &args.matrix, Some(&args.engine))?;
    config.mode = EngineMode::Synthesizer;
    if let Some(policy) = args.policy {
        config.synth.policy = policy.into();
    }

    let (mut engine, scheduler) = build_engine(&config, &args.matrix)?;
    let session = open_session(&config, scheduler)?;

    let modes = engine.eigensystem().map_or(0, |s| s.len());
    println!("Playing {modes} eigenmode(s) on '{}'", session.backend_name());
    println!("  Sample rate: {} Hz", config.audio.sample_rate);
    println!("  Block size: {} samples", config.audio.block_size);
    if args.seconds > 0.0 {
        println!("  Duration: {:.1}s", args.seconds);
    }
    println!("\nPress Ctrl+C to stop...\n");

    let excitation = args.excite.as_deref();
    let voices = engine.excite(excitation)?;
    tracing::info!(voices, "excited");

    let repeat = args.repeat_ms.map(Duration::from_millis);
    let mut next_excite = repeat;
    let mut peak = 0.0f32;
    run_until_stopped(&mut engine, args.seconds, |engine, elapsed| {
        if let Some(frame) = engine.latest_frame() {
            peak = peak.max(frame.peak);
        }
        if let (Some(at), Some(every)) = (next_excite, repeat)
            && elapsed >= at
        {
            engine.excite(excitation)?;
            next_excite = Some(at + every);
        }
        Ok(())
    })?;

    engine.silence()?;
    std::thread::sleep(release_tail(&config));
    println!("Peak level: {:.1} dB", linear_to_db(peak));
    if session.error_count() > 0 {
        println!("Stream errors: {}", session.error_count());
    }
    println!("Done!");
    Ok(())
}

/// Time the stream must keep running after `silence` for the fade to reach
/// the device: one release plus one block of slack.
fn release_tail(config: &EngineConfig) -> Duration {
    let release = Duration::from_secs_f32(config.synth.retrigger_release_ms.max(0.0) / 1000.0);
    let block = config.audio.block_size as f32 / config.audio.sample_rate.max(1) as f32;
    release + Duration::from_secs_f32(block) + POLL_SLACK
}

const POLL_SLACK: Duration = Duration::from_millis(20);

pub(crate) fn linear_to_db(x: f32) -> f32 {
    20.0 * x.max(1e-10).log10()
}
