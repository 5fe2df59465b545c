//! Shared CLI helpers used across multiple commands.

use clap::Args;
use eigensound_config::EngineConfig;
use eigensound_core::{Complex64, FactoryPreset};
use eigensound_io::{
    AudioScheduler, AudioSession, CpalBackend, EngineController, MatrixPreset, NullBackend,
    SessionConfig,
};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// How often the control loop collects frames and garbage.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Parse a complex number: `3`, `-0.5`, `2i`, `-i`, `1+2i`, `0.1-1.5j`.
pub fn parse_complex(s: &str) -> Result<Complex64, String> {
    let t: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    let invalid = || format!("invalid complex number '{s}' (expected e.g. 1+2i)");
    if t.is_empty() {
        return Err(invalid());
    }

    let Some(body) = t.strip_suffix(['i', 'j']) else {
        return t.parse().map(|re| Complex64::new(re, 0.0)).map_err(|_| invalid());
    };

    // The imaginary part starts at the last sign that is not an exponent sign.
    let bytes = body.as_bytes();
    let split = (1..bytes.len())
        .rev()
        .find(|&k| matches!(bytes[k], b'+' | b'-') && !matches!(bytes[k - 1], b'e' | b'E'));

    let (re, im) = match split {
        Some(k) => (&body[..k], &body[k..]),
        None => ("", body),
    };
    let re = if re.is_empty() {
        0.0
    } else {
        re.parse().map_err(|_| invalid())?
    };
    let im = match im {
        "" | "+" => 1.0,
        "-" => -1.0,
        other => other.parse().map_err(|_| invalid())?,
    };
    Ok(Complex64::new(re, im))
}

/// A whole comma-separated vector parsed from one flag value.
pub type ComplexVector = Vec<Complex64>;

/// Parse a comma-separated list of complex numbers.
pub fn parse_vector(s: &str) -> Result<ComplexVector, String> {
    s.split(',').map(parse_complex).collect()
}

/// Matrix selection shared by every engine command.
#[derive(Args, Debug, Clone, Default)]
pub struct MatrixArgs {
    /// Factory layout: diagonal, tridiagonal or circulant
    #[arg(long)]
    preset: Option<FactoryPreset>,

    /// Matrix dimension for the factory layout
    #[arg(short = 'n', long)]
    dimension: Option<usize>,

    /// Keep the matrix Hermitian
    #[arg(long)]
    hermitian: bool,

    /// Explicit diagonal, e.g. "1+2i,5i,-1"
    #[arg(long, value_parser = parse_vector)]
    diagonal: Option<ComplexVector>,

    /// Off-diagonal band for a tridiagonal matrix (needs --diagonal)
    #[arg(long, value_parser = parse_vector, requires = "diagonal")]
    off: Option<ComplexVector>,

    /// First row of a circulant matrix
    #[arg(long, value_parser = parse_vector, conflicts_with = "diagonal")]
    circulant: Option<ComplexVector>,
}

impl MatrixArgs {
    /// Writes the factory overrides into `config`.
    pub fn apply(&self, config: &mut EngineConfig) {
        if let Some(preset) = self.preset {
            config.matrix.preset = preset.name().to_string();
        }
        if let Some(n) = self.dimension {
            config.matrix.dimension = n;
        }
        if self.hermitian {
            config.matrix.hermitian = true;
        }
    }

    /// An explicit matrix given on the command line, if any.
    pub fn explicit(&self) -> Option<MatrixPreset> {
        if let Some(row) = &self.circulant {
            return Some(MatrixPreset::Circulant(row.clone()));
        }
        let diagonal = self.diagonal.clone()?;
        Some(match &self.off {
            Some(off) => MatrixPreset::Tridiagonal {
                diagonal,
                off: off.clone(),
            },
            None => MatrixPreset::Diagonal(diagonal),
        })
    }
}

/// Stream overrides shared by the audio commands.
#[derive(Args, Debug, Clone, Default)]
pub struct EngineArgs {
    /// Sample rate in Hz
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Scheduler block size in frames
    #[arg(long)]
    block_size: Option<usize>,

    /// Master gain (0-1)
    #[arg(long)]
    gain: Option<f32>,

    /// Output device name (partial match)
    #[arg(long)]
    output_device: Option<String>,

    /// Input device name (partial match)
    #[arg(long)]
    input_device: Option<String>,
}

impl EngineArgs {
    /// Writes the stream overrides into `config`.
    pub fn apply(&self, config: &mut EngineConfig) {
        if let Some(sr) = self.sample_rate {
            config.audio.sample_rate = sr;
        }
        if let Some(block) = self.block_size {
            config.audio.block_size = block;
        }
        if let Some(gain) = self.gain {
            config.audio.master_gain = gain;
        }
        if self.output_device.is_some() {
            config.audio.output_device.clone_from(&self.output_device);
        }
        if self.input_device.is_some() {
            config.audio.input_device.clone_from(&self.input_device);
        }
    }
}

/// Loads the configuration, applies the overrides and validates the result.
pub fn load_config(
    path: Option<&Path>,
    matrix: &MatrixArgs,
    engine: Option<&EngineArgs>,
) -> anyhow::Result<EngineConfig> {
    let mut config = EngineConfig::load_or_default(path)?;
    matrix.apply(&mut config);
    if let Some(engine) = engine {
        engine.apply(&mut config);
    }
    config.validate()?;
    Ok(config)
}

/// Builds the controller and scheduler, loading any explicit matrix.
///
/// Fails when the operator cannot be decomposed.
pub fn build_engine(
    config: &EngineConfig,
    matrix: &MatrixArgs,
) -> anyhow::Result<(EngineController, AudioScheduler)> {
    let (mut engine, scheduler) = EngineController::from_config(config)?;
    if let Some(preset) = matrix.explicit() {
        engine.load_preset(preset)?;
    }
    if let Some(e) = engine.last_error() {
        anyhow::bail!("decomposition failed: {e}");
    }
    Ok((engine, scheduler))
}

/// Starts the audio session, falling back to the null backend when no
/// output device can be opened.
pub fn open_session(config: &EngineConfig, scheduler: AudioScheduler) -> anyhow::Result<AudioSession> {
    let backend = CpalBackend::new();
    let session = AudioSession::start_or_fallback(
        &backend,
        &NullBackend::new(),
        scheduler,
        &SessionConfig::from_config(config),
    )?;
    Ok(session)
}

/// Runs the control loop until Ctrl+C or until `seconds` elapse (when
/// non-zero). `tick` runs every poll with the elapsed time.
pub fn run_until_stopped<F>(
    engine: &mut EngineController,
    seconds: f32,
    mut tick: F,
) -> anyhow::Result<()>
where
    F: FnMut(&mut EngineController, Duration) -> anyhow::Result<()>,
{
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let limit = (seconds > 0.0).then(|| Duration::from_secs_f32(seconds));
    let start = Instant::now();
    while running.load(Ordering::SeqCst) {
        let elapsed = start.elapsed();
        if limit.is_some_and(|limit| elapsed >= limit) {
            break;
        }
        engine.poll();
        tick(engine, elapsed)?;
        std::thread::sleep(POLL_INTERVAL);
    }
    engine.poll();
    Ok(())
}

/// Formats a complex number as `a+bi`.
pub fn format_complex(z: Complex64) -> String {
    let sign = if z.im < 0.0 { '-' } else { '+' };
    format!("{:.6}{}{:.6}i", z.re, sign, z.im.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn parses_complex_forms() {
        assert_eq!(parse_complex("3"), Ok(c(3.0, 0.0)));
        assert_eq!(parse_complex("-0.5"), Ok(c(-0.5, 0.0)));
        assert_eq!(parse_complex("2i"), Ok(c(0.0, 2.0)));
        assert_eq!(parse_complex("-i"), Ok(c(0.0, -1.0)));
        assert_eq!(parse_complex("1+2i"), Ok(c(1.0, 2.0)));
        assert_eq!(parse_complex(" 0.1 - 1.5j "), Ok(c(0.1, -1.5)));
        assert_eq!(parse_complex("-1-i"), Ok(c(-1.0, -1.0)));
        assert_eq!(parse_complex("1e-3+2e+1i"), Ok(c(1e-3, 20.0)));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_complex("").is_err());
        assert!(parse_complex("abc").is_err());
        assert!(parse_complex("1+2k").is_err());
    }

    #[test]
    fn parses_vectors() {
        assert_eq!(
            parse_vector("1+2i,5i,-1"),
            Ok(vec![c(1.0, 2.0), c(0.0, 5.0), c(-1.0, 0.0)])
        );
    }

    #[test]
    fn explicit_matrix_selection() {
        let args = MatrixArgs {
            diagonal: Some(vec![c(1.0, 0.0), c(2.0, 0.0)]),
            off: Some(vec![c(0.5, 0.0)]),
            ..MatrixArgs::default()
        };
        assert!(matches!(
            args.explicit(),
            Some(MatrixPreset::Tridiagonal { .. })
        ));
        assert!(MatrixArgs::default().explicit().is_none());
    }

    #[test]
    fn overrides_apply_to_config() {
        let mut config = EngineConfig::default();
        MatrixArgs {
            preset: Some(FactoryPreset::Circulant),
            dimension: Some(4),
            hermitian: true,
            ..MatrixArgs::default()
        }
        .apply(&mut config);
        EngineArgs {
            gain: Some(0.25),
            ..EngineArgs::default()
        }
        .apply(&mut config);
        assert_eq!(config.matrix.preset, "circulant");
        assert_eq!(config.matrix.dimension, 4);
        assert!(config.matrix.hermitian);
        assert_eq!(config.audio.master_gain, 0.25);
    }

    #[test]
    fn formats_complex() {
        assert_eq!(format_complex(c(-1.0, 0.0)), "-1.000000+0.000000i");
        assert_eq!(format_complex(c(0.5, -2.0)), "0.500000-2.000000i");
    }
}
