//! Decompose the configured matrix and print its eigenmodes.

use super::common::{MatrixArgs, build_engine, format_complex, load_config};
use clap::Args;
use eigensound_core::{Eigensystem, SolverPath};
use eigensound_synth::ModeMapping;
use serde::Serialize;
use std::path::Path;

#[derive(Args, Debug)]
pub struct SolveArgs {
    #[command(flatten)]
    matrix: MatrixArgs,

    /// Print the eigensystem as JSON
    #[arg(long)]
    json: bool,

    /// Include the eigenvectors in the table output
    #[arg(long)]
    vectors: bool,
}

#[derive(Serialize)]
struct ModeReport {
    index: usize,
    re: f64,
    im: f64,
    frequency_hz: f32,
    decay_rate: f32,
    vector: Vec<[f64; 2]>,
}

#[derive(Serialize)]
struct SolveReport {
    dimension: usize,
    hermitian: bool,
    path: &'static str,
    revision: u64,
    max_residual: f64,
    orthonormality_error: f64,
    modes: Vec<ModeReport>,
}

fn path_name(path: SolverPath) -> &'static str {
    match path {
        SolverPath::Hermitian => "hermitian",
        SolverPath::General => "general",
    }
}

impl SolveReport {
    fn new(
        system: &Eigensystem,
        hermitian: bool,
        max_residual: f64,
        mapping: &ModeMapping,
    ) -> Self {
        let modes = system
            .modes()
            .iter()
            .enumerate()
            .map(|(index, mode)| {
                let lambda = mode.value();
                ModeReport {
                    index,
                    re: lambda.re,
                    im: lambda.im,
                    frequency_hz: mapping.frequency_hz(lambda),
                    decay_rate: mapping.decay_rate(lambda),
                    vector: mode.vector().iter().map(|z| [z.re, z.im]).collect(),
                }
            })
            .collect();
        Self {
            dimension: system.len(),
            hermitian,
            path: path_name(system.path()),
            revision: system.revision(),
            max_residual,
            orthonormality_error: system.orthonormality_error(),
            modes,
        }
    }
}

pub fn run(config_path: Option<&Path>, args: SolveArgs) -> anyhow::Result<()> {
    let config = load_config(config_path, &args.matrix, None)?;
    let (engine, _scheduler) = build_engine(&config, &args.matrix)?;

    let Some(system) = engine.eigensystem() else {
        anyhow::bail!("no eigensystem was computed");
    };
    let store = engine.store();
    let residual = system.max_residual(store.matrix())?;
    let report = SolveReport::new(
        system,
        store.hermitian(),
        residual,
        &config.synth.mapping(),
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "Eigensystem: {}x{} ({} path, revision {})",
        report.dimension, report.dimension, report.path, report.revision
    );
    println!();
    println!(
        "  {:>3}  {:>28}  {:>10}  {:>10}",
        "#", "lambda", "freq (Hz)", "decay (/s)"
    );
    for (mode, report_mode) in system.modes().iter().zip(&report.modes) {
        println!(
            "  {:>3}  {:>28}  {:>10.2}  {:>10.3}",
            report_mode.index,
            format_complex(mode.value()),
            report_mode.frequency_hz,
            report_mode.decay_rate
        );
        if args.vectors {
            for z in mode.vector() {
                println!("         {}", format_complex(*z));
            }
        }
    }
    println!();
    println!("Max residual:         {:.3e}", report.max_residual);
    println!("Orthonormality error: {:.3e}", report.orthonormality_error);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use eigensound_core::Complex64;

    #[test]
    fn report_lists_modes_in_order() {
        let system = Eigensystem::from_pairs(
            vec![
                (Complex64::new(0.0, 2.0), vec![Complex64::new(1.0, 0.0)]),
            ],
            SolverPath::General,
        )
        .unwrap();
        let report = SolveReport::new(&system, false, 0.0, &ModeMapping::default());
        assert_eq!(report.dimension, 1);
        assert_eq!(report.path, "general");
        assert_eq!(report.modes[0].vector, vec![[1.0, 0.0]]);
        assert!((report.modes[0].frequency_hz - 260.0).abs() < 1e-3);
    }
}
