//! Integration tests for eigensound-io.
//!
//! These drive the controller and scheduler together: edits on one thread,
//! rendering on another, offline renders written to disk, and the live
//! session on the null backend.

use core::f64::consts::TAU;
use eigensound_config::{EngineConfig, EngineMode};
use eigensound_core::{Complex64, CoreError};
use eigensound_io::{
    EngineController, MatrixPreset, SchedulerSettings, WavSpec, read_wav, render_offline,
    write_wav,
};
use eigensound_synth::ExcitationPolicy;
use tempfile::TempDir;

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

fn settings(block_size: usize) -> SchedulerSettings {
    SchedulerSettings {
        block_size,
        ..SchedulerSettings::default()
    }
}

// ============================================================================
// 1. Controller → scheduler
// ============================================================================

#[test]
fn eigenvalues_follow_ordering_rule() {
    let (mut engine, _scheduler) = EngineController::new(3, false, settings(64)).unwrap();
    engine
        .load_preset(MatrixPreset::Diagonal(vec![c(1.0, 2.0), c(0.0, 5.0), c(-1.0, 0.0)]))
        .unwrap();

    let system = engine.eigensystem().unwrap();
    let values: Vec<Complex64> = system.eigenvalues().collect();
    assert_eq!(values, vec![c(-1.0, 0.0), c(0.0, 5.0), c(1.0, 2.0)]);

    // e3, e2, e1 in matching order.
    for (mode, axis) in system.modes().iter().zip([2, 1, 0]) {
        assert!((mode.vector()[axis] - Complex64::ONE).norm() < 1e-9);
    }
}

#[test]
fn edits_while_rendering_stay_bounded() {
    let (mut engine, mut scheduler) = EngineController::new(4, false, settings(128)).unwrap();
    engine
        .load_preset(MatrixPreset::Factory {
            preset: eigensound_core::FactoryPreset::Tridiagonal,
            dimension: 4,
        })
        .unwrap();
    engine.excite(None).unwrap();

    let audio = std::thread::spawn(move || {
        let mut out = vec![0.0f32; 48000];
        scheduler.render(None, &mut out);
        (out, scheduler)
    });

    for k in 0..20 {
        engine.adjust_entry(k % 4, (k + 1) % 4, c(0.05, 0.0)).unwrap();
        if k % 5 == 0 {
            let _ = engine.excite(None);
        }
        engine.poll();
    }
    let revision = engine.store().revision();

    let (out, mut scheduler) = audio.join().unwrap();
    assert!(out.iter().all(|s| s.is_finite() && s.abs() <= 1.0));

    // Whatever was in flight lands by the next block boundary.
    let mut tail = vec![0.0f32; 256];
    scheduler.render(None, &mut tail);
    assert_eq!(scheduler.eigensystem().unwrap().revision(), revision);
}

#[test]
fn failed_decomposition_is_reported_not_published() {
    let mut config = EngineConfig::default();
    config.solver.max_iterations_per_eigenvalue = 1;
    config.matrix.preset = "diagonal".to_string();
    let (mut engine, mut scheduler) = EngineController::from_config(&config).unwrap();
    assert!(engine.last_error().is_none());
    let good = engine.eigensystem().unwrap().revision();

    engine
        .load_preset(MatrixPreset::Factory {
            preset: eigensound_core::FactoryPreset::Circulant,
            dimension: 6,
        })
        .unwrap();
    assert!(matches!(
        engine.last_error(),
        Some(CoreError::NonConvergence { .. })
    ));

    let mut out = vec![0.0f32; 512];
    scheduler.render(None, &mut out);
    assert_eq!(scheduler.eigensystem().unwrap().revision(), good);
}

#[test]
fn defective_edit_keeps_last_good_system() {
    let (mut engine, _scheduler) = EngineController::new(2, false, settings(64)).unwrap();
    let good = engine.eigensystem().cloned().unwrap();

    engine.nudge(0, 1).unwrap();
    assert!(matches!(
        engine.last_error(),
        Some(CoreError::Defective { .. })
    ));
    assert!(std::sync::Arc::ptr_eq(engine.eigensystem().unwrap(), &good));

    // Splitting the diagonal makes the operator diagonalizable again.
    engine.set_entry(1, 1, c(2.0, 0.0)).unwrap();
    assert!(engine.last_error().is_none());
}

#[test]
fn retrigger_fades_previous_chord() {
    let (mut engine, mut scheduler) = EngineController::new(3, false, settings(64)).unwrap();
    engine
        .load_preset(MatrixPreset::Diagonal(vec![c(0.0, 1.0), c(0.0, 2.0), c(0.0, 3.0)]))
        .unwrap();
    engine.set_policy(ExcitationPolicy::Retrigger).unwrap();

    let mut out = vec![0.0f32; 4800];
    engine.excite(None).unwrap();
    scheduler.render(None, &mut out);
    engine.excite(None).unwrap();
    scheduler.render(None, &mut out);
    assert_eq!(scheduler.live_voice_count(), 3);

    engine.set_policy(ExcitationPolicy::Layer).unwrap();
    engine.excite(None).unwrap();
    scheduler.render(None, &mut out[..64]);
    assert_eq!(scheduler.live_voice_count(), 6);
}

#[test]
fn silence_stops_every_voice() {
    let (mut engine, mut scheduler) = EngineController::new(2, false, settings(64)).unwrap();
    engine
        .load_preset(MatrixPreset::Diagonal(vec![c(0.0, 1.0), c(0.0, 4.0)]))
        .unwrap();
    engine.excite(None).unwrap();
    let mut out = vec![0.0f32; 2400];
    scheduler.render(None, &mut out);

    engine.silence().unwrap();
    scheduler.render(None, &mut out);
    assert_eq!(scheduler.live_voice_count(), 0);
    assert!(out[out.len() - 64..].iter().all(|&s| s == 0.0));
}

// ============================================================================
// 2. Effect mode
// ============================================================================

#[test]
fn effect_mode_resonates_at_mode_frequency() {
    let config = EngineConfig::from_toml(
        r#"
        mode = "effect"

        [audio]
        master_gain = 1.0

        [filter]
        dry_wet = 1.0
        "#,
    )
    .unwrap();
    let lambda = c(0.0, 2.0);
    let filter_tone = |f: f32| -> Vec<f32> {
        let (mut engine, mut scheduler) = EngineController::from_config(&config).unwrap();
        engine.load_preset(MatrixPreset::Diagonal(vec![lambda])).unwrap();
        let sr = f64::from(engine.settings().sample_rate);
        let input: Vec<f32> = (0..24000)
            .map(|i| ((TAU * f64::from(f) * i as f64 / sr).sin() * 0.5) as f32)
            .collect();
        render_offline(&mut scheduler, Some(&input), input.len(), |_| {})
    };
    let rms = |s: &[f32]| (s.iter().map(|x| x * x).sum::<f32>() / s.len() as f32).sqrt();

    let f0 = SchedulerSettings::default().mapping.frequency_hz(lambda);
    let on = filter_tone(f0);
    let off = filter_tone(f0 * 3.0);

    let on_level = rms(&on[12000..]);
    assert!(on_level > 0.25, "on-mode level {on_level}");
    assert!(rms(&off[12000..]) < 0.1 * on_level);
}

#[test]
fn mode_switch_through_controller() {
    let (mut engine, mut scheduler) = EngineController::new(2, false, settings(64)).unwrap();
    engine.set_mode(EngineMode::Effect).unwrap();
    engine.set_dry_wet(0.0);
    engine.set_master_gain(1.0);

    let input = vec![0.3f32; 48000];
    let out = render_offline(&mut scheduler, Some(&input), input.len(), |_| {});
    assert_eq!(scheduler.mode(), EngineMode::Effect);
    // Once the mix has glided to dry, the input passes untouched.
    assert!(out[47000..].iter().all(|&y| (y - 0.3).abs() < 1e-3));
}

// ============================================================================
// 3. Offline render and WAV
// ============================================================================

#[test]
fn offline_render_round_trips_through_wav() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("chord.wav");

    let config = EngineConfig::default();
    let (mut engine, mut scheduler) = EngineController::from_config(&config).unwrap();
    engine.excite(None).unwrap();
    let samples = render_offline(&mut scheduler, None, 9600, |_| {});
    assert!(samples.iter().any(|&s| s != 0.0));

    let spec = WavSpec {
        channels: 2,
        sample_rate: config.audio.sample_rate,
        bits_per_sample: 32,
    };
    write_wav(&path, &samples, spec).unwrap();
    let (read, read_spec) = read_wav(&path).unwrap();
    assert_eq!(read_spec, spec);
    assert_eq!(read, samples);
}

#[test]
fn offline_render_is_deterministic() {
    let render = || {
        let (mut engine, mut scheduler) =
            EngineController::from_config(&EngineConfig::default()).unwrap();
        let x = [c(1.0, 0.0), c(0.0, 1.0), c(0.5, 0.0), c(0.0, 0.0), c(1.0, 1.0), c(0.2, 0.0)];
        engine.excite(Some(&x)).unwrap();
        render_offline(&mut scheduler, None, 4800, |_| {})
    };
    assert_eq!(render(), render());
}
