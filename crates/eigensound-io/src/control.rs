//! Control-side engine: matrix edits, solving and publication.
//!
//! [`EngineController`] is the single entry point a front end talks to. Every
//! successful edit bumps the store revision and triggers a fresh
//! decomposition; the result is published to the audio thread and kept as
//! the last known good eigensystem. A failed decomposition is logged and
//! recorded in [`last_error`](EngineController::last_error) while the
//! previous eigensystem stays in use.

use crate::scheduler::{
    AudioScheduler, BlockFrame, Command, ModeState, SchedulerHandle, SchedulerSettings,
};
use crate::spectrum::SpectrumAnalyzer;
use crate::{Error, Result};
use eigensound_config::{EngineConfig, EngineMode};
use eigensound_core::{Complex64, CoreError, EigenSolver, Eigensystem, FactoryPreset, MatrixStore};
use eigensound_synth::{ExcitationPolicy, VoiceProjector};
use std::sync::Arc;

/// A whole-matrix replacement.
#[derive(Debug, Clone, PartialEq)]
pub enum MatrixPreset {
    /// Built-in layout at a given dimension.
    Factory {
        /// Layout.
        preset: FactoryPreset,
        /// N.
        dimension: usize,
    },
    /// Diagonal matrix; N is the length.
    Diagonal(Vec<Complex64>),
    /// Diagonal plus the same values on both neighbouring bands.
    Tridiagonal {
        /// N diagonal entries.
        diagonal: Vec<Complex64>,
        /// N - 1 band entries.
        off: Vec<Complex64>,
    },
    /// Diagonal plus independent super- and sub-diagonal bands.
    TridiagonalBands {
        /// N diagonal entries.
        diagonal: Vec<Complex64>,
        /// N - 1 super-diagonal entries.
        upper: Vec<Complex64>,
        /// N - 1 sub-diagonal entries.
        lower: Vec<Complex64>,
    },
    /// Circulant matrix generated by its first row.
    Circulant(Vec<Complex64>),
}

/// Owns the operator and drives the audio thread through a
/// [`SchedulerHandle`].
///
/// # Example
///
/// ```rust
/// use eigensound_core::Complex64;
/// use eigensound_io::{EngineController, SchedulerSettings};
///
/// let (mut engine, _scheduler) = EngineController::new(6, false, SchedulerSettings::default()).unwrap();
/// engine.set_entry(0, 0, Complex64::new(0.2, 4.0)).unwrap();
/// assert!(engine.last_error().is_none());
/// assert_eq!(engine.eigensystem().unwrap().len(), 6);
/// ```
#[derive(Debug)]
pub struct EngineController {
    store: MatrixStore,
    solver: EigenSolver,
    eigensystem: Option<Arc<Eigensystem>>,
    last_error: Option<CoreError>,
    projector: VoiceProjector,
    settings: SchedulerSettings,
    mode: EngineMode,
    handle: SchedulerHandle,
    latest: Option<BlockFrame>,
    analyzer: SpectrumAnalyzer,
    spectrum: Vec<f32>,
}

impl EngineController {
    /// Controller over an `n x n` identity, with its scheduler.
    pub fn new(
        n: usize,
        hermitian: bool,
        settings: SchedulerSettings,
    ) -> Result<(Self, AudioScheduler)> {
        let mut store = MatrixStore::new(n)?;
        store.set_hermitian(hermitian);
        Ok(Self::with_parts(store, EigenSolver::new(), settings))
    }

    /// Controller over an existing store and solver.
    ///
    /// The store is solved once before returning.
    pub fn with_parts(
        store: MatrixStore,
        solver: EigenSolver,
        settings: SchedulerSettings,
    ) -> (Self, AudioScheduler) {
        let (scheduler, handle) = AudioScheduler::new(&settings);
        let projector = VoiceProjector::new(
            settings.mapping,
            settings.sample_rate,
            settings.synth.min_amplitude,
        );
        let analyzer = SpectrumAnalyzer::new(settings.block_size);
        let spectrum = Vec::with_capacity(analyzer.bins());

        let mut controller = Self {
            store,
            solver,
            eigensystem: None,
            last_error: None,
            projector,
            mode: settings.mode,
            settings,
            handle,
            latest: None,
            analyzer,
            spectrum,
        };
        controller.refresh();
        (controller, scheduler)
    }

    /// Controller and scheduler built from an engine configuration.
    pub fn from_config(config: &EngineConfig) -> Result<(Self, AudioScheduler)> {
        let mut store = MatrixStore::new(config.matrix.dimension)?;
        store.set_hermitian(config.matrix.hermitian);
        store.load_factory(config.matrix.factory_preset()?, config.matrix.dimension)?;
        Ok(Self::with_parts(
            store,
            EigenSolver::with_config(config.solver_config()),
            SchedulerSettings::from_config(config),
        ))
    }

    // ------------------------------------------------------------------
    // Matrix edits
    // ------------------------------------------------------------------

    /// Writes `H[row][col]`.
    pub fn set_entry(&mut self, row: usize, col: usize, value: Complex64) -> Result<()> {
        self.store.set(row, col, value)?;
        self.refresh();
        Ok(())
    }

    /// Adds `delta` to `H[row][col]`.
    pub fn adjust_entry(&mut self, row: usize, col: usize, delta: Complex64) -> Result<()> {
        self.store.adjust(row, col, delta)?;
        self.refresh();
        Ok(())
    }

    /// Applies the fixed damping or coupling step to one cell.
    pub fn nudge(&mut self, row: usize, col: usize) -> Result<()> {
        self.store.nudge(row, col)?;
        self.refresh();
        Ok(())
    }

    /// Replaces the whole matrix.
    pub fn load_preset(&mut self, preset: MatrixPreset) -> Result<()> {
        match &preset {
            MatrixPreset::Factory { preset, dimension } => {
                self.store.load_factory(*preset, *dimension)?;
            }
            MatrixPreset::Diagonal(d) => self.store.load_diagonal(d)?,
            MatrixPreset::Tridiagonal { diagonal, off } => {
                self.store.load_tridiagonal(diagonal, off)?;
            }
            MatrixPreset::TridiagonalBands {
                diagonal,
                upper,
                lower,
            } => self.store.load_tridiagonal_bands(diagonal, upper, lower)?,
            MatrixPreset::Circulant(row) => self.store.load_circulant(row)?,
        }
        tracing::info!(dimension = self.store.dimension(), "matrix preset loaded");
        self.refresh();
        Ok(())
    }

    /// Turns the Hermitian constraint on or off.
    pub fn set_hermitian(&mut self, on: bool) {
        if on == self.store.hermitian() {
            return;
        }
        self.store.set_hermitian(on);
        tracing::info!(hermitian = on, "hermitian constraint changed");
        self.refresh();
    }

    /// Resets to the `n x n` identity.
    pub fn resize(&mut self, n: usize) -> Result<()> {
        self.store.resize(n)?;
        tracing::info!(dimension = n, "matrix resized");
        self.refresh();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Sound
    // ------------------------------------------------------------------

    /// Projects `excitation` (all-ones when `None`) onto the current
    /// eigensystem and sends the voices to the audio thread.
    ///
    /// Returns the number of voices started.
    pub fn excite(&mut self, excitation: Option<&[Complex64]>) -> Result<usize> {
        let system = self.eigensystem.as_ref().ok_or(Error::NoEigensystem)?;
        let voices = self.projector.project(excitation, system)?;
        let count = voices.len();
        self.handle.send(Command::Excite(voices))?;
        tracing::debug!(voices = count, revision = system.revision(), "excitation sent");
        Ok(count)
    }

    /// Switches between synthesis and filtering.
    pub fn set_mode(&mut self, mode: EngineMode) -> Result<()> {
        if mode == self.mode {
            return Ok(());
        }
        let state = Box::new(ModeState::for_mode(mode, &self.settings));
        self.handle.send(Command::SetMode(state))?;
        self.mode = mode;
        self.settings.mode = mode;
        tracing::info!(%mode, "mode changed");
        Ok(())
    }

    /// Layer or retrigger on excitation.
    pub fn set_policy(&mut self, policy: ExcitationPolicy) -> Result<()> {
        self.handle.send(Command::SetPolicy(policy))?;
        self.settings.synth.policy = policy;
        Ok(())
    }

    /// Fades out every voice, or clears the filter state.
    pub fn silence(&mut self) -> Result<()> {
        self.handle.send(Command::Silence)
    }

    /// Effect-mode wet ratio in `[0, 1]`.
    pub fn set_dry_wet(&mut self, value: f32) {
        self.handle.set_dry_wet(value);
    }

    /// Output gain in `[0, 1]`.
    pub fn set_master_gain(&mut self, value: f32) {
        self.handle.set_master_gain(value);
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// The last eigensystem that solved successfully.
    pub fn eigensystem(&self) -> Option<&Arc<Eigensystem>> {
        self.eigensystem.as_ref()
    }

    /// Why the most recent decomposition failed, cleared on the next success.
    pub fn last_error(&self) -> Option<&CoreError> {
        self.last_error.as_ref()
    }

    /// Read-only view of the operator.
    pub fn store(&self) -> &MatrixStore {
        &self.store
    }

    /// Mode most recently requested.
    pub fn mode(&self) -> EngineMode {
        self.mode
    }

    /// Excitation policy most recently requested.
    pub fn policy(&self) -> ExcitationPolicy {
        self.settings.synth.policy
    }

    /// Current effect-mode wet ratio.
    pub fn dry_wet(&self) -> f32 {
        self.handle.dry_wet()
    }

    /// Current master gain.
    pub fn master_gain(&self) -> f32 {
        self.handle.master_gain()
    }

    /// Settings the scheduler was built with.
    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Frees returned objects and picks up the newest frame.
    ///
    /// Call regularly from the control loop. Returns `true` when a new frame
    /// arrived.
    pub fn poll(&mut self) -> bool {
        self.handle.collect_garbage();
        let Some(frame) = self.handle.poll_frames() else {
            return false;
        };
        self.analyzer.analyze_into(&frame.samples, &mut self.spectrum);
        if let Some(old) = self.latest.replace(frame) {
            self.handle.recycle_frame(old);
        }
        true
    }

    /// The newest block seen by [`poll`](Self::poll).
    pub fn latest_frame(&self) -> Option<&BlockFrame> {
        self.latest.as_ref()
    }

    /// Magnitude spectrum of [`latest_frame`](Self::latest_frame).
    pub fn spectrum(&self) -> &[f32] {
        &self.spectrum
    }

    /// Frequency of spectrum bin `k` in Hz.
    pub fn spectrum_bin_hz(&self, k: usize) -> f32 {
        self.analyzer.bin_frequency(k, self.settings.sample_rate)
    }

    fn refresh(&mut self) {
        let snapshot = self.store.snapshot();
        match self.solver.compute(&snapshot) {
            Ok(system) => {
                let system = Arc::new(system);
                tracing::debug!(
                    revision = system.revision(),
                    modes = system.len(),
                    path = ?system.path(),
                    "eigensystem updated"
                );
                self.handle.publish_eigensystem(Arc::clone(&system));
                self.eigensystem = Some(system);
                self.last_error = None;
            }
            Err(e) => {
                tracing::warn!(
                    revision = snapshot.revision(),
                    error = %e,
                    "decomposition failed, keeping previous eigensystem"
                );
                self.last_error = Some(e);
            }
        }
        self.handle.collect_garbage();
    }
}
