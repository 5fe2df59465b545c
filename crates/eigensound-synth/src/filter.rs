//! Modal filter: a live input run through one resonator per eigenmode.
//!
//! Each mode becomes a two-pole [`Resonator`] tuned by the same
//! [`ModeMapping`] the synthesizer uses. Damping sets the bandwidth:
//!
//! ```text
//! bw = clamp(decay_rate / π, min_bandwidth_hz, max_bandwidth_hz)   (Re λ > 0)
//!    = min_bandwidth_hz                                            (Re λ ≤ 0)
//! ```
//!
//! so the resonator's impulse response dies at the mode's own decay rate.
//!
//! # Bank swaps
//!
//! A new eigensystem never replaces the running bank in place. The filter
//! keeps three preallocated banks (active, incoming, pending) and crossfades
//! linearly from active to incoming. An update that lands mid-fade is parked
//! in the pending bank, overwriting any earlier parked update, and starts
//! when the running fade ends. None of this allocates.

use crate::mapping::ModeMapping;
use crate::param::SmoothedParam;
use crate::resonator::Resonator;
use core::f32::consts::PI;
use core::mem;
use eigensound_core::{Eigensystem, MAX_DIMENSION};

/// Highest resonator frequency as a fraction of the sample rate.
const MAX_FREQUENCY_RATIO: f32 = 0.45;

/// Filter tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSettings {
    /// Length of the bank crossfade.
    pub crossfade_ms: f32,
    /// Bandwidth of undamped and growing modes.
    pub min_bandwidth_hz: f32,
    /// Widest band any mode gets.
    pub max_bandwidth_hz: f32,
    /// Initial wet ratio in `[0, 1]`.
    pub dry_wet: f32,
    /// Glide time for dry/wet changes.
    pub dry_wet_smoothing_ms: f32,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            crossfade_ms: 15.0,
            min_bandwidth_hz: 5.0,
            max_bandwidth_hz: 2000.0,
            dry_wet: 0.5,
            dry_wet_smoothing_ms: 20.0,
        }
    }
}

impl FilterSettings {
    /// Resonator bandwidth for a mode with eigenvalue real part `re`.
    pub fn bandwidth_hz(&self, mapping: &ModeMapping, re: f64) -> f32 {
        if re <= 0.0 {
            return self.min_bandwidth_hz;
        }
        let rate = mapping.decay_scale * re as f32;
        (rate / PI).clamp(self.min_bandwidth_hz, self.max_bandwidth_hz.max(self.min_bandwidth_hz))
    }
}

/// Fixed-capacity set of resonators summed with a `1/N` gain.
#[derive(Debug, Clone)]
pub struct ResonatorBank {
    resonators: Vec<Resonator>,
    frequencies: Vec<f32>,
    len: usize,
    gain: f32,
}

impl ResonatorBank {
    /// Empty bank with room for `capacity` modes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            resonators: vec![Resonator::new(); capacity],
            frequencies: vec![0.0; capacity],
            len: 0,
            gain: 0.0,
        }
    }

    /// Retunes to `system`, clearing all filter state.
    ///
    /// Modes beyond the bank's capacity are ignored.
    pub fn configure(
        &mut self,
        system: &Eigensystem,
        mapping: &ModeMapping,
        settings: &FilterSettings,
        sample_rate: f32,
    ) {
        let n = system.len().min(self.resonators.len());
        let ceiling = sample_rate * MAX_FREQUENCY_RATIO;
        for (k, mode) in system.modes().iter().take(n).enumerate() {
            let lambda = mode.value();
            let freq = mapping.frequency_hz(lambda).min(ceiling);
            let bw = settings.bandwidth_hz(mapping, lambda.re);
            self.resonators[k].set_mode(freq, bw, sample_rate);
            self.resonators[k].clear();
            self.frequencies[k] = freq;
        }
        self.len = n;
        self.gain = if n > 0 { 1.0 / n as f32 } else { 0.0 };
    }

    /// Number of tuned resonators.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` before the first configure.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Centre frequencies of the tuned resonators.
    pub fn frequencies(&self) -> &[f32] {
        &self.frequencies[..self.len]
    }

    /// Runs one sample through every resonator and returns the scaled sum.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let mut acc = 0.0;
        for res in &mut self.resonators[..self.len] {
            acc += res.process(input);
        }
        acc * self.gain
    }

    /// Zeroes every delay line.
    pub fn clear(&mut self) {
        for res in &mut self.resonators {
            res.clear();
        }
    }
}

/// Resonator-bank effect with crossfaded eigensystem swaps.
///
/// # Example
///
/// ```rust
/// use eigensound_core::{Complex64, ComplexMatrix, EigenSolver};
/// use eigensound_synth::{FilterSettings, ModalFilter, ModeMapping};
///
/// let h = ComplexMatrix::from_diagonal(&[Complex64::new(10.0, 4.25)]);
/// let system = EigenSolver::new().compute_matrix(&h, false).unwrap();
///
/// let mut filter = ModalFilter::new(48000.0, ModeMapping::default(), FilterSettings::default());
/// filter.set_eigensystem(&system);
///
/// let input = vec![0.1; 256];
/// let mut output = vec![0.0; 256];
/// filter.process_block(&input, &mut output);
/// ```
#[derive(Debug, Clone)]
pub struct ModalFilter {
    sample_rate: f32,
    mapping: ModeMapping,
    settings: FilterSettings,
    active: ResonatorBank,
    incoming: ResonatorBank,
    pending: ResonatorBank,
    has_pending: bool,
    fading: bool,
    fade_pos: u32,
    fade_len: u32,
    dry_wet: SmoothedParam,
}

impl ModalFilter {
    /// Filter with empty banks sized for [`MAX_DIMENSION`] modes.
    pub fn new(sample_rate: f32, mapping: ModeMapping, settings: FilterSettings) -> Self {
        let fade_len = (settings.crossfade_ms * sample_rate / 1000.0).round().max(1.0) as u32;
        Self {
            sample_rate,
            mapping,
            settings,
            active: ResonatorBank::with_capacity(MAX_DIMENSION),
            incoming: ResonatorBank::with_capacity(MAX_DIMENSION),
            pending: ResonatorBank::with_capacity(MAX_DIMENSION),
            has_pending: false,
            fading: false,
            fade_pos: 0,
            fade_len,
            dry_wet: SmoothedParam::with_config(
                settings.dry_wet.clamp(0.0, 1.0),
                sample_rate,
                settings.dry_wet_smoothing_ms,
            ),
        }
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Current settings.
    pub fn settings(&self) -> &FilterSettings {
        &self.settings
    }

    /// Schedules a bank built from `system`.
    ///
    /// Starts a crossfade right away, or parks the bank until the running
    /// fade completes.
    pub fn set_eigensystem(&mut self, system: &Eigensystem) {
        if self.fading {
            self.pending
                .configure(system, &self.mapping, &self.settings, self.sample_rate);
            self.has_pending = true;
        } else {
            self.incoming
                .configure(system, &self.mapping, &self.settings, self.sample_rate);
            self.start_fade();
        }
    }

    /// Sets the wet ratio, clamped to `[0, 1]`.
    pub fn set_dry_wet(&mut self, value: f32) {
        self.dry_wet.set_target(value.clamp(0.0, 1.0));
    }

    /// Target wet ratio.
    pub fn dry_wet(&self) -> f32 {
        self.dry_wet.target()
    }

    /// Returns `true` while a crossfade is running.
    pub fn is_fading(&self) -> bool {
        self.fading
    }

    /// Returns `true` when an update is waiting for the running fade.
    pub fn has_pending(&self) -> bool {
        self.has_pending
    }

    /// The bank currently being faded out (or the only bank when idle).
    pub fn active_bank(&self) -> &ResonatorBank {
        &self.active
    }

    /// Filters one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let mut wet = self.active.process(input);
        if self.fading {
            let t = self.fade_pos as f32 / self.fade_len as f32;
            let fresh = self.incoming.process(input);
            wet += (fresh - wet) * t;
            self.fade_pos += 1;
            if self.fade_pos >= self.fade_len {
                self.finish_fade();
            }
        }
        let mix = self.dry_wet.advance();
        input + (wet - input) * mix
    }

    /// Filters `input` into `output`. Only the common prefix is processed.
    pub fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
        for (x, y) in input.iter().zip(output.iter_mut()) {
            *y = self.process(*x);
        }
    }

    /// Filters `buffer` in place.
    pub fn process_in_place(&mut self, buffer: &mut [f32]) {
        for s in buffer.iter_mut() {
            *s = self.process(*s);
        }
    }

    /// Clears all filter state and completes any fade at once.
    pub fn reset(&mut self) {
        if self.fading {
            mem::swap(&mut self.active, &mut self.incoming);
            self.fading = false;
        }
        if self.has_pending {
            mem::swap(&mut self.active, &mut self.pending);
            self.has_pending = false;
        }
        self.active.clear();
        self.fade_pos = 0;
        self.dry_wet.set_immediate(self.dry_wet.target());
    }

    fn start_fade(&mut self) {
        self.fade_pos = 0;
        self.fading = true;
    }

    fn finish_fade(&mut self) {
        mem::swap(&mut self.active, &mut self.incoming);
        self.fading = false;
        if self.has_pending {
            mem::swap(&mut self.incoming, &mut self.pending);
            self.has_pending = false;
            self.start_fade();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eigensound_core::{Complex64, ComplexMatrix, EigenSolver};

    const SR: f32 = 48000.0;

    fn system(values: &[Complex64]) -> Eigensystem {
        EigenSolver::new()
            .compute_matrix(&ComplexMatrix::from_diagonal(values), false)
            .unwrap()
    }

    fn filter() -> ModalFilter {
        ModalFilter::new(SR, ModeMapping::default(), FilterSettings::default())
    }

    #[test]
    fn bandwidth_follows_damping() {
        let s = FilterSettings::default();
        let m = ModeMapping::default();
        assert_eq!(s.bandwidth_hz(&m, -1.0), 5.0);
        assert_eq!(s.bandwidth_hz(&m, 0.0), 5.0);
        assert!((s.bandwidth_hz(&m, 100.0 * f64::from(PI)) - 100.0).abs() < 1e-3);
        assert_eq!(s.bandwidth_hz(&m, 1e9), 2000.0);
    }

    #[test]
    fn first_update_fades_in_from_silence() {
        let mut f = filter();
        f.set_dry_wet(1.0);
        f.reset();
        f.set_eigensystem(&system(&[Complex64::new(1.0, 4.25)]));
        assert!(f.is_fading());
        assert!(f.active_bank().is_empty());
        assert_eq!(f.process(1.0), 0.0);
        for _ in 0..720 {
            f.process(0.0);
        }
        assert!(!f.is_fading());
        assert_eq!(f.active_bank().frequencies(), &[440.0]);
    }

    #[test]
    fn latest_pending_update_wins() {
        let mut f = filter();
        f.set_eigensystem(&system(&[Complex64::new(1.0, 1.0)]));
        f.set_eigensystem(&system(&[Complex64::new(1.0, 2.0)]));
        f.set_eigensystem(&system(&[Complex64::new(1.0, 3.0)]));
        assert!(f.has_pending());

        let mut scratch = vec![0.0; 720];
        f.process_in_place(&mut scratch);
        assert_eq!(f.active_bank().frequencies(), &[180.0]);
        assert!(f.is_fading());
        f.process_in_place(&mut scratch);
        assert!(!f.is_fading());
        assert_eq!(f.active_bank().frequencies(), &[340.0]);
    }

    #[test]
    fn dry_only_passes_input() {
        let mut f = ModalFilter::new(
            SR,
            ModeMapping::default(),
            FilterSettings {
                dry_wet: 0.0,
                ..FilterSettings::default()
            },
        );
        f.set_eigensystem(&system(&[Complex64::new(1.0, 4.25)]));
        let input = [0.25, -0.5, 0.75];
        let mut out = [0.0; 3];
        f.process_block(&input, &mut out);
        assert_eq!(out, input);
    }

    #[test]
    fn dry_wet_is_clamped() {
        let mut f = filter();
        f.set_dry_wet(3.0);
        assert_eq!(f.dry_wet(), 1.0);
        f.set_dry_wet(-1.0);
        assert_eq!(f.dry_wet(), 0.0);
    }

    #[test]
    fn oversized_system_is_truncated() {
        let values: Vec<Complex64> = (0..6)
            .map(|k| Complex64::new(1.0, f64::from(k)))
            .collect();
        let sys = system(&values);
        let mut bank = ResonatorBank::with_capacity(4);
        bank.configure(&sys, &ModeMapping::default(), &FilterSettings::default(), SR);
        assert_eq!(bank.len(), 4);
    }
}
