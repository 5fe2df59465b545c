//! Modal voices and their construction from an excitation.
//!
//! One [`ModeVoice`] renders one eigenmode as a decaying sinusoid. A voice
//! copies everything it needs (amplitude, frequency, decay) at creation, so
//! it keeps ringing after the eigensystem that produced it is dropped.
//!
//! [`VoiceProjector`] runs on the control thread: it projects an excitation
//! onto the eigenbasis and builds a [`VoiceSet`] that the audio thread then
//! installs without allocating.

use crate::envelope::{DecayEnvelope, EnvelopeState};
use crate::error::{Result, SynthError};
use crate::mapping::ModeMapping;
use core::f64::consts::TAU;
use eigensound_core::{CoreError, Eigensystem};
use num_complex::Complex64;

/// Smallest `|a_k|` that produces a voice.
pub const DEFAULT_MIN_AMPLITUDE: f32 = 1e-3;

/// Highest oscillator frequency as a fraction of the sample rate.
const MAX_FREQUENCY_RATIO: f32 = 0.45;

/// One sounding eigenmode.
///
/// Output per sample is `gain·|a_k|·env(t)·cos(ω_k t + arg a_k)`, produced by
/// rotating a unit phasor rather than evaluating `cos` per sample.
#[derive(Debug, Clone)]
pub struct ModeVoice {
    mode: usize,
    modal_amplitude: Complex64,
    amplitude: f64,
    frequency_hz: f32,
    decay_rate: f32,
    phasor: Complex64,
    rotor: Complex64,
    envelope: DecayEnvelope,
    age: u64,
}

impl ModeVoice {
    /// Builds the voice for mode `mode` with eigenvalue `lambda` and modal
    /// amplitude `a`. `gain` is the headroom scale applied to `|a|`.
    pub fn new(
        mode: usize,
        lambda: Complex64,
        a: Complex64,
        gain: f64,
        mapping: &ModeMapping,
        sample_rate: f32,
    ) -> Self {
        let frequency_hz = mapping
            .frequency_hz(lambda)
            .min(sample_rate * MAX_FREQUENCY_RATIO);
        let decay_rate = mapping.decay_rate(lambda);
        let magnitude = a.norm();
        let phasor = if magnitude > 0.0 {
            a / magnitude
        } else {
            Complex64::ONE
        };
        let omega = TAU * f64::from(frequency_hz) / f64::from(sample_rate);
        Self {
            mode,
            modal_amplitude: a,
            amplitude: magnitude * gain,
            frequency_hz,
            decay_rate,
            phasor,
            rotor: Complex64::from_polar(1.0, omega),
            envelope: DecayEnvelope::trigger(decay_rate, sample_rate),
            age: 0,
        }
    }

    /// Renders one sample and advances phase, envelope and age.
    #[inline]
    pub fn process(&mut self) -> f32 {
        let level = self.envelope.advance();
        let out = self.amplitude * level * self.phasor.re;
        self.phasor *= self.rotor;
        self.age += 1;
        out as f32
    }

    /// Pulls the phasor back onto the unit circle. Called once per block.
    #[inline]
    pub fn renormalize(&mut self) {
        let r = self.phasor.norm();
        if r > 0.0 {
            self.phasor /= r;
        }
    }

    /// Starts a linear fade over `samples` samples.
    pub fn release(&mut self, samples: u32) {
        self.envelope.release(samples);
    }

    /// Eigenmode index within its eigensystem.
    pub fn mode(&self) -> usize {
        self.mode
    }

    /// The complex projection `a_k`.
    pub fn modal_amplitude(&self) -> Complex64 {
        self.modal_amplitude
    }

    /// `|a_k|`.
    pub fn magnitude(&self) -> f64 {
        self.modal_amplitude.norm()
    }

    /// Oscillator frequency in Hz.
    pub fn frequency_hz(&self) -> f32 {
        self.frequency_hz
    }

    /// Exponential decay rate in 1/s.
    pub fn decay_rate(&self) -> f32 {
        self.decay_rate
    }

    /// Instantaneous output amplitude (gain, magnitude and envelope).
    pub fn current_level(&self) -> f64 {
        self.amplitude * self.envelope.level()
    }

    /// Envelope stage.
    pub fn envelope_state(&self) -> EnvelopeState {
        self.envelope.state()
    }

    /// Samples rendered so far.
    pub fn age(&self) -> u64 {
        self.age
    }

    /// Returns `true` until the envelope falls below the audibility floor.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.envelope.is_active()
    }
}

/// The voices produced by one excitation.
#[derive(Debug, Clone, Default)]
pub struct VoiceSet {
    voices: Vec<ModeVoice>,
}

impl VoiceSet {
    /// Empty set able to hold `capacity` voices without reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            voices: Vec::with_capacity(capacity),
        }
    }

    /// Number of voices.
    pub fn len(&self) -> usize {
        self.voices.len()
    }

    /// Returns `true` when no mode was loud enough to sound.
    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Borrow the voices.
    pub fn voices(&self) -> &[ModeVoice] {
        &self.voices
    }

    /// Adds one voice.
    pub fn push(&mut self, voice: ModeVoice) {
        self.voices.push(voice);
    }

    /// Removes every voice, keeping the allocation.
    pub fn clear(&mut self) {
        self.voices.clear();
    }

    /// Moves all voices out, leaving the set empty but allocated.
    pub fn drain(&mut self) -> impl Iterator<Item = ModeVoice> + '_ {
        self.voices.drain(..)
    }
}

/// Control-side excitation projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceProjector {
    mapping: ModeMapping,
    sample_rate: f32,
    min_amplitude: f32,
}

impl VoiceProjector {
    /// Projector for `sample_rate` with the given mapping and amplitude cut.
    pub fn new(mapping: ModeMapping, sample_rate: f32, min_amplitude: f32) -> Self {
        Self {
            mapping,
            sample_rate,
            min_amplitude,
        }
    }

    /// The pitch/decay mapping in use.
    pub fn mapping(&self) -> &ModeMapping {
        &self.mapping
    }

    /// Target sample rate.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Projects `excitation` (all-ones when `None`) onto `system` and returns
    /// one voice per mode with `|a_k| >= min_amplitude`.
    pub fn project(&self, excitation: Option<&[Complex64]>, system: &Eigensystem) -> Result<VoiceSet> {
        let mut set = VoiceSet::with_capacity(system.len());
        self.project_into(excitation, system, &mut set)?;
        Ok(set)
    }

    /// Like [`project`](Self::project), refilling a recycled set.
    ///
    /// On error `set` is left empty.
    pub fn project_into(
        &self,
        excitation: Option<&[Complex64]>,
        system: &Eigensystem,
        set: &mut VoiceSet,
    ) -> Result<()> {
        set.clear();
        let n = system.len();
        if let Some(x) = excitation {
            if x.len() != n {
                return Err(SynthError::Core(CoreError::DimensionMismatch {
                    expected: n,
                    found: x.len(),
                }));
            }
            if let Some(index) = x
                .iter()
                .position(|z| !z.re.is_finite() || !z.im.is_finite())
            {
                return Err(SynthError::NonFiniteExcitation { index });
            }
        }

        let gain = 1.0 / n.max(1) as f64;
        let floor = f64::from(self.min_amplitude);
        for (k, mode) in system.modes().iter().enumerate() {
            let a = match excitation {
                Some(x) => mode.project(x),
                None => mode.vector().iter().map(|v| v.conj()).sum(),
            };
            if a.norm() < floor {
                continue;
            }
            set.push(ModeVoice::new(
                k,
                mode.value(),
                a,
                gain,
                &self.mapping,
                self.sample_rate,
            ));
        }
        Ok(())
    }
}
