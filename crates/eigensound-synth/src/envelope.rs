//! Per-mode amplitude envelope.
//!
//! A modal partial has no attack or sustain stage: it starts at full level and
//! decays exponentially at its mode's rate. A retrigger adds a short linear
//! release on top so the old partial fades out instead of cutting off.
//!
//! ```text
//! Ringing:   level ← level · exp(-rate / sr)
//! Releasing: level ← level · exp(-rate / sr),  fade ← fade - 1 / release_samples
//! Idle:      once level < AUDIBILITY_FLOOR or the fade is spent
//! ```

use crate::mapping::AUDIBILITY_FLOOR;

/// Envelope stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvelopeState {
    /// Finished; contributes nothing.
    #[default]
    Idle,
    /// Free exponential decay.
    Ringing,
    /// Decay plus a linear fade to silence.
    Releasing,
}

/// Exponential decay envelope with an optional linear release.
///
/// Levels are relative to onset (starting at 1.0) and tracked in `f64` so
/// very slow decays do not stall on `f32` rounding.
#[derive(Debug, Clone, Default)]
pub struct DecayEnvelope {
    state: EnvelopeState,
    level: f64,
    coeff: f64,
    fade: f64,
    fade_step: f64,
}

impl DecayEnvelope {
    /// Starts ringing at level 1.0, decaying at `rate` per second.
    pub fn trigger(rate: f32, sample_rate: f32) -> Self {
        Self {
            state: EnvelopeState::Ringing,
            level: 1.0,
            coeff: (-f64::from(rate) / f64::from(sample_rate)).exp(),
            fade: 1.0,
            fade_step: 0.0,
        }
    }

    /// Begins a linear fade to zero over `samples` samples.
    ///
    /// Already releasing envelopes keep their (shorter or equal) fade.
    pub fn release(&mut self, samples: u32) {
        if self.state != EnvelopeState::Ringing {
            return;
        }
        self.state = EnvelopeState::Releasing;
        self.fade_step = self.fade / f64::from(samples.max(1));
    }

    /// Stops immediately.
    pub fn kill(&mut self) {
        self.state = EnvelopeState::Idle;
        self.level = 0.0;
    }

    /// Current stage.
    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    /// Returns `true` unless idle.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.state != EnvelopeState::Idle
    }

    /// Current output level (decay times fade).
    #[inline]
    pub fn level(&self) -> f64 {
        match self.state {
            EnvelopeState::Idle => 0.0,
            EnvelopeState::Ringing => self.level,
            EnvelopeState::Releasing => self.level * self.fade,
        }
    }

    /// Returns the level for this sample and steps to the next.
    #[inline]
    pub fn advance(&mut self) -> f64 {
        let out = self.level();
        match self.state {
            EnvelopeState::Idle => {}
            EnvelopeState::Ringing => {
                self.level *= self.coeff;
                if self.level < AUDIBILITY_FLOOR {
                    self.kill();
                }
            }
            EnvelopeState::Releasing => {
                self.level *= self.coeff;
                self.fade -= self.fade_step;
                if self.fade <= 0.5 * self.fade_step || self.level < AUDIBILITY_FLOOR {
                    self.kill();
                }
            }
        }
        out
    }
}
