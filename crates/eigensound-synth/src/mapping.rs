//! Eigenvalue to sound-parameter mapping.
//!
//! An eigenvalue `λ = σ + iω` becomes a partial: `|ω|` sets the pitch on a
//! linear Hz scale, `σ` sets how fast it dies away.
//!
//! ```text
//! f     = clamp(offset_hz + hz_per_unit·|Im λ|, min_hz, max_hz)
//! decay = decay_scale·Re λ                         (Re λ > 0)
//!       = ln(1 / AUDIBILITY_FLOOR) / sustain_seconds  (Re λ ≤ 0)
//! ```
//!
//! Non-positive real parts (sustained or growing modes) are bounded: they ring
//! for `sustain_seconds` before falling under the audibility floor.

use num_complex::Complex64;

/// Envelope level, relative to onset, below which a mode is inaudible (-80 dB).
pub const AUDIBILITY_FLOOR: f64 = 1e-4;

/// Pitch and decay mapping shared by the synthesizer and the filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeMapping {
    /// Frequency of a mode with zero imaginary part.
    pub offset_hz: f32,
    /// Hz added per unit of `|Im λ|`.
    pub hz_per_unit: f32,
    /// Lower frequency clamp.
    pub min_hz: f32,
    /// Upper frequency clamp.
    pub max_hz: f32,
    /// Multiplier from `Re λ` to decay rate (1/s).
    pub decay_scale: f32,
    /// Ring time of sustained modes, in seconds.
    pub sustain_seconds: f32,
}

impl Default for ModeMapping {
    fn default() -> Self {
        Self {
            offset_hz: 100.0,
            hz_per_unit: 80.0,
            min_hz: 20.0,
            max_hz: 20_000.0,
            decay_scale: 1.0,
            sustain_seconds: 4.0,
        }
    }
}

impl ModeMapping {
    /// Oscillator frequency for `λ`, in Hz.
    pub fn frequency_hz(&self, lambda: Complex64) -> f32 {
        let f = self.offset_hz + self.hz_per_unit * lambda.im.abs() as f32;
        f.clamp(self.min_hz, self.max_hz)
    }

    /// Exponential decay rate for `λ`, in 1/s. Always positive.
    pub fn decay_rate(&self, lambda: Complex64) -> f32 {
        if lambda.re > 0.0 {
            self.decay_scale * lambda.re as f32
        } else {
            self.sustain_rate()
        }
    }

    /// Decay rate that reaches [`AUDIBILITY_FLOOR`] after `sustain_seconds`.
    pub fn sustain_rate(&self) -> f32 {
        ((1.0 / AUDIBILITY_FLOOR).ln() / f64::from(self.sustain_seconds.max(1e-3))) as f32
    }

    /// Returns `true` when `λ` is a sustained or growing mode.
    pub fn is_sustained(lambda: Complex64) -> bool {
        lambda.re <= 0.0
    }
}
