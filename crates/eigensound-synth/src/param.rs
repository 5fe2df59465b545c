//! One-pole parameter smoothing for zipper-free control changes.
//!
//! ```rust
//! use eigensound_synth::SmoothedParam;
//!
//! let mut mix = SmoothedParam::with_config(0.0, 48000.0, 20.0);
//! mix.set_target(1.0);
//! for _ in 0..4800 {
//!     let _ = mix.advance();
//! }
//! assert!((mix.get() - 1.0).abs() < 0.01);
//! ```

use libm::expf;

/// A control value that glides exponentially toward its target.
#[derive(Debug, Clone)]
pub struct SmoothedParam {
    current: f32,
    target: f32,
    /// Per-sample step fraction; 1.0 means instant.
    coeff: f32,
}

impl SmoothedParam {
    /// Unsmoothed parameter at `initial`.
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            coeff: 1.0,
        }
    }

    /// Parameter with a time constant of `smoothing_time_ms` at `sample_rate`.
    pub fn with_config(initial: f32, sample_rate: f32, smoothing_time_ms: f32) -> Self {
        Self {
            coeff: smoothing_coeff(sample_rate, smoothing_time_ms),
            ..Self::new(initial)
        }
    }

    /// Sets the value to glide toward.
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Jumps straight to `value`.
    #[inline]
    pub fn set_immediate(&mut self, value: f32) {
        self.target = value;
        self.current = value;
    }

    /// Advances one sample and returns the new value.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        self.current += self.coeff * (self.target - self.current);
        self.current
    }

    /// Current value.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// Target value.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Returns `true` once within 1e-6 of the target.
    #[inline]
    pub fn is_settled(&self) -> bool {
        (self.current - self.target).abs() < 1e-6
    }
}

// coeff = 1 - exp(-1 / (tau · sr)): 63% of the way after one time constant.
fn smoothing_coeff(sample_rate: f32, smoothing_time_ms: f32) -> f32 {
    if smoothing_time_ms <= 0.0 || sample_rate <= 0.0 {
        1.0
    } else {
        let samples = smoothing_time_ms / 1000.0 * sample_rate;
        1.0 - expf(-1.0 / samples)
    }
}

impl Default for SmoothedParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}
