//! Two-pole resonator used by the modal filter.
//!
//! A band-pass biquad with constant peak gain, parameterized directly by its
//! pole radius instead of Q:
//!
//! ```text
//! r  = exp(-π · bw / sr)            θ = 2π · f / sr
//! y[n] = b0·x[n] + b2·x[n-2] - a1·y[n-1] - a2·y[n-2]
//! a1 = -2r·cos θ   a2 = r²   b0 = (1 - r²) / 2   b2 = -b0
//! ```
//!
//! `r < 1` for any positive bandwidth, so the filter is always stable.

use core::f32::consts::PI;
use libm::{cosf, expf};

/// Narrowest bandwidth accepted, in Hz.
pub const MIN_BANDWIDTH_HZ: f32 = 0.1;

/// Two-pole band-pass resonator, Direct Form I.
#[derive(Debug, Clone, Default)]
pub struct Resonator {
    b0: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Resonator {
    /// Silent resonator (all coefficients zero).
    pub fn new() -> Self {
        Self::default()
    }

    /// Resonator centred on `frequency` Hz with bandwidth `bandwidth` Hz.
    pub fn with_mode(frequency: f32, bandwidth: f32, sample_rate: f32) -> Self {
        let mut r = Self::new();
        r.set_mode(frequency, bandwidth, sample_rate);
        r
    }

    /// Retunes without clearing the delay lines.
    pub fn set_mode(&mut self, frequency: f32, bandwidth: f32, sample_rate: f32) {
        let radius = expf(-PI * bandwidth.max(MIN_BANDWIDTH_HZ) / sample_rate);
        let theta = 2.0 * PI * frequency / sample_rate;
        self.a1 = -2.0 * radius * cosf(theta);
        self.a2 = radius * radius;
        self.b0 = (1.0 - self.a2) * 0.5;
        self.b2 = -self.b0;
    }

    /// Pole radius `r`.
    pub fn radius(&self) -> f32 {
        libm::sqrtf(self.a2)
    }

    /// Filters one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.b2 * self.x2 - self.a1 * self.y1 - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }

    /// Zeroes the delay lines.
    pub fn clear(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}
