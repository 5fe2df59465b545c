//! Magnitude spectrum of output blocks for visualization.

use rustfft::{Fft, FftPlanner, num_complex::Complex};
use std::f32::consts::PI;
use std::sync::Arc;

/// Hann-windowed magnitude spectrum with a cached plan.
///
/// Blocks shorter than the FFT size are zero-padded. Magnitudes are scaled
/// so a full-scale sine at a bin centre reads close to `1.0`.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    scale: f32,
    buffer: Vec<Complex<f32>>,
    size: usize,
}

impl SpectrumAnalyzer {
    /// Analyzer for the smallest power of two holding `block_size` samples.
    pub fn new(block_size: usize) -> Self {
        let size = block_size.max(2).next_power_of_two();
        let fft = FftPlanner::new().plan_fft_forward(size);
        let window: Vec<f32> = (0..size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos()))
            .collect();
        let sum: f32 = window.iter().sum();
        Self {
            fft,
            window,
            scale: 2.0 / sum,
            buffer: vec![Complex::new(0.0, 0.0); size],
            size,
        }
    }

    /// FFT length.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of bins produced, DC through Nyquist.
    pub fn bins(&self) -> usize {
        self.size / 2 + 1
    }

    /// Centre frequency of bin `k`.
    pub fn bin_frequency(&self, k: usize, sample_rate: f32) -> f32 {
        k as f32 * sample_rate / self.size as f32
    }

    /// Writes the magnitude spectrum of `samples` into `out`.
    pub fn analyze_into(&mut self, samples: &[f32], out: &mut Vec<f32>) {
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let x = samples.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(x * self.window[i], 0.0);
        }
        self.fft.process(&mut self.buffer);

        out.clear();
        out.extend(
            self.buffer[..self.bins()]
                .iter()
                .map(|c| c.norm() * self.scale),
        );
    }

    /// Allocating form of [`analyze_into`](Self::analyze_into).
    pub fn analyze(&mut self, samples: &[f32]) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.bins());
        self.analyze_into(samples, &mut out);
        out
    }
}

impl std::fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectrumAnalyzer")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}
