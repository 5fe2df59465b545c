//! Mono sample buffer produced per render call.

/// A run of mono `f32` frames.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioBlock {
    samples: Vec<f32>,
}

impl AudioBlock {
    /// Silent block of `frames` samples.
    pub fn new(frames: usize) -> Self {
        Self {
            samples: vec![0.0; frames],
        }
    }

    /// Wraps existing samples.
    pub fn from_vec(samples: Vec<f32>) -> Self {
        Self { samples }
    }

    /// Borrow the samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Mutable access for in-place rendering.
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` for a zero-length block.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f32 {
        peak(&self.samples)
    }

    /// Root-mean-square level.
    pub fn rms(&self) -> f32 {
        rms(&self.samples)
    }

    /// Unwraps the sample vector.
    pub fn into_vec(self) -> Vec<f32> {
        self.samples
    }
}

/// Largest absolute value in `samples`, 0.0 when empty.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
}

/// RMS of `samples`, 0.0 when empty.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    libm::sqrtf(sum / samples.len() as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_of_a_square_wave() {
        let block = AudioBlock::from_vec(vec![0.5, -0.5, 0.5, -0.5]);
        assert_eq!(block.peak(), 0.5);
        assert!((block.rms() - 0.5).abs() < 1e-7);
    }

    #[test]
    fn empty_block_is_silent() {
        let block = AudioBlock::new(0);
        assert!(block.is_empty());
        assert_eq!(block.peak(), 0.0);
        assert_eq!(block.rms(), 0.0);
    }
}
