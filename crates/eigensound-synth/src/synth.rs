//! Modal synthesizer: a chord of decaying partials, one per eigenmode.
//!
//! The synthesizer owns a preallocated voice pool. Installing a
//! [`VoiceSet`] and rendering never allocate, so both are safe to call from
//! the audio callback; projection ([`begin_excitation`](ModalSynthesizer::begin_excitation))
//! allocates and belongs on the control side.
//!
//! ## Excitation policy
//!
//! - [`ExcitationPolicy::Retrigger`] (default): every sounding voice starts a
//!   short linear release and the new set starts in the same call.
//! - [`ExcitationPolicy::Layer`]: existing voices keep decaying and the new
//!   ones are added on top.
//!
//! When the pool is full the quietest voice is replaced.

use crate::block::AudioBlock;
use crate::error::Result;
use crate::mapping::ModeMapping;
use crate::voice::{DEFAULT_MIN_AMPLITUDE, ModeVoice, VoiceProjector, VoiceSet};
use eigensound_core::Eigensystem;
use num_complex::Complex64;

/// What happens to sounding voices when a new excitation arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExcitationPolicy {
    /// Keep old voices decaying and add the new ones.
    Layer,
    /// Fade old voices out quickly and start the new set.
    #[default]
    Retrigger,
}

/// Synthesizer tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthSettings {
    /// Voice pool size.
    pub max_voices: usize,
    /// Fade length applied to old voices on retrigger or silence.
    pub retrigger_release_ms: f32,
    /// Modes with `|a_k|` below this are not voiced.
    pub min_amplitude: f32,
    /// Layer or retrigger.
    pub policy: ExcitationPolicy,
}

impl Default for SynthSettings {
    fn default() -> Self {
        Self {
            max_voices: 128,
            retrigger_release_ms: 10.0,
            min_amplitude: DEFAULT_MIN_AMPLITUDE,
            policy: ExcitationPolicy::Retrigger,
        }
    }
}

/// Sum of [`ModeVoice`]s rendered into mono blocks.
///
/// # Example
///
/// ```rust
/// use eigensound_core::{Complex64, ComplexMatrix, EigenSolver};
/// use eigensound_synth::{ModalSynthesizer, ModeMapping, SynthSettings};
///
/// let h = ComplexMatrix::from_diagonal(&[Complex64::new(1.0, 1.5), Complex64::new(2.0, 3.0)]);
/// let system = EigenSolver::new().compute_matrix(&h, false).unwrap();
///
/// let mut synth = ModalSynthesizer::new(48000.0, ModeMapping::default(), SynthSettings::default());
/// synth.excite(None, &system).unwrap();
/// let block = synth.render_block(256);
/// assert!(block.peak() > 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct ModalSynthesizer {
    sample_rate: f32,
    projector: VoiceProjector,
    settings: SynthSettings,
    voices: Vec<ModeVoice>,
}

impl ModalSynthesizer {
    /// Creates a silent synthesizer with a pool of `settings.max_voices`.
    pub fn new(sample_rate: f32, mapping: ModeMapping, settings: SynthSettings) -> Self {
        let settings = SynthSettings {
            max_voices: settings.max_voices.max(1),
            ..settings
        };
        Self {
            sample_rate,
            projector: VoiceProjector::new(mapping, sample_rate, settings.min_amplitude),
            settings,
            voices: Vec::with_capacity(settings.max_voices),
        }
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Current settings.
    pub fn settings(&self) -> &SynthSettings {
        &self.settings
    }

    /// A copy of the projector, for building voice sets on another thread.
    pub fn projector(&self) -> VoiceProjector {
        self.projector
    }

    /// Switches between layering and retriggering.
    pub fn set_policy(&mut self, policy: ExcitationPolicy) {
        self.settings.policy = policy;
    }

    /// Current excitation policy.
    pub fn policy(&self) -> ExcitationPolicy {
        self.settings.policy
    }

    /// Projects an excitation onto `system` and returns the voices it would
    /// start. Allocates; does not touch the sounding voices.
    pub fn begin_excitation(
        &self,
        excitation: Option<&[Complex64]>,
        system: &Eigensystem,
    ) -> Result<VoiceSet> {
        self.projector.project(excitation, system)
    }

    /// Installs `incoming` according to the excitation policy.
    ///
    /// Returns the emptied set so its allocation can be reused or dropped
    /// off the audio thread.
    pub fn trigger(&mut self, mut incoming: VoiceSet) -> VoiceSet {
        if self.settings.policy == ExcitationPolicy::Retrigger {
            self.release_all();
        }
        let capacity = self.settings.max_voices;
        for voice in incoming.drain() {
            if self.voices.len() < capacity {
                self.voices.push(voice);
            } else if let Some(slot) = self.quietest() {
                self.voices[slot] = voice;
            }
        }
        incoming
    }

    /// Projects and installs in one call.
    pub fn excite(&mut self, excitation: Option<&[Complex64]>, system: &Eigensystem) -> Result<()> {
        let set = self.begin_excitation(excitation, system)?;
        let _ = self.trigger(set);
        Ok(())
    }

    /// Fades every sounding voice out over the retrigger release time.
    pub fn release_all(&mut self) {
        let samples = self.release_samples();
        for voice in &mut self.voices {
            voice.release(samples);
        }
    }

    /// Drops every voice at once.
    pub fn reset(&mut self) {
        self.voices.clear();
    }

    /// Voices still sounding.
    pub fn live_voice_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    /// Borrow the voice pool.
    pub fn voices(&self) -> &[ModeVoice] {
        &self.voices
    }

    /// Renders `out.len()` samples, overwriting `out`.
    pub fn render_into(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            let mut acc = 0.0;
            for voice in &mut self.voices {
                acc += voice.process();
            }
            *sample = acc;
        }
        self.voices.retain(ModeVoice::is_active);
        for voice in &mut self.voices {
            voice.renormalize();
        }
    }

    /// Renders a freshly allocated block of `frames` samples.
    pub fn render_block(&mut self, frames: usize) -> AudioBlock {
        let mut block = AudioBlock::new(frames);
        self.render_into(block.samples_mut());
        block
    }

    fn release_samples(&self) -> u32 {
        (self.settings.retrigger_release_ms * self.sample_rate / 1000.0)
            .round()
            .max(1.0) as u32
    }

    fn quietest(&self) -> Option<usize> {
        self.voices
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.current_level().total_cmp(&b.current_level()))
            .map(|(i, _)| i)
    }
}
