//! Eigensound Synth - eigenmodes rendered as sound
//!
//! Two ways to hear an [`Eigensystem`](eigensound_core::Eigensystem):
//!
//! - [`ModalSynthesizer`] - excite the operator with a vector and listen to
//!   the resulting chord of decaying partials
//! - [`ModalFilter`] - run a live signal through one resonator per mode
//!
//! Both read eigenvalues through the same [`ModeMapping`]: `|Im λ|` sets the
//! pitch, `Re λ` sets the damping.
//!
//! # Real-time Contract
//!
//! Everything that allocates (projection, building a [`VoiceSet`]) happens on
//! the control side. Rendering, installing a voice set and swapping a filter
//! bank work on preallocated storage only.
//!
//! # Example
//!
//! ```rust
//! use eigensound_core::{Complex64, MatrixStore, EigenSolver};
//! use eigensound_synth::{ModalSynthesizer, ModeMapping, SynthSettings};
//!
//! let mut store = MatrixStore::new(3).unwrap();
//! store
//!     .load_diagonal(&[
//!         Complex64::new(0.5, 1.5),
//!         Complex64::new(0.8, 3.0),
//!         Complex64::new(1.2, 4.5),
//!     ])
//!     .unwrap();
//! let system = EigenSolver::new().compute(&store.snapshot()).unwrap();
//!
//! let mut synth = ModalSynthesizer::new(48000.0, ModeMapping::default(), SynthSettings::default());
//! synth.excite(None, &system).unwrap();
//! assert_eq!(synth.live_voice_count(), 3);
//!
//! let block = synth.render_block(256);
//! assert!(block.peak() <= 1.0);
//! ```

pub mod block;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod mapping;
pub mod param;
pub mod resonator;
pub mod synth;
pub mod voice;

pub use block::AudioBlock;
pub use envelope::{DecayEnvelope, EnvelopeState};
pub use error::{Result, SynthError};
pub use filter::{FilterSettings, ModalFilter, ResonatorBank};
pub use mapping::{AUDIBILITY_FLOOR, ModeMapping};
pub use param::SmoothedParam;
pub use resonator::Resonator;
pub use synth::{ExcitationPolicy, ModalSynthesizer, SynthSettings};
pub use voice::{DEFAULT_MIN_AMPLITUDE, ModeVoice, VoiceProjector, VoiceSet};
