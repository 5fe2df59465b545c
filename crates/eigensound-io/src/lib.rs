//! Real-time engine plumbing for eigensound.
//!
//! This crate provides:
//!
//! - **Scheduling**: [`AudioScheduler`] renders fixed-size blocks on the
//!   audio thread; [`SchedulerHandle`] feeds it from the control thread
//! - **Control**: [`EngineController`] owns the matrix, runs the solver and
//!   publishes each new eigensystem
//! - **Backends**: [`AudioBackend`] with [`CpalBackend`] and the silent
//!   [`NullBackend`]
//! - **Analysis**: [`SpectrumAnalyzer`] for visualization spectra
//! - **Files**: WAV output and offline rendering through the real-time path
//!
//! ## Quick Start
//!
//! ```rust
//! use eigensound_config::EngineConfig;
//! use eigensound_io::{EngineController, render_offline};
//!
//! let config = EngineConfig::default();
//! let (mut controller, mut scheduler) = EngineController::from_config(&config).unwrap();
//!
//! controller.excite(None).unwrap();
//! let samples = render_offline(&mut scheduler, None, 4800, |_| {});
//! assert_eq!(samples.len(), 4800);
//! ```
//!
//! ## Threading
//!
//! ```text
//!  control thread                         audio thread
//!  ──────────────                         ────────────
//!  EngineController ── ArcSwapOption ───▶ AudioScheduler
//!        │          ── Command (bounded) ─▶   │
//!        ◀───────── Garbage (bounded) ─────   │
//!        ◀───────── BlockFrame (bounded) ─────┘
//! ```

pub mod backend;
pub mod control;
pub mod cpal_backend;
pub mod devices;
pub mod null_backend;
pub mod offline;
pub mod param;
pub mod scheduler;
pub mod session;
pub mod spectrum;
pub mod wav;

pub use backend::{
    AudioBackend, BackendStreamConfig, ErrorCallback, InputCallback, OutputCallback, StreamHandle,
};
pub use control::{EngineController, MatrixPreset};
pub use cpal_backend::CpalBackend;
pub use devices::{AudioDevice, default_device, list_devices};
pub use null_backend::NullBackend;
pub use offline::render_offline;
pub use param::AtomicParam;
pub use scheduler::{
    AudioScheduler, BlockFrame, Command, Garbage, ModeState, SchedulerHandle, SchedulerSettings,
};
pub use session::{AudioSession, SessionConfig};
pub use spectrum::SpectrumAnalyzer;
pub use wav::{WavSpec, read_wav, write_wav};

use eigensound_config::ConfigError;
use eigensound_core::CoreError;
use eigensound_synth::SynthError;

/// Error types for engine control and audio I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// A device was found but its stream could not be built or started.
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The audio thread is not draining commands.
    #[error("Command queue full")]
    QueueFull,

    /// Excitation requested before any eigensystem was computed.
    #[error("No eigensystem available")]
    NoEigensystem,

    /// Matrix edit or decomposition failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Excitation projection failure.
    #[error(transparent)]
    Synth(#[from] SynthError),

    /// Configuration that could not be turned into an engine.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for engine and audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
