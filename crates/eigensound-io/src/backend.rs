//! Audio backend abstraction.
//!
//! [`AudioBackend`] hides the platform audio API behind boxed callbacks so
//! the engine can run on cpal hardware or on the silent [`NullBackend`]
//! chosen at runtime.
//!
//! ```text
//!   AudioSession
//!        │ Box<dyn AudioBackend>
//!        ▼
//!  ┌─────────────┐   ┌──────────────┐
//!  │ CpalBackend │   │ NullBackend  │
//!  │ (hardware)  │   │ (no device)  │
//!  └─────────────┘   └──────────────┘
//! ```
//!
//! [`NullBackend`]: crate::NullBackend

use crate::{AudioDevice, Result};

/// Parameters for one stream.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendStreamConfig {
    /// Requested sample rate in Hz.
    pub sample_rate: u32,
    /// Preferred callback size in frames.
    pub buffer_size: u32,
    /// Interleaved channel count.
    pub channels: u16,
    /// Device name filter; the system default when `None`.
    pub device_name: Option<String>,
}

impl Default for BackendStreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: 256,
            channels: 2,
            device_name: None,
        }
    }
}

/// Keeps a running stream alive; dropping it stops the stream.
pub struct StreamHandle {
    _inner: Box<dyn Send>,
}

impl StreamHandle {
    /// Wraps a backend-specific stream object.
    pub fn new<T: Send + 'static>(stream: T) -> Self {
        Self {
            _inner: Box::new(stream),
        }
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle").finish_non_exhaustive()
    }
}

/// Fills an interleaved output buffer on the audio thread.
///
/// Must not allocate, lock, or block.
pub type OutputCallback = Box<dyn FnMut(&mut [f32]) + Send>;

/// Receives an interleaved captured buffer on the audio thread.
pub type InputCallback = Box<dyn FnMut(&[f32]) + Send>;

/// Receives stream errors reported by the backend.
pub type ErrorCallback = Box<dyn FnMut(&str) + Send>;

/// Platform audio API.
///
/// Object-safe so the session can hold a `Box<dyn AudioBackend>`.
pub trait AudioBackend: Send {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// All devices this backend can open.
    fn list_devices(&self) -> Result<Vec<AudioDevice>>;

    /// The default output device, if any.
    fn default_output_device(&self) -> Result<Option<AudioDevice>>;

    /// The default input device, if any.
    fn default_input_device(&self) -> Result<Option<AudioDevice>>;

    /// Builds and starts an output stream.
    fn build_output_stream(
        &self,
        config: &BackendStreamConfig,
        callback: OutputCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle>;

    /// Builds and starts an input stream.
    fn build_input_stream(
        &self,
        config: &BackendStreamConfig,
        callback: InputCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle>;

    /// The rate the stream will actually run at.
    fn actual_sample_rate(&self, config: &BackendStreamConfig) -> u32 {
        config.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stream_config() {
        let config = BackendStreamConfig::default();
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.buffer_size, 256);
        assert_eq!(config.channels, 2);
        assert!(config.device_name.is_none());
    }

    #[test]
    fn stream_handle_debug() {
        let handle = StreamHandle::new(7u8);
        assert!(format!("{handle:?}").contains("StreamHandle"));
    }
}
