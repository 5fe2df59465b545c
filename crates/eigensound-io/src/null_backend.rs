//! A backend with no hardware.
//!
//! Output callbacks are driven from a plain thread at the real-time pace of
//! the requested sample rate and the rendered audio is discarded. Used when
//! no device can be opened, and in tests.

use crate::backend::{
    AudioBackend, BackendStreamConfig, ErrorCallback, InputCallback, OutputCallback, StreamHandle,
};
use crate::{AudioDevice, Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Silent backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

impl NullBackend {
    /// Creates the backend.
    pub fn new() -> Self {
        Self
    }
}

/// Stops and joins the pacing thread on drop.
struct NullStream {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for NullStream {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl AudioBackend for NullBackend {
    fn name(&self) -> &'static str {
        "null"
    }

    fn list_devices(&self) -> Result<Vec<AudioDevice>> {
        Ok(Vec::new())
    }

    fn default_output_device(&self) -> Result<Option<AudioDevice>> {
        Ok(None)
    }

    fn default_input_device(&self) -> Result<Option<AudioDevice>> {
        Ok(None)
    }

    fn build_output_stream(
        &self,
        config: &BackendStreamConfig,
        mut callback: OutputCallback,
        _error_callback: ErrorCallback,
    ) -> Result<StreamHandle> {
        let frames = config.buffer_size.max(1) as usize;
        let len = frames * usize::from(config.channels.max(1));
        let period =
            Duration::from_secs_f64(frames as f64 / f64::from(config.sample_rate.max(1)));

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let thread = std::thread::Builder::new()
            .name("eigensound-null-audio".to_string())
            .spawn(move || {
                let mut buffer = vec![0.0f32; len];
                let mut deadline = Instant::now();
                while !thread_stop.load(Ordering::Acquire) {
                    callback(&mut buffer);
                    deadline += period;
                    let now = Instant::now();
                    if deadline > now {
                        std::thread::sleep(deadline - now);
                    } else {
                        deadline = now;
                    }
                }
            })
            .map_err(Error::Io)?;

        tracing::info!(
            sample_rate = config.sample_rate,
            buffer_size = config.buffer_size,
            "null output stream started"
        );

        Ok(StreamHandle::new(NullStream {
            stop,
            thread: Some(thread),
        }))
    }

    fn build_input_stream(
        &self,
        _config: &BackendStreamConfig,
        _callback: InputCallback,
        _error_callback: ErrorCallback,
    ) -> Result<StreamHandle> {
        Err(Error::NoDevice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn output_callback_runs_until_dropped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let config = BackendStreamConfig {
            sample_rate: 48000,
            buffer_size: 64,
            channels: 2,
            device_name: None,
        };

        let handle = NullBackend::new()
            .build_output_stream(
                &config,
                Box::new(move |buf: &mut [f32]| {
                    assert_eq!(buf.len(), 128);
                    counter.fetch_add(1, Ordering::Relaxed);
                }),
                Box::new(|_| {}),
            )
            .unwrap();

        std::thread::sleep(Duration::from_millis(50));
        drop(handle);
        let after_drop = calls.load(Ordering::Relaxed);
        assert!(after_drop > 0);

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(calls.load(Ordering::Relaxed), after_drop);
    }

    #[test]
    fn no_input_and_no_devices() {
        let backend = NullBackend::new();
        assert!(backend.list_devices().unwrap().is_empty());
        assert!(matches!(
            backend.build_input_stream(
                &BackendStreamConfig::default(),
                Box::new(|_| {}),
                Box::new(|_| {}),
            ),
            Err(Error::NoDevice)
        ));
    }
}
