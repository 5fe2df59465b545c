//! Running audio streams around an [`AudioScheduler`].
//!
//! The output callback owns the scheduler. Whenever an input device can be
//! opened, a second stream mixes captured audio to mono and feeds it to the
//! output callback through a bounded lock-free queue, so switching to effect
//! mode mid-session filters live input. Missing input reads as silence.
//!
//! The queue holds a few device blocks at most. It is emptied when the
//! output callback first runs, and each callback drops whatever backlog
//! exceeds one block, so clock drift between the two devices cannot build up
//! into permanent latency.

use crate::backend::{AudioBackend, BackendStreamConfig, StreamHandle};
use crate::{Error, Result};
use crate::scheduler::AudioScheduler;
use crossbeam_channel::bounded;
use eigensound_config::EngineConfig;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Capacity of the captured-sample queue, in device blocks.
const INPUT_QUEUE_BLOCKS: usize = 4;

/// Stream parameters for a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Requested sample rate in Hz.
    pub sample_rate: u32,
    /// Device callback size in frames.
    pub buffer_size: u32,
    /// Output channel count.
    pub channels: u16,
    /// Input channel count.
    pub input_channels: u16,
    /// Output device filter.
    pub output_device: Option<String>,
    /// Input device filter.
    pub input_device: Option<String>,
    /// Open an input stream.
    pub capture_input: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl SessionConfig {
    /// Session parameters from the `[audio]` section. Input is captured in
    /// every mode so the engine can switch to effect mode while running.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            sample_rate: config.audio.sample_rate,
            buffer_size: config.audio.block_size as u32,
            channels: config.audio.channels,
            input_channels: 1,
            output_device: config.audio.output_device.clone(),
            input_device: config.audio.input_device.clone(),
            capture_input: true,
        }
    }
}

/// Live streams; dropping the session stops them.
pub struct AudioSession {
    backend: String,
    running: Arc<AtomicBool>,
    errors: Arc<AtomicU32>,
    input: Option<StreamHandle>,
    _output: StreamHandle,
}

impl AudioSession {
    /// Opens the streams and starts rendering `scheduler`.
    ///
    /// A failing input stream is logged and the session continues with
    /// silent input. A failing output stream is returned as an error.
    pub fn start(
        backend: &dyn AudioBackend,
        scheduler: AudioScheduler,
        config: &SessionConfig,
    ) -> Result<Self> {
        Self::try_start(backend, scheduler, config).map_err(|(e, _)| e)
    }

    /// Like [`start`](Self::start), but when `backend` has no usable output
    /// device the session runs on `fallback` instead.
    pub fn start_or_fallback(
        backend: &dyn AudioBackend,
        fallback: &dyn AudioBackend,
        scheduler: AudioScheduler,
        config: &SessionConfig,
    ) -> Result<Self> {
        match Self::try_start(backend, scheduler, config) {
            Ok(session) => Ok(session),
            Err((e @ (Error::DeviceUnavailable(_) | Error::NoDevice), Some(scheduler))) => {
                tracing::warn!(
                    error = %e,
                    backend = backend.name(),
                    fallback = fallback.name(),
                    "output device unavailable, continuing without sound"
                );
                Self::start(fallback, *scheduler, config)
            }
            Err((e, _)) => Err(e),
        }
    }

    /// On failure the scheduler is handed back whenever the output callback
    /// never ran.
    fn try_start(
        backend: &dyn AudioBackend,
        scheduler: AudioScheduler,
        config: &SessionConfig,
    ) -> std::result::Result<Self, (Error, Option<Box<AudioScheduler>>)> {
        let running = Arc::new(AtomicBool::new(true));
        let errors = Arc::new(AtomicU32::new(0));
        let block = config.buffer_size.max(1) as usize;
        let queue = block * INPUT_QUEUE_BLOCKS;
        let (input_tx, input_rx) = bounded::<f32>(queue);

        // The callback takes the scheduler on its first call; until then it
        // can be recovered from the slot.
        let (slot_tx, slot_rx) = bounded::<AudioScheduler>(1);
        let recover = slot_rx.clone();
        if let Err(e) = slot_tx.try_send(scheduler) {
            let scheduler = Box::new(e.into_inner());
            return Err((Error::Stream("scheduler handoff failed".to_string()), Some(scheduler)));
        }

        let output_config = BackendStreamConfig {
            sample_rate: config.sample_rate,
            buffer_size: config.buffer_size,
            channels: config.channels,
            device_name: config.output_device.clone(),
        };
        let actual = backend.actual_sample_rate(&output_config);
        if actual != config.sample_rate {
            tracing::warn!(
                requested = config.sample_rate,
                actual,
                "device sample rate differs from the engine rate"
            );
        }

        let input = if config.capture_input {
            let input_config = BackendStreamConfig {
                channels: config.input_channels.max(1),
                device_name: config.input_device.clone(),
                ..output_config.clone()
            };
            let channels = usize::from(input_config.channels);
            let running_input = Arc::clone(&running);
            let input_errors = Arc::clone(&errors);
            let stream = backend.build_input_stream(
                &input_config,
                Box::new(move |data: &[f32]| {
                    if !running_input.load(Ordering::Relaxed) {
                        return;
                    }
                    for frame in data.chunks(channels) {
                        let mono = frame.iter().sum::<f32>() / frame.len() as f32;
                        let _ = input_tx.try_send(mono);
                    }
                }),
                Box::new(move |err| {
                    input_errors.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(error = err, "input stream error");
                }),
            );
            match stream {
                Ok(handle) => Some(handle),
                Err(Error::NoDevice) => {
                    tracing::info!("no input device, effect mode filters silence");
                    None
                }
                Err(e) => {
                    tracing::warn!(error = %e, "input unavailable, filtering silence");
                    None
                }
            }
        } else {
            None
        };

        let channels = usize::from(config.channels.max(1));
        let running_output = Arc::clone(&running);
        let output_errors = Arc::clone(&errors);
        let mut scheduler: Option<AudioScheduler> = None;
        let output = backend.build_output_stream(
            &output_config,
            Box::new(move |data: &mut [f32]| {
                if scheduler.is_none() {
                    scheduler = slot_rx.try_recv().ok();
                    if scheduler.is_some() {
                        // Capture may have started before playback.
                        while input_rx.try_recv().is_ok() {}
                    }
                }
                let Some(scheduler) = scheduler.as_mut() else {
                    data.fill(0.0);
                    return;
                };
                if !running_output.load(Ordering::Relaxed) {
                    data.fill(0.0);
                    return;
                }
                let frames = data.len() / channels;
                let excess = input_rx.len().saturating_sub(frames + block);
                for _ in 0..excess {
                    let _ = input_rx.try_recv();
                }
                for frame in data.chunks_mut(channels) {
                    let x = input_rx.try_recv().unwrap_or(0.0);
                    frame.fill(scheduler.next_sample(x));
                }
            }),
            Box::new(move |err| {
                output_errors.fetch_add(1, Ordering::Relaxed);
                tracing::error!(error = err, "output stream error");
            }),
        );
        let output = match output {
            Ok(handle) => handle,
            Err(e) => return Err((e, recover.try_recv().ok().map(Box::new))),
        };

        tracing::info!(
            backend = backend.name(),
            sample_rate = config.sample_rate,
            buffer_size = config.buffer_size,
            input = input.is_some(),
            "audio session started"
        );

        Ok(Self {
            backend: backend.name().to_string(),
            running,
            errors,
            input,
            _output: output,
        })
    }

    /// Name of the backend the streams run on.
    pub fn backend_name(&self) -> &str {
        &self.backend
    }

    /// Whether captured input is being fed to the scheduler.
    pub fn has_input(&self) -> bool {
        self.input.is_some()
    }

    /// Stream errors reported since start.
    pub fn error_count(&self) -> u32 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Outputs silence from the next callback on, without closing streams.
    pub fn pause(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Resumes rendering after [`pause`](Self::pause).
    pub fn resume(&self) {
        self.running.store(true, Ordering::Relaxed);
    }

    /// Whether the callbacks are rendering.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

impl Drop for AudioSession {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        tracing::info!(errors = self.error_count(), "audio session stopped");
    }
}

impl std::fmt::Debug for AudioSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioSession")
            .field("backend", &self.backend)
            .field("errors", &self.error_count())
            .finish_non_exhaustive()
    }
}
