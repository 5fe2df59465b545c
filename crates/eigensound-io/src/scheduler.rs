//! Block scheduler for the audio thread.
//!
//! [`AudioScheduler`] turns per-sample callbacks into fixed-size blocks,
//! routes each block through the active mode and applies master gain. It is
//! paired with a [`SchedulerHandle`] that stays on the control thread.
//!
//! ## Real-time contract
//!
//! Nothing reachable from [`AudioScheduler::render`] allocates, locks, logs
//! or calls the solver. Everything the audio thread needs is built on the
//! control side and handed over:
//!
//! - eigensystems through an `ArcSwapOption` mailbox, adopted only at block
//!   boundaries;
//! - voice sets and mode states through a bounded command channel;
//! - dry/wet and master gain through [`AtomicParam`]s.
//!
//! Whatever the scheduler displaces (old eigensystem `Arc`s, drained voice
//! sets, replaced mode states) travels back over the garbage channel so it
//! is freed on the control thread.
//!
//! ## Latency
//!
//! Input is buffered one full block before it is filtered, so effect mode
//! delays the signal by exactly `block_size` samples.

use crate::param::AtomicParam;
use crate::{Error, Result};
use arc_swap::ArcSwapOption;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use eigensound_config::{EngineConfig, EngineMode};
use eigensound_core::Eigensystem;
use eigensound_synth::{
    ExcitationPolicy, FilterSettings, ModalFilter, ModalSynthesizer, ModeMapping, SmoothedParam,
    SynthSettings, VoiceSet, block,
};
use std::mem;
use std::sync::Arc;

/// Frames kept in circulation between the scheduler and the handle.
const FRAME_POOL: usize = 4;

/// Master gain glide time.
const GAIN_SMOOTHING_MS: f32 = 10.0;

/// Everything needed to build a scheduler and its mode states.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerSettings {
    /// Stream sample rate in Hz.
    pub sample_rate: f32,
    /// Frames per block.
    pub block_size: usize,
    /// Output gain before the clamp.
    pub master_gain: f32,
    /// Pitch and decay mapping shared by both modes.
    pub mapping: ModeMapping,
    /// Synthesizer voice settings.
    pub synth: SynthSettings,
    /// Resonator bank settings.
    pub filter: FilterSettings,
    /// Mode the scheduler starts in.
    pub mode: EngineMode,
    /// Depth of the command queue.
    pub command_capacity: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl SchedulerSettings {
    /// Settings described by an engine configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            sample_rate: config.audio.sample_rate as f32,
            block_size: config.audio.block_size,
            master_gain: config.audio.master_gain,
            mapping: config.synth.mapping(),
            synth: config.synth.settings(),
            filter: config.filter_settings(),
            mode: config.mode,
            command_capacity: 64,
        }
    }
}

/// The per-mode processing state the scheduler dispatches on.
#[derive(Debug, Clone)]
pub enum ModeState {
    /// Voice pool rendering excitations.
    Synthesizer(ModalSynthesizer),
    /// Resonator banks filtering the input.
    Effect(ModalFilter),
}

impl ModeState {
    /// Fresh state for `mode`. Allocates; build it off the audio thread.
    pub fn for_mode(mode: EngineMode, settings: &SchedulerSettings) -> Self {
        match mode {
            EngineMode::Synthesizer => Self::Synthesizer(ModalSynthesizer::new(
                settings.sample_rate,
                settings.mapping,
                settings.synth,
            )),
            EngineMode::Effect => Self::Effect(ModalFilter::new(
                settings.sample_rate,
                settings.mapping,
                settings.filter,
            )),
        }
    }

    /// Which mode this state belongs to.
    pub fn mode(&self) -> EngineMode {
        match self {
            Self::Synthesizer(_) => EngineMode::Synthesizer,
            Self::Effect(_) => EngineMode::Effect,
        }
    }
}

/// Control-to-audio messages.
#[derive(Debug)]
pub enum Command {
    /// Install voices built by a projection. Ignored in effect mode.
    Excite(VoiceSet),
    /// Replace the active mode state.
    SetMode(Box<ModeState>),
    /// Change the synthesizer's excitation policy.
    SetPolicy(ExcitationPolicy),
    /// Release every voice, or clear the filter state.
    Silence,
}

/// Objects the audio thread hands back for deallocation.
#[derive(Debug)]
pub enum Garbage {
    /// A superseded or rejected eigensystem.
    Eigensystem(Arc<Eigensystem>),
    /// A drained voice set, or one that arrived in effect mode.
    Voices(VoiceSet),
    /// A replaced mode state.
    Mode(Box<ModeState>),
}

/// Visualization copy of one rendered block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockFrame {
    /// Output samples after master gain and clamp.
    pub samples: Vec<f32>,
    /// Peak absolute sample.
    pub peak: f32,
    /// RMS level.
    pub rms: f32,
    /// Sounding synthesizer voices (zero in effect mode).
    pub live_voices: usize,
    /// Mode that rendered the block.
    pub mode: EngineMode,
    /// Revision of the eigensystem in use, if any.
    pub revision: Option<u64>,
    /// Blocks rendered before this one.
    pub index: u64,
}

impl BlockFrame {
    fn with_capacity(block_size: usize) -> Self {
        Self {
            samples: Vec::with_capacity(block_size),
            peak: 0.0,
            rms: 0.0,
            live_voices: 0,
            mode: EngineMode::default(),
            revision: None,
            index: 0,
        }
    }
}

/// State shared between the two halves.
#[derive(Debug)]
struct Shared {
    eigensystem: ArcSwapOption<Eigensystem>,
    dry_wet: AtomicParam,
    master_gain: AtomicParam,
}

/// Audio-thread half: renders blocks.
#[derive(Debug)]
pub struct AudioScheduler {
    shared: Arc<Shared>,
    commands: Receiver<Command>,
    garbage: Sender<Garbage>,
    frames: Sender<BlockFrame>,
    recycled: Receiver<BlockFrame>,
    state: Box<ModeState>,
    eigensystem: Option<Arc<Eigensystem>>,
    gain: SmoothedParam,
    input: Vec<f32>,
    output: Vec<f32>,
    pos: usize,
    blocks: u64,
}

/// Control-thread half: publishes eigensystems and commands, collects
/// garbage and frames.
#[derive(Debug)]
pub struct SchedulerHandle {
    shared: Arc<Shared>,
    commands: Sender<Command>,
    garbage: Receiver<Garbage>,
    frames: Receiver<BlockFrame>,
    recycle: Sender<BlockFrame>,
}

impl AudioScheduler {
    /// Builds a connected scheduler and handle.
    pub fn new(settings: &SchedulerSettings) -> (Self, SchedulerHandle) {
        let block_size = settings.block_size.max(1);
        let command_capacity = settings.command_capacity.max(1);

        let shared = Arc::new(Shared {
            eigensystem: ArcSwapOption::empty(),
            dry_wet: AtomicParam::new(settings.filter.dry_wet, 0.0, 1.0),
            master_gain: AtomicParam::new(settings.master_gain, 0.0, 1.0),
        });

        let (command_tx, command_rx) = bounded(command_capacity);
        // Every command can displace at most one object, plus one
        // eigensystem per block.
        let (garbage_tx, garbage_rx) = bounded(command_capacity * 2 + 8);
        let (frame_tx, frame_rx) = bounded(FRAME_POOL);
        let (recycle_tx, recycle_rx) = bounded(FRAME_POOL);
        for _ in 0..FRAME_POOL {
            let _ = recycle_tx.try_send(BlockFrame::with_capacity(block_size));
        }

        let scheduler = Self {
            shared: Arc::clone(&shared),
            commands: command_rx,
            garbage: garbage_tx,
            frames: frame_tx,
            recycled: recycle_rx,
            state: Box::new(ModeState::for_mode(settings.mode, settings)),
            eigensystem: None,
            gain: SmoothedParam::with_config(
                settings.master_gain.clamp(0.0, 1.0),
                settings.sample_rate,
                GAIN_SMOOTHING_MS,
            ),
            input: vec![0.0; block_size],
            output: vec![0.0; block_size],
            pos: block_size,
            blocks: 0,
        };

        let handle = SchedulerHandle {
            shared,
            commands: command_tx,
            garbage: garbage_rx,
            frames: frame_rx,
            recycle: recycle_tx,
        };

        (scheduler, handle)
    }

    /// Frames per block.
    pub fn block_size(&self) -> usize {
        self.output.len()
    }

    /// The mode currently rendering.
    pub fn mode(&self) -> EngineMode {
        self.state.mode()
    }

    /// The eigensystem currently in use.
    pub fn eigensystem(&self) -> Option<&Arc<Eigensystem>> {
        self.eigensystem.as_ref()
    }

    /// Sounding synthesizer voices; zero in effect mode.
    pub fn live_voice_count(&self) -> usize {
        match &*self.state {
            ModeState::Synthesizer(synth) => synth.live_voice_count(),
            ModeState::Effect(_) => 0,
        }
    }

    /// Blocks rendered so far.
    pub fn blocks_rendered(&self) -> u64 {
        self.blocks
    }

    /// Feeds one input sample and returns one output sample.
    #[inline]
    pub fn next_sample(&mut self, input: f32) -> f32 {
        if self.pos == self.output.len() {
            self.run_block();
            self.pos = 0;
        }
        let out = self.output[self.pos];
        self.input[self.pos] = input;
        self.pos += 1;
        out
    }

    /// Renders `output.len()` mono samples.
    ///
    /// `input` is the live signal for effect mode; missing samples read as
    /// silence.
    pub fn render(&mut self, input: Option<&[f32]>, output: &mut [f32]) {
        for (i, y) in output.iter_mut().enumerate() {
            let x = input.and_then(|s| s.get(i)).copied().unwrap_or(0.0);
            *y = self.next_sample(x);
        }
    }

    fn run_block(&mut self) {
        self.drain_commands();
        self.adopt_eigensystem();

        match &mut *self.state {
            ModeState::Synthesizer(synth) => synth.render_into(&mut self.output),
            ModeState::Effect(filter) => {
                filter.set_dry_wet(self.shared.dry_wet.get());
                filter.process_block(&self.input, &mut self.output);
            }
        }

        self.gain.set_target(self.shared.master_gain.get());
        for s in &mut self.output {
            let y = *s * self.gain.advance();
            *s = if y.is_finite() { y.clamp(-1.0, 1.0) } else { 0.0 };
        }

        self.publish_frame();
        self.blocks += 1;
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                Command::Excite(set) => {
                    let emptied = match &mut *self.state {
                        ModeState::Synthesizer(synth) => synth.trigger(set),
                        ModeState::Effect(_) => set,
                    };
                    self.discard(Garbage::Voices(emptied));
                }
                Command::SetMode(mut state) => {
                    if let (ModeState::Effect(filter), Some(system)) =
                        (&mut *state, self.eigensystem.as_deref())
                    {
                        filter.set_eigensystem(system);
                    }
                    let old = mem::replace(&mut self.state, state);
                    self.discard(Garbage::Mode(old));
                }
                Command::SetPolicy(policy) => {
                    if let ModeState::Synthesizer(synth) = &mut *self.state {
                        synth.set_policy(policy);
                    }
                }
                Command::Silence => match &mut *self.state {
                    ModeState::Synthesizer(synth) => synth.release_all(),
                    ModeState::Effect(filter) => filter.reset(),
                },
            }
        }
    }

    fn adopt_eigensystem(&mut self) {
        let Some(incoming) = self.shared.eigensystem.swap(None) else {
            return;
        };
        if !incoming.is_finite() {
            self.discard(Garbage::Eigensystem(incoming));
            return;
        }
        if let ModeState::Effect(filter) = &mut *self.state {
            filter.set_eigensystem(&incoming);
        }
        if let Some(old) = self.eigensystem.replace(incoming) {
            self.discard(Garbage::Eigensystem(old));
        }
    }

    fn publish_frame(&mut self) {
        let Ok(mut frame) = self.recycled.try_recv() else {
            return;
        };
        frame.samples.clear();
        frame.samples.extend_from_slice(&self.output);
        frame.peak = block::peak(&self.output);
        frame.rms = block::rms(&self.output);
        frame.live_voices = self.live_voice_count();
        frame.mode = self.state.mode();
        frame.revision = self.eigensystem.as_ref().map(|s| s.revision());
        frame.index = self.blocks;
        // A full queue means the control side is behind; the frame is lost
        // with the failed send.
        let _ = self.frames.try_send(frame);
    }

    fn discard(&self, garbage: Garbage) {
        // When the control side stops collecting, the object is dropped here.
        let _ = self.garbage.try_send(garbage);
    }
}

impl SchedulerHandle {
    /// Queues a command for the next block boundary.
    pub fn send(&self, command: Command) -> Result<()> {
        self.commands.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => Error::QueueFull,
            TrySendError::Disconnected(_) => Error::Stream("audio scheduler dropped".to_string()),
        })
    }

    /// Publishes `system` for adoption at the next block boundary.
    ///
    /// Overwrites a snapshot the scheduler has not yet picked up.
    pub fn publish_eigensystem(&self, system: Arc<Eigensystem>) {
        let _ = self.shared.eigensystem.swap(Some(system));
    }

    /// Sets the effect-mode wet ratio, clamped to `[0, 1]`.
    pub fn set_dry_wet(&self, value: f32) {
        self.shared.dry_wet.set(value);
    }

    /// Current wet ratio.
    pub fn dry_wet(&self) -> f32 {
        self.shared.dry_wet.get()
    }

    /// Sets the master gain, clamped to `[0, 1]`.
    pub fn set_master_gain(&self, value: f32) {
        self.shared.master_gain.set(value);
    }

    /// Current master gain.
    pub fn master_gain(&self) -> f32 {
        self.shared.master_gain.get()
    }

    /// Frees everything the scheduler has handed back. Returns the count.
    pub fn collect_garbage(&self) -> usize {
        self.garbage.try_iter().count()
    }

    /// Takes the newest published frame, returning older ones to the pool.
    pub fn poll_frames(&self) -> Option<BlockFrame> {
        let mut latest = None;
        for frame in self.frames.try_iter() {
            if let Some(stale) = latest.replace(frame) {
                self.recycle_frame(stale);
            }
        }
        latest
    }

    /// Returns a frame to the pool once it is no longer displayed.
    pub fn recycle_frame(&self, frame: BlockFrame) {
        let _ = self.recycle.try_send(frame);
    }
}
