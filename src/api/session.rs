//! 寻找角色会话：生产端句柄 + 独立分析线程

use std::thread::JoinHandle;

use log::{info, warn};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

use super::models::{Command, PipelineEvent, SessionStats};
use crate::core::error::ScanError;
use crate::core::video::{Frame, RawFrame};
use crate::scanner::{
    ConfigPatch, DetectorBackend, FrameMailbox, FramePipeline, FrameSampler, Offer, PipelineConfig,
};

/// Producer-side handle to a running analysis worker.
///
/// Frames go through the sampler and the single-slot mailbox, so the worker
/// never holds more than one frame in flight plus one pending here.
///
/// The pending frame is only handed to the worker when the completion event
/// of the in-flight one is read, through `try_next_event`, `next_event` or
/// `next_event_blocking`. A host that submits without draining events keeps
/// its newest frame parked and sees nothing new.
///
/// ```ignore
/// let mut session = SpotterSession::start(PipelineConfig::default(), None)?;
/// session.submit_frame(frame)?;
/// while let Some(event) = session.try_next_event()? {
///     // render / persist confirmed detections
/// }
/// ```
pub struct SpotterSession {
    commands: UnboundedSender<Command>,
    events: UnboundedReceiver<PipelineEvent>,
    mailbox: FrameMailbox<Frame>,
    sampler: FrameSampler,
    stats: SessionStats,
    worker: Option<JoinHandle<()>>,
}

impl SpotterSession {
    /// Spawn the worker. `backend` of `None` runs color-only.
    pub fn start(
        config: PipelineConfig,
        backend: Option<Box<dyn DetectorBackend>>,
    ) -> Result<Self, ScanError> {
        crate::init_logging();

        let sampler = FrameSampler::new(config.frame_interval);
        let pipeline = FramePipeline::new(config, backend)?;
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let worker = std::thread::Builder::new()
            .name("spotter-worker".to_string())
            .spawn(move || run_worker(pipeline, command_rx, event_tx))?;

        info!("🔎 SpotterSession: started");
        Ok(Self {
            commands: command_tx,
            events: event_rx,
            mailbox: FrameMailbox::new(),
            sampler,
            stats: SessionStats::default(),
            worker: Some(worker),
        })
    }

    /// Offer a captured frame. Returns whether it passed the sampler.
    pub fn submit_frame(&mut self, frame: Frame) -> Result<bool, ScanError> {
        self.stats.frames_seen += 1;
        if !self.sampler.accept() {
            return Ok(false);
        }
        self.stats.frames_sampled += 1;

        match self.mailbox.offer(frame) {
            Offer::Dispatch(frame) => self.dispatch(frame)?,
            Offer::Held => {}
            Offer::Replaced(_) => self.stats.frames_superseded += 1,
        }
        Ok(true)
    }

    /// Convert a YUV420 camera frame and offer it.
    pub fn submit_raw_frame(&mut self, raw: &RawFrame) -> Result<bool, ScanError> {
        self.submit_frame(raw.to_rgba()?)
    }

    pub fn toggle_character(&self, character: &str, enabled: bool) -> Result<(), ScanError> {
        self.send(Command::ToggleCharacter {
            character: character.to_string(),
            enabled,
        })
    }

    /// `frameInterval` is applied here; everything else goes to the worker.
    pub fn update_config(&mut self, patch: ConfigPatch) -> Result<(), ScanError> {
        if let Some(interval) = patch.frame_interval {
            self.sampler.set_interval(interval);
        }
        self.send(Command::UpdateConfig(patch))
    }

    pub fn set_debug(&self, enabled: bool) -> Result<(), ScanError> {
        self.send(Command::SetDebug(enabled))
    }

    /// Non-blocking poll.
    pub fn try_next_event(&mut self) -> Result<Option<PipelineEvent>, ScanError> {
        match self.events.try_recv() {
            Ok(event) => {
                self.on_event(&event)?;
                Ok(Some(event))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(ScanError::SessionClosed),
        }
    }

    /// Block the calling thread until the next event. Must not be called
    /// from inside an async runtime; use [`Self::next_event`] there.
    pub fn next_event_blocking(&mut self) -> Result<PipelineEvent, ScanError> {
        let event = self
            .events
            .blocking_recv()
            .ok_or(ScanError::SessionClosed)?;
        self.on_event(&event)?;
        Ok(event)
    }

    pub async fn next_event(&mut self) -> Result<PipelineEvent, ScanError> {
        let event = self.events.recv().await.ok_or(ScanError::SessionClosed)?;
        self.on_event(&event)?;
        Ok(event)
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn frame_interval(&self) -> u32 {
        self.sampler.interval()
    }

    pub fn is_busy(&self) -> bool {
        self.mailbox.is_busy()
    }

    /// Results or timeout frees the slot; a pending frame goes out at once.
    fn on_event(&mut self, event: &PipelineEvent) -> Result<(), ScanError> {
        match event {
            PipelineEvent::Results(results) => self.stats.drops = results.drops,
            PipelineEvent::Timeout { drops } => self.stats.drops = *drops,
            PipelineEvent::Ready => {}
        }
        if event.completes_frame() {
            if let Some(next) = self.mailbox.complete() {
                self.dispatch(next)?;
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, frame: Frame) -> Result<(), ScanError> {
        self.send(Command::Frame(frame))?;
        self.stats.frames_dispatched += 1;
        Ok(())
    }

    fn send(&self, command: Command) -> Result<(), ScanError> {
        self.commands
            .send(command)
            .map_err(|_| ScanError::SessionClosed)
    }
}

impl Drop for SpotterSession {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("⚠️ spotter worker panicked");
            }
        }
        info!("🗑️ SpotterSession: released");
    }
}

/// Worker loop: one command at a time, so frames are analyzed strictly in order.
fn run_worker(
    mut pipeline: FramePipeline,
    mut commands: UnboundedReceiver<Command>,
    events: UnboundedSender<PipelineEvent>,
) {
    if events.send(PipelineEvent::Ready).is_err() {
        return;
    }

    while let Some(command) = commands.blocking_recv() {
        match command {
            Command::Frame(frame) => {
                let event = PipelineEvent::from(pipeline.process(&frame));
                if events.send(event).is_err() {
                    break;
                }
            }
            Command::ToggleCharacter { character, enabled } => {
                pipeline.toggle_character(&character, enabled);
            }
            Command::UpdateConfig(patch) => pipeline.apply_patch(&patch),
            Command::SetDebug(enabled) => {
                info!("🐞 Debug {}", if enabled { "on" } else { "off" });
                pipeline.set_debug(enabled);
            }
            Command::Shutdown => break,
        }
    }
    info!("🛑 spotter worker stopped after {} frames", pipeline.frame_index());
}
