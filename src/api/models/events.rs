//! 会话消息：生产端 ⇄ 工作线程

use serde::Serialize;

use crate::core::video::Frame;
use crate::scanner::{ConfigPatch, FrameOutcome, FrameResults};

/// Producer → worker.
#[derive(Debug)]
pub enum Command {
    Frame(Frame),
    ToggleCharacter { character: String, enabled: bool },
    UpdateConfig(ConfigPatch),
    SetDebug(bool),
    Shutdown,
}

/// Worker → producer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum PipelineEvent {
    Ready,
    Results(FrameResults),
    Timeout { drops: u64 },
}

impl PipelineEvent {
    /// True for the events that end an in-flight frame.
    pub fn completes_frame(&self) -> bool {
        matches!(self, PipelineEvent::Results(_) | PipelineEvent::Timeout { .. })
    }
}

impl From<FrameOutcome> for PipelineEvent {
    fn from(outcome: FrameOutcome) -> Self {
        match outcome {
            FrameOutcome::Results(results) => PipelineEvent::Results(results),
            FrameOutcome::Timeout { drops } => PipelineEvent::Timeout { drops },
        }
    }
}

/// Producer-side counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    /// Every frame handed to `submit_frame`.
    pub frames_seen: u64,
    /// Frames that passed the sampler.
    pub frames_sampled: u64,
    /// Frames actually sent to the worker.
    pub frames_dispatched: u64,
    /// Pending frames replaced by a newer one before dispatch.
    pub frames_superseded: u64,
    /// Latest drop count reported by the worker.
    pub drops: u64,
}
