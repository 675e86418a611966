pub mod config;
pub mod dedup;
pub mod detector;
pub mod mailbox;
pub mod nms;
pub mod pipeline;
pub mod proposer;
pub mod ratio_gate;
pub mod rules;
pub mod tracker;

pub use config::{ConfigPatch, PipelineConfig, RoiConfig};
pub use detector::{Detection, DetectorBackend, DetectorInput, MockDetector, RoiDetector};
pub use mailbox::{FrameMailbox, FrameSampler, Offer};
pub use pipeline::{DebugInfo, FrameOutcome, FramePipeline, FrameResults};
pub use proposer::RoiCandidate;
pub use rules::{ColorRule, NegativeRule, PositiveRule};
pub use tracker::{TemporalTracker, TrackState};
