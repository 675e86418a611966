//! 单帧分析流水线
//!
//! color mask → ROI proposal → dedup → per-ROI detection (deadline checked)
//! → enabled filter → ratio gate → NMS → temporal confirmation.

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::Serialize;

use super::config::{ConfigPatch, PipelineConfig};
use super::dedup::dedup_regions;
use super::detector::{DetectorBackend, Detection, RoiDetector};
use super::nms::non_max_suppression;
use super::proposer::{propose, RoiCandidate};
use super::ratio_gate::ratio_gate;
use super::tracker::TemporalTracker;
use crate::core::color::ColorMask;
use crate::core::error::ScanError;
use crate::core::video::{Frame, FrameInfo};

const MAX_STATS_THREADS: usize = 4;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub rois: Vec<RoiCandidate>,
    pub proposal_ms: f64,
    pub inference_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameResults {
    pub frame: FrameInfo,
    pub detections: Vec<Detection>,
    pub total_ms: f64,
    pub fps: f64,
    pub rois: usize,
    pub drops: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugInfo>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum FrameOutcome {
    Results(FrameResults),
    /// Deadline hit; partial work was discarded.
    Timeout { drops: u64 },
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Characters in first-seen order, duplicates removed.
fn ordered_set(characters: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(characters.len());
    for c in characters {
        if !out.contains(c) {
            out.push(c.clone());
        }
    }
    out
}

/// Per-session analysis context. Owns every piece of cross-frame state.
pub struct FramePipeline {
    config: PipelineConfig,
    /// Ordered; a detector label index is a position in this list.
    enabled: Vec<String>,
    pool: rayon::ThreadPool,
    detector: RoiDetector,
    tracker: TemporalTracker,
    frame_index: u64,
    drops: u64,
    debug: bool,
}

impl FramePipeline {
    pub fn new(
        config: PipelineConfig,
        backend: Option<Box<dyn DetectorBackend>>,
    ) -> Result<Self, ScanError> {
        let threads = num_cpus::get().clamp(1, MAX_STATS_THREADS);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("spotter-stats-{}", i))
            .build()?;

        info!(
            "🚀 FramePipeline: {} characters, deadline {} ms, {} stats threads",
            config.characters.len(),
            config.deadline_ms,
            threads
        );

        Ok(Self {
            enabled: ordered_set(&config.characters),
            tracker: TemporalTracker::from_config(&config),
            detector: RoiDetector::new(backend),
            config,
            pool,
            frame_index: 0,
            drops: 0,
            debug: false,
        })
    }

    pub fn color_only(config: PipelineConfig) -> Result<Self, ScanError> {
        Self::new(config, None)
    }

    /// Analyze one frame. Never fails: overruns come back as `Timeout`.
    pub fn process(&mut self, frame: &Frame) -> FrameOutcome {
        self.frame_index += 1;
        let start = Instant::now();
        let deadline = self.config.deadline();

        let mask = ColorMask::from_frame(frame);
        let config = &self.config;
        let enabled = &self.enabled;
        let candidates = self.pool.install(|| propose(&mask, config, enabled));
        let mut rois = dedup_regions(candidates, frame.width, frame.height, config.dedup_iou);
        rois.truncate(config.max_rois);

        let proposal_time = start.elapsed();
        if proposal_time > deadline {
            return self.timeout(frame, "proposal", proposal_time);
        }

        let inference_start = Instant::now();
        let mut detections = Vec::new();
        for roi in &rois {
            let elapsed = start.elapsed();
            if elapsed > deadline {
                return self.timeout(frame, "inference", elapsed);
            }
            let found = self.detector.detect(
                frame,
                roi.rect,
                self.config.input_size,
                &self.enabled,
                self.config.score_threshold,
            );
            detections.extend(found.into_iter().filter(|d| self.enabled.contains(&d.label)));
        }
        let inference_time = inference_start.elapsed();

        let gated = ratio_gate(detections, &mask, &self.config);
        let merged = non_max_suppression(gated, self.config.nms_iou);
        let tracked = self.tracker.update(self.frame_index, merged);

        let total = start.elapsed();
        let total_ms = ms(total);
        let confirmed = tracked.iter().filter(|d| d.confirmed).count();

        if self.debug {
            info!(
                "🧪 Frame {}: {} ROIs, proposal {:.1} ms, inference {:.1} ms, {} detections ({} confirmed)",
                frame.frame_number,
                rois.len(),
                ms(proposal_time),
                ms(inference_time),
                tracked.len(),
                confirmed
            );
        } else {
            debug!(
                "Frame {}: {} ROIs, {} detections ({} confirmed), {:.1} ms",
                frame.frame_number,
                rois.len(),
                tracked.len(),
                confirmed,
                total_ms
            );
        }

        let roi_count = rois.len();
        let debug = self.debug.then(|| DebugInfo {
            rois,
            proposal_ms: ms(proposal_time),
            inference_ms: ms(inference_time),
        });

        FrameOutcome::Results(FrameResults {
            frame: FrameInfo::from_frame(frame),
            detections: tracked,
            total_ms,
            fps: if total_ms > 0.0 { 1000.0 / total_ms } else { 0.0 },
            rois: roi_count,
            drops: self.drops,
            debug,
        })
    }

    fn timeout(&mut self, frame: &Frame, stage: &str, elapsed: Duration) -> FrameOutcome {
        self.drops += 1;
        // the frame still advances the clock
        self.tracker.sweep(self.frame_index);
        warn!(
            "⏱️ Frame {} over deadline during {} ({:.1} ms > {} ms), drops={}",
            frame.frame_number,
            stage,
            ms(elapsed),
            self.config.deadline_ms,
            self.drops
        );
        FrameOutcome::Timeout { drops: self.drops }
    }

    /// Enabling appends at the end; disabling removes.
    pub fn toggle_character(&mut self, character: &str, enabled: bool) {
        if enabled {
            if !self.enabled.iter().any(|c| c == character) {
                self.enabled.push(character.to_string());
            }
        } else {
            self.enabled.retain(|c| c != character);
        }
        info!(
            "🎯 {} {}; enabled: {:?}",
            character,
            if enabled { "enabled" } else { "disabled" },
            self.enabled
        );
    }

    pub fn apply_patch(&mut self, patch: &ConfigPatch) {
        self.config.apply(patch);
        if patch.characters.is_some() {
            self.enabled = ordered_set(&self.config.characters);
        }
        self.tracker.reconfigure(&self.config);
        info!("⚙️ Pipeline config updated");
    }

    pub fn set_debug(&mut self, enabled: bool) {
        self.debug = enabled;
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn set_backend(&mut self, backend: Option<Box<dyn DetectorBackend>>) {
        self.detector.set_backend(backend);
    }

    pub fn has_backend(&self) -> bool {
        self.detector.has_backend()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn enabled(&self) -> &[String] {
        &self.enabled
    }

    pub fn drops(&self) -> u64 {
        self.drops
    }

    /// Frames received so far, including timed-out ones.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn tracker(&self) -> &TemporalTracker {
        &self.tracker
    }
}
