use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use log::info;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::rules::{ColorRule, NegativeRule, PositiveRule};
use crate::core::error::ScanError;

/// Stock rule set, keyed by character name.
static STOCK_RULES: Lazy<BTreeMap<String, ColorRule>> = Lazy::new(|| {
    let mut rules = BTreeMap::new();
    rules.insert(
        "wally".to_string(),
        ColorRule::new(
            PositiveRule::RedWhiteStripes,
            vec![NegativeRule::Orange, NegativeRule::Magenta],
        ),
    );
    rules.insert(
        "wenda".to_string(),
        ColorRule::new(PositiveRule::RedWhiteStripes, vec![NegativeRule::Magenta]),
    );
    rules.insert(
        "odlaw".to_string(),
        ColorRule::new(
            PositiveRule::YellowBlackStripes,
            vec![NegativeRule::YellowBrown],
        ),
    );
    rules.insert(
        "mago".to_string(),
        ColorRule::new(PositiveRule::RedWhiteBeard, vec![NegativeRule::Orange]),
    );
    rules.insert(
        "woof".to_string(),
        ColorRule::new(PositiveRule::RedWhiteSpot, vec![NegativeRule::Orange]),
    );
    rules
});

/// Sliding-window geometry for ROI proposal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoiConfig {
    /// Floor for the smallest window side, in pixels.
    pub min_size: u32,
    /// Smallest window side as a fraction of `min(width, height)`.
    pub size_scale: f32,
    /// Window multiples scanned per frame.
    pub size_multipliers: [f32; 3],
    /// Step as a fraction of the smallest window side.
    pub step_ratio: f32,
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            min_size: 48,
            size_scale: 0.15,
            size_multipliers: [1.0, 1.5, 2.0],
            step_ratio: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// Characters of interest, in label order.
    pub characters: Vec<String>,
    pub color_rules: BTreeMap<String, ColorRule>,
    pub roi: RoiConfig,
    pub deadline_ms: u64,
    pub max_rois: usize,
    /// Detector input side, in pixels.
    pub input_size: u32,
    pub score_threshold: f32,
    pub dedup_iou: f32,
    pub nms_iou: f32,
    pub temporal_window: u64,
    pub temporal_confirmations: usize,
    /// Cells per axis when bucketing detections for the tracker.
    pub track_grid: f32,
    /// Forward every n-th captured frame.
    pub frame_interval: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            characters: vec![
                "wally".to_string(),
                "wenda".to_string(),
                "odlaw".to_string(),
                "mago".to_string(),
                "woof".to_string(),
            ],
            color_rules: STOCK_RULES.clone(),
            roi: RoiConfig::default(),
            deadline_ms: 30,
            max_rois: 12,
            input_size: 160,
            score_threshold: 0.45,
            dedup_iou: 0.35,
            nms_iou: 0.45,
            temporal_window: 4,
            temporal_confirmations: 2,
            track_grid: 20.0,
            frame_interval: 1,
        }
    }
}

impl PipelineConfig {
    /// Slower devices: fewer ROIs, looser deadline, every third frame.
    pub fn for_low_power() -> Self {
        Self {
            deadline_ms: 45,
            max_rois: 6,
            input_size: 128,
            frame_interval: 3,
            ..Default::default()
        }
    }

    pub fn for_high_accuracy() -> Self {
        Self {
            deadline_ms: 60,
            max_rois: 20,
            input_size: 224,
            temporal_window: 6,
            temporal_confirmations: 3,
            ..Default::default()
        }
    }

    pub fn from_json(text: &str) -> Result<Self, ScanError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Lenient parse for hand-edited files (comments, trailing commas).
    pub fn from_json5(text: &str) -> Result<Self, ScanError> {
        Ok(json5::from_str(text)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScanError> {
        let path = path.as_ref();
        info!("📖 Loading pipeline config: {:?}", path);
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json5") => Self::from_json5(&text),
            _ => Self::from_json(&text),
        }
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    pub fn rule_for(&self, character: &str) -> Option<&ColorRule> {
        self.color_rules.get(character)
    }

    pub fn apply(&mut self, patch: &ConfigPatch) {
        if let Some(characters) = &patch.characters {
            self.characters = characters.clone();
        }
        if let Some(rules) = &patch.color_rules {
            self.color_rules = rules.clone();
        }
        if let Some(roi) = patch.roi {
            self.roi = roi;
        }
        if let Some(v) = patch.deadline_ms {
            self.deadline_ms = v;
        }
        if let Some(v) = patch.max_rois {
            self.max_rois = v;
        }
        if let Some(v) = patch.input_size {
            self.input_size = v;
        }
        if let Some(v) = patch.score_threshold {
            self.score_threshold = v;
        }
        if let Some(v) = patch.dedup_iou {
            self.dedup_iou = v;
        }
        if let Some(v) = patch.nms_iou {
            self.nms_iou = v;
        }
        if let Some(v) = patch.temporal_window {
            self.temporal_window = v;
        }
        if let Some(v) = patch.temporal_confirmations {
            self.temporal_confirmations = v;
        }
        if let Some(v) = patch.track_grid {
            self.track_grid = v;
        }
        if let Some(v) = patch.frame_interval {
            self.frame_interval = v;
        }
    }
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigPatch {
    pub characters: Option<Vec<String>>,
    pub color_rules: Option<BTreeMap<String, ColorRule>>,
    pub roi: Option<RoiConfig>,
    pub deadline_ms: Option<u64>,
    pub max_rois: Option<usize>,
    pub input_size: Option<u32>,
    pub score_threshold: Option<f32>,
    pub dedup_iou: Option<f32>,
    pub nms_iou: Option<f32>,
    pub temporal_window: Option<u64>,
    pub temporal_confirmations: Option<usize>,
    pub track_grid: Option<f32>,
    pub frame_interval: Option<u32>,
}

impl ConfigPatch {
    pub fn from_json(text: &str) -> Result<Self, ScanError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.deadline(), Duration::from_millis(30));
        assert_eq!(config.max_rois, 12);
        assert_eq!(config.temporal_window, 4);
        assert_eq!(config.temporal_confirmations, 2);
        assert_eq!(
            config.rule_for("wally").and_then(|r| r.positive),
            Some(PositiveRule::RedWhiteStripes)
        );
        assert!(config.rule_for("nobody").is_none());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PipelineConfig::from_json(
            r#"{
                "characters": ["wally"],
                "colorRules": {"wally": {"positive": "red_white_stripes", "negative": ["orange"]}},
                "deadlineMs": 50,
                "temporalConfirmations": 3
            }"#,
        )
        .unwrap();

        assert_eq!(config.characters, vec!["wally"]);
        assert_eq!(config.color_rules.len(), 1);
        assert_eq!(config.deadline_ms, 50);
        assert_eq!(config.temporal_confirmations, 3);
        assert_eq!(config.max_rois, 12);
        assert_eq!(config.roi, RoiConfig::default());
    }

    #[test]
    fn test_json5_with_comments() {
        let config = PipelineConfig::from_json5(
            r#"{
                // phone preset
                maxRois: 4,
                frameInterval: 2,
            }"#,
        )
        .unwrap();
        assert_eq!(config.max_rois, 4);
        assert_eq!(config.frame_interval, 2);
    }

    #[test]
    fn test_unknown_predicate_is_config_error() {
        let result = PipelineConfig::from_json(r#"{"colorRules": {"x": {"positive": "tartan"}}}"#);
        assert!(matches!(result, Err(ScanError::ConfigJson(_))));
    }

    #[test]
    fn test_patch_only_touches_present_fields() {
        let mut config = PipelineConfig::default();
        let patch = ConfigPatch::from_json(r#"{"frameInterval": 5, "nmsIou": 0.3}"#).unwrap();
        config.apply(&patch);

        assert_eq!(config.frame_interval, 5);
        assert!((config.nms_iou - 0.3).abs() < 1e-6);
        assert_eq!(config.deadline_ms, 30);
        assert_eq!(config.characters.len(), 5);
    }

    #[test]
    fn test_presets() {
        let low = PipelineConfig::for_low_power();
        assert_eq!(low.frame_interval, 3);
        assert!(low.max_rois < PipelineConfig::default().max_rois);

        let accurate = PipelineConfig::for_high_accuracy();
        assert_eq!(accurate.temporal_confirmations, 3);
    }
}
