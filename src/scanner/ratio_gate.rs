//! 检测框颜色复核

use super::config::PipelineConfig;
use super::detector::Detection;
use crate::core::color::ColorMask;

/// Re-run the label's color rule over the detection's own box.
///
/// A label without a rule passes.
pub fn passes_ratio_gate(detection: &Detection, mask: &ColorMask, config: &PipelineConfig) -> bool {
    let Some(rule) = config.rule_for(&detection.label) else {
        return true;
    };
    let rect = detection.bbox.to_pixel_rect(mask.width(), mask.height());
    rule.accepts(&mask.region_stats(rect))
}

pub fn ratio_gate(
    detections: Vec<Detection>,
    mask: &ColorMask,
    config: &PipelineConfig,
) -> Vec<Detection> {
    detections
        .into_iter()
        .filter(|d| passes_ratio_gate(d, mask, config))
        .collect()
}
