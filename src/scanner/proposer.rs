//! 滑动窗口 ROI 候选生成
//!
//! Three window sizes slide over the frame with a half-window step. Each
//! window's stats are computed once and shared by every character rule.

use log::debug;
use rayon::prelude::*;
use serde::Serialize;

use super::config::{PipelineConfig, RoiConfig};
use crate::core::color::{ColorMask, RegionStats};
use crate::core::geometry::PixelRect;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoiCandidate {
    pub rect: PixelRect,
    pub character_hint: String,
    #[serde(skip)]
    pub stats: RegionStats,
}

/// Window sides (`m`, `1.5m`, `2m`) and the shared step for a frame.
pub fn window_plan(frame_w: u32, frame_h: u32, roi: &RoiConfig) -> (Vec<u32>, u32) {
    let base = (frame_w.min(frame_h) as f32 * roi.size_scale)
        .max(roi.min_size as f32)
        .round();
    let sizes = roi
        .size_multipliers
        .iter()
        .map(|m| (base * m).round().max(1.0) as u32)
        .collect();
    let step = (base * roi.step_ratio).round().max(1.0) as u32;
    (sizes, step)
}

/// Every square window that fits entirely inside the frame.
pub fn windows(frame_w: u32, frame_h: u32, roi: &RoiConfig) -> Vec<PixelRect> {
    let (sizes, step) = window_plan(frame_w, frame_h, roi);
    let mut out = Vec::new();
    for size in sizes {
        if size > frame_w || size > frame_h {
            continue;
        }
        let mut y = 0;
        while y + size <= frame_h {
            let mut x = 0;
            while x + size <= frame_w {
                out.push(PixelRect::new(x, y, size, size));
                x += step;
            }
            y += step;
        }
    }
    out
}

/// Emit one candidate per (window, character) pair whose rule accepts the window.
///
/// Only `characters` that have a rule are scanned.
pub fn propose(
    mask: &ColorMask,
    config: &PipelineConfig,
    characters: &[String],
) -> Vec<RoiCandidate> {
    let scanned: Vec<(&String, &super::rules::ColorRule)> = characters
        .iter()
        .filter_map(|c| config.rule_for(c).map(|rule| (c, rule)))
        .collect();
    if scanned.is_empty() {
        return Vec::new();
    }

    let rects = windows(mask.width(), mask.height(), &config.roi);
    let window_stats: Vec<(PixelRect, RegionStats)> = rects
        .par_iter()
        .map(|&rect| (rect, mask.region_stats(rect)))
        .collect();

    let mut candidates = Vec::new();
    for (rect, stats) in &window_stats {
        for (character, rule) in &scanned {
            if rule.accepts(stats) {
                candidates.push(RoiCandidate {
                    rect: *rect,
                    character_hint: (*character).clone(),
                    stats: *stats,
                });
            }
        }
    }

    debug!(
        "🔲 {} windows scanned, {} candidates",
        window_stats.len(),
        candidates.len()
    );
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::video::Frame;
    use crate::scanner::rules::{ColorRule, NegativeRule, PositiveRule};

    const RED: [u8; 4] = [128, 64, 64, 255];
    const WHITE: [u8; 4] = [230, 207, 207, 255];
    const GREY: [u8; 4] = [90, 110, 100, 255];
    const ORANGE: [u8; 4] = [204, 101, 41, 255];

    /// Grey frame with a red/white banded square at (`ox`, `oy`).
    fn frame_with_stripes(w: u32, h: u32, ox: u32, oy: u32, side: u32) -> Frame {
        let mut data = Vec::with_capacity((w * h * 4) as usize);
        for y in 0..h {
            for x in 0..w {
                let inside = x >= ox && x < ox + side && y >= oy && y < oy + side;
                let px = if !inside {
                    GREY
                } else if ((y - oy) / 4) % 2 == 0 {
                    RED
                } else {
                    WHITE
                };
                data.extend_from_slice(&px);
            }
        }
        Frame::new(w, h, data, 0, 0).unwrap()
    }

    fn config_with(rule: ColorRule) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.characters = vec!["wally".to_string()];
        config.color_rules.clear();
        config.color_rules.insert("wally".to_string(), rule);
        config
    }

    #[test]
    fn test_window_plan() {
        let (sizes, step) = window_plan(640, 480, &RoiConfig::default());
        assert_eq!(sizes, vec![72, 108, 144]);
        assert_eq!(step, 36);

        // floor kicks in on small frames
        let (sizes, step) = window_plan(200, 100, &RoiConfig::default());
        assert_eq!(sizes, vec![48, 72, 96]);
        assert_eq!(step, 24);
    }

    #[test]
    fn test_windows_stay_inside_frame() {
        let rects = windows(200, 100, &RoiConfig::default());
        assert!(!rects.is_empty());
        for r in &rects {
            assert!(r.x + r.width <= 200);
            assert!(r.y + r.height <= 100);
        }
        assert!(windows(40, 40, &RoiConfig::default()).is_empty());
    }

    #[test]
    fn test_stripes_yield_candidate() {
        let frame = frame_with_stripes(192, 192, 48, 48, 96);
        let mask = ColorMask::from_frame(&frame);
        let config = config_with(ColorRule::new(
            PositiveRule::RedWhiteStripes,
            vec![NegativeRule::Orange],
        ));

        let candidates = propose(&mask, &config, &config.characters);
        assert!(!candidates.is_empty());
        assert!(candidates.iter().all(|c| c.character_hint == "wally"));
        assert!(candidates
            .iter()
            .any(|c| c.rect == PixelRect::new(48, 48, 48, 48)));
    }

    #[test]
    fn test_negative_veto_blocks_candidate() {
        // red / white / orange bands: a third of each
        let mut frame = frame_with_stripes(192, 192, 48, 48, 96);
        for y in 48..144u32 {
            if ((y - 48) / 4) % 3 != 2 {
                continue;
            }
            for x in 48..144u32 {
                let idx = ((y * 192 + x) * 4) as usize;
                frame.data[idx..idx + 4].copy_from_slice(&ORANGE);
            }
        }
        let mask = ColorMask::from_frame(&frame);
        let window = PixelRect::new(48, 48, 48, 48);

        let permissive = config_with(ColorRule::new(PositiveRule::RedWhiteSpot, vec![]));
        assert!(propose(&mask, &permissive, &permissive.characters)
            .iter()
            .any(|c| c.rect == window));

        let vetoed = config_with(ColorRule::new(
            PositiveRule::RedWhiteSpot,
            vec![NegativeRule::Orange],
        ));
        assert!(!propose(&mask, &vetoed, &vetoed.characters)
            .iter()
            .any(|c| c.rect == window));
    }

    #[test]
    fn test_wrong_palette_yields_nothing() {
        let frame = frame_with_stripes(192, 192, 48, 48, 96);
        let mask = ColorMask::from_frame(&frame);
        let config = config_with(ColorRule::new(PositiveRule::YellowBlackStripes, vec![]));
        assert!(propose(&mask, &config, &config.characters).is_empty());
    }

    #[test]
    fn test_character_without_rule_is_skipped() {
        let frame = frame_with_stripes(192, 192, 48, 48, 96);
        let mask = ColorMask::from_frame(&frame);
        let config = config_with(ColorRule::new(PositiveRule::RedWhiteStripes, vec![]));

        let characters = vec!["nobody".to_string()];
        assert!(propose(&mask, &config, &characters).is_empty());
    }
}
