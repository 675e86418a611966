//! 区域颜色统计

use serde::Serialize;

use super::hsv::{classify, rgb_to_hsv, ColorName};
use crate::core::geometry::PixelRect;
use crate::core::video::Frame;

#[inline]
fn luma(r: u8, g: u8, b: u8) -> f32 {
    0.2126 * r as f32 + 0.7152 * g as f32 + 0.0722 * b as f32
}

/// Per-color pixel counts plus mean luma over one rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RegionStats {
    pub counts: [u32; 7],
    pub pixels: u32,
    pub luma: f32,
}

impl RegionStats {
    pub fn count(&self, color: ColorName) -> u32 {
        self.counts[color.index()]
    }

    pub fn ratio(&self, color: ColorName) -> f32 {
        if self.pixels == 0 {
            return 0.0;
        }
        self.count(color) as f32 / self.pixels as f32
    }

    #[inline]
    fn accumulate(&mut self, flags: u8) {
        for color in ColorName::ALL {
            if flags & color.bit() != 0 {
                self.counts[color.index()] += 1;
            }
        }
    }
}

/// Classify every pixel of `rect` directly from the frame.
///
/// `rect` is clamped to the frame; HSV is computed once per pixel.
pub fn compute_region_stats(frame: &Frame, rect: PixelRect) -> RegionStats {
    let rect = rect.clamp_to(frame.width, frame.height);
    let mut stats = RegionStats {
        pixels: rect.width * rect.height,
        ..Default::default()
    };
    let mut luma_sum = 0.0f64;

    for row in rect.y..rect.y + rect.height {
        for col in rect.x..rect.x + rect.width {
            let (r, g, b) = frame.rgb_at(col, row);
            stats.accumulate(classify(&rgb_to_hsv(r, g, b)));
            luma_sum += luma(r, g, b) as f64;
        }
    }

    if stats.pixels > 0 {
        stats.luma = (luma_sum / stats.pixels as f64) as f32;
    }
    stats
}

/// Color flags and luma for every pixel of one frame.
///
/// Built once per frame; every window, the deduplicator and the ratio gate
/// read from it instead of re-running HSV.
pub struct ColorMask {
    width: u32,
    height: u32,
    flags: Vec<u8>,
    luma: Vec<f32>,
}

impl ColorMask {
    pub fn from_frame(frame: &Frame) -> Self {
        let mut flags = Vec::with_capacity(frame.pixel_count());
        let mut lumas = Vec::with_capacity(frame.pixel_count());

        for px in frame.data.chunks_exact(4) {
            let (r, g, b) = (px[0], px[1], px[2]);
            flags.push(classify(&rgb_to_hsv(r, g, b)));
            lumas.push(luma(r, g, b));
        }

        Self {
            width: frame.width,
            height: frame.height,
            flags,
            luma: lumas,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Same result as [`compute_region_stats`] on the source frame. `rect` is clamped.
    pub fn region_stats(&self, rect: PixelRect) -> RegionStats {
        let rect = rect.clamp_to(self.width, self.height);
        let mut stats = RegionStats {
            pixels: rect.width * rect.height,
            ..Default::default()
        };
        let mut luma_sum = 0.0f64;

        let stride = self.width as usize;
        for row in rect.y as usize..(rect.y + rect.height) as usize {
            let start = row * stride + rect.x as usize;
            let end = start + rect.width as usize;
            for &flags in &self.flags[start..end] {
                stats.accumulate(flags);
            }
            luma_sum += self.luma[start..end].iter().map(|&l| l as f64).sum::<f64>();
        }

        stats.luma = (luma_sum / stats.pixels as f64) as f32;
        stats
    }

    /// Whole-frame totals.
    pub fn totals(&self) -> RegionStats {
        self.region_stats(PixelRect::new(0, 0, self.width, self.height))
    }
}
