//! Pixel rectangles and frame-normalized boxes.

use serde::{Serialize, Serializer};

/// Rectangle in pixel coordinates, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Pull the rect inside a `frame_w`×`frame_h` buffer, never smaller than 1×1.
    pub fn clamp_to(&self, frame_w: u32, frame_h: u32) -> PixelRect {
        let frame_w = frame_w.max(1);
        let frame_h = frame_h.max(1);
        let x = self.x.min(frame_w - 1);
        let y = self.y.min(frame_h - 1);
        let width = self.width.min(frame_w - x).max(1);
        let height = self.height.min(frame_h - y).max(1);
        PixelRect::new(x, y, width, height)
    }

    pub fn normalized(&self, frame_w: u32, frame_h: u32) -> NormBox {
        let fw = frame_w.max(1) as f32;
        let fh = frame_h.max(1) as f32;
        NormBox::new(
            self.x as f32 / fw,
            self.y as f32 / fh,
            self.width as f32 / fw,
            self.height as f32 / fh,
        )
    }
}

/// `[x, y, w, h]` relative to frame size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl NormBox {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self::new(cx - w / 2.0, cy - h / 2.0, w, h)
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Intersection over union, always in `[0, 1]`.
    pub fn iou(&self, other: &NormBox) -> f32 {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return 0.0;
        }

        let inter = (right - left) * (bottom - top);
        let union = self.w * self.h + other.w * other.h - inter;
        if union <= 0.0 {
            return 0.0;
        }
        (inter / union).clamp(0.0, 1.0)
    }

    /// Clip to the unit square. NaN edges collapse onto the lower bound.
    pub fn clamped(&self) -> NormBox {
        let x = self.x.max(0.0).min(1.0);
        let y = self.y.max(0.0).min(1.0);
        let right = self.right().max(x).min(1.0);
        let bottom = self.bottom().max(y).min(1.0);
        NormBox::new(x, y, right - x, bottom - y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.w.is_finite() && self.h.is_finite()
    }

    /// Back to pixels, rounded, clamped to the frame and at least 1×1.
    pub fn to_pixel_rect(&self, frame_w: u32, frame_h: u32) -> PixelRect {
        let x = (self.x * frame_w as f32).round().max(0.0) as u32;
        let y = (self.y * frame_h as f32).round().max(0.0) as u32;
        let width = (self.w * frame_w as f32).round().max(1.0) as u32;
        let height = (self.h * frame_h as f32).round().max(1.0) as u32;
        PixelRect::new(x, y, width, height).clamp_to(frame_w, frame_h)
    }
}

impl Serialize for NormBox {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.x, self.y, self.w, self.h].serialize(serializer)
    }
}
