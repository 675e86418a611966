use serde::Serialize;
use std::time::Duration;

use crate::core::error::ScanError;
use crate::core::geometry::PixelRect;

/// 帧数据结构（RGBA，行优先，左上角为原点）
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub timestamp: Duration,
    pub frame_number: u64,
}

impl Frame {
    pub fn new(
        width: u32,
        height: u32,
        data: Vec<u8>,
        timestamp_ms: u64,
        frame_number: u64,
    ) -> Result<Self, ScanError> {
        if width == 0 || height == 0 {
            return Err(ScanError::InvalidFrame(format!(
                "zero-sized frame {}x{}",
                width, height
            )));
        }
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(ScanError::InvalidFrame(format!(
                "{}x{} RGBA needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
            timestamp: Duration::from_millis(timestamp_ms),
            frame_number,
        })
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[inline]
    pub fn rgb_at(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        (self.data[idx], self.data[idx + 1], self.data[idx + 2])
    }

    /// Crop `rect` (clamped to the frame) and scale it to `size`×`size`.
    pub fn crop_resized(&self, rect: PixelRect, size: u32) -> image::RgbaImage {
        let rect = rect.clamp_to(self.width, self.height);
        let size = size.max(1);

        let crop = image::RgbaImage::from_fn(rect.width, rect.height, |col, row| {
            let (r, g, b) = self.rgb_at(rect.x + col, rect.y + row);
            image::Rgba([r, g, b, 255])
        });

        if rect.width == size && rect.height == size {
            return crop;
        }
        image::imageops::resize(&crop, size, size, image::imageops::FilterType::Triangle)
    }
}

/// 帧元数据（轻量级，用于传递信息）
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameInfo {
    pub width: u32,
    pub height: u32,
    pub timestamp_ms: u64,
    pub frame_number: u64,
}

impl FrameInfo {
    pub fn from_frame(frame: &Frame) -> Self {
        Self {
            width: frame.width,
            height: frame.height,
            timestamp_ms: frame.timestamp.as_millis() as u64,
            frame_number: frame.frame_number,
        }
    }
}

/// Camera callback frame in planar YUV420 (I420).
#[derive(Debug)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub y_plane: Vec<u8>,
    pub u_plane: Vec<u8>,
    pub v_plane: Vec<u8>,
    pub timestamp_ms: u64,
    pub frame_number: u64,
}

impl RawFrame {
    pub fn to_rgba(&self) -> Result<Frame, ScanError> {
        let w = self.width as usize;
        let h = self.height as usize;
        let chroma_w = w.div_ceil(2);
        let chroma_len = chroma_w * h.div_ceil(2);

        if self.y_plane.len() < w * h
            || self.u_plane.len() < chroma_len
            || self.v_plane.len() < chroma_len
        {
            return Err(ScanError::InvalidFrame(format!(
                "YUV420 planes too short for {}x{}",
                self.width, self.height
            )));
        }

        let mut rgba = Vec::with_capacity(w * h * 4);
        for row in 0..h {
            let luma_row = &self.y_plane[row * w..(row + 1) * w];
            let chroma_offset = (row / 2) * chroma_w;
            for (col, &luma) in luma_row.iter().enumerate() {
                let c = chroma_offset + col / 2;
                let y = luma as f32;
                let u = self.u_plane[c] as f32 - 128.0;
                let v = self.v_plane[c] as f32 - 128.0;

                rgba.push((y + 1.402 * v).clamp(0.0, 255.0) as u8);
                rgba.push((y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8);
                rgba.push((y + 1.772 * u).clamp(0.0, 255.0) as u8);
                rgba.push(255);
            }
        }

        Frame::new(
            self.width,
            self.height,
            rgba,
            self.timestamp_ms,
            self.frame_number,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let data = vec![255u8; 100 * 100 * 4];
        let frame = Frame::new(100, 100, data, 1000, 30).unwrap();

        assert_eq!(frame.pixel_count(), 10000);
        assert_eq!(frame.timestamp.as_millis(), 1000);
        assert_eq!(frame.frame_number, 30);
        assert_eq!(frame.rgb_at(99, 99), (255, 255, 255));
    }

    #[test]
    fn test_frame_rejects_bad_buffer() {
        assert!(matches!(
            Frame::new(10, 10, vec![0u8; 399], 0, 0),
            Err(ScanError::InvalidFrame(_))
        ));
        assert!(Frame::new(0, 10, Vec::new(), 0, 0).is_err());
    }

    #[test]
    fn test_crop_resized() {
        let mut data = vec![0u8; 64 * 64 * 4];
        for px in data.chunks_exact_mut(4) {
            px.copy_from_slice(&[200, 10, 10, 255]);
        }
        let frame = Frame::new(64, 64, data, 0, 0).unwrap();

        let crop = frame.crop_resized(PixelRect::new(16, 16, 32, 32), 20);
        assert_eq!(crop.dimensions(), (20, 20));
        let px = crop.get_pixel(10, 10).0;
        for (got, want) in px.iter().zip([200u8, 10, 10, 255]) {
            assert!((*got as i16 - want as i16).abs() <= 1);
        }
    }

    #[test]
    fn test_crop_clamps_to_frame() {
        let frame = Frame::new(32, 32, vec![50u8; 32 * 32 * 4], 0, 0).unwrap();
        let crop = frame.crop_resized(PixelRect::new(30, 30, 10, 10), 8);
        assert_eq!(crop.dimensions(), (8, 8));
    }

    #[test]
    fn test_yuv_to_rgba() {
        let raw = RawFrame {
            width: 64,
            height: 64,
            y_plane: vec![128u8; 64 * 64],
            u_plane: vec![128u8; 32 * 32],
            v_plane: vec![128u8; 32 * 32],
            timestamp_ms: 0,
            frame_number: 7,
        };

        let frame = raw.to_rgba().unwrap();
        assert_eq!(frame.data.len(), 64 * 64 * 4);
        assert_eq!(frame.rgb_at(5, 5), (128, 128, 128));
        assert_eq!(frame.frame_number, 7);
    }

    #[test]
    fn test_yuv_short_planes_rejected() {
        let raw = RawFrame {
            width: 64,
            height: 64,
            y_plane: vec![128u8; 10],
            u_plane: vec![],
            v_plane: vec![],
            timestamp_ms: 0,
            frame_number: 0,
        };
        assert!(raw.to_rgba().is_err());
    }
}
