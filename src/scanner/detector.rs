//! 检测后端适配：裁剪 ROI，调用外部检测器，解码为帧归一化坐标

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;

use crate::core::error::ScanError;
use crate::core::geometry::{NormBox, PixelRect};
use crate::core::video::Frame;

/// Floats per raw record: `[cx, cy, w, h, score, label]`.
pub const RECORD_STRIDE: usize = 6;

/// Label for an index outside the enabled set. Never enabled, so always filtered.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Fixed-size crop handed to a backend.
pub struct DetectorInput {
    pub size: u32,
    pub image: image::RgbaImage,
}

impl DetectorInput {
    pub fn from_roi(frame: &Frame, rect: PixelRect, size: u32) -> Self {
        let image = frame.crop_resized(rect, size);
        Self {
            size: image.width(),
            image,
        }
    }

    /// Planar RGB in `[0, 1]`, laid out as `[1, 3, size, size]`.
    pub fn to_chw_tensor(&self) -> Vec<f32> {
        let plane = (self.image.width() * self.image.height()) as usize;
        let mut tensor = vec![0.0f32; plane * 3];
        for (i, px) in self.image.pixels().enumerate() {
            tensor[i] = px[0] as f32 / 255.0;
            tensor[plane + i] = px[1] as f32 / 255.0;
            tensor[2 * plane + i] = px[2] as f32 / 255.0;
        }
        tensor
    }
}

/// External detector. Returns flat `[cx, cy, w, h, score, label]` records in
/// ROI-local normalized space.
pub trait DetectorBackend: Send {
    fn name(&self) -> &str;

    fn infer(&mut self, input: &DetectorInput) -> Result<Vec<f32>, ScanError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    pub cx: f32,
    pub cy: f32,
    pub w: f32,
    pub h: f32,
    pub score: f32,
    pub label: f32,
}

impl RawDetection {
    /// Split a flat output buffer; a trailing partial record is ignored.
    pub fn parse_all(output: &[f32]) -> Vec<RawDetection> {
        output
            .chunks_exact(RECORD_STRIDE)
            .map(|r| RawDetection {
                cx: r[0],
                cy: r[1],
                w: r[2],
                h: r[3],
                score: r[4],
                label: r[5],
            })
            .collect()
    }

    /// A NaN or infinite field anywhere makes the record unusable.
    pub fn is_finite(&self) -> bool {
        [self.cx, self.cy, self.w, self.h, self.score, self.label]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Truncated label index, `None` if negative or not a number.
    pub fn label_index(&self) -> Option<usize> {
        let idx = self.label.trunc();
        if idx.is_finite() && idx >= 0.0 {
            Some(idx as usize)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub id: u64,
    pub label: String,
    pub score: f32,
    pub bbox: NormBox,
    pub confirmed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_id: Option<u64>,
}

/// Runs the optional backend over one ROI at a time.
pub struct RoiDetector {
    backend: Option<Box<dyn DetectorBackend>>,
    next_id: u64,
}

impl RoiDetector {
    pub fn new(backend: Option<Box<dyn DetectorBackend>>) -> Self {
        match &backend {
            Some(b) => info!("🧠 Detector backend: {}", b.name()),
            None => info!("🎨 No detector backend, running color-only"),
        }
        Self { backend, next_id: 0 }
    }

    pub fn color_only() -> Self {
        Self::new(None)
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    pub fn set_backend(&mut self, backend: Option<Box<dyn DetectorBackend>>) {
        if let Some(b) = &backend {
            info!("🧠 Detector backend swapped: {}", b.name());
        }
        self.backend = backend;
    }

    /// Detect inside `rect`. Backend failures degrade to no detections.
    pub fn detect(
        &mut self,
        frame: &Frame,
        rect: PixelRect,
        input_size: u32,
        enabled: &[String],
        score_threshold: f32,
    ) -> Vec<Detection> {
        let Some(backend) = self.backend.as_mut() else {
            return Vec::new();
        };

        let input = DetectorInput::from_roi(frame, rect, input_size);
        let output = match backend.infer(&input) {
            Ok(output) => output,
            Err(e) => {
                warn!("⚠️ {} failed on ROI {:?}: {}", backend.name(), rect, e);
                return Vec::new();
            }
        };

        let detections = self.decode(
            &output,
            rect,
            frame.width,
            frame.height,
            enabled,
            score_threshold,
        );
        debug!("🔍 ROI {:?}: {} detections", rect, detections.len());
        detections
    }

    /// Map raw records into frame space: `local × roiSize + roiOffset, ÷ frameSize`.
    pub fn decode(
        &mut self,
        output: &[f32],
        rect: PixelRect,
        frame_w: u32,
        frame_h: u32,
        enabled: &[String],
        score_threshold: f32,
    ) -> Vec<Detection> {
        let fw = frame_w.max(1) as f32;
        let fh = frame_h.max(1) as f32;
        let rw = rect.width as f32;
        let rh = rect.height as f32;

        RawDetection::parse_all(output)
            .into_iter()
            .filter(|raw| raw.is_finite() && raw.score >= score_threshold)
            .map(|raw| {
                let label = raw
                    .label_index()
                    .and_then(|i| enabled.get(i))
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_LABEL.to_string());
                let cx = (raw.cx * rw + rect.x as f32) / fw;
                let cy = (raw.cy * rh + rect.y as f32) / fh;
                let bbox = NormBox::from_center(cx, cy, raw.w * rw / fw, raw.h * rh / fh).clamped();

                self.next_id += 1;
                Detection {
                    id: self.next_id,
                    label,
                    score: raw.score,
                    bbox,
                    confirmed: false,
                    track_id: None,
                }
            })
            .collect()
    }
}

type Script = Box<dyn Fn(&DetectorInput, usize) -> Result<Vec<f32>, ScanError> + Send + Sync>;

/// Scripted backend for tests and color-only demos.
pub struct MockDetector {
    script: Script,
    calls: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl MockDetector {
    /// Finds nothing.
    pub fn new() -> Self {
        Self::with_script(|_, _| Ok(Vec::new()))
    }

    /// Same records on every call.
    pub fn with_output(records: Vec<f32>) -> Self {
        Self::with_script(move |_, _| Ok(records.clone()))
    }

    /// `script(input, call_index)` decides each call's output.
    pub fn with_script<F>(script: F) -> Self
    where
        F: Fn(&DetectorInput, usize) -> Result<Vec<f32>, ScanError> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            calls: Arc::new(AtomicUsize::new(0)),
            delay: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        let message = message.to_string();
        Self::with_script(move |_, _| Err(ScanError::backend(&message)))
    }

    /// Sleep before answering, to exercise the frame deadline.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl Default for MockDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for MockDetector {
    fn name(&self) -> &str {
        "mock"
    }

    fn infer(&mut self, input: &DetectorInput) -> Result<Vec<f32>, ScanError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        (self.script)(input, call)
    }
}
