//! ROI 去重：按亮度排序，IoU 贪心保留

use super::proposer::RoiCandidate;

/// Keep the brightest candidate of each overlapping cluster.
///
/// Candidates are ordered by descending mean luma, then each one survives
/// only if its IoU against every survivor is below `iou_threshold`. IoU is
/// taken on frame-normalized boxes. Brightness is a quality proxy only; the
/// ordering key can be swapped without affecting correctness.
pub fn dedup_regions(
    mut candidates: Vec<RoiCandidate>,
    frame_w: u32,
    frame_h: u32,
    iou_threshold: f32,
) -> Vec<RoiCandidate> {
    candidates.sort_by(|a, b| b.stats.luma.total_cmp(&a.stats.luma));

    let mut kept: Vec<RoiCandidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let norm = candidate.rect.normalized(frame_w, frame_h);
        let overlaps = kept
            .iter()
            .any(|k| k.rect.normalized(frame_w, frame_h).iou(&norm) >= iou_threshold);
        if !overlaps {
            kept.push(candidate);
        }
    }
    kept
}
