use super::detector::Detection;

/// Greedy non-maximum suppression across all labels.
///
/// Highest score first; a detection survives if its IoU against every
/// survivor is below `iou_threshold`.
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for det in detections {
        if kept.iter().all(|k| k.bbox.iou(&det.bbox) < iou_threshold) {
            kept.push(det);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::NormBox;

    fn det(id: u64, label: &str, score: f32, bbox: NormBox) -> Detection {
        Detection {
            id,
            label: label.to_string(),
            score,
            bbox,
            confirmed: false,
            track_id: None,
        }
    }

    #[test]
    fn test_identical_boxes_keep_best_score() {
        let bbox = NormBox::new(0.2, 0.2, 0.3, 0.3);
        let kept = non_max_suppression(
            vec![det(1, "wally", 0.6, bbox), det(2, "wally", 0.9, bbox)],
            0.45,
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, 2);
    }

    #[test]
    fn test_suppression_ignores_labels() {
        let bbox = NormBox::new(0.2, 0.2, 0.3, 0.3);
        let kept = non_max_suppression(
            vec![det(1, "wally", 0.7, bbox), det(2, "wenda", 0.8, bbox)],
            0.45,
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].label, "wenda");
    }

    #[test]
    fn test_separate_boxes_survive() {
        let kept = non_max_suppression(
            vec![
                det(1, "wally", 0.7, NormBox::new(0.0, 0.0, 0.2, 0.2)),
                det(2, "wally", 0.8, NormBox::new(0.5, 0.5, 0.2, 0.2)),
                // IoU with #1 is 1/3
                det(3, "odlaw", 0.5, NormBox::new(0.1, 0.0, 0.2, 0.2)),
            ],
            0.45,
        );
        assert_eq!(kept.iter().map(|d| d.id).collect::<Vec<_>>(), vec![2, 1, 3]);
    }
}
