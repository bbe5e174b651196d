use std::cmp::Ordering;

use crate::{config::InferenceConfig, types::Pose};

/// Confidence filter, greedy NMS and the per-frame cap, in that order.
pub fn suppress(candidates: Vec<Pose>, config: &InferenceConfig) -> Vec<Pose> {
    let limit = config.max_detections();
    if limit == 0 {
        return Vec::new();
    }

    let mut order: Vec<Pose> = candidates
        .into_iter()
        .filter(|pose| pose.score >= config.confidence_threshold())
        .collect();
    order.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let mut keep: Vec<Pose> = Vec::with_capacity(limit.min(order.len()));
    'outer: for pose in order {
        for kept in &keep {
            if pose.bbox.iou(&kept.bbox) > config.iou_threshold() {
                continue 'outer;
            }
        }
        keep.push(pose);
        if keep.len() >= limit {
            break;
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BBox;

    fn pose(x: f32, y: f32, size: f32, score: f32) -> Pose {
        Pose {
            bbox: BBox {
                x1: x,
                y1: y,
                x2: x + size,
                y2: y + size,
            },
            score,
            keypoints: Vec::new(),
        }
    }

    fn cfg(conf: f32, iou: f32, max_det: usize) -> InferenceConfig {
        InferenceConfig::new(conf, iou, max_det, false, false).unwrap()
    }

    #[test]
    fn drops_overlapping_duplicates_and_keeps_disjoint_boxes() {
        let candidates = vec![
            pose(0.0, 0.0, 100.0, 0.80),
            pose(5.0, 5.0, 100.0, 0.95),
            pose(300.0, 300.0, 50.0, 0.75),
        ];
        let kept = suppress(candidates, &cfg(0.5, 0.5, 10));
        assert_eq!(kept.len(), 2);
        assert!((kept[0].score - 0.95).abs() < 1e-6);
        assert!((kept[1].score - 0.75).abs() < 1e-6);
    }

    #[test]
    fn confidence_threshold_is_inclusive() {
        let kept = suppress(
            vec![pose(0.0, 0.0, 10.0, 0.7), pose(50.0, 0.0, 10.0, 0.69)],
            &cfg(0.7, 0.5, 10),
        );
        assert_eq!(kept.len(), 1);
        assert!((kept[0].score - 0.7).abs() < 1e-6);
    }

    #[test]
    fn iou_threshold_of_one_disables_suppression() {
        let kept = suppress(
            vec![
                pose(0.0, 0.0, 10.0, 0.9),
                pose(1.0, 0.0, 10.0, 0.8),
                pose(0.0, 0.0, 10.0, 0.7),
            ],
            &cfg(0.0, 1.0, 10),
        );
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn never_exceeds_max_detections() {
        // 40 scattered, partially overlapping candidates.
        let candidates: Vec<Pose> = (0..40)
            .map(|i| {
                let i = i as f32;
                pose((i * 37.0) % 400.0, (i * 53.0) % 300.0, 60.0, (i * 0.023) % 1.0)
            })
            .collect();

        for max_det in [0usize, 1, 2, 5, 17, 100] {
            for conf in [0.0f32, 0.3, 0.7, 1.0] {
                for iou in [0.0f32, 0.45, 1.0] {
                    let kept = suppress(candidates.clone(), &cfg(conf, iou, max_det));
                    assert!(
                        kept.len() <= max_det,
                        "max_det={max_det} conf={conf} iou={iou} kept {}",
                        kept.len()
                    );
                    assert!(kept.iter().all(|p| p.score >= conf));
                }
            }
        }
    }

    #[test]
    fn zero_cap_yields_nothing() {
        let kept = suppress(vec![pose(0.0, 0.0, 10.0, 0.99)], &cfg(0.1, 0.5, 0));
        assert!(kept.is_empty());
    }
}
