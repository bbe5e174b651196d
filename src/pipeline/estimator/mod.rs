mod common;
mod nms;
mod ort;

use anyhow::Result;

use crate::{
    config::InferenceConfig,
    pipeline::skeleton,
    types::{DetectionResult, Frame, Pose},
};

pub use self::ort::{OrtEngine, OrtEngineConfig};

/// Model backend. Produces raw pose candidates for one frame; thresholds are
/// a hint for early filtering, the runner enforces them regardless.
pub trait PoseEngine {
    fn candidates(&mut self, frame: &Frame, config: &InferenceConfig) -> Result<Vec<Pose>>;

    fn label(&self) -> &'static str;
}

/// Owns a loaded model and turns frames into detection results.
pub struct InferenceRunner<E> {
    engine: E,
    frames_processed: u64,
}

impl<E: PoseEngine> InferenceRunner<E> {
    pub fn new(engine: E) -> Self {
        log::info!("pose backend ready: {}", engine.label());
        Self {
            engine,
            frames_processed: 0,
        }
    }

    pub fn infer(&mut self, frame: &Frame, config: &InferenceConfig) -> Result<DetectionResult> {
        let candidates = self.engine.candidates(frame, config)?;
        let raw = candidates.len();
        let poses = nms::suppress(candidates, config);
        self.frames_processed += 1;

        let overlay = config
            .wants_overlay()
            .then(|| skeleton::annotate(frame, &poses));
        let result = DetectionResult {
            poses,
            overlay,
            timestamp: frame.timestamp,
        };

        log::debug!(
            "frame {}: {raw} candidate(s), {}",
            self.frames_processed,
            result.summary()
        );
        if log::log_enabled!(log::Level::Trace) {
            for pose in &result.poses {
                for line in describe_keypoints(pose) {
                    log::trace!("  {line}");
                }
            }
        }

        Ok(result)
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }
}

/// One line per visible keypoint, e.g. `left_wrist: (312, 240) 0.87`.
fn describe_keypoints(pose: &Pose) -> Vec<String> {
    pose.visible_keypoints(skeleton::KEYPOINT_VISIBILITY_THRESHOLD)
        .map(|(name, kp)| {
            format!(
                "{}: ({:.0}, {:.0}) {:.2}",
                name.label(),
                kp.x,
                kp.y,
                kp.confidence
            )
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::testing::{ScriptedEngine, candidate, empty_frame, subject_frame};
    use super::*;

    #[test]
    fn subject_frame_yields_single_pose_after_suppression() {
        let mut runner = InferenceRunner::new(ScriptedEngine::default());
        let cfg = InferenceConfig::new(0.7, 0.5, 10, false, false).unwrap();

        let result = runner.infer(&subject_frame(100, 100), &cfg).unwrap();
        assert_eq!(result.len(), 1);
        assert!((result.poses[0].score - 0.92).abs() < 1e-6);
        assert!(result.overlay.is_none());
    }

    #[test]
    fn frame_without_subject_is_empty_not_an_error() {
        let mut runner = InferenceRunner::new(ScriptedEngine::default());
        let result = runner
            .infer(&empty_frame(100, 100), &InferenceConfig::default())
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(runner.frames_processed(), 1);
    }

    #[test]
    fn overlay_is_a_fresh_copy_when_display_is_on() {
        let mut runner = InferenceRunner::new(ScriptedEngine::default());
        let frame = subject_frame(100, 100);
        let before = frame.rgba.clone();

        let result = runner.infer(&frame, &InferenceConfig::default()).unwrap();
        let overlay = result.overlay.expect("display_output requests an overlay");
        assert_eq!(frame.rgba, before);
        assert_ne!(overlay.rgba, before);
        assert_eq!(result.timestamp, frame.timestamp);
    }

    #[test]
    fn cap_holds_for_any_engine_output() {
        struct Flood;
        impl PoseEngine for Flood {
            fn candidates(&mut self, _: &Frame, _: &InferenceConfig) -> Result<Vec<Pose>> {
                Ok((0..50).map(|i| candidate(i as f32 * 40.0, 0.99)).collect())
            }
            fn label(&self) -> &'static str {
                "flood"
            }
        }

        let mut runner = InferenceRunner::new(Flood);
        for max_det in [0, 1, 3, 49, 50, 80] {
            let cfg = InferenceConfig::new(0.5, 0.45, max_det, false, false).unwrap();
            let result = runner.infer(&empty_frame(64, 64), &cfg).unwrap();
            assert!(result.len() <= max_det);
        }
    }

    #[test]
    fn keypoint_lines_name_only_visible_points() {
        let mut pose = candidate(20.0, 0.9);
        for kp in pose.keypoints.iter_mut().skip(1) {
            kp.confidence = 0.2;
        }

        let lines = describe_keypoints(&pose);
        assert_eq!(lines, vec!["nose: (35, 12) 0.90".to_string()]);
    }

    #[test]
    fn engine_failure_propagates() {
        let engine = ScriptedEngine {
            fail_on_call: Some(1),
            ..Default::default()
        };
        let mut runner = InferenceRunner::new(engine);
        let err = runner
            .infer(&empty_frame(10, 10), &InferenceConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("rejected"));
        assert_eq!(runner.frames_processed(), 0);
    }
}
