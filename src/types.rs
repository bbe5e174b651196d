use std::time::Instant;

pub const NUM_KEYPOINTS: usize = 17;

#[derive(Clone, Debug)]
pub struct Frame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Instant,
}

impl Frame {
    pub fn new(rgba: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            rgba,
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    pub fn expected_len(&self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(4)
    }
}

#[cfg(test)]
impl Frame {
    /// Solid-colour frame for synthetic streams.
    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        Self::new(color.repeat(pixels), width, height)
    }
}

/// COCO body landmarks, in the order the pose head emits them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeypointName {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl KeypointName {
    pub const ALL: [KeypointName; NUM_KEYPOINTS] = [
        KeypointName::Nose,
        KeypointName::LeftEye,
        KeypointName::RightEye,
        KeypointName::LeftEar,
        KeypointName::RightEar,
        KeypointName::LeftShoulder,
        KeypointName::RightShoulder,
        KeypointName::LeftElbow,
        KeypointName::RightElbow,
        KeypointName::LeftWrist,
        KeypointName::RightWrist,
        KeypointName::LeftHip,
        KeypointName::RightHip,
        KeypointName::LeftKnee,
        KeypointName::RightKnee,
        KeypointName::LeftAnkle,
        KeypointName::RightAnkle,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            KeypointName::Nose => "nose",
            KeypointName::LeftEye => "left_eye",
            KeypointName::RightEye => "right_eye",
            KeypointName::LeftEar => "left_ear",
            KeypointName::RightEar => "right_ear",
            KeypointName::LeftShoulder => "left_shoulder",
            KeypointName::RightShoulder => "right_shoulder",
            KeypointName::LeftElbow => "left_elbow",
            KeypointName::RightElbow => "right_elbow",
            KeypointName::LeftWrist => "left_wrist",
            KeypointName::RightWrist => "right_wrist",
            KeypointName::LeftHip => "left_hip",
            KeypointName::RightHip => "right_hip",
            KeypointName::LeftKnee => "left_knee",
            KeypointName::RightKnee => "right_knee",
            KeypointName::LeftAnkle => "left_ankle",
            KeypointName::RightAnkle => "right_ankle",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

/// Axis-aligned box in frame pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn iou(&self, other: &BBox) -> f32 {
        let inter_w = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let inter_h = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let inter = inter_w * inter_h;
        if inter <= 0.0 {
            return 0.0;
        }
        let union = self.area() + other.area() - inter;
        if union <= 0.0 { 0.0 } else { inter / union }
    }
}

#[derive(Clone, Debug)]
pub struct Pose {
    pub bbox: BBox,
    pub score: f32,
    pub keypoints: Vec<Keypoint>,
}

impl Pose {
    pub fn keypoint(&self, name: KeypointName) -> Option<&Keypoint> {
        self.keypoints.get(name as usize)
    }

    /// Keypoints at or above `min_confidence`, paired with their COCO name.
    pub fn visible_keypoints(
        &self,
        min_confidence: f32,
    ) -> impl Iterator<Item = (KeypointName, &Keypoint)> + '_ {
        KeypointName::ALL.into_iter().filter_map(move |name| {
            self.keypoint(name)
                .filter(|kp| kp.confidence >= min_confidence)
                .map(|kp| (name, kp))
        })
    }
}

#[derive(Clone, Debug)]
pub struct DetectionResult {
    pub poses: Vec<Pose>,
    pub overlay: Option<Frame>,
    pub timestamp: Instant,
}

impl DetectionResult {
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn summary(&self) -> String {
        match self.poses.iter().map(|p| p.score).reduce(f32::max) {
            Some(best) => format!("{} pose(s), best {:.0}%", self.len(), best * 100.0),
            None => "no pose".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypoint_names_follow_coco_order() {
        assert_eq!(KeypointName::ALL[0], KeypointName::Nose);
        assert_eq!(KeypointName::ALL[9], KeypointName::LeftWrist);
        assert_eq!(KeypointName::ALL[16], KeypointName::RightAnkle);
        assert_eq!(KeypointName::RightKnee.label(), "right_knee");
    }

    fn pose_with_confidences(confidences: &[f32]) -> Pose {
        Pose {
            bbox: BBox { x1: 0.0, y1: 0.0, x2: 10.0, y2: 10.0 },
            score: 0.9,
            keypoints: confidences
                .iter()
                .enumerate()
                .map(|(i, &confidence)| Keypoint { x: i as f32, y: 1.0, confidence })
                .collect(),
        }
    }

    #[test]
    fn visible_keypoints_are_named_and_filtered() {
        let mut confidences = [0.1; NUM_KEYPOINTS];
        confidences[0] = 0.9;
        confidences[10] = 0.5;
        let pose = pose_with_confidences(&confidences);

        let visible: Vec<_> = pose
            .visible_keypoints(0.5)
            .map(|(name, kp)| (name.label(), kp.x))
            .collect();
        assert_eq!(visible, vec![("nose", 0.0), ("right_wrist", 10.0)]);
        assert_eq!(pose.keypoint(KeypointName::RightWrist).map(|kp| kp.x), Some(10.0));
    }

    #[test]
    fn truncated_pose_yields_only_present_keypoints() {
        let pose = pose_with_confidences(&[0.8, 0.8]);
        assert_eq!(pose.visible_keypoints(0.0).count(), 2);
        assert!(pose.keypoint(KeypointName::LeftAnkle).is_none());
    }

    #[test]
    fn summary_reports_best_score() {
        let result = DetectionResult {
            poses: vec![pose_with_confidences(&[]), {
                let mut p = pose_with_confidences(&[]);
                p.score = 0.42;
                p
            }],
            overlay: None,
            timestamp: Instant::now(),
        };
        assert_eq!(result.summary(), "2 pose(s), best 90%");

        let empty = DetectionResult {
            poses: Vec::new(),
            overlay: None,
            timestamp: Instant::now(),
        };
        assert_eq!(empty.summary(), "no pose");
    }

    #[test]
    fn iou_of_identical_and_disjoint_boxes() {
        let a = BBox { x1: 0.0, y1: 0.0, x2: 10.0, y2: 10.0 };
        let b = BBox { x1: 20.0, y1: 20.0, x2: 30.0, y2: 30.0 };
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
        assert_eq!(a.iou(&b), 0.0);

        let half = BBox { x1: 5.0, y1: 0.0, x2: 15.0, y2: 10.0 };
        // 50 overlap / 150 union
        assert!((a.iou(&half) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn filled_frame_has_expected_len() {
        let frame = Frame::filled(4, 3, [1, 2, 3, 255]);
        assert_eq!(frame.rgba.len(), frame.expected_len());
        assert_eq!(&frame.rgba[..4], &[1, 2, 3, 255]);
    }
}
