use thiserror::Error;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.7;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.5;
pub const DEFAULT_MAX_DETECTIONS: usize = 1;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be within [0, 1], got {value}")]
    OutOfRange { name: &'static str, value: f32 },
}

/// Inference settings. Validated once on construction and read-only after.
#[derive(Clone, Debug, PartialEq)]
pub struct InferenceConfig {
    confidence_threshold: f32,
    iou_threshold: f32,
    max_detections: usize,
    persist_output: bool,
    display_output: bool,
}

impl InferenceConfig {
    pub fn new(
        confidence_threshold: f32,
        iou_threshold: f32,
        max_detections: usize,
        persist_output: bool,
        display_output: bool,
    ) -> Result<Self, ConfigError> {
        check_unit("confidence_threshold", confidence_threshold)?;
        check_unit("iou_threshold", iou_threshold)?;

        Ok(Self {
            confidence_threshold,
            iou_threshold,
            max_detections,
            persist_output,
            display_output,
        })
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn iou_threshold(&self) -> f32 {
        self.iou_threshold
    }

    pub fn max_detections(&self) -> usize {
        self.max_detections
    }

    pub fn persist_output(&self) -> bool {
        self.persist_output
    }

    pub fn display_output(&self) -> bool {
        self.display_output
    }

    /// Whether the runner has to produce an annotated copy of the frame.
    pub fn wants_overlay(&self) -> bool {
        self.display_output || self.persist_output
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            max_detections: DEFAULT_MAX_DETECTIONS,
            persist_output: false,
            display_output: true,
        }
    }
}

fn check_unit(name: &'static str, value: f32) -> Result<(), ConfigError> {
    // NaN fails the range check too.
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_live_preview_settings() {
        let cfg = InferenceConfig::default();
        assert_eq!(cfg.confidence_threshold(), 0.7);
        assert_eq!(cfg.iou_threshold(), 0.5);
        assert_eq!(cfg.max_detections(), 1);
        assert!(!cfg.persist_output());
        assert!(cfg.display_output());
    }

    #[test]
    fn accepts_threshold_bounds() {
        assert!(InferenceConfig::new(0.0, 1.0, 0, false, false).is_ok());
        assert!(InferenceConfig::new(1.0, 0.0, 300, true, true).is_ok());
    }

    #[test]
    fn rejects_out_of_range_thresholds() {
        assert_eq!(
            InferenceConfig::new(1.5, 0.5, 1, false, false),
            Err(ConfigError::OutOfRange {
                name: "confidence_threshold",
                value: 1.5
            })
        );
        assert!(matches!(
            InferenceConfig::new(0.5, -0.1, 1, false, false),
            Err(ConfigError::OutOfRange {
                name: "iou_threshold",
                ..
            })
        ));
        assert!(InferenceConfig::new(f32::NAN, 0.5, 1, false, false).is_err());
    }

    #[test]
    fn overlay_needed_for_display_or_persist() {
        let none = InferenceConfig::new(0.5, 0.5, 1, false, false).unwrap();
        let save = InferenceConfig::new(0.5, 0.5, 1, true, false).unwrap();
        assert!(!none.wants_overlay());
        assert!(save.wants_overlay());
        assert!(InferenceConfig::default().wants_overlay());
    }
}
