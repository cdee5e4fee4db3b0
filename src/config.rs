// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Configuration for model inference and the gaze heuristic.

use crate::device::Device;

/// Configuration for a model session and its decode thresholds.
///
/// # Examples
///
/// ```
/// use gazecheck::{Device, InferenceConfig};
///
/// let config = InferenceConfig::new()
///     .with_confidence(0.5)
///     .with_iou(0.5)
///     .with_device(Device::Cpu);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceConfig {
    /// Minimum detection confidence (0.0 to 1.0).
    pub confidence_threshold: f32,
    /// IoU threshold for non-maximum suppression (0.0 to 1.0).
    pub iou_threshold: f32,
    /// Maximum number of detections kept per image.
    pub max_detections: usize,
    /// Inference image size as (height, width). `None` uses the model default.
    pub imgsz: Option<(usize, usize)>,
    /// Intra-op thread count. 0 lets the runtime decide.
    pub num_threads: usize,
    /// Run the model in FP16 precision.
    pub half: bool,
    /// Compute device hint for the session.
    pub device: Device,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 300,
            imgsz: None,
            num_threads: 0,
            half: false,
            device: Device::Auto,
        }
    }

    /// Set the confidence threshold.
    ///
    /// # Arguments
    ///
    /// * `confidence` - Minimum confidence for detections (0.0 to 1.0).
    #[must_use]
    pub const fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence_threshold = confidence;
        self
    }

    /// Set the IoU threshold used by non-maximum suppression.
    ///
    /// # Arguments
    ///
    /// * `iou` - IoU above which overlapping boxes are suppressed (0.0 to 1.0).
    #[must_use]
    pub const fn with_iou(mut self, iou: f32) -> Self {
        self.iou_threshold = iou;
        self
    }

    /// Set the maximum number of detections kept per image.
    #[must_use]
    pub const fn with_max_detections(mut self, max_detections: usize) -> Self {
        self.max_detections = max_detections;
        self
    }

    /// Set an explicit inference image size.
    ///
    /// # Arguments
    ///
    /// * `height` - Input tensor height in pixels.
    /// * `width` - Input tensor width in pixels.
    #[must_use]
    pub const fn with_imgsz(mut self, height: usize, width: usize) -> Self {
        self.imgsz = Some((height, width));
        self
    }

    /// Set the intra-op thread count. 0 lets the runtime decide.
    #[must_use]
    pub const fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Enable or disable FP16 inference.
    #[must_use]
    pub const fn with_half(mut self, half: bool) -> Self {
        self.half = half;
        self
    }

    /// Set the compute device hint.
    #[must_use]
    pub const fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }
}

/// Thresholds for the looking-at-screen heuristic.
///
/// The defaults are calibrated for a subject whose head and shoulders fill
/// most of the frame; scale the pixel thresholds for other framings. The
/// classifier and the overlay renderer share `keypoint_confidence`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeThresholds {
    /// Confidence a keypoint must strictly exceed to be trusted.
    pub keypoint_confidence: f32,
    /// Eye level difference in pixels below which the head counts as level.
    pub max_eye_level_diff: f32,
    /// Nose offset from the shoulder center in pixels below which the head
    /// counts as facing forward.
    pub max_nose_offset: f32,
}

impl Default for GazeThresholds {
    fn default() -> Self {
        Self::new()
    }
}

impl GazeThresholds {
    /// Default minimum keypoint confidence.
    pub const DEFAULT_KEYPOINT_CONFIDENCE: f32 = 0.3;
    /// Default maximum eye level difference in pixels.
    pub const DEFAULT_MAX_EYE_LEVEL_DIFF: f32 = 20.0;
    /// Default maximum nose offset from the shoulder center in pixels.
    pub const DEFAULT_MAX_NOSE_OFFSET: f32 = 50.0;

    /// Create thresholds with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            keypoint_confidence: Self::DEFAULT_KEYPOINT_CONFIDENCE,
            max_eye_level_diff: Self::DEFAULT_MAX_EYE_LEVEL_DIFF,
            max_nose_offset: Self::DEFAULT_MAX_NOSE_OFFSET,
        }
    }

    /// Set the minimum keypoint confidence.
    #[must_use]
    pub const fn with_keypoint_confidence(mut self, confidence: f32) -> Self {
        self.keypoint_confidence = confidence;
        self
    }

    /// Set the maximum eye level difference in pixels.
    #[must_use]
    pub const fn with_max_eye_level_diff(mut self, pixels: f32) -> Self {
        self.max_eye_level_diff = pixels;
        self
    }

    /// Set the maximum nose offset in pixels.
    #[must_use]
    pub const fn with_max_nose_offset(mut self, pixels: f32) -> Self {
        self.max_nose_offset = pixels;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = InferenceConfig::new();
        assert!((config.confidence_threshold - 0.25).abs() < f32::EPSILON);
        assert!((config.iou_threshold - 0.45).abs() < f32::EPSILON);
        assert_eq!(config.max_detections, 300);
        assert_eq!(config.imgsz, None);
        assert_eq!(config.num_threads, 0);
        assert!(!config.half);
        assert_eq!(config.device, Device::Auto);
    }

    #[test]
    fn test_config_builder() {
        let config = InferenceConfig::new()
            .with_confidence(0.5)
            .with_iou(0.6)
            .with_max_detections(50)
            .with_imgsz(480, 640)
            .with_threads(4)
            .with_half(true)
            .with_device(Device::Cpu);
        assert!((config.confidence_threshold - 0.5).abs() < f32::EPSILON);
        assert!((config.iou_threshold - 0.6).abs() < f32::EPSILON);
        assert_eq!(config.max_detections, 50);
        assert_eq!(config.imgsz, Some((480, 640)));
        assert_eq!(config.num_threads, 4);
        assert!(config.half);
        assert_eq!(config.device, Device::Cpu);
    }

    #[test]
    fn test_thresholds_default() {
        let thresholds = GazeThresholds::new();
        assert!((thresholds.keypoint_confidence - 0.3).abs() < f32::EPSILON);
        assert!((thresholds.max_eye_level_diff - 20.0).abs() < f32::EPSILON);
        assert!((thresholds.max_nose_offset - 50.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_thresholds_builder() {
        let thresholds = GazeThresholds::new()
            .with_keypoint_confidence(0.5)
            .with_max_eye_level_diff(15.0)
            .with_max_nose_offset(30.0);
        assert!((thresholds.keypoint_confidence - 0.5).abs() < f32::EPSILON);
        assert!((thresholds.max_eye_level_diff - 15.0).abs() < f32::EPSILON);
        assert!((thresholds.max_nose_offset - 30.0).abs() < f32::EPSILON);
    }
}
