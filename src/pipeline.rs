// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Frame processing pipeline.
//!
//! One [`GazePipeline::process_frame`] call runs the whole chain on a
//! frame: detect persons, crop each detection, estimate pose on the crop,
//! reproject keypoints into frame coordinates, and classify screen
//! attention. Frames are independent; nothing is carried between calls
//! and persons are not tracked across frames.

use image::{RgbImage, imageops};

use crate::classifier::{self, Verdict};
use crate::config::GazeThresholds;
use crate::detector::{BoundingBox, Detector};
use crate::error::Result;
use crate::keypoints::KeypointSet;
use crate::pose::PoseEstimator;
use crate::results::Speed;

/// One detected person with pose and verdict.
#[derive(Debug, Clone)]
pub struct Person {
    /// Detection box in frame coordinates.
    pub bbox: BoundingBox,
    /// Keypoint sets in frame coordinates, best detection first.
    pub keypoints: Vec<KeypointSet>,
    /// Screen-attention verdict, `None` when the face was not visible
    /// enough to judge.
    pub verdict: Option<Verdict>,
}

/// Detector and pose estimator composed into a per-frame pipeline.
#[derive(Debug)]
pub struct GazePipeline {
    detector: Detector,
    pose: PoseEstimator,
    thresholds: GazeThresholds,
    crop_padding: u32,
    last_speed: Speed,
}

impl GazePipeline {
    /// Compose a pipeline from its two models and the verdict thresholds.
    #[must_use]
    pub const fn new(detector: Detector, pose: PoseEstimator, thresholds: GazeThresholds) -> Self {
        Self {
            detector,
            pose,
            thresholds,
            crop_padding: 0,
            last_speed: Speed::new(0.0, 0.0),
        }
    }

    /// Pixels of context added around each detection box before pose
    /// estimation. Defaults to zero.
    #[must_use]
    pub const fn with_crop_padding(mut self, padding: u32) -> Self {
        self.crop_padding = padding;
        self
    }

    /// Warm up both models.
    ///
    /// # Errors
    ///
    /// Returns an error if either warmup inference fails.
    pub fn warmup(&mut self) -> Result<()> {
        self.detector.warmup()?;
        self.pose.warmup()
    }

    /// Run detection, pose estimation, and classification on one frame.
    ///
    /// Every returned person carries frame-coordinate keypoints; crop
    /// geometry never leaks out of this method. Detections whose crop
    /// rectangle collapses to nothing are skipped.
    ///
    /// # Errors
    ///
    /// Propagates [`crate::GazeError::DetectionFailure`] and
    /// [`crate::GazeError::EstimationFailure`] from the underlying models.
    #[allow(clippy::cast_precision_loss)]
    pub fn process_frame(&mut self, frame: &RgbImage) -> Result<Vec<Person>> {
        let bboxes = self.detector.detect(frame)?;
        let mut speed = self.detector.last_speed();

        let mut persons = Vec::with_capacity(bboxes.len());
        for bbox in bboxes {
            let Some((cx, cy, cw, ch)) =
                bbox.crop_region(frame.width(), frame.height(), self.crop_padding)
            else {
                continue;
            };

            let crop = imageops::crop_imm(frame, cx, cy, cw, ch).to_image();
            let local_sets = self.pose.estimate(&crop)?;
            speed.accumulate(self.pose.last_speed());

            let keypoints: Vec<KeypointSet> = local_sets
                .iter()
                .map(|set| set.to_global(cx as f32, cy as f32))
                .collect();
            let verdict = keypoints
                .first()
                .and_then(|set| classifier::classify(set, &self.thresholds));

            persons.push(Person {
                bbox,
                keypoints,
                verdict,
            });
        }

        self.last_speed = speed;
        Ok(persons)
    }

    /// The thresholds verdicts are computed with.
    #[must_use]
    pub const fn thresholds(&self) -> &GazeThresholds {
        &self.thresholds
    }

    /// Crop padding in pixels.
    #[must_use]
    pub const fn crop_padding(&self) -> u32 {
        self.crop_padding
    }

    /// Combined model timing for the most recent frame.
    #[must_use]
    pub const fn last_speed(&self) -> Speed {
        self.last_speed
    }
}
