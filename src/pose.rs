// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Pose estimation on person crops.
//!
//! [`PoseEstimator`] wraps a pose [`Model`] and converts its raw keypoint
//! tensors into typed [`KeypointSet`] values. Coordinates are local to the
//! crop passed in; reprojection into frame space is the caller's job via
//! [`KeypointSet::to_global`].

use image::RgbImage;

use crate::error::{GazeError, Result};
use crate::keypoints::{Joint, KeypointSet};
use crate::model::Model;
use crate::results::Speed;
use crate::task::Task;

/// Pose estimator backed by a YOLO pose model.
#[derive(Debug)]
pub struct PoseEstimator {
    model: Model,
    last_speed: Speed,
}

impl PoseEstimator {
    /// Wrap a loaded model, verifying it is a 17-keypoint pose model.
    ///
    /// # Errors
    ///
    /// Returns [`GazeError::ModelLoadError`] if the model's task is not
    /// pose estimation or its metadata reports a keypoint count other
    /// than 17.
    pub fn new(model: Model) -> Result<Self> {
        if model.task() != Task::Pose {
            return Err(GazeError::ModelLoadError(format!(
                "expected a pose model, got task '{}'",
                model.task()
            )));
        }
        if let Some((num_keypoints, _)) = model.metadata().kpt_shape
            && num_keypoints != Joint::COUNT
        {
            return Err(GazeError::ModelLoadError(format!(
                "pose model reports {num_keypoints} keypoints, expected {}",
                Joint::COUNT
            )));
        }
        Ok(Self {
            model,
            last_speed: Speed::default(),
        })
    }

    /// Estimate poses for every person found in `subimage`.
    ///
    /// Returned keypoints are in `subimage` coordinates, ordered by
    /// descending detection confidence. An empty vector means the model
    /// found nobody in the crop.
    ///
    /// # Errors
    ///
    /// Returns [`GazeError::EstimationFailure`] when inference fails or
    /// the model emits a malformed keypoint tensor.
    pub fn estimate(&mut self, subimage: &RgbImage) -> Result<Vec<KeypointSet>> {
        let prediction = self
            .model
            .predict_image(subimage)
            .map_err(|e| GazeError::EstimationFailure(e.to_string()))?;
        self.last_speed = prediction.speed;

        let Some(keypoints) = prediction.keypoints else {
            return Ok(Vec::new());
        };

        let mut sets = Vec::with_capacity(keypoints.len());
        for rows in keypoints.sets() {
            let set = KeypointSet::try_from_rows(rows).ok_or_else(|| {
                GazeError::EstimationFailure(format!(
                    "pose output had {} keypoints, expected {}",
                    rows.nrows(),
                    Joint::COUNT
                ))
            })?;
            sets.push(set);
        }
        Ok(sets)
    }

    /// Warm up the underlying model.
    ///
    /// # Errors
    ///
    /// Returns an error if the warmup inference fails.
    pub fn warmup(&mut self) -> Result<()> {
        self.model.warmup()
    }

    /// Timing of the most recent estimation.
    #[must_use]
    pub const fn last_speed(&self) -> Speed {
        self.last_speed
    }

    /// The wrapped model.
    #[must_use]
    pub const fn model(&self) -> &Model {
        &self.model
    }
}
