// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Person detection.
//!
//! [`Detector`] wraps a detection [`Model`] and reduces its predictions to
//! the person class, yielding typed [`BoundingBox`] values in full-frame
//! pixel coordinates.

use image::RgbImage;

use crate::error::{GazeError, Result};
use crate::model::Model;
use crate::results::Speed;
use crate::task::Task;

/// Class index of "person" in COCO-trained detection models.
pub const PERSON_CLASS_ID: usize = 0;

/// An axis-aligned detection box in full-frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Left edge.
    pub x1: f32,
    /// Top edge.
    pub y1: f32,
    /// Right edge.
    pub x2: f32,
    /// Bottom edge.
    pub y2: f32,
    /// Detection confidence in [0, 1].
    pub confidence: f32,
}

impl BoundingBox {
    /// Create a bounding box from corner coordinates.
    #[must_use]
    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            confidence,
        }
    }

    /// Box width in pixels.
    #[must_use]
    pub const fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    /// Box height in pixels.
    #[must_use]
    pub const fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Integer crop rectangle `(x, y, width, height)` for this box,
    /// expanded by `pad` pixels on every side and clamped to the frame.
    ///
    /// Returns `None` when the clamped rectangle is empty, e.g. for a box
    /// entirely outside the frame.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
    pub fn crop_region(
        &self,
        frame_w: u32,
        frame_h: u32,
        pad: u32,
    ) -> Option<(u32, u32, u32, u32)> {
        let pad = pad as f32;
        let x1 = (self.x1 - pad).floor().max(0.0);
        let y1 = (self.y1 - pad).floor().max(0.0);
        let x2 = (self.x2 + pad).ceil().min(frame_w as f32);
        let y2 = (self.y2 + pad).ceil().min(frame_h as f32);

        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some((x1 as u32, y1 as u32, (x2 - x1) as u32, (y2 - y1) as u32))
    }
}

/// Person detector backed by a YOLO detection model.
#[derive(Debug)]
pub struct Detector {
    model: Model,
    last_speed: Speed,
}

impl Detector {
    /// Wrap a loaded model, verifying it is a detection model.
    ///
    /// # Errors
    ///
    /// Returns [`GazeError::ModelLoadError`] if the model's task is not
    /// detection.
    pub fn new(model: Model) -> Result<Self> {
        if model.task() != Task::Detect {
            return Err(GazeError::ModelLoadError(format!(
                "expected a detection model, got task '{}'",
                model.task()
            )));
        }
        Ok(Self {
            model,
            last_speed: Speed::default(),
        })
    }

    /// Detect persons in a frame.
    ///
    /// Non-person classes and degenerate boxes are dropped. Boxes are
    /// ordered by descending confidence.
    ///
    /// # Errors
    ///
    /// Returns [`GazeError::DetectionFailure`] when inference on the frame
    /// fails.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn detect(&mut self, frame: &RgbImage) -> Result<Vec<BoundingBox>> {
        let prediction = self
            .model
            .predict_image(frame)
            .map_err(|e| GazeError::DetectionFailure(e.to_string()))?;
        self.last_speed = prediction.speed;

        let mut persons = Vec::new();
        if let Some(boxes) = &prediction.boxes {
            let xyxy = boxes.xyxy();
            let conf = boxes.conf();
            let cls = boxes.cls();
            for i in 0..boxes.len() {
                // Class ids are stored as f32 in the boxes matrix.
                if cls[i] as usize != PERSON_CLASS_ID {
                    continue;
                }
                let bbox = BoundingBox::new(
                    xyxy[[i, 0]],
                    xyxy[[i, 1]],
                    xyxy[[i, 2]],
                    xyxy[[i, 3]],
                    conf[i],
                );
                if bbox.width() <= 0.0 || bbox.height() <= 0.0 {
                    continue;
                }
                persons.push(bbox);
            }
        }
        Ok(persons)
    }

    /// Warm up the underlying model.
    ///
    /// # Errors
    ///
    /// Returns an error if the warmup inference fails.
    pub fn warmup(&mut self) -> Result<()> {
        self.model.warmup()
    }

    /// Timing of the most recent detection.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_dimensions() {
        let bbox = BoundingBox::new(10.0, 20.0, 110.0, 220.0, 0.9);
        assert!((bbox.width() - 100.0).abs() < f32::EPSILON);
        assert!((bbox.height() - 200.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_crop_region_clamps_to_frame() {
        let bbox = BoundingBox::new(-10.0, 5.0, 100.5, 200.0, 0.9);
        let (x, y, w, h) = bbox.crop_region(640, 480, 0).unwrap();
        assert_eq!((x, y), (0, 5));
        assert_eq!((w, h), (101, 195));
    }

    #[test]
    fn test_crop_region_with_padding() {
        let bbox = BoundingBox::new(50.0, 60.0, 150.0, 260.0, 0.8);
        let (x, y, w, h) = bbox.crop_region(640, 480, 20).unwrap();
        assert_eq!((x, y), (30, 40));
        assert_eq!((w, h), (140, 240));
    }

    #[test]
    fn test_crop_region_padding_clamped_at_edges() {
        let bbox = BoundingBox::new(5.0, 5.0, 630.0, 470.0, 0.8);
        let (x, y, w, h) = bbox.crop_region(640, 480, 50).unwrap();
        assert_eq!((x, y), (0, 0));
        assert_eq!((w, h), (640, 480));
    }

    #[test]
    fn test_crop_region_outside_frame() {
        let bbox = BoundingBox::new(700.0, 100.0, 800.0, 200.0, 0.9);
        assert!(bbox.crop_region(640, 480, 0).is_none());
    }

    #[test]
    fn test_crop_region_zero_area() {
        let bbox = BoundingBox::new(100.0, 100.0, 100.0, 150.0, 0.9);
        assert!(bbox.crop_region(640, 480, 0).is_none());
    }
}
