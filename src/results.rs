// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Structured model output: boxes, keypoints, and per-stage timing.
//!
//! A [`Prediction`] is the normalized result of one model invocation. Box
//! and keypoint coordinates are always in source-image space by the time
//! they land here; the raw tensor layout never escapes post-processing.

use std::collections::HashMap;

use ndarray::{Array2, Array3, ArrayView1, ArrayView2, ArrayView3, s};

use crate::utils::pluralize;

/// Per-stage inference timing in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Speed {
    pub preprocess: f64,
    pub inference: f64,
    pub postprocess: Option<f64>,
}

impl Speed {
    /// Create timing for the first two stages; post-processing is filled in
    /// once it has run.
    #[must_use]
    pub const fn new(preprocess: f64, inference: f64) -> Self {
        Self {
            preprocess,
            inference,
            postprocess: None,
        }
    }

    /// Total time across all recorded stages.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.preprocess + self.inference + self.postprocess.unwrap_or(0.0)
    }

    /// Fold another measurement into this one, stage by stage.
    pub fn accumulate(&mut self, other: Self) {
        self.preprocess += other.preprocess;
        self.inference += other.inference;
        self.postprocess = match (self.postprocess, other.postprocess) {
            (Some(a), Some(b)) => Some(a + b),
            (a, b) => a.or(b),
        };
    }
}

/// Detection boxes as an (N, 6) array of `[x1, y1, x2, y2, conf, cls]` rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Boxes {
    data: Array2<f32>,
    orig_shape: (u32, u32),
}

impl Boxes {
    /// Wrap an (N, 6) array of box rows in source-image coordinates.
    #[must_use]
    pub const fn new(data: Array2<f32>, orig_shape: (u32, u32)) -> Self {
        Self { data, orig_shape }
    }

    /// An empty set of boxes for the given source shape.
    #[must_use]
    pub fn empty(orig_shape: (u32, u32)) -> Self {
        Self::new(Array2::zeros((0, 6)), orig_shape)
    }

    /// Box corners as an (N, 4) view.
    #[must_use]
    pub fn xyxy(&self) -> ArrayView2<'_, f32> {
        self.data.slice(s![.., 0..4])
    }

    /// Confidence column.
    #[must_use]
    pub fn conf(&self) -> ArrayView1<'_, f32> {
        self.data.slice(s![.., -2])
    }

    /// Class index column (stored as f32).
    #[must_use]
    pub fn cls(&self) -> ArrayView1<'_, f32> {
        self.data.slice(s![.., -1])
    }

    /// Number of boxes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    /// Whether there are no boxes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Source image shape as (height, width).
    #[must_use]
    pub const fn orig_shape(&self) -> (u32, u32) {
        self.orig_shape
    }
}

/// Pose keypoints as an (N, K, 3) array of `[x, y, conf]` triplets.
#[derive(Debug, Clone, PartialEq)]
pub struct Keypoints {
    data: Array3<f32>,
    orig_shape: (u32, u32),
    has_visible: bool,
}

impl Keypoints {
    /// Wrap an (N, K, 2|3) keypoint array in source-image coordinates.
    #[must_use]
    pub fn new(data: Array3<f32>, orig_shape: (u32, u32)) -> Self {
        let has_visible = data.dim().2 == 3;
        Self {
            data,
            orig_shape,
            has_visible,
        }
    }

    /// Keypoint positions as an (N, K, 2) view.
    #[must_use]
    pub fn xy(&self) -> ArrayView3<'_, f32> {
        self.data.slice(s![.., .., 0..2])
    }

    /// Keypoint confidences as an (N, K) view, when present.
    #[must_use]
    pub fn conf(&self) -> Option<ArrayView2<'_, f32>> {
        self.has_visible.then(|| self.data.slice(s![.., .., 2]))
    }

    /// Iterate over one (K, 2|3) view per detected person.
    pub fn sets(&self) -> impl Iterator<Item = ArrayView2<'_, f32>> {
        self.data.outer_iter()
    }

    /// Number of keypoint sets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.dim().0
    }

    /// Whether there are no keypoint sets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Source image shape as (height, width).
    #[must_use]
    pub const fn orig_shape(&self) -> (u32, u32) {
        self.orig_shape
    }
}

/// The normalized output of one model invocation.
#[derive(Debug, Clone)]
pub struct Prediction {
    /// Detected boxes, present for both tasks.
    pub boxes: Option<Boxes>,
    /// Keypoint sets, present for pose models.
    pub keypoints: Option<Keypoints>,
    /// Per-stage timing for this invocation.
    pub speed: Speed,
    /// Source image shape as (height, width).
    pub orig_shape: (u32, u32),
    /// Inference tensor shape as (height, width).
    pub inference_shape: (usize, usize),
    /// Class index to name mapping from the model.
    pub names: HashMap<usize, String>,
}

impl Prediction {
    /// Assemble a prediction.
    #[must_use]
    pub const fn new(
        boxes: Option<Boxes>,
        keypoints: Option<Keypoints>,
        speed: Speed,
        orig_shape: (u32, u32),
        inference_shape: (usize, usize),
        names: HashMap<usize, String>,
    ) -> Self {
        Self {
            boxes,
            keypoints,
            speed,
            orig_shape,
            inference_shape,
            names,
        }
    }

    /// Number of detections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.boxes.as_ref().map_or(0, Boxes::len)
    }

    /// Whether nothing was detected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short per-class summary, e.g. `"2 persons, 1 chair, "`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn verbose(&self) -> String {
        let Some(boxes) = self.boxes.as_ref().filter(|b| !b.is_empty()) else {
            return "(no detections), ".to_string();
        };

        let mut counts: HashMap<usize, usize> = HashMap::new();
        for cls in boxes.cls() {
            *counts.entry(*cls as usize).or_insert(0) += 1;
        }

        let mut class_ids: Vec<usize> = counts.keys().copied().collect();
        class_ids.sort_unstable();

        let mut summary = String::new();
        for class_id in class_ids {
            let count = counts[&class_id];
            let name = self
                .names
                .get(&class_id)
                .map_or("object", String::as_str);
            summary.push_str(&format!("{count} {}, ", pluralize(name, count)));
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn person_names() -> HashMap<usize, String> {
        let mut names = HashMap::new();
        names.insert(0, "person".to_string());
        names.insert(56, "chair".to_string());
        names
    }

    #[test]
    fn test_speed_total() {
        let mut speed = Speed::new(1.5, 10.0);
        assert!((speed.total() - 11.5).abs() < 1e-9);
        speed.postprocess = Some(2.5);
        assert!((speed.total() - 14.0).abs() < 1e-9);
    }

    #[test]
    fn test_speed_accumulate() {
        let mut total = Speed::new(0.0, 0.0);
        let mut frame = Speed::new(1.0, 10.0);
        frame.postprocess = Some(2.0);
        total.accumulate(frame);
        total.accumulate(Speed::new(0.5, 5.0));
        assert!((total.preprocess - 1.5).abs() < 1e-9);
        assert!((total.inference - 15.0).abs() < 1e-9);
        assert_eq!(total.postprocess, Some(2.0));
    }

    #[test]
    fn test_boxes_views() {
        let data = array![
            [10.0, 20.0, 110.0, 220.0, 0.9, 0.0],
            [5.0, 5.0, 50.0, 50.0, 0.75, 56.0],
        ];
        let boxes = Boxes::new(data, (480, 640));
        assert_eq!(boxes.len(), 2);
        assert!(!boxes.is_empty());
        assert_eq!(boxes.xyxy()[[0, 2]], 110.0);
        assert_eq!(boxes.conf()[1], 0.75);
        assert_eq!(boxes.cls()[1], 56.0);
        assert_eq!(boxes.orig_shape(), (480, 640));
    }

    #[test]
    fn test_empty_boxes() {
        let boxes = Boxes::empty((480, 640));
        assert!(boxes.is_empty());
        assert_eq!(boxes.xyxy().nrows(), 0);
    }

    #[test]
    fn test_keypoints_views() {
        let data = Array3::from_shape_fn((2, 17, 3), |(n, k, c)| {
            #[allow(clippy::cast_precision_loss)]
            {
                (n * 100 + k * 3 + c) as f32
            }
        });
        let kpts = Keypoints::new(data, (480, 640));
        assert_eq!(kpts.len(), 2);
        assert!(kpts.conf().is_some());
        assert_eq!(kpts.xy().dim(), (2, 17, 2));
        assert_eq!(kpts.sets().count(), 2);
    }

    #[test]
    fn test_keypoints_without_visibility() {
        let data = Array3::<f32>::zeros((1, 17, 2));
        let kpts = Keypoints::new(data, (480, 640));
        assert!(kpts.conf().is_none());
    }

    #[test]
    fn test_verbose_empty() {
        let prediction = Prediction::new(
            Some(Boxes::empty((480, 640))),
            None,
            Speed::default(),
            (480, 640),
            (640, 640),
            person_names(),
        );
        assert_eq!(prediction.verbose(), "(no detections), ");
        assert!(prediction.is_empty());
    }

    #[test]
    fn test_verbose_counts_classes() {
        let data = array![
            [0.0, 0.0, 10.0, 10.0, 0.9, 0.0],
            [20.0, 0.0, 30.0, 10.0, 0.8, 0.0],
            [40.0, 0.0, 50.0, 10.0, 0.7, 56.0],
        ];
        let prediction = Prediction::new(
            Some(Boxes::new(data, (480, 640))),
            None,
            Speed::default(),
            (480, 640),
            (640, 640),
            person_names(),
        );
        assert_eq!(prediction.verbose(), "2 persons, 1 chair, ");
        assert_eq!(prediction.len(), 3);
    }

    #[test]
    fn test_verbose_unknown_class() {
        let data = array![[0.0, 0.0, 10.0, 10.0, 0.9, 99.0]];
        let prediction = Prediction::new(
            Some(Boxes::new(data, (480, 640))),
            None,
            Speed::default(),
            (480, 640),
            (640, 640),
            person_names(),
        );
        assert_eq!(prediction.verbose(), "1 object, ");
    }
}
