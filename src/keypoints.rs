// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Typed 17-keypoint skeleton in the fixed COCO ordering.
//!
//! Keypoint index order is load-bearing: the skeleton topology and the gaze
//! heuristic address joints by index, so a [`KeypointSet`] never reorders its
//! points. Pose model output is normalized into these types at the adapter
//! boundary and stays typed from there on.

use ndarray::ArrayView2;

/// A named body joint, with its COCO keypoint index as the discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Joint {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl Joint {
    /// Number of keypoints in a complete set.
    pub const COUNT: usize = 17;

    /// Every joint, in keypoint index order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    /// The joint's keypoint index.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Human-readable joint name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "left eye",
            Self::RightEye => "right eye",
            Self::LeftEar => "left ear",
            Self::RightEar => "right ear",
            Self::LeftShoulder => "left shoulder",
            Self::RightShoulder => "right shoulder",
            Self::LeftElbow => "left elbow",
            Self::RightElbow => "right elbow",
            Self::LeftWrist => "left wrist",
            Self::RightWrist => "right wrist",
            Self::LeftHip => "left hip",
            Self::RightHip => "right hip",
            Self::LeftKnee => "left knee",
            Self::RightKnee => "right knee",
            Self::LeftAnkle => "left ankle",
            Self::RightAnkle => "right ankle",
        }
    }
}

/// A single keypoint: position plus detection confidence in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

impl Keypoint {
    /// Create a keypoint.
    #[must_use]
    pub const fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    /// The same keypoint shifted by (dx, dy). Confidence is unchanged.
    #[must_use]
    pub const fn translated(self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            confidence: self.confidence,
        }
    }
}

/// An ordered set of exactly 17 keypoints for one person.
#[derive(Debug, Clone, PartialEq)]
pub struct KeypointSet {
    points: [Keypoint; Joint::COUNT],
}

impl KeypointSet {
    /// Create a set from points already in keypoint index order.
    #[must_use]
    pub const fn new(points: [Keypoint; Joint::COUNT]) -> Self {
        Self { points }
    }

    /// Build a set from one person's pose output rows.
    ///
    /// Expects a (17, 3) view of `[x, y, confidence]` rows; a (17, 2) view is
    /// accepted with all confidences taken as 1.0. Returns `None` when the
    /// row count is not 17.
    #[must_use]
    pub fn try_from_rows(rows: ArrayView2<'_, f32>) -> Option<Self> {
        if rows.nrows() != Joint::COUNT || rows.ncols() < 2 {
            return None;
        }
        let mut points = [Keypoint::default(); Joint::COUNT];
        for (point, row) in points.iter_mut().zip(rows.outer_iter()) {
            let confidence = if rows.ncols() > 2 { row[2] } else { 1.0 };
            *point = Keypoint::new(row[0], row[1], confidence);
        }
        Some(Self { points })
    }

    /// The keypoint for a joint.
    #[must_use]
    pub const fn get(&self, joint: Joint) -> Keypoint {
        self.points[joint.index()]
    }

    /// All points, in keypoint index order.
    #[must_use]
    pub const fn points(&self) -> &[Keypoint; Joint::COUNT] {
        &self.points
    }

    /// Re-project crop-local coordinates into the full frame.
    ///
    /// Pure translation: adds the crop origin to every position, preserving
    /// confidences and index order.
    #[must_use]
    pub fn to_global(&self, origin_x: f32, origin_y: f32) -> Self {
        let mut points = self.points;
        for point in &mut points {
            *point = point.translated(origin_x, origin_y);
        }
        Self { points }
    }

    /// Iterate over (joint, keypoint) pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (Joint, Keypoint)> + '_ {
        Joint::ALL.iter().map(|&joint| (joint, self.get(joint)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn numbered_set() -> KeypointSet {
        let mut points = [Keypoint::default(); Joint::COUNT];
        for (i, point) in points.iter_mut().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            {
                *point = Keypoint::new(i as f32 * 10.0, i as f32 * 5.0, 0.8);
            }
        }
        KeypointSet::new(points)
    }

    #[test]
    fn test_joint_indices_are_coco_order() {
        assert_eq!(Joint::Nose.index(), 0);
        assert_eq!(Joint::LeftEye.index(), 1);
        assert_eq!(Joint::RightEye.index(), 2);
        assert_eq!(Joint::LeftShoulder.index(), 5);
        assert_eq!(Joint::RightShoulder.index(), 6);
        assert_eq!(Joint::RightAnkle.index(), 16);
        for (i, joint) in Joint::ALL.iter().enumerate() {
            assert_eq!(joint.index(), i);
        }
    }

    #[test]
    fn test_to_global_identity() {
        let set = numbered_set();
        assert_eq!(set.to_global(0.0, 0.0), set);
    }

    #[test]
    fn test_to_global_composes() {
        let set = numbered_set();
        let twice = set.to_global(3.0, 4.0).to_global(7.0, -1.0);
        let once = set.to_global(10.0, 3.0);
        for (a, b) in twice.points().iter().zip(once.points()) {
            assert!((a.x - b.x).abs() < 1e-5);
            assert!((a.y - b.y).abs() < 1e-5);
            assert!((a.confidence - b.confidence).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn test_to_global_preserves_order_and_confidence() {
        let set = numbered_set();
        let moved = set.to_global(100.0, 200.0);
        for joint in Joint::ALL {
            let before = set.get(joint);
            let after = moved.get(joint);
            assert!((after.x - (before.x + 100.0)).abs() < 1e-5);
            assert!((after.y - (before.y + 200.0)).abs() < 1e-5);
            assert!((after.confidence - before.confidence).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn test_try_from_rows() {
        let mut data = Vec::new();
        for i in 0..17 {
            #[allow(clippy::cast_precision_loss)]
            data.extend_from_slice(&[i as f32, i as f32 + 0.5, 0.9]);
        }
        let array = Array2::from_shape_vec((17, 3), data).unwrap();
        let set = KeypointSet::try_from_rows(array.view()).unwrap();
        assert!((set.get(Joint::RightEye).x - 2.0).abs() < f32::EPSILON);
        assert!((set.get(Joint::RightEye).y - 2.5).abs() < f32::EPSILON);
        assert!((set.get(Joint::RightEye).confidence - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn test_try_from_rows_rejects_wrong_count() {
        let array = Array2::<f32>::zeros((16, 3));
        assert!(KeypointSet::try_from_rows(array.view()).is_none());
    }

    #[test]
    fn test_joint_names() {
        assert_eq!(Joint::Nose.name(), "nose");
        assert_eq!(Joint::LeftShoulder.name(), "left shoulder");
    }
}
