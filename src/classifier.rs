// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Screen-attention classification.
//!
//! A deterministic geometric check over face and shoulder keypoints: the
//! eyes must sit level and the nose must stay near the shoulder midline
//! for a person to count as looking at the screen. No learned weights, no
//! smoothing, no cross-frame state. Same keypoints in, same verdict out.

use crate::config::GazeThresholds;
use crate::keypoints::{Joint, KeypointSet};

/// Classification outcome for one person.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Face oriented toward the camera.
    Looking,
    /// Face turned or tilted away.
    NotLooking,
}

impl Verdict {
    /// Overlay label text for this verdict.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Looking => "Looking at screen",
            Self::NotLooking => "Not looking",
        }
    }
}

/// Joints that must clear the confidence gate before classification.
const REQUIRED_JOINTS: [Joint; 5] = [
    Joint::Nose,
    Joint::LeftEye,
    Joint::RightEye,
    Joint::LeftShoulder,
    Joint::RightShoulder,
];

/// Classify whether a person is looking at the screen.
///
/// Returns `None` when any required joint's confidence fails to exceed
/// `thresholds.keypoint_confidence`; a hidden face never produces a
/// verdict. Otherwise the verdict is [`Verdict::Looking`] exactly when the
/// eyes are within `max_eye_level_diff` pixels of level and the nose is
/// within `max_nose_offset` pixels of the shoulder midline. Both
/// comparisons are strict, so a measurement landing exactly on a threshold
/// classifies as [`Verdict::NotLooking`].
#[must_use]
pub fn classify(keypoints: &KeypointSet, thresholds: &GazeThresholds) -> Option<Verdict> {
    for joint in REQUIRED_JOINTS {
        if keypoints.get(joint).confidence <= thresholds.keypoint_confidence {
            return None;
        }
    }

    let nose = keypoints.get(Joint::Nose);
    let left_eye = keypoints.get(Joint::LeftEye);
    let right_eye = keypoints.get(Joint::RightEye);
    let left_shoulder = keypoints.get(Joint::LeftShoulder);
    let right_shoulder = keypoints.get(Joint::RightShoulder);

    let eye_level_diff = (left_eye.y - right_eye.y).abs();
    let shoulder_center_x = (left_shoulder.x + right_shoulder.x) / 2.0;
    let nose_offset = (nose.x - shoulder_center_x).abs();

    if eye_level_diff < thresholds.max_eye_level_diff && nose_offset < thresholds.max_nose_offset {
        Some(Verdict::Looking)
    } else {
        Some(Verdict::NotLooking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypoints::Keypoint;

    /// A person square to the camera: level eyes, nose centered between
    /// the shoulders.
    fn facing_set() -> KeypointSet {
        let mut points = [Keypoint::new(0.0, 0.0, 0.9); 17];
        points[Joint::Nose.index()] = Keypoint::new(300.0, 120.0, 0.9);
        points[Joint::LeftEye.index()] = Keypoint::new(310.0, 100.0, 0.9);
        points[Joint::RightEye.index()] = Keypoint::new(290.0, 101.0, 0.9);
        points[Joint::LeftShoulder.index()] = Keypoint::new(340.0, 200.0, 0.9);
        points[Joint::RightShoulder.index()] = Keypoint::new(260.0, 200.0, 0.9);
        KeypointSet::new(points)
    }

    fn with_joint(mut base: [Keypoint; 17], joint: Joint, point: Keypoint) -> [Keypoint; 17] {
        base[joint.index()] = point;
        base
    }

    #[test]
    fn test_facing_person_is_looking() {
        let verdict = classify(&facing_set(), &GazeThresholds::default());
        assert_eq!(verdict, Some(Verdict::Looking));
    }

    #[test]
    fn test_tilted_head_is_not_looking() {
        let points = with_joint(
            *facing_set().points(),
            Joint::RightEye,
            Keypoint::new(290.0, 140.0, 0.9),
        );
        let verdict = classify(&KeypointSet::new(points), &GazeThresholds::default());
        assert_eq!(verdict, Some(Verdict::NotLooking));
    }

    #[test]
    fn test_turned_head_is_not_looking() {
        let points = with_joint(
            *facing_set().points(),
            Joint::Nose,
            Keypoint::new(360.0, 120.0, 0.9),
        );
        let verdict = classify(&KeypointSet::new(points), &GazeThresholds::default());
        assert_eq!(verdict, Some(Verdict::NotLooking));
    }

    #[test]
    fn test_eye_diff_on_threshold_is_not_looking() {
        // Eye level difference of exactly 20: the comparison is strict.
        let points = with_joint(
            *facing_set().points(),
            Joint::RightEye,
            Keypoint::new(290.0, 120.0, 0.9),
        );
        let points = with_joint(points, Joint::LeftEye, Keypoint::new(310.0, 100.0, 0.9));
        let verdict = classify(&KeypointSet::new(points), &GazeThresholds::default());
        assert_eq!(verdict, Some(Verdict::NotLooking));
    }

    #[test]
    fn test_nose_offset_on_threshold_is_not_looking() {
        // Nose offset of exactly 50 from the shoulder midline at x=300.
        let points = with_joint(
            *facing_set().points(),
            Joint::Nose,
            Keypoint::new(350.0, 120.0, 0.9),
        );
        let verdict = classify(&KeypointSet::new(points), &GazeThresholds::default());
        assert_eq!(verdict, Some(Verdict::NotLooking));
    }

    #[test]
    fn test_occluded_eye_gives_no_verdict() {
        let points = with_joint(
            *facing_set().points(),
            Joint::LeftEye,
            Keypoint::new(310.0, 100.0, 0.2),
        );
        let verdict = classify(&KeypointSet::new(points), &GazeThresholds::default());
        assert_eq!(verdict, None);
    }

    #[test]
    fn test_confidence_gate_is_strict() {
        // Confidence exactly at the gate does not pass it.
        let mut points = *facing_set().points();
        for joint in REQUIRED_JOINTS {
            let p = points[joint.index()];
            points[joint.index()] =
                Keypoint::new(p.x, p.y, GazeThresholds::DEFAULT_KEYPOINT_CONFIDENCE);
        }
        let verdict = classify(&KeypointSet::new(points), &GazeThresholds::default());
        assert_eq!(verdict, None);
    }

    #[test]
    fn test_unrelated_joints_do_not_gate() {
        // Ankles and wrists at zero confidence must not block the verdict.
        let mut points = *facing_set().points();
        points[Joint::LeftAnkle.index()] = Keypoint::new(0.0, 0.0, 0.0);
        points[Joint::RightWrist.index()] = Keypoint::new(0.0, 0.0, 0.0);
        let verdict = classify(&KeypointSet::new(points), &GazeThresholds::default());
        assert_eq!(verdict, Some(Verdict::Looking));
    }

    #[test]
    fn test_custom_thresholds_widen_looking() {
        let points = with_joint(
            *facing_set().points(),
            Joint::RightEye,
            Keypoint::new(290.0, 140.0, 0.9),
        );
        let set = KeypointSet::new(points);
        let relaxed = GazeThresholds::new().with_max_eye_level_diff(50.0);
        assert_eq!(classify(&set, &relaxed), Some(Verdict::Looking));
        assert_eq!(
            classify(&set, &GazeThresholds::default()),
            Some(Verdict::NotLooking)
        );
    }

    #[test]
    fn test_classification_is_deterministic() {
        let set = facing_set();
        let thresholds = GazeThresholds::default();
        let first = classify(&set, &thresholds);
        for _ in 0..10 {
            assert_eq!(classify(&set, &thresholds), first);
        }
    }

    #[test]
    fn test_verdict_labels() {
        assert_eq!(Verdict::Looking.label(), "Looking at screen");
        assert_eq!(Verdict::NotLooking.label(), "Not looking");
    }
}
