// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! COCO-Pose skeleton topology.
//!
//! Sixteen limbs over the 17 COCO keypoints, plus the palette indices the
//! overlay uses for each limb and marker.

/// Keypoint index pairs forming the drawn skeleton.
pub const SKELETON: [[usize; 2]; 16] = [
    [0, 1],   // nose to left eye
    [0, 2],   // nose to right eye
    [1, 3],   // left eye to left ear
    [2, 4],   // right eye to right ear
    [5, 6],   // left shoulder to right shoulder
    [5, 7],   // left shoulder to left elbow
    [7, 9],   // left elbow to left wrist
    [6, 8],   // right shoulder to right elbow
    [8, 10],  // right elbow to right wrist
    [5, 11],  // left shoulder to left hip
    [6, 12],  // right shoulder to right hip
    [11, 12], // left hip to right hip
    [11, 13], // left hip to left knee
    [13, 15], // left knee to left ankle
    [12, 14], // right hip to right knee
    [14, 16], // right knee to right ankle
];

/// Pose palette index for each limb in [`SKELETON`] order.
/// Face limbs green, arms blue, torso magenta, legs orange.
pub const LIMB_COLOR_INDICES: [usize; 16] = [16, 16, 16, 16, 9, 9, 9, 9, 9, 7, 7, 7, 0, 0, 0, 0];

/// Pose palette index for each keypoint.
/// Face green, arms blue, legs orange.
pub const KPT_COLOR_INDICES: [usize; 17] = [16, 16, 16, 16, 16, 9, 9, 9, 9, 9, 9, 0, 0, 0, 0, 0, 0];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visualizer::color::POSE_COLORS;

    #[test]
    fn test_edges_reference_valid_joints() {
        for edge in SKELETON {
            assert!(edge[0] < KPT_COLOR_INDICES.len());
            assert!(edge[1] < KPT_COLOR_INDICES.len());
            assert_ne!(edge[0], edge[1]);
        }
    }

    #[test]
    fn test_no_duplicate_edges() {
        for (i, a) in SKELETON.iter().enumerate() {
            for b in &SKELETON[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_color_tables_match_topology() {
        assert_eq!(LIMB_COLOR_INDICES.len(), SKELETON.len());
        for idx in LIMB_COLOR_INDICES.iter().chain(KPT_COLOR_INDICES.iter()) {
            assert!(*idx < POSE_COLORS.len());
        }
    }
}
