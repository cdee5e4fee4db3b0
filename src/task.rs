// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Task definitions for the two model roles used by the pipeline.
//!
//! The detection model localizes people; the pose model estimates keypoints.
//! Each loaded ONNX model declares its task in its metadata, and the adapters
//! refuse to wrap a model of the wrong kind.

use std::fmt;
use std::str::FromStr;

/// The inference task a model performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Task {
    /// Object detection producing bounding boxes.
    #[default]
    Detect,
    /// Pose estimation producing boxes plus 17 keypoints per person.
    Pose,
}

impl Task {
    /// Canonical lowercase name, as written in model metadata.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Detect => "detect",
            Self::Pose => "pose",
        }
    }

    /// Whether the model output includes per-person keypoints.
    #[must_use]
    pub const fn has_keypoints(&self) -> bool {
        matches!(self, Self::Pose)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a task string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskParseError(pub String);

impl fmt::Display for TaskParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid task '{}', expected one of: detect, pose",
            self.0
        )
    }
}

impl std::error::Error for TaskParseError {}

impl FromStr for Task {
    type Err = TaskParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "detect" | "detection" => Ok(Self::Detect),
            "pose" | "keypoint" | "keypoints" => Ok(Self::Pose),
            other => Err(TaskParseError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_as_str() {
        assert_eq!(Task::Detect.as_str(), "detect");
        assert_eq!(Task::Pose.as_str(), "pose");
    }

    #[test]
    fn test_task_display() {
        assert_eq!(Task::Pose.to_string(), "pose");
    }

    #[test]
    fn test_task_from_str() {
        assert_eq!("detect".parse::<Task>().unwrap(), Task::Detect);
        assert_eq!("Detection".parse::<Task>().unwrap(), Task::Detect);
        assert_eq!("pose".parse::<Task>().unwrap(), Task::Pose);
        assert_eq!("keypoints".parse::<Task>().unwrap(), Task::Pose);
        assert!("segment".parse::<Task>().is_err());
    }

    #[test]
    fn test_task_parse_error_message() {
        let err = "obb".parse::<Task>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid task 'obb', expected one of: detect, pose"
        );
    }

    #[test]
    fn test_task_default() {
        assert_eq!(Task::default(), Task::Detect);
    }

    #[test]
    fn test_has_keypoints() {
        assert!(Task::Pose.has_keypoints());
        assert!(!Task::Detect.has_keypoints());
    }
}
