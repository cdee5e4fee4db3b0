// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error types for the gaze-check pipeline.

use std::fmt;

/// Errors that can occur while capturing, inferring, or rendering.
#[derive(Debug)]
#[non_exhaustive]
pub enum GazeError {
    /// The capture device or stream could not be opened. Fatal at startup.
    CaptureUnavailable(String),
    /// The detection model failed on a frame. The frame is skipped.
    DetectionFailure(String),
    /// The pose model failed on a crop. The frame is skipped.
    EstimationFailure(String),
    /// Model file missing, unreadable, or not the expected kind of model.
    ModelLoadError(String),
    /// ONNX Runtime session error.
    InferenceError(String),
    /// Image decoding or conversion error.
    ImageError(String),
    /// Invalid configuration value.
    ConfigError(String),
    /// Model metadata could not be parsed.
    MetadataError(String),
    /// Raw model output could not be decoded.
    PostProcessingError(String),
    /// Display window error.
    VisualizerError(String),
    /// Video decoding error.
    VideoError(String),
    /// I/O error with context.
    IoError(String),
    /// Wrapped I/O error.
    Io(std::io::Error),
    /// The requested capability was not compiled in.
    FeatureNotEnabled(String),
}

impl fmt::Display for GazeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CaptureUnavailable(msg) => write!(f, "Capture unavailable: {msg}"),
            Self::DetectionFailure(msg) => write!(f, "Detection failure: {msg}"),
            Self::EstimationFailure(msg) => write!(f, "Pose estimation failure: {msg}"),
            Self::ModelLoadError(msg) => write!(f, "Model load error: {msg}"),
            Self::InferenceError(msg) => write!(f, "Inference error: {msg}"),
            Self::ImageError(msg) => write!(f, "Image error: {msg}"),
            Self::ConfigError(msg) => write!(f, "Configuration error: {msg}"),
            Self::MetadataError(msg) => write!(f, "Metadata error: {msg}"),
            Self::PostProcessingError(msg) => write!(f, "Post-processing error: {msg}"),
            Self::VisualizerError(msg) => write!(f, "Visualizer error: {msg}"),
            Self::VideoError(msg) => write!(f, "Video error: {msg}"),
            Self::IoError(msg) => write!(f, "I/O error: {msg}"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::FeatureNotEnabled(msg) => write!(f, "Feature not enabled: {msg}"),
        }
    }
}

impl std::error::Error for GazeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GazeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<image::ImageError> for GazeError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageError(err.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GazeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GazeError::CaptureUnavailable("cannot open /dev/video0".to_string());
        assert_eq!(err.to_string(), "Capture unavailable: cannot open /dev/video0");

        let err = GazeError::DetectionFailure("bad tensor".to_string());
        assert_eq!(err.to_string(), "Detection failure: bad tensor");

        let err = GazeError::ModelLoadError("missing file".to_string());
        assert_eq!(err.to_string(), "Model load error: missing file");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: GazeError = io_err.into();
        assert!(matches!(err, GazeError::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_string_variants_have_no_source() {
        let err = GazeError::EstimationFailure("oops".to_string());
        assert!(std::error::Error::source(&err).is_none());
    }
}
