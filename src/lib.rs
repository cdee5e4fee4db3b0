// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::multiple_crate_versions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Ultralytics GazeCheck
//!
//! [![crates.io](https://img.shields.io/crates/v/gazecheck.svg)](https://crates.io/crates/gazecheck)
//! [![docs.rs](https://docs.rs/gazecheck/badge.svg)](https://docs.rs/gazecheck)
//! [![License](https://img.shields.io/crates/l/gazecheck.svg)](https://github.com/ultralytics/gazecheck/blob/main/LICENSE)
//!
//! Real-time screen-attention monitoring written in Rust. GazeCheck watches a
//! webcam, video file, or network stream, finds every person with an
//! [Ultralytics](https://ultralytics.com) YOLO11 detector, estimates their
//! COCO pose keypoints, and decides from face and shoulder geometry whether
//! each person is looking at the screen. Results are drawn live as skeleton
//! overlays with per-person verdict labels.
//!
//! ## Features
//!
//! - **Two-stage pipeline** - YOLO11 person detection followed by per-person pose estimation on crops
//! - **Deterministic verdicts** - A pure geometric heuristic, no learned gaze model and no hidden state
//! - **ONNX Runtime** - Cross-platform hardware acceleration for both models
//! - **Live overlay** - COCO skeleton, bounding boxes, and verdict labels rendered per frame
//! - **Multiple Sources** - Webcam index, video files, and RTSP/RTMP/HTTP streams
//! - **Auto-download** - Fetches `yolo11n.onnx` and `yolo11n-pose.onnx` on first run
//!
//! ## Installation
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! gazecheck = "0.1"
//! ```
//!
//! Or install the CLI tool:
//!
//! ```bash
//! cargo install gazecheck
//! ```
//!
//! ## Quick Start (Library)
//!
//! ```no_run
//! use gazecheck::{Detector, GazePipeline, GazeThresholds, Model, PoseEstimator};
//! use image::RgbImage;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let detector = Detector::new(Model::load("yolo11n.onnx")?)?;
//!     let pose = PoseEstimator::new(Model::load("yolo11n-pose.onnx")?)?;
//!     let mut pipeline = GazePipeline::new(detector, pose, GazeThresholds::new());
//!
//!     let frame = RgbImage::new(640, 480);
//!     for person in pipeline.process_frame(&frame)? {
//!         match person.verdict {
//!             Some(verdict) => println!("person {:.2}: {}", person.bbox.confidence, verdict.label()),
//!             None => println!("person {:.2}: face not visible", person.bbox.confidence),
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # Watch the default webcam (auto-downloads both models)
//! gazecheck watch
//!
//! # Watch a second camera with a stricter detection threshold
//! gazecheck watch --source 1 --conf 0.5
//!
//! # Check a recorded meeting
//! gazecheck watch --source meeting.mp4
//!
//! # Watch an RTSP stream with FP16 inference
//! gazecheck watch --source rtsp://camera.local/stream --half
//!
//! # Loosen the geometry for a laptop camera mounted off-center
//! gazecheck watch --eye-diff 30 --nose-offset 80
//! ```
//!
//! **CLI Options:**
//!
//! | Option | Short | Description | Default |
//! |--------|-------|-------------|---------|
//! | `--source` | `-s` | Webcam index, video file, or stream URL | `0` |
//! | `--model` | `-m` | Person detection model | `yolo11n.onnx` |
//! | `--pose-model` | `-p` | Pose estimation model | `yolo11n-pose.onnx` |
//! | `--conf` | | Detection confidence threshold | `0.25` |
//! | `--iou` | | `IoU` threshold for NMS | `0.45` |
//! | `--device` | `-d` | Detector device (auto, cpu, cuda[:N], coreml) | `auto` |
//! | `--pose-device` | | Pose model device | `cpu` |
//! | `--kpt-conf` | | Keypoint confidence gate | `0.3` |
//! | `--eye-diff` | | Max eye level difference in pixels | `20` |
//! | `--nose-offset` | | Max nose offset from shoulder midline | `50` |
//! | `--crop-pad` | | Extra context around each person crop | `0` |
//!
//! ## How the Check Works
//!
//! For each detected person the pipeline estimates 17 COCO keypoints, then
//! looks at five of them: nose, both eyes, and both shoulders. If any of the
//! five falls at or below the confidence gate the verdict is withheld.
//! Otherwise the person counts as looking at the screen when the eyes sit at
//! nearly the same height (head not tilted) and the nose stays close to the
//! shoulder midline (head not turned). Both comparisons are strict, so a
//! measurement exactly on a threshold reads as not looking.
//!
//! Thresholds are plain pixel distances and can be tuned per camera:
//!
//! ```rust
//! use gazecheck::GazeThresholds;
//!
//! let thresholds = GazeThresholds::new()
//!     .with_keypoint_confidence(0.35)
//!     .with_max_eye_level_diff(30.0)
//!     .with_max_nose_offset(80.0);
//! ```
//!
//! ## Custom Configuration
//!
//! Model sessions use the builder pattern:
//!
//! ```rust
//! use gazecheck::{Device, InferenceConfig};
//!
//! let config = InferenceConfig::new()
//!     .with_confidence(0.5)     // Confidence threshold
//!     .with_iou(0.45)           // NMS IoU threshold
//!     .with_max_detections(100) // Max detections per frame
//!     .with_imgsz(640, 640)     // Input image size
//!     .with_device(Device::Cpu);
//! ```
//!
//! ## Hardware Acceleration
//!
//! Enable hardware acceleration with Cargo features:
//!
//! ```bash
//! # NVIDIA CUDA
//! cargo build --release --features cuda
//!
//! # Apple CoreML
//! cargo build --release --features coreml
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`pipeline`] | [`GazePipeline`] composing detection, pose, and verdicts |
//! | [`detector`] | Person detection ([`Detector`], [`BoundingBox`]) |
//! | [`pose`] | Pose estimation on person crops ([`PoseEstimator`]) |
//! | [`classifier`] | The looking-at-screen heuristic ([`classify`], [`Verdict`]) |
//! | [`keypoints`] | COCO joint types ([`Joint`], [`Keypoint`], [`KeypointSet`]) |
//! | [`capture`] | Frame sources ([`Capture`], [`CaptureSource`]) |
//! | [`model`] | ONNX session handling ([`Model`]) |
//! | [`results`] | Raw inference outputs ([`Prediction`], [`Boxes`], [`Keypoints`]) |
//! | [`config`] | [`InferenceConfig`] and [`GazeThresholds`] |
//! | [`error`] | Error types ([`GazeError`], [`Result`]) |
//! | [`preprocessing`] | Letterboxing and tensor conversion |
//! | [`postprocessing`] | Output decoding (NMS, keypoint re-projection) |
//! | [`metadata`] | ONNX model metadata parsing |
//! | [`visualizer`] | Skeleton tables, palette, and display window |
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `annotate` | Skeleton and label rendering (default) |
//! | `visualize` | Real-time window display (default) |
//! | `video` | Webcam, video file, and stream capture (default) |
//! | `cuda` | NVIDIA CUDA acceleration |
//! | `coreml` | Apple `CoreML` (macOS) |
//!
//! ## License
//!
//! This project is dual-licensed under [AGPL-3.0](https://github.com/ultralytics/gazecheck/blob/main/LICENSE)
//! for open-source use or [Ultralytics Enterprise License](https://ultralytics.com/license)
//! for commercial applications.

// Modules
#[cfg(feature = "annotate")]
pub mod annotate;
pub mod capture;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod detector;
pub mod device;
pub mod download;
pub mod error;
pub mod keypoints;
pub mod metadata;
pub mod model;
pub mod pipeline;
pub mod pose;
pub mod postprocessing;
pub mod preprocessing;
pub mod results;
pub mod task;
pub mod utils;
pub mod visualizer;

// Re-export main types for convenience
pub use capture::{Capture, CaptureSource};
pub use classifier::{Verdict, classify};
pub use config::{GazeThresholds, InferenceConfig};
pub use detector::{BoundingBox, Detector, PERSON_CLASS_ID};
pub use device::Device;
pub use error::{GazeError, Result};
pub use keypoints::{Joint, Keypoint, KeypointSet};
pub use model::Model;
pub use pipeline::{GazePipeline, Person};
pub use pose::PoseEstimator;
pub use results::{Boxes, Keypoints, Prediction, Speed};
pub use task::Task;

// Re-export metadata for advanced use
pub use metadata::ModelMetadata;

// Re-export preprocessing utilities
pub use preprocessing::{PreprocessResult, preprocess_image, preprocess_image_with_precision};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        // Version should be semver format like "0.1.0"
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "gazecheck");
    }
}
