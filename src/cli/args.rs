// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use crate::config::GazeThresholds;
use crate::download::{DEFAULT_DETECT_MODEL, DEFAULT_POSE_MODEL};
use clap::{Args, Parser, Subcommand};

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = r#"Watch Options:
    --source, -s <SOURCE>        Webcam index, video file, or stream URL [default: 0]
    --model, -m <MODEL>          Person detection model path [default: yolo11n.onnx]
    --pose-model, -p <MODEL>     Pose estimation model path [default: yolo11n-pose.onnx]
    --conf <CONF>                Detection confidence threshold [default: 0.25]
    --device, -d <DEVICE>        Detector device: auto, cpu, cuda[:N], coreml [default: auto]
    --pose-device <DEVICE>       Pose model device [default: cpu]
    --eye-diff <PIXELS>          Max eye level difference to count as looking [default: 20]
    --nose-offset <PIXELS>       Max nose offset from shoulder midline [default: 50]
    --crop-pad <PIXELS>          Extra context around each person crop [default: 0]

Examples:
    gazecheck watch
    gazecheck watch --source 1 --conf 0.5
    gazecheck watch --source meeting.mp4 --device cpu
    gazecheck watch --source rtsp://camera.local/stream --half
    gazecheck watch --eye-diff 30 --nose-offset 80 --crop-pad 16"#)]
pub struct Cli {
    #[command(subcommand)]
    /// Subcommand to execute.
    pub command: Commands,
}

/// Commands for the CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch a camera, video, or stream and check who is looking at the screen
    Watch(WatchArgs),
}

/// Arguments for the watch command.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Input source: webcam index, video file path, or stream URL
    #[arg(short, long, default_value = "0")]
    pub source: String,

    /// Path to the person detection ONNX model
    #[arg(short, long, default_value = DEFAULT_DETECT_MODEL)]
    pub model: String,

    /// Path to the pose estimation ONNX model
    #[arg(short = 'p', long, default_value = DEFAULT_POSE_MODEL)]
    pub pose_model: String,

    /// Confidence threshold for person detections
    #[arg(long, default_value_t = 0.25)]
    pub conf: f32,

    /// `IoU` threshold for NMS
    #[arg(long, default_value_t = 0.45)]
    pub iou: f32,

    /// Inference image size (square, e.g. 640)
    #[arg(long)]
    pub imgsz: Option<usize>,

    /// Use FP16 half-precision inference
    #[arg(long, default_value_t = false)]
    pub half: bool,

    /// Device for the detection model: auto, cpu, cuda[:N], coreml
    #[arg(short, long, default_value = "auto")]
    pub device: String,

    /// Device for the pose model
    #[arg(long, default_value = "cpu")]
    pub pose_device: String,

    /// Extra pixels of context around each person crop
    #[arg(long, default_value_t = 0)]
    pub crop_pad: u32,

    /// Keypoint confidence gate for verdicts and skeleton drawing
    #[arg(long, default_value_t = GazeThresholds::DEFAULT_KEYPOINT_CONFIDENCE)]
    pub kpt_conf: f32,

    /// Max eye level difference in pixels to count as looking
    #[arg(long, default_value_t = GazeThresholds::DEFAULT_MAX_EYE_LEVEL_DIFF)]
    pub eye_diff: f32,

    /// Max nose offset from the shoulder midline in pixels
    #[arg(long, default_value_t = GazeThresholds::DEFAULT_MAX_NOSE_OFFSET)]
    pub nose_offset: f32,

    /// Show verbose output
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub verbose: bool,
}
