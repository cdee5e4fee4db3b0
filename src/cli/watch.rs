// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::Path;

#[cfg(feature = "visualize")]
use crate::annotate::Annotator;
#[cfg(feature = "visualize")]
use crate::visualizer::Viewer;

use crate::cli::args::WatchArgs;
use crate::cli::logging::set_verbose;
use crate::utils::pluralize;
use crate::{
    Capture, CaptureSource, Detector, Device, GazeError, GazePipeline, GazeThresholds,
    InferenceConfig, Joint, Model, Person, PoseEstimator, Result, Speed, VERSION, Verdict,
};
use crate::{info, verbose, warn};

#[cfg(feature = "visualize")]
const WINDOW_TITLE: &str = "Pose Estimation & Gaze Check";

/// Watch a source and report who is looking at the screen, frame by frame.
///
/// # Errors
///
/// Returns an error when a model cannot be loaded, the source cannot be
/// opened, or a non-recoverable pipeline failure occurs. Detection and
/// pose failures on individual frames are logged and skipped.
#[allow(
    clippy::too_many_lines,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]
pub fn run_watch(args: &WatchArgs) -> Result<()> {
    set_verbose(args.verbose);

    let device: Device = args
        .device
        .parse()
        .map_err(|e: crate::device::DeviceParseError| GazeError::ConfigError(e.to_string()))?;
    let pose_device: Device = args
        .pose_device
        .parse()
        .map_err(|e: crate::device::DeviceParseError| GazeError::ConfigError(e.to_string()))?;

    let thresholds = GazeThresholds::new()
        .with_keypoint_confidence(args.kpt_conf)
        .with_max_eye_level_diff(args.eye_diff)
        .with_max_nose_offset(args.nose_offset);

    let mut detect_config = InferenceConfig::new()
        .with_confidence(args.conf)
        .with_iou(args.iou)
        .with_half(args.half)
        .with_device(device);
    let mut pose_config = InferenceConfig::new()
        .with_confidence(args.conf)
        .with_iou(args.iou)
        .with_half(args.half)
        .with_device(pose_device);
    if let Some(sz) = args.imgsz {
        detect_config = detect_config.with_imgsz(sz, sz);
        pose_config = pose_config.with_imgsz(sz, sz);
    }

    ensure_model(&args.model)?;
    ensure_model(&args.pose_model)?;

    let detector = Detector::new(Model::load_with_config(&args.model, detect_config)?)?;
    let pose = PoseEstimator::new(Model::load_with_config(&args.pose_model, pose_config)?)?;

    let is_half = detector.model().metadata().half || args.half;
    let precision = if is_half { "FP16" } else { "FP32" };
    println!(
        "Ultralytics GazeCheck {VERSION} 🚀 Rust ONNX {precision} {}",
        detector.model().execution_provider()
    );

    let detect_imgsz = detector.model().imgsz();
    verbose!(
        "detector summary: {} classes, imgsz=({}, {}), {}",
        detector.model().num_classes(),
        detect_imgsz.0,
        detect_imgsz.1,
        detector.model().execution_provider()
    );
    let pose_imgsz = pose.model().imgsz();
    verbose!(
        "pose summary: {} keypoints, imgsz=({}, {}), {}",
        Joint::COUNT,
        pose_imgsz.0,
        pose_imgsz.1,
        pose.model().execution_provider()
    );
    verbose!("");

    let mut pipeline =
        GazePipeline::new(detector, pose, thresholds).with_crop_padding(args.crop_pad);
    pipeline.warmup()?;

    #[cfg(feature = "visualize")]
    let annotator = Annotator::new(args.kpt_conf);
    #[cfg(feature = "visualize")]
    if !annotator.has_font() {
        warn!("Label font unavailable, drawing boxes and skeletons only.");
    }
    #[cfg(not(feature = "visualize"))]
    warn!("Built without the 'visualize' feature, frames will not be displayed.");

    let source = CaptureSource::from(args.source.as_str());
    let source_name = source.describe();
    let mut capture = Capture::open(source)?;

    #[cfg(feature = "visualize")]
    info!("Press 'q' or Escape to quit");

    #[cfg(feature = "visualize")]
    let mut viewer: Option<Viewer> = None;

    let mut frames: usize = 0;
    let mut total_speed = Speed::new(0.0, 0.0);

    while let Some(frame) = capture.read_frame()? {
        let persons = match pipeline.process_frame(&frame) {
            Ok(persons) => persons,
            Err(e)
                if matches!(
                    e,
                    GazeError::DetectionFailure(_) | GazeError::EstimationFailure(_)
                ) =>
            {
                warn!("Skipping frame {}: {e}", capture.frame_index());
                continue;
            }
            Err(e) => return Err(e),
        };

        let total_frames_str = capture
            .total_frames()
            .map_or_else(|| "?".to_string(), |n| n.to_string());
        verbose!(
            "frame {}/{} {}: {}x{} {}, {:.1}ms",
            capture.frame_index(),
            total_frames_str,
            source_name,
            frame.width(),
            frame.height(),
            format_person_summary(&persons),
            pipeline.last_speed().inference
        );

        #[cfg(feature = "visualize")]
        {
            let annotated = annotator.annotate(&frame, &persons);

            if viewer.is_none() {
                viewer = Some(Viewer::new(
                    WINDOW_TITLE,
                    annotated.width() as usize,
                    annotated.height() as usize,
                )?);
            }
            if let Some(ref mut v) = viewer
                && !v.update(&annotated)?
            {
                break;
            }
        }

        frames += 1;
        total_speed.accumulate(pipeline.last_speed());
    }

    let num_frames = frames.max(1) as f64;
    verbose!(
        "Speed: {:.1}ms preprocess, {:.1}ms inference, {:.1}ms postprocess per frame at shape (1, 3, {}, {})",
        total_speed.preprocess / num_frames,
        total_speed.inference / num_frames,
        total_speed.postprocess.unwrap_or(0.0) / num_frames,
        detect_imgsz.0,
        detect_imgsz.1
    );
    info!("Watched {frames} frames from {source_name}");
    verbose!("💡 Learn more at https://docs.ultralytics.com/tasks/pose");

    Ok(())
}

/// Download a model when the path does not exist locally.
fn ensure_model(path: &str) -> Result<()> {
    if Path::new(path).exists() {
        Ok(())
    } else {
        crate::download::try_download_model(path)
    }
}

/// Format a per-frame verdict summary like "2 persons, 1 looking, 1 not looking".
fn format_person_summary(persons: &[Person]) -> String {
    if persons.is_empty() {
        return "(no persons)".to_string();
    }

    let looking = persons
        .iter()
        .filter(|p| p.verdict == Some(Verdict::Looking))
        .count();
    let not_looking = persons
        .iter()
        .filter(|p| p.verdict == Some(Verdict::NotLooking))
        .count();
    let unknown = persons.len() - looking - not_looking;

    let count = persons.len();
    let noun = pluralize("person", count);
    let mut parts = vec![
        format!("{count} {noun}"),
        format!("{looking} looking"),
        format!("{not_looking} not looking"),
    ];
    if unknown > 0 {
        parts.push(format!("{unknown} unknown"));
    }
    parts.join(", ")
}
