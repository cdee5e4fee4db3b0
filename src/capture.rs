// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Frame acquisition.
//!
//! [`Capture`] opens a webcam device, video file, or network stream
//! through ffmpeg and yields RGB frames until the source ends. Failing to
//! open the source is fatal; a decode failure mid-stream is treated as
//! end of stream, never as an error.

#[cfg(feature = "video")]
use std::path::Path;
use std::path::PathBuf;
#[cfg(feature = "video")]
use std::sync::Once;

use image::RgbImage;

use crate::error::{GazeError, Result};
#[cfg(feature = "video")]
use crate::utils::array_to_image;

/// Schemes recognized as network streams.
const STREAM_PREFIXES: [&str; 6] = [
    "rtsp://", "rtmp://", "http://", "https://", "tcp://", "udp://",
];

/// Where frames come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureSource {
    /// A local camera device by index.
    Webcam(u32),
    /// A video file on disk.
    Video(PathBuf),
    /// A network stream (RTSP, RTMP, HTTP, TCP, UDP).
    Stream(String),
}

impl CaptureSource {
    /// The ffmpeg location string for this source.
    #[must_use]
    pub fn location(&self) -> PathBuf {
        match self {
            Self::Webcam(index) => PathBuf::from(format!("/dev/video{index}")),
            Self::Video(path) => path.clone(),
            Self::Stream(url) => PathBuf::from(url),
        }
    }

    /// Human-readable name for log lines.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Webcam(index) => format!("webcam {index}"),
            Self::Video(path) => format!("video {}", path.display()),
            Self::Stream(url) => format!("stream {url}"),
        }
    }
}

impl From<&str> for CaptureSource {
    /// Numeric strings select a webcam, URLs with a streaming scheme a
    /// network stream, anything else a video file.
    fn from(value: &str) -> Self {
        let trimmed = value.trim();
        if let Ok(index) = trimmed.parse::<u32>() {
            return Self::Webcam(index);
        }
        if STREAM_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
            return Self::Stream(trimmed.to_string());
        }
        Self::Video(PathBuf::from(trimmed))
    }
}

#[cfg(feature = "video")]
static VIDEO_INIT: Once = Once::new();

/// Check if a path is a still image based on extension.
#[cfg(feature = "video")]
fn is_image_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| {
        matches!(
            ext.to_string_lossy().to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "bmp" | "gif" | "webp" | "tiff" | "tif"
        )
    })
}

/// Initialize ffmpeg once per process and quiet its logging.
#[cfg(feature = "video")]
fn init_video() {
    VIDEO_INIT.call_once(|| {
        if let Err(e) = video_rs::init() {
            eprintln!("Failed to initialize video-rs: {e}");
        }

        #[cfg(feature = "ffmpeg-next")]
        ffmpeg_next::log::set_level(ffmpeg_next::log::Level::Error);
    });
}

/// Sequential frame reader over a capture source.
#[cfg(feature = "video")]
pub struct Capture {
    decoder: video_rs::decode::Decoder,
    source: CaptureSource,
    frame_idx: usize,
    fps: f32,
    total_frames: Option<usize>,
}

#[cfg(feature = "video")]
impl Capture {
    /// Open a source for reading.
    ///
    /// Still-image paths are refused; this reader watches streams, it does
    /// not run single-image inference.
    ///
    /// # Errors
    ///
    /// Returns [`GazeError::CaptureUnavailable`] when the device, file, or
    /// stream cannot be opened. This is the fatal startup error; callers
    /// exit rather than retry.
    pub fn open(source: CaptureSource) -> Result<Self> {
        if let CaptureSource::Video(path) = &source
            && is_image_path(path)
        {
            return Err(GazeError::CaptureUnavailable(format!(
                "{} is a still image; use a webcam index, video file, or stream URL",
                path.display()
            )));
        }

        init_video();

        let location = source.location();
        let decoder = video_rs::decode::Decoder::new(location.as_path()).map_err(|e| {
            GazeError::CaptureUnavailable(format!("cannot open {}: {e}", source.describe()))
        })?;

        let fps = decoder.frame_rate();
        // Only files have a meaningful duration; live sources run until quit.
        let total_frames = if matches!(source, CaptureSource::Video(_)) {
            decoder.duration().ok().map(|duration| {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                {
                    (duration.as_secs_f64() * f64::from(fps)) as usize
                }
            })
        } else {
            None
        };

        Ok(Self {
            decoder,
            source,
            frame_idx: 0,
            fps,
            total_frames,
        })
    }

    /// Read the next frame.
    ///
    /// `Ok(None)` signals end of stream: the file ran out, the camera was
    /// unplugged, or the stream dropped. Decode errors after a successful
    /// open are folded into end of stream so a finished video and a dead
    /// camera both stop the loop cleanly.
    ///
    /// # Errors
    ///
    /// Returns [`GazeError::VideoError`] only when a decoded frame cannot
    /// be converted to an RGB image.
    pub fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        match self.decoder.decode() {
            Ok((_ts, frame)) => {
                self.frame_idx += 1;
                let img = array_to_image(&frame)
                    .map_err(|e| GazeError::VideoError(format!("bad frame data: {e}")))?;
                Ok(Some(img))
            }
            Err(_) => Ok(None),
        }
    }

    /// Frames read so far.
    #[must_use]
    pub const fn frame_index(&self) -> usize {
        self.frame_idx
    }

    /// Frame rate reported by the demuxer.
    #[must_use]
    pub const fn fps(&self) -> f32 {
        self.fps
    }

    /// Total frame count, known only for video files.
    #[must_use]
    pub const fn total_frames(&self) -> Option<usize> {
        self.total_frames
    }

    /// The source this capture reads from.
    #[must_use]
    pub const fn source(&self) -> &CaptureSource {
        &self.source
    }
}

/// Sequential frame reader over a capture source.
#[cfg(not(feature = "video"))]
pub struct Capture {
    source: CaptureSource,
}

#[cfg(not(feature = "video"))]
impl Capture {
    /// Open a source for reading.
    ///
    /// # Errors
    ///
    /// Always fails; frame capture requires the `video` feature.
    pub fn open(source: CaptureSource) -> Result<Self> {
        let _ = source;
        Err(GazeError::FeatureNotEnabled(
            "frame capture requires the 'video' feature".to_string(),
        ))
    }

    /// Read the next frame.
    ///
    /// # Errors
    ///
    /// Never fails in this stub.
    pub fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        Ok(None)
    }

    /// Frames read so far.
    #[must_use]
    pub const fn frame_index(&self) -> usize {
        0
    }

    /// Frame rate reported by the demuxer.
    #[must_use]
    pub const fn fps(&self) -> f32 {
        0.0
    }

    /// Total frame count, known only for video files.
    #[must_use]
    pub const fn total_frames(&self) -> Option<usize> {
        None
    }

    /// The source this capture reads from.
    #[must_use]
    pub const fn source(&self) -> &CaptureSource {
        &self.source
    }
}
