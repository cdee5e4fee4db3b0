// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Automatic model fetching.
//!
//! The default detection and pose checkpoints are pulled from Ultralytics
//! GitHub release assets when they are missing locally. Downloads stream to
//! a `.part` temp file and rename into place, so an interrupted transfer
//! never leaves a truncated model behind.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use crate::error::{GazeError, Result};

/// Default detection model filename.
pub const DEFAULT_DETECT_MODEL: &str = "yolo11n.onnx";

/// Default pose estimation model filename.
pub const DEFAULT_POSE_MODEL: &str = "yolo11n-pose.onnx";

/// Release tag hosting the downloadable checkpoints.
const GITHUB_ASSETS_URL: &str =
    "https://github.com/ultralytics/assets/releases/download/v8.3.0";

/// Connection timeout in seconds.
const CONNECT_TIMEOUT: u64 = 30;

/// Body read timeout in seconds.
const READ_TIMEOUT: u64 = 300;

/// Progress bar width in characters.
const BAR_WIDTH: usize = 12;

/// Minimum seconds between progress redraws.
const MIN_UPDATE_INTERVAL: f64 = 0.1;

/// Download a known model to `model_path` if its filename matches one of
/// the downloadable checkpoints.
///
/// # Errors
///
/// Returns [`GazeError::ModelLoadError`] for filenames with no hosted
/// download, or [`GazeError::IoError`] when the transfer fails.
pub fn try_download_model<P: AsRef<Path>>(model_path: P) -> Result<()> {
    let path = model_path.as_ref();
    let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

    if filename != DEFAULT_DETECT_MODEL && filename != DEFAULT_POSE_MODEL {
        return Err(GazeError::ModelLoadError(format!(
            "model file not found: {}. Auto-download is supported for: {DEFAULT_DETECT_MODEL}, {DEFAULT_POSE_MODEL}",
            path.display()
        )));
    }

    let url = format!("{GITHUB_ASSETS_URL}/{filename}");
    download_file(&url, path)
}

/// Stream a URL to `dest` with a progress bar on stderr.
fn download_file(url: &str, dest: &Path) -> Result<()> {
    let config = ureq::Agent::config_builder()
        .timeout_connect(Some(Duration::from_secs(CONNECT_TIMEOUT)))
        .timeout_recv_body(Some(Duration::from_secs(READ_TIMEOUT)))
        .build();
    let agent = ureq::Agent::new_with_config(config);

    let response = agent.get(url).call().map_err(|e| {
        GazeError::IoError(match &e {
            ureq::Error::Timeout(_) => format!("connection timed out while downloading {url}"),
            ureq::Error::Io(io_err) => format!("network error downloading {url}: {io_err}"),
            _ => format!("failed to download {url}: {e}"),
        })
    })?;

    let total_size: u64 = response
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    // Stream to a sibling temp file, then rename into place.
    let temp_path = dest.with_extension("part");
    let _ = fs::remove_file(&temp_path);
    let temp_file = File::create(&temp_path).map_err(|e| {
        GazeError::IoError(format!("failed to create {}: {e}", temp_path.display()))
    })?;

    let desc = format!("Downloading {url} to '{}'", dest.display());
    let start = Instant::now();
    let result = stream_with_progress(
        &mut response.into_body().into_reader(),
        &mut BufWriter::new(temp_file),
        total_size,
        &desc,
        start,
    );

    let downloaded = match result {
        Ok(n) => n,
        Err(e) => {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
    };

    print_final_progress(&desc, downloaded, total_size, start.elapsed().as_secs_f64());

    fs::rename(&temp_path, dest).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        GazeError::IoError(format!(
            "failed to move downloaded file to {}: {e}",
            dest.display()
        ))
    })
}

/// Copy `reader` to `writer`, redrawing the progress line at most every
/// [`MIN_UPDATE_INTERVAL`]. Returns the byte count written.
fn stream_with_progress(
    reader: &mut impl Read,
    writer: &mut impl Write,
    total_size: u64,
    desc: &str,
    start: Instant,
) -> Result<u64> {
    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; 65536];
    let mut last_update = Instant::now();

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| GazeError::IoError(format!("failed to read from network: {e}")))?;
        if bytes_read == 0 {
            break;
        }
        writer
            .write_all(&buffer[..bytes_read])
            .map_err(|e| GazeError::IoError(format!("failed to write temp file: {e}")))?;
        downloaded += bytes_read as u64;

        let now = Instant::now();
        if now.duration_since(last_update).as_secs_f64() < MIN_UPDATE_INTERVAL {
            continue;
        }
        last_update = now;
        print_progress(desc, downloaded, total_size, start.elapsed().as_secs_f64());
    }

    writer
        .flush()
        .map_err(|e| GazeError::IoError(format!("failed to flush temp file: {e}")))?;
    Ok(downloaded)
}

fn print_progress(desc: &str, downloaded: u64, total_size: u64, elapsed: f64) {
    let rate = if elapsed > 0.0 {
        downloaded as f64 / elapsed
    } else {
        0.0
    };

    if total_size > 0 {
        let progress = (downloaded as f64 / total_size as f64).min(1.0);
        let percent = (progress * 100.0) as u8;
        eprint!(
            "\r\x1b[K{desc}: {percent}% {} {}/{} {}/s {}",
            generate_bar(progress, BAR_WIDTH),
            format_bytes(downloaded as f64),
            format_bytes(total_size as f64),
            format_bytes(rate),
            format_time(elapsed)
        );
    } else {
        eprint!(
            "\r\x1b[K{desc}: {} {}/s {}",
            format_bytes(downloaded as f64),
            format_bytes(rate),
            format_time(elapsed)
        );
    }
    let _ = std::io::stderr().flush();
}

fn print_final_progress(desc: &str, downloaded: u64, total_size: u64, elapsed: f64) {
    let rate = if elapsed > 0.0 {
        downloaded as f64 / elapsed
    } else {
        0.0
    };

    if total_size > 0 {
        eprintln!(
            "\r\x1b[K{desc}: 100% {} {} {}/s {}",
            generate_bar(1.0, BAR_WIDTH),
            format_bytes(total_size as f64),
            format_bytes(rate),
            format_time(elapsed)
        );
    } else {
        eprintln!(
            "\r\x1b[K{desc}: {} {}/s {}",
            format_bytes(downloaded as f64),
            format_bytes(rate),
            format_time(elapsed)
        );
    }
}

/// Human-readable byte count, e.g. "10.4MB".
fn format_bytes(bytes: f64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    if bytes >= GB {
        format!("{:.1}GB", bytes / GB)
    } else if bytes >= MB {
        format!("{:.1}MB", bytes / MB)
    } else if bytes >= KB {
        format!("{:.1}KB", bytes / KB)
    } else {
        format!("{bytes:.0}B")
    }
}

/// Elapsed time as "5.5s", "1:05.0", or "1:01:05.0".
fn format_time(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("{seconds:.1}s")
    } else if seconds < 3600.0 {
        let mins = (seconds / 60.0) as u32;
        let secs = seconds % 60.0;
        format!("{mins}:{secs:04.1}")
    } else {
        let hours = (seconds / 3600.0) as u32;
        let mins = ((seconds % 3600.0) / 60.0) as u32;
        let secs = seconds % 60.0;
        format!("{hours}:{mins:02}:{secs:04.1}")
    }
}

/// Progress bar string of `width` characters for `progress` in [0, 1].
fn generate_bar(progress: f64, width: usize) -> String {
    let filled = (progress * width as f64) as usize;
    let partial = progress * width as f64 - filled as f64;

    let mut bar = "━".repeat(filled);
    if filled < width {
        if partial > 0.5 {
            bar.push('╸');
            bar.push_str(&"─".repeat(width - filled - 1));
        } else {
            bar.push_str(&"─".repeat(width - filled));
        }
    }
    bar
}
