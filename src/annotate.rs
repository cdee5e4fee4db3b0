// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Overlay rendering.
//!
//! [`Annotator`] draws detection boxes, pose skeletons, and verdict labels
//! onto a copy of the frame. Rendering degrades gracefully without a font:
//! boxes and skeletons still draw, text is skipped. A failed font download
//! never takes the pipeline down.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use ab_glyph::{FontRef, PxScale};
use image::RgbImage;
use imageproc::drawing::{
    draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut,
};
use imageproc::rect::Rect;

use crate::classifier::Verdict;
use crate::detector::{BoundingBox, PERSON_CLASS_ID};
use crate::keypoints::KeypointSet;
use crate::pipeline::Person;
use crate::visualizer::color::Color;
use crate::visualizer::skeleton::{KPT_COLOR_INDICES, LIMB_COLOR_INDICES, SKELETON};

/// Assets URL for downloading fonts.
const ASSETS_URL: &str = "https://github.com/ultralytics/assets/releases/download/v0.0.0";

/// Radius of keypoint markers in pixels.
const MARKER_RADIUS: i32 = 3;

/// Label text size.
const FONT_SIZE: f32 = 16.0;

/// Renders detection and pose overlays onto frames.
pub struct Annotator {
    font_data: Option<Vec<u8>>,
    keypoint_confidence: f32,
}

impl Annotator {
    /// Create an annotator, fetching Arial into the Ultralytics config
    /// directory on first use. Keypoints at or below
    /// `keypoint_confidence` are treated as invisible.
    #[must_use]
    pub fn new(keypoint_confidence: f32) -> Self {
        let font_data = check_font("Arial.ttf").and_then(|path| fs::read(path).ok());
        Self {
            font_data,
            keypoint_confidence,
        }
    }

    /// Whether label text can be rendered.
    #[must_use]
    pub const fn has_font(&self) -> bool {
        self.font_data.is_some()
    }

    /// Draw all persons onto a copy of `frame` and return it.
    ///
    /// The input frame is never modified. With no persons the result is a
    /// pixel-identical copy.
    #[must_use]
    pub fn annotate(&self, frame: &RgbImage, persons: &[Person]) -> RgbImage {
        let mut img = frame.clone();
        let font = self
            .font_data
            .as_deref()
            .and_then(|data| FontRef::try_from_slice(data).ok());

        for person in persons {
            draw_box(&mut img, &person.bbox);
            for set in &person.keypoints {
                self.draw_skeleton(&mut img, set);
            }
            if let Some(ref f) = font {
                draw_labels(&mut img, person, f);
            }
        }
        img
    }

    /// Draw skeleton limbs and keypoint markers for one keypoint set.
    ///
    /// A limb needs both endpoints above the confidence gate; a marker
    /// needs its own keypoint above it.
    #[allow(clippy::cast_possible_truncation)]
    fn draw_skeleton(&self, img: &mut RgbImage, set: &KeypointSet) {
        let points = set.points();

        for (edge, &color_idx) in SKELETON.iter().zip(LIMB_COLOR_INDICES.iter()) {
            let a = points[edge[0]];
            let b = points[edge[1]];
            if a.confidence <= self.keypoint_confidence || b.confidence <= self.keypoint_confidence
            {
                continue;
            }
            let color = Color::from_pose_index(color_idx).to_rgb();
            // Three parallel segments approximate a thicker line.
            for (dx, dy) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)] {
                draw_line_segment_mut(img, (a.x + dx, a.y + dy), (b.x + dx, b.y + dy), color);
            }
        }

        for (i, point) in points.iter().enumerate() {
            if point.confidence <= self.keypoint_confidence {
                continue;
            }
            let color = Color::from_pose_index(KPT_COLOR_INDICES[i]).to_rgb();
            let center = (point.x.round() as i32, point.y.round() as i32);
            draw_filled_circle_mut(img, center, MARKER_RADIUS, color);
        }
    }
}

/// Draw a bounding box with fixed 3px thickness.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn draw_box(img: &mut RgbImage, bbox: &BoundingBox) {
    let (width, height) = img.dimensions();

    let mut x1 = bbox.x1.round() as i32;
    let mut y1 = bbox.y1.round() as i32;
    let mut x2 = bbox.x2.round() as i32;
    let mut y2 = bbox.y2.round() as i32;
    if x1 > x2 {
        std::mem::swap(&mut x1, &mut x2);
    }
    if y1 > y2 {
        std::mem::swap(&mut y1, &mut y2);
    }
    x1 = x1.clamp(0, width as i32 - 1);
    y1 = y1.clamp(0, height as i32 - 1);
    x2 = x2.clamp(0, width as i32 - 1);
    y2 = y2.clamp(0, height as i32 - 1);
    if x2 <= x1 || y2 <= y1 {
        return;
    }

    let color = Color::from_index(PERSON_CLASS_ID).to_rgb();
    for t in 0..3 {
        let tx1 = (x1 + t).min(x2);
        let ty1 = (y1 + t).min(y2);
        let tx2 = (x2 - t).max(tx1);
        let ty2 = (y2 - t).max(ty1);
        if tx2 > tx1 && ty2 > ty1 {
            let rect = Rect::at(tx1, ty1).of_size((tx2 - tx1) as u32, (ty2 - ty1) as u32);
            draw_hollow_rect_mut(img, rect, color);
        }
    }
}

/// Draw the detection label above the box and the verdict inside it.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn draw_labels(img: &mut RgbImage, person: &Person, font: &FontRef<'_>) {
    let (width, height) = img.dimensions();
    let scale = PxScale::from(FONT_SIZE);

    let x1 = (person.bbox.x1.round() as i32).max(0);
    let y1 = (person.bbox.y1.round() as i32).max(0);
    let y2 = person.bbox.y2.round() as i32;

    let label = format!("person {:.2}", person.bbox.confidence);
    // Above the box when there is room, otherwise below it.
    let text_y = if y1 > 20 { y1 - 20 } else { y2 + 5 };
    if x1 < width as i32 && text_y >= 0 && text_y < height as i32 {
        let color = Color::from_index(PERSON_CLASS_ID).to_rgb();
        draw_text_mut(img, color, x1, text_y, scale, font, &label);
    }

    // No verdict means the face was not visible enough; draw nothing.
    if let Some(verdict) = person.verdict {
        let color = match verdict {
            Verdict::Looking => Color::GREEN,
            Verdict::NotLooking => Color::RED,
        };
        let tx = x1 + 4;
        let ty = y1 + 4;
        if tx < width as i32 && ty < height as i32 {
            draw_text_mut(img, color.to_rgb(), tx, ty, scale, font, verdict.label());
        }
    }
}

/// Check if a font exists in the Ultralytics config directory, downloading
/// it when missing. Returns `None` when neither works.
pub fn check_font(font: &str) -> Option<PathBuf> {
    let font_name = Path::new(font).file_name()?.to_string_lossy();
    let config_dir = dirs::config_dir()?.join("Ultralytics");
    let font_path = config_dir.join(font_name.as_ref());

    if font_path.exists() {
        return Some(font_path);
    }

    if let Err(e) = fs::create_dir_all(&config_dir) {
        eprintln!("Failed to create config directory: {e}");
        return None;
    }

    let url = format!("{ASSETS_URL}/{font_name}");
    println!("Downloading {url} to {}", font_path.display());

    match ureq::get(&url).call() {
        Ok(response) => {
            let mut file = match File::create(&font_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Failed to create font file: {e}");
                    return None;
                }
            };
            let mut reader = response.into_body().into_reader();
            if let Err(e) = io::copy(&mut reader, &mut file) {
                eprintln!("Failed to download font: {e}");
                let _ = fs::remove_file(&font_path);
                return None;
            }
            Some(font_path)
        }
        Err(e) => {
            eprintln!("Failed to download font from {url}: {e}");
            None
        }
    }
}
