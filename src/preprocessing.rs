// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Image preprocessing for model inference.
//!
//! Frames and person crops are letterboxed onto a gray canvas, converted to
//! a normalized NCHW tensor, and the scale/padding used is carried along so
//! detections can be projected back into the source image afterwards.

use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use half::f16;
use image::RgbImage;
use ndarray::Array4;
use rayon::prelude::*;

use crate::error::{GazeError, Result};

/// Gray letterbox padding color used by YOLO models.
pub const LETTERBOX_COLOR: [u8; 3] = [114, 114, 114];

const LETTERBOX_FILL: f32 = 114.0 / 255.0;

/// A preprocessed image tensor plus everything needed to undo the transform.
#[derive(Debug, Clone)]
pub struct PreprocessResult {
    /// NCHW tensor normalized to [0, 1].
    pub tensor: Array4<f32>,
    /// FP16 copy of the tensor, present when half precision was requested.
    pub tensor_f16: Option<Array4<f16>>,
    /// Source image shape as (height, width).
    pub orig_shape: (u32, u32),
    /// Resize scale as (`scale_y`, `scale_x`).
    pub scale: (f32, f32),
    /// Letterbox padding as (`pad_top`, `pad_left`).
    pub padding: (f32, f32),
}

impl PreprocessResult {
    /// Tensor shape as (height, width).
    #[must_use]
    pub fn inference_shape(&self) -> (usize, usize) {
        let shape = self.tensor.shape();
        (shape[2], shape[3])
    }
}

/// Letterbox an image into an FP32 inference tensor.
///
/// # Arguments
///
/// * `img` - Source image.
/// * `imgsz` - Target tensor size as (height, width).
///
/// # Errors
///
/// Returns an error if the image is empty or the resize fails.
pub fn preprocess_image(img: &RgbImage, imgsz: (usize, usize)) -> Result<PreprocessResult> {
    preprocess_image_with_precision(img, imgsz, false)
}

/// Letterbox an image, optionally also producing an FP16 tensor.
///
/// # Errors
///
/// Returns an error if the image is empty or the resize fails.
#[allow(clippy::cast_precision_loss)]
pub fn preprocess_image_with_precision(
    img: &RgbImage,
    imgsz: (usize, usize),
    half: bool,
) -> Result<PreprocessResult> {
    let (orig_w, orig_h) = img.dimensions();
    if orig_w == 0 || orig_h == 0 {
        return Err(GazeError::ImageError(
            "cannot preprocess an empty image".to_string(),
        ));
    }

    let (new_w, new_h, pad_left, pad_top, scale) = calculate_letterbox_params(orig_w, orig_h, imgsz);

    let resized = if (new_w, new_h) == (orig_w, orig_h) {
        img.clone()
    } else {
        resize_bilinear(img, new_w, new_h)?
    };

    let tensor = letterbox_to_tensor(&resized, imgsz, pad_left as usize, pad_top as usize)?;
    let tensor_f16 = half.then(|| tensor_f32_to_f16(&tensor));

    Ok(PreprocessResult {
        tensor,
        tensor_f16,
        orig_shape: (orig_h, orig_w),
        scale,
        padding: (pad_top as f32, pad_left as f32),
    })
}

/// Compute letterbox geometry for fitting an image into a target size.
///
/// Returns `(new_w, new_h, pad_left, pad_top, (scale_y, scale_x))`. The
/// image is scaled by the limiting axis and centered, mirroring the training
/// letterbox so box geometry survives the round trip.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn calculate_letterbox_params(
    orig_w: u32,
    orig_h: u32,
    target: (usize, usize),
) -> (u32, u32, u32, u32, (f32, f32)) {
    let (target_h, target_w) = (target.0 as f32, target.1 as f32);
    let ratio = (target_h / orig_h as f32).min(target_w / orig_w as f32);

    let new_w = ((orig_w as f32 * ratio).round() as u32).clamp(1, target.1 as u32);
    let new_h = ((orig_h as f32 * ratio).round() as u32).clamp(1, target.0 as u32);

    let pad_left = (target.1 as u32 - new_w) / 2;
    let pad_top = (target.0 as u32 - new_h) / 2;

    let scale = (
        new_h as f32 / orig_h as f32,
        new_w as f32 / orig_w as f32,
    );
    (new_w, new_h, pad_left, pad_top, scale)
}

/// Bilinear resize through `fast_image_resize`.
fn resize_bilinear(img: &RgbImage, new_w: u32, new_h: u32) -> Result<RgbImage> {
    let (orig_w, orig_h) = img.dimensions();
    let src = Image::from_vec_u8(orig_w, orig_h, img.as_raw().clone(), PixelType::U8x3)
        .map_err(|e| GazeError::ImageError(format!("resize source: {e}")))?;
    let mut dst = Image::new(new_w, new_h, PixelType::U8x3);

    let mut resizer = Resizer::new();
    resizer
        .resize(
            &src,
            &mut dst,
            &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
        )
        .map_err(|e| GazeError::ImageError(format!("resize failed: {e}")))?;

    RgbImage::from_raw(new_w, new_h, dst.into_vec())
        .ok_or_else(|| GazeError::ImageError("resized buffer has the wrong size".to_string()))
}

/// Place a resized image onto the letterbox canvas as a normalized NCHW
/// tensor. Rows are filled in parallel; the padding stays at the gray fill.
fn letterbox_to_tensor(
    resized: &RgbImage,
    imgsz: (usize, usize),
    pad_left: usize,
    pad_top: usize,
) -> Result<Array4<f32>> {
    let (target_h, target_w) = imgsz;
    let (img_w, img_h) = resized.dimensions();
    let (img_w, img_h) = (img_w as usize, img_h as usize);
    let area = target_h * target_w;

    let mut data = vec![LETTERBOX_FILL; 3 * area];
    let (r_plane, rest) = data.split_at_mut(area);
    let (g_plane, b_plane) = rest.split_at_mut(area);

    let src = resized.as_raw();
    let row_bytes = img_w * 3;

    r_plane
        .par_chunks_mut(target_w)
        .skip(pad_top)
        .take(img_h)
        .zip(g_plane.par_chunks_mut(target_w).skip(pad_top).take(img_h))
        .zip(b_plane.par_chunks_mut(target_w).skip(pad_top).take(img_h))
        .enumerate()
        .for_each(|(y, ((r_row, g_row), b_row))| {
            let src_row = &src[y * row_bytes..(y + 1) * row_bytes];
            for (x, px) in src_row.chunks_exact(3).enumerate() {
                let xi = pad_left + x;
                r_row[xi] = f32::from(px[0]) / 255.0;
                g_row[xi] = f32::from(px[1]) / 255.0;
                b_row[xi] = f32::from(px[2]) / 255.0;
            }
        });

    Array4::from_shape_vec((1, 3, target_h, target_w), data)
        .map_err(|e| GazeError::ImageError(format!("tensor shape: {e}")))
}

/// Convert an FP32 tensor to FP16 for half-precision models.
#[must_use]
pub fn tensor_f32_to_f16(tensor: &Array4<f32>) -> Array4<f16> {
    tensor.mapv(f16::from_f32)
}

/// Map a box from inference-tensor space back to source-image space.
///
/// Padding is removed first, then the resize scale is undone.
#[must_use]
pub fn scale_coords(coords: &[f32; 4], scale: (f32, f32), padding: (f32, f32)) -> [f32; 4] {
    let (scale_y, scale_x) = scale;
    let (pad_top, pad_left) = padding;
    [
        (coords[0] - pad_left) / scale_x,
        (coords[1] - pad_top) / scale_y,
        (coords[2] - pad_left) / scale_x,
        (coords[3] - pad_top) / scale_y,
    ]
}

/// Clamp a box to the image bounds given as (height, width).
#[must_use]
pub const fn clip_coords(coords: [f32; 4], shape: (u32, u32)) -> [f32; 4] {
    #[allow(clippy::cast_precision_loss)]
    let (height, width) = (shape.0 as f32, shape.1 as f32);
    [
        clampf(coords[0], 0.0, width),
        clampf(coords[1], 0.0, height),
        clampf(coords[2], 0.0, width),
        clampf(coords[3], 0.0, height),
    ]
}

const fn clampf(value: f32, lo: f32, hi: f32) -> f32 {
    if value < lo {
        lo
    } else if value > hi {
        hi
    } else {
        value
    }
}
