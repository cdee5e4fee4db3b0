// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Shared helpers: box overlap, non-maximum suppression, frame conversion,
//! and summary-text formatting.

use image::RgbImage;
use ndarray::Array3;

use crate::error::{GazeError, Result};

/// Intersection over Union between two `[x1, y1, x2, y2]` boxes.
#[must_use]
pub fn calculate_iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if intersection <= 0.0 {
        return 0.0;
    }

    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    let union = area_a + area_b - intersection;
    if union <= 0.0 { 0.0 } else { intersection / union }
}

/// Class-aware non-maximum suppression.
///
/// Candidates are `(box, score, class)` tuples. Returns the indices of the
/// kept candidates, highest score first. Boxes only suppress others of the
/// same class, so overlapping detections of different classes survive.
#[must_use]
pub fn nms_per_class(candidates: &[([f32; 4], f32, usize)], iou_threshold: f32) -> Vec<usize> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| {
        candidates[b]
            .1
            .partial_cmp(&candidates[a].1)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut suppressed = vec![false; candidates.len()];
    let mut keep = Vec::new();

    for (rank, &idx) in order.iter().enumerate() {
        if suppressed[idx] {
            continue;
        }
        keep.push(idx);

        let (bbox, _, class) = candidates[idx];
        for &other in &order[rank + 1..] {
            if suppressed[other] || candidates[other].2 != class {
                continue;
            }
            if calculate_iou(&bbox, &candidates[other].0) > iou_threshold {
                suppressed[other] = true;
            }
        }
    }
    keep
}

/// Convert an HWC u8 array (such as a decoded video frame) to an image.
///
/// # Errors
///
/// Returns an error if the array is not 3-channel or its dimensions exceed
/// image limits.
pub fn array_to_image(array: &Array3<u8>) -> Result<RgbImage> {
    let (height, width, channels) = array.dim();
    if channels != 3 {
        return Err(GazeError::ImageError(format!(
            "expected a 3-channel array, got {channels} channels"
        )));
    }
    let width_u32 = u32::try_from(width)
        .map_err(|_| GazeError::ImageError("array width exceeds u32::MAX".to_string()))?;
    let height_u32 = u32::try_from(height)
        .map_err(|_| GazeError::ImageError("array height exceeds u32::MAX".to_string()))?;

    // Decoded frames are contiguous; the fallback copies element-wise.
    let data = array
        .as_slice()
        .map_or_else(|| array.iter().copied().collect(), <[u8]>::to_vec);

    RgbImage::from_raw(width_u32, height_u32, data)
        .ok_or_else(|| GazeError::ImageError("array size does not match its shape".to_string()))
}

/// Naive English pluralization for class names in summaries.
#[must_use]
pub fn pluralize(name: &str, count: usize) -> String {
    if count == 1 {
        return name.to_string();
    }
    match name {
        "mouse" => "mice".to_string(),
        "sheep" | "skis" | "scissors" => name.to_string(),
        _ if name.ends_with("fe") => format!("{}ves", &name[..name.len() - 2]),
        _ if name.ends_with('f') => format!("{}ves", &name[..name.len() - 1]),
        _ if name.ends_with('y')
            && !name.ends_with("ay")
            && !name.ends_with("ey")
            && !name.ends_with("oy")
            && !name.ends_with("uy") =>
        {
            format!("{}ies", &name[..name.len() - 1])
        }
        _ if name.ends_with('s')
            || name.ends_with('x')
            || name.ends_with('z')
            || name.ends_with("ch")
            || name.ends_with("sh") =>
        {
            format!("{name}es")
        }
        _ => format!("{name}s"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iou_partial_overlap() {
        let a = [0.0, 0.0, 10.0, 10.0];
        let b = [5.0, 5.0, 15.0, 15.0];
        // intersection 25, union 175
        assert!((calculate_iou(&a, &b) - 25.0 / 175.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_no_overlap() {
        let a = [0.0, 0.0, 10.0, 10.0];
        let b = [20.0, 20.0, 30.0, 30.0];
        assert!(calculate_iou(&a, &b).abs() < f32::EPSILON);
    }

    #[test]
    fn test_iou_identical() {
        let a = [0.0, 0.0, 10.0, 10.0];
        assert!((calculate_iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_same_class_overlap() {
        let candidates = vec![
            ([0.0, 0.0, 10.0, 10.0], 0.9, 0),
            ([1.0, 1.0, 11.0, 11.0], 0.8, 0),
            ([50.0, 50.0, 60.0, 60.0], 0.7, 0),
        ];
        let keep = nms_per_class(&candidates, 0.45);
        assert_eq!(keep, vec![0, 2]);
    }

    #[test]
    fn test_nms_keeps_cross_class_overlap() {
        let candidates = vec![
            ([0.0, 0.0, 10.0, 10.0], 0.9, 0),
            ([1.0, 1.0, 11.0, 11.0], 0.8, 1),
        ];
        let keep = nms_per_class(&candidates, 0.45);
        assert_eq!(keep.len(), 2);
    }

    #[test]
    fn test_nms_orders_by_score() {
        let candidates = vec![
            ([0.0, 0.0, 10.0, 10.0], 0.5, 0),
            ([100.0, 100.0, 110.0, 110.0], 0.9, 0),
        ];
        let keep = nms_per_class(&candidates, 0.45);
        assert_eq!(keep, vec![1, 0]);
    }

    #[test]
    fn test_array_to_image() {
        let array = Array3::<u8>::from_shape_fn((2, 3, 3), |(y, x, c)| (y * 10 + x + c) as u8);
        let img = array_to_image(&array).unwrap();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(2, 1)[0], 12);
    }

    #[test]
    fn test_array_to_image_rejects_wrong_channels() {
        let array = Array3::<u8>::zeros((2, 2, 4));
        assert!(array_to_image(&array).is_err());
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("person", 1), "person");
        assert_eq!(pluralize("person", 2), "persons");
        assert_eq!(pluralize("bus", 3), "buses");
        assert_eq!(pluralize("knife", 2), "knives");
        assert_eq!(pluralize("mouse", 2), "mice");
        assert_eq!(pluralize("sheep", 4), "sheep");
        assert_eq!(pluralize("teddy", 2), "teddies");
        assert_eq!(pluralize("boy", 2), "boys");
    }
}
