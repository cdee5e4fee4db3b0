// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Decoding of raw model output tensors.
//!
//! YOLO detection output is `[1, 4+nc, N]` (some exports transpose the last
//! two axes); pose output adds 17 `[x, y, conf]` triplets per prediction.
//! Decoding filters by confidence, maps coordinates back into source-image
//! space, and applies class-aware NMS. Everything leaves this module as a
//! typed [`Prediction`].

use std::collections::HashMap;

use ndarray::{Array2, Array3, ArrayView1, s};

use crate::config::InferenceConfig;
use crate::error::{GazeError, Result};
use crate::preprocessing::{PreprocessResult, clip_coords, scale_coords};
use crate::results::{Boxes, Keypoints, Prediction, Speed};
use crate::task::Task;
use crate::utils::nms_per_class;

/// Keypoints per person in COCO pose models.
pub const NUM_KEYPOINTS: usize = 17;

const KPT_DIM: usize = 3;
const KPT_FEATURES: usize = NUM_KEYPOINTS * KPT_DIM;
const BOX_FEATURES: usize = 4;

/// Decode raw model outputs into a [`Prediction`].
///
/// Timing in the returned prediction is zeroed; the model fills it in.
///
/// # Errors
///
/// Returns [`GazeError::PostProcessingError`] when the output tensor shape
/// does not match the task.
pub fn postprocess(
    outputs: Vec<(Vec<f32>, Vec<usize>)>,
    task: Task,
    pre: &PreprocessResult,
    config: &InferenceConfig,
    names: &HashMap<usize, String>,
) -> Result<Prediction> {
    let Some((data, shape)) = outputs.into_iter().next() else {
        return Err(GazeError::PostProcessingError(
            "model produced no outputs".to_string(),
        ));
    };
    match task {
        Task::Detect => decode_detect(data, &shape, pre, config, names),
        Task::Pose => decode_pose(data, &shape, pre, config, names),
    }
}

fn decode_detect(
    data: Vec<f32>,
    shape: &[usize],
    pre: &PreprocessResult,
    config: &InferenceConfig,
    names: &HashMap<usize, String>,
) -> Result<Prediction> {
    let preds = prediction_matrix(data, shape, BOX_FEATURES + names.len())?;
    let num_features = preds.ncols();
    if num_features < BOX_FEATURES + 1 {
        return Err(GazeError::PostProcessingError(format!(
            "detection output has {num_features} features per prediction, need at least 5"
        )));
    }

    let mut candidates = Vec::new();
    for row in preds.outer_iter() {
        let (class_idx, score) = best_class(&row.slice(s![BOX_FEATURES..]));
        if score < config.confidence_threshold {
            continue;
        }
        let bbox = xywh_to_xyxy(row[0], row[1], row[2], row[3]);
        let bbox = clip_coords(scale_coords(&bbox, pre.scale, pre.padding), pre.orig_shape);
        candidates.push((bbox, score, class_idx));
    }

    let kept: Vec<usize> = nms_per_class(&candidates, config.iou_threshold)
        .into_iter()
        .take(config.max_detections)
        .collect();

    let boxes_data = boxes_array(&candidates, &kept);
    Ok(Prediction::new(
        Some(Boxes::new(boxes_data, pre.orig_shape)),
        None,
        Speed::default(),
        pre.orig_shape,
        pre.inference_shape(),
        names.clone(),
    ))
}

fn decode_pose(
    data: Vec<f32>,
    shape: &[usize],
    pre: &PreprocessResult,
    config: &InferenceConfig,
    names: &HashMap<usize, String>,
) -> Result<Prediction> {
    let expected = BOX_FEATURES + names.len().max(1) + KPT_FEATURES;
    let preds = prediction_matrix(data, shape, expected)?;
    let num_features = preds.ncols();
    if num_features < BOX_FEATURES + 1 + KPT_FEATURES {
        return Err(GazeError::PostProcessingError(format!(
            "pose output has {num_features} features per prediction, need at least {}",
            BOX_FEATURES + 1 + KPT_FEATURES
        )));
    }
    // Class count is derived from the tensor, not the metadata, so models
    // with missing names still decode.
    let num_classes = num_features - BOX_FEATURES - KPT_FEATURES;
    let kpt_start = BOX_FEATURES + num_classes;

    #[allow(clippy::cast_precision_loss)]
    let (orig_h_f, orig_w_f) = (pre.orig_shape.0 as f32, pre.orig_shape.1 as f32);

    let mut candidates = Vec::new();
    let mut keypoint_rows: Vec<[[f32; KPT_DIM]; NUM_KEYPOINTS]> = Vec::new();
    for row in preds.outer_iter() {
        let (class_idx, score) = best_class(&row.slice(s![BOX_FEATURES..kpt_start]));
        if score < config.confidence_threshold {
            continue;
        }
        let bbox = xywh_to_xyxy(row[0], row[1], row[2], row[3]);
        let bbox = clip_coords(scale_coords(&bbox, pre.scale, pre.padding), pre.orig_shape);

        let mut kpts = [[0.0; KPT_DIM]; NUM_KEYPOINTS];
        for (k, kpt) in kpts.iter_mut().enumerate() {
            let kx = row[kpt_start + k * KPT_DIM];
            let ky = row[kpt_start + k * KPT_DIM + 1];
            let kconf = row[kpt_start + k * KPT_DIM + 2];
            let scaled = scale_coords(&[kx, ky, kx, ky], pre.scale, pre.padding);
            *kpt = [
                scaled[0].clamp(0.0, orig_w_f),
                scaled[1].clamp(0.0, orig_h_f),
                kconf,
            ];
        }

        candidates.push((bbox, score, class_idx));
        keypoint_rows.push(kpts);
    }

    let kept: Vec<usize> = nms_per_class(&candidates, config.iou_threshold)
        .into_iter()
        .take(config.max_detections)
        .collect();

    let boxes_data = boxes_array(&candidates, &kept);
    let mut kpts_data = Array3::zeros((kept.len(), NUM_KEYPOINTS, KPT_DIM));
    for (i, &idx) in kept.iter().enumerate() {
        for (k, kpt) in keypoint_rows[idx].iter().enumerate() {
            kpts_data[[i, k, 0]] = kpt[0];
            kpts_data[[i, k, 1]] = kpt[1];
            kpts_data[[i, k, 2]] = kpt[2];
        }
    }

    Ok(Prediction::new(
        Some(Boxes::new(boxes_data, pre.orig_shape)),
        Some(Keypoints::new(kpts_data, pre.orig_shape)),
        Speed::default(),
        pre.orig_shape,
        pre.inference_shape(),
        names.clone(),
    ))
}

/// Reshape a raw output into a (predictions, features) matrix.
///
/// Handles both `[1, features, N]` and `[1, N, features]` layouts. When the
/// expected feature count matches neither axis (metadata without names), the
/// smaller axis is taken as features since predictions vastly outnumber them.
fn prediction_matrix(
    data: Vec<f32>,
    shape: &[usize],
    expected_features: usize,
) -> Result<Array2<f32>> {
    let (a, b) = match shape {
        [1, a, b] | [a, b] => (*a, *b),
        other => {
            return Err(GazeError::PostProcessingError(format!(
                "unexpected output shape {other:?}"
            )));
        }
    };

    let matrix = Array2::from_shape_vec((a, b), data).map_err(|e| {
        GazeError::PostProcessingError(format!("output data does not fit shape ({a}, {b}): {e}"))
    })?;

    let features_first = if a == expected_features {
        true
    } else if b == expected_features {
        false
    } else {
        a <= b
    };

    Ok(if features_first {
        matrix.t().to_owned()
    } else {
        matrix
    })
}

/// Highest class score and its index. NaN scores are never selected.
fn best_class(scores: &ArrayView1<'_, f32>) -> (usize, f32) {
    let mut best_idx = 0;
    let mut best = f32::NEG_INFINITY;
    for (i, &score) in scores.iter().enumerate() {
        if score > best {
            best = score;
            best_idx = i;
        }
    }
    if best.is_finite() {
        (best_idx, best)
    } else {
        (0, 0.0)
    }
}

const fn xywh_to_xyxy(cx: f32, cy: f32, w: f32, h: f32) -> [f32; 4] {
    [
        cx - w / 2.0,
        cy - h / 2.0,
        cx + w / 2.0,
        cy + h / 2.0,
    ]
}

#[allow(clippy::cast_precision_loss)]
fn boxes_array(candidates: &[([f32; 4], f32, usize)], kept: &[usize]) -> Array2<f32> {
    let mut data = Array2::zeros((kept.len(), 6));
    for (i, &idx) in kept.iter().enumerate() {
        let (bbox, score, class_idx) = candidates[idx];
        data[[i, 0]] = bbox[0];
        data[[i, 1]] = bbox[1];
        data[[i, 2]] = bbox[2];
        data[[i, 3]] = bbox[3];
        data[[i, 4]] = score;
        data[[i, 5]] = class_idx as f32;
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    fn identity_preprocess(orig_shape: (u32, u32)) -> PreprocessResult {
        PreprocessResult {
            tensor: Array4::zeros((1, 3, 640, 640)),
            tensor_f16: None,
            orig_shape,
            scale: (1.0, 1.0),
            padding: (0.0, 0.0),
        }
    }

    fn two_class_names() -> HashMap<usize, String> {
        let mut names = HashMap::new();
        names.insert(0, "person".to_string());
        names.insert(1, "bicycle".to_string());
        names
    }

    /// Flatten logical (predictions, features) rows into a features-first
    /// tensor layout, as YOLO exports emit.
    fn features_first_data(rows: &[Vec<f32>]) -> (Vec<f32>, Vec<usize>) {
        let num_preds = rows.len();
        let num_features = rows[0].len();
        let mut data = vec![0.0; num_preds * num_features];
        for (p, row) in rows.iter().enumerate() {
            for (f, &value) in row.iter().enumerate() {
                data[f * num_preds + p] = value;
            }
        }
        (data, vec![1, num_features, num_preds])
    }

    #[test]
    fn test_decode_detect_features_first() {
        let rows = vec![
            vec![320.0, 240.0, 100.0, 200.0, 0.9, 0.1],
            vec![321.0, 241.0, 100.0, 200.0, 0.8, 0.1], // suppressed by NMS
            vec![100.0, 100.0, 50.0, 50.0, 0.05, 0.6],
        ];
        let (data, shape) = features_first_data(&rows);
        let pre = identity_preprocess((640, 640));
        let config = InferenceConfig::new();

        let prediction = postprocess(
            vec![(data, shape)],
            Task::Detect,
            &pre,
            &config,
            &two_class_names(),
        )
        .unwrap();

        let boxes = prediction.boxes.unwrap();
        assert_eq!(boxes.len(), 2);
        // Highest score first.
        assert!((boxes.conf()[0] - 0.9).abs() < 1e-6);
        assert_eq!(boxes.cls()[0], 0.0);
        assert_eq!(boxes.cls()[1], 1.0);
        // xywh converted to corners.
        assert!((boxes.xyxy()[[0, 0]] - 270.0).abs() < 1e-4);
        assert!((boxes.xyxy()[[0, 1]] - 140.0).abs() < 1e-4);
        assert!((boxes.xyxy()[[0, 2]] - 370.0).abs() < 1e-4);
        assert!((boxes.xyxy()[[0, 3]] - 340.0).abs() < 1e-4);
    }

    #[test]
    fn test_decode_detect_predictions_first() {
        let rows = [
            [320.0, 240.0, 100.0, 200.0, 0.9, 0.1],
            [100.0, 100.0, 50.0, 50.0, 0.05, 0.6],
        ];
        let data: Vec<f32> = rows.iter().flatten().copied().collect();
        let shape = vec![1, 2, 6];
        let pre = identity_preprocess((640, 640));
        let config = InferenceConfig::new();

        let prediction = postprocess(
            vec![(data, shape)],
            Task::Detect,
            &pre,
            &config,
            &two_class_names(),
        )
        .unwrap();
        assert_eq!(prediction.len(), 2);
    }

    #[test]
    fn test_decode_detect_confidence_filter() {
        let rows = vec![vec![320.0, 240.0, 100.0, 200.0, 0.1, 0.05]];
        let (data, shape) = features_first_data(&rows);
        let pre = identity_preprocess((640, 640));
        let config = InferenceConfig::new().with_confidence(0.5);

        let prediction = postprocess(
            vec![(data, shape)],
            Task::Detect,
            &pre,
            &config,
            &two_class_names(),
        )
        .unwrap();
        assert!(prediction.is_empty());
        assert_eq!(prediction.verbose(), "(no detections), ");
    }

    #[test]
    fn test_decode_detect_clips_to_image() {
        let rows = vec![vec![10.0, 10.0, 100.0, 100.0, 0.9, 0.0]];
        let (data, shape) = features_first_data(&rows);
        let pre = identity_preprocess((480, 640));
        let config = InferenceConfig::new();

        let prediction = postprocess(
            vec![(data, shape)],
            Task::Detect,
            &pre,
            &config,
            &two_class_names(),
        )
        .unwrap();
        let boxes = prediction.boxes.unwrap();
        assert_eq!(boxes.xyxy()[[0, 0]], 0.0);
        assert_eq!(boxes.xyxy()[[0, 1]], 0.0);
    }

    #[test]
    fn test_decode_pose_keypoints() {
        let mut row = vec![320.0, 240.0, 100.0, 200.0, 0.9];
        for k in 0..NUM_KEYPOINTS {
            #[allow(clippy::cast_precision_loss)]
            row.extend_from_slice(&[k as f32 * 10.0 + 5.0, k as f32 * 20.0 + 3.0, 0.8]);
        }
        let rows = vec![row];
        let (data, shape) = features_first_data(&rows);
        assert_eq!(shape, vec![1, 56, 1]);

        let mut names = HashMap::new();
        names.insert(0, "person".to_string());
        let pre = identity_preprocess((640, 640));
        let config = InferenceConfig::new();

        let prediction =
            postprocess(vec![(data, shape)], Task::Pose, &pre, &config, &names).unwrap();

        let keypoints = prediction.keypoints.unwrap();
        assert_eq!(keypoints.len(), 1);
        assert_eq!(keypoints.xy().dim(), (1, NUM_KEYPOINTS, 2));
        let conf = keypoints.conf().unwrap();
        assert!((conf[[0, 0]] - 0.8).abs() < 1e-6);
        // Keypoint 3 at (35, 63).
        assert!((keypoints.xy()[[0, 3, 0]] - 35.0).abs() < 1e-4);
        assert!((keypoints.xy()[[0, 3, 1]] - 63.0).abs() < 1e-4);

        let boxes = prediction.boxes.unwrap();
        assert_eq!(boxes.len(), 1);
    }

    #[test]
    fn test_decode_pose_scales_keypoints() {
        let mut row = vec![320.0, 240.0, 100.0, 200.0, 0.9];
        for _ in 0..NUM_KEYPOINTS {
            row.extend_from_slice(&[100.0, 50.0, 0.7]);
        }
        let rows = vec![row];
        let (data, shape) = features_first_data(&rows);

        let mut names = HashMap::new();
        names.insert(0, "person".to_string());
        let pre = PreprocessResult {
            tensor: Array4::zeros((1, 3, 640, 640)),
            tensor_f16: None,
            orig_shape: (480, 640),
            scale: (0.5, 0.5),
            padding: (10.0, 20.0),
        };
        let config = InferenceConfig::new();

        let prediction =
            postprocess(vec![(data, shape)], Task::Pose, &pre, &config, &names).unwrap();
        let keypoints = prediction.keypoints.unwrap();
        // (100 - 20) / 0.5 = 160, (50 - 10) / 0.5 = 80
        assert!((keypoints.xy()[[0, 0, 0]] - 160.0).abs() < 1e-4);
        assert!((keypoints.xy()[[0, 0, 1]] - 80.0).abs() < 1e-4);
    }

    #[test]
    fn test_decode_pose_empty() {
        let mut row = vec![320.0, 240.0, 100.0, 200.0, 0.01];
        for _ in 0..NUM_KEYPOINTS {
            row.extend_from_slice(&[0.0, 0.0, 0.0]);
        }
        let (data, shape) = features_first_data(&[row]);

        let mut names = HashMap::new();
        names.insert(0, "person".to_string());
        let pre = identity_preprocess((640, 640));
        let config = InferenceConfig::new();

        let prediction =
            postprocess(vec![(data, shape)], Task::Pose, &pre, &config, &names).unwrap();
        assert!(prediction.is_empty());
        let keypoints = prediction.keypoints.unwrap();
        assert!(keypoints.is_empty());
    }

    #[test]
    fn test_rejects_bad_shape() {
        let pre = identity_preprocess((640, 640));
        let config = InferenceConfig::new();
        let result = postprocess(
            vec![(vec![0.0; 12], vec![2, 2, 3])],
            Task::Detect,
            &pre,
            &config,
            &HashMap::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_empty_outputs() {
        let pre = identity_preprocess((640, 640));
        let config = InferenceConfig::new();
        assert!(postprocess(Vec::new(), Task::Detect, &pre, &config, &HashMap::new()).is_err());
    }

    #[test]
    fn test_best_class_ignores_nan() {
        let scores = ndarray::array![0.2, f32::NAN, 0.5];
        let (idx, score) = best_class(&scores.view());
        assert_eq!(idx, 2);
        assert!((score - 0.5).abs() < 1e-6);
    }
}
