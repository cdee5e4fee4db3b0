// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! ONNX model metadata parsing.
//!
//! Ultralytics ONNX exports carry their training configuration as custom
//! metadata properties in a YAML-ish format. Only the subset the pipeline
//! needs is parsed here (task, stride, input size, class names, keypoint
//! shape), with sane defaults when a property is missing. No YAML crate is
//! used; the format is line-oriented and small.

use std::collections::HashMap;

use crate::error::Result;

/// Metadata extracted from an ONNX model's custom properties.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMetadata {
    /// Model description, e.g. "Ultralytics YOLO11n-pose model".
    pub description: String,
    /// Model author.
    pub author: String,
    /// Exporting package version.
    pub version: String,
    /// Model license.
    pub license: String,
    /// Task string, e.g. "detect" or "pose".
    pub task: String,
    /// Maximum stride of the model. Input dimensions must be multiples.
    pub stride: u32,
    /// Expected input size as (height, width).
    pub imgsz: (usize, usize),
    /// Number of input channels.
    pub channels: usize,
    /// Whether the model was exported in FP16.
    pub half: bool,
    /// Class index to name mapping.
    pub names: HashMap<usize, String>,
    /// Keypoint layout for pose models as (count, dims), e.g. (17, 3).
    pub kpt_shape: Option<(usize, usize)>,
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            author: "Ultralytics".to_string(),
            version: String::new(),
            license: "AGPL-3.0".to_string(),
            task: "detect".to_string(),
            stride: 32,
            imgsz: (640, 640),
            channels: 3,
            half: false,
            names: HashMap::new(),
            kpt_shape: None,
        }
    }
}

impl ModelMetadata {
    /// Parse metadata from YAML-formatted text.
    ///
    /// Unknown keys are ignored and malformed values fall back to defaults,
    /// so a model with partial metadata still loads.
    ///
    /// # Errors
    ///
    /// Currently infallible; the `Result` keeps the signature stable for
    /// stricter validation.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut meta = Self::default();
        let lines: Vec<&str> = yaml.lines().collect();
        let mut i = 0;
        while i < lines.len() {
            let trimmed = lines[i].trim();
            i += 1;
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let Some((key, value)) = trimmed.split_once(':') else {
                continue;
            };
            let key = key.trim();
            let value = unquote(value.trim());
            match key {
                "description" => meta.description = value.to_string(),
                "author" => meta.author = value.to_string(),
                "version" => meta.version = value.to_string(),
                "license" => meta.license = value.to_string(),
                "task" => meta.task = value.to_string(),
                "stride" => {
                    if let Ok(stride) = value.parse() {
                        meta.stride = stride;
                    }
                }
                "channels" => {
                    if let Ok(channels) = value.parse() {
                        meta.channels = channels;
                    }
                }
                "half" => meta.half = matches!(value, "true" | "True"),
                "imgsz" => {
                    if value.is_empty() {
                        let (items, consumed) = collect_block_list(&lines[i..]);
                        i += consumed;
                        if let Some(pair) = size_pair(&items) {
                            meta.imgsz = pair;
                        }
                    } else if let Some(pair) = size_pair(&parse_inline_list(value)) {
                        meta.imgsz = pair;
                    }
                }
                "kpt_shape" => {
                    if let Some(pair) = size_pair(&parse_inline_list(value)) {
                        meta.kpt_shape = Some(pair);
                    }
                }
                "names" => {
                    if value.is_empty() {
                        let (names, consumed) = parse_names_block(&lines[i..]);
                        i += consumed;
                        meta.names = names;
                    } else {
                        meta.names = parse_python_dict(value);
                    }
                }
                _ => {}
            }
        }
        Ok(meta)
    }

    /// Number of classes the model predicts.
    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.names.len()
    }

    /// Name for a class index, if known.
    #[must_use]
    pub fn class_name(&self, index: usize) -> Option<&str> {
        self.names.get(&index).map(String::as_str)
    }
}

fn unquote(value: &str) -> &str {
    value.trim_matches('\'').trim_matches('"')
}

/// Parse `[640, 640]` or a bare `640` into a list of numbers.
fn parse_inline_list(value: &str) -> Vec<usize> {
    value
        .trim_matches(['[', ']'])
        .split(',')
        .filter_map(|item| item.trim().parse().ok())
        .collect()
}

/// A single number means a square size; two numbers are (height, width).
fn size_pair(items: &[usize]) -> Option<(usize, usize)> {
    match items {
        [side] => Some((*side, *side)),
        [height, width, ..] => Some((*height, *width)),
        [] => None,
    }
}

/// Collect a YAML block list (`- 640` lines) following the current line.
/// Returns the items and the number of lines consumed.
fn collect_block_list(lines: &[&str]) -> (Vec<usize>, usize) {
    let mut items = Vec::new();
    let mut consumed = 0;
    for line in lines {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix("- ") else {
            break;
        };
        consumed += 1;
        if let Ok(value) = rest.trim().parse() {
            items.push(value);
        }
    }
    (items, consumed)
}

/// Parse an indented `index: name` block following a bare `names:` line.
fn parse_names_block(lines: &[&str]) -> (HashMap<usize, String>, usize) {
    let mut names = HashMap::new();
    let mut consumed = 0;
    for line in lines {
        if !line.starts_with(' ') && !line.starts_with('\t') {
            break;
        }
        let trimmed = line.trim();
        let Some((index, name)) = trimmed.split_once(':') else {
            break;
        };
        let Ok(index) = index.trim().parse::<usize>() else {
            break;
        };
        consumed += 1;
        names.insert(index, unquote(name.trim()).to_string());
    }
    (names, consumed)
}

/// Parse a Python-style dict literal: `{0: 'person', 1: 'bicycle'}`.
///
/// Class names never contain commas, so splitting on them is safe.
fn parse_python_dict(value: &str) -> HashMap<usize, String> {
    let mut names = HashMap::new();
    for entry in value.trim_matches(['{', '}']).split(',') {
        let Some((index, name)) = entry.split_once(':') else {
            continue;
        };
        if let Ok(index) = index.trim().parse::<usize>() {
            names.insert(index, unquote(name.trim()).to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETECT_METADATA: &str = r"description: Ultralytics YOLO11n model trained on coco.yaml
author: Ultralytics
version: 8.3.0
license: AGPL-3.0 License (https://ultralytics.com/license)
stride: 32
task: detect
batch: 1
imgsz: [640, 640]
names: {0: 'person', 1: 'bicycle', 2: 'car'}
";

    const POSE_METADATA: &str = r"description: Ultralytics YOLO11n-pose model trained on coco-pose.yaml
author: Ultralytics
stride: 32
task: pose
imgsz: [640, 640]
kpt_shape: [17, 3]
names: {0: 'person'}
";

    #[test]
    fn test_parse_detect_metadata() {
        let meta = ModelMetadata::from_yaml_str(DETECT_METADATA).unwrap();
        assert_eq!(meta.task, "detect");
        assert_eq!(meta.stride, 32);
        assert_eq!(meta.imgsz, (640, 640));
        assert_eq!(meta.num_classes(), 3);
        assert_eq!(meta.class_name(0), Some("person"));
        assert_eq!(meta.class_name(2), Some("car"));
        assert_eq!(meta.kpt_shape, None);
        assert!(meta.description.contains("YOLO11n"));
    }

    #[test]
    fn test_parse_pose_metadata() {
        let meta = ModelMetadata::from_yaml_str(POSE_METADATA).unwrap();
        assert_eq!(meta.task, "pose");
        assert_eq!(meta.kpt_shape, Some((17, 3)));
        assert_eq!(meta.num_classes(), 1);
        assert_eq!(meta.class_name(0), Some("person"));
    }

    #[test]
    fn test_parse_imgsz_block_list() {
        let yaml = "imgsz:\n  - 480\n  - 640\ntask: detect\n";
        let meta = ModelMetadata::from_yaml_str(yaml).unwrap();
        assert_eq!(meta.imgsz, (480, 640));
        assert_eq!(meta.task, "detect");
    }

    #[test]
    fn test_parse_imgsz_single_value() {
        let yaml = "imgsz: 320\n";
        let meta = ModelMetadata::from_yaml_str(yaml).unwrap();
        assert_eq!(meta.imgsz, (320, 320));
    }

    #[test]
    fn test_parse_names_block() {
        let yaml = "names:\n  0: person\n  1: bicycle\n";
        let meta = ModelMetadata::from_yaml_str(yaml).unwrap();
        assert_eq!(meta.num_classes(), 2);
        assert_eq!(meta.class_name(1), Some("bicycle"));
    }

    #[test]
    fn test_defaults_for_missing_keys() {
        let meta = ModelMetadata::from_yaml_str("").unwrap();
        assert_eq!(meta, ModelMetadata::default());
        assert_eq!(meta.stride, 32);
        assert_eq!(meta.imgsz, (640, 640));
        assert_eq!(meta.author, "Ultralytics");
    }

    #[test]
    fn test_malformed_values_fall_back() {
        let yaml = "stride: many\nimgsz: wide\nhalf: maybe\n";
        let meta = ModelMetadata::from_yaml_str(yaml).unwrap();
        assert_eq!(meta.stride, 32);
        assert_eq!(meta.imgsz, (640, 640));
        assert!(!meta.half);
    }
}
