// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! ONNX model loading and inference.
//!
//! [`Model`] wraps an ONNX Runtime session together with the metadata
//! embedded in Ultralytics exports (task, class names, input size). It is
//! task-agnostic; [`crate::detector::Detector`] and
//! [`crate::pose::PoseEstimator`] layer the task-specific semantics on top.

use std::fmt::Write as _;
use std::path::Path;
use std::time::Instant;

use half::f16;
use image::RgbImage;
use ndarray::Array4;
#[cfg(feature = "coreml")]
use ort::execution_providers::CoreMLExecutionProvider;
#[cfg(feature = "cuda")]
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::value::TensorRef;

use crate::config::InferenceConfig;
use crate::device::Device;
use crate::error::{GazeError, Result};
use crate::metadata::ModelMetadata;
use crate::postprocessing::postprocess;
use crate::preprocessing::preprocess_image_with_precision;
use crate::results::{Prediction, Speed};
use crate::task::Task;

/// A loaded ONNX model ready for inference.
///
/// # Example
///
/// ```no_run
/// use gazecheck::Model;
///
/// let mut model = Model::load("yolo11n.onnx")?;
/// let img = image::open("people.jpg")?.to_rgb8();
/// let prediction = model.predict_image(&img)?;
/// println!("{} detections", prediction.len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Model {
    /// ONNX Runtime session.
    session: Session,
    /// Metadata extracted from the model file.
    metadata: ModelMetadata,
    /// Task parsed from the metadata.
    task: Task,
    /// Input tensor name.
    input_name: String,
    /// Output tensor names.
    output_names: Vec<String>,
    /// Inference configuration.
    config: InferenceConfig,
    /// Whether a warmup pass has been run.
    warmed_up: bool,
}

impl Model {
    /// Load a model from an ONNX file with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist, the session cannot be
    /// created, or the model's task is not supported.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_config(path, InferenceConfig::default())
    }

    /// Load a model from an ONNX file with custom configuration.
    ///
    /// Class names, task, and input size are read from the ONNX custom
    /// metadata that Ultralytics exports embed. The configured device
    /// selects the execution provider; accelerated devices require the
    /// matching cargo feature (`cuda`, `coreml`).
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist, the session cannot be
    /// created, or the model's task is not supported.
    pub fn load_with_config<P: AsRef<Path>>(path: P, config: InferenceConfig) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(GazeError::ModelLoadError(format!(
                "model file not found: {}",
                path.display()
            )));
        }

        let builder = Session::builder().map_err(|e| {
            GazeError::ModelLoadError(format!("failed to create session builder: {e}"))
        })?;
        let builder = apply_execution_providers(builder, config.device)?;

        let mut builder = builder
            // Level3 enables extended graph optimizations
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| {
                GazeError::ModelLoadError(format!("failed to set optimization level: {e}"))
            })?;
        if config.num_threads > 0 {
            builder = builder.with_intra_threads(config.num_threads).map_err(|e| {
                GazeError::ModelLoadError(format!("failed to set intra-thread count: {e}"))
            })?;
        }
        let session = builder
            .commit_from_file(path)
            .map_err(|e| GazeError::ModelLoadError(format!("failed to load model: {e}")))?;

        let metadata = Self::extract_metadata(&session)?;
        let task = metadata
            .task
            .parse::<Task>()
            .map_err(|e| GazeError::ModelLoadError(format!("unsupported model task: {e}")))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "images".to_string());
        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();

        // Model metadata fills in whatever the caller left unset.
        let config = InferenceConfig {
            imgsz: config.imgsz.or(Some(metadata.imgsz)),
            ..config
        };

        Ok(Self {
            session,
            metadata,
            task,
            input_name,
            output_names,
            config,
            warmed_up: false,
        })
    }

    /// Run a dummy inference to pre-allocate memory and finalize the
    /// execution graph. Called automatically on first predict.
    ///
    /// # Errors
    ///
    /// Returns an error if the warmup inference fails.
    pub fn warmup(&mut self) -> Result<()> {
        if self.warmed_up {
            return Ok(());
        }

        let (height, width) = self.config.imgsz.unwrap_or(self.metadata.imgsz);
        let channels = self.metadata.channels;
        if self.config.half {
            let dummy = Array4::<f16>::zeros((1, channels, height, width));
            let _ = self.run_inference_f16(&dummy)?;
        } else {
            let dummy = Array4::<f32>::zeros((1, channels, height, width));
            let _ = self.run_inference(&dummy)?;
        }

        self.warmed_up = true;
        Ok(())
    }

    /// Extract Ultralytics metadata from the session.
    ///
    /// Exports store each field under its own custom key; the fields are
    /// re-joined into a YAML document and parsed. Missing metadata falls
    /// back to defaults.
    fn extract_metadata(session: &Session) -> Result<ModelMetadata> {
        let model_metadata = session
            .metadata()
            .map_err(|e| GazeError::MetadataError(format!("failed to read model metadata: {e}")))?;

        let keys = [
            "description",
            "author",
            "date",
            "version",
            "license",
            "docs",
            "stride",
            "task",
            "batch",
            "imgsz",
            "names",
            "half",
            "channels",
            "kpt_shape",
        ];

        let mut yaml = String::new();
        for key in &keys {
            if let Ok(Some(value)) = model_metadata.custom(key) {
                let _ = writeln!(yaml, "{key}: {value}");
            }
        }

        if yaml.is_empty() {
            return Ok(ModelMetadata::default());
        }
        ModelMetadata::from_yaml_str(&yaml)
    }

    /// Run inference on an RGB image and decode the result.
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing, inference, or output decoding
    /// fails.
    pub fn predict_image(&mut self, img: &RgbImage) -> Result<Prediction> {
        if !self.warmed_up {
            self.warmup()?;
        }

        let target_size = self.config.imgsz.unwrap_or(self.metadata.imgsz);

        let start_preprocess = Instant::now();
        let pre = preprocess_image_with_precision(img, target_size, self.config.half)?;
        let preprocess_time = start_preprocess.elapsed().as_secs_f64() * 1000.0;

        let start_inference = Instant::now();
        let outputs = match &pre.tensor_f16 {
            Some(tensor) => self.run_inference_f16(tensor)?,
            None => self.run_inference(&pre.tensor)?,
        };
        let inference_time = start_inference.elapsed().as_secs_f64() * 1000.0;

        let start_postprocess = Instant::now();
        let mut prediction =
            postprocess(outputs, self.task, &pre, &self.config, &self.metadata.names)?;
        prediction.speed = Speed::new(preprocess_time, inference_time);
        prediction.speed.postprocess = Some(start_postprocess.elapsed().as_secs_f64() * 1000.0);

        Ok(prediction)
    }

    /// Run the session on an f32 input tensor.
    #[allow(clippy::cast_sign_loss)]
    fn run_inference(&mut self, input: &Array4<f32>) -> Result<Vec<(Vec<f32>, Vec<usize>)>> {
        let input_contiguous = input.as_standard_layout();
        let input_tensor = TensorRef::from_array_view(&input_contiguous)
            .map_err(|e| GazeError::InferenceError(format!("failed to create input tensor: {e}")))?;

        let inputs = ort::inputs![self.input_name.as_str() => input_tensor];
        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| GazeError::InferenceError(format!("inference failed: {e}")))?;

        let mut extracted = Vec::with_capacity(self.output_names.len());
        for name in &self.output_names {
            let output = outputs.get(name.as_str()).ok_or_else(|| {
                GazeError::InferenceError(format!("output '{name}' not found"))
            })?;
            let (shape, data) = output.try_extract_tensor::<f32>().map_err(|e| {
                GazeError::InferenceError(format!("failed to extract output '{name}': {e}"))
            })?;
            let shape_vec: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
            extracted.push((data.to_vec(), shape_vec));
        }
        Ok(extracted)
    }

    /// Run the session on an f16 input tensor.
    ///
    /// Half-precision exports may emit either f16 or f32 outputs depending
    /// on the export settings, so both are attempted.
    #[allow(clippy::cast_sign_loss)]
    fn run_inference_f16(&mut self, input: &Array4<f16>) -> Result<Vec<(Vec<f32>, Vec<usize>)>> {
        let input_contiguous = input.as_standard_layout();
        let input_tensor = TensorRef::from_array_view(&input_contiguous)
            .map_err(|e| GazeError::InferenceError(format!("failed to create input tensor: {e}")))?;

        let inputs = ort::inputs![self.input_name.as_str() => input_tensor];
        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| GazeError::InferenceError(format!("inference failed: {e}")))?;

        let mut extracted = Vec::with_capacity(self.output_names.len());
        for name in &self.output_names {
            let output = outputs.get(name.as_str()).ok_or_else(|| {
                GazeError::InferenceError(format!("output '{name}' not found"))
            })?;
            let (data, shape_vec) = if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
                let shape_vec: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
                (data.to_vec(), shape_vec)
            } else {
                let (shape, data) = output.try_extract_tensor::<f16>().map_err(|e| {
                    GazeError::InferenceError(format!("failed to extract output '{name}': {e}"))
                })?;
                let shape_vec: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
                (data.iter().map(|v| v.to_f32()).collect(), shape_vec)
            };
            extracted.push((data, shape_vec));
        }
        Ok(extracted)
    }

    /// The model's task type.
    #[must_use]
    pub const fn task(&self) -> Task {
        self.task
    }

    /// The model's class names.
    #[must_use]
    pub fn names(&self) -> &std::collections::HashMap<usize, String> {
        &self.metadata.names
    }

    /// The number of classes.
    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.metadata.num_classes()
    }

    /// The model's input size as (height, width).
    #[must_use]
    pub const fn imgsz(&self) -> (usize, usize) {
        match self.config.imgsz {
            Some(size) => size,
            None => self.metadata.imgsz,
        }
    }

    /// The model metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// The effective inference configuration.
    #[must_use]
    pub const fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Name of the execution provider the configured device maps to.
    #[must_use]
    pub const fn execution_provider(&self) -> &'static str {
        match self.config.device {
            Device::Cpu => "CPU",
            Device::Cuda(_) => "CUDA",
            Device::CoreMl => "CoreML",
            Device::Auto => {
                if cfg!(feature = "cuda") {
                    "CUDA"
                } else if cfg!(feature = "coreml") {
                    "CoreML"
                } else {
                    "CPU"
                }
            }
        }
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("task", &self.task)
            .field("num_classes", &self.metadata.num_classes())
            .field("imgsz", &self.imgsz())
            .field("device", &self.config.device)
            .finish_non_exhaustive()
    }
}

/// Register execution providers for the requested device.
///
/// `Auto` registers every accelerator compiled in and lets ONNX Runtime
/// fall back to CPU. Explicit accelerated devices error when their feature
/// is not compiled in, rather than silently running on CPU.
fn apply_execution_providers(builder: SessionBuilder, device: Device) -> Result<SessionBuilder> {
    match device {
        Device::Cpu => Ok(builder),
        #[cfg(feature = "cuda")]
        Device::Cuda(index) => builder
            .with_execution_providers([CUDAExecutionProvider::default()
                .with_device_id(i32::try_from(index).unwrap_or(0))
                .build()])
            .map_err(|e| GazeError::ModelLoadError(format!("failed to register CUDA EP: {e}"))),
        #[cfg(not(feature = "cuda"))]
        Device::Cuda(_) => Err(GazeError::FeatureNotEnabled(
            "device 'cuda' requires building with the 'cuda' feature".to_string(),
        )),
        #[cfg(feature = "coreml")]
        Device::CoreMl => builder
            .with_execution_providers([CoreMLExecutionProvider::default()
                // Enable on subgraphs for better coverage
                .with_subgraphs(true)
                .build()])
            .map_err(|e| GazeError::ModelLoadError(format!("failed to register CoreML EP: {e}"))),
        #[cfg(not(feature = "coreml"))]
        Device::CoreMl => Err(GazeError::FeatureNotEnabled(
            "device 'coreml' requires building with the 'coreml' feature".to_string(),
        )),
        Device::Auto => {
            #[allow(unused_mut)]
            let mut builder = builder;
            #[cfg(feature = "cuda")]
            {
                builder = builder
                    .with_execution_providers([CUDAExecutionProvider::default().build()])
                    .map_err(|e| {
                        GazeError::ModelLoadError(format!("failed to register CUDA EP: {e}"))
                    })?;
            }
            #[cfg(feature = "coreml")]
            {
                builder = builder
                    .with_execution_providers([CoreMLExecutionProvider::default()
                        .with_subgraphs(true)
                        .build()])
                    .map_err(|e| {
                        GazeError::ModelLoadError(format!("failed to register CoreML EP: {e}"))
                    })?;
            }
            Ok(builder)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_not_found() {
        let result = Model::load("nonexistent.onnx");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, GazeError::ModelLoadError(_)));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_cpu_device_requires_no_feature() {
        let builder = Session::builder();
        if let Ok(builder) = builder {
            assert!(apply_execution_providers(builder, Device::Cpu).is_ok());
        }
    }
}
