//! WD tagger ONNX session and the predictor seam used by the runner.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::DynamicImage;
use ort::session::Session;
use ort::value::Value;

use super::preprocess::preprocess;
use crate::error::PipelineError;

/// ONNX model file inside a tagger directory.
pub const MODEL_FILENAME: &str = "model.onnx";

/// Tag catalog file inside a tagger directory.
pub const CATALOG_FILENAME: &str = "selected_tags.csv";

/// Produces a probability vector aligned to the tag catalog.
pub trait TagPredictor: Send + Sync {
    fn predict(&self, image: &DynamicImage, path: &Path) -> Result<Vec<f32>, PipelineError>;
}

/// Wraps an ONNX Runtime session for a WD tagger.
///
/// Uses a `Mutex` because `Session::run` requires `&mut self`.
pub struct WdTagger {
    session: Mutex<Session>,
    input_name: String,
    image_size: u32,
    expected_len: usize,
}

impl WdTagger {
    /// Load a tagger from `model.onnx`.
    ///
    /// The input size is read from the model's `[1, S, S, 3]` input;
    /// `fallback_size` is used only when that dimension is dynamic.
    /// `expected_len` is the catalog length; outputs of any other length are
    /// rejected per image.
    pub fn load(
        model_path: &Path,
        fallback_size: u32,
        expected_len: usize,
    ) -> Result<Self, PipelineError> {
        if !model_path.exists() {
            return Err(PipelineError::ModelNotFound {
                path: model_path.to_path_buf(),
            });
        }

        let session = Session::builder()
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(model_path)
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to load ONNX model {model_path:?}: {e}"),
            })?;

        let first_input = session.inputs().first();
        let input_name = first_input
            .map(|i| i.name().to_string())
            .unwrap_or_else(|| "input".to_string());
        let input_dims: Vec<i64> = first_input
            .and_then(|i| i.dtype().tensor_shape())
            .map(|shape| shape.to_vec())
            .unwrap_or_default();
        let image_size = model_input_size(&input_dims, fallback_size);

        tracing::debug!(
            "Loaded tagger from {:?} (input: {:?} {:?}, size {}, outputs: {:?})",
            model_path,
            input_name,
            input_dims,
            image_size,
            session
                .outputs()
                .iter()
                .map(|o| o.name())
                .collect::<Vec<_>>()
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            image_size,
            expected_len,
        })
    }

    /// Paths of the model and catalog inside a tagger directory.
    pub fn files(tagger_dir: &Path) -> (PathBuf, PathBuf) {
        (
            tagger_dir.join(MODEL_FILENAME),
            tagger_dir.join(CATALOG_FILENAME),
        )
    }
}

/// Square input size from an NHWC input shape, or `fallback` when the
/// spatial dimension is dynamic or missing.
fn model_input_size(dims: &[i64], fallback: u32) -> u32 {
    match dims.get(1) {
        Some(&size) if size > 0 => u32::try_from(size).unwrap_or(fallback),
        _ => fallback,
    }
}

impl TagPredictor for WdTagger {
    fn predict(&self, image: &DynamicImage, path: &Path) -> Result<Vec<f32>, PipelineError> {
        let tagging_err = |message: String| PipelineError::Tagging {
            path: path.to_path_buf(),
            message,
        };

        let tensor = preprocess(image, self.image_size);
        let shape: Vec<i64> = tensor.shape().iter().map(|&d| d as i64).collect();
        let flat_data: Vec<f32> = tensor.iter().copied().collect();

        let input_value = Value::from_array((shape, flat_data))
            .map_err(|e| tagging_err(format!("Failed to create input tensor: {e}")))?;
        let inputs = ort::inputs![self.input_name.as_str() => input_value];

        let mut session = self.session.lock().map_err(|e| PipelineError::Model {
            message: format!("Session lock poisoned: {e}"),
        })?;

        let outputs = session
            .run(inputs)
            .map_err(|e| tagging_err(format!("ONNX inference failed: {e}")))?;

        let (_, output) = outputs
            .iter()
            .next()
            .ok_or_else(|| tagging_err("Model produced no outputs".to_string()))?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| tagging_err(format!("Failed to extract output tensor: {e}")))?;

        // Output is [1, N]; take the single row.
        let len = shape.last().copied().unwrap_or(0).max(0) as usize;
        if len != self.expected_len || data.len() < len {
            return Err(tagging_err(format!(
                "Model output has {} scores, catalog has {} tags",
                len, self.expected_len
            )));
        }
        Ok(data[..len].to_vec())
    }
}
