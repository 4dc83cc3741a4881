//! ONNX Runtime session shared by the inference backends.
//!
//! Loads an exported illustration2vec graph and runs a preprocessed NCHW
//! batch through it, returning one named output.

use std::path::Path;
use std::sync::Mutex;

use ndarray::{Array4, ArrayD, IxDyn};
use ort::session::Session;
use ort::value::Value;

use crate::error::ExtractError;

/// Wraps an ONNX Runtime session.
///
/// Uses a `Mutex` because `Session::run` requires `&mut self`.
pub struct OnnxSession {
    session: Mutex<Session>,
    /// Name of the input tensor (detected from model metadata).
    input_name: String,
    /// Names of every output the graph exposes.
    output_names: Vec<String>,
}

impl OnnxSession {
    /// Load a model from an ONNX file.
    pub fn load(model_path: &Path) -> Result<Self, ExtractError> {
        if !model_path.exists() {
            return Err(ExtractError::Model {
                path: model_path.to_path_buf(),
                message: "Model not found. Check `general.model_dir` and `model.model_file`."
                    .to_string(),
            });
        }

        let session = Session::builder()
            .map_err(|e| ExtractError::Model {
                path: model_path.to_path_buf(),
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(model_path)
            .map_err(|e| ExtractError::Model {
                path: model_path.to_path_buf(),
                message: format!("Failed to load ONNX model: {e}"),
            })?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .unwrap_or_else(|| "data".to_string());
        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();

        tracing::debug!(
            "Loaded ONNX model from {:?} (input: {:?}, outputs: {:?})",
            model_path,
            input_name,
            output_names
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_names,
        })
    }

    /// Run a batch through the graph and return the output named `layer`.
    ///
    /// Input shape: \[N, 3, H, W\], BGR, mean-subtracted.
    pub fn run(&self, batch: Array4<f32>, layer: &str) -> Result<ArrayD<f32>, ExtractError> {
        if !self.output_names.iter().any(|n| n == layer) {
            return Err(ExtractError::UnknownLayer {
                layer: layer.to_string(),
                available: self.output_names.clone(),
            });
        }

        let inference_err = |message: String| ExtractError::Inference {
            layer: layer.to_string(),
            message,
        };

        let shape: Vec<i64> = batch.shape().iter().map(|&d| d as i64).collect();
        let flat_data: Vec<f32> = batch.iter().copied().collect();

        let input_value = Value::from_array((shape, flat_data))
            .map_err(|e| inference_err(format!("Failed to create input tensor: {e}")))?;

        let inputs = ort::inputs![self.input_name.as_str() => input_value];

        let mut session = self
            .session
            .lock()
            .map_err(|e| inference_err(format!("Session lock poisoned: {e}")))?;

        let outputs = session
            .run(inputs)
            .map_err(|e| inference_err(format!("ONNX inference failed: {e}")))?;

        let output = outputs
            .iter()
            .find(|(name, _)| *name == layer)
            .ok_or_else(|| inference_err("Model did not produce the layer".to_string()))?;

        let (shape, data) = output
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e| inference_err(format!("Failed to extract tensor: {e}")))?;

        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec())
            .map_err(|e| inference_err(format!("Output shape {dims:?} does not match data: {e}")))
    }
}
