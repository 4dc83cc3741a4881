//! Backend whose graph exports the estimation layers as named outputs.
//!
//! Each image is resized to `image_size`², then the centered `crop_size`²
//! window is taken before the batch is run. `prob`, `encode1` and
//! `encode1neuron` come straight out of the graph.

use std::path::Path;

use ndarray::{Array3, Array4, ArrayD};

use crate::config::ModelConfig;
use crate::error::ExtractError;
use crate::normalize::NormalizedImage;

use super::preprocess::{center_crop, resize, to_network_input};
use super::session::OnnxSession;
use super::FeatureExtractor;

/// Classifier-style ONNX backend.
pub struct ClassifierExtractor {
    session: OnnxSession,
    image_size: u32,
    crop_size: u32,
    mean: [f32; 3],
}

impl ClassifierExtractor {
    /// Load the model at `model_path` with the preprocessing from `config`.
    pub fn load(config: &ModelConfig, model_path: &Path) -> Result<Self, ExtractError> {
        tracing::info!("Loading classifier backend from {:?}", model_path);
        let session = OnnxSession::load(model_path)?;
        Ok(Self {
            session,
            image_size: config.image_size,
            crop_size: config.crop_size,
            mean: config.mean,
        })
    }
}

/// Resize, center-crop and stack a batch into the network's input tensor.
pub(crate) fn prepare(
    images: &[NormalizedImage],
    image_size: u32,
    crop_size: u32,
    mean: [f32; 3],
) -> Result<Array4<f32>, ExtractError> {
    let cropped = images
        .iter()
        .map(|img| center_crop(resize(img.view(), image_size, image_size)?, crop_size))
        .collect::<Result<Vec<Array3<f32>>, _>>()?;
    to_network_input(&cropped, mean)
}

impl FeatureExtractor for ClassifierExtractor {
    fn extract(
        &self,
        images: &[NormalizedImage],
        layer: &str,
    ) -> Result<ArrayD<f32>, ExtractError> {
        let batch = prepare(images, self.image_size, self.crop_size, self.mean)?;
        tracing::debug!(
            "Running classifier backend: {} image(s), layer {:?}",
            images.len(),
            layer
        );
        self.session.run(batch, layer)
    }
}
