//! Backend that runs the raw converted graph and builds the estimation
//! layers on the host.
//!
//! The converted network exposes its internal layers (`conv6_4`, `encode1`,
//! ...) but not the heads, so:
//! - `prob` is `sigmoid(avg_pool_7x7(conv6_4))`
//! - `encode1neuron` is `sigmoid(encode1)`
//! - any other name is returned as the raw layer output

use std::path::Path;

use ndarray::{s, Array3, Array4, ArrayD, Ix4};

use crate::config::ModelConfig;
use crate::error::ExtractError;
use crate::math::sigmoid;
use crate::normalize::NormalizedImage;

use super::layer;
use super::preprocess::{resize, to_network_input};
use super::session::OnnxSession;
use super::FeatureExtractor;

/// Last convolution before the tag head.
pub const TAG_CONV_LAYER: &str = "conv6_4";

/// Kernel (and stride) of the pooling that turns `conv6_4` into logits.
const POOL_KERNEL: usize = 7;

/// Raw-graph ONNX backend.
pub struct GraphExtractor {
    session: OnnxSession,
    image_size: u32,
    mean: [f32; 3],
}

impl GraphExtractor {
    /// Load the model at `model_path` with the preprocessing from `config`.
    pub fn load(config: &ModelConfig, model_path: &Path) -> Result<Self, ExtractError> {
        tracing::info!("Loading graph backend from {:?}", model_path);
        let session = OnnxSession::load(model_path)?;
        Ok(Self {
            session,
            image_size: config.image_size,
            mean: config.mean,
        })
    }

    fn forward(
        &self,
        images: &[NormalizedImage],
        layer: &str,
    ) -> Result<ArrayD<f32>, ExtractError> {
        let resized = images
            .iter()
            .map(|img| resize(img.view(), self.image_size, self.image_size))
            .collect::<Result<Vec<Array3<f32>>, _>>()?;
        let batch = to_network_input(&resized, self.mean)?;
        tracing::debug!(
            "Running graph backend: {} image(s), layer {:?}",
            images.len(),
            layer
        );
        self.session.run(batch, layer)
    }
}

/// Non-overlapping average pooling over the spatial axes of an NCHW tensor.
///
/// Kernel and stride are both `kernel`, no padding; trailing rows/columns that
/// do not fill a whole window are dropped.
pub(crate) fn average_pool(x: ArrayD<f32>, kernel: usize) -> Result<ArrayD<f32>, ExtractError> {
    let x = x.into_dimensionality::<Ix4>().map_err(|e| ExtractError::Inference {
        layer: TAG_CONV_LAYER.to_string(),
        message: format!("expected an NCHW tensor: {e}"),
    })?;
    let (n, c, h, w) = x.dim();
    if kernel == 0 || h < kernel || w < kernel {
        return Err(ExtractError::Inference {
            layer: TAG_CONV_LAYER.to_string(),
            message: format!("cannot pool {h}x{w} with a {kernel}x{kernel} kernel"),
        });
    }

    let (out_h, out_w) = (h / kernel, w / kernel);
    let area = (kernel * kernel) as f32;
    let pooled = Array4::from_shape_fn((n, c, out_h, out_w), |(i, j, y, x0)| {
        let (top, left) = (y * kernel, x0 * kernel);
        x.slice(s![i, j, top..top + kernel, left..left + kernel]).sum() / area
    });
    Ok(pooled.into_dyn())
}

impl FeatureExtractor for GraphExtractor {
    fn extract(
        &self,
        images: &[NormalizedImage],
        layer: &str,
    ) -> Result<ArrayD<f32>, ExtractError> {
        match layer {
            layer::PROB => {
                let conv = self.forward(images, TAG_CONV_LAYER)?;
                Ok(average_pool(conv, POOL_KERNEL)?.mapv(sigmoid))
            }
            layer::ENCODE_NEURON => Ok(self.forward(images, layer::ENCODE)?.mapv(sigmoid)),
            other => self.forward(images, other),
        }
    }
}
