//! Feature extraction backends.
//!
//! The estimator only ever talks to a [`FeatureExtractor`]: given a batch of
//! normalized images and a layer name, return that layer's activations with
//! the batch as the leading dimension. Everything model specific (resizing,
//! cropping, mean subtraction, channel order, the runtime session) lives in
//! the concrete backends.
//!
//! # Usage
//!
//! ```rust,ignore
//! use i2v_core::extractor::{layer, registry};
//!
//! let extractor = registry::load_backend("graph", &config.model, &model_path)?;
//! let prob = extractor.extract(&images, layer::PROB)?; // [B, 1539, 1, 1]
//! ```

pub mod classifier;
pub mod graph;
pub(crate) mod preprocess;
pub mod registry;
pub(crate) mod session;

use std::sync::Arc;

use ndarray::ArrayD;

use crate::error::ExtractError;
use crate::normalize::NormalizedImage;

pub use classifier::ClassifierExtractor;
pub use graph::GraphExtractor;
pub use registry::{load_backend, BackendInfo, BoxedExtractor, BACKENDS};

/// Layer names understood by every backend.
pub mod layer {
    /// Per-tag probabilities, 1539 values per image.
    pub const PROB: &str = "prob";
    /// Dense feature vector.
    pub const ENCODE: &str = "encode1";
    /// Sigmoid of the dense feature vector, used for binary features.
    pub const ENCODE_NEURON: &str = "encode1neuron";
}

/// Capability to run the network on a batch and return one named layer.
pub trait FeatureExtractor: Send + Sync {
    /// Return the activations of `layer` for `images`.
    ///
    /// The leading dimension of the result equals `images.len()`.
    fn extract(&self, images: &[NormalizedImage], layer: &str)
        -> Result<ArrayD<f32>, ExtractError>;
}

impl<E: FeatureExtractor + ?Sized> FeatureExtractor for Box<E> {
    fn extract(
        &self,
        images: &[NormalizedImage],
        layer: &str,
    ) -> Result<ArrayD<f32>, ExtractError> {
        (**self).extract(images, layer)
    }
}

impl<E: FeatureExtractor + ?Sized> FeatureExtractor for Arc<E> {
    fn extract(
        &self,
        images: &[NormalizedImage],
        layer: &str,
    ) -> Result<ArrayD<f32>, ExtractError> {
        (**self).extract(images, layer)
    }
}

impl<E: FeatureExtractor + ?Sized> FeatureExtractor for &E {
    fn extract(
        &self,
        images: &[NormalizedImage],
        layer: &str,
    ) -> Result<ArrayD<f32>, ExtractError> {
        (**self).extract(images, layer)
    }
}
