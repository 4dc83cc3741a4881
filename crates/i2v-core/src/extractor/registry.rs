//! Registry of the inference backends compiled into this build.
//!
//! Backends are selected by name (`model.backend` in the config) instead of
//! being discovered at runtime.

use std::path::Path;

use crate::config::ModelConfig;
use crate::error::ExtractError;

use super::{ClassifierExtractor, FeatureExtractor, GraphExtractor};

/// A type-erased, thread-safe extractor.
pub type BoxedExtractor = Box<dyn FeatureExtractor>;

type Loader = fn(&ModelConfig, &Path) -> Result<BoxedExtractor, ExtractError>;

/// A registered backend.
pub struct BackendInfo {
    /// Name used in configuration and on the command line
    pub name: &'static str,
    /// One-line description for `i2v backends`
    pub description: &'static str,
    loader: Loader,
}

impl BackendInfo {
    /// Load this backend with the given model file.
    pub fn load(
        &self,
        config: &ModelConfig,
        model_path: &Path,
    ) -> Result<BoxedExtractor, ExtractError> {
        (self.loader)(config, model_path)
    }
}

/// Every available backend, default first.
pub const BACKENDS: &[BackendInfo] = &[
    BackendInfo {
        name: "classifier",
        description: "ONNX graph exporting prob/encode1/encode1neuron; resize + center crop",
        loader: load_classifier,
    },
    BackendInfo {
        name: "graph",
        description: "raw converted ONNX graph; tag and binary heads computed on the host",
        loader: load_graph,
    },
];

fn load_classifier(config: &ModelConfig, path: &Path) -> Result<BoxedExtractor, ExtractError> {
    Ok(Box::new(ClassifierExtractor::load(config, path)?))
}

fn load_graph(config: &ModelConfig, path: &Path) -> Result<BoxedExtractor, ExtractError> {
    Ok(Box::new(GraphExtractor::load(config, path)?))
}

/// Names of all registered backends.
pub fn available() -> Vec<&'static str> {
    BACKENDS.iter().map(|b| b.name).collect()
}

/// Look up a backend by name.
pub fn find(name: &str) -> Option<&'static BackendInfo> {
    BACKENDS.iter().find(|b| b.name == name)
}

/// Load the backend registered under `name`.
pub fn load_backend(
    name: &str,
    config: &ModelConfig,
    model_path: &Path,
) -> Result<BoxedExtractor, ExtractError> {
    let backend = find(name).ok_or_else(|| ExtractError::UnknownBackend {
        name: name.to_string(),
        available: available(),
    })?;
    backend.load(config, model_path)
}
