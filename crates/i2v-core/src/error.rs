//! Error types for tag estimation and feature extraction.
//!
//! Errors are split by who raises them: the estimator itself, the inference
//! backend behind [`FeatureExtractor`](crate::extractor::FeatureExtractor),
//! and the loaders that read tag lists and threshold tables from disk.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for i2v operations.
#[derive(Error, Debug)]
pub enum I2vError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Estimation errors
    #[error("Estimation error: {0}")]
    Estimate(#[from] EstimateError),

    /// Inference backend errors
    #[error("Backend error: {0}")]
    Extract(#[from] ExtractError),

    /// Tag list / threshold table loading errors
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Input discovery and decoding errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised by the estimator. All of them are caller-visible and
/// fail the whole batch.
#[derive(Error, Debug)]
pub enum EstimateError {
    /// Image rank is neither 2 (monochrome) nor 3 (color)
    #[error("Unsupported image rank {ndim} (expected 2 or 3)")]
    InvalidImageShape { ndim: usize },

    /// Color image with fewer than 3 channels
    #[error("Image has {channels} channel(s), at least 3 are required")]
    InvalidImageChannels { channels: usize },

    /// Tag-dependent operation without a tag catalog
    #[error("This operation requires a tag catalog")]
    CatalogRequired,

    /// Tag name not present in the catalog
    #[error("Unknown tag: {0:?}")]
    UnknownTag(String),

    /// F-score rule requested without a threshold table
    #[error("Threshold rule {rule:?} requires a threshold table")]
    ThresholdTableRequired { rule: String },

    /// Rule string is not one of constant, f0.5, f1, f2
    #[error("Unknown threshold rule: {0:?}")]
    UnknownThresholdRule(String),

    /// Tag list length differs from the model's output size
    #[error("Tag catalog must contain {expected} tags, got {actual}")]
    InvalidCatalogSize { expected: usize, actual: usize },

    /// Threshold table row count differs from the catalog size
    #[error("Threshold table has {actual} rows, catalog has {expected} tags")]
    ThresholdTableSize { expected: usize, actual: usize },

    /// Extractor output does not match the layer's expected dimensionality
    #[error("Layer {layer:?} returned shape {actual:?}, expected {expected}")]
    LayerShapeMismatch {
        layer: String,
        expected: String,
        actual: Vec<usize>,
    },

    /// The inference backend failed
    #[error(transparent)]
    Extraction(#[from] ExtractError),
}

/// Inference backend errors.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Model file missing or the runtime session could not be created
    #[error("Model error for {path}: {message}")]
    Model { path: PathBuf, message: String },

    /// Forward pass failed
    #[error("Inference failed for layer {layer:?}: {message}")]
    Inference { layer: String, message: String },

    /// The model does not expose the requested layer
    #[error("Layer {layer:?} is not available (outputs: {available:?})")]
    UnknownLayer {
        layer: String,
        available: Vec<String>,
    },

    /// No backend registered under this name
    #[error("Unknown backend {name:?} (available: {available:?})")]
    UnknownBackend {
        name: String,
        available: Vec<&'static str>,
    },

    /// Backend-side preprocessing failed
    #[error("Preprocessing failed: {0}")]
    Preprocess(String),
}

/// Errors from reading tag lists and threshold tables.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to read array from {path}: {message}")]
    Array { path: PathBuf, message: String },

    #[error("Unsupported file type for {0}")]
    UnsupportedFormat(PathBuf),
}

/// Errors from reading and decoding input images.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Input path does not exist
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Image could not be decoded
    #[error("Failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },
}

/// Convenience type alias for i2v results.
pub type Result<T> = std::result::Result<T, I2vError>;

/// Convenience type alias for estimator results.
pub type EstimateResult<T> = std::result::Result<T, EstimateError>;
