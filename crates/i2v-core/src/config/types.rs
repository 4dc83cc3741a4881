//! Sub-configuration structs with defaults for the released illustration2vec models.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::estimator::DEFAULT_TOP_N;
use crate::extractor::preprocess::DEFAULT_MEAN;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where models, tag lists and threshold tables are stored
    pub model_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.i2v/models"),
        }
    }
}

/// Model and backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Inference backend ("classifier" or "graph")
    pub backend: String,

    /// ONNX model filename, relative to `general.model_dir`
    pub model_file: String,

    /// JSON tag list filename, relative to `general.model_dir`
    pub tags_file: String,

    /// Optional F-score threshold table (.npz, .npy or .json)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_file: Option<String>,

    /// Side length images are resized to before inference
    pub image_size: u32,

    /// Side length of the center crop (classifier backend only)
    pub crop_size: u32,

    /// Mean pixel subtracted from the input, BGR order
    pub mean: [f32; 3],
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: "classifier".to_string(),
            model_file: "illust2vec_tag_ver200.onnx".to_string(),
            tags_file: "tag_list.json".to_string(),
            threshold_file: None,
            image_size: 224,
            crop_size: 224,
            mean: DEFAULT_MEAN,
        }
    }
}

/// Default estimation parameters used by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimateConfig {
    /// Tags per segment for top-tag estimation
    pub top_n: usize,

    /// Threshold for the "constant" rule
    pub threshold: f32,

    /// Plausibility rule: "constant", "f0.5", "f1" or "f2"
    pub rule: String,
}

impl Default for EstimateConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            threshold: 0.25,
            rule: "constant".to_string(),
        }
    }
}

/// Input processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Images per extractor call
    pub batch_size: usize,

    /// Supported input formats
    pub supported_formats: Vec<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            batch_size: 8,
            supported_formats: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "webp".to_string(),
                "gif".to_string(),
                "bmp".to_string(),
            ],
        }
    }
}

/// Output formatting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: "json" or "jsonl"
    pub format: String,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
            pretty: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
