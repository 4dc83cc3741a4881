//! i2v Core - Embeddable illustration tag estimation library.
//!
//! Wraps an illustration2vec-style convolutional network behind the
//! [`FeatureExtractor`](extractor::FeatureExtractor) trait and turns its
//! activations into tag probabilities, ranked tag lists, plausible tags and
//! real-valued or binary feature vectors.
//!
//! # Architecture
//!
//! ```text
//! Image → Normalize (H×W×3 f32) → Extractor (prob / encode1 / encode1neuron) → Estimator → JSON
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use i2v_core::{load_estimator, Config, ThresholdRule};
//!
//! fn main() -> i2v_core::Result<()> {
//!     let config = Config::load()?;
//!     let estimator = load_estimator(&config)?;
//!
//!     let image = ndarray::Array3::<f32>::zeros((224, 224, 3));
//!     let tags = estimator.estimate_plausible_tags(&[image], ThresholdRule::Constant(0.25))?;
//!     println!("{:?}", tags[0].general);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod estimator;
pub mod extractor;
pub mod math;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod tagging;
pub mod types;

pub use config::Config;
pub use error::{
    ConfigError, EstimateError, EstimateResult, ExtractError, I2vError, LoadError,
    PipelineError, Result,
};
pub use estimator::{Estimator, DEFAULT_TOP_N};
pub use extractor::{BoxedExtractor, FeatureExtractor};
pub use normalize::{normalize, normalize_batch, NormalizedImage};
pub use output::{EstimateRecord, OutputFormat, OutputWriter};
pub use pipeline::{DecodedImage, DiscoveredFile, FileDiscovery, Hasher, ImageDecoder};
pub use tagging::{FBeta, Segment, TagCatalog, ThresholdRule, ThresholdTable, CATALOG_SIZE};
pub use types::{ScoredTag, SegmentedTags, SpecificTags};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build an estimator from configuration.
///
/// Loads the tag list, the optional threshold table and finally the model
/// through the backend named by `model.backend`.
pub fn load_estimator(config: &Config) -> Result<Estimator<BoxedExtractor>> {
    tracing::debug!("Initializing i2v v{}", VERSION);

    let catalog = TagCatalog::load(&config.tags_path())?;
    let thresholds = config
        .threshold_path()
        .map(|path| ThresholdTable::load(&path))
        .transpose()?;

    let extractor = extractor::load_backend(
        &config.model.backend,
        &config.model,
        &config.model_path(),
    )?;
    tracing::info!(
        "Loaded {} backend from {:?}",
        config.model.backend,
        config.model_path()
    );

    Ok(Estimator::new(extractor, Some(catalog), thresholds)?)
}
