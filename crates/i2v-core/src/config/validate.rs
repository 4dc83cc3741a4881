//! Configuration validation with range checks.

use crate::error::ConfigError;
use crate::extractor::registry;
use crate::output::OutputFormat;
use crate::tagging::ThresholdRule;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if registry::find(&self.model.backend).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "model.backend must be one of {:?}, got {:?}",
                registry::available(),
                self.model.backend
            )));
        }
        if self.model.image_size == 0 {
            return Err(ConfigError::ValidationError(
                "model.image_size must be > 0".into(),
            ));
        }
        if self.model.crop_size == 0 || self.model.crop_size > self.model.image_size {
            return Err(ConfigError::ValidationError(
                "model.crop_size must be > 0 and <= model.image_size".into(),
            ));
        }
        if self.processing.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "processing.batch_size must be > 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.estimate.threshold) {
            return Err(ConfigError::ValidationError(
                "estimate.threshold must be between 0.0 and 1.0".into(),
            ));
        }
        if ThresholdRule::parse(&self.estimate.rule, self.estimate.threshold).is_err() {
            return Err(ConfigError::ValidationError(format!(
                "estimate.rule must be one of constant, f0.5, f1, f2, got {:?}",
                self.estimate.rule
            )));
        }
        if OutputFormat::parse(&self.output.format).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "output.format must be json or jsonl, got {:?}",
                self.output.format
            )));
        }
        Ok(())
    }
}
