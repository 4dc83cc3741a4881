//! The `i2v feature` command.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use clap::Args;
use i2v_core::Config;
use serde::Serialize;

use super::input::{self, InputArgs};

/// Arguments for the `feature` command.
#[derive(Args, Debug)]
pub struct FeatureArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Emit bit-packed binary features instead of real-valued ones
    #[arg(long)]
    pub binary: bool,
}

/// A bit-packed feature, MSB first, base64 encoded.
#[derive(Debug, Serialize)]
pub struct BinaryFeature {
    /// Number of packed bytes
    pub bytes: usize,
    /// Base64 of the packed bytes
    pub data: String,
}

impl BinaryFeature {
    fn from_packed(packed: &[u8]) -> Self {
        Self {
            bytes: packed.len(),
            data: STANDARD.encode(packed),
        }
    }
}

/// Execute the feature command.
pub fn execute(args: FeatureArgs, config: &Config) -> anyhow::Result<()> {
    if args.binary {
        input::run(&args.input, config, |estimator, images| {
            let packed = estimator.extract_binary_feature(images)?;
            Ok(packed
                .outer_iter()
                .map(|row| BinaryFeature::from_packed(&row.to_vec()))
                .collect())
        })
    } else {
        input::run(&args.input, config, |estimator, images| {
            let features = estimator.extract_feature(images)?;
            Ok(features.outer_iter().map(|row| row.to_vec()).collect())
        })
    }
}
