//! The `i2v tags`, `i2v plausible` and `i2v specific` commands.

use clap::Args;
use i2v_core::{Config, ThresholdRule};

use super::input::{self, InputArgs};

/// Arguments for the `tags` command.
#[derive(Args, Debug)]
pub struct TagsArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Tags per segment (defaults to `estimate.top_n`)
    #[arg(short = 'n', long)]
    pub top_n: Option<usize>,
}

/// Arguments for the `plausible` command.
#[derive(Args, Debug)]
pub struct PlausibleArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Threshold rule: constant, f0.5, f1 or f2 (defaults to `estimate.rule`)
    #[arg(short, long)]
    pub rule: Option<String>,

    /// Threshold for the constant rule (defaults to `estimate.threshold`)
    #[arg(short, long)]
    pub threshold: Option<f32>,
}

/// Arguments for the `specific` command.
#[derive(Args, Debug)]
pub struct SpecificArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Tag to report; repeat for several
    #[arg(short = 'T', long = "tag", required = true)]
    pub tags: Vec<String>,
}

/// Execute the tags command.
pub fn execute_tags(args: TagsArgs, config: &Config) -> anyhow::Result<()> {
    let n_tag = args.top_n.unwrap_or(config.estimate.top_n);
    input::run(&args.input, config, |estimator, images| {
        estimator.estimate_top_tags(images, n_tag)
    })
}

/// Execute the plausible command.
pub fn execute_plausible(args: PlausibleArgs, config: &Config) -> anyhow::Result<()> {
    let rule = resolve_rule(&args, config)?;
    tracing::debug!("Plausible tags with rule {}", rule);
    input::run(&args.input, config, |estimator, images| {
        estimator.estimate_plausible_tags(images, rule)
    })
}

/// Execute the specific command.
pub fn execute_specific(args: SpecificArgs, config: &Config) -> anyhow::Result<()> {
    input::run(&args.input, config, |estimator, images| {
        estimator.estimate_specific_tags(images, &args.tags)
    })
}

fn resolve_rule(args: &PlausibleArgs, config: &Config) -> anyhow::Result<ThresholdRule> {
    let name = args.rule.as_deref().unwrap_or(&config.estimate.rule);
    let threshold = args.threshold.unwrap_or(config.estimate.threshold);
    Ok(ThresholdRule::parse(name, threshold)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use i2v_core::FBeta;
    use std::path::PathBuf;

    fn plausible(rule: Option<&str>, threshold: Option<f32>) -> PlausibleArgs {
        PlausibleArgs {
            input: InputArgs {
                input: PathBuf::from("."),
                output: None,
                format: None,
                batch_size: None,
                backend: None,
            },
            rule: rule.map(String::from),
            threshold,
        }
    }

    #[test]
    fn test_rule_defaults_from_config() {
        let config = Config::default();
        let rule = resolve_rule(&plausible(None, None), &config).unwrap();
        assert_eq!(rule, ThresholdRule::Constant(0.25));
    }

    #[test]
    fn test_rule_overrides() {
        let config = Config::default();
        let rule = resolve_rule(&plausible(Some("f2"), None), &config).unwrap();
        assert_eq!(rule, ThresholdRule::FScore(FBeta::F2));

        let rule = resolve_rule(&plausible(None, Some(0.6)), &config).unwrap();
        assert_eq!(rule, ThresholdRule::Constant(0.6));

        assert!(resolve_rule(&plausible(Some("f3"), None), &config).is_err());
    }
}
