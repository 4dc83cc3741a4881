//! The `i2v backends` command.

use i2v_core::extractor::BACKENDS;
use i2v_core::Config;

/// List every registered backend, marking the configured one.
pub fn execute(config: &Config) -> anyhow::Result<()> {
    for backend in BACKENDS {
        let marker = if backend.name == config.model.backend {
            "*"
        } else {
            " "
        };
        println!("{marker} {:<12} {}", backend.name, backend.description);
    }
    Ok(())
}
