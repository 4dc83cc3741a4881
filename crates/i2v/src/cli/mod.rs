//! Subcommand implementations.

pub mod backends;
pub mod config;
pub mod feature;
mod input;
pub mod tags;
