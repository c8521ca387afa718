//! Data models: extraction output, analysis output, configuration.

pub mod analysis;
pub mod config;
pub mod document;
