//! Subcommands.

pub mod analyze;
pub mod batch;
pub mod config;
pub mod extract;

use std::path::Path;

use tracing::debug;

use intake_core::IntakeConfig;

/// Environment variable consulted when the config carries no cloud OCR key.
pub const API_KEY_ENV: &str = "GOOGLE_CLOUD_VISION_API_KEY";

/// Load the configuration: an explicit `--config` path, else the user config file if present,
/// else defaults. The cloud OCR key falls back to [`API_KEY_ENV`].
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<IntakeConfig> {
    let mut config = match config_path {
        Some(path) => IntakeConfig::from_file(Path::new(path))?,
        None => {
            let default_path = config::default_config_path();
            if default_path.exists() {
                IntakeConfig::from_file(&default_path)?
            } else {
                IntakeConfig::default()
            }
        }
    };

    let has_key = config
        .vision
        .api_key
        .as_deref()
        .is_some_and(|key| !key.trim().is_empty());

    if !has_key {
        config.vision.api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty());
        if config.vision.api_key.is_some() {
            debug!("Using cloud OCR key from {}", API_KEY_ENV);
        }
    }

    Ok(config)
}

/// MIME type for a file: the explicit override, else a guess from the extension.
pub fn resolve_mime(path: &Path, explicit: Option<&str>) -> String {
    match explicit {
        Some(mime) => mime.to_string(),
        None => mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}

/// Final path component, for routing and user-facing messages.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string()
}
