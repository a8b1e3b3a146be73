mod store;
mod types;

pub use store::ConfigStore;
pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./timelapse.toml",
        "~/.config/timelapse/config.toml",
        "/etc/timelapse/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Apply `key=value` overrides in order, then re-validate.
pub fn apply_overrides(config: &mut Config, overrides: &[String]) -> Result<()> {
    for item in overrides {
        let (key, value) = item
            .split_once('=')
            .with_context(|| format!("Invalid property '{}': expected key=value", item))?;
        apply_property(config, key.trim(), value.trim())?;
    }
    validate_config(config)
}

/// Set one property by its dotted key.
///
/// Unknown keys are logged and ignored; values that do not parse are errors.
pub fn apply_property(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "server.host" => config.server.host = value.to_string(),
        "server.port" => config.server.port = parse_value(key, value)?,
        "server.max_upload_mb" => config.server.max_upload_mb = parse_value(key, value)?,
        "server.progress_interval_ms" => {
            config.server.progress_interval_ms = parse_value(key, value)?
        }
        "server.progress_timeout_secs" => {
            config.server.progress_timeout_secs = parse_value(key, value)?
        }
        "app.outputPath" => config.app.output_path = value.to_string(),
        "app.ffmpegPath" => config.app.ffmpeg_path = value.to_string(),
        "app.ffprobePath" => config.app.ffprobe_path = value.to_string(),
        "app.stagingDir" => config.app.staging_dir = Some(PathBuf::from(value)),
        _ => tracing::warn!("Ignoring unknown config property: {}", key),
    }
    Ok(())
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("Invalid value for {}: '{}'", key, value))
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.server.progress_interval_ms == 0 {
        anyhow::bail!("server.progress_interval_ms must be greater than 0");
    }

    if config.app.output_path.trim().is_empty() {
        anyhow::bail!("app.outputPath cannot be empty");
    }

    if config.app.ffmpeg_path.trim().is_empty() {
        anyhow::bail!("app.ffmpegPath cannot be empty");
    }

    if config.app.ffprobe_path.trim().is_empty() {
        anyhow::bail!("app.ffprobePath cannot be empty");
    }

    Ok(())
}
