//! Shell configuration

use crate::error::{CliError, Result};
use pod_playback::PlaybackConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory
const DEFAULT_CONFIG_FILE: &str = "pod.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub library: LibrarySettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LibrarySettings {
    /// JSON array of episodes; the built-in sample library is used when unset
    #[serde(default)]
    pub episodes_file: Option<PathBuf>,

    /// Episode ids queued at startup, in order
    #[serde(default)]
    pub initial_queue: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is not set
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "pod_cli=info,pod_playback=info".to_string()
}

impl CliConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist; otherwise `pod.toml` is used if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Override with environment variables (POD_PLAYBACK__DEBOUNCE_MS=...)
        settings = settings.add_source(
            config::Environment::with_prefix("POD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CliError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.playback
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;

        if self.logging.filter.trim().is_empty() {
            return Err(CliError::Config("logging.filter must not be empty".to_string()));
        }

        Ok(())
    }
}
