//! Configuration file and `tracing` setup for the `unindy` tool.

#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Once;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Environment variable naming an explicit config file (absolute or relative to the
/// working directory).
pub const UNINDY_CONFIG_ENV_VAR: &str = "UNINDY_CONFIG";

/// Config file looked up in the working directory when [`UNINDY_CONFIG_ENV_VAR`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "unindy.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnindyConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Either a plain level (`info`, `debug`, ...) or an `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    /// Filter directives: the configured level (`info` when blank) followed by the
    /// `RUST_LOG` directives in `rust_log`.
    fn directives(&self, rust_log: Option<&str>) -> String {
        let level = match self.level.trim() {
            "" => "info",
            level => level,
        };
        match rust_log.map(str::trim).filter(|value| !value.is_empty()) {
            Some(env) => format!("{level},{env}"),
            None => level.to_owned(),
        }
    }

    /// The effective filter: the configured level with `RUST_LOG` layered on top. Invalid
    /// directives fall back to the configured level alone, then to `info`.
    pub fn env_filter(&self) -> EnvFilter {
        let rust_log = std::env::var("RUST_LOG").ok();
        EnvFilter::try_new(self.directives(rust_log.as_deref()))
            .or_else(|_| EnvFilter::try_new(self.directives(None)))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionSetting {
    #[default]
    Deflated,
    Stored,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiveConfig {
    /// Compression of rewritten class entries.
    #[serde(default)]
    pub compression: CompressionSetting,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // The default `Display` embeds a source snippet; keep only the message.
        ConfigError::Toml(err.message().to_owned())
    }
}

impl UnindyConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

/// Finds the config file for an invocation from `working_dir`.
///
/// [`UNINDY_CONFIG_ENV_VAR`] wins when set, even if the file does not exist (loading then
/// reports the error); otherwise `unindy.toml` is used when present.
pub fn discover_config_path(working_dir: &Path) -> Option<PathBuf> {
    if let Some(value) = std::env::var_os(UNINDY_CONFIG_ENV_VAR) {
        let candidate = PathBuf::from(value);
        return Some(if candidate.is_absolute() {
            candidate
        } else {
            working_dir.join(candidate)
        });
    }

    let path = working_dir.join(DEFAULT_CONFIG_FILE);
    path.is_file().then_some(path)
}

/// Loads the configuration for an invocation, falling back to defaults when no file is
/// found.
pub fn load_for_invocation(
    working_dir: &Path,
) -> Result<(UnindyConfig, Option<PathBuf>), ConfigError> {
    let Some(path) = discover_config_path(working_dir) else {
        return Ok((UnindyConfig::default(), None));
    };
    let config = UnindyConfig::load_from_path(&path)?;
    Ok((config, Some(path)))
}

static TRACING_INIT: Once = Once::new();

/// Installs the global `tracing` subscriber writing to stderr.
///
/// Safe to call multiple times; only the first call has an effect.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let filter = config.env_filter();
        let layer: Box<dyn Layer<_> + Send + Sync> = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .boxed()
        };

        let subscriber = tracing_subscriber::registry().with(filter).with(layer);
        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            tracing::debug!(target: "unindy.config", json = config.json, "tracing initialized");
        }
    });
}
