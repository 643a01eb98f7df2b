use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_SOURCE: &str = "products.csv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path or http(s) URL loaded when no cache or override exists.
    pub default_source: String,
    pub cache_db_path: PathBuf,
    pub output_dir: PathBuf,
    pub log_dir: PathBuf,
    pub display_limit: usize,
    pub browse_limit: usize,
    pub fuzzy_threshold: f64,
    pub debounce_ms: u64,
    #[serde(skip)]
    pub config_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let base = std::env::temp_dir().join("gestock");
        Self {
            default_source: DEFAULT_SOURCE.to_string(),
            cache_db_path: base.join("cache.sqlite3"),
            output_dir: base.join("export"),
            log_dir: base.join("logs"),
            display_limit: 50,
            browse_limit: 30,
            fuzzy_threshold: 0.4,
            debounce_ms: 150,
            config_path: base.join("config.toml"),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(error) => write!(f, "io error: {error}"),
            Self::Parse(error) => write!(f, "invalid config file: {error}"),
            Self::Serialize(error) => write!(f, "failed to serialize config: {error}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Serialize(value)
    }
}

pub fn validate(cfg: &Config) -> Result<(), String> {
    if cfg.display_limit < 5 || cfg.display_limit > 200 {
        return Err("display_limit out of range".into());
    }

    if cfg.browse_limit == 0 || cfg.browse_limit > cfg.display_limit {
        return Err("browse_limit must be between 1 and display_limit".into());
    }

    if !(0.0..=1.0).contains(&cfg.fuzzy_threshold) {
        return Err("fuzzy_threshold must be between 0.0 and 1.0".into());
    }

    if cfg.debounce_ms > 5_000 {
        return Err("debounce_ms out of range".into());
    }

    if cfg.default_source.trim().is_empty() {
        return Err("default_source is required".into());
    }

    if cfg.cache_db_path.as_os_str().is_empty() {
        return Err("cache_db_path is required".into());
    }

    Ok(())
}

/// Loads the config at `path` (or the default location). A missing file yields defaults.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| Config::default().config_path);

    let mut cfg = match std::fs::read_to_string(&config_path) {
        Ok(raw) => toml::from_str::<Config>(&raw)?,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Config::default(),
        Err(error) => return Err(error.into()),
    };
    cfg.config_path = config_path;

    validate(&cfg).map_err(ConfigError::Invalid)?;
    Ok(cfg)
}

pub fn save(cfg: &Config) -> Result<(), ConfigError> {
    validate(cfg).map_err(ConfigError::Invalid)?;
    if let Some(parent) = cfg.config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let raw = toml::to_string_pretty(cfg)?;
    std::fs::write(&cfg.config_path, raw)?;
    Ok(())
}
