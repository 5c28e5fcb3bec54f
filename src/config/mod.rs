/*
 * Copyright (C) 2025 Pedro Henrique / phdev13
 *
 * File: src/config/mod.rs
 *
 * This file implements the daemon's configuration loader. Every setting has a
 * built-in default equal to the values the daemon has always used, so with
 * nothing configured it needs no file, no arguments and no environment.
 *
 * When `IMUD_CONFIG` names a TOML or JSON file, that file is read first;
 * individual settings can then be overridden by `IMUD_*` environment
 * variables, which is convenient under a service manager.
 *
 * Dependencies:
 *  - `serde`: For deserialization of configuration data.
 *  - `toml`, `serde_json`: For parsing specific configuration formats.
 *  - `thiserror`: For structured error handling.
 *
 * SPDX-License-Identifier: AGPL-3.0 license
 */

use crate::shm::record::MAX_RECORD_LEN;
use crate::workers::LoopSettings;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Environment variable naming an optional configuration file.
pub const CONFIG_PATH_VAR: &str = "IMUD_CONFIG";

/// Default shared-memory object name.
pub const DEFAULT_CHANNEL_NAME: &str = "MPU";
/// Default shared-memory size in bytes.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 50;
/// Default location of the device library.
pub const DEFAULT_DMP_LIBRARY: &str = "/usr/local/lib/libmpu6050_dmp.so";

const _: () = assert!(MAX_RECORD_LEN < DEFAULT_CHANNEL_CAPACITY);

// --- Custom Error and Result Types ---

/// Represents errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file at '{path}': {error}")]
    FileRead {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
    #[error("Failed to parse TOML configuration: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to parse JSON configuration: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("Unsupported configuration file format for path: {path}")]
    UnsupportedFormat { path: PathBuf },
    #[error("Environment variable '{key}' could not be read: {error}")]
    EnvVar {
        key: String,
        #[source]
        error: env::VarError,
    },
    #[error("Invalid configuration value for '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// --- Configuration Structure ---

/// Top-level daemon configuration.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ImudConfig {
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ChannelConfig {
    pub name: String,
    pub capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_CHANNEL_NAME.to_string(),
            capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SensorConfig {
    pub library_path: PathBuf,
    /// FIFO count that signals an overflow.
    pub fifo_capacity: u16,
    /// Settle time between DMP bring-up and the first poll.
    pub startup_delay_us: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            library_path: PathBuf::from(DEFAULT_DMP_LIBRARY),
            fifo_capacity: 1024,
            startup_delay_us: 1500,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub poll_interval_ms: u64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self { poll_interval_ms: 10 }
    }
}

/// Output format of log lines.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl LoggingConfig {
    /// The configured level as a `log` filter.
    pub fn level_filter(&self) -> ConfigResult<log::LevelFilter> {
        log::LevelFilter::from_str(&self.level).map_err(|_| ConfigError::Invalid {
            key: "logging.level",
            reason: format!("'{}' is not a log level", self.level),
        })
    }
}

impl ImudConfig {
    /// Loop timing derived from this configuration.
    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            poll_interval: Duration::from_millis(self.acquisition.poll_interval_ms),
            fifo_capacity: self.sensor.fifo_capacity,
        }
    }

    /// Delay between sensor bring-up and the first poll.
    pub fn startup_delay(&self) -> Duration {
        Duration::from_micros(self.sensor.startup_delay_us)
    }

    /// Rejects values the daemon cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.acquisition.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "acquisition.poll_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.sensor.fifo_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "sensor.fifo_capacity",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.channel.capacity <= MAX_RECORD_LEN {
            return Err(ConfigError::Invalid {
                key: "channel.capacity",
                reason: format!("must be at least {} bytes", MAX_RECORD_LEN + 1),
            });
        }
        self.logging.level_filter()?;
        Ok(())
    }
}

// --- Configuration Loading Service ---

/// A service for loading configuration from files and environment variables.
#[derive(Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves the daemon configuration: the file named by `IMUD_CONFIG`
    /// (or the defaults), then environment overrides, then validation.
    pub fn load(&self) -> ConfigResult<ImudConfig> {
        let config = match read_env_var(CONFIG_PATH_VAR)? {
            Some(path) => self.load_from_file::<ImudConfig>(Path::new(&path))?,
            None => {
                let mut config = ImudConfig::default();
                config.apply_env_overrides()?;
                config
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file path, automatically detecting the
    /// format, then applies environment variable overrides.
    pub fn load_from_file<T: serde::de::DeserializeOwned + Configurable>(
        &self,
        path: &Path,
    ) -> ConfigResult<T> {
        let mut config: T = self.parse_file(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Reads and parses a file without applying overrides.
    pub fn parse_file<T: serde::de::DeserializeOwned>(&self, path: &Path) -> ConfigResult<T> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            error: e,
        })?;

        match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => Ok(toml::from_str(&contents)?),
            Some("json") => Ok(serde_json::from_str(&contents)?),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// A trait that allows a configuration struct to define its own logic
/// for being overridden by environment variables.
pub trait Configurable {
    fn apply_env_overrides(&mut self) -> ConfigResult<()>;
}

impl Configurable for ImudConfig {
    fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        self.channel.apply_env_overrides()?;
        self.sensor.apply_env_overrides()?;
        self.acquisition.apply_env_overrides()?;
        self.logging.apply_env_overrides()?;
        Ok(())
    }
}

impl Configurable for ChannelConfig {
    fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        if let Some(val) = read_env_var("IMUD_SHM_NAME")? { self.name = val; }
        if let Some(val) = read_env_var("IMUD_SHM_CAPACITY")? { self.capacity = val.parse().unwrap_or(self.capacity); }
        Ok(())
    }
}

impl Configurable for SensorConfig {
    fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        if let Some(val) = read_env_var("IMUD_DMP_LIBRARY")? { self.library_path = PathBuf::from(val); }
        if let Some(val) = read_env_var("IMUD_FIFO_CAPACITY")? { self.fifo_capacity = val.parse().unwrap_or(self.fifo_capacity); }
        if let Some(val) = read_env_var("IMUD_STARTUP_DELAY_US")? { self.startup_delay_us = val.parse().unwrap_or(self.startup_delay_us); }
        Ok(())
    }
}

impl Configurable for AcquisitionConfig {
    fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        if let Some(val) = read_env_var("IMUD_POLL_INTERVAL_MS")? { self.poll_interval_ms = val.parse().unwrap_or(self.poll_interval_ms); }
        Ok(())
    }
}

impl Configurable for LoggingConfig {
    fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        if let Some(val) = read_env_var("IMUD_LOG_LEVEL")? { self.level = val; }
        if let Some(val) = read_env_var("IMUD_LOG_FORMAT")? { self.format = val.parse().unwrap_or(self.format); }
        Ok(())
    }
}

/// Helper function to read an environment variable, returning `Ok(None)` if not set.
fn read_env_var(key: &str) -> ConfigResult<Option<String>> {
    match env::var(key) {
        Ok(val) => Ok(Some(val)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(error) => Err(ConfigError::EnvVar { key: key.to_string(), error }),
    }
}


// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    #[test]
    fn test_defaults_match_daemon_constants() {
        let config = ImudConfig::default();
        assert_eq!(config.channel.name, "MPU");
        assert_eq!(config.channel.capacity, 50);
        assert_eq!(config.sensor.fifo_capacity, 1024);
        assert_eq!(config.startup_delay(), Duration::from_micros(1500));
        assert_eq!(config.loop_settings().poll_interval, Duration::from_millis(10));
        assert_eq!(config.logging.format, LogFormat::Text);
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_partial_toml_file() {
        let dir = TempDir::new().unwrap();
        let config_file = dir.child("imud.toml");
        config_file.write_str(r#"
            [channel]
            name = "/imu0"

            [logging]
            level = "debug"
            format = "json"
        "#).unwrap();

        let config: ImudConfig = ConfigLoader::new().parse_file(config_file.path()).unwrap();

        assert_eq!(config.channel.name, "/imu0");
        assert_eq!(config.channel.capacity, 50); // From default
        assert_eq!(config.sensor, SensorConfig::default());
        assert_eq!(config.logging.level_filter().unwrap(), log::LevelFilter::Debug);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_parse_json_file() {
        let dir = TempDir::new().unwrap();
        let config_file = dir.child("imud.json");
        config_file.write_str(r#"{ "acquisition": { "poll_interval_ms": 5 }, "sensor": { "fifo_capacity": 512 } }"#).unwrap();

        let config: ImudConfig = ConfigLoader::new().parse_file(config_file.path()).unwrap();
        let settings = config.loop_settings();

        assert_eq!(settings.poll_interval, Duration::from_millis(5));
        assert_eq!(settings.fifo_capacity, 512);
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let dir = TempDir::new().unwrap();
        let config_file = dir.child("imud.yaml");
        config_file.write_str("channel: {}").unwrap();

        let result: ConfigResult<ImudConfig> = ConfigLoader::new().parse_file(config_file.path());
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_validation_rejects_unusable_values() {
        let mut config = ImudConfig::default();
        config.acquisition.poll_interval_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { key: "acquisition.poll_interval_ms", .. })));

        let mut config = ImudConfig::default();
        config.channel.capacity = MAX_RECORD_LEN;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { key: "channel.capacity", .. })));

        let mut config = ImudConfig::default();
        config.logging.level = "loud".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { key: "logging.level", .. })));
    }

    // All environment-driven cases live in one test so they cannot race.
    #[test]
    fn test_env_variable_overrides() {
        let dir = TempDir::new().unwrap();
        let config_file = dir.child("imud.toml");
        config_file.write_str(r#"
            [channel]
            name = "file_name"
            capacity = 64
        "#).unwrap();

        env::set_var("IMUD_SHM_NAME", "env_name");
        env::set_var("IMUD_POLL_INTERVAL_MS", "20");
        env::set_var("IMUD_FIFO_CAPACITY", "not-a-number");
        env::set_var("IMUD_LOG_FORMAT", "json");
        env::set_var("IMUD_STARTUP_DELAY_US", "2500");

        let loader = ConfigLoader::new();
        let config = loader.load_from_file::<ImudConfig>(config_file.path()).unwrap();

        assert_eq!(config.channel.name, "env_name");
        assert_eq!(config.channel.capacity, 64);
        assert_eq!(config.acquisition.poll_interval_ms, 20);
        assert_eq!(config.sensor.fifo_capacity, 1024); // Unparseable keeps previous
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.startup_delay(), Duration::from_micros(2500));

        env::set_var(CONFIG_PATH_VAR, config_file.path());
        let config = loader.load().unwrap();
        assert_eq!(config.channel.name, "env_name");
        assert_eq!(config.channel.capacity, 64);
        assert_eq!(config.sensor.startup_delay_us, 2500);

        // Without a file the defaults still take overrides.
        env::remove_var(CONFIG_PATH_VAR);
        let config = loader.load().unwrap();
        assert_eq!(config.channel.name, "env_name");
        assert_eq!(config.channel.capacity, 50);
        assert_eq!(config.acquisition.poll_interval_ms, 20);

        // Clean up environment variables
        env::remove_var(CONFIG_PATH_VAR);
        env::remove_var("IMUD_SHM_NAME");
        env::remove_var("IMUD_POLL_INTERVAL_MS");
        env::remove_var("IMUD_FIFO_CAPACITY");
        env::remove_var("IMUD_LOG_FORMAT");
        env::remove_var("IMUD_STARTUP_DELAY_US");
    }
}
